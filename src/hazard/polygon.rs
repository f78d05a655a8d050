//! Even-odd ray casting point-in-ring test.

use crate::models::{PlanarPoint, Ring};

/// Whether `point` lies inside `ring` under the even-odd rule.
///
/// A ray is cast from the point towards +x and edge crossings are counted.
/// Each edge is half-open in y (`min < y <= max`) so a vertex shared by two
/// edges is counted once. Points exactly on the boundary are classified by
/// whichever edges that rule happens to count: for an axis-aligned square the
/// right and top edges read as inside, the left and bottom edges as outside.
pub fn contains(point: PlanarPoint, ring: &Ring) -> bool {
    contains_coords(point, ring.coords())
}

/// Same as [`contains`] over a bare vertex slice.
///
/// Slices with fewer than three vertices contain nothing.
pub fn contains_coords(point: PlanarPoint, coords: &[PlanarPoint]) -> bool {
    let Some(&last) = coords.last() else {
        return false;
    };
    if coords.len() < 3 {
        return false;
    }

    let (x, y) = (point.x, point.y);
    let mut inside = false;
    let (mut x1, mut y1) = (last.x, last.y);

    for vertex in coords {
        let (x2, y2) = (vertex.x, vertex.y);

        if y1.min(y2) < y && y <= y1.max(y2) && x <= x1.max(x2) {
            // A horizontal edge cannot pass the y test, so y1 != y2 here
            // and the intersection is always defined.
            let x_intersection = (y - y1) * (x2 - x1) / (y2 - y1) + x1;
            if x1 == x2 || x <= x_intersection {
                inside = !inside;
            }
        }

        x1 = x2;
        y1 = y2;
    }

    inside
}
