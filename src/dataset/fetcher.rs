//! Dataset fetcher for local files and remote URLs.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::error::{HazardError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; floodzone/0.1)";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where the hazard dataset comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSource {
    Url(Url),
    File(PathBuf),
}

impl DatasetSource {
    /// `http://` and `https://` locations are URLs, anything else a path
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => DatasetSource::Url(url),
            _ => DatasetSource::File(PathBuf::from(location)),
        }
    }
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetSource::Url(url) => write!(f, "{}", url),
            DatasetSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches and decodes the flood hazard dataset
pub struct DatasetFetcher {
    client: Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl DatasetFetcher {
    pub fn new(timeout: Duration, max_attempts: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            retry_delay: Duration::from_secs(2),
        })
    }

    /// Pause between download attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Fetch the dataset from `source` and split it into raw records
    pub async fn fetch(&self, source: &DatasetSource) -> Result<Vec<Value>> {
        info!("Loading flood data from: {}", source);

        let bytes = match source {
            DatasetSource::Url(url) => self.fetch_url(url).await?,
            DatasetSource::File(path) => tokio::fs::read(path).await?,
        };

        let features = decode_dataset(&bytes)?;
        info!("Successfully loaded {} flood zone records", features.len());
        Ok(features)
    }

    async fn fetch_url(&self, url: &Url) -> Result<Vec<u8>> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let failure = match self.client.get(url.clone()).send().await {
                // A body cut short counts as a failed attempt too
                Ok(response) if response.status().is_success() => match response.bytes().await {
                    Ok(body) => return Ok(body.to_vec()),
                    Err(e) => HazardError::Http(e),
                },
                Ok(response) => HazardError::dataset(format!(
                    "dataset request returned status {}",
                    response.status()
                )),
                Err(e) => HazardError::Http(e),
            };

            if attempts >= self.max_attempts {
                return Err(failure);
            }
            warn!(
                "Dataset download failed (attempt {}/{}): {}",
                attempts, self.max_attempts, failure
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

/// Decode a dataset payload, gunzipping it first when it carries the gzip magic
pub fn decode_dataset(bytes: &[u8]) -> Result<Vec<Value>> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut json)?;
        parse_dataset(&json)
    } else {
        parse_dataset(bytes)
    }
}

/// Parse a JSON array of hazard records.
///
/// Only the outer array is checked here; each record is decoded on its own
/// when the index is loaded.
pub fn parse_dataset(json: &[u8]) -> Result<Vec<Value>> {
    match serde_json::from_slice::<Value>(json)? {
        Value::Array(records) => Ok(records),
        _ => Err(HazardError::dataset("expected a JSON array of features")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const DATASET: &str = r#"[
        {
            "bounds": {"minx": -10, "miny": -10, "maxx": 10, "maxy": 10},
            "geometry": {"type": "Polygon", "coordinates": [[[-5, -5], [5, -5], [5, 5], [-5, 5]]]},
            "hazard": "HIGH",
            "source": "extra fields are ignored"
        },
        {
            "bounds": {"minx": 0, "miny": 0, "maxx": 0, "maxy": 0},
            "geometry": {"type": "Point", "coordinates": [0, 0]},
            "hazard": "LOW"
        }
    ]"#;

    #[test]
    fn test_parse_dataset() {
        let features = parse_dataset(DATASET.as_bytes()).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["hazard"], "HIGH");
        assert_eq!(features[1]["geometry"]["type"], "Point");
    }

    #[test]
    fn test_parse_dataset_keeps_mistyped_records() {
        let features = parse_dataset(br#"[null, {"hazard": 3}, {"hazard": "HIGH"}]"#).unwrap();
        assert_eq!(features.len(), 3);
        assert!(features[0].is_null());
    }

    #[test]
    fn test_parse_dataset_rejects_non_array() {
        let err = parse_dataset(br#"{"features": []}"#).unwrap_err();
        assert!(matches!(err, HazardError::Dataset(_)));

        let err = parse_dataset(b"not json").unwrap_err();
        assert!(matches!(err, HazardError::Json(_)));
    }

    #[test]
    fn test_decode_gzipped_dataset() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(DATASET.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let features = decode_dataset(&compressed).unwrap();
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn test_source_parse() {
        assert!(matches!(
            DatasetSource::parse("https://example.com/flood.json"),
            DatasetSource::Url(_)
        ));
        assert_eq!(
            DatasetSource::parse("data/flood.json"),
            DatasetSource::File(PathBuf::from("data/flood.json"))
        );
        assert!(matches!(
            DatasetSource::parse("C:/data/flood.json"),
            DatasetSource::File(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();

        let fetcher = DatasetFetcher::new(Duration::from_secs(5), 1).unwrap();
        let source = DatasetSource::File(file.path().to_path_buf());
        let features = fetcher.fetch(&source).await.unwrap();
        assert_eq!(features.len(), 2);
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                // Promise 1000 bytes, send 6, hang up
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nabcdef")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let fetcher = DatasetFetcher::new(Duration::from_secs(5), 3)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        let url = Url::parse(&format!("http://{}/flood.json", addr)).unwrap();
        let result = fetcher.fetch(&DatasetSource::Url(url)).await;

        assert!(matches!(result, Err(HazardError::Http(_))));
        assert_eq!(connections.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let fetcher = DatasetFetcher::new(Duration::from_secs(5), 1).unwrap();
        let source = DatasetSource::File(PathBuf::from("/nonexistent/flood.json"));
        assert!(matches!(
            fetcher.fetch(&source).await,
            Err(HazardError::Io(_))
        ));
    }
}
