//! Transports that turn a background reference into raw bytes.
//!
//! Supports `http`/`https` via reqwest, local `file` URIs, and inline
//! `data:` URIs (base64 or percent-encoded).

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};

/// Asynchronous source of background image bytes.
#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Retrieve the bytes at `uri`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing why the bytes are unavailable.
    async fn fetch(&self, uri: &Url) -> FetchResult<Vec<u8>>;
}

/// Transport dispatching on the URI scheme.
#[derive(Debug, Clone)]
pub struct DefaultTransport {
    http: Client,
    config: FetchConfig,
}

impl DefaultTransport {
    /// Create a transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client fails to build.
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        let http = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { http, config })
    }

    async fn fetch_http(&self, uri: &Url) -> FetchResult<Vec<u8>> {
        let response = self.http.get(uri.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                uri: uri.to_string(),
            });
        }
        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.config.max_bytes {
                return Err(FetchError::TooLarge(length));
            }
        }
        let bytes = response.bytes().await?;
        self.check_size(bytes.len())?;
        Ok(bytes.to_vec())
    }

    async fn fetch_file(&self, uri: &Url) -> FetchResult<Vec<u8>> {
        let path = uri.to_file_path().map_err(|()| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a local file path: {uri}"),
            )
        })?;
        let bytes = tokio::fs::read(&path).await?;
        self.check_size(bytes.len())?;
        Ok(bytes)
    }

    fn check_size(&self, len: usize) -> FetchResult<()> {
        if len > self.config.max_bytes {
            return Err(FetchError::TooLarge(len));
        }
        Ok(())
    }
}

#[async_trait]
impl ImageTransport for DefaultTransport {
    async fn fetch(&self, uri: &Url) -> FetchResult<Vec<u8>> {
        let fetch = async {
            match uri.scheme() {
                "http" | "https" => self.fetch_http(uri).await,
                "file" => self.fetch_file(uri).await,
                "data" => {
                    let bytes = decode_data_uri(uri.as_str())?;
                    self.check_size(bytes.len())?;
                    Ok(bytes)
                }
                other => Err(FetchError::UnsupportedScheme(other.to_string())),
            }
        };
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| FetchError::Timeout)?,
            None => fetch.await,
        }
    }
}

/// Decode the payload of a `data:` URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns [`FetchError::InvalidDataUri`] if the URI is malformed.
pub fn decode_data_uri(uri: &str) -> FetchResult<Vec<u8>> {
    let Some(uri_data) = uri.strip_prefix("data:") else {
        return Err(FetchError::InvalidDataUri("not a data URI".to_string()));
    };

    let (metadata, encoded) = uri_data
        .split_once(',')
        .ok_or_else(|| FetchError::InvalidDataUri("missing comma".to_string()))?;

    if metadata.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| FetchError::InvalidDataUri(format!("bad base64: {e}")))
    } else {
        percent_decode(encoded)
    }
}

/// Simple URL decoding (percent-encoding).
fn percent_decode(input: &str) -> FetchResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| FetchError::InvalidDataUri("invalid percent encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}
