//! Shared helpers for runtime integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use emoji_runtime::{FetchError, FetchResult, ImageTransport, StateChange};
use tokio::sync::{broadcast, watch};
use url::Url;

/// Encode a blank RGBA image of the given size as PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub fn url(s: &str) -> Url {
    Url::parse(s).expect("valid url")
}

/// Transport whose fetches block until the test releases them.
#[derive(Default)]
pub struct GatedTransport {
    gates: Mutex<HashMap<String, watch::Sender<Option<Vec<u8>>>>>,
    requested: Mutex<Vec<String>>,
}

impl GatedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn gate(&self, uri: &str) -> watch::Receiver<Option<Vec<u8>>> {
        let mut gates = self.gates.lock().expect("lock");
        gates
            .entry(uri.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Let every pending and future fetch of `uri` finish with `bytes`.
    pub fn release(&self, uri: &Url, bytes: Vec<u8>) {
        let mut gates = self.gates.lock().expect("lock");
        gates
            .entry(uri.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(bytes));
    }

    /// URIs fetched so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ImageTransport for GatedTransport {
    async fn fetch(&self, uri: &Url) -> FetchResult<Vec<u8>> {
        self.requested.lock().expect("lock").push(uri.to_string());
        let mut gate = self.gate(uri.as_str());
        let bytes = gate
            .wait_for(Option::is_some)
            .await
            .map_err(|_| FetchError::Timeout)?
            .clone();
        bytes.ok_or(FetchError::Timeout)
    }
}

/// Receive changes until one matches, failing after five seconds.
pub async fn wait_for_change(
    rx: &mut broadcast::Receiver<StateChange>,
    mut predicate: impl FnMut(&StateChange) -> bool,
) -> StateChange {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(change) if predicate(&change) => return change,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for change")
}
