//! HTTP background fetching against a mock server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{png, url, wait_for_change};
use emoji_runtime::{
    ChangeKind, ControllerConfig, DefaultTransport, DocumentController, DocumentHandle,
    FetchConfig, FetchError, FetchState, ImageTransport,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve_png(server: &MockServer, route: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(bytes),
        )
        .mount(server)
        .await;
}

fn transport(config: FetchConfig) -> DefaultTransport {
    DefaultTransport::new(config).expect("transport")
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn fetches_image_bytes() {
    let server = MockServer::start().await;
    serve_png(&server, "/bg.png", png(4, 3)).await;

    let uri = url(&format!("{}/bg.png", server.uri()));
    let bytes = transport(FetchConfig::default())
        .fetch(&uri)
        .await
        .expect("fetch");
    assert_eq!(bytes, png(4, 3));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let uri = url(&format!("{}/missing.png", server.uri()));
    let result = transport(FetchConfig::default()).fetch(&uri).await;
    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn oversized_response_is_rejected() {
    let server = MockServer::start().await;
    serve_png(&server, "/big.png", vec![0u8; 1024]).await;

    let config = FetchConfig {
        max_bytes: 512,
        ..FetchConfig::default()
    };
    let uri = url(&format!("{}/big.png", server.uri()));
    let result = transport(config).fetch(&uri).await;
    assert!(matches!(result, Err(FetchError::TooLarge(_))));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png(1, 1))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = FetchConfig {
        timeout: Some(Duration::from_millis(100)),
        ..FetchConfig::default()
    };
    let uri = url(&format!("{}/slow.png", server.uri()));
    let result = transport(config).fetch(&uri).await;
    assert!(matches!(result, Err(FetchError::Timeout)));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn document_displays_fetched_background() {
    let server = MockServer::start().await;
    serve_png(&server, "/bg.png", png(8, 6)).await;

    let (controller, completions) = DocumentController::new(
        Arc::new(transport(FetchConfig::default())),
        &ControllerConfig::default(),
    );
    let (handle, task) = DocumentHandle::spawn(controller, completions, 8);
    let mut rx = handle.subscribe();

    let uri = url(&format!("{}/bg.png", server.uri()));
    handle
        .set_background_reference(Some(uri.clone()))
        .await
        .expect("set");
    let loaded = wait_for_change(&mut rx, |c| c.kind == ChangeKind::Background).await;
    assert_eq!(loaded.snapshot.fetch_state, FetchState::Loaded { uri });
    let image = loaded.snapshot.background.as_ref().expect("image");
    assert_eq!((image.width, image.height), (8, 6));

    assert!(handle
        .zoom_to_background(emoji_core::Size::new(400.0, 600.0))
        .await
        .expect("zoom"));
    let snapshot = handle.snapshot().await.expect("snapshot");
    assert!((snapshot.viewport.zoom_scale() - 50.0).abs() < f64::EPSILON);

    drop(handle);
    task.join().await.expect("join");
}
