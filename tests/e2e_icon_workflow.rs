//! End-to-end workflow across the HTTP adapter and the material pipeline:
//! upload, preview, forge, expiry and shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use iconforge_api::{build_router, AppState, ServerConfig};
use iconforge_images::raster::{decode_rgba, encode_png};
use iconforge_images::{
    parse_icon_directory, BackgroundRemover, ForgeConfig, IconForge, ManualClock,
};
use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "e2e-boundary";

struct Harness {
    router: Router,
    forge: IconForge,
    clock: Arc<ManualClock>,
    _dir: TempDir,
}

fn harness(ttl_seconds: u64) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = ForgeConfig::default();
    config.storage.temp_dir = dir.path().join("materials");
    config.materials.ttl_seconds = ttl_seconds;

    let clock = Arc::new(ManualClock::new());
    let forge = IconForge::with_clock(
        &config,
        Arc::new(BackgroundRemover::new(&config.background)),
        clock.clone(),
    );
    let state = AppState::new(forge.clone(), ServerConfig::default()).unwrap();

    Harness {
        router: build_router(state),
        forge,
        clock,
        _dir: dir,
    }
}

fn form(parts: &[(&str, Option<&str>, &[u8])]) -> Body {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
                name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn post_form(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .unwrap()
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn decode_data_uri(value: &Value) -> RgbaImage {
    let uri = value.as_str().unwrap();
    let encoded = uri.strip_prefix("data:image/png;base64,").unwrap();
    decode_rgba(&STANDARD.decode(encoded).unwrap()).unwrap()
}

/// Blue logo on a flat white background.
fn logo_on_white() -> Vec<u8> {
    let mut image = RgbaImage::from_pixel(80, 60, Rgba([255, 255, 255, 255]));
    for x in 30..50 {
        for y in 20..40 {
            image.put_pixel(x, y, Rgba([20, 60, 200, 255]));
        }
    }
    encode_png(&image).unwrap()
}

#[tokio::test]
async fn test_full_icon_workflow() {
    let h = harness(3600);

    let (status, body) = call(
        &h.router,
        post_form(
            "/api/v1/materials/upload",
            form(&[("file", Some("logo.png"), &logo_on_white()[..])]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let material: Value = serde_json::from_slice(&body).unwrap();
    let id = material["material_id"].as_str().unwrap().to_string();

    // Background keyed out, so the crop hugs the logo: 20px extent, padding 2.
    assert_eq!(material["crop_box"], serde_json::json!([28, 18, 52, 42]));
    assert_eq!(material["expires_in"], 3600);
    let processed = decode_data_uri(&material["image_base64"]);
    assert_eq!(processed.dimensions(), (256, 256));
    assert_eq!(processed.get_pixel(128, 128)[3], 255);

    for (algo, size) in [("NEAREST", 32), ("BILINEAR", 48), ("LANCZOS", 32)] {
        let (status, body) = call(
            &h.router,
            get(&format!(
                "/api/v1/materials/{}/preview?algo={}&size={}",
                id, algo, size
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let preview: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            decode_data_uri(&preview["image_base64"]).dimensions(),
            (size, size)
        );
    }

    let tiny = encode_png(&RgbaImage::from_pixel(16, 16, Rgba([20, 60, 200, 255]))).unwrap();
    let (status, ico) = call(
        &h.router,
        post_form(
            "/api/v1/forge",
            form(&[
                ("source_id", None, id.as_bytes()),
                ("mid_algo", None, &b"LANCZOS"[..]),
                ("tiny_icon", Some("tiny.png"), &tiny[..]),
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let entries = parse_icon_directory(&ico).unwrap();
    assert_eq!(entries.len(), 4);
    let last = entries.last().unwrap();
    assert_eq!((last.offset + last.length) as usize, ico.len());

    // Forging reused the cached LANCZOS/32 preview and added LANCZOS/48.
    assert_eq!(h.forge.previews().len().await, 4);

    h.forge.shutdown().await;
    assert!(h.forge.store().is_empty().await);
    assert!(!h.forge.store().namespace(&id).exists());
}

#[tokio::test]
async fn test_expired_material_is_gone_over_http() {
    let h = harness(5);

    let (status, body) = call(
        &h.router,
        post_form(
            "/api/v1/materials/upload",
            form(&[("file", Some("logo.png"), &logo_on_white()[..])]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let material: Value = serde_json::from_slice(&body).unwrap();
    let id = material["material_id"].as_str().unwrap().to_string();

    h.clock.advance(Duration::from_secs(4));
    let (status, body) = call(&h.router, get(&format!("/api/v1/materials/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(refreshed["expires_in"], 5);

    h.clock.advance(Duration::from_secs(6));
    let (status, body) = call(
        &h.router,
        get(&format!("/api/v1/materials/{}/preview?algo=NEAREST", id)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let problem: Value = serde_json::from_slice(&body).unwrap();
    assert!(problem["detail"].as_str().unwrap().contains(&id));
    assert!(!h.forge.store().namespace(&id).exists());
}
