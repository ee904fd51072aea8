use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Builds the full application router.
///
/// `max_upload_bytes` bounds the `/upload` request body; every other route
/// keeps axum's default limit.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/bundle/:id", get(handlers::bundle))
        .route("/bundle/:id/changelog", get(handlers::changelog))
        .route("/bundle/:id/qrcode", get(handlers::qrcode))
        .route("/bundle/:id/plist", get(handlers::plist))
        .route("/bundle/:id/download", get(handlers::download))
        .route("/bundle/:id/versions", get(handlers::versions))
        .route("/bundle/:id/versions/:version", get(handlers::builds))
        .route("/app/:file", get(handlers::app_file))
        .route("/icon/:file", get(handlers::icon_file))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use betadrop_artifacts::ArtifactStore;
    use betadrop_ingest::{IngestOrchestrator, PackageMetadata, PackageParser, ParseError};
    use betadrop_ota::{DistributionEncoder, PublicOrigin};
    use betadrop_store::{DownloadRecorder, Repository};
    use image::{DynamicImage, Rgba, RgbaImage};
    use tower::ServiceExt;

    use super::*;

    const BOUNDARY: &str = "betadrop-test-boundary";

    struct FixedParser;

    impl PackageParser for FixedParser {
        fn parse(&self, path: &Path) -> Result<PackageMetadata, ParseError> {
            Ok(PackageMetadata {
                name: "Demo".into(),
                bundle_id: "com.example.demo".into(),
                version: "1.0".into(),
                build: "1".into(),
                size_bytes: std::fs::metadata(path)?.len(),
                icon: DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]))),
            })
        }
    }

    struct TestApp {
        _dir: tempfile::TempDir,
        router: Router,
        repo: Arc<Repository>,
        recorder: DownloadRecorder,
    }

    fn app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(Repository::open_in_memory().unwrap());
        let artifacts = ArtifactStore::open(dir.path()).unwrap();
        let encoder = Arc::new(DistributionEncoder::new(
            PublicOrigin::parse("https://ota.example.com").unwrap(),
        ));
        let ingest = Arc::new(IngestOrchestrator::new(
            Arc::clone(&repo),
            artifacts.clone(),
            Arc::clone(&encoder),
            Arc::new(FixedParser),
        ));
        let (recorder, _worker) = DownloadRecorder::spawn(Arc::clone(&repo), 16);
        let state = AppState {
            repo: Arc::clone(&repo),
            encoder,
            artifacts,
            ingest,
            recorder: recorder.clone(),
        };
        TestApp {
            _dir: dir,
            router: router(state, 1024 * 1024),
            repo,
            recorder,
        }
    }

    fn multipart_body(file_name: &str, data: &[u8], changelog: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(text) = changelog {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"changelog\"\r\n\r\n{text}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn send(router: &Router, request: Request<Body>) -> axum::response::Response {
        router.clone().oneshot(request).await.unwrap()
    }

    async fn get(router: &Router, uri: &str) -> axum::response::Response {
        send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn upload(router: &Router, file_name: &str, changelog: Option<&str>) -> axum::response::Response {
        upload_bytes(router, file_name, b"fake package", changelog).await
    }

    async fn upload_bytes(
        router: &Router,
        file_name: &str,
        data: &[u8],
        changelog: Option<&str>,
    ) -> axum::response::Response {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(file_name, data, changelog)))
            .unwrap();
        send(router, request).await
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let t = app();
        let response = get(&t.router, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["bundles"], 0);
    }

    #[tokio::test]
    async fn upload_then_query() {
        let t = app();
        let response = upload(&t.router, "Demo.ipa", Some("line1\\nline2\\nline3\\nline4")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json(response).await;
        let id = payload["uuid"].as_str().unwrap().to_string();
        assert_eq!(payload["platform"], "ios");
        assert_eq!(payload["downloads"], 0);
        assert!(payload["installUrl"]
            .as_str()
            .unwrap()
            .starts_with("itms-services://"));

        let detail = json(get(&t.router, &format!("/bundle/{id}")).await).await;
        assert_eq!(detail["bundleId"], "com.example.demo");
        assert_eq!(detail["changelogPreview"].as_array().unwrap().len(), 3);
        assert_eq!(
            detail["changelogUrl"],
            format!("https://ota.example.com/bundle/{id}/changelog")
        );

        let changelog = json(get(&t.router, &format!("/bundle/{id}/changelog")).await).await;
        assert_eq!(changelog["lines"].as_array().unwrap().len(), 4);

        let versions = json(get(&t.router, &format!("/bundle/{id}/versions")).await).await;
        assert_eq!(versions["versions"][0]["version"], "1.0");

        let builds = json(get(&t.router, &format!("/bundle/{id}/versions/1.0")).await).await;
        assert_eq!(builds.as_array().unwrap().len(), 1);
        assert_eq!(builds[0]["uuid"], id.as_str());

        let missing = get(&t.router, &format!("/bundle/{id}/versions/9.9")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_rejects_unknown_extension() {
        let t = app();
        let response = upload(&t.router, "demo.zip", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_bundle_is_not_found() {
        let t = app();
        for uri in ["/bundle/Ab3dE9xYz0", "/bundle/..%2F..%2Fetc", "/bundle/Ab3dE9xYz0/plist"] {
            let response = get(&t.router, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn plist_served_for_ios_only() {
        let t = app();
        let ios = json(upload(&t.router, "demo.ipa", None).await).await;
        let android = json(upload(&t.router, "demo.apk", None).await).await;

        let response = get(&t.router, &format!("/bundle/{}/plist", ios["uuid"].as_str().unwrap())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-plist"
        );

        let response = get(
            &t.router,
            &format!("/bundle/{}/plist", android["uuid"].as_str().unwrap()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn qrcode_is_png() {
        let t = app();
        let payload = json(upload(&t.router, "demo.apk", None).await).await;
        let response = get(&t.router, &format!("/bundle/{}/qrcode", payload["uuid"].as_str().unwrap())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn download_redirects_and_counts() {
        let t = app();
        let payload = json(upload(&t.router, "demo.apk", None).await).await;
        let id = payload["uuid"].as_str().unwrap().to_string();

        let response = get(&t.router, &format!("/bundle/{id}/download")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            format!("https://ota.example.com/app/{id}.apk").as_str()
        );

        t.recorder.flush().await.unwrap();
        assert_eq!(t.repo.get(&id).unwrap().downloads, 1);
    }

    #[tokio::test]
    async fn static_files_are_served() {
        let t = app();
        let payload = json(upload(&t.router, "demo.apk", None).await).await;
        let id = payload["uuid"].as_str().unwrap();

        let package = get(&t.router, &format!("/app/{id}.apk")).await;
        assert_eq!(package.status(), StatusCode::OK);
        assert_eq!(
            package.headers()[header::CONTENT_TYPE],
            "application/vnd.android.package-archive"
        );
        assert_eq!(package.headers()[header::CONTENT_LENGTH], "12");
        let body = axum::body::to_bytes(package.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"fake package");

        let icon = get(&t.router, &format!("/icon/{id}.png")).await;
        assert_eq!(icon.status(), StatusCode::OK);

        let traversal = get(&t.router, "/icon/..%2Fapp%2Fx.apk").await;
        assert_eq!(traversal.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn large_package_streams_intact() {
        let t = app();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let payload = json(upload_bytes(&t.router, "big.apk", &data, None).await).await;
        let id = payload["uuid"].as_str().unwrap();

        let response = get(&t.router, &format!("/app/{id}.apk")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], data.len().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.len(), data.len());
        assert!(body[..] == data[..]);
    }
}
