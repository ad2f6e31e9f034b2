//! HTTP Routes
//!
//! - `/upload`, `/uploadList`, `/getUrl`, `/down`, `/stat` - file upload and retrieval
//! - `/list`, `/removeObjects` - object listing and batch delete
//! - `/buckets`, `/buckets/{name}` - bucket listing and exists/create/remove
//! - `/api/health` - health check

pub mod buckets;
pub mod files;
pub mod health;
pub mod objects;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload_bytes = state.config.server.max_upload_bytes;
    let allowed_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(files::router(state.clone()))
        .merge(objects::router(state.clone()))
        .merge(buckets::router(state.clone()))
        .merge(health::router(state))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &allowed_origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::{MemoryStore, Storage};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-BRIDGE-BOUNDARY";

    fn app() -> Router {
        app_with(&[])
    }

    fn app_with(extra: &[(&str, &str)]) -> Router {
        let config = Config::from_lookup(|key| match key {
            "STORAGE_PROVIDER" => Some("memory".to_string()),
            "MINIO_ENDPOINT" => Some("http://minio.test:9000".to_string()),
            "MINIO_BUCKET_NAME" => Some("files".to_string()),
            _ => extra
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string()),
        })
        .unwrap();
        let store = Arc::new(MemoryStore::new(&config.storage.endpoint));
        let storage = Storage::new(store, &config.storage);
        create_router(AppState::new(config, storage))
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str),
    }

    fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match part {
                Part::Text(name, value) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    name, value
                )),
                Part::File(file_name, content_type, content) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n{}\r\n",
                    file_name, content_type, content
                )),
            }
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_text(response: Response) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let response = app()
            .oneshot(multipart_request(
                "/upload",
                &[
                    Part::Text("filePath", "docs/"),
                    Part::File("notes.txt", "text/plain", "hello"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let url = body_text(response).await;
        assert!(url.starts_with("http://minio.test:9000/files/docs/notes_"));
        assert!(url.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("hello world.txt", "text/plain", "file body")],
            ))
            .await
            .unwrap();
        let url = body_text(response).await;
        assert!(url.starts_with("http://minio.test:9000/files/hello%20world_"));
        let object_name = urlencoding::decode(
            url.strip_prefix("http://minio.test:9000/files/").unwrap(),
        )
        .unwrap()
        .into_owned();

        let response = app
            .oneshot(get(&format!(
                "/down?objectName={}",
                urlencoding::encode(&object_name)
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[header::CONTENT_LENGTH], "9");
        assert_eq!(headers[header::ACCESS_CONTROL_EXPOSE_HEADERS], "*");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
            format!("attachment;filename={}", urlencoding::encode(&object_name))
        );
        assert!(object_name.starts_with("hello world_"));
        assert_eq!(body_bytes(response).await, b"file body");
    }

    #[tokio::test]
    async fn test_upload_without_file_is_rejected() {
        let response = app()
            .oneshot(multipart_request("/upload", &[Part::Text("filePath", "docs/")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_list_returns_every_url() {
        let response = app()
            .oneshot(multipart_request(
                "/uploadList",
                &[
                    Part::File("a.csv", "text/csv", "1,2"),
                    Part::File("b.json", "application/json", "{}"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let urls = body_json(response).await;
        let urls = urls.as_array().unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0]
            .as_str()
            .unwrap()
            .starts_with("http://minio.test:9000/files/a_"));
        assert!(urls[1].as_str().unwrap().ends_with(".json"));
    }

    #[tokio::test]
    async fn test_download_missing_object_is_not_found() {
        let app = app();
        app.clone()
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("a.txt", "text/plain", "a")],
            ))
            .await
            .unwrap();

        let response = app.oneshot(get("/down?objectName=nope.txt")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("nope.txt"));
    }

    #[tokio::test]
    async fn test_get_url() {
        let app = app();

        let response = app
            .clone()
            .oneshot(get("/getUrl?objectName=report.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            "http://minio.test:9000/files/report.pdf?method=PUT&expires=3600"
        );

        let response = app
            .clone()
            .oneshot(get("/getUrl?objectName=report.pdf&method=get&expires=120"))
            .await
            .unwrap();
        assert!(body_text(response).await.ends_with("method=GET&expires=120"));

        let response = app
            .oneshot(get("/getUrl?objectName=report.pdf&method=post"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_and_remove_objects() {
        let app = app();
        app.clone()
            .oneshot(multipart_request(
                "/upload",
                &[
                    Part::Text("filePath", "img/"),
                    Part::File("cat.png", "image/png", "meow"),
                ],
            ))
            .await
            .unwrap();

        let response = app.clone().oneshot(get("/list?prefix=img/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listing = body_json(response).await;
        let entries = listing.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["size"], 4);
        let name = entries[0]["name"].as_str().unwrap().to_string();
        assert!(name.starts_with("img/cat_"));

        let request = Request::builder()
            .method("POST")
            .uri("/removeObjects")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "objects": [name, "img/missing.png"] }).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result = body_json(response).await;
        assert_eq!(result["removed"], 2);
        assert!(result["errors"].as_array().unwrap().is_empty());

        let response = app.clone().oneshot(get("/list")).await.unwrap();
        assert!(body_json(response).await.as_array().unwrap().is_empty());

        let request = Request::builder()
            .method("POST")
            .uri("/removeObjects")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "bucket": "no-such-bucket", "objects": ["a.txt"] })
                    .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result = body_json(response).await;
        assert_eq!(result["removed"], 0);
        assert_eq!(result["errors"][0]["object"], "a.txt");
    }

    #[tokio::test]
    async fn test_remove_objects_rejects_malformed_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/removeObjects")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"objects\": "))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let app = app();
        let request = |method: &str| {
            Request::builder()
                .method(method)
                .uri("/buckets/photos")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(request("GET")).await.unwrap();
        assert_eq!(body_json(response).await["exists"], false);

        let response = app.clone().oneshot(request("PUT")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.clone().oneshot(request("PUT")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app.clone().oneshot(request("DELETE")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(request("GET")).await.unwrap();
        assert_eq!(body_json(response).await["exists"], false);
    }

    #[tokio::test]
    async fn test_remove_non_empty_bucket_is_bad_request() {
        let app = app();
        app.clone()
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("a.txt", "text/plain", "a")],
            ))
            .await
            .unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri("/buckets/files")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("not empty"));
    }

    #[tokio::test]
    async fn test_list_buckets() {
        let app = app();
        app.clone()
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("a.txt", "text/plain", "a")],
            ))
            .await
            .unwrap();
        let request = Request::builder()
            .method("PUT")
            .uri("/buckets/archive")
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap();

        let response = app.oneshot(get("/buckets")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!(["archive", "files"])
        );
    }

    #[tokio::test]
    async fn test_health_reports_missing_bucket() {
        let response = app().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["storage"], "bucket missing");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let response = app_with(&[("MAX_UPLOAD_BYTES", "256")])
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("big.txt", "text/plain", &"x".repeat(4096))],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_upload_rejects_more_than_one_file() {
        let response = app()
            .oneshot(multipart_request(
                "/upload",
                &[
                    Part::File("a.txt", "text/plain", "a"),
                    Part::File("b.txt", "text/plain", "b"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file_name() {
        let response = app()
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("", "text/plain", "a")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_list_stops_at_first_bad_file() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/uploadList",
                &[
                    Part::File("a.txt", "text/plain", "a"),
                    Part::File("", "text/plain", "b"),
                    Part::File("c.txt", "text/plain", "c"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(get("/list")).await.unwrap();
        let listing = body_json(response).await;
        let names: Vec<&str> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("a_"));
    }

    #[tokio::test]
    async fn test_upload_path_from_query_string() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/upload?filePath=docs/",
                &[Part::File("notes.txt", "text/plain", "hello")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response)
            .await
            .starts_with("http://minio.test:9000/files/docs/notes_"));

        let response = app
            .oneshot(multipart_request(
                "/upload?filePath=docs/",
                &[
                    Part::Text("filePath", "img/"),
                    Part::File("cat.png", "image/png", "meow"),
                ],
            ))
            .await
            .unwrap();
        assert!(body_text(response)
            .await
            .starts_with("http://minio.test:9000/files/img/cat_"));
    }

    #[tokio::test]
    async fn test_bad_query_is_json_bad_request() {
        let app = app();

        let response = app.clone().oneshot(get("/getUrl")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert!(body_json(response).await["error"].is_string());

        let response = app
            .oneshot(get("/getUrl?objectName=a.txt&expires=soon"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_inline_download_keeps_content_type() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("page.html", "text/html", "<p>hi</p>")],
            ))
            .await
            .unwrap();
        let url = body_text(response).await;
        let object_name = url.strip_prefix("http://minio.test:9000/files/").unwrap();

        let response = app
            .oneshot(get(&format!("/down?objectName={}&inline=true", object_name)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("inline;filename="));
        assert_eq!(body_bytes(response).await, b"<p>hi</p>");
    }

    #[tokio::test]
    async fn test_stat_object() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/upload",
                &[Part::File("data.json", "application/json", "{\"a\":1}")],
            ))
            .await
            .unwrap();
        let url = body_text(response).await;
        let object_name = url.strip_prefix("http://minio.test:9000/files/").unwrap();

        let response = app
            .clone()
            .oneshot(get(&format!("/stat?objectName={}", object_name)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["bucket"], "files");
        assert_eq!(json["name"], object_name);
        assert_eq!(json["size"], 7);
        assert_eq!(json["content_type"], "application/json");

        let response = app
            .oneshot(get("/stat?objectName=missing.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
