//! # API REST
//!
//! REST API implementation for Rently.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (multipart forms, absolute image URLs, CORS)
//! - Read-only serving of the upload root under `/uploads`
//!
//! All listing semantics live in `rently-core`; this crate only translates requests and errors.

#![warn(rust_2018_idioms)]

pub mod context;
pub mod dto;
pub mod form;
mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use rently_core::ListingManager;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use dto::{HealthRes, ListingFormSchema, ListingRes, ListingsRes};

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state for the REST API server
///
/// Shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    manager: Arc<ListingManager>,
    fallback_authority: String,
}

impl AppState {
    /// `fallback_authority` is used as `host:port` for image URLs when a request carries no
    /// `Host` header; pass the bind address.
    pub fn new(manager: Arc<ListingManager>, fallback_authority: impl Into<String>) -> Self {
        Self {
            manager,
            fallback_authority: fallback_authority.into(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_listing,
        handlers::get_listing,
        handlers::update_listing,
        handlers::delete_listing,
        handlers::get_listing_image,
        handlers::list_user_listings,
    ),
    components(schemas(HealthRes, ListingRes, ListingsRes, ListingFormSchema))
)]
pub struct ApiDoc;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.manager.config().upload_root());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/listings", post(handlers::create_listing))
        .route(
            "/listings/:id",
            get(handlers::get_listing)
                .put(handlers::update_listing)
                .delete(handlers::delete_listing),
        )
        .route("/listings/:id/image", get(handlers::get_listing_image))
        .route("/users/:id/listings", get(handlers::list_user_listings))
        .nest_service("/uploads", uploads)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the router on `addr` until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Starting Rently REST API on {}", addr);
    axum::serve(listener, router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use rently_core::repositories::{InMemoryListingRepository, InMemoryUserDirectory};
    use rently_core::{CoreConfig, NonEmptyText, User, UserId};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "rently-test-boundary";
    const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn setup() -> (TempDir, Router) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(
            CoreConfig::new(temp.path().join("uploads"), temp.path().join("data"))
                .expect("CoreConfig::new should succeed"),
        );
        let users = InMemoryUserDirectory::with_users([User {
            id: UserId::new(1).unwrap(),
            username: NonEmptyText::new("mario").unwrap(),
        }]);
        let manager = Arc::new(ListingManager::new(
            cfg,
            Arc::new(InMemoryListingRepository::new()),
            Arc::new(users),
        ));
        let app = router(AppState::new(manager, "127.0.0.1:3000"));
        (temp, app)
    }

    fn sedia_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("name", "Sedia"),
            ("street", "Via Roma 12"),
            ("city", "Salerno"),
            ("postal_code", "84100"),
            ("description", "Sedia in legno"),
            ("price", "49.99"),
            ("category", "FURNITURE"),
            ("condition", "GOOD"),
            ("end_date", "2030-01-31"),
            ("owner_id", "1"),
        ]
    }

    fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "rently.example:8080")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_sedia(app: &Router) -> Value {
        let body = multipart_body(&sedia_fields(), Some(("chair.jpg", JPEG_BYTES)));
        let response = app
            .clone()
            .oneshot(multipart_request("POST", "/listings", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let (_temp, app) = setup();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ok"], true);
    }

    #[tokio::test]
    async fn test_create_returns_absolute_image_url() {
        let (_temp, app) = setup();
        let json = create_sedia(&app).await;

        assert_eq!(json["id"], 1);
        assert_eq!(json["price"], "49.99");
        assert_eq!(json["owner_id"], 1);

        let image_path = json["image_path"].as_str().unwrap();
        assert!(image_path.starts_with("annunci/1/"));
        assert!(image_path.ends_with(".jpg"));
        assert_eq!(
            json["image_url"],
            format!("http://rently.example:8080/uploads/{}", image_path)
        );
    }

    #[tokio::test]
    async fn test_uploaded_image_is_served() {
        let (_temp, app) = setup();
        let json = create_sedia(&app).await;
        let image_path = json["image_path"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/uploads/{}", image_path))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/listings/1/image")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "image/jpeg"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], JPEG_BYTES);
    }

    #[tokio::test]
    async fn test_create_invalid_price_is_bad_request() {
        let (temp, app) = setup();
        let mut fields = sedia_fields();
        fields.retain(|(name, _)| *name != "price");
        fields.push(("price", "abc"));

        let body = multipart_body(&fields, Some(("chair.jpg", JPEG_BYTES)));
        let response = app
            .oneshot(multipart_request("POST", "/listings", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!temp.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_create_without_image_is_bad_request() {
        let (_temp, app) = setup();
        let body = multipart_body(&sedia_fields(), None);
        let response = app
            .oneshot(multipart_request("POST", "/listings", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_list_by_owner() {
        let (_temp, app) = setup();
        let created = create_sedia(&app).await;

        let mut fields = sedia_fields();
        fields.retain(|(name, _)| *name != "name");
        fields.push(("name", "Sedia rossa"));
        let body = multipart_body(&fields, None);
        let response = app
            .clone()
            .oneshot(multipart_request("PUT", "/listings/1", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = json_body(response).await;
        assert_eq!(updated["name"], "Sedia rossa");
        assert_eq!(updated["image_path"], created["image_path"]);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/users/1/listings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["listings"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (_temp, app) = setup();
        create_sedia(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/listings/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        for method in ["GET", "DELETE"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/listings/1")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let (_temp, app) = setup();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/listings/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
