//! HTTP handlers.
//!
//! Every core call is blocking file and repository I/O, so it runs on the blocking thread pool.

use crate::context::RequestContext;
use crate::dto::{HealthRes, ListingFormSchema, ListingRes, ListingsRes};
use crate::form::read_listing_form;
use crate::AppState;
use axum::{
    extract::{Multipart, Path as AxumPath, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use rently_core::{ListingError, ListingId, ListingResult, UserId};

type ApiError = (StatusCode, &'static str);

/// Maps a core error to a status code and a message safe to show to clients.
///
/// Server-side failures are logged in full and collapsed into one generic body.
pub(crate) fn error_response(err: ListingError) -> ApiError {
    match &err {
        ListingError::Validation(_) => {
            tracing::debug!("Rejected listing: {}", err);
            (StatusCode::BAD_REQUEST, "Invalid listing fields")
        }
        ListingError::UnknownVariant { .. } => {
            tracing::debug!("Rejected listing: {}", err);
            (StatusCode::BAD_REQUEST, "Unknown category or condition")
        }
        ListingError::InvalidInput(_) => {
            tracing::debug!("Rejected listing: {}", err);
            (StatusCode::BAD_REQUEST, "Invalid input")
        }
        ListingError::MalformedInput(_) => {
            tracing::debug!("Rejected listing: {}", err);
            (StatusCode::BAD_REQUEST, "Image file name has no extension")
        }
        ListingError::NotFound(_) => (StatusCode::NOT_FOUND, "Listing not found"),
        _ => {
            tracing::error!("Listing operation error: {:?}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ListingResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(error_response),
        Err(e) => {
            tracing::error!("Blocking listing task failed: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

fn parse_listing_id(raw: &str) -> Result<ListingId, ApiError> {
    raw.parse().map_err(|e| {
        tracing::debug!("Invalid listing id: {:?}", e);
        (StatusCode::BAD_REQUEST, "Invalid listing id")
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Rently REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/listings",
    request_body(content = ListingFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Listing created", body = ListingRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ListingRes>), ApiError> {
    let form = read_listing_form(multipart).await?;
    let image = form
        .image
        .ok_or((StatusCode::BAD_REQUEST, "Image is required"))?;
    let payload = form.payload;

    let manager = state.manager.clone();
    let view = run_blocking(move || {
        let listing = manager.create(&payload, &image)?;
        Ok(manager.view(&listing))
    })
    .await?;

    let ctx = RequestContext::from_headers(&headers, &state.fallback_authority);
    Ok((StatusCode::CREATED, Json(ListingRes::from_view(view, &ctx))))
}

#[utoipa::path(
    get,
    path = "/listings/{id}",
    params(("id" = u64, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing", body = ListingRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Listing not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_listing(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<ListingRes>, ApiError> {
    let id = parse_listing_id(&id)?;

    let manager = state.manager.clone();
    let view = run_blocking(move || manager.get(id).map(|l| manager.view(&l))).await?;

    let ctx = RequestContext::from_headers(&headers, &state.fallback_authority);
    Ok(Json(ListingRes::from_view(view, &ctx)))
}

#[utoipa::path(
    put,
    path = "/listings/{id}",
    params(("id" = u64, Path, description = "Listing id")),
    request_body(content = ListingFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Listing updated", body = ListingRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Listing not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_listing(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ListingRes>, ApiError> {
    let id = parse_listing_id(&id)?;
    let form = read_listing_form(multipart).await?;

    let manager = state.manager.clone();
    let view = run_blocking(move || {
        let listing = manager.update(id, &form.payload, form.image.as_ref())?;
        Ok(manager.view(&listing))
    })
    .await?;

    let ctx = RequestContext::from_headers(&headers, &state.fallback_authority);
    Ok(Json(ListingRes::from_view(view, &ctx)))
}

#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(("id" = u64, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Listing not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_listing(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_listing_id(&id)?;

    let manager = state.manager.clone();
    run_blocking(move || manager.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/listings/{id}/image",
    params(("id" = u64, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Image bytes, Content-Type from the detected media type"),
        (status = 404, description = "Listing or image not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_listing_image(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Response, ApiError> {
    let id = parse_listing_id(&id)?;

    let manager = state.manager.clone();
    let image = run_blocking(move || manager.read_image(id)).await?;

    let content_type = image.media_type.unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, content_type)], image.bytes).into_response())
}

#[utoipa::path(
    get,
    path = "/users/{id}/listings",
    params(("id" = u64, Path, description = "Owner user id")),
    responses(
        (status = 200, description = "Listings of the user, ordered by id", body = ListingsRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_user_listings(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<ListingsRes>, ApiError> {
    let owner: UserId = id.parse().map_err(|e| {
        tracing::debug!("Invalid user id: {:?}", e);
        (StatusCode::BAD_REQUEST, "Invalid user id")
    })?;

    let manager = state.manager.clone();
    let views = run_blocking(move || {
        let listings = manager.list_by_owner(owner)?;
        Ok(listings.iter().map(|l| manager.view(l)).collect::<Vec<_>>())
    })
    .await?;

    let ctx = RequestContext::from_headers(&headers, &state.fallback_authority);
    Ok(Json(ListingsRes {
        listings: views
            .into_iter()
            .map(|view| ListingRes::from_view(view, &ctx))
            .collect(),
    }))
}
