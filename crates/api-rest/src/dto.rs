//! Request and response bodies.

use crate::context::RequestContext;
use rently_core::ListingView;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// A listing as returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingRes {
    pub id: u64,
    pub name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub description: String,
    /// Two fraction digits, `.` separator.
    pub price: String,
    pub category: String,
    pub condition: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
    pub owner_id: Option<u64>,
    /// Relative to the upload root.
    pub image_path: Option<String>,
    pub image_url: Option<String>,
}

impl ListingRes {
    pub fn from_view(view: ListingView, ctx: &RequestContext) -> Self {
        let image_url = view.image_path.as_deref().map(|path| ctx.image_url(path));
        let details = view.details;

        Self {
            id: view.id.get(),
            name: details.name,
            street: details.street,
            city: details.city.to_string(),
            postal_code: details.postal_code,
            description: details.description,
            price: details.price.to_string(),
            category: details.category.to_string(),
            condition: details.condition.to_string(),
            end_date: details.end_date.to_string(),
            owner_id: view.owner.map(u64::from),
            image_path: view.image_path,
            image_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingsRes {
    pub listings: Vec<ListingRes>,
}

/// Multipart form accepted by create and update.
///
/// `image` is required on create and optional on update.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ListingFormSchema {
    pub name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub condition: String,
    pub end_date: String,
    pub owner_id: Option<u64>,
    #[schema(value_type = String, format = Binary)]
    pub image: Option<Vec<u8>>,
}
