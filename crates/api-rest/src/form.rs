//! Multipart listing form parsing.

use axum::extract::multipart::{Field, Multipart};
use axum::http::StatusCode;
use rently_core::{ImageUpload, ListingPayload, UserId};

type FormError = (StatusCode, &'static str);

/// Listing attributes plus the optional `image` part.
#[derive(Debug, Default)]
pub struct ListingForm {
    pub payload: ListingPayload,
    pub image: Option<ImageUpload>,
}

fn malformed(e: impl std::fmt::Display) -> FormError {
    tracing::debug!("rejecting multipart body: {}", e);
    (StatusCode::BAD_REQUEST, "Malformed multipart body")
}

async fn field_text(field: Field<'_>) -> Result<String, FormError> {
    field.text().await.map_err(malformed)
}

/// Reads every part of a listing form.
///
/// Unknown parts are ignored. An `image` part with no content counts as absent, which is what
/// browsers send when no file was chosen.
pub async fn read_listing_form(mut multipart: Multipart) -> Result<ListingForm, FormError> {
    let mut form = ListingForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_owned();
        let payload = &mut form.payload;

        match name.as_str() {
            "image" => {
                let original_filename = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(malformed)?;
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        original_filename,
                    });
                }
            }
            "owner_id" => {
                let text = field_text(field).await?;
                if !text.trim().is_empty() {
                    let owner = text
                        .parse::<UserId>()
                        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid owner id"))?;
                    payload.owner_id = Some(owner);
                }
            }
            "name" => payload.name = field_text(field).await?,
            "street" => payload.street = field_text(field).await?,
            "city" => payload.city = field_text(field).await?,
            "postal_code" => payload.postal_code = field_text(field).await?,
            "description" => payload.description = field_text(field).await?,
            "price" => payload.price = field_text(field).await?,
            "category" => payload.category = field_text(field).await?,
            "condition" => payload.condition = field_text(field).await?,
            "end_date" => payload.end_date = field_text(field).await?,
            other => tracing::debug!("ignoring unknown form field '{}'", other),
        }
    }

    Ok(form)
}
