//! Listing data model.
//!
//! [`ListingPayload`] carries attributes exactly as received from a form or command line.
//! [`ListingDetails`] is the parsed, typed form stored in a [`Listing`] record.

use crate::paths::ListingMediaDir;
use crate::{ListingError, ListingResult};
use chrono::NaiveDate;
use rently_types::{ListingId, NonEmptyText, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parses `value` against a closed set of variants, ignoring case and accepting `-` or a space
/// in place of `_`.
fn parse_variant<T: Copy>(
    kind: &'static str,
    all: &[T],
    as_str: fn(&T) -> &'static str,
    value: &str,
) -> ListingResult<T> {
    let normalized = value.trim().replace(|c: char| c == '-' || c == ' ', "_");
    all.iter()
        .find(|variant| as_str(*variant).eq_ignore_ascii_case(&normalized))
        .copied()
        .ok_or_else(|| ListingError::UnknownVariant {
            kind,
            value: value.to_owned(),
        })
}

/// Listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Electronics,
    Furniture,
    Books,
    Sports,
    Clothing,
    Vehicles,
    Tools,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Electronics,
        Category::Furniture,
        Category::Books,
        Category::Sports,
        Category::Clothing,
        Category::Vehicles,
        Category::Tools,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "ELECTRONICS",
            Category::Furniture => "FURNITURE",
            Category::Books => "BOOKS",
            Category::Sports => "SPORTS",
            Category::Clothing => "CLOTHING",
            Category::Vehicles => "VEHICLES",
            Category::Tools => "TOOLS",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("category", &Self::ALL, Self::as_str, s)
    }
}

/// Condition of the listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "NEW",
            Condition::LikeNew => "LIKE_NEW",
            Condition::Good => "GOOD",
            Condition::Fair => "FAIR",
            Condition::Poor => "POOR",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("condition", &Self::ALL, Self::as_str, s)
    }
}

/// A positive price with exactly two fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(Decimal);

impl Price {
    /// Parses a price, accepting `,` as the decimal separator.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidInput`] if the value is not a number, is not positive or
    /// has more than two fraction digits.
    pub fn parse(input: &str) -> ListingResult<Self> {
        let normalized = input.trim().replace(',', ".");
        let mut amount = Decimal::from_str(&normalized)
            .map_err(|e| ListingError::InvalidInput(format!("price '{}': {}", input, e)))?;

        if amount <= Decimal::ZERO {
            return Err(ListingError::InvalidInput(format!(
                "price '{}' must be positive",
                input
            )));
        }
        if amount.scale() > 2 {
            return Err(ListingError::InvalidInput(format!(
                "price '{}' has more than two fraction digits",
                input
            )));
        }

        amount.rescale(2);
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Price {
    type Error = ListingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Price> for String {
    fn from(price: Price) -> String {
        price.to_string()
    }
}

/// Typed, validated listing attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub name: String,
    pub street: String,
    pub city: NonEmptyText,
    pub postal_code: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub condition: Condition,
    pub end_date: NaiveDate,
}

/// A stored listing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    #[serde(flatten)]
    pub details: ListingDetails,
    #[serde(default)]
    pub owner: Option<UserId>,
    /// File name (not path) of the listing's image inside its media directory.
    #[serde(default)]
    pub image: Option<String>,
}

/// A listing that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
    pub details: ListingDetails,
    pub owner: Option<UserId>,
}

/// Listing attributes as received, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPayload {
    pub name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub condition: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

impl ListingPayload {
    /// Parses the typed attributes.
    ///
    /// Pattern validation is separate; see [`crate::validation::validate_listing_fields`].
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::UnknownVariant`] for an unknown category or condition and
    /// [`ListingError::InvalidInput`] for a bad city, price or end date.
    pub fn parse_details(&self) -> ListingResult<ListingDetails> {
        let end_date = NaiveDate::parse_from_str(self.end_date.trim(), "%Y-%m-%d").map_err(|e| {
            ListingError::InvalidInput(format!("end_date '{}': {}", self.end_date, e))
        })?;

        Ok(ListingDetails {
            name: self.name.clone(),
            street: self.street.clone(),
            city: NonEmptyText::new(&self.city)?,
            postal_code: self.postal_code.clone(),
            description: self.description.clone(),
            price: Price::parse(&self.price)?,
            category: self.category.parse()?,
            condition: self.condition.parse()?,
            end_date,
        })
    }
}

/// Uploaded image bytes and the name the client gave the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub original_filename: String,
}

/// Read-side projection of a listing.
///
/// `image_path` is relative to the upload root; turning it into a URL is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingView {
    pub id: ListingId,
    #[serde(flatten)]
    pub details: ListingDetails,
    pub owner: Option<UserId>,
    pub image_path: Option<String>,
}

impl From<&Listing> for ListingView {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id,
            details: listing.details.clone(),
            owner: listing.owner,
            image_path: listing
                .image
                .as_deref()
                .map(|name| ListingMediaDir::relative_file(listing.id, name)),
        }
    }
}

/// A user from the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: NonEmptyText,
}
