//! # Rently Core
//!
//! Core business logic for Rently listings.
//!
//! This crate keeps listing records and their images consistent:
//! - Field validation before any mutation
//! - Create, update, delete and read workflows over a listing repository and the media store
//! - A consistency audit that reports, but never repairs, record/file mismatches
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and
//! `rently-cli`.

pub mod audit;
pub mod config;
pub mod constants;
pub mod error;
pub mod listing;
pub mod locks;
pub mod manager;
pub mod paths;
pub mod repositories;
pub mod validation;

pub use audit::Inconsistency;
pub use config::{path_from_env_value, CoreConfig};
pub use error::{ListingError, ListingResult};
pub use listing::{
    Category, Condition, ImageUpload, Listing, ListingDetails, ListingPayload, ListingView,
    NewListing, Price, User,
};
pub use manager::{ImageContent, ListingManager};
pub use repositories::{ListingRepository, RepositoryError, RepositoryResult, UserDirectory};

pub use rently_types::{ListingId, NonEmptyText, TextError, UserId};
