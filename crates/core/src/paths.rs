//! Typed path construction for listing media.
//!
//! No I/O happens here; see `rently_files` for the store itself.

use rently_types::ListingId;
use std::path::PathBuf;

/// Per-listing media directories, relative to the upload root.
pub struct ListingMediaDir;

impl ListingMediaDir {
    pub const NAME: &'static str = "annunci";

    /// `annunci/<id>`
    pub fn relative(id: ListingId) -> PathBuf {
        PathBuf::from(Self::NAME).join(id.to_string())
    }

    /// `annunci/<id>/<file_name>`, always `/`-separated so it can be embedded in a URL.
    pub fn relative_file(id: ListingId, file_name: &str) -> String {
        format!("{}/{}/{}", Self::NAME, id, file_name)
    }
}
