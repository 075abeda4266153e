use crate::repositories::RepositoryError;
use rently_files::FilesError;
use rently_types::{ListingId, TextError};

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("invalid listing fields: {}", .0.join(", "))]
    Validation(Vec<&'static str>),
    #[error("listing {0} not found")]
    NotFound(ListingId),
    #[error("unknown {kind}: '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("failed to initialise media directory: {0}")]
    StorageInit(#[source] FilesError),
    #[error("failed to store image: {0}")]
    StorageWrite(#[source] FilesError),
    #[error("failed to read image: {0}")]
    StorageRead(#[source] FilesError),
    #[error("failed to remove media directory: {0}")]
    StorageDelete(#[source] FilesError),
    #[error("repository error: {0}")]
    Repository(#[source] RepositoryError),
    #[error(
        "create of listing {id} failed and cleanup also failed (path: {path}): create={create_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterCreateFailed {
        id: ListingId,
        path: std::path::PathBuf,
        #[source]
        create_error: Box<ListingError>,
        cleanup_error: Box<ListingError>,
    },
}

impl ListingError {
    /// Returns true for errors caused by the caller's input rather than by storage or a
    /// collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ListingError::Validation(_)
                | ListingError::UnknownVariant { .. }
                | ListingError::InvalidInput(_)
                | ListingError::MalformedInput(_)
        )
    }
}

impl From<RepositoryError> for ListingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ListingError::NotFound(id),
            other => ListingError::Repository(other),
        }
    }
}

impl From<TextError> for ListingError {
    fn from(err: TextError) -> Self {
        ListingError::InvalidInput(err.to_string())
    }
}

pub type ListingResult<T> = std::result::Result<T, ListingError>;
