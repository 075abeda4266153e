//! File naming helpers for stored images.

use crate::{FilesError, FilesResult};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of names produced by [`generate_random_name`].
pub const RANDOM_NAME_LEN: usize = 12;

/// Generates a random base file name.
///
/// The name is [`RANDOM_NAME_LEN`] characters drawn uniformly from `[A-Za-z0-9]`.
///
/// The generator is not cryptographically secure and names are not checked for uniqueness.
/// With 62^12 possible names a collision inside one listing directory is negligible, and
/// [`MediaDir::save`](crate::MediaDir::save) refuses to overwrite, so a collision surfaces as
/// [`FilesError::FileAlreadyExists`] rather than as data loss.
pub fn generate_random_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_NAME_LEN)
        .map(char::from)
        .collect()
}

/// Returns the extension of an uploaded file name: everything after the last `.`.
///
/// # Errors
///
/// Returns [`FilesError::MalformedFileName`] if the name has no `.`, if nothing follows the
/// last `.`, or if the extension contains a path separator.
pub fn extension_of(original_filename: &str) -> FilesResult<&str> {
    let (_, extension) = original_filename
        .rsplit_once('.')
        .ok_or_else(|| FilesError::MalformedFileName(original_filename.to_owned()))?;

    if extension.is_empty() || extension.contains(|c: char| c == '/' || c == '\\') {
        return Err(FilesError::MalformedFileName(original_filename.to_owned()));
    }

    Ok(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_name_has_fixed_length_and_alphabet() {
        for _ in 0..100 {
            let name = generate_random_name();
            assert_eq!(name.len(), RANDOM_NAME_LEN);
            assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_random_names_differ() {
        let names: HashSet<String> = (0..50).map(|_| generate_random_name()).collect();
        assert_eq!(names.len(), 50);
    }

    #[test]
    fn test_extension_after_last_dot() {
        assert_eq!(extension_of("chair.jpg").unwrap(), "jpg");
        assert_eq!(extension_of("archive.tar.gz").unwrap(), "gz");
        assert_eq!(extension_of(".png").unwrap(), "png");
        assert_eq!(extension_of("C:\\Users\\me\\photo.JPEG").unwrap(), "JPEG");
    }

    #[test]
    fn test_extension_missing_is_malformed() {
        assert!(matches!(
            extension_of("photo"),
            Err(FilesError::MalformedFileName(_))
        ));
        assert!(matches!(
            extension_of("photo."),
            Err(FilesError::MalformedFileName(_))
        ));
        assert!(matches!(
            extension_of("dir.d/photo"),
            Err(FilesError::MalformedFileName(_))
        ));
    }
}
