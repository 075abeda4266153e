//! Listing field validation.
//!
//! The validator is pure: it takes `(value, pattern)` entries and answers whether every value
//! fully matches its pattern. It never mutates anything, so workflows call it before the first
//! write.

use crate::constants::{MAX_DESCRIPTION_CHARS, MAX_NAME_CHARS};
use crate::listing::ListingPayload;
use crate::{ListingError, ListingResult};
use regex::Regex;
use std::sync::LazyLock;

/// Accented letters accepted in free-text fields.
const ACCENTED: &str = "èéòàùìÀÈÉÌÒÙ";

/// An anchored pattern plus an optional upper bound on the number of characters.
///
/// Length bounds are checked separately from the regex so that long repetition counts do not
/// have to be compiled into the automaton.
#[derive(Debug)]
pub struct FieldPattern {
    regex: Regex,
    max_chars: Option<usize>,
}

impl FieldPattern {
    /// Compiles `pattern`, which must be anchored with `^...$`.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error unchanged.
    pub fn new(pattern: &str, max_chars: Option<usize>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            max_chars,
        })
    }

    /// Returns true if the whole of `value` matches.
    pub fn is_match(&self, value: &str) -> bool {
        let within_bound = self
            .max_chars
            .map_or(true, |max| value.chars().count() <= max);
        within_bound && self.regex.is_match(value)
    }
}

fn compile(pattern: String, max_chars: Option<usize>) -> FieldPattern {
    FieldPattern::new(&pattern, max_chars).expect("built-in field pattern is valid")
}

/// Letters, digits, whitespace and `.,:;'-`, 1 to 1023 characters.
pub static DESCRIPTION: LazyLock<FieldPattern> = LazyLock::new(|| {
    compile(
        format!(r"^[\sa-zA-Z0-9.,:;'\-{ACCENTED}]+$"),
        Some(MAX_DESCRIPTION_CHARS),
    )
});

/// Same character class as [`DESCRIPTION`], with no upper bound.
pub static STREET: LazyLock<FieldPattern> =
    LazyLock::new(|| compile(format!(r"^[\sa-zA-Z0-9.,:;'\-{ACCENTED}]+$"), None));

/// Exactly five digits.
pub static POSTAL_CODE: LazyLock<FieldPattern> =
    LazyLock::new(|| compile(r"^[0-9]{5}$".to_owned(), None));

/// Letters, digits, whitespace and `.,'`, 1 to 100 characters.
pub static NAME: LazyLock<FieldPattern> = LazyLock::new(|| {
    compile(
        format!(r"^[\sa-zA-Z0-9.,'{ACCENTED}]+$"),
        Some(MAX_NAME_CHARS),
    )
});

/// Up to ten integer digits, `.` or `,`, exactly two fraction digits.
pub static PRICE: LazyLock<FieldPattern> =
    LazyLock::new(|| compile(r"^[0-9]{1,10}[.,][0-9]{2}$".to_owned(), None));

/// Returns true only if every value fully matches its pattern.
///
/// An empty sequence is vacuously valid.
pub fn all_match<'a, I>(entries: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a FieldPattern)>,
{
    entries
        .into_iter()
        .all(|(value, pattern)| pattern.is_match(value))
}

/// The five validated listing fields, paired with their field names and patterns.
pub fn listing_field_checks(payload: &ListingPayload) -> [(&'static str, &str, &FieldPattern); 5] {
    [
        ("description", payload.description.as_str(), &*DESCRIPTION),
        ("street", payload.street.as_str(), &*STREET),
        ("postal_code", payload.postal_code.as_str(), &*POSTAL_CODE),
        ("name", payload.name.as_str(), &*NAME),
        ("price", payload.price.as_str(), &*PRICE),
    ]
}

/// Validates the pattern-checked fields of a listing payload.
///
/// # Errors
///
/// Returns [`ListingError::Validation`] naming every field that failed.
pub fn validate_listing_fields(payload: &ListingPayload) -> ListingResult<()> {
    let checks = listing_field_checks(payload);

    if all_match(checks.iter().map(|(_, value, pattern)| (*value, *pattern))) {
        return Ok(());
    }

    let failed: Vec<&'static str> = checks
        .iter()
        .filter(|(_, value, pattern)| !pattern.is_match(value))
        .map(|(field, _, _)| *field)
        .collect();

    tracing::debug!("listing validation failed for fields: {:?}", failed);
    Err(ListingError::Validation(failed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> ListingPayload {
        ListingPayload {
            name: "Sedia".into(),
            street: "Via Roma, 12".into(),
            city: "Salerno".into(),
            postal_code: "84100".into(),
            description: "Sedia in legno, ottime condizioni.".into(),
            price: "49.99".into(),
            category: "FURNITURE".into(),
            condition: "GOOD".into(),
            end_date: "2030-01-31".into(),
            owner_id: None,
        }
    }

    #[test]
    fn test_all_match_empty_is_true() {
        assert!(all_match(std::iter::empty::<(&str, &FieldPattern)>()));
    }

    #[test]
    fn test_all_match_is_conjunction() {
        assert!(all_match([("84100", &*POSTAL_CODE), ("49,99", &*PRICE)]));
        assert!(!all_match([("84100", &*POSTAL_CODE), ("abc", &*PRICE)]));
        assert!(!all_match([("8410", &*POSTAL_CODE), ("49.99", &*PRICE)]));
    }

    #[test]
    fn test_description_accepts_accents_and_punctuation() {
        assert!(DESCRIPTION.is_match("Perché è così: bella; d'epoca - ottima."));
        assert!(DESCRIPTION.is_match(&"a".repeat(MAX_DESCRIPTION_CHARS)));
    }

    #[test]
    fn test_description_rejects_bad_input() {
        assert!(!DESCRIPTION.is_match(""));
        assert!(!DESCRIPTION.is_match("no <html> allowed"));
        assert!(!DESCRIPTION.is_match("price: 10€"));
        assert!(!DESCRIPTION.is_match(&"a".repeat(MAX_DESCRIPTION_CHARS + 1)));
    }

    #[test]
    fn test_name_is_narrower_than_description() {
        assert!(NAME.is_match("Sedia d'epoca, anni 60."));
        assert!(!NAME.is_match("Sedia - rossa"));
        assert!(!NAME.is_match("Sedia: rossa"));
        assert!(!NAME.is_match("Sedia; rossa"));
        assert!(NAME.is_match(&"x".repeat(MAX_NAME_CHARS)));
        assert!(!NAME.is_match(&"x".repeat(MAX_NAME_CHARS + 1)));
    }

    #[test]
    fn test_street_has_no_upper_bound() {
        assert!(STREET.is_match(&"a".repeat(MAX_DESCRIPTION_CHARS * 2)));
        assert!(!STREET.is_match(""));
    }

    #[test]
    fn test_postal_code_exactly_five_digits() {
        assert!(POSTAL_CODE.is_match("00100"));
        assert!(!POSTAL_CODE.is_match("001000"));
        assert!(!POSTAL_CODE.is_match("0010a"));
        assert!(!POSTAL_CODE.is_match("84100\n"));
    }

    #[test]
    fn test_price_format() {
        assert!(PRICE.is_match("49.99"));
        assert!(PRICE.is_match("49,99"));
        assert!(PRICE.is_match("1234567890.00"));
        assert!(!PRICE.is_match("12345678901.00"));
        assert!(!PRICE.is_match("49.9"));
        assert!(!PRICE.is_match("49"));
        assert!(!PRICE.is_match("abc"));
        assert!(!PRICE.is_match("-1.00"));
    }

    #[test]
    fn test_validate_listing_fields_ok() {
        validate_listing_fields(&valid_payload()).expect("payload should be valid");
    }

    #[test]
    fn test_validate_listing_fields_reports_every_failure() {
        let mut payload = valid_payload();
        payload.price = "abc".into();
        payload.postal_code = "841".into();

        match validate_listing_fields(&payload) {
            Err(ListingError::Validation(fields)) => {
                assert_eq!(fields, vec!["postal_code", "price"]);
            }
            other => panic!("expected Validation error, got {:?}", other),
        }
    }
}
