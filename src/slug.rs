//! Slug normalization. A post's slug is derived from its location on disk and
//! may carry a language segment (`/ru/my-post/`); the *logical* slug strips
//! that segment so that every translation of a post shares one identifier
//! (`/my-post/`).

use std::fmt;

/// Normalizes `slug` into its logical slug by taking the second-to-last
/// `/`-separated segment and wrapping it in slashes.
///
/// ```
/// assert_eq!("/my-post/", glossa::slug::normalize("/ru/my-post/").unwrap());
/// ```
pub fn normalize(slug: &str) -> Result<String, InvalidSlugFormat> {
    let segments: Vec<&str> = slug.split('/').collect();
    if segments.len() < 2 {
        return Err(InvalidSlugFormat(slug.to_owned()));
    }
    match segments[segments.len() - 2] {
        "" => Err(InvalidSlugFormat(slug.to_owned())),
        segment => Ok(format!("/{}/", segment)),
    }
}

/// Returned when a slug doesn't have enough path segments to be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSlugFormat(pub String);

impl fmt::Display for InvalidSlugFormat {
    /// Displays an [`InvalidSlugFormat`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid slug format: `{}`", &self.0)
    }
}

impl std::error::Error for InvalidSlugFormat {}
