//! The site's URL scheme, plus a [`Converter`] that rewrites links between
//! post source files into links between the rendered pages.
//!
//! | page                    | URL                       |
//! |-------------------------|---------------------------|
//! | home                    | `/`                       |
//! | default-language post   | `/posts/{logical-slug}/`  |
//! | translated post         | `/{lang}/posts/{logical-slug}/` |
//! | translated index        | `/{lang}`                 |
//! | not found               | `/404.html`               |
//! | Atom feed               | `/feed.atom`              |

use crate::i18n::Languages;
use std::path::{Path, PathBuf};
use url::{ParseError, Url};

const MARKDOWN_EXTENSION: &str = ".md";

/// The URL path of the home page.
pub const HOME_URL: &str = "/";

/// The file, relative to the output directory, holding the Atom feed.
pub const FEED_FILE: &str = "feed.atom";

/// The URL path of the page served for unknown paths.
pub const NOT_FOUND_URL: &str = "/404.html";

/// The file, relative to the output directory, holding the page served for
/// unknown paths.
pub const NOT_FOUND_FILE: &str = "404.html";

/// Returns the URL path for the post with `logical_slug` (e.g. `/my-post/`)
/// written in `lang_key`.
pub fn post_url(logical_slug: &str, lang_key: &str, default_lang_key: &str) -> String {
    if lang_key == default_lang_key {
        format!("/posts{}", logical_slug)
    } else {
        format!("/{}/posts{}", lang_key, logical_slug)
    }
}

/// Returns the URL path for the post listing of a non-default language.
pub fn index_url(lang_key: &str) -> String {
    format!("/{}", lang_key)
}

/// Maps a URL path onto the HTML file that serves it, e.g. `/posts/a/`
/// becomes `{output_directory}/posts/a/index.html`.
pub fn output_path(output_directory: &Path, url_path: &str) -> PathBuf {
    let mut path = output_directory.to_owned();
    for segment in url_path.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.join("index.html")
}

/// Returns the absolute URL for `url_path` on the site rooted at `site_url`.
pub fn canonical(site_url: &Url, url_path: &str) -> Result<Url, ParseError> {
    site_url.join(url_path)
}

/// Where a post source file sits: the post's name and the language it's
/// written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The post's name, shared by all of its translations.
    pub name: String,

    /// The language the source file is written in.
    pub lang_key: String,
}

/// Interprets `relative` (a `/`-separated path relative to the posts
/// directory) as a post source file. Recognized layouts are bundles
/// (`{name}/index.md`, `{name}/index.{lang}.md`) and flat files (`{name}.md`,
/// `{name}.{lang}.md`). Returns `None` for anything else.
pub fn source_location(relative: &str, languages: &Languages) -> Option<SourceLocation> {
    let relative = relative.trim_start_matches("./");
    let (dir, file_name) = match relative.rfind('/') {
        Some(i) => (&relative[..i], &relative[i + 1..]),
        None => ("", relative),
    };
    let stem = file_name.strip_suffix(MARKDOWN_EXTENSION)?;
    let (base, lang_key) = match stem.rfind('.') {
        Some(i) if languages.contains(&stem[i + 1..]) => (&stem[..i], &stem[i + 1..]),
        _ => (stem, languages.default.as_str()),
    };

    let name = match (dir, base) {
        ("", "") => return None,
        ("", base) => base,
        (dir, "index") if !dir.contains('/') => dir,
        _ => return None,
    };

    Some(SourceLocation {
        name: name.to_owned(),
        lang_key: lang_key.to_owned(),
    })
}

/// Rewrites relative links found in one post's markdown so that links to
/// other post source files point at the rendered pages instead. Links to
/// anything else (assets, external sites, fragments) pass through untouched.
pub struct Converter<'a> {
    root: Url,
    base: Url,
    languages: &'a Languages,
}

impl<'a> Converter<'a> {
    /// Constructs a new `Converter`.
    ///
    /// # Arguments
    ///
    /// * `languages` - the site's languages, used to detect language
    ///   infixes in target file names.
    /// * `source_path` - the path of the converted post relative to the posts
    ///   directory, e.g. `my-post/index.md`.
    pub fn new(languages: &'a Languages, source_path: &str) -> Result<Converter<'a>, ParseError> {
        // The scheme and host are placeholders; only the path matters.
        let root = Url::parse("file:///posts/")?;
        Ok(Converter {
            base: root.join(source_path)?,
            root,
            languages,
        })
    }

    pub fn convert(&self, url: &str) -> Result<String, ParseError> {
        if url.starts_with('#') || url.starts_with('/') {
            return Ok(url.to_owned());
        }
        match Url::parse(url) {
            Ok(_) => return Ok(url.to_owned()),
            Err(ParseError::RelativeUrlWithoutBase) => {}
            Err(e) => return Err(e),
        }

        let mut target = self.base.join(url)?;
        let fragment = target.fragment().map(str::to_owned);
        target.set_fragment(None);

        let location = self
            .root
            .make_relative(&target)
            .filter(|relative| !relative.starts_with("../"))
            .and_then(|relative| source_location(&relative, self.languages));

        Ok(match location {
            None => url.to_owned(),
            Some(location) => {
                let mut converted = post_url(
                    &format!("/{}/", location.name),
                    &location.lang_key,
                    &self.languages.default,
                );
                if let Some(fragment) = fragment {
                    converted.push('#');
                    converted.push_str(&fragment);
                }
                converted
            }
        })
    }
}
