//! Defines the [`Writer`], which templates [`PageRequest`]s into HTML files.

use crate::config::Site;
use crate::i18n::Languages;
use crate::post::Post;
use crate::resolve::{Navigation, PageContext, PageRequest, TemplateName};
use crate::slug::InvalidSlugFormat;
use crate::url::{
    canonical, index_url, output_path, post_url, HOME_URL, NOT_FOUND_FILE, NOT_FOUND_URL,
};
use gtmpl::{Template, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Renders pages and writes them to disk.
///
/// Every page is rendered with an object holding `site` (`title`, `author`,
/// `description`, `url`), `lang_key`, `url`, `canonical_url`, `home_url` and
/// `index_title`. Post pages add `post`, `slug`, `previous`, `next`,
/// `translations` and `original`; index pages add `posts`. The 404 page only
/// gets the common fields. See [`Post::to_value`] for the fields of a post.
pub struct Writer<'a> {
    /// The template for post pages.
    pub post_template: &'a Template,

    /// The template for index pages.
    pub index_template: &'a Template,

    /// The directory the pages are written into. The page for URL path
    /// `/a/b/` is written to `{output_directory}/a/b/index.html`.
    pub output_directory: &'a Path,

    pub site: &'a Site,
    pub languages: &'a Languages,

    /// Every post of the build, most recent first. Index pages list the ones
    /// written in their language.
    pub posts: &'a [Post],
}

impl Writer<'_> {
    /// Writes every page in `pages`, along with the assets of post pages.
    pub fn write_pages(&self, pages: &[PageRequest]) -> Result<()> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for page in pages {
            let file_path = output_path(self.output_directory, &page.url_path);
            // output_path() always ends in `index.html`
            let dir = match file_path.parent() {
                Some(dir) => dir,
                None => continue,
            };
            if seen_dirs.insert(dir.to_owned()) {
                fs::create_dir_all(dir)?;
            }
            self.write_page(page, &file_path)?;

            if let PageContext::Post { post, .. } = &page.context {
                copy_assets(post, dir)?;
            }
        }
        Ok(())
    }

    /// Renders `template` into `{output_directory}/404.html`, the page servers
    /// answer with for unknown paths. It gets the fields common to every page,
    /// in the default language.
    pub fn write_not_found(&self, template: &Template) -> Result<()> {
        log::debug!("writing `{}`", NOT_FOUND_URL);
        fs::create_dir_all(self.output_directory)?;
        let value = Value::Object(self.common_fields(NOT_FOUND_URL, &self.languages.default)?);
        template.execute(
            &mut File::create(self.output_directory.join(NOT_FOUND_FILE))?,
            &gtmpl::Context::from(value)?,
        )?;
        Ok(())
    }

    /// Templates a single page and writes it to `file_path`.
    fn write_page(&self, page: &PageRequest, file_path: &Path) -> Result<()> {
        log::debug!("writing `{}`", page.url_path);
        let template = match page.template {
            TemplateName::Post => self.post_template,
            TemplateName::Index => self.index_template,
        };
        let value = self.page_value(page)?;
        template.execute(&mut File::create(file_path)?, &gtmpl::Context::from(value)?)?;
        Ok(())
    }

    fn page_value(&self, page: &PageRequest) -> Result<Value> {
        let lang_key = match &page.context {
            PageContext::Post { lang_key, .. } => lang_key,
            PageContext::Index { lang_key } => lang_key,
        };

        let mut m = self.common_fields(&page.url_path, lang_key)?;
        match &page.context {
            PageContext::Post {
                post,
                slug,
                navigation,
                translations,
                original,
                ..
            } => {
                let Navigation { previous, next } = navigation;
                m.insert("post".to_owned(), post.to_value(self.languages)?);
                m.insert("slug".to_owned(), slug.into());
                m.insert("previous".to_owned(), self.optional_post(*previous)?);
                m.insert("next".to_owned(), self.optional_post(*next)?);

                let logical_slug = post.logical_slug()?;
                m.insert(
                    "translations".to_owned(),
                    Value::Array(
                        translations
                            .iter()
                            .map(|translation| self.link(&logical_slug, translation))
                            .collect(),
                    ),
                );
                m.insert(
                    "original".to_owned(),
                    match original {
                        Some(original) => self.link(&logical_slug, &original.lang_key),
                        None => Value::Nil,
                    },
                );
            }
            PageContext::Index { lang_key } => {
                let mut posts = Vec::new();
                for post in self.posts.iter().filter(|p| &p.lang_key == lang_key) {
                    posts.push(post.to_value(self.languages)?);
                }
                m.insert("posts".to_owned(), Value::Array(posts));
            }
        }
        Ok(Value::Object(m))
    }

    /// The fields every page gets.
    fn common_fields(&self, url_path: &str, lang_key: &str) -> Result<HashMap<String, Value>> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("site".to_owned(), self.site_value());
        m.insert("lang_key".to_owned(), Value::String(lang_key.to_owned()));
        m.insert("url".to_owned(), Value::String(url_path.to_owned()));
        m.insert(
            "canonical_url".to_owned(),
            Value::String(canonical(&self.site.site_url, url_path)?.to_string()),
        );
        m.insert("home_url".to_owned(), Value::String(self.home_url(lang_key)));
        m.insert(
            "index_title".to_owned(),
            Value::String(self.languages.index_title(lang_key).to_owned()),
        );
        Ok(m)
    }

    fn site_value(&self) -> Value {
        let optional = |field: &Option<String>| match field {
            Some(s) => s.into(),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), (&self.site.title).into());
        m.insert("author".to_owned(), optional(&self.site.author));
        m.insert("description".to_owned(), optional(&self.site.description));
        m.insert(
            "url".to_owned(),
            Value::String(self.site.site_url.to_string()),
        );
        Value::Object(m)
    }

    fn home_url(&self, lang_key: &str) -> String {
        match lang_key == self.languages.default {
            true => HOME_URL.to_owned(),
            false => index_url(lang_key),
        }
    }

    fn optional_post(&self, post: Option<&Post>) -> Result<Value> {
        Ok(match post {
            Some(post) => post.to_value(self.languages)?,
            None => Value::Nil,
        })
    }

    /// A link to the version of the post with `logical_slug` written in
    /// `lang_key`, as an object with fields `lang_key`, `name` and `url`.
    fn link(&self, logical_slug: &str, lang_key: &str) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("lang_key".to_owned(), Value::String(lang_key.to_owned()));
        m.insert(
            "name".to_owned(),
            Value::String(self.languages.name(lang_key).to_owned()),
        );
        m.insert(
            "url".to_owned(),
            Value::String(post_url(logical_slug, lang_key, &self.languages.default)),
        );
        Value::Object(m)
    }
}

fn copy_assets(post: &Post, dir: &Path) -> Result<()> {
    for asset in &post.assets {
        copy_file(&asset.source, &dir.join(&asset.relative)).map_err(|err| {
            Error::CopyAsset {
                path: asset.source.clone(),
                err,
            }
        })?;
    }
    Ok(())
}

fn copy_file(source: &Path, target: &Path) -> io::Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target)
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// A post whose slug can't be normalized.
    Slug(InvalidSlugFormat),

    /// The canonical URL of a page couldn't be built.
    Url(url::ParseError),

    /// A bundle asset couldn't be copied.
    CopyAsset { path: PathBuf, err: io::Error },

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<InvalidSlugFormat> for Error {
    /// Converts an [`InvalidSlugFormat`] into an [`Error`]. This allows us to
    /// use the `?` operator when converting posts into template values.
    fn from(err: InvalidSlugFormat) -> Error {
        Error::Slug(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. This allows us to use
    /// the `?` operator when building canonical URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Slug(err) => err.fmt(f),
            Error::Url(err) => write!(f, "Building canonical URL: {}", err),
            Error::CopyAsset { path, err } => {
                write!(f, "Copying asset `{}`: {}", path.display(), err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Slug(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::CopyAsset { path: _, err } => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}
