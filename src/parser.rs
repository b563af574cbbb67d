//! Defines the [`Parser`] and [`Error`] types: the logic for reading posts
//! from the file system into memory.

use std::{fmt, fs::File, path::Path};

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::{
    i18n::Languages,
    markdown,
    post::{Asset, Post},
    url::{source_location, Converter as LinkConverter, SourceLocation},
};

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// The site's languages. A file named `index.{lang}.md` or
    /// `{name}.{lang}.md` is a translation if `lang` is one of them.
    languages: &'a Languages,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser.
    pub fn new(languages: &'a Languages) -> Parser<'a> {
        Parser { languages }
    }

    /// Searches `source_directory` for post files and returns the posts
    /// sorted by date (most recent first). A post is either a bundle
    /// directory holding `index.md` (or `index.{lang}.md`) plus any assets, or
    /// a single `{name}.md` (or `{name}.{lang}.md`) file. Each post file must
    /// be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with fields `title`, `date`, and optionally
    ///    `description`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        for result in WalkDir::new(source_directory)
            .min_depth(1)
            .max_depth(2)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = result?;
            if !entry.file_type().is_file() {
                continue;
            }
            // strip_prefix() should never fail since WalkDir yields paths
            // under `source_directory`
            let relative = match entry.path().strip_prefix(source_directory) {
                Ok(relative) => relative_path_string(relative),
                Err(_) => continue,
            };
            if let Some(location) = source_location(&relative, self.languages) {
                log::debug!("parsing post `{}`", relative);
                posts.push(self.parse_post(source_directory, &relative, location)?);
            }
        }

        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(posts)
    }

    /// Parses a single [`Post`] and annotates any error with the source
    /// file's path.
    fn parse_post(
        &self,
        source_directory: &Path,
        relative: &str,
        location: SourceLocation,
    ) -> Result<Post> {
        match self._parse_post(source_directory, relative, location) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", relative),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(
        &self,
        source_directory: &Path,
        relative: &str,
        location: SourceLocation,
    ) -> Result<Post> {
        use std::io::Read;
        let path = source_directory.join(relative);
        let mut contents = String::new();
        File::open(&path)?.read_to_string(&mut contents)?;
        let input: &str = &contents;

        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let frontmatter: Frontmatter =
            serde_yaml::from_str(&input[yaml_start..yaml_stop])?;
        let markdown = &input[body_start..];

        let mut post = Post::new(
            &if location.lang_key == self.languages.default {
                format!("/{}/", location.name)
            } else {
                format!("/{}/{}/", location.lang_key, location.name)
            },
            &location.lang_key,
            parse_date(&frontmatter.date)?,
            &frontmatter.title,
        );
        post.description = frontmatter.description;
        post.excerpt = markdown::excerpt(markdown, markdown::EXCERPT_LENGTH);
        markdown::to_html(
            &mut post.body,
            &LinkConverter::new(self.languages, relative)?,
            markdown,
        )?;

        if relative.contains('/') {
            if let Some(bundle) = path.parent() {
                post.assets = bundle_assets(bundle)?;
            }
        }
        Ok(post)
    }
}

fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    match input[FENCE.len()..].find(FENCE) {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => Ok((
            FENCE.len(),                        // yaml_start
            FENCE.len() + offset,               // yaml_stop
            FENCE.len() + offset + FENCE.len(), // body_start
        )),
    }
}

/// Accepts plain dates (`2023-03-01`) as well as RFC 3339 timestamps
/// (`2023-03-01T10:00:00+03:00`), keeping only the date.
fn parse_date(date: &str) -> Result<NaiveDate> {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => Ok(date),
        Err(_) => match DateTime::parse_from_rfc3339(date) {
            Ok(datetime) => Ok(datetime.naive_local().date()),
            Err(err) => Err(Error::InvalidDate(date.to_owned(), err)),
        },
    }
}

/// Lists every non-markdown file in a bundle directory, including the ones
/// in nested directories.
fn bundle_assets(bundle: &Path) -> Result<Vec<Asset>> {
    let mut assets = Vec::new();
    for result in WalkDir::new(bundle)
        .min_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = result?;
        let is_markdown = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.ends_with(".md"));
        if !entry.file_type().is_file() || is_markdown {
            continue;
        }
        // strip_prefix() should never fail since WalkDir yields paths under
        // `bundle`
        if let Ok(relative) = entry.path().strip_prefix(bundle) {
            assets.push(Asset {
                source: entry.path().to_owned(),
                relative: relative.to_owned(),
            });
        }
    }
    Ok(assets)
}

fn relative_path_string(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Deserialize, Clone)]
struct Frontmatter {
    /// The title of the post.
    pub title: String,

    /// The date of the post.
    pub date: String,

    /// A short description used in post listings.
    #[serde(default)]
    pub description: Option<String>,
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the frontmatter `date` is neither `YYYY-MM-DD` nor an
    /// RFC 3339 timestamp.
    InvalidDate(String, chrono::ParseError),

    /// Returned when the markdown body can't be converted.
    Markdown(markdown::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidDate(date, err) => {
                write!(f, "invalid date `{}`: {}", date, err)
            }
            Error::Markdown(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate(_, err) => Some(err),
            Error::Markdown(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<markdown::Error> for Error {
    fn from(err: markdown::Error) -> Error {
        Error::Markdown(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator when constructing link converters.
    fn from(err: url::ParseError) -> Error {
        Error::Markdown(markdown::Error::UrlParse(err))
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible directory walks.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, contents: &str) -> std::io::Result<()> {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    #[test]
    fn test_parse_posts() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        write(
            dir.path(),
            "older/index.md",
            "---\ntitle: Older\ndate: 2023-02-01\n---\nThe first post.\n",
        )?;
        write(dir.path(), "older/cat.png", "meow")?;
        write(
            dir.path(),
            "older/index.ru.md",
            "---\ntitle: Старый\ndate: 2023-02-02\n---\nПервый пост.\n",
        )?;
        write(
            dir.path(),
            "newer.md",
            "---\ntitle: Newer\ndate: 2023-03-01T10:00:00+03:00\ndescription: Hi\n---\n\
             See [the older one](older/index.md).\n",
        )?;
        write(dir.path(), "README.txt", "not a post")?;

        let languages = Languages::default();
        let posts = Parser::new(&languages).parse_posts(dir.path())?;

        let summary: Vec<(&str, &str, &str)> = posts
            .iter()
            .map(|p| (p.slug.as_str(), p.lang_key.as_str(), p.title.as_str()))
            .collect();
        assert_eq!(
            vec![
                ("/newer/", "en", "Newer"),
                ("/ru/older/", "ru", "Старый"),
                ("/older/", "en", "Older"),
            ],
            summary
        );

        let newer = &posts[0];
        assert_eq!(NaiveDate::from_ymd_opt(2023, 3, 1), Some(newer.date));
        assert_eq!(Some(String::from("Hi")), newer.description);
        assert!(newer.body.contains(r#"href="/posts/older/""#), "{}", newer.body);
        assert!(newer.assets.is_empty());

        let older = &posts[2];
        assert_eq!("The first post.", older.excerpt);
        assert_eq!(
            vec![Asset {
                source: dir.path().join("older/cat.png"),
                relative: PathBuf::from("cat.png"),
            }],
            older.assets
        );
        Ok(())
    }

    #[test]
    fn test_nested_bundle_assets() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        write(
            dir.path(),
            "a/index.md",
            "---\ntitle: A\ndate: 2023-02-01\n---\n![cat](images/cat.png)\n",
        )?;
        write(dir.path(), "a/images/cat.png", "meow")?;
        write(dir.path(), "a/images/raw/cat.xcf", "layers")?;
        write(dir.path(), "a/notes/draft.md", "not an asset")?;

        let languages = Languages::default();
        let posts = Parser::new(&languages).parse_posts(dir.path())?;
        assert_eq!(1, posts.len());
        assert!(posts[0].body.contains(r#"src="images/cat.png""#), "{}", posts[0].body);

        let relatives: Vec<&Path> = posts[0]
            .assets
            .iter()
            .map(|asset| asset.relative.as_path())
            .collect();
        assert_eq!(
            vec![Path::new("images/cat.png"), Path::new("images/raw/cat.xcf")],
            relatives
        );
        assert_eq!(dir.path().join("a/images/cat.png"), posts[0].assets[0].source);
        Ok(())
    }

    #[test]
    fn test_missing_start_fence() {
        assert!(matches!(
            frontmatter_indices("title: x\n---\n"),
            Err(Error::FrontmatterMissingStartFence)
        ));
    }

    #[test]
    fn test_missing_end_fence() {
        assert!(matches!(
            frontmatter_indices("---\ntitle: x\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
    }

    #[test]
    fn test_invalid_date_is_annotated() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "a.md", "---\ntitle: A\ndate: yesterday\n---\n")?;
        let languages = Languages::default();
        match Parser::new(&languages).parse_posts(dir.path()) {
            Err(Error::Annotated(annotation, err)) => {
                assert_eq!("parsing post `a.md`", annotation);
                assert!(matches!(*err, Error::InvalidDate(_, _)));
            }
            other => panic!("wanted an annotated error, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }
}
