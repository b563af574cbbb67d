//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::parser`]), linking them together ([`crate::resolve`]), rendering
//! the pages ([`crate::write`]), copying the static source directory into the
//! static output directory, and generating the Atom feed ([`crate::feed`]).

use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError};
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::resolve::{PageRequest, Resolver};
use crate::slug::InvalidSlugFormat;
use crate::url::{FEED_FILE, HOME_URL};
use crate::write::{Error as WriteError, Writer};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Builds the site from a [`Config`] object. This calls into
/// [`PostParser::parse_posts`], [`Resolver::resolve`] and
/// [`Writer::write_pages`] and [`write_feed`] which do the heavy-lifting. This
/// function also copies the static assets from source directory to the output
/// directory.
pub fn build_site(config: Config) -> Result<()> {
    let post_parser = PostParser::new(&config.languages);

    // collect all posts
    let posts = post_parser.parse_posts(&config.posts_source_directory)?;
    log::info!(
        "parsed {} posts from `{}`",
        posts.len(),
        config.posts_source_directory.display()
    );

    let resolution = Resolver::from(&config.languages).resolve(&posts)?;
    let mut pages = resolution.pages;
    pages.push(PageRequest::index(HOME_URL, &config.languages.default));
    if !resolution.orphans.is_empty() {
        log::warn!(
            "{} translation(s) without an original",
            resolution.orphans.len()
        );
    }

    // Parse the template files.
    let index_template = parse_template(config.index_template.iter())?;
    let post_template = parse_template(config.post_template.iter())?;
    let not_found_template = match config.not_found_template.is_empty() {
        true => None,
        false => Some(parse_template(config.not_found_template.iter())?),
    };

    // Blow away the old output directories so we don't have any collisions.
    // The root output directory itself is left alone in case the user passes
    // the wrong directory.
    let output = &config.root_output_directory;
    rmdir(&output.join("posts"))?;
    for lang_key in &config.languages.others {
        rmdir(&output.join(lang_key))?;
    }
    rmdir(&output.join("static"))?;

    // write the post and index pages
    let writer = Writer {
        post_template: &post_template,
        index_template: &index_template,
        output_directory: output,
        site: &config.site,
        languages: &config.languages,
        posts: &posts,
    };
    writer.write_pages(&pages)?;
    if let Some(template) = &not_found_template {
        writer.write_not_found(template)?;
    }
    log::info!("wrote {} pages to `{}`", pages.len(), output.display());

    // copy static directory
    if config.static_source_directory.is_dir() {
        copy_dir(&config.static_source_directory, &output.join("static"))?;
    }

    // create the atom feed
    write_feed(
        &config.site,
        &config.languages,
        &posts,
        File::create(output.join(FEED_FILE))?,
    )?;

    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir(&src.join(entry.file_name()), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(src.join(entry.file_name()), dst.join(entry.file_name()))?;
        }
    }

    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing,
/// resolving, writing, cleaning output directories, parsing template files,
/// and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned when a post's slug can't be normalized while linking posts.
    Resolve(InvalidSlugFormat),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Resolve(err) => write!(f, "Linking posts: {}", err),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Resolve(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<InvalidSlugFormat> for Error {
    /// Converts [`InvalidSlugFormat`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: InvalidSlugFormat) -> Error {
        Error::Resolve(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn testdata() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/site")
    }

    #[test]
    fn test_build_site() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let _ = env_logger::builder().is_test(true).try_init();
        let out = TempDir::new()?;
        // A stale page from an earlier build.
        fs::create_dir_all(out.path().join("posts/removed"))?;
        fs::write(out.path().join("posts/removed/index.html"), "stale")?;

        build_site(Config::from_directory(&testdata(), out.path())?)?;

        let read = |relpath: &str| fs::read_to_string(out.path().join(relpath));
        assert!(!out.path().join("posts/removed").exists());

        let home = read("index.html")?;
        assert!(home.contains("<h1>All posts</h1>"), "{}", home);
        let hello_link = r#"<a href="/posts/hello-world/">Hello, world!</a>"#;
        assert!(home.contains(hello_link), "{}", home);
        assert!(!home.contains("Привет"), "{}", home);

        let ru_index = read("ru/index.html")?;
        assert!(ru_index.contains("<h1>Все посты</h1>"), "{}", ru_index);
        let privet_link = r#"<a href="/ru/posts/hello-world/">Привет, мир!</a>"#;
        assert!(ru_index.contains(privet_link), "{}", ru_index);

        let hello = read("posts/hello-world/index.html")?;
        assert!(hello.contains(r#"<a rel="prev" href="/posts/first-steps/">"#), "{}", hello);
        assert!(!hello.contains(r#"rel="next""#), "{}", hello);
        let ru_link = r#"<a href="/ru/posts/hello-world/">Русский</a>"#;
        assert!(hello.contains(ru_link), "{}", hello);
        let canonical =
            r#"<link rel="canonical" href="https://example.org/posts/hello-world/">"#;
        assert!(hello.contains(canonical), "{}", hello);
        assert!(out.path().join("posts/hello-world/photo.txt").is_file());

        let privet = read("ru/posts/hello-world/index.html")?;
        assert!(privet.contains(r#"<a rel="prev" href="/posts/first-steps/">"#), "{}", privet);
        assert!(privet.contains(r#"<a href="/posts/hello-world/">English</a>"#), "{}", privet);
        assert!(privet.contains("1 марта 2023 г."), "{}", privet);

        let first = read("posts/first-steps/index.html")?;
        assert!(first.contains(r#"<a rel="next" href="/posts/hello-world/">"#), "{}", first);

        assert_eq!("body { color: black; }\n", read("static/css/style.css")?);

        let not_found = read("404.html")?;
        assert!(not_found.contains("<h1>Not Found</h1>"), "{}", not_found);
        assert!(not_found.contains(r#"<a href="/">Glossa Test Blog</a>"#), "{}", not_found);

        let feed = atom_syndication::Feed::read_from(read("feed.atom")?.as_bytes())?;
        let links: Vec<&str> = feed
            .entries()
            .iter()
            .map(|entry| entry.links()[0].href())
            .collect();
        assert_eq!(
            vec![
                "https://example.org/posts/hello-world/",
                "https://example.org/posts/first-steps/",
            ],
            links
        );
        Ok(())
    }

    #[test]
    fn test_missing_template_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let missing = Path::new("/nonexistent/post.html");
        match parse_template(std::iter::once(missing)) {
            Err(Error::OpenTemplateFile { path, .. }) => assert_eq!(missing, path),
            Err(err) => return Err(err.into()),
            Ok(_) => panic!("wanted an error"),
        }
        Ok(())
    }
}
