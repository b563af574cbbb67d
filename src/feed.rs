//! Support for creating an Atom feed from the default-language posts.

use crate::config::Site;
use crate::i18n::Languages;
use crate::post::Post;
use crate::slug::InvalidSlugFormat;
use crate::url::canonical;
use atom_syndication::{
    Content, Entry, Error as AtomError, Feed, FixedDateTime, Link, Person, Text,
};
use chrono::{FixedOffset, NaiveDate, TimeZone};
use std::fmt;
use std::io::Write;

/// Creates a feed of every post written in the default language and writes
/// the result to a [`std::io::Write`]. Translations stay out of the feed so
/// that subscribers see each post once.
pub fn write_feed<W: Write>(
    site: &Site,
    languages: &Languages,
    posts: &[Post],
    w: W,
) -> Result<()> {
    feed(site, languages, posts)?.write_to(w)?;
    Ok(())
}

fn feed(site: &Site, languages: &Languages, posts: &[Post]) -> Result<Feed> {
    let posts: Vec<&Post> = posts
        .iter()
        .filter(|post| post.lang_key == languages.default)
        .collect();

    let mut entries = Vec::with_capacity(posts.len());
    for post in &posts {
        entries.push(feed_entry(site, languages, post)?);
    }

    // Stamped with the newest post's date, not the build time.
    let updated = match posts.iter().map(|post| post.date).max() {
        Some(date) => date,
        None => NaiveDate::from_ymd_opt(1970, 1, 1).ok_or(Error::InvalidDate)?,
    };

    let mut feed = Feed::default();
    feed.set_title(site.title.as_str());
    feed.set_subtitle(site.description.clone().map(Text::plain));
    feed.set_id(site.site_url.as_str());
    feed.set_updated(midnight_utc(updated)?);
    feed.set_authors(authors(site));
    feed.set_links(vec![link(site.site_url.as_str())]);
    feed.set_entries(entries);
    Ok(feed)
}

fn feed_entry(site: &Site, languages: &Languages, post: &Post) -> Result<Entry> {
    let url = canonical(&site.site_url, &post.url(languages)?)?.to_string();
    let date = midnight_utc(post.date)?;

    let mut content = Content::default();
    content.set_content_type("html".to_owned());
    content.set_value(post.body.clone());

    let mut entry = Entry::default();
    entry.set_id(url.as_str());
    entry.set_title(post.title.as_str());
    entry.set_updated(date);
    entry.set_published(date);
    entry.set_authors(authors(site));
    entry.set_links(vec![link(&url)]);
    entry.set_summary(Text::plain(post.summary()));
    entry.set_content(content);
    Ok(entry)
}

fn link(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn authors(site: &Site) -> Vec<Person> {
    match &site.author {
        Some(name) => {
            let mut person = Person::default();
            person.set_name(name.as_str());
            vec![person]
        }
        None => Vec::new(),
    }
}

// Posts only carry a date, so entries are stamped at midnight UTC.
fn midnight_utc(date: NaiveDate) -> Result<FixedDateTime> {
    let offset = FixedOffset::east_opt(0).ok_or(Error::InvalidDate)?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or(Error::InvalidDate)?;
    Ok(offset.from_utc_datetime(&midnight))
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O, Atom, and URL
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when a post's slug can't be normalized.
    Slug(InvalidSlugFormat),

    /// Returned when a post's absolute URL can't be built.
    Url(url::ParseError),

    /// Returned when a date can't be turned into a timestamp.
    InvalidDate,
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::Slug(err) => err.fmt(f),
            Error::Url(err) => write!(f, "Building feed entry URL: {}", err),
            Error::InvalidDate => write!(f, "Date out of range for a feed timestamp"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::Slug(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::InvalidDate => None,
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<InvalidSlugFormat> for Error {
    /// Converts [`InvalidSlugFormat`]s into [`Error`]. This allows us to use
    /// the `?` operator when building entry URLs.
    fn from(err: InvalidSlugFormat) -> Error {
        Error::Slug(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator when building entry URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn post(slug: &str, lang_key: &str, day: u32, title: &str) -> Post {
        let mut post = Post::new(
            slug,
            lang_key,
            NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
            title,
        );
        post.excerpt = format!("About {}", title);
        post.body = format!("<p>About {}</p>", title);
        post
    }

    #[test]
    fn test_feed_has_default_language_posts() -> TestResult {
        let site = Site {
            title: String::from("Blog"),
            author: Some(String::from("Jane Doe")),
            description: None,
            site_url: Url::parse("https://example.org/")?,
        };
        let posts = vec![
            post("/b/", "en", 2, "Bee"),
            post("/ru/a/", "ru", 1, "Эй"),
            post("/a/", "en", 1, "Ay"),
        ];

        let mut out = Vec::new();
        write_feed(&site, &Languages::default(), &posts, &mut out)?;
        let feed = Feed::read_from(&out[..])?;

        assert_eq!("https://example.org/", feed.id());
        assert_eq!(&midnight_utc(posts[0].date)?, feed.updated());
        assert_eq!("Jane Doe", feed.authors()[0].name());

        let ids: Vec<&str> = feed.entries().iter().map(|entry| entry.id()).collect();
        assert_eq!(
            vec!["https://example.org/posts/b/", "https://example.org/posts/a/"],
            ids
        );

        let entry = &feed.entries()[1];
        assert_eq!("https://example.org/posts/a/", entry.links()[0].href());
        assert_eq!(Some("About Ay"), entry.summary().map(|text| text.value.as_str()));
        assert_eq!(
            Some("<p>About Ay</p>"),
            entry.content().and_then(|content| content.value())
        );
        Ok(())
    }

    #[test]
    fn test_feed_without_posts() -> TestResult {
        let site = Site {
            title: String::from("Blog"),
            author: None,
            description: Some(String::from("Notes")),
            site_url: Url::parse("https://example.org/")?,
        };
        let mut out = Vec::new();
        write_feed(&site, &Languages::default(), &[], &mut out)?;
        let feed = Feed::read_from(&out[..])?;
        assert!(feed.entries().is_empty());
        assert!(feed.authors().is_empty());
        Ok(())
    }
}
