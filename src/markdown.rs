use crate::url::Converter as LinkConverter;
use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag};
use std::fmt;
use url::ParseError as UrlParseError;

/// Number of characters kept by [`excerpt`].
pub const EXCERPT_LENGTH: usize = 160;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Converts markdown to HTML, writing the result into `w`. Links to other
/// post source files are rewritten by `link_converter`.
pub fn to_html(
    w: &mut String,
    link_converter: &LinkConverter,
    markdown: &str,
) -> Result<(), Error> {
    let events = Parser::new_ext(markdown, options())
        .map(|ev| convert(link_converter, ev))
        .collect::<Result<Vec<Event>, UrlParseError>>()?;
    html::push_html(w, events.into_iter());
    Ok(())
}

fn convert<'b>(link_converter: &LinkConverter, ev: Event<'b>) -> Result<Event<'b>, UrlParseError> {
    Ok(match ev {
        Event::Start(Tag::Link(
            link @ (LinkType::Inline
            | LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Shortcut
            | LinkType::ShortcutUnknown
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown),
            url,
            title,
        )) => Event::Start(Tag::Link(
            link,
            CowStr::Boxed(link_converter.convert(&url)?.into_boxed_str()),
            title,
        )),
        _ => ev,
    })
}

/// Extracts the plain text of `markdown` and prunes it to at most
/// `prune_length` characters, cutting at a word boundary and appending `…`
/// when anything was cut.
pub fn excerpt(markdown: &str, prune_length: usize) -> String {
    let mut text = String::new();
    for ev in Parser::new_ext(markdown, options()) {
        match ev {
            Event::Text(s) | Event::Code(s) => text.push_str(&s),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(Tag::Paragraph) | Event::End(Tag::Heading(_)) => text.push(' '),
            _ => {}
        }
    }
    let text = text.split_whitespace().collect::<Vec<&str>>().join(" ");

    if text.chars().count() <= prune_length {
        return text;
    }

    let mut pruned = String::new();
    for word in text.split(' ') {
        let len = pruned.chars().count();
        let separator = if len == 0 { 0 } else { 1 };
        let extra = separator + word.chars().count();
        if len + extra > prune_length {
            break;
        }
        if len > 0 {
            pruned.push(' ');
        }
        pruned.push_str(word);
    }
    if pruned.is_empty() {
        // a single word longer than the limit
        pruned = text.chars().take(prune_length).collect();
    }
    pruned.push('…');
    pruned
}

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a problem parsing link URLs.
    UrlParse(UrlParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<UrlParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for link conversion.
    fn from(err: UrlParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::i18n::Languages;

    #[test]
    fn test_to_html_converts_post_links() -> Result<(), Error> {
        let languages = Languages::default();
        let converter = LinkConverter::new(&languages, "a/index.md")?;
        let mut out = String::new();
        to_html(
            &mut out,
            &converter,
            "See [the sequel](../b/index.ru.md) and ![a cat](cat.png).",
        )?;
        assert!(out.contains(r#"<a href="/ru/posts/b/">the sequel</a>"#), "{}", out);
        assert!(out.contains(r#"src="cat.png""#), "{}", out);
        Ok(())
    }

    #[test]
    fn test_excerpt_short() {
        assert_eq!("Hello world!", excerpt("# Hello\n\nworld!", EXCERPT_LENGTH));
    }

    #[test]
    fn test_excerpt_strips_markup() {
        assert_eq!(
            "Use the map function to transform values.",
            excerpt("Use the `map` function\nto *transform* values.", EXCERPT_LENGTH)
        );
    }

    #[test]
    fn test_excerpt_pruned_at_word_boundary() {
        assert_eq!("one two…", excerpt("one two three", 9));
    }

    #[test]
    fn test_excerpt_long_word() {
        assert_eq!("abcd…", excerpt("abcdefgh", 4));
    }
}
