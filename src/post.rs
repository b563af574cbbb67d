//! Defines the [`Post`] type and its conversion into template values.

use crate::i18n::{full_date, Languages};
use crate::slug::{normalize, InvalidSlugFormat};
use crate::url::post_url;
use chrono::NaiveDate;
use gtmpl::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// One parsed markdown document. Posts are created once per build and never
/// modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The hierarchical path derived from the source location, e.g.
    /// `/my-post/` or `/ru/my-post/`. Unique per language.
    pub slug: String,

    /// The language the post is written in.
    pub lang_key: String,

    /// The publication date. Posts are ordered by this field.
    pub date: NaiveDate,

    /// The post's title.
    pub title: String,

    /// The optional `description` frontmatter field. Listings show this in
    /// place of the excerpt when it's present.
    pub description: Option<String>,

    /// A plain-text excerpt of the body.
    pub excerpt: String,

    /// The body rendered as HTML.
    pub body: String,

    /// Files bundled with the post (images and the like). These are copied
    /// next to the page rendered for the post.
    pub assets: Vec<Asset>,
}

/// A non-markdown file inside a post bundle.
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    /// Where the file lives on disk.
    pub source: PathBuf,

    /// The file's path relative to the bundle directory, e.g.
    /// `images/cat.png`. The copy keeps this path relative to the page.
    pub relative: PathBuf,
}

impl Post {
    /// Creates a post with an empty body. Mostly useful for feeding the
    /// resolver directly.
    pub fn new(slug: &str, lang_key: &str, date: NaiveDate, title: &str) -> Post {
        Post {
            slug: slug.to_owned(),
            lang_key: lang_key.to_owned(),
            date,
            title: title.to_owned(),
            description: None,
            excerpt: String::new(),
            body: String::new(),
            assets: Vec::new(),
        }
    }

    /// Returns the language-independent slug shared by every translation of
    /// this post.
    pub fn logical_slug(&self) -> Result<String, InvalidSlugFormat> {
        normalize(&self.slug)
    }

    /// Returns the URL path of the page rendered for this post.
    pub fn url(&self, languages: &Languages) -> Result<String, InvalidSlugFormat> {
        Ok(post_url(
            &self.logical_slug()?,
            &self.lang_key,
            &languages.default,
        ))
    }

    /// The text listings show for this post: the description if there is one
    /// and the excerpt otherwise.
    pub fn summary(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.excerpt)
    }

    /// Converts the post into a template value with the fields `title`,
    /// `date`, `url`, `lang_key`, `summary` (see [`Post::summary`]) and
    /// `body`.
    pub fn to_value(&self, languages: &Languages) -> Result<Value, InvalidSlugFormat> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), (&self.title).into());
        m.insert(
            "date".to_owned(),
            Value::String(full_date(self.date, &self.lang_key)),
        );
        m.insert("url".to_owned(), Value::String(self.url(languages)?));
        m.insert("lang_key".to_owned(), (&self.lang_key).into());
        m.insert("summary".to_owned(), Value::String(self.summary().to_owned()));
        m.insert("body".to_owned(), (&self.body).into());
        Ok(Value::Object(m))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_url() -> Result<(), InvalidSlugFormat> {
        let languages = Languages::default();
        let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        assert_eq!("/posts/a/", Post::new("/a/", "en", date, "A").url(&languages)?);
        assert_eq!("/ru/posts/a/", Post::new("/ru/a/", "ru", date, "A").url(&languages)?);
        Ok(())
    }

    fn field(value: &Value, key: &str) -> String {
        match value {
            Value::Object(m) => match m.get(key) {
                Some(Value::String(s)) => s.clone(),
                _ => panic!("missing string field `{}`", key),
            },
            _ => panic!("wanted an object"),
        }
    }

    #[test]
    fn test_to_value_prefers_description() -> Result<(), InvalidSlugFormat> {
        let languages = Languages::default();
        let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let mut post = Post::new("/a/", "en", date, "A");
        post.excerpt = String::from("excerpt");
        assert_eq!("excerpt", field(&post.to_value(&languages)?, "summary"));

        post.description = Some(String::from("description"));
        assert_eq!("description", field(&post.to_value(&languages)?, "summary"));
        Ok(())
    }

    #[test]
    fn test_to_value_localizes_date() -> Result<(), InvalidSlugFormat> {
        let languages = Languages::default();
        let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let value = Post::new("/ru/a/", "ru", date, "A").to_value(&languages)?;
        assert_eq!("1 марта 2023 г.", field(&value, "date"));
        assert_eq!("/ru/posts/a/", field(&value, "url"));
        Ok(())
    }
}
