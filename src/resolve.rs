//! Links posts together. Given every post of a build, the [`Resolver`] works
//! out each post's chronological neighbours and which translations exist for
//! it, and turns that into one [`PageRequest`] per page to render.
//!
//! Navigation always follows the default language's chronology: a
//! translation links to the same previous/next posts as its original, since
//! translations are sparse.

use crate::i18n::Languages;
use crate::post::Post;
use crate::slug::InvalidSlugFormat;
use crate::url::{index_url, post_url};
use std::collections::HashMap;

/// Maps a logical slug to the non-default languages the post has been
/// translated into, in the order the translations were found.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TranslationIndex(HashMap<String, Vec<String>>);

impl TranslationIndex {
    /// Groups `posts` by logical slug, collecting each group's language keys.
    pub fn build<'p>(posts: impl IntoIterator<Item = &'p Post>) -> Result<Self, InvalidSlugFormat> {
        let mut index: HashMap<String, Vec<String>> = HashMap::new();
        for post in posts {
            let lang_keys = index.entry(post.logical_slug()?).or_default();
            if !lang_keys.contains(&post.lang_key) {
                lang_keys.push(post.lang_key.clone());
            }
        }
        Ok(TranslationIndex(index))
    }

    /// Returns the translations of the post with `logical_slug`, which is
    /// empty if there aren't any.
    pub fn get(&self, logical_slug: &str) -> &[String] {
        self.0.get(logical_slug).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A post's neighbours in reading order. `previous` is the older post and
/// `next` the newer one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Navigation<'a> {
    pub previous: Option<&'a Post>,
    pub next: Option<&'a Post>,
}

impl<'a> Navigation<'a> {
    /// Navigation for a post without neighbours.
    pub const NONE: Self = Navigation {
        previous: None,
        next: None,
    };
}

/// Which template renders a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    Post,
    Index,
}

/// The data a page is rendered from.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContext<'a> {
    /// A single post.
    Post {
        post: &'a Post,

        /// The logical slug, prefixed with `/{lang}` for translations.
        slug: String,

        navigation: Navigation<'a>,
        lang_key: String,

        /// The translations of this post (non-default languages only).
        translations: Vec<String>,

        /// The default-language post this one translates. `None` for
        /// default-language posts and orphaned translations.
        original: Option<&'a Post>,
    },

    /// The listing of every post in one language.
    Index { lang_key: String },
}

/// A request to render one page at `url_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest<'a> {
    pub url_path: String,
    pub template: TemplateName,
    pub context: PageContext<'a>,
}

impl<'a> PageRequest<'a> {
    /// Requests the listing page for `lang_key` at `url_path`.
    pub fn index(url_path: &str, lang_key: &str) -> PageRequest<'a> {
        PageRequest {
            url_path: url_path.to_owned(),
            template: TemplateName::Index,
            context: PageContext::Index {
                lang_key: lang_key.to_owned(),
            },
        }
    }

    /// Returns the navigation of a post page, or `None` for index pages.
    pub fn navigation(&self) -> Option<Navigation<'a>> {
        match &self.context {
            PageContext::Post { navigation, .. } => Some(*navigation),
            PageContext::Index { .. } => None,
        }
    }
}

/// The result of [`Resolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    /// Every page to render: one per configured non-default language index,
    /// then one per default-language post, then one per translated post.
    pub pages: Vec<PageRequest<'a>>,

    /// Translations that have no default-language original. They still get
    /// pages, but without navigation.
    pub orphans: Vec<&'a Post>,
}

/// Computes navigation and translation links for a set of posts.
pub struct Resolver<'a> {
    /// The language whose posts define the site-wide chronology.
    pub default_lang_key: &'a str,

    /// The other configured languages. Each one gets an index page.
    pub other_lang_keys: &'a [String],
}

impl<'a> From<&'a Languages> for Resolver<'a> {
    fn from(languages: &'a Languages) -> Resolver<'a> {
        Resolver {
            default_lang_key: &languages.default,
            other_lang_keys: &languages.others,
        }
    }
}

impl Resolver<'_> {
    /// Resolves `posts`, which must already be sorted by date with the most
    /// recent post first. The order isn't checked; unsorted input produces
    /// wrong navigation.
    pub fn resolve<'p>(&self, posts: &'p [Post]) -> Result<Resolution<'p>, InvalidSlugFormat> {
        let (default_posts, other_posts): (Vec<&Post>, Vec<&Post>) = posts
            .iter()
            .partition(|post| post.lang_key == self.default_lang_key);

        let translations = TranslationIndex::build(other_posts.iter().copied())?;

        let mut pages: Vec<PageRequest> = self
            .other_lang_keys
            .iter()
            .map(|lang_key| PageRequest::index(&index_url(lang_key), lang_key))
            .collect();

        let mut originals: HashMap<String, (&Post, Navigation)> = HashMap::new();
        for (i, &post) in default_posts.iter().enumerate() {
            let navigation = Navigation {
                previous: default_posts.get(i + 1).copied(),
                next: match i {
                    0 => None,
                    _ => Some(default_posts[i - 1]),
                },
            };
            let slug = post.logical_slug()?;
            originals.insert(slug.clone(), (post, navigation));
            pages.push(PageRequest {
                url_path: post_url(&slug, &post.lang_key, self.default_lang_key),
                template: TemplateName::Post,
                context: PageContext::Post {
                    post,
                    translations: translations.get(&slug).to_vec(),
                    slug,
                    navigation,
                    lang_key: post.lang_key.clone(),
                    original: None,
                },
            });
        }

        let mut orphans = Vec::new();
        for post in other_posts {
            let slug = post.logical_slug()?;
            let (original, navigation) = match originals.get(&slug) {
                Some(&(original, navigation)) => (Some(original), navigation),
                None => {
                    log::warn!(
                        "translation `{}` ({}) has no original in `{}`",
                        post.slug,
                        post.lang_key,
                        self.default_lang_key,
                    );
                    orphans.push(post);
                    (None, Navigation::NONE)
                }
            };
            pages.push(PageRequest {
                url_path: post_url(&slug, &post.lang_key, self.default_lang_key),
                template: TemplateName::Post,
                context: PageContext::Post {
                    post,
                    translations: translations.get(&slug).to_vec(),
                    slug: format!("/{}{}", post.lang_key, slug),
                    navigation,
                    lang_key: post.lang_key.clone(),
                    original,
                },
            });
        }

        Ok(Resolution { pages, orphans })
    }
}
