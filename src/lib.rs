//! The library code for the `glossa` static site generator, which publishes a
//! blog written in a default language plus sparse translations. Building a
//! site happens in three steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`])
//! 2. Linking the posts together ([`crate::resolve`]): every post gets its
//!    chronological neighbours and the list of languages it has been
//!    translated into. Translations borrow the navigation of their original,
//!    so readers always move through the default language's timeline.
//! 3. Rendering one page per post and one listing per language to disk
//!    ([`crate::write`])
//!
//! [`crate::build::build_site`] runs all three from a [`crate::config::Config`]
//! and finishes with an Atom feed of the default-language posts
//! ([`crate::feed`]).
//!
//! The crate also carries the theme preference model used by the site's UI:
//! [`crate::theme`] defines themes and the host ports, [`crate::store`] the
//! observable [`crate::store::ThemeStore`], and [`crate::switcher`] the glue
//! that keeps the store in line with the user's choice.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod i18n;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod resolve;
pub mod slug;
pub mod store;
pub mod switcher;
pub mod theme;
pub mod url;
pub mod write;
