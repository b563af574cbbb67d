//! Language configuration and the handful of localized strings the site
//! needs: language names, index page titles and long-form dates.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;

/// The set of languages a site is published in. Posts in the `default`
/// language define the site-wide chronology; posts in `others` are
/// translations.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Languages {
    /// The default language key, e.g. `en`.
    #[serde(default = "default_lang_key")]
    pub default: String,

    /// The non-default language keys, e.g. `[ru]`. Each of these gets its own
    /// index page even if no posts are written in it yet.
    #[serde(default = "default_other_lang_keys")]
    pub others: Vec<String>,

    /// Display names for each language key.
    #[serde(default = "default_names")]
    pub names: BTreeMap<String, String>,

    /// The post listing title for each language key. Languages without one
    /// use the default language's title.
    #[serde(default = "default_index_titles")]
    pub index_titles: BTreeMap<String, String>,
}

const FALLBACK_INDEX_TITLE: &str = "All posts";

fn default_lang_key() -> String {
    String::from("en")
}

fn default_other_lang_keys() -> Vec<String> {
    vec![String::from("ru")]
}

fn default_names() -> BTreeMap<String, String> {
    let mut names = BTreeMap::new();
    names.insert(String::from("en"), String::from("English"));
    names.insert(String::from("ru"), String::from("Русский"));
    names
}

fn default_index_titles() -> BTreeMap<String, String> {
    let mut titles = BTreeMap::new();
    titles.insert(String::from("en"), String::from(FALLBACK_INDEX_TITLE));
    titles.insert(String::from("ru"), String::from("Все посты"));
    titles
}

impl Default for Languages {
    fn default() -> Self {
        Languages {
            default: default_lang_key(),
            others: default_other_lang_keys(),
            names: default_names(),
            index_titles: default_index_titles(),
        }
    }
}

impl Languages {
    /// Returns true if `lang_key` is the default language or one of the
    /// others.
    pub fn contains(&self, lang_key: &str) -> bool {
        self.default == lang_key || self.others.iter().any(|k| k == lang_key)
    }

    /// Returns the display name for `lang_key`, falling back to the key
    /// itself.
    pub fn name<'a>(&'a self, lang_key: &'a str) -> &'a str {
        self.names
            .get(lang_key)
            .map(String::as_str)
            .unwrap_or(lang_key)
    }

    /// The title of the post listing page in `lang_key`.
    pub fn index_title(&self, lang_key: &str) -> &str {
        self.index_titles
            .get(lang_key)
            .or_else(|| self.index_titles.get(&self.default))
            .map(String::as_str)
            .unwrap_or(FALLBACK_INDEX_TITLE)
    }
}

const EN_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Genitive forms, as used after a day number.
const RU_MONTHS: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// Formats `date` the long way for readers of `lang_key`: `March 1, 2023` in
/// English and `1 марта 2023 г.` in Russian. Unknown languages get English.
pub fn full_date(date: NaiveDate, lang_key: &str) -> String {
    let month = date.month0() as usize;
    match lang_key {
        "ru" => format!("{} {} {} г.", date.day(), RU_MONTHS[month], date.year()),
        _ => format!("{} {}, {}", EN_MONTHS[month], date.day(), date.year()),
    }
}
