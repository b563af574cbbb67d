//! Loads a project's [`Config`] from its `glossa.yaml` project file and the
//! `theme/theme.yaml` file next to it.
//!
//! A project looks like this:
//!
//! ```text
//! glossa.yaml
//! posts/          markdown sources (see crate::parser)
//! static/         copied verbatim to `{output}/static`
//! theme/
//!     theme.yaml  lists the template files for post, index and 404 pages
//! ```

use crate::i18n::Languages;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "glossa.yaml";

/// Site-wide metadata made available to every template.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Site {
    pub title: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// The site's public root, e.g. `https://example.org/`. Used to build
    /// canonical links.
    pub site_url: Url,
}

#[derive(Deserialize)]
struct Project {
    site: Site,

    #[serde(default)]
    languages: Languages,
}

#[derive(Deserialize)]
struct Theme {
    post_template: Vec<PathBuf>,
    index_template: Vec<PathBuf>,

    #[serde(default)]
    not_found_template: Vec<PathBuf>,
}

/// Everything needed to build a site.
pub struct Config {
    pub site: Site,
    pub languages: Languages,

    /// Where the markdown post sources live.
    pub posts_source_directory: PathBuf,

    /// Where the static assets live.
    pub static_source_directory: PathBuf,

    /// The template files for post pages, concatenated in order.
    pub post_template: Vec<PathBuf>,

    /// The template files for index pages, concatenated in order.
    pub index_template: Vec<PathBuf>,

    /// The template files for the `404.html` page. No page is written when
    /// the theme doesn't list any.
    pub not_found_template: Vec<PathBuf>,

    /// The directory the site is written into.
    pub root_output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and its ancestors for a project file and loads it.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let path = dir.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path, output_directory);
            }
            current = dir.parent();
        }
        Err(Error::ProjectFileNotFound(dir.to_owned()))
    }

    /// Loads the project file at `path`. Source directories and the theme
    /// are resolved relative to the project file's directory.
    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = read_yaml(path)?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::NoParentDirectory(path.to_owned()))?;
        let theme_dir = project_root.join("theme");
        let theme: Theme = read_yaml(&theme_dir.join("theme.yaml"))?;

        log::info!("loaded project `{}`", path.display());
        Ok(Config {
            site: project.site,
            languages: project.languages,
            posts_source_directory: project_root.join("posts"),
            static_source_directory: project_root.join("static"),
            post_template: theme
                .post_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            not_found_template: theme
                .not_found_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            root_output_directory: output_directory.to_owned(),
        })
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    serde_yaml::from_reader(file).map_err(|err| Error::DeserializeYaml {
        path: path.to_owned(),
        err,
    })
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in the directory or any of its
    /// ancestors.
    ProjectFileNotFound(PathBuf),

    /// Returned when the project file path has no parent directory.
    NoParentDirectory(PathBuf),

    /// Returned when a configuration file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when a configuration file isn't valid YAML or is missing
    /// fields.
    DeserializeYaml {
        path: PathBuf,
        err: serde_yaml::Error,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectFileNotFound(dir) => write!(
                f,
                "Could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::NoParentDirectory(path) => write!(
                f,
                "Can't get parent directory for project file `{}`",
                path.display()
            ),
            Error::Open { path, err } => {
                write!(f, "Opening `{}`: {}", path.display(), err)
            }
            Error::DeserializeYaml { path, err } => {
                write!(f, "Loading `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectFileNotFound(_) => None,
            Error::NoParentDirectory(_) => None,
            Error::Open { path: _, err } => Some(err),
            Error::DeserializeYaml { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(dir: &Path, project_yaml: &str) -> std::io::Result<()> {
        fs::write(dir.join(PROJECT_FILE), project_yaml)?;
        fs::create_dir_all(dir.join("theme"))?;
        fs::write(
            dir.join("theme/theme.yaml"),
            "post_template: [base.html, post.html]\nindex_template: [base.html, index.html]\n",
        )
    }

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_from_directory_searches_ancestors() -> TestResult {
        let dir = TempDir::new()?;
        project(
            dir.path(),
            "site:\n  title: Blog\n  site_url: https://example.org/\n",
        )?;
        let nested = dir.path().join("posts/some-post");
        fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested, Path::new("/tmp/out"))?;
        assert_eq!("Blog", config.site.title);
        assert_eq!(None, config.site.author);
        assert_eq!(Languages::default(), config.languages);
        assert_eq!(dir.path().join("posts"), config.posts_source_directory);
        assert_eq!(
            vec![
                dir.path().join("theme/base.html"),
                dir.path().join("theme/post.html")
            ],
            config.post_template
        );
        assert!(config.not_found_template.is_empty());
        assert_eq!(Path::new("/tmp/out"), config.root_output_directory);
        Ok(())
    }

    #[test]
    fn test_languages_override() -> TestResult {
        let dir = TempDir::new()?;
        project(
            dir.path(),
            "site:\n  title: Blog\n  site_url: https://example.org/\n\
             languages:\n  default: ru\n  others: []\n",
        )?;
        let config = Config::from_directory(dir.path(), Path::new("/tmp/out"))?;
        assert_eq!("ru", config.languages.default);
        assert!(config.languages.others.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_site_url() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        project(dir.path(), "site:\n  title: Blog\n")?;
        match Config::from_directory(dir.path(), Path::new("/tmp/out")) {
            Err(Error::DeserializeYaml { path, .. }) => {
                assert_eq!(dir.path().join(PROJECT_FILE), path)
            }
            _ => panic!("wanted a YAML error"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_theme() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join(PROJECT_FILE),
            "site:\n  title: Blog\n  site_url: https://example.org/\n",
        )?;
        assert!(matches!(
            Config::from_directory(dir.path(), Path::new("/tmp/out")),
            Err(Error::Open { .. })
        ));
        Ok(())
    }
}
