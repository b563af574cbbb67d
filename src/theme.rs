//! Display themes and the ports through which the host environment reports
//! its colour scheme and persists the user's choice.
//!
//! A user picks a [`ThemeChoice`]: `light`, `dark` or `system`. What the page
//! actually shows is a [`Theme`], which is never `system`; [`resolve`] turns
//! the choice into a theme using the host's reported preference.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// The storage key holding the user's [`ThemeChoice`].
pub const THEME_KEY: &str = "ui/theme";

/// A concrete display theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// The class put on the document root to select the theme's styles.
    pub fn css_class(self) -> &'static str {
        match self {
            Theme::Light => "light-theme",
            Theme::Dark => "dark-theme",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user selected in the theme switcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeChoice {
    Light,
    Dark,
    System,
}

impl ThemeChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeChoice::Light => "light",
            ThemeChoice::Dark => "dark",
            ThemeChoice::System => "system",
        }
    }
}

impl From<Theme> for ThemeChoice {
    fn from(theme: Theme) -> ThemeChoice {
        match theme {
            Theme::Light => ThemeChoice::Light,
            Theme::Dark => ThemeChoice::Dark,
        }
    }
}

impl fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeChoice {
    type Err = UnknownThemeChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemeChoice::Light),
            "dark" => Ok(ThemeChoice::Dark),
            "system" => Ok(ThemeChoice::System),
            _ => Err(UnknownThemeChoice(s.to_owned())),
        }
    }
}

/// Returned when a string isn't `light`, `dark` or `system`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownThemeChoice(pub String);

impl fmt::Display for UnknownThemeChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown theme choice `{}`", &self.0)
    }
}

impl std::error::Error for UnknownThemeChoice {}

/// Turns a choice into the theme to display: `system` follows the host's
/// preference, anything else is taken as is.
pub fn resolve(choice: ThemeChoice, system: Theme) -> Theme {
    match choice {
        ThemeChoice::System => system,
        ThemeChoice::Light => Theme::Light,
        ThemeChoice::Dark => Theme::Dark,
    }
}

/// The host's colour-scheme preference and its change notifications.
pub trait ColorSchemeWatcher {
    /// Returns the host's current preference, or `None` if the host can't
    /// report one.
    fn preference(&self) -> Option<Theme>;

    /// Registers `listener` to be called whenever the host's preference
    /// changes. The listener stays registered until the returned handle's
    /// [`WatchHandle::unwatch`] is called.
    fn watch(&self, listener: Box<dyn Fn(Theme)>) -> WatchHandle;
}

/// Returned by [`ColorSchemeWatcher::watch`]; removes the listener again.
pub struct WatchHandle {
    remove: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl WatchHandle {
    /// Creates a handle that runs `remove` on the first call to
    /// [`WatchHandle::unwatch`].
    pub fn new(remove: impl FnOnce() + 'static) -> WatchHandle {
        WatchHandle {
            remove: RefCell::new(Some(Box::new(remove))),
        }
    }

    /// Stops the listener from being called. Calling this more than once
    /// does nothing.
    pub fn unwatch(&self) {
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            remove();
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("watching", &self.remove.borrow().is_some())
            .finish()
    }
}

/// A key-value store that outlives the page session.
pub trait PreferenceStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Returns the host's preferred theme, falling back to [`Theme::Light`] when
/// the host can't tell.
pub fn system_preference(watcher: &dyn ColorSchemeWatcher) -> Theme {
    watcher.preference().unwrap_or(Theme::Light)
}

/// Reads the saved choice from `storage`, defaulting to
/// [`ThemeChoice::System`]. Quotes are stripped first, since older versions
/// stored the value JSON-encoded (`"dark"`).
pub fn saved_choice(storage: &dyn PreferenceStorage) -> ThemeChoice {
    let record = match storage.get(THEME_KEY) {
        Some(record) if !record.is_empty() => record,
        _ => return ThemeChoice::System,
    };
    match record.replace('"', "").parse() {
        Ok(choice) => choice,
        Err(err) => {
            log::warn!("ignoring saved theme: {}", err);
            ThemeChoice::System
        }
    }
}

/// Persists `choice` to `storage`.
pub fn save_choice(storage: &dyn PreferenceStorage, choice: ThemeChoice) {
    storage.set(THEME_KEY, choice.as_str());
}

/// [`PreferenceStorage`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage(RefCell<HashMap<String, String>>);

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }
}

impl PreferenceStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.0.borrow_mut().insert(key.to_owned(), value.to_owned());
    }
}

/// A [`ColorSchemeWatcher`] whose preference is changed by calling
/// [`ManualColorScheme::set`], for hosts that push scheme changes themselves
/// and for tests.
#[derive(Default)]
pub struct ManualColorScheme {
    preference: RefCell<Option<Theme>>,
    listeners: Rc<RefCell<Listeners>>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: BTreeMap<u64, Rc<dyn Fn(Theme)>>,
}

impl ManualColorScheme {
    pub fn new(preference: Option<Theme>) -> ManualColorScheme {
        ManualColorScheme {
            preference: RefCell::new(preference),
            listeners: Rc::default(),
        }
    }

    /// Updates the preference and notifies every listener, in registration
    /// order.
    pub fn set(&self, theme: Theme) {
        *self.preference.borrow_mut() = Some(theme);
        let listeners: Vec<Rc<dyn Fn(Theme)>> =
            self.listeners.borrow().callbacks.values().cloned().collect();
        for listener in listeners {
            listener(theme);
        }
    }

    /// The number of listeners still registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().callbacks.len()
    }
}

impl ColorSchemeWatcher for ManualColorScheme {
    fn preference(&self) -> Option<Theme> {
        *self.preference.borrow()
    }

    fn watch(&self, listener: Box<dyn Fn(Theme)>) -> WatchHandle {
        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.callbacks.insert(id, listener.into());
            id
        };
        let listeners = Rc::downgrade(&self.listeners);
        WatchHandle::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().callbacks.remove(&id);
            }
        })
    }
}
