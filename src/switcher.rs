//! Defines the [`ThemeSwitcher`], which keeps a [`ThemeStore`] in line with
//! the user's [`ThemeChoice`] and the host's colour scheme.

use crate::store::{Error, ThemeStore};
use crate::theme::{
    resolve, save_choice, saved_choice, system_preference, ColorSchemeWatcher, PreferenceStorage,
    Theme, ThemeChoice, WatchHandle,
};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Re-resolves the displayed theme whenever the user picks a different
/// choice or the host's colour scheme changes, and publishes the result to
/// the store. Dropping the switcher stops it from following the host.
pub struct ThemeSwitcher<S> {
    store: Rc<ThemeStore>,
    storage: S,
    choice: Cell<ThemeChoice>,
    system: Cell<Theme>,
    watch: WatchHandle,
}

impl<S: PreferenceStorage + 'static> ThemeSwitcher<S> {
    /// Creates a switcher from the choice saved in `storage` and the current
    /// preference of `watcher`, publishes the initial theme to `store`, and
    /// starts following `watcher`'s changes.
    pub fn new(
        store: Rc<ThemeStore>,
        storage: S,
        watcher: &dyn ColorSchemeWatcher,
    ) -> Result<Rc<ThemeSwitcher<S>>, Error> {
        let choice = saved_choice(&storage);
        let system = system_preference(watcher);
        let switcher = Rc::new_cyclic(|weak: &Weak<ThemeSwitcher<S>>| {
            let weak = weak.clone();
            let watch = watcher.watch(Box::new(move |theme: Theme| {
                if let Some(switcher) = weak.upgrade() {
                    if let Err(err) = switcher.system_changed(theme) {
                        log::warn!("applying system theme {}: {}", theme, err);
                    }
                }
            }));
            ThemeSwitcher {
                store,
                storage,
                choice: Cell::new(choice),
                system: Cell::new(system),
                watch,
            }
        });

        switcher.publish()?;
        Ok(switcher)
    }

    /// The user's current choice.
    pub fn choice(&self) -> ThemeChoice {
        self.choice.get()
    }

    /// The theme currently displayed.
    pub fn theme(&self) -> Theme {
        resolve(self.choice.get(), self.system.get())
    }

    /// Records a new user choice, persists it, and publishes the resulting
    /// theme.
    pub fn choose(&self, choice: ThemeChoice) -> Result<bool, Error> {
        self.choice.set(choice);
        save_choice(&self.storage, choice);
        self.publish()
    }

    /// Handles a change of the host's colour scheme.
    pub fn system_changed(&self, theme: Theme) -> Result<bool, Error> {
        self.system.set(theme);
        self.publish()
    }

    fn publish(&self) -> Result<bool, Error> {
        self.store.set_theme(self.theme())
    }
}

impl<S> Drop for ThemeSwitcher<S> {
    fn drop(&mut self) {
        self.watch.unwatch();
    }
}
