//! Defines the [`ThemeStore`]: a single-threaded cell holding the resolved
//! [`Theme`] and a list of subscribers notified synchronously whenever it
//! changes.
//!
//! The store is an ordinary value owned by the UI root and handed out by
//! reference; nothing about it is global.

use crate::theme::Theme;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// How deeply `set_theme` may nest when subscribers change the theme from
/// inside a notification.
pub const MAX_NOTIFY_DEPTH: usize = 16;

/// The error a subscriber callback may fail with.
pub type SubscriberError = Box<dyn std::error::Error>;

type Callback = Rc<dyn Fn(Theme) -> Result<(), SubscriberError>>;

// Ids grow monotonically, so iterating in key order is registration order.
#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

/// Holds the current theme and notifies subscribers when it changes.
#[derive(Default)]
pub struct ThemeStore {
    current: Cell<Option<Theme>>,
    subscribers: Rc<RefCell<Subscribers>>,
    depth: Cell<usize>,
}

impl ThemeStore {
    /// Creates a store with no theme and no subscribers.
    pub fn new() -> ThemeStore {
        ThemeStore::default()
    }

    /// Returns the current theme, or `None` before the first
    /// [`ThemeStore::set_theme`].
    pub fn theme(&self) -> Option<Theme> {
        self.current.get()
    }

    /// Registers `callback` to be invoked with the new theme on every change.
    /// Callbacks run in registration order. Dropping the returned
    /// [`Subscription`] does *not* unsubscribe; call
    /// [`Subscription::unsubscribe`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Theme) -> Result<(), SubscriberError> + 'static,
    {
        let mut subscribers = self.subscribers.borrow_mut();
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.callbacks.insert(id, Rc::new(callback));
        Subscription {
            id,
            subscribers: Rc::downgrade(&self.subscribers),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().callbacks.len()
    }

    /// Sets the current theme and notifies every subscriber before
    /// returning. Returns `Ok(false)` without notifying anyone if `theme` is
    /// already current.
    ///
    /// A failing subscriber doesn't stop the others from being notified; the
    /// failures are returned together once the round is over. Subscribers may
    /// call `set_theme` themselves, which runs a nested round; past
    /// [`MAX_NOTIFY_DEPTH`] nested rounds the call fails with
    /// [`Error::ReentrancyLimit`] and leaves the theme alone.
    pub fn set_theme(&self, theme: Theme) -> Result<bool, Error> {
        if self.current.get() == Some(theme) {
            return Ok(false);
        }
        if self.depth.get() >= MAX_NOTIFY_DEPTH {
            return Err(Error::ReentrancyLimit(theme));
        }
        self.current.set(Some(theme));
        log::debug!("theme set to {}", theme);

        // Snapshot the callbacks so they can subscribe and unsubscribe while
        // being notified.
        let callbacks: Vec<Callback> = self
            .subscribers
            .borrow()
            .callbacks
            .values()
            .cloned()
            .collect();

        self.depth.set(self.depth.get() + 1);
        let mut failures = Vec::new();
        for callback in callbacks {
            if let Err(err) = callback(theme) {
                log::warn!("theme subscriber failed: {}", err);
                failures.push(err);
            }
        }
        self.depth.set(self.depth.get() - 1);

        if failures.is_empty() {
            Ok(true)
        } else {
            Err(Error::Subscribers(failures))
        }
    }
}

/// A handle to one subscription of a [`ThemeStore`].
pub struct Subscription {
    id: u64,
    subscribers: Weak<RefCell<Subscribers>>,
}

impl Subscription {
    /// Removes the callback from the store. Calling this more than once, or
    /// after the store is gone, does nothing.
    pub fn unsubscribe(&self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.borrow_mut().callbacks.remove(&self.id);
        }
    }
}

/// Represents a failed [`ThemeStore::set_theme`].
#[derive(Debug)]
pub enum Error {
    /// One or more subscribers failed. The theme was still changed and every
    /// other subscriber was notified.
    Subscribers(Vec<SubscriberError>),

    /// Subscribers kept changing the theme from inside notifications.
    ReentrancyLimit(Theme),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Subscribers(failures) => {
                write!(f, "{} theme subscriber(s) failed", failures.len())?;
                for failure in failures {
                    write!(f, "; {}", failure)?;
                }
                Ok(())
            }
            Error::ReentrancyLimit(theme) => write!(
                f,
                "refusing to set theme to {}: notifications nested more than {} deep",
                theme, MAX_NOTIFY_DEPTH
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Subscribers(failures) => failures.first().map(|err| &**err),
            Error::ReentrancyLimit(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<Theme>>>, impl Fn(Theme) -> Result<(), SubscriberError>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |theme: Theme| -> Result<(), SubscriberError> {
            sink.borrow_mut().push(theme);
            Ok(())
        })
    }

    #[test]
    fn test_set_theme_notifies_once() -> Result<(), Error> {
        let store = ThemeStore::new();
        let (seen, callback) = recorder();
        store.subscribe(callback);

        assert!(store.set_theme(Theme::Dark)?);
        assert!(!store.set_theme(Theme::Dark)?);
        assert_eq!(vec![Theme::Dark], *seen.borrow());
        assert_eq!(Some(Theme::Dark), store.theme());
        Ok(())
    }

    #[test]
    fn test_registration_order() -> Result<(), Error> {
        let store = ThemeStore::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            store.subscribe(move |_| {
                order.borrow_mut().push(i);
                Ok(())
            });
        }
        store.set_theme(Theme::Light)?;
        assert_eq!(vec![0, 1, 2], *order.borrow());
        Ok(())
    }

    #[test]
    fn test_unsubscribe_is_idempotent() -> Result<(), Error> {
        let store = ThemeStore::new();
        let (seen, callback) = recorder();
        let subscription = store.subscribe(callback);
        let (_, other) = recorder();
        store.subscribe(other);

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert_eq!(1, store.subscriber_count());

        store.set_theme(Theme::Dark)?;
        assert!(seen.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_unsubscribe_after_store_dropped() {
        let store = ThemeStore::new();
        let (_, callback) = recorder();
        let subscription = store.subscribe(callback);
        drop(store);
        subscription.unsubscribe();
    }

    #[test]
    fn test_failing_subscriber_does_not_block_others() {
        let store = ThemeStore::new();
        store.subscribe(|_| Err("boom".into()));
        let (seen, callback) = recorder();
        store.subscribe(callback);

        match store.set_theme(Theme::Dark) {
            Err(Error::Subscribers(failures)) => {
                assert_eq!(1, failures.len());
                assert_eq!("boom", failures[0].to_string());
            }
            other => panic!("wanted a subscriber failure, got {:?}", other),
        }
        assert_eq!(vec![Theme::Dark], *seen.borrow());
        assert_eq!(Some(Theme::Dark), store.theme());
    }

    #[test]
    fn test_nested_set_theme() -> Result<(), Error> {
        let store = Rc::new(ThemeStore::new());
        let weak = Rc::downgrade(&store);
        // Forces dark whenever light is chosen.
        store.subscribe(move |theme| {
            if let (Theme::Light, Some(store)) = (theme, weak.upgrade()) {
                store.set_theme(Theme::Dark)?;
            }
            Ok(())
        });
        let (seen, callback) = recorder();
        store.subscribe(callback);

        store.set_theme(Theme::Light)?;
        assert_eq!(Some(Theme::Dark), store.theme());
        // The nested round completes before the outer one carries on.
        assert_eq!(vec![Theme::Dark, Theme::Light], *seen.borrow());
        Ok(())
    }

    #[test]
    fn test_unbounded_reentrancy_is_cut_off() {
        let store = Rc::new(ThemeStore::new());
        let weak = Rc::downgrade(&store);
        store.subscribe(move |theme| {
            if let Some(store) = weak.upgrade() {
                let flipped = match theme {
                    Theme::Light => Theme::Dark,
                    Theme::Dark => Theme::Light,
                };
                store.set_theme(flipped)?;
            }
            Ok(())
        });

        match store.set_theme(Theme::Light) {
            Err(Error::Subscribers(_)) => {}
            other => panic!("wanted the nested failure to surface, got {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_during_notification() -> Result<(), Error> {
        let store = Rc::new(ThemeStore::new());
        let weak = Rc::downgrade(&store);
        store.subscribe(move |_| {
            if let Some(store) = weak.upgrade() {
                store.subscribe(|_| Ok(()));
            }
            Ok(())
        });
        store.set_theme(Theme::Dark)?;
        assert_eq!(2, store.subscriber_count());
        Ok(())
    }
}
