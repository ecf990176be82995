//! String resources and the store that tracks their translation state.
//!
//! The store replaces its list on every mutation and publishes the new
//! snapshot through a `watch` channel, so readers never observe a list that
//! is halfway through an update.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::progress::Progress;

/// One `<string>` entry of a strings.xml file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringResource {
    pub name: String,
    pub source_value: String,
    #[serde(default)]
    pub translated_value: String,
    /// Only true while the containing batch is in flight
    #[serde(skip)]
    pub is_translating: bool,
    #[serde(default)]
    pub has_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Untranslated,
    InFlight,
    Done,
    Errored,
}

impl StringResource {
    pub fn new(name: impl Into<String>, source_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_value: source_value.into(),
            translated_value: String::new(),
            is_translating: false,
            has_error: false,
        }
    }

    pub fn state(&self) -> ItemState {
        if self.is_translating {
            ItemState::InFlight
        } else if self.has_error {
            ItemState::Errored
        } else if self.translated_value.trim().is_empty() {
            ItemState::Untranslated
        } else {
            ItemState::Done
        }
    }

    /// Items a batch window still has to send: blank or errored
    pub fn needs_translation(&self) -> bool {
        self.translated_value.trim().is_empty() || self.has_error
    }

    /// Blank and never attempted (or reset); where a continue run starts
    pub fn is_incomplete(&self) -> bool {
        self.translated_value.trim().is_empty() && !self.has_error
    }

    /// Counted as processed by progress displays
    pub fn is_finished(&self) -> bool {
        !self.translated_value.trim().is_empty() || self.has_error
    }

    /// Value written to the output file
    pub fn output_value(&self) -> &str {
        if self.translated_value.trim().is_empty() {
            &self.source_value
        } else {
            &self.translated_value
        }
    }
}

pub type Snapshot = Arc<Vec<StringResource>>;

struct StoreInner {
    resources: watch::Sender<Snapshot>,
    translating: watch::Sender<bool>,
}

/// Shared, observable list of string resources plus the in-progress flag.
///
/// Cloning the store clones the handle; all clones see the same state.
#[derive(Clone)]
pub struct ResourceStore {
    inner: Arc<StoreInner>,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::with_resources(Vec::new())
    }

    pub fn with_resources(resources: Vec<StringResource>) -> Self {
        let (resources, _) = watch::channel(Arc::new(resources));
        let (translating, _) = watch::channel(false);
        Self {
            inner: Arc::new(StoreInner { resources, translating }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.resources.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.resources.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.resources.subscribe()
    }

    pub fn subscribe_translating(&self) -> watch::Receiver<bool> {
        self.inner.translating.subscribe()
    }

    pub fn is_translating(&self) -> bool {
        *self.inner.translating.borrow()
    }

    pub fn set_translating(&self, translating: bool) {
        self.inner.translating.send_replace(translating);
    }

    /// Replace the whole list, e.g. after parsing a new file
    pub fn replace(&self, resources: Vec<StringResource>) {
        self.inner.resources.send_replace(Arc::new(resources));
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    /// Apply `f` to a private copy of the list and publish the result
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<StringResource>),
    {
        self.inner.resources.send_modify(|current| {
            f(Arc::make_mut(current));
        });
    }

    /// Manual edit of one translation. Out-of-range indices are ignored.
    pub fn update_translation(&self, index: usize, translated_value: impl Into<String>) -> bool {
        if index >= self.len() {
            return false;
        }
        let translated_value = translated_value.into();
        self.update(|resources| {
            if let Some(resource) = resources.get_mut(index) {
                resource.translated_value = translated_value;
                resource.has_error = false;
            }
        });
        true
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.inner.resources.borrow().iter().position(|r| r.name == name)
    }

    /// Index of the first item with a blank translation and no error
    pub fn first_incomplete_index(&self) -> Option<usize> {
        self.inner.resources.borrow().iter().position(StringResource::is_incomplete)
    }

    /// Turn every errored item back into an untranslated one
    pub fn reset_errors(&self) -> usize {
        let errored = self.inner.resources.borrow().iter().filter(|r| r.has_error).count();
        if errored > 0 {
            self.update(|resources| {
                for resource in resources.iter_mut().filter(|r| r.has_error) {
                    resource.has_error = false;
                    resource.translated_value.clear();
                }
            });
        }
        errored
    }

    pub fn progress(&self) -> Progress {
        Progress::from_resources(&self.inner.resources.borrow())
    }
}
