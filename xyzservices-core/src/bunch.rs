//! Nested, name-keyed registry of tile providers.

use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::{IntoIter, Iter};
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::{ProviderError, ProviderResult, TileProvider};

/// Characters ignored by [`Bunch::query_name`].
const QUERY_NAME_IGNORED: [char; 6] = ['.', ',', ' ', '-', '_', '/'];

/// A node of the provider tree: a single provider or a nested bunch of variants.
///
/// Providers are reference counted, so [`Bunch::flatten`] and
/// [`Bunch::filter`] share them with the source tree instead of copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A leaf holding one provider.
    Provider(Arc<TileProvider>),
    /// A nested group, typically the variants of one provider.
    Bunch(Bunch),
}

impl Entry {
    /// The provider, if this entry is a leaf.
    #[must_use]
    pub fn as_provider(&self) -> Option<&TileProvider> {
        match self {
            Self::Provider(p) => Some(p),
            Self::Bunch(_) => None,
        }
    }

    /// The nested bunch, if this entry is a group.
    #[must_use]
    pub fn as_bunch(&self) -> Option<&Bunch> {
        match self {
            Self::Provider(_) => None,
            Self::Bunch(b) => Some(b),
        }
    }
}

impl From<TileProvider> for Entry {
    fn from(provider: TileProvider) -> Self {
        Self::Provider(Arc::new(provider))
    }
}

impl From<Arc<TileProvider>> for Entry {
    fn from(provider: Arc<TileProvider>) -> Self {
        Self::Provider(provider)
    }
}

impl From<Bunch> for Entry {
    fn from(bunch: Bunch) -> Self {
        Self::Bunch(bunch)
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Provider(p) => p.serialize(serializer),
            Self::Bunch(b) => b.serialize(serializer),
        }
    }
}

/// An ordered mapping from names to providers or nested bunches.
///
/// The top-level bunch is usually built once by
/// [`load_json`](crate::load_json) and then only read. All query methods
/// return new bunches, so a shared `Bunch` can be used from many threads
/// without locking.
///
/// ```
/// use xyzservices_core::{Bunch, TileProvider};
///
/// let mut bunch = Bunch::new();
/// let provider = TileProvider::try_from_iter([
///     ("name", "Example"),
///     ("url", "https://{s}.example.com/{z}/{x}/{y}.png"),
///     ("attribution", "Example"),
/// ])
/// .unwrap();
/// bunch.insert("Example", provider);
///
/// let provider = bunch.query_name("example").unwrap();
/// assert_eq!(provider.url(), "https://{s}.example.com/{z}/{x}/{y}.png");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bunch {
    entries: IndexMap<String, Entry>,
}

impl Bunch {
    /// An empty bunch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of direct entries (not the number of providers in the tree).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no direct entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(name, entry)` pairs in insertion order.
    pub fn iter(&self) -> Iter<'_, String, Entry> {
        self.entries.iter()
    }

    /// `true` if a direct entry with this name exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Direct entry by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Item-style access, failing with [`ProviderError::KeyNotFound`].
    pub fn item(&self, key: &str) -> ProviderResult<&Entry> {
        self.get(key)
            .ok_or_else(|| ProviderError::KeyNotFound(key.to_string()))
    }

    /// Attribute-style access.
    ///
    /// Delegates to [`item`](Self::item) and reports a missing key as
    /// [`ProviderError::MissingField`], which tells "unknown name" apart from
    /// other lookup failures.
    pub fn attr(&self, key: &str) -> ProviderResult<&Entry> {
        self.item(key).map_err(|e| match e {
            ProviderError::KeyNotFound(key) => ProviderError::MissingField(key),
            e => e,
        })
    }

    /// Direct provider by name, `None` if missing or a nested bunch.
    #[must_use]
    pub fn get_provider(&self, key: &str) -> Option<&TileProvider> {
        self.get(key).and_then(Entry::as_provider)
    }

    /// Direct nested bunch by name, `None` if missing or a provider.
    #[must_use]
    pub fn get_bunch(&self, key: &str) -> Option<&Self> {
        self.get(key).and_then(Entry::as_bunch)
    }

    /// Mutable access to a direct provider.
    ///
    /// Providers shared with other bunches (e.g. after [`flatten`](Self::flatten))
    /// are cloned first, so the change is only visible through this bunch.
    pub fn get_provider_mut(&mut self, key: &str) -> Option<&mut TileProvider> {
        match self.entries.get_mut(key)? {
            Entry::Provider(p) => Some(Arc::make_mut(p)),
            Entry::Bunch(_) => None,
        }
    }

    /// Add or replace an entry, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<Entry>) -> Option<Entry> {
        self.entries.insert(key.into(), entry.into())
    }

    /// All providers of the tree, depth-first in stored order.
    pub fn providers(&self) -> impl Iterator<Item = &Arc<TileProvider>> {
        let mut found = Vec::new();
        self.collect_providers(&mut found);
        found.into_iter()
    }

    fn collect_providers<'a>(&'a self, found: &mut Vec<&'a Arc<TileProvider>>) {
        for entry in self.entries.values() {
            match entry {
                Entry::Provider(p) => found.push(p),
                Entry::Bunch(b) => b.collect_providers(found),
            }
        }
    }

    /// A single-level bunch of every provider in the tree, keyed by provider name.
    ///
    /// If two providers share a name, the one visited last wins and a warning is logged.
    #[must_use]
    pub fn flatten(&self) -> Self {
        let mut flat = IndexMap::new();
        for provider in self.providers() {
            let name = provider.name().to_string();
            if let Some(Entry::Provider(previous)) =
                flat.insert(name, Entry::Provider(Arc::clone(provider)))
            {
                if previous != *provider {
                    warn!(
                        "Provider name `{}` is used more than once, keeping the last definition",
                        provider.name()
                    );
                }
            }
        }
        Self { entries: flat }
    }

    /// Flattened bunch of the providers matching `predicate`.
    ///
    /// ```
    /// # use xyzservices_core::Bunch;
    /// # let bunch = Bunch::new();
    /// let free = bunch.filter(|p| !p.requires_token());
    /// ```
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&TileProvider) -> bool,
    {
        let mut flat = self.flatten();
        flat.entries.retain(|_, entry| match entry {
            Entry::Provider(p) => predicate(p.as_ref()),
            Entry::Bunch(_) => false,
        });
        flat
    }

    /// Flattened bunch of the providers matching every set criterion of `filter`.
    #[must_use]
    pub fn filter_by(&self, filter: &ProviderFilter) -> Self {
        self.filter(|p| filter.matches(p))
    }

    /// Find a provider by name, ignoring case and the characters `. , - _ /` and spaces.
    ///
    /// `"cartodb positron"`, `"CartoDB.Positron"` and `"cartodb-positron"`
    /// all resolve to the same provider.
    pub fn query_name(&self, name: &str) -> ProviderResult<&TileProvider> {
        let query = normalize_name(name);
        self.providers()
            .filter(|p| normalize_name(p.name()) == query)
            .last()
            .map(|p| &**p)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !QUERY_NAME_IGNORED.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

impl<K: Into<String>, E: Into<Entry>> FromIterator<(K, E)> for Bunch {
    fn from_iter<T: IntoIterator<Item = (K, E)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, e)| (k.into(), e.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Bunch {
    type Item = (String, Entry);
    type IntoIter = IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Bunch {
    type Item = (&'a String, &'a Entry);
    type IntoIter = Iter<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Bunch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// Criteria for [`Bunch::filter`]. Unset criteria match everything,
/// set criteria must all match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFilter {
    /// Case-insensitive substring of any string attribute.
    pub keyword: Option<String>,
    /// Case-insensitive substring of the provider name.
    pub name: Option<String>,
    /// Required result of [`TileProvider::requires_token`].
    pub requires_token: Option<bool>,
    /// Drop providers whose status is `broken`.
    pub exclude_broken: bool,
}

impl ProviderFilter {
    /// `true` if `provider` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, provider: &TileProvider) -> bool {
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            let found = provider
                .attributes()
                .values()
                .filter_map(crate::Value::as_str)
                .any(|v| v.to_lowercase().contains(&keyword));
            if !found {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !provider
                .name()
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }
        if let Some(requires_token) = self.requires_token {
            if provider.requires_token() != requires_token {
                return false;
            }
        }
        !(self.exclude_broken && provider.is_broken())
    }
}
