//! A single tile service and the construction of its tile URLs.

use std::borrow::Cow;

use serde::{Deserialize, Serialize, Serializer};

use crate::template;
use crate::value::{Attributes, Value};
use crate::{ProviderError, ProviderResult};

/// Keys every provider must have, in the order they are reported when missing.
pub const MANDATORY_KEYS: [&str; 3] = ["name", "url", "attribution"];

/// Subdomains used for `{s}` when a provider does not define its own.
pub const DEFAULT_SUBDOMAINS: &str = "abc";

/// Prefix of placeholder values that mark an API key or token as not yet supplied,
/// e.g. `"<insert your api key here>"`.
pub const TOKEN_PLACEHOLDER_PREFIX: &str = "<insert your";

/// Value of `status` for providers known to be out of service.
pub const STATUS_BROKEN: &str = "broken";

/// Configuration of one XYZ tile service.
///
/// A provider is a flat, ordered mapping of attributes. The keys `name`, `url`
/// and `attribution` are guaranteed to exist, everything else is optional and
/// provider-specific. Values are not type-checked.
///
/// Deriving new providers never modifies the original: [`copy`](Self::copy),
/// [`with`](Self::with) and [`build_url`](Self::build_url) all work on a clone.
/// The only in-place mutation is [`insert`](Self::insert), which needs
/// exclusive access.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Attributes")]
pub struct TileProvider {
    attributes: Attributes,
}

impl TileProvider {
    /// Create a provider, failing if any of `name`, `url` or `attribution` is absent.
    pub fn new(attributes: Attributes) -> ProviderResult<Self> {
        let missing: Vec<&'static str> = MANDATORY_KEYS
            .into_iter()
            .filter(|key| !attributes.contains_key(*key))
            .collect();
        if missing.is_empty() {
            Ok(Self { attributes })
        } else {
            Err(ProviderError::MissingMandatory(missing))
        }
    }

    /// Create a provider from `(key, value)` pairs.
    ///
    /// ```
    /// use xyzservices_core::TileProvider;
    ///
    /// let provider = TileProvider::try_from_iter([
    ///     ("name", "OpenStreetMap.Mapnik"),
    ///     ("url", "https://tile.openstreetmap.org/{z}/{x}/{y}.png"),
    ///     ("attribution", "(C) OpenStreetMap contributors"),
    /// ])
    /// .unwrap();
    /// assert_eq!(provider.name(), "OpenStreetMap.Mapnik");
    /// ```
    pub fn try_from_iter<I, K, V>(iter: I) -> ProviderResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn str_attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Unique name, for variants conventionally `Provider.Variant`.
    ///
    /// Returns an empty string if the stored name is not a string.
    #[must_use]
    pub fn name(&self) -> &str {
        self.str_attr("name").unwrap_or_default()
    }

    /// The URL template.
    #[must_use]
    pub fn url(&self) -> &str {
        self.str_attr("url").unwrap_or_default()
    }

    /// Plain-text attribution.
    #[must_use]
    pub fn attribution(&self) -> &str {
        self.str_attr("attribution").unwrap_or_default()
    }

    /// HTML attribution, falling back to the plain-text [`attribution`](Self::attribution).
    #[must_use]
    pub fn html_attribution(&self) -> &str {
        self.str_attr("html_attribution")
            .unwrap_or_else(|| self.attribution())
    }

    /// Minimum zoom level, if given as an integer.
    #[must_use]
    pub fn min_zoom(&self) -> Option<i64> {
        self.attributes.get("min_zoom").and_then(Value::as_i64)
    }

    /// Maximum zoom level, if given as an integer.
    #[must_use]
    pub fn max_zoom(&self) -> Option<i64> {
        self.attributes.get("max_zoom").and_then(Value::as_i64)
    }

    /// Bounding box as `[[south, west], [north, east]]` if present and well-formed.
    #[must_use]
    pub fn bounds(&self) -> Option<[[f64; 2]; 2]> {
        let corner = |v: &Value| -> Option<[f64; 2]> {
            match v.as_list()? {
                [lat, lon] => Some([lat.as_f64()?, lon.as_f64()?]),
                _ => None,
            }
        };
        match self.attributes.get("bounds")?.as_list()? {
            [a, b] => Some([corner(a)?, corner(b)?]),
            _ => None,
        }
    }

    /// Subdomain codes, one character each. Defaults to [`DEFAULT_SUBDOMAINS`].
    #[must_use]
    pub fn subdomains(&self) -> &str {
        self.str_attr("subdomains").unwrap_or(DEFAULT_SUBDOMAINS)
    }

    /// Status marker such as [`STATUS_BROKEN`].
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.str_attr("status")
    }

    /// `true` if the provider is marked as broken.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.status() == Some(STATUS_BROKEN)
    }

    /// All attributes in their stored order.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Consume the provider and return its attributes.
    #[must_use]
    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    /// Raw attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// `true` if the attribute exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Item-style access, failing with [`ProviderError::KeyNotFound`].
    pub fn item(&self, key: &str) -> ProviderResult<&Value> {
        self.get(key)
            .ok_or_else(|| ProviderError::KeyNotFound(key.to_string()))
    }

    /// Attribute-style access.
    ///
    /// Same lookup as [`item`](Self::item), but a missing key is reported
    /// as [`ProviderError::MissingField`].
    pub fn attr(&self, key: &str) -> ProviderResult<&Value> {
        self.item(key).map_err(|e| match e {
            ProviderError::KeyNotFound(key) => ProviderError::MissingField(key),
            e => e,
        })
    }

    /// Attribute names in their stored order.
    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Always `false`, a provider has at least its mandatory keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Set an attribute in place, returning the previous value.
    ///
    /// A provider shared between threads must be cloned (or locked) before
    /// mutation; every other operation is read-only.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(key.into(), value.into())
    }

    /// A new provider with `overrides` merged over the current attributes.
    ///
    /// Existing keys keep their position, new keys are appended.
    #[must_use]
    pub fn copy<I, K, V>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut new = self.clone();
        new.attributes
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        new
    }

    /// Builder-style single override, e.g. `provider.with("apikey", "...")`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// `true` if an attribute referenced by the URL template still holds a
    /// `"<insert your ... here>"` placeholder.
    #[must_use]
    pub fn requires_token(&self) -> bool {
        let url = self.url();
        self.attributes.iter().any(|(key, value)| {
            value
                .as_str()
                .is_some_and(|v| v.starts_with(TOKEN_PLACEHOLDER_PREFIX))
                && url.contains(key.as_str())
        })
    }

    /// Build a tile URL from the template.
    ///
    /// Coordinates that are not given stay as literal `{x}`, `{y}` or `{z}`,
    /// so calling this with default options returns the template with all
    /// provider parameters filled in. `{s}` becomes the first subdomain, and
    /// `{r}` becomes the explicit scale factor or the stored `r` attribute.
    ///
    /// Overrides are merged before the token check, so a missing token can be
    /// supplied per call.
    pub fn build_url(&self, options: &UrlOptions) -> ProviderResult<String> {
        let provider = self.copy(options.overrides.clone());
        if provider.requires_token() {
            return Err(ProviderError::TokenRequired(provider.name().to_string()));
        }

        let mut attributes = provider.attributes;
        let url = attributes
            .shift_remove("url")
            .map(|v| v.to_string())
            .unwrap_or_default();
        let subdomain = first_subdomain(attributes.shift_remove("subdomains").as_ref());
        let stored_r = attributes.shift_remove("r");
        let r = match &options.scale_factor {
            Some(scale_factor) => scale_factor.clone(),
            None => stored_r.map(|v| v.to_string()).unwrap_or_default(),
        };

        let coord = |value: Option<u32>, token: &'static str| -> Cow<'static, str> {
            value.map_or(Cow::Borrowed(token), |v| Cow::Owned(v.to_string()))
        };

        Ok(template::render(&url, |key| match key {
            "x" => Some(coord(options.x, "{x}")),
            "y" => Some(coord(options.y, "{y}")),
            "z" => Some(coord(options.z.map(u32::from), "{z}")),
            "s" => Some(Cow::Borrowed(subdomain.as_str())),
            "r" => Some(Cow::Borrowed(r.as_str())),
            other => attributes.get(other).map(|v| Cow::Owned(v.to_string())),
        })?)
    }
}

impl TryFrom<Attributes> for TileProvider {
    type Error = ProviderError;

    fn try_from(attributes: Attributes) -> ProviderResult<Self> {
        Self::new(attributes)
    }
}

impl Serialize for TileProvider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

/// The `{s}` substitution: the first item of a list of subdomains,
/// or the first character of a subdomain string.
fn first_subdomain(subdomains: Option<&Value>) -> String {
    match subdomains {
        None => DEFAULT_SUBDOMAINS.chars().take(1).collect(),
        Some(Value::String(codes)) => codes.chars().take(1).collect(),
        Some(Value::List(items)) => items.first().map(ToString::to_string).unwrap_or_default(),
        Some(other) => other.to_string().chars().take(1).collect(),
    }
}

/// Arguments of [`TileProvider::build_url`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlOptions {
    /// Substituted for `{x}`; left as a literal placeholder when `None`.
    pub x: Option<u32>,
    /// Substituted for `{y}`; left as a literal placeholder when `None`.
    pub y: Option<u32>,
    /// Substituted for `{z}`; left as a literal placeholder when `None`.
    pub z: Option<u8>,
    /// Substituted for `{r}` instead of the provider's `r` attribute.
    /// `Some("")` removes the suffix.
    pub scale_factor: Option<String>,
    /// Attributes merged over the provider before the URL is built.
    pub overrides: Attributes,
}

impl UrlOptions {
    /// Options without coordinates, see [`TileProvider::build_url`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a single tile.
    #[must_use]
    pub fn tile(x: u32, y: u32, z: u8) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            ..Self::default()
        }
    }

    /// Set the value for `{r}`.
    #[must_use]
    pub fn scale_factor(mut self, scale_factor: impl Into<String>) -> Self {
        self.scale_factor = Some(scale_factor.into());
        self
    }

    /// Add an attribute override, e.g. the API key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }
}
