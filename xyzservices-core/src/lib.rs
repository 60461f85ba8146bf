#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod bunch;
pub use bunch::{Bunch, Entry, ProviderFilter};

mod error;
pub use error::{ProviderError, ProviderResult};

mod loader;
pub use loader::{load_json, parse_providers, parse_providers_reader, read_providers};

mod provider;
pub use provider::{
    DEFAULT_SUBDOMAINS, MANDATORY_KEYS, STATUS_BROKEN, TOKEN_PLACEHOLDER_PREFIX, TileProvider,
    UrlOptions,
};

/// URL template rendering
pub mod template;

mod value;
pub use value::{Attributes, Value};

/// Lookup in the QuickMapServices catalog
#[cfg(feature = "qms")]
pub mod qms;
