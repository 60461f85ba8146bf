use std::path::PathBuf;

use itertools::Itertools as _;

use crate::template::TemplateError;

/// A convenience [`Result`] for operations on providers and bunches.
pub type ProviderResult<T> = Result<T, ProviderError>;

fn quote_keys(keys: &[&str]) -> String {
    keys.iter().map(|k| format!("'{k}'")).join(", ")
}

/// Errors that can occur while loading, querying or using tile providers.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// One or more of `name`, `url` and `attribution` were not given.
    #[error(
        "The attributes `name`, `url`, and `attribution` are required to initialise a `TileProvider`. Please provide values for: {}",
        quote_keys(.0)
    )]
    MissingMandatory(Vec<&'static str>),

    /// Item-style access to a key that does not exist.
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    /// Attribute-style access to a field that does not exist.
    #[error("No field named '{0}'")]
    MissingField(String),

    /// The provider still contains an unfilled token placeholder referenced by its URL.
    #[error(
        "Token is required for provider '{0}', but not provided. You can either update the TileProvider or pass respective keywords to build_url()."
    )]
    TokenRequired(String),

    /// The URL template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// No provider matched a name query.
    #[error("No matching provider found for the query '{0}'.")]
    NotFound(String),

    /// The top level of a dataset is not a mapping.
    #[error("Provider dataset must be a JSON object keyed by provider name")]
    InvalidDataset,

    /// A provider or variant entry in a dataset is not a mapping, or has no variants.
    #[error("Provider entry '{0}' must be a provider record or a non-empty object of variants")]
    InvalidEntry(String),

    /// A provider entry contains values that cannot be stored in a flat record.
    #[error("Invalid attributes for provider '{0}': {1}")]
    InvalidAttributes(String, #[source] serde_json::Error),

    /// The dataset is not valid JSON.
    #[error("Unable to parse provider data: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The dataset file could not be read.
    #[error("Unable to read provider file {1}: {0}")]
    FileReadError(#[source] std::io::Error, PathBuf),

    /// The dataset file is not valid JSON.
    #[error("Unable to parse provider file {1}: {0}")]
    FileParseError(#[source] serde_json::Error, PathBuf),

    /// The QuickMapServices catalog has no TMS service with this exact name.
    #[cfg(feature = "qms")]
    #[error("No TileMap service with name '{0}' found.")]
    QmsServiceNotFound(String),

    /// A request to the QuickMapServices catalog failed.
    #[cfg(feature = "qms")]
    #[error("QuickMapServices request failed: {0}")]
    QmsRequestError(#[from] reqwest::Error),

    /// The QuickMapServices base URL is invalid.
    #[cfg(feature = "qms")]
    #[error("Invalid QuickMapServices URL {1}: {0}")]
    QmsUrlError(#[source] url::ParseError, String),
}
