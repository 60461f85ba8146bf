use std::io;
use std::path::PathBuf;

use xyzservices_core::ProviderError;

/// A convenience [`Result`] for the xyzservices tool.
pub type XyzResult<T> = Result<T, XyzError>;

#[derive(thiserror::Error, Debug)]
pub enum XyzError {
    #[error(transparent)]
    ProviderError(#[from] ProviderError),

    #[error("Unable to load config file {1}: {0}")]
    ConfigLoadError(#[source] io::Error, PathBuf),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(#[source] subst::yaml::Error, PathBuf),

    #[error(
        "No provider dataset given. Use --providers, the `providers` key of the config file, or the XYZSERVICES_PROVIDERS environment variable."
    )]
    NoProviders,

    #[error("Unable to write output: {0}")]
    OutputError(#[from] io::Error),

    #[error("Unable to serialize as YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Unable to serialize as JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
