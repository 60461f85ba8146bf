use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tracing::{info, warn};
use xyzservices_core::{Attributes, Bunch, TOKEN_PLACEHOLDER_PREFIX, TileProvider, read_providers};

use crate::config::env::{Env, PROVIDERS_ENV_VAR};
use crate::{XyzError, XyzResult};

pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;
pub type UnrecognizedKeys = HashSet<String>;

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path of the JSON provider dataset
    pub providers: Option<PathBuf>,

    /// API keys and access tokens, keyed by the attribute they replace
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tokens: BTreeMap<String, String>,

    /// Skip providers with `status: broken` when listing
    #[serde(default)]
    pub exclude_broken: bool,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl Config {
    /// Warn about unknown keys, and return them.
    pub fn finalize(&self) -> UnrecognizedKeys {
        let res: UnrecognizedKeys = self.unrecognized.keys().cloned().collect();
        for key in &res {
            warn!(
                "Ignoring unrecognized configuration key '{key}'. Please check your configuration file for typos."
            );
        }
        res
    }

    /// Dataset path from the config (or the command line merged into it),
    /// falling back to the `XYZSERVICES_PROVIDERS` environment variable.
    pub fn providers_path<'a>(&self, env: &impl Env<'a>) -> XyzResult<PathBuf> {
        if let Some(path) = &self.providers {
            if let Some(ignored) = env.overruled_providers_dataset() {
                info!(
                    "Ignoring {PROVIDERS_ENV_VAR}={}, using {}",
                    ignored.display(),
                    path.display()
                );
            }
            return Ok(path.clone());
        }
        env.providers_dataset().ok_or(XyzError::NoProviders)
    }

    /// Load the provider dataset.
    pub fn load_providers<'a>(&self, env: &impl Env<'a>) -> XyzResult<Bunch> {
        let path = self.providers_path(env)?;
        info!("Loading providers from {}", path.display());
        Ok(read_providers(&path)?)
    }

    /// Configured tokens for the attributes of `provider` that still hold
    /// an `<insert your ... here>` placeholder.
    #[must_use]
    pub fn token_overrides(&self, provider: &TileProvider) -> Attributes {
        self.tokens
            .iter()
            .filter(|(key, _)| {
                provider
                    .get(key)
                    .and_then(|v| v.as_str())
                    .is_some_and(|v| v.starts_with(TOKEN_PLACEHOLDER_PREFIX))
            })
            .map(|(key, token)| (key.clone(), token.as_str().into()))
            .collect()
    }
}

/// Read a config file, expanding `${VAR}` references from `env`.
pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> XyzResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let mut file =
        File::open(file_name).map_err(|e| XyzError::ConfigLoadError(e, file_name.into()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| XyzError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> XyzResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env).map_err(|e| XyzError::ConfigParseError(e, file_name.into()))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::io::Write as _;

    use indoc::indoc;
    use insta::assert_yaml_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::env::FauxEnv;

    fn parse(yaml: &str, env: &FauxEnv) -> Config {
        parse_config(yaml, env, Path::new("config.yaml")).unwrap()
    }

    #[test]
    fn parse_full_config() {
        let env = FauxEnv([("TF_KEY", OsString::from("secret"))].into());
        let config = parse(
            indoc! {"
                providers: /data/providers.json
                exclude_broken: true
                tokens:
                  apikey: ${TF_KEY}
                  accessToken: pk.abc
            "},
            &env,
        );
        assert_yaml_snapshot!(config, @r#"
        providers: /data/providers.json
        tokens:
          accessToken: pk.abc
          apikey: secret
        exclude_broken: true
        "#);
        assert!(config.finalize().is_empty());
    }

    #[test]
    fn empty_config() {
        let config = parse("{}", &FauxEnv::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    #[tracing_test::traced_test]
    fn unrecognized_keys_are_reported() {
        let config = parse("providers: p.json\nexclude_brokn: true\n", &FauxEnv::default());
        assert_eq!(config.finalize(), ["exclude_brokn".to_string()].into());
        assert!(!config.exclude_broken);
        assert!(logs_contain("Ignoring unrecognized configuration key 'exclude_brokn'"));
    }

    #[test]
    fn missing_variable_fails() {
        let err =
            parse_config("tokens:\n  apikey: ${NOT_SET}\n", &FauxEnv::default(), Path::new("c.yaml"))
                .unwrap_err();
        assert!(matches!(err, XyzError::ConfigParseError(_, ref p) if p == Path::new("c.yaml")));
    }

    #[test]
    fn read_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"providers: p.json\n").unwrap();
        let config = read_config(file.path(), &FauxEnv::default()).unwrap();
        assert_eq!(config.providers, Some(PathBuf::from("p.json")));

        let err = read_config(Path::new("/does/not/exist.yaml"), &FauxEnv::default()).unwrap_err();
        assert!(matches!(err, XyzError::ConfigLoadError(..)));
        assert!(err.to_string().contains("/does/not/exist.yaml"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn providers_path_precedence() {
        let env = FauxEnv([(PROVIDERS_ENV_VAR, OsString::from("env.json"))].into());
        let config = Config::default();
        assert_eq!(config.providers_path(&env).unwrap(), PathBuf::from("env.json"));

        let config = Config {
            providers: Some(PathBuf::from("config.json")),
            ..Config::default()
        };
        assert_eq!(config.providers_path(&env).unwrap(), PathBuf::from("config.json"));
        assert!(logs_contain("Ignoring XYZSERVICES_PROVIDERS=env.json, using config.json"));

        let err = Config::default().providers_path(&FauxEnv::default()).unwrap_err();
        assert!(matches!(err, XyzError::NoProviders));
    }

    #[test]
    fn tokens_only_replace_placeholders() {
        let provider = TileProvider::try_from_iter([
            ("name", "P"),
            ("url", "https://p/{z}/{x}/{y}?key={apikey}&id={id}"),
            ("attribution", "P"),
            ("apikey", "<insert your api key here>"),
            ("id", "streets"),
        ])
        .unwrap();
        let config = Config {
            tokens: [
                ("apikey".to_string(), "KEY".to_string()),
                ("id".to_string(), "other".to_string()),
                ("accessToken".to_string(), "TOKEN".to_string()),
            ]
            .into(),
            ..Config::default()
        };
        let overrides = config.token_overrides(&provider);
        assert_eq!(overrides.keys().collect::<Vec<_>>(), ["apikey"]);
        assert_eq!(overrides["apikey"].as_str(), Some("KEY"));
    }
}
