//! Environment variable access.
//!
//! [`Env`] is used both for `${VAR}` expansion in the config file and for
//! locating the provider dataset through `XYZSERVICES_PROVIDERS`, so tests can
//! run against a [`FauxEnv`] instead of the process environment.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::PathBuf;

use log::warn;
use subst::VariableMap;

/// Environment variable with the path of the provider dataset.
pub const PROVIDERS_ENV_VAR: &str = "XYZSERVICES_PROVIDERS";

/// The environment seen by the config loader.
pub trait Env<'a>: VariableMap<'a> {
    /// Raw value of a variable.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// `true` once the config file has referenced `key` as `${key}`.
    fn is_referenced(&self, key: &str) -> bool;

    /// A variable as UTF-8 text, for substitution into the config file.
    ///
    /// Logs a warning and returns `None` if the value is not valid Unicode.
    #[must_use]
    fn get_env_str(&self, key: &str) -> Option<String> {
        match self.var_os(key)?.into_string() {
            Ok(v) => Some(v),
            Err(v) => {
                let v = v.to_string_lossy();
                warn!("Environment variable {key} has invalid unicode. Lossy representation: {v}");
                None
            }
        }
    }

    /// Dataset path from [`PROVIDERS_ENV_VAR`]. Empty values count as unset.
    ///
    /// Paths are taken as-is, they do not need to be valid Unicode.
    #[must_use]
    fn providers_dataset(&self) -> Option<PathBuf> {
        self.var_os(PROVIDERS_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Dataset path from the environment that is overruled by an explicit path,
    /// unless the config file itself used it in `providers: ${XYZSERVICES_PROVIDERS}`.
    #[must_use]
    fn overruled_providers_dataset(&self) -> Option<PathBuf> {
        if self.is_referenced(PROVIDERS_ENV_VAR) {
            None
        } else {
            self.providers_dataset()
        }
    }
}

/// The process environment. Remembers which variables the config file used.
#[derive(Debug, Default)]
pub struct OsEnv(RefCell<HashSet<String>>);

impl Env<'_> for OsEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn is_referenced(&self, key: &str) -> bool {
        self.0.borrow().contains(key)
    }
}

impl<'a> VariableMap<'a> for OsEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.borrow_mut().insert(key.to_string());
        self.get_env_str(key)
    }
}

/// A fixed set of variables for tests. References are not tracked.
#[derive(Debug, Default)]
pub struct FauxEnv(pub HashMap<&'static str, OsString>);

impl<'a> VariableMap<'a> for FauxEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.get_env_str(key)
    }
}

impl Env<'_> for FauxEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.get(key).cloned()
    }

    fn is_referenced(&self, _key: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_dataset() {
        assert_eq!(FauxEnv::default().providers_dataset(), None);

        let env = FauxEnv([(PROVIDERS_ENV_VAR, OsString::new())].into());
        assert_eq!(env.providers_dataset(), None);

        let env = FauxEnv([(PROVIDERS_ENV_VAR, OsString::from("p.json"))].into());
        assert_eq!(env.providers_dataset(), Some(PathBuf::from("p.json")));
        assert_eq!(env.overruled_providers_dataset(), Some(PathBuf::from("p.json")));
    }

    #[test]
    #[cfg(unix)]
    fn bad_unicode() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt as _;

        let bad_utf8 = [0x66, 0x6f, 0x80, 0x6f];
        let os_str = OsStr::from_bytes(&bad_utf8[..]);
        let env = FauxEnv(
            [
                ("BAD", os_str.to_owned()),
                (PROVIDERS_ENV_VAR, os_str.to_owned()),
            ]
            .into(),
        );
        assert_eq!(env.get_env_str("BAD"), None);
        assert_eq!(VariableMap::get(&env, "BAD"), None);
        // a path does not have to be valid unicode
        assert_eq!(env.providers_dataset(), Some(PathBuf::from(os_str)));
    }

    #[test]
    fn os_env_tracks_references() {
        let env = OsEnv::default();
        assert!(!env.is_referenced("XYZSERVICES_SURELY_UNSET_VAR"));
        assert_eq!(VariableMap::get(&env, "XYZSERVICES_SURELY_UNSET_VAR"), None);
        assert!(env.is_referenced("XYZSERVICES_SURELY_UNSET_VAR"));
    }
}
