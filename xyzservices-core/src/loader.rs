//! Building a [`Bunch`] tree from a JSON provider dataset.
//!
//! The dataset maps provider names either to a single provider record, or to
//! a mapping of variant names to provider records. A record is recognized by
//! its `url` key.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::value::Attributes;
use crate::{Bunch, ProviderError, ProviderResult, TileProvider};

/// Build the provider tree from an already parsed dataset.
///
/// Provider and variant order follows the dataset. Records are taken as they
/// are: names are not rewritten, and a record lacking a mandatory key fails
/// with [`ProviderError::MissingMandatory`]. An entry with neither a `url`
/// nor any variant is an [`ProviderError::InvalidEntry`].
pub fn load_json(data: JsonValue) -> ProviderResult<Bunch> {
    let JsonValue::Object(data) = data else {
        return Err(ProviderError::InvalidDataset);
    };

    let mut bunch = Bunch::new();
    for (name, entry) in data {
        let JsonValue::Object(entry) = entry else {
            return Err(ProviderError::InvalidEntry(name));
        };
        if entry.contains_key("url") {
            let provider = to_provider(&name, entry)?;
            bunch.insert(name, provider);
        } else if entry.is_empty() {
            return Err(ProviderError::InvalidEntry(name));
        } else {
            let mut variants = Bunch::new();
            for (variant, attributes) in entry {
                let path = format!("{name}.{variant}");
                let JsonValue::Object(attributes) = attributes else {
                    return Err(ProviderError::InvalidEntry(path));
                };
                variants.insert(variant, to_provider(&path, attributes)?);
            }
            bunch.insert(name, variants);
        }
    }

    debug!(
        "Loaded {} providers in {} top-level entries",
        bunch.providers().count(),
        bunch.len()
    );
    Ok(bunch)
}

fn to_provider(path: &str, attributes: Map<String, JsonValue>) -> ProviderResult<TileProvider> {
    let attributes: Attributes = serde_json::from_value(JsonValue::Object(attributes))
        .map_err(|e| ProviderError::InvalidAttributes(path.to_string(), e))?;
    TileProvider::new(attributes)
}

/// Parse a JSON dataset from a string.
pub fn parse_providers(contents: &str) -> ProviderResult<Bunch> {
    load_json(serde_json::from_str(contents)?)
}

/// Parse a JSON dataset from a reader.
pub fn parse_providers_reader<R: Read>(reader: R) -> ProviderResult<Bunch> {
    load_json(serde_json::from_reader(reader)?)
}

/// Read a JSON dataset file.
pub fn read_providers(file_name: &Path) -> ProviderResult<Bunch> {
    let file =
        File::open(file_name).map_err(|e| ProviderError::FileReadError(e, file_name.into()))?;
    let data = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ProviderError::FileParseError(e, file_name.into()))?;
    load_json(data)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use indoc::indoc;
    use serde_json::json;

    use super::*;
    use crate::Entry;

    const DATASET: &str = indoc! {r#"
        {
          "OpenTopoMap": {
            "url": "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            "max_zoom": 17,
            "attribution": "(C) OpenStreetMap contributors, SRTM | Map style: (C) OpenTopoMap (CC-BY-SA)",
            "name": "OpenTopoMap"
          },
          "Stadia": {
            "AlidadeSmooth": {
              "url": "https://tiles.stadiamaps.com/tiles/alidade_smooth/{z}/{x}/{y}{r}.png",
              "max_zoom": 20,
              "attribution": "(C) Stadia Maps (C) OpenMapTiles (C) OpenStreetMap contributors",
              "name": "Stadia.AlidadeSmooth"
            },
            "Outdoors": {
              "url": "https://tiles.stadiamaps.com/tiles/outdoors/{z}/{x}/{y}{r}.png",
              "max_zoom": 20,
              "attribution": "(C) Stadia Maps (C) OpenMapTiles (C) OpenStreetMap contributors",
              "name": "Stadia.Outdoors"
            }
          }
        }
    "#};

    #[test]
    fn loads_single_and_multi_variant_providers() {
        let bunch = parse_providers(DATASET).unwrap();
        assert_eq!(bunch.keys().collect::<Vec<_>>(), ["OpenTopoMap", "Stadia"]);

        let Some(Entry::Provider(topo)) = bunch.get("OpenTopoMap") else {
            panic!("OpenTopoMap should be a provider");
        };
        assert_eq!(topo.max_zoom(), Some(17));

        let stadia = bunch.get_bunch("Stadia").unwrap();
        assert_eq!(stadia.keys().collect::<Vec<_>>(), ["AlidadeSmooth", "Outdoors"]);
        assert_eq!(stadia.get_provider("Outdoors").unwrap().name(), "Stadia.Outdoors");

        assert_eq!(bunch.flatten().len(), 3);
    }

    #[test]
    fn loading_is_deterministic() {
        assert_eq!(parse_providers(DATASET).unwrap(), parse_providers(DATASET).unwrap());
    }

    #[test]
    fn missing_mandatory_key_fails() {
        let data = json!({"Bad": {"url": "https://{z}/{x}/{y}", "name": "Bad"}});
        let err = load_json(data).unwrap_err();
        assert!(matches!(err, ProviderError::MissingMandatory(ref keys) if keys == &["attribution"]));
    }

    #[test]
    fn variant_missing_mandatory_key_fails() {
        let data = json!({"Group": {"A": {"url": "https://{z}/{x}/{y}", "attribution": "a"}}});
        let err = load_json(data).unwrap_err();
        assert!(matches!(err, ProviderError::MissingMandatory(ref keys) if keys == &["name"]));
    }

    #[test]
    fn invalid_shapes() {
        assert!(matches!(
            load_json(json!([1, 2])),
            Err(ProviderError::InvalidDataset)
        ));
        assert!(matches!(
            load_json(json!({"A": "text"})),
            Err(ProviderError::InvalidEntry(name)) if name == "A"
        ));
        assert!(matches!(
            load_json(json!({"A": {"B": 3}})),
            Err(ProviderError::InvalidEntry(name)) if name == "A.B"
        ));
        assert!(matches!(
            load_json(json!({"A": {"url": "u", "name": "A", "attribution": "a", "opts": {"x": 1}}})),
            Err(ProviderError::InvalidAttributes(name, _)) if name == "A"
        ));
    }

    #[test]
    fn empty_provider_entry_fails() {
        assert!(matches!(
            load_json(json!({"A": {}})),
            Err(ProviderError::InvalidEntry(name)) if name == "A"
        ));
    }

    #[test]
    fn read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();
        let bunch = read_providers(file.path()).unwrap();
        assert_eq!(bunch.len(), 2);

        let bunch = parse_providers_reader(DATASET.as_bytes()).unwrap();
        assert_eq!(bunch.len(), 2);
    }

    #[test]
    fn read_errors_include_path() {
        let err = read_providers(Path::new("/does/not/exist.json")).unwrap_err();
        assert!(matches!(err, ProviderError::FileReadError(..)));
        assert!(err.to_string().contains("/does/not/exist.json"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let err = read_providers(file.path()).unwrap_err();
        assert!(matches!(err, ProviderError::FileParseError(..)));
    }
}
