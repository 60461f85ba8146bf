use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand, ValueEnum};
use xyzservices_core::{ProviderFilter, UrlOptions};

use crate::config::file::Config;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, PartialEq, Debug)]
#[command(
    version,
    name = "xyzservices",
    about = "Browse XYZ tile providers and build tile URLs",
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=xyzservices=debug. Use XYZSERVICES_FORMAT to choose the log format: json, full, compact, bare or pretty.",
    styles = HELP_STYLES
)]
pub struct Args {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// JSON provider dataset. Takes precedence over the config file and the XYZSERVICES_PROVIDERS environment variable.
    #[arg(short, long, global = true)]
    pub providers: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Apply command line values over the config file values.
    pub fn merge_into_config(&self, config: &mut Config) {
        if self.providers.is_some() {
            config.providers.clone_from(&self.providers);
        }
    }
}

#[derive(Subcommand, PartialEq, Debug)]
pub enum Commands {
    /// List providers as a tree, or as a flat list of names when flattened or filtered
    #[command(name = "list", alias = "ls")]
    List(ListArgs),
    /// Print all attributes of a provider
    #[command(name = "show", alias = "info")]
    Show {
        /// Provider name, matched ignoring case, spaces and `.,-_/`
        name: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::default())]
        format: OutputFormat,
    },
    /// Build a tile URL. Coordinates that are not given stay as `{x}`, `{y}` or `{z}` placeholders.
    #[command(name = "url")]
    Url(UrlArgs),
    /// Create a provider from a QuickMapServices TMS service with exactly this name
    #[cfg(feature = "qms")]
    #[command(name = "qms")]
    Qms {
        /// Service name in the QuickMapServices catalog
        name: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::default())]
        format: OutputFormat,
    },
}

#[derive(clap::Args, PartialEq, Debug, Default)]
pub struct ListArgs {
    /// Print one provider name per line instead of the tree
    #[arg(long)]
    pub flat: bool,
    /// Only providers with an attribute containing this text (case-insensitive)
    #[arg(short, long)]
    pub keyword: Option<String>,
    /// Only providers whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub name: Option<String>,
    /// Only providers that do (`true`) or do not (`false`) need an API key
    #[arg(long)]
    pub requires_token: Option<bool>,
    /// Skip providers marked as broken
    #[arg(long)]
    pub exclude_broken: bool,
}

impl ListArgs {
    /// Filter built from the arguments. `exclude_broken` from the config file
    /// applies as well.
    #[must_use]
    pub fn to_filter(&self, config: &Config) -> ProviderFilter {
        ProviderFilter {
            keyword: self.keyword.clone(),
            name: self.name.clone(),
            requires_token: self.requires_token,
            exclude_broken: self.exclude_broken || config.exclude_broken,
        }
    }
}

#[derive(clap::Args, PartialEq, Debug)]
pub struct UrlArgs {
    /// Provider name, matched ignoring case, spaces and `.,-_/`
    pub name: String,
    /// Tile column
    #[arg(short)]
    pub x: Option<u32>,
    /// Tile row
    #[arg(short)]
    pub y: Option<u32>,
    /// Zoom level
    #[arg(short)]
    pub z: Option<u8>,
    /// Value for `{r}`, e.g. `@2x` for high resolution tiles. Use an empty string to remove it.
    #[arg(long)]
    pub scale_factor: Option<String>,
    /// Override a provider attribute, e.g. `--set apikey=MY_KEY`. Can be repeated.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,
}

impl UrlArgs {
    /// URL options with the given overrides applied last.
    #[must_use]
    pub fn to_options(&self) -> UrlOptions {
        let mut options = UrlOptions {
            x: self.x,
            y: self.y,
            z: self.z,
            scale_factor: self.scale_factor.clone(),
            ..UrlOptions::default()
        };
        for (key, value) in &self.overrides {
            options = options.with(key.as_str(), value.as_str());
        }
        options
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Output format of provider attributes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn list_no_arguments() {
        assert_eq!(
            Args::parse_from(["xyzservices", "list"]),
            Args {
                config: None,
                providers: None,
                command: Commands::List(ListArgs::default()),
            }
        );
    }

    #[test]
    fn list_with_filters() {
        let args = Args::parse_from([
            "xyzservices",
            "ls",
            "--keyword",
            "carto",
            "--requires-token",
            "false",
            "--exclude-broken",
            "--providers",
            "p.json",
        ]);
        assert_eq!(
            args,
            Args {
                config: None,
                providers: Some(PathBuf::from("p.json")),
                command: Commands::List(ListArgs {
                    flat: false,
                    keyword: Some("carto".to_string()),
                    name: None,
                    requires_token: Some(false),
                    exclude_broken: true,
                }),
            }
        );
    }

    #[test]
    fn list_filter_uses_config() {
        let config = Config {
            exclude_broken: true,
            ..Config::default()
        };
        let filter = ListArgs::default().to_filter(&config);
        assert_eq!(
            filter,
            ProviderFilter {
                exclude_broken: true,
                ..ProviderFilter::default()
            }
        );
    }

    #[test]
    fn requires_token_needs_bool() {
        assert_eq!(
            Args::try_parse_from(["xyzservices", "list", "--requires-token", "maybe"])
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidValue
        );
    }

    #[test]
    fn show_arguments() {
        assert_eq!(
            Args::try_parse_from(["xyzservices", "show"])
                .unwrap_err()
                .kind(),
            ErrorKind::MissingRequiredArgument
        );
        assert_eq!(
            Args::parse_from([
                "xyzservices",
                "-c",
                "cfg.yaml",
                "show",
                "CartoDB.Positron",
                "-f",
                "json"
            ]),
            Args {
                config: Some(PathBuf::from("cfg.yaml")),
                providers: None,
                command: Commands::Show {
                    name: "CartoDB.Positron".to_string(),
                    format: OutputFormat::Json,
                },
            }
        );
    }

    #[test]
    fn url_arguments() {
        let args = Args::parse_from([
            "xyzservices",
            "url",
            "Thunderforest.OpenCycleMap",
            "-x",
            "1",
            "-y",
            "2",
            "-z",
            "3",
            "--scale-factor",
            "@2x",
            "--set",
            "apikey=KEY",
            "--set",
            "variant=a=b",
        ]);
        let Commands::Url(url) = args.command else {
            panic!("expected url command");
        };
        assert_eq!(
            url,
            UrlArgs {
                name: "Thunderforest.OpenCycleMap".to_string(),
                x: Some(1),
                y: Some(2),
                z: Some(3),
                scale_factor: Some("@2x".to_string()),
                overrides: vec![
                    ("apikey".to_string(), "KEY".to_string()),
                    ("variant".to_string(), "a=b".to_string()),
                ],
            }
        );

        assert_eq!(
            url.to_options(),
            UrlOptions::tile(1, 2, 3)
                .scale_factor("@2x")
                .with("apikey", "KEY")
                .with("variant", "a=b")
        );
    }

    #[test]
    fn url_bad_arguments() {
        assert_eq!(
            Args::try_parse_from(["xyzservices", "url", "P", "--set", "novalue"])
                .unwrap_err()
                .kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            Args::try_parse_from(["xyzservices", "url", "P", "-z", "300"])
                .unwrap_err()
                .kind(),
            ErrorKind::ValueValidation
        );
    }

    #[test]
    fn merge_cli_over_config() {
        let mut config = Config {
            providers: Some(PathBuf::from("config.json")),
            ..Config::default()
        };
        Args::parse_from(["xyzservices", "list"]).merge_into_config(&mut config);
        assert_eq!(config.providers, Some(PathBuf::from("config.json")));

        Args::parse_from(["xyzservices", "list", "-p", "cli.json"]).merge_into_config(&mut config);
        assert_eq!(config.providers, Some(PathBuf::from("cli.json")));
    }
}
