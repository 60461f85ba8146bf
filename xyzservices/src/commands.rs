//! Implementation of the `xyzservices` subcommands.
//!
//! Each command writes its result to `out`, logs go to stderr.

use std::io::Write;
use std::{io, mem};

use tracing::{debug, info};
#[cfg(feature = "qms")]
use xyzservices_core::qms::QmsClient;
use xyzservices_core::{Bunch, Entry, ProviderFilter, TileProvider};

use crate::XyzResult;
use crate::config::args::{ListArgs, OutputFormat, UrlArgs};
use crate::config::file::Config;

/// Print the provider tree, or the names of the matching providers when
/// a filter is set or `--flat` is given.
pub fn list(providers: &Bunch, args: &ListArgs, config: &Config, out: &mut impl Write) -> XyzResult<()> {
    let filter = args.to_filter(config);
    if filter == ProviderFilter::default() && !args.flat {
        write_tree(providers, 0, out)?;
        return Ok(());
    }

    let matching = providers.filter_by(&filter);
    debug!("{} providers match {filter:?}", matching.len());
    for name in matching.keys() {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

fn write_tree(bunch: &Bunch, depth: usize, out: &mut impl Write) -> io::Result<()> {
    for (name, entry) in bunch {
        writeln!(out, "{:indent$}{name}", "", indent = depth * 2)?;
        if let Entry::Bunch(variants) = entry {
            write_tree(variants, depth + 1, out)?;
        }
    }
    Ok(())
}

/// Print all attributes of the provider matching `name`.
pub fn show(providers: &Bunch, name: &str, format: OutputFormat, out: &mut impl Write) -> XyzResult<()> {
    let provider = providers.query_name(name)?;
    write_serialized(provider, format, out)
}

/// Print the tile URL of the provider matching `args.name`.
///
/// Configured tokens fill attributes that still hold a placeholder,
/// `--set` overrides are applied on top.
pub fn url(providers: &Bunch, args: &UrlArgs, config: &Config, out: &mut impl Write) -> XyzResult<()> {
    let provider = providers.query_name(&args.name)?;
    let tokens = config.token_overrides(provider);
    if !tokens.is_empty() {
        info!(
            "Using configured tokens for {}: {}",
            provider.name(),
            tokens.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        );
    }

    let mut options = args.to_options();
    let overrides = mem::take(&mut options.overrides);
    options.overrides = tokens;
    options.overrides.extend(overrides);

    writeln!(out, "{}", provider.build_url(&options)?)?;
    Ok(())
}

/// Look up a TMS service in the QuickMapServices catalog and print it as a provider.
#[cfg(feature = "qms")]
pub async fn qms(
    client: &QmsClient,
    name: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> XyzResult<()> {
    let provider = client.provider(name).await?;
    write_serialized(&provider, format, out)
}

fn write_serialized(provider: &TileProvider, format: OutputFormat, out: &mut impl Write) -> XyzResult<()> {
    match format {
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(provider)?)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, provider)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
