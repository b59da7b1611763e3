//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::Parser;
use std::path::PathBuf;

/// Replace links to embeddable media with their oEmbed representation.
#[derive(Debug, Parser)]
#[command(name = "oembed-links")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provider configuration file (YAML)
    #[arg(short, long, env = "OEMBED_LINKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only extract strictly valid http URIs
    #[arg(long)]
    pub strict: bool,

    /// Extra query parameter sent to providers (repeatable)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Render every matched URL with this template
    #[arg(short, long)]
    pub template: Option<String>,

    /// Directory templates are resolved against
    #[arg(long)]
    pub template_root: Option<PathBuf>,

    /// Force a template processor (erb, erubis, haml)
    #[arg(long)]
    pub processor: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Input file (reads stdin when omitted)
    pub input: Option<PathBuf>,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
