//! Trellis CLI
//!
//! Converts between HTML and builder documents from the command line.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use trellis_config::TrellisConfig;
use trellis_doc::html::documents_equivalent;
use trellis_doc::{
    DocumentTreeResult, HtmlOptions, content_hash, document_from_json, document_to_html_with,
    document_to_json, html_to_document_with, node_to_html,
};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "HTML to builder-document conversion", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./trellis.toml when present)
    #[arg(long, global = true, env = "TRELLIS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert HTML into a builder document (JSON)
    ToDoc {
        /// Input HTML file, or `-` for stdin
        input: PathBuf,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Render a builder document (JSON) as HTML
    ToHtml {
        /// Input JSON file, or `-` for stdin
        input: PathBuf,

        /// Write the HTML here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Render the body content only, without the document shell
        #[arg(long)]
        fragment: bool,
    },
    /// Convert, serialize and convert again; fails if the trees differ
    Check {
        /// Input HTML file, or `-` for stdin
        input: PathBuf,
    },
    /// Print the content hash of the canonical serialization
    Hash {
        /// Input HTML file, or `-` for stdin
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let options = config
        .html_options()
        .context("configuration does not produce valid engine options")?;

    match cli.command {
        Commands::ToDoc { input, out, pretty } => {
            let result = convert(&input, &options)?;
            report(&result);
            let json = document_to_json(&result.root, pretty)?;
            emit(out.as_deref(), &json)
        }
        Commands::ToHtml {
            input,
            out,
            fragment,
        } => {
            let json = read_input(&input)?;
            let root = document_from_json(&json)
                .with_context(|| format!("{} is not a valid document", input.display()))?;
            let html = if fragment {
                let mut html = String::new();
                for child in &root.children {
                    html.push_str(&node_to_html(child, &options.breakpoints)?);
                }
                html
            } else {
                document_to_html_with(&root, &options.breakpoints)?
            };
            emit(out.as_deref(), &html)
        }
        Commands::Check { input } => {
            let first = convert(&input, &options)?;
            report(&first);
            let html = document_to_html_with(&first.root, &options.breakpoints)?;
            let second = html_to_document_with(&html, &options)?;
            if !documents_equivalent(&first.root, &second.root) {
                bail!("{}: tree changed across a round trip", input.display());
            }
            println!(
                "ok: {} nodes, {} sealed as OpaqueHTML",
                first.root.node_count(),
                first.root.descendants().filter(|node| node.is_opaque()).count()
            );
            Ok(())
        }
        Commands::Hash { input } => {
            let result = convert(&input, &options)?;
            let html = document_to_html_with(&result.root, &options.breakpoints)?;
            println!("{}", content_hash(&html));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TrellisConfig> {
    let mut config = match path {
        Some(path) => TrellisConfig::load_from_file(path)?,
        None => TrellisConfig::load_or_default(),
    };
    config.merge_with_env();
    debug!(?config, "loaded configuration");
    Ok(config)
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn convert(input: &Path, options: &HtmlOptions) -> Result<DocumentTreeResult> {
    let html = read_input(input)?;
    let result = html_to_document_with(&html, options)
        .with_context(|| format!("failed to convert {}", input.display()))?;
    info!(nodes = result.root.node_count(), demoted = result.demoted, "converted");
    Ok(result)
}

fn emit(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

/// One-line diagnostics summary on stderr.
fn report(result: &DocumentTreeResult) {
    let diagnostics = &result.diagnostics;
    eprintln!(
        "parse errors: {}, unsupported: {}, demoted: {}, stripped elements: {}, stripped attributes: {}{}",
        diagnostics.parse_errors.len(),
        diagnostics.unsupported.len(),
        diagnostics.demoted.len(),
        diagnostics.stripped_elements,
        diagnostics.stripped_attributes,
        if diagnostics.degraded { ", nesting limit exceeded" } else { "" }
    );
}
