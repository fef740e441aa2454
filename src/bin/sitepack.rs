//! # sitepack CLI - inspect and validate SCP collections
//!
//! Command-line front-end for the sitepack codec.
//!
//! ## Usage
//! ```bash
//! # Human-readable report of a collection file
//! sitepack inspect collection.scp.gz
//!
//! # Include per-page detail, or full content blocks
//! sitepack inspect --pages snapshot.scp.zst
//! sitepack inspect --content delta.scp.gz --limit 5
//!
//! # Machine-readable report
//! sitepack inspect --json collection.scp.gz > report.json
//!
//! # Validate; exit code 0 on success, 1 on any fatal error
//! sitepack validate collection.scp.gz
//! sitepack validate --strict snapshot.scp.gz
//! ```

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use colored::*;
use sitepack::{ParseOptions, ParseOutcome, Parser, SchemaValidator};
use std::path::{Path, PathBuf};

/// sitepack CLI - inspect and validate SCP collection files
#[derive(ClapParser)]
#[command(name = "sitepack")]
#[command(version)]
#[command(about = "Inspect and validate SCP web-content collections")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a read-only report of a collection file
    Inspect {
        /// Collection file (.scp, .scp.gz, or .scp.zst)
        file: PathBuf,

        /// Show detailed page information
        #[arg(long)]
        pages: bool,

        /// Show content blocks (implies --pages)
        #[arg(long)]
        content: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Limit number of pages shown
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Validate a collection file against the format
    Validate {
        /// Collection file (.scp, .scp.gz, or .scp.zst)
        file: PathBuf,

        /// Fail on the first per-record error instead of recovering
        #[arg(long)]
        strict: bool,

        /// Suppress output, only return exit code
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "debug".into()),
            )
            .init();
    }

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inspect {
            file,
            pages,
            content,
            json,
            limit,
        } => cmd_inspect(&file, pages || content, content, json, limit),
        Commands::Validate {
            file,
            strict,
            quiet,
        } => cmd_validate(&file, strict, quiet),
    }
}

/// Parse a collection file, printing recovered diagnostics to stderr
fn parse_file(file: &Path, strict: bool) -> Result<ParseOutcome> {
    let validator = SchemaValidator::new();
    let parser = Parser::with_options(
        &validator,
        ParseOptions {
            strict,
            ..ParseOptions::default()
        },
    );
    parser
        .parse_file(file)
        .with_context(|| format!("failed to parse {}", file.display()))
}

fn cmd_inspect(
    file: &Path,
    show_pages: bool,
    show_content: bool,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let file_size = std::fs::metadata(file)
        .with_context(|| format!("cannot read {}", file.display()))?
        .len();
    let outcome = parse_file(file, false)?;
    let collection = &outcome.collection;

    for diagnostic in &outcome.diagnostics {
        eprintln!("{}", diagnostic);
    }

    if json {
        let limit = limit.unwrap_or(collection.page_count());
        let mut report = serde_json::json!({
            "file": file.display().to_string(),
            "size": file_size,
            "metadata": collection.metadata,
            "page_count": collection.page_count(),
        });
        if show_pages {
            report["pages"] = serde_json::to_value(&collection.pages[..limit.min(collection.page_count())])?;
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("SCP Collection: {}", file.display().to_string().cyan());
    println!("File size: {}", format_size(file_size));
    println!();
    println!("{}", "Collection Metadata:".bold());
    println!("  ID: {}", collection.metadata.id);
    println!("  Type: {}", collection.metadata.collection_type);
    println!("  Section: {}", collection.metadata.section);
    println!("  Version: {}", collection.metadata.version);
    println!("  Generated: {}", collection.metadata.generated);
    if let Some(since) = &collection.metadata.since {
        println!("  Since: {}", since);
    }
    if let Some(checksum) = &collection.metadata.checksum {
        println!("  Checksum: {}", checksum);
    }
    println!();
    println!("Pages: {}", collection.page_count());

    if show_pages {
        let limit = limit.unwrap_or(collection.page_count());
        for (i, page) in collection.pages.iter().take(limit).enumerate() {
            println!();
            println!("{}", format!("Page {}:", i + 1).bold());
            println!("  URL: {}", page.url);
            println!("  Title: {}", page.title);
            println!("  Description: {}", page.description);
            if let Some(author) = &page.author {
                println!("  Author: {}", author);
            }
            if let Some(published) = &page.published {
                println!("  Published: {}", published);
            }
            println!("  Modified: {}", page.modified);
            println!("  Language: {}", page.language);
            println!("  Content blocks: {}", page.content.len());

            if show_content {
                for (j, block) in page.content.iter().enumerate() {
                    let marker = if block.is_known() { "" } else { " (unknown)" };
                    println!("    [{}] {}{}", j, block.block_type(), marker);
                }
            }
        }
        if collection.page_count() > limit {
            println!();
            println!("... and {} more pages", collection.page_count() - limit);
        }
    }

    Ok(())
}

fn cmd_validate(file: &Path, strict: bool, quiet: bool) -> Result<()> {
    let outcome = parse_file(file, strict)?;
    let collection = &outcome.collection;

    // Recovered problems go to stderr even when the file passes overall.
    for diagnostic in &outcome.diagnostics {
        eprintln!("{}", diagnostic);
    }

    if !quiet {
        println!(
            "{} Valid SCP collection: {}",
            "✓".green().bold(),
            file.display()
        );
        println!("  Collection ID: {}", collection.metadata.id);
        println!("  Type: {}", collection.metadata.collection_type);
        println!("  Section: {}", collection.metadata.section);
        println!("  Version: {}", collection.metadata.version);
        println!("  Generated: {}", collection.metadata.generated);
        if let Some(since) = &collection.metadata.since {
            println!("  Since: {}", since);
        }
        if collection.metadata.checksum.is_some() {
            let verified = !outcome
                .diagnostics
                .iter()
                .any(|d| d.message.contains("checksum"));
            if verified {
                println!("  Checksum: {} Verified", "✓".green());
            } else {
                println!("  Checksum: {} Failed (see diagnostics)", "✗".red());
            }
        }
        println!("  Pages: {}", collection.page_count());
        if !outcome.diagnostics.is_empty() {
            println!(
                "  {} {} problem(s) recovered in lenient mode",
                "!".yellow().bold(),
                outcome.diagnostics.len()
            );
        }
    }

    Ok(())
}

/// Format a byte count as a human-readable size
fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}
