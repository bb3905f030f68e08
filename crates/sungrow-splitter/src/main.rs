// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of sungrow-splitter.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Command line entry point for the Sungrow package splitter

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use sungrow_splitter::relabel::relabel_file;
use sungrow_splitter::reorder::reorder_file;
use sungrow_splitter::{Profile, Relabel, Splitter, SplitterConfig, UnitLabel, load_config};
use tracing::info;

#[derive(Parser)]
#[command(name = "sungrow-splitter")]
#[command(about = "Duplicate a Sungrow Modbus Home Assistant package per inverter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one package copy per unit
    Split(SplitArgs),

    /// Move unique_id ahead of name in every list item
    Reorder {
        /// Package to read
        input: PathBuf,
        /// Where to write the reordered copy
        output: PathBuf,
    },

    /// Replace a unit placeholder with a human label
    Relabel {
        input: PathBuf,
        output: PathBuf,
        /// Placeholder in names, e.g. Sgunit1
        #[arg(long)]
        name_from: String,
        /// Label in names, e.g. Garage
        #[arg(long)]
        name_to: String,
        /// Placeholder in ids, e.g. sgunit1
        #[arg(long)]
        id_from: String,
        /// Label in ids, e.g. garage
        #[arg(long)]
        id_to: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Full,
    Simple,
}

#[derive(Args)]
struct SplitArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Package to split (overrides the configuration file)
    source: Option<PathBuf>,

    /// Number of units to generate
    #[arg(short, long)]
    units: Option<u32>,

    /// Output directory (defaults to the source's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Rewriter profile
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Skip the name/id reorder pass
    #[arg(long)]
    no_reorder: bool,

    /// Keep names as they are
    #[arg(long)]
    no_fix_names: bool,

    /// Label a unit: `1=Garage` or `1=Garage:garage`
    #[arg(long = "label", value_parser = parse_label)]
    labels: Vec<UnitLabel>,
}

fn parse_label(value: &str) -> std::result::Result<UnitLabel, String> {
    let (unit, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected UNIT=NAME[:slug], got '{value}'"))?;
    let unit = unit
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid unit '{unit}': {e}"))?;
    let (name, slug) = match rest.split_once(':') {
        Some((name, slug)) => (name.trim().to_owned(), slug.trim().to_owned()),
        None => (
            rest.trim().to_owned(),
            rest.trim().to_lowercase().replace(' ', "_"),
        ),
    };
    Ok(UnitLabel { unit, name, slug })
}

fn main() -> Result<()> {
    // Respects RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Split(args) => run_split(args),
        Command::Reorder { input, output } => {
            let outcome = reorder_file(&input, &output)
                .with_context(|| format!("Failed to reorder {}", input.display()))?;
            info!("Reordered {} of {} lines", outcome.reordered, outcome.lines);
            Ok(())
        }
        Command::Relabel {
            input,
            output,
            name_from,
            name_to,
            id_from,
            id_to,
        } => {
            let pairs = Relabel::new(name_from, name_to, id_from, id_to);
            relabel_file(&input, &output, &pairs)
                .with_context(|| format!("Failed to relabel {}", input.display()))?;
            Ok(())
        }
    }
}

fn run_split(args: SplitArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SplitterConfig::default(),
    };

    if let Some(source) = args.source {
        config.source = source;
    } else if args.config.is_none() {
        bail!("either a source file or --config is required");
    }
    if let Some(units) = args.units {
        config.units = units;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }
    if let Some(preset) = args.preset {
        config.profile = match preset {
            Preset::Full => Profile::full(),
            Preset::Simple => Profile::simple(),
        };
    }
    if args.no_reorder {
        config.reorder = false;
    }
    if args.no_fix_names {
        config.profile.fix_names = false;
    }
    if !args.labels.is_empty() {
        config.labels = args.labels;
    }

    let splitter = Splitter::new(config).context("Invalid configuration")?;
    let report = splitter.run().context("Split failed")?;

    info!(
        "Done: {} units from {}{}",
        report.units.len(),
        report.input.display(),
        if report.reordered { " (reordered)" } else { "" }
    );
    for unit in &report.units {
        info!("  unit {} -> {}", unit.unit, unit.output.display());
        if let Some(labelled) = &unit.labelled_output {
            info!("         -> {}", labelled.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        let label = parse_label("1=Garage").unwrap();
        assert_eq!(label.unit, 1);
        assert_eq!(label.name, "Garage");
        assert_eq!(label.slug, "garage");

        let label = parse_label("2=Back Shed:shed").unwrap();
        assert_eq!(label.name, "Back Shed");
        assert_eq!(label.slug, "shed");

        assert_eq!(parse_label("3=Pool House").unwrap().slug, "pool_house");
        assert!(parse_label("Garage").is_err());
        assert!(parse_label("x=Garage").is_err());
    }

    #[test]
    fn test_cli_parses_split() {
        let cli = Cli::try_parse_from([
            "sungrow-splitter",
            "split",
            "modbus_sungrow.yaml",
            "--units",
            "3",
            "--preset",
            "simple",
            "--label",
            "1=Garage",
        ])
        .unwrap();
        match cli.command {
            Command::Split(args) => {
                assert_eq!(args.units, Some(3));
                assert!(matches!(args.preset, Some(Preset::Simple)));
                assert_eq!(args.labels.len(), 1);
            }
            Command::Reorder { .. } | Command::Relabel { .. } => panic!("expected split"),
        }
    }
}
