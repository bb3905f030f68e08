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

//! Split driver: reorder once, then one rewrite pass per unit

use crate::config::SplitterConfig;
use crate::error::Result;
use crate::line_source::LineSource;
use crate::names::fix_names;
use crate::output::write_atomic;
use crate::relabel::{Relabel, relabel_file};
use crate::reorder::reorder_file;
use crate::rewriter::{RewriteContext, RewriteStats, rewrite_document};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: u32,
    pub output: PathBuf,
    pub stats: RewriteStats,
    pub names_fixed: usize,
    pub labelled_output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport {
    /// File the unit passes read from
    pub input: PathBuf,
    pub reordered: bool,
    pub units: Vec<UnitReport>,
}

#[derive(Debug, Clone)]
pub struct Splitter {
    config: SplitterConfig,
}

impl Splitter {
    pub fn new(config: SplitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn run(&self) -> Result<SplitReport> {
        info!(
            "Splitting {} into {} units",
            self.config.source.display(),
            self.config.units
        );

        let (input, reordered) = self.prepare_input();

        let units = (1..=self.config.units)
            .map(|unit| self.split_unit(&input, unit))
            .collect::<Result<Vec<_>>>()?;

        Ok(SplitReport {
            input,
            reordered,
            units,
        })
    }

    /// Reorder the source if configured. A failed reorder is not fatal: the unit
    /// passes then read the source as it is.
    fn prepare_input(&self) -> (PathBuf, bool) {
        if !self.config.reorder {
            return (self.config.source.clone(), false);
        }

        let reordered = self.config.reordered_output();
        match reorder_file(&self.config.source, &reordered) {
            Ok(_) => (reordered, true),
            Err(e) => {
                warn!("Reorder pass failed, splitting the source as is: {e}");
                (self.config.source.clone(), false)
            }
        }
    }

    /// Produce `{output_stem}_{unit}.yaml` from `input`, plus the labelled copy when
    /// a label exists for the unit.
    pub fn split_unit(&self, input: &Path, unit: u32) -> Result<UnitReport> {
        let profile = self.config.profile.clone();
        let fix = profile.fix_names;
        let mut ctx = RewriteContext::new(unit, profile, &self.config.seeds);

        let mut source = LineSource::open(input)?;
        let mut rewritten = Vec::new();
        let stats = rewrite_document(&mut source, &mut rewritten, &mut ctx)?;

        let (contents, names_fixed) = if fix {
            let mut named = Vec::new();
            let fixed = fix_names(&mut LineSource::new(rewritten.as_slice()), &mut named)?;
            (named, fixed)
        } else {
            (rewritten, 0)
        };

        let output = self.config.unit_output(unit);
        write_atomic(&output, &contents)?;
        info!(
            "Unit {unit}: {} lines, {} changed, {} renames, {} names -> {}",
            stats.lines,
            stats.changed,
            stats.renames,
            names_fixed,
            output.display()
        );

        let labelled_output = match self.config.label_for(unit) {
            Some(label) => {
                let labelled = self.config.labelled_output(label);
                let pairs = Relabel::for_label(label, self.config.profile.unit_tag);
                relabel_file(&output, &labelled, &pairs)?;
                Some(labelled)
            }
            None => None,
        };

        Ok(UnitReport {
            unit,
            output,
            stats,
            names_fixed,
            labelled_output,
        })
    }
}
