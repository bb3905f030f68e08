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

//! Sungrow Modbus package splitter
//!
//! Duplicates the Sungrow SHx Home Assistant Modbus package into one copy per
//! inverter. Every copy gets its own entity ids, names and cross references so
//! several inverters can be loaded side by side. The YAML is processed as text,
//! line by line, so comments and formatting survive untouched.

pub mod config;
pub mod error;
pub mod line_source;
pub mod names;
pub mod output;
pub mod relabel;
pub mod rename;
pub mod reorder;
pub mod rewriter;
pub mod section;
pub mod splitter;

pub use config::{Profile, SplitterConfig, UnitLabel, load_config};
pub use error::SplitterError;
pub use relabel::Relabel;
pub use rename::{RenameTable, SeedEntry, UnitTag};
pub use reorder::ReorderOutcome;
pub use rewriter::{RewriteContext, RewriteStats};
pub use section::{Section, SectionSet, SensorNesting};
pub use splitter::{SplitReport, Splitter, UnitReport};
