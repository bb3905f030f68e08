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

//! Configuration for a split run

use crate::error::{Result, SplitterError};
use crate::rename::{SeedEntry, UnitTag};
use crate::section::SensorNesting;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_units() -> u32 {
    2
}

fn default_output_stem() -> String {
    "modbus_sungrow".to_owned()
}

fn default_source() -> PathBuf {
    PathBuf::from("modbus_sungrow.yaml")
}

/// Knobs that distinguish the two rewriter flavours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Suffix convention for generated ids
    #[serde(default)]
    pub unit_tag: UnitTag,

    /// Rewrite `name:`/`alias:` fields from their unique ids
    #[serde(default = "default_true")]
    pub fix_names: bool,

    /// Preload the built-in seed renames
    #[serde(default = "default_true")]
    pub seed_tables: bool,

    #[serde(default)]
    pub sensor_nesting: SensorNesting,
}

impl Profile {
    pub fn full() -> Self {
        Self {
            unit_tag: UnitTag::SgUnit,
            fix_names: true,
            seed_tables: true,
            sensor_nesting: SensorNesting::BinaryFirst,
        }
    }

    pub fn simple() -> Self {
        Self {
            unit_tag: UnitTag::Sg,
            fix_names: false,
            seed_tables: false,
            sensor_nesting: SensorNesting::Sibling,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::full()
    }
}

/// Human label for one generated unit, e.g. unit 1 is the "Garage" inverter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLabel {
    pub unit: u32,
    /// Display name replacing the `Sgunit1` placeholder
    pub name: String,
    /// Id fragment replacing the `sgunit1` placeholder
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Package to duplicate
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Where outputs go; defaults to the source's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Output files are `{output_stem}_{unit}.yaml`
    #[serde(default = "default_output_stem")]
    pub output_stem: String,

    /// Number of units to generate
    #[serde(default = "default_units")]
    pub units: u32,

    /// Normalize list items to id-then-name before splitting
    #[serde(default = "default_true")]
    pub reorder: bool,

    #[serde(default)]
    pub profile: Profile,

    /// Extra seed renames on top of the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seeds: Vec<SeedEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<UnitLabel>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output_dir: None,
            output_stem: default_output_stem(),
            units: default_units(),
            reorder: true,
            profile: Profile::default(),
            seeds: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.units == 0 {
            return Err(SplitterError::Config(
                "units must be at least 1".to_owned(),
            ));
        }
        if self.output_stem.trim().is_empty() {
            return Err(SplitterError::Config(
                "output_stem must not be empty".to_owned(),
            ));
        }
        for seed in &self.seeds {
            if seed.old.is_empty() || seed.new.is_empty() {
                return Err(SplitterError::Config(format!(
                    "seed for section {} needs both old and new ids",
                    seed.section
                )));
            }
        }
        for label in &self.labels {
            if label.unit == 0 || label.unit > self.units {
                return Err(SplitterError::Config(format!(
                    "label '{}' refers to unit {}, expected 1..={}",
                    label.name, label.unit, self.units
                )));
            }
            if label.name.is_empty() || label.slug.is_empty() {
                return Err(SplitterError::Config(format!(
                    "label for unit {} needs a name and a slug",
                    label.unit
                )));
            }
        }
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    pub fn unit_output(&self, unit: u32) -> PathBuf {
        self.output_dir()
            .join(format!("{}_{unit}.yaml", self.output_stem))
    }

    pub fn labelled_output(&self, label: &UnitLabel) -> PathBuf {
        self.output_dir()
            .join(format!("{}_{}.yaml", self.output_stem, label.slug))
    }

    pub fn reordered_output(&self) -> PathBuf {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output_stem.clone());
        self.output_dir().join(format!("{stem}_reordered.yaml"))
    }

    pub fn label_for(&self, unit: u32) -> Option<&UnitLabel> {
        self.labels.iter().find(|label| label.unit == unit)
    }
}

pub fn load_config(path: &Path) -> Result<SplitterConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| SplitterError::file(path, e))?;
    let config: SplitterConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
