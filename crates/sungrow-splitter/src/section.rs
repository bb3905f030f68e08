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

//! YAML section tracking
//!
//! The splitter never builds a parse tree. It only needs to know which top-level
//! block of the Home Assistant package a line belongs to, and that is decided by
//! matching well-known headers at fixed columns.

use crate::error::{Result, SplitterError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Structural region of the package a line belongs to.
///
/// Declaration order matters: classification and back-reference lookups both walk
/// sections in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    None,
    Modbus,
    Template,
    TemplateBinarySensor,
    TemplateSensor,
    InputNumber,
    InputSelect,
    Automation,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::None,
        Section::Modbus,
        Section::Template,
        Section::TemplateBinarySensor,
        Section::TemplateSensor,
        Section::InputNumber,
        Section::InputSelect,
        Section::Automation,
    ];

    /// Line prefix that opens this section, anchored at column 0.
    pub fn header(self) -> Option<&'static str> {
        match self {
            Section::None => None,
            Section::Modbus => Some("modbus:"),
            Section::Template => Some("template:"),
            Section::TemplateBinarySensor => Some("  - binary_sensor:"),
            Section::TemplateSensor => Some("  - sensor:"),
            Section::InputNumber => Some("input_number:"),
            Section::InputSelect => Some("input_select:"),
            Section::Automation => Some("automation"),
        }
    }

    /// Entity domain prefix used when other blocks reference ids declared here.
    pub fn entity_domain(self) -> Result<&'static str> {
        match self {
            Section::Modbus | Section::TemplateSensor => Ok("sensor."),
            Section::TemplateBinarySensor => Ok("binary_sensor."),
            Section::InputNumber => Ok("input_number."),
            Section::InputSelect => Ok("input_select."),
            Section::Automation => Ok(""),
            Section::None | Section::Template => Err(SplitterError::UnsupportedSection(self)),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::None => "none",
            Section::Modbus => "modbus",
            Section::Template => "template",
            Section::TemplateBinarySensor => "template_binary_sensor",
            Section::TemplateSensor => "template_sensor",
            Section::InputNumber => "input_number",
            Section::InputSelect => "input_select",
            Section::Automation => "automation",
        };
        f.write_str(name)
    }
}

/// How the two template sub-blocks nest inside `template:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorNesting {
    /// Both sub-blocks are only recognised directly inside `template:`.
    Sibling,
    /// `- sensor:` is only recognised after `- binary_sensor:` has been entered.
    #[default]
    BinaryFirst,
}

/// Explicit set of sections searched together during a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionSet(BTreeSet<Section>);

impl SectionSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Ids that template blocks may reference.
    pub fn sensors() -> Self {
        [
            Section::Modbus,
            Section::TemplateBinarySensor,
            Section::TemplateSensor,
        ]
        .into_iter()
        .collect()
    }

    /// Ids that input helpers may reference.
    pub fn helpers() -> Self {
        let mut set = Self::sensors();
        set.insert(Section::InputNumber);
        set
    }

    /// Every section that carries a rename table.
    pub fn automations() -> Self {
        let mut set = Self::helpers();
        set.insert(Section::InputSelect);
        set.insert(Section::Automation);
        set
    }

    pub fn insert(&mut self, section: Section) -> bool {
        self.0.insert(section)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.0.contains(&section)
    }

    /// Members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Section> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Section> for SectionSet {
    fn from_iter<I: IntoIterator<Item = Section>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decide whether `line` opens a new section.
///
/// `None` means the line does not change the current section, not that every
/// section has been left.
pub fn classify(current: Section, line: &str, nesting: SensorNesting) -> Option<Section> {
    Section::ALL
        .into_iter()
        .filter(|section| *section != Section::None)
        .find(|section| {
            let Some(header) = section.header() else {
                return false;
            };
            let allowed = match section {
                Section::TemplateBinarySensor => current == Section::Template,
                Section::TemplateSensor => match nesting {
                    SensorNesting::Sibling => current == Section::Template,
                    SensorNesting::BinaryFirst => current == Section::TemplateBinarySensor,
                },
                Section::None
                | Section::Modbus
                | Section::Template
                | Section::InputNumber
                | Section::InputSelect
                | Section::Automation => true,
            };
            allowed && line.starts_with(header)
        })
}
