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

//! Identifier rename rules and the per-unit rename table

use crate::section::Section;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vendor prefix carried by Sungrow register ids (`sg_battery_level`)
pub const SUNGROW_ID_PREFIX: &str = "sg_";
/// Prefix of input helper ids that write back to the inverter
pub const SUNGROW_SET_ID_PREFIX: &str = "set_sg_";
/// Prefix of automation ids shipped with the package
pub const AUTOMATION_ID_PREFIX: &str = "automation_sungrow_";

pub const MODBUS_HUB_NAME: &str = "SungrowSHx";
pub const MODBUS_HOST_IP: &str = "sungrow_modbus_host_ip";
pub const MODBUS_PORT: &str = "sungrow_modbus_port";
pub const MODBUS_SLAVE: &str = "sungrow_modbus_slave";

/// Literals suffixed wherever they appear, checked in this order.
pub const DIRECT_CONVERTS: [&str; 4] = [MODBUS_HUB_NAME, MODBUS_HOST_IP, MODBUS_PORT, MODBUS_SLAVE];

/// Fragment that tags generated ids with their unit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitTag {
    /// `battery_level_sgunit2`
    #[default]
    #[serde(rename = "sgunit")]
    SgUnit,
    /// `battery_level_sg_2`
    #[serde(rename = "sg_")]
    Sg,
}

impl UnitTag {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitTag::SgUnit => "sgunit",
            UnitTag::Sg => "sg_",
        }
    }

    /// Tag plus index, e.g. `sgunit2`.
    pub fn for_unit(self, unit: u32) -> String {
        format!("{}{unit}", self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct SectionRenames {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

/// Old id to new id, per section. Entries keep insertion order and the first write
/// for an id wins.
#[derive(Debug, Clone, Default)]
pub struct RenameTable {
    sections: HashMap<Section, SectionRenames>,
}

impl RenameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section: Section, old: &str) -> Option<&str> {
        let renames = self.sections.get(&section)?;
        let position = *renames.positions.get(old)?;
        renames.entries.get(position).map(|(_, new)| new.as_str())
    }

    /// Record a rename. Returns `false` when `old` was already mapped in `section`.
    pub fn insert(&mut self, section: Section, old: &str, new: &str) -> bool {
        if old.is_empty() {
            return false;
        }
        let renames = self.sections.entry(section).or_default();
        if renames.positions.contains_key(old) {
            return false;
        }
        renames
            .positions
            .insert(old.to_owned(), renames.entries.len());
        renames.entries.push((old.to_owned(), new.to_owned()));
        true
    }

    /// Entries of one section in insertion order.
    pub fn entries(&self, section: Section) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.sections
            .get(&section)
            .into_iter()
            .flat_map(|renames| renames.entries.iter())
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(|r| r.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Preloaded rename for ids that do not follow the `sg_` convention.
///
/// `new` is a template: `{tag}` and `{index}` are expanded per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub section: Section,
    pub old: String,
    pub new: String,
}

impl SeedEntry {
    pub fn new(section: Section, old: &str, new: &str) -> Self {
        Self {
            section,
            old: old.to_owned(),
            new: new.to_owned(),
        }
    }

    pub fn expand(&self, unit: u32, tag: UnitTag) -> String {
        self.new
            .replace("{tag}", tag.as_str())
            .replace("{index}", &unit.to_string())
    }
}

/// Renames shipped with the package for ids whose entity names drifted from their
/// unique ids.
pub fn builtin_seeds() -> Vec<SeedEntry> {
    vec![
        SeedEntry::new(
            Section::Modbus,
            "sungrow_device_type_code",
            "dev_code_{tag}{index}",
        ),
        SeedEntry::new(
            Section::Modbus,
            "export_power_raw",
            "battery_export_power_raw_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "ems_mode_selection",
            "ems_mode_selection_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "battery_forced_charge_discharge_cmd",
            "battery_forced_charge_discharge_cmd_raw_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "sg_battery_level_nom",
            "battery_level_nominal_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "battery_level_nominal",
            "battery_level_nominal_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "sg_battery_charge_nom",
            "battery_charge_nominal_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "uid_daily_consumed_energy",
            "daily_consumed_energy_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "uid_total_consumed_energy",
            "total_consumed_energy_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "export_power_limit_mode",
            "export_power_limit_mode_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateSensor,
            "sungrow_inverter_state",
            "inverter_state_{tag}{index}",
        ),
        SeedEntry::new(
            Section::TemplateBinarySensor,
            "sg_inverter_state",
            "inverter_state_{tag}{index}",
        ),
    ]
}

/// Fresh table for one unit, preloaded with `seeds`.
pub fn seeded_table<'a>(
    seeds: impl IntoIterator<Item = &'a SeedEntry>,
    unit: u32,
    tag: UnitTag,
) -> RenameTable {
    let mut table = RenameTable::new();
    for seed in seeds {
        table.insert(seed.section, &seed.old, &seed.expand(unit, tag));
    }
    table
}

/// New id for a declared `unique_id`.
///
/// Known ids come back unchanged. `sg_` ids lose the vendor prefix and gain the
/// unit tag, and the stripped form is recorded so later entity references such as
/// `sensor.battery_level` follow along. Anything else gets `_{unit}` appended.
pub fn derive_id(
    table: &mut RenameTable,
    old: &str,
    unit: u32,
    tag: UnitTag,
    section: Section,
) -> String {
    if let Some(existing) = table.get(section, old) {
        return existing.to_owned();
    }

    if let Some(stripped) = old.strip_prefix(SUNGROW_ID_PREFIX) {
        let stripped = stripped.trim();
        let new = format!("{stripped}_{}", tag.for_unit(unit));
        table.insert(section, stripped, &new);
        return new;
    }

    format!("{old}_{unit}")
}

pub fn derive_automation_id(id: &str, unit: u32, tag: UnitTag) -> String {
    match id.strip_prefix(AUTOMATION_ID_PREFIX) {
        Some(rest) => format!("automation_{}_{}", rest.trim(), tag.for_unit(unit)),
        None => format!("{id}_{unit}"),
    }
}

/// `set_sg_battery_mode` becomes `set_battery_mode_sgunit1`.
pub fn derive_set_id(id: &str, unit: u32, tag: UnitTag) -> String {
    let rest = id.strip_prefix(SUNGROW_SET_ID_PREFIX).unwrap_or(id);
    format!("set_{rest}_{}", tag.for_unit(unit))
}

/// First direct-convert literal contained in `line`.
pub fn find_direct_convert(line: &str) -> Option<&'static str> {
    DIRECT_CONVERTS
        .into_iter()
        .find(|literal| line.contains(literal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_id_strips_vendor_prefix() {
        let mut table = RenameTable::new();
        assert_eq!(
            derive_id(&mut table, "sg_battery_level", 2, UnitTag::SgUnit, Section::Modbus),
            "battery_level_sgunit2"
        );

        let mut table = RenameTable::new();
        assert_eq!(
            derive_id(&mut table, "sg_battery_level", 2, UnitTag::Sg, Section::Modbus),
            "battery_level_sg_2"
        );
    }

    #[test]
    fn test_derive_id_records_stripped_form() {
        let mut table = RenameTable::new();
        derive_id(&mut table, "sg_power", 1, UnitTag::SgUnit, Section::Modbus);
        assert_eq!(table.get(Section::Modbus, "power"), Some("power_sgunit1"));
        assert_eq!(table.get(Section::TemplateSensor, "power"), None);
    }

    #[test]
    fn test_derive_id_is_idempotent() {
        let mut table = RenameTable::new();
        let first = derive_id(&mut table, "sg_power", 1, UnitTag::SgUnit, Section::Modbus);
        let second = derive_id(&mut table, "sg_power", 1, UnitTag::SgUnit, Section::Modbus);
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);

        table.insert(Section::Modbus, "sg_power", &first);
        let third = derive_id(&mut table, "sg_power", 1, UnitTag::SgUnit, Section::Modbus);
        assert_eq!(third, first);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_derive_id_default_branch_records_nothing() {
        let mut table = RenameTable::new();
        assert_eq!(
            derive_id(&mut table, "meter_power", 3, UnitTag::SgUnit, Section::Modbus),
            "meter_power_3"
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_seeded_ids_win() {
        let table_seeds = builtin_seeds();
        let mut table = seeded_table(&table_seeds, 1, UnitTag::SgUnit);
        assert_eq!(
            derive_id(
                &mut table,
                "sg_battery_level_nom",
                1,
                UnitTag::SgUnit,
                Section::TemplateSensor
            ),
            "battery_level_nominal_sgunit1"
        );
        assert_eq!(
            derive_id(
                &mut table,
                "sungrow_device_type_code",
                1,
                UnitTag::SgUnit,
                Section::Modbus
            ),
            "dev_code_sgunit1"
        );
    }

    #[test]
    fn test_first_write_wins() {
        let mut table = RenameTable::new();
        assert!(table.insert(Section::Modbus, "a", "b"));
        assert!(!table.insert(Section::Modbus, "a", "c"));
        assert!(!table.insert(Section::Modbus, "", "c"));
        assert_eq!(table.get(Section::Modbus, "a"), Some("b"));
        assert!(table.insert(Section::TemplateSensor, "a", "c"));
        let entries: Vec<_> = table.entries(Section::Modbus).collect();
        assert_eq!(entries, vec![("a", "b")]);
    }

    #[test]
    fn test_automation_ids() {
        assert_eq!(
            derive_automation_id("automation_sungrow_inverter_state_change", 1, UnitTag::SgUnit),
            "automation_inverter_state_change_sgunit1"
        );
        assert_eq!(
            derive_automation_id("custom_automation", 2, UnitTag::SgUnit),
            "custom_automation_2"
        );
    }

    #[test]
    fn test_set_ids() {
        assert_eq!(
            derive_set_id("set_sg_ems_mode", 1, UnitTag::SgUnit),
            "set_ems_mode_sgunit1"
        );
        assert_eq!(
            derive_set_id("set_sg_ems_mode", 2, UnitTag::Sg),
            "set_ems_mode_sg_2"
        );
    }

    #[test]
    fn test_direct_convert_order() {
        assert_eq!(
            find_direct_convert("    host: !secret sungrow_modbus_host_ip"),
            Some(MODBUS_HOST_IP)
        );
        assert_eq!(
            find_direct_convert("hub: SungrowSHx slave: sungrow_modbus_slave"),
            Some(MODBUS_HUB_NAME)
        );
        assert_eq!(find_direct_convert("    unique_id: sg_power"), None);
    }
}
