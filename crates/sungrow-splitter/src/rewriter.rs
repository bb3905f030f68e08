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

//! Per-unit line rewriter
//!
//! One pass over the package per unit index. Every declaration the pass renames is
//! recorded in the context's rename table, and later lines that mention the old id
//! are rewritten from that table. Propagation is forward only: lines already
//! written are never revisited.

use crate::config::Profile;
use crate::error::{Result, SplitterError};
use crate::line_source::LineSource;
use crate::rename::{
    self, AUTOMATION_ID_PREFIX, RenameTable, SUNGROW_SET_ID_PREFIX, SeedEntry,
};
use crate::section::{self, Section, SectionSet};
use std::io::{BufRead, Write};
use tracing::debug;

pub const UNIQUE_ID_KEY: &str = "unique_id:";
pub const AUTOMATION_ID_KEY: &str = "id:";

/// State threaded through every rewritten line of one unit pass.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    pub unit: u32,
    pub section: Section,
    pub table: RenameTable,
    pub profile: Profile,
}

impl RewriteContext {
    /// Fresh context for `unit`. Built-in seeds are loaded when the profile asks for
    /// them, `extra_seeds` always are.
    pub fn new(unit: u32, profile: Profile, extra_seeds: &[SeedEntry]) -> Self {
        let builtin = if profile.seed_tables {
            rename::builtin_seeds()
        } else {
            Vec::new()
        };
        let table = rename::seeded_table(
            builtin.iter().chain(extra_seeds),
            unit,
            profile.unit_tag,
        );
        Self {
            unit,
            section: Section::None,
            table,
            profile,
        }
    }

    /// Switch section if `line` is a recognised header.
    pub fn enter(&mut self, line: &str) {
        if let Some(section) = section::classify(self.section, line, self.profile.sensor_nesting) {
            if section != self.section {
                debug!("Unit {}: entering section {section}", self.unit);
            }
            self.section = section;
        }
    }

    fn record_and_replace(&mut self, line: &str, old: &str, new: &str) -> String {
        self.table.insert(self.section, old, new);
        line.replace(old, new)
    }
}

/// Counters for one rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub lines: usize,
    pub changed: usize,
    pub renames: usize,
}

/// Rewrite one line against the context's current section.
pub fn rewrite_line(line: &str, ctx: &mut RewriteContext) -> Result<String> {
    if ctx.section == Section::None {
        return Ok(line.to_owned());
    }

    let mut line = line.to_owned();

    if let Some(literal) = rename::find_direct_convert(&line) {
        let new = format!("{literal}_{}", ctx.unit);
        line = ctx.record_and_replace(&line, literal, &new);
    }

    if let Some(id) = declared_unique_id(&line) {
        let new_id = rename::derive_id(
            &mut ctx.table,
            &id,
            ctx.unit,
            ctx.profile.unit_tag,
            ctx.section,
        );
        ctx.table.insert(ctx.section, &id, &new_id);
        line = replace_value(&line, UNIQUE_ID_KEY, &id, &new_id);
    }

    match ctx.section {
        Section::Modbus => {}
        Section::Template | Section::TemplateBinarySensor | Section::TemplateSensor => {
            line = substitute_back_references(&line, &ctx.table, &SectionSet::sensors())?;
        }
        Section::InputNumber | Section::InputSelect => {
            if line.starts_with(&format!("  {SUNGROW_SET_ID_PREFIX}")) {
                let id = line.trim().trim_end_matches(':').to_owned();
                let new_id = rename::derive_set_id(&id, ctx.unit, ctx.profile.unit_tag);
                line = ctx.record_and_replace(&line, &id, &new_id);
            } else {
                line = substitute_back_references(&line, &ctx.table, &SectionSet::helpers())?;
            }
        }
        Section::Automation => {
            if let Some(id) = declared_automation_id(&line) {
                let new_id = rename::derive_automation_id(&id, ctx.unit, ctx.profile.unit_tag);
                ctx.table.insert(ctx.section, &id, &new_id);
                line = replace_value(&line, AUTOMATION_ID_KEY, &id, &new_id);
            } else {
                line = substitute_back_references(
                    &line,
                    &ctx.table,
                    &SectionSet::automations(),
                )?;
            }
        }
        Section::None => {
            return Err(SplitterError::UnsupportedSection(ctx.section));
        }
    }

    Ok(line)
}

/// Stream `source` into `out`, rewriting every line for the context's unit.
pub fn rewrite_document<R: BufRead, W: Write>(
    source: &mut LineSource<R>,
    out: &mut W,
    ctx: &mut RewriteContext,
) -> Result<RewriteStats> {
    let seeded = ctx.table.len();
    let mut stats = RewriteStats::default();

    while let Some(line) = source.next_line()? {
        ctx.enter(&line);
        let rewritten = rewrite_line(&line, ctx)?;
        if rewritten != line {
            stats.changed += 1;
        }
        stats.lines += 1;
        write!(out, "{rewritten}{}", source.line_ending())?;
    }

    stats.renames = ctx.table.len().saturating_sub(seeded);
    Ok(stats)
}

/// Apply every recorded rename of `sections` to a line that only mentions ids.
///
/// Three forms are rewritten per entry, each on the result of the previous one:
/// a space delimited word, a quoted entity id (`'sensor.old'`), and a bare entity id
/// that ends the line. The last form is skipped for automations, which have no
/// entity domain.
pub fn substitute_back_references(
    line: &str,
    table: &RenameTable,
    sections: &SectionSet,
) -> Result<String> {
    let mut line = line.to_owned();

    for section in sections.iter() {
        let prefix = section.entity_domain()?;
        for (old, new) in table.entries(section) {
            line = line.replace(&format!(" {old} "), &format!(" {new} "));
            line = line.replace(&format!("'{prefix}{old}'"), &format!("'{prefix}{new}'"));

            if section != Section::Automation {
                let bare = format!("{prefix}{old}");
                let ends_line = line
                    .rsplit_once(bare.as_str())
                    .is_some_and(|(_, tail)| tail.trim().is_empty());
                if ends_line {
                    line = line.replace(&bare, &format!("{prefix}{new}"));
                }
            }
        }
    }

    Ok(line)
}

/// Id declared by a `unique_id:` line, with or without a list dash.
pub fn declared_unique_id(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed
        .strip_prefix(UNIQUE_ID_KEY)
        .or_else(|| trimmed.strip_prefix("- ").and_then(|r| r.strip_prefix(UNIQUE_ID_KEY)))?;
    let id = rest.trim();
    (!id.is_empty()).then(|| id.to_owned())
}

/// Id of a `- id:` automation entry shipped with the package.
pub fn declared_automation_id(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let value = trimmed.strip_prefix("- ")?.strip_prefix(AUTOMATION_ID_KEY)?.trim();
    let unquoted = value.trim_matches('"');
    unquoted
        .starts_with(AUTOMATION_ID_PREFIX)
        .then(|| unquoted.to_owned())
}

/// Replace `old` with `new` in the value that follows `key`, leaving the key and
/// indentation alone.
fn replace_value(line: &str, key: &str, old: &str, new: &str) -> String {
    match line.split_once(key) {
        Some((head, value)) => format!("{head}{key}{}", value.replacen(old, new, 1)),
        None => line.replace(old, new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::UnitTag;

    fn context(unit: u32) -> RewriteContext {
        RewriteContext::new(unit, Profile::full(), &[])
    }

    fn run(ctx: &mut RewriteContext, text: &str) -> String {
        let mut source = LineSource::new(text.as_bytes());
        let mut out = Vec::new();
        rewrite_document(&mut source, &mut out, ctx).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_modbus_snippet() {
        let mut ctx = context(1);
        let output = run(
            &mut ctx,
            "modbus:\n  - name: SungrowSHx\n    unique_id: sg_power\n",
        );
        assert_eq!(
            output,
            "modbus:\n  - name: SungrowSHx_1\n    unique_id: power_sgunit1\n"
        );
    }

    #[test]
    fn test_lines_outside_sections_are_untouched() {
        let mut ctx = context(1);
        let output = run(&mut ctx, "# SungrowSHx package\nunique_id: sg_power\n");
        assert_eq!(output, "# SungrowSHx package\nunique_id: sg_power\n");
        assert_eq!(ctx.table.get(Section::Modbus, "power"), None);
        assert_eq!(ctx.table.get(Section::None, "SungrowSHx"), None);
    }

    #[test]
    fn test_template_back_references() {
        let mut ctx = context(1);
        let output = run(
            &mut ctx,
            "modbus:\n\
             \x20 - unique_id: sg_power\n\
             template:\n\
             \x20 - binary_sensor:\n\
             \x20     - unique_id: sg_power_check\n\
             \x20       state: \"{{ states('sensor.sg_power') | int > 0 }}\"\n\
             \x20       other: \"{{ states('sensor.sg_power_raw') }}\"\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "  - unique_id: power_sgunit1");
        assert_eq!(lines[4], "      - unique_id: power_check_sgunit1");
        assert_eq!(
            lines[5],
            "        state: \"{{ states('sensor.power_sgunit1') | int > 0 }}\""
        );
        assert_eq!(lines[6], "        other: \"{{ states('sensor.sg_power_raw') }}\"");
    }

    #[test]
    fn test_bare_reference_only_at_line_end() {
        let mut table = RenameTable::new();
        table.insert(Section::Modbus, "battery_level", "battery_level_sgunit1");
        let sections = SectionSet::sensors();

        assert_eq!(
            substitute_back_references("      - sensor.battery_level", &table, &sections).unwrap(),
            "      - sensor.battery_level_sgunit1"
        );
        assert_eq!(
            substitute_back_references("      - sensor.battery_level_raw", &table, &sections)
                .unwrap(),
            "      - sensor.battery_level_raw"
        );
        assert_eq!(
            substitute_back_references("x: sensor.battery_level, y", &table, &sections).unwrap(),
            "x: sensor.battery_level, y"
        );
    }

    #[test]
    fn test_space_delimited_reference() {
        let mut table = RenameTable::new();
        table.insert(Section::TemplateSensor, "ems_mode", "ems_mode_sgunit2");
        let output = substitute_back_references(
            "  {% set mode = ems_mode %}",
            &table,
            &SectionSet::sensors(),
        )
        .unwrap();
        assert_eq!(output, "  {% set mode = ems_mode_sgunit2 %}");
    }

    #[test]
    fn test_unsupported_section_in_lookup() {
        let table = RenameTable::new();
        let sections: SectionSet = [Section::Template].into_iter().collect();
        assert!(substitute_back_references("x", &table, &sections).is_err());
    }

    #[test]
    fn test_input_helpers() {
        let mut ctx = context(2);
        let output = run(
            &mut ctx,
            "modbus:\n\
             \x20 - unique_id: sg_battery_max_soc\n\
             input_number:\n\
             \x20 set_sg_battery_max_soc:\n\
             \x20   initial: \"{{ states('sensor.battery_max_soc') }}\"\n\
             automation:\n\
             \x20 - id: \"automation_sungrow_battery_max_soc_update\"\n\
             \x20   alias: \"sungrow update battery max soc\"\n\
             \x20       entity_id: input_number.set_sg_battery_max_soc\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[3], "  set_battery_max_soc_sgunit2:");
        assert_eq!(
            lines[4],
            "    initial: \"{{ states('sensor.battery_max_soc_sgunit2') }}\""
        );
        assert_eq!(
            lines[6],
            "  - id: \"automation_battery_max_soc_update_sgunit2\""
        );
        assert_eq!(
            lines[8],
            "        entity_id: input_number.set_battery_max_soc_sgunit2"
        );
    }

    #[test]
    fn test_input_select_helpers() {
        let mut ctx = context(1);
        let output = run(
            &mut ctx,
            "input_select:\n\
             \x20 set_sg_ems_mode:\n\
             \x20   name: EMS mode\n\
             automation:\n\
             \x20 - id: \"automation_sungrow_ems_mode_update\"\n\
             \x20   condition: \"{{ is_state('input_select.set_sg_ems_mode', 'Self') }}\"\n\
             \x20   triggers:\n\
             \x20     - entity_id: input_select.set_sg_ems_mode\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "  set_ems_mode_sgunit1:");
        assert_eq!(
            lines[5],
            "    condition: \"{{ is_state('input_select.set_ems_mode_sgunit1', 'Self') }}\""
        );
        assert_eq!(lines[7], "      - entity_id: input_select.set_ems_mode_sgunit1");
        assert_eq!(
            ctx.table.get(Section::InputSelect, "set_sg_ems_mode"),
            Some("set_ems_mode_sgunit1")
        );
    }

    #[test]
    fn test_configured_seeds() {
        let seeds = [SeedEntry::new(
            Section::TemplateSensor,
            "grid_state",
            "grid_state_{tag}{index}",
        )];
        let text = "template:\n\
                    \x20 - binary_sensor:\n\
                    \x20     - unique_id: sg_grid_ok\n\
                    \x20 - sensor:\n\
                    \x20     - unique_id: grid_state\n\
                    \x20       state: \"{{ states('sensor.grid_state') }}\"\n";

        let mut ctx = RewriteContext::new(2, Profile::full(), &seeds);
        let lines: Vec<String> = run(&mut ctx, text).lines().map(str::to_owned).collect();
        assert_eq!(lines[4], "      - unique_id: grid_state_sgunit2");
        assert_eq!(lines[5], "        state: \"{{ states('sensor.grid_state_sgunit2') }}\"");

        let mut ctx = context(2);
        let output = run(&mut ctx, text);
        assert!(output.contains("      - unique_id: grid_state_2\n"));

        let mut ctx = RewriteContext::new(2, Profile::simple(), &seeds);
        let output = run(
            &mut ctx,
            "template:\n  - sensor:\n      - unique_id: grid_state\n",
        );
        assert_eq!(output, "template:\n  - sensor:\n      - unique_id: grid_state_sg_2\n");
    }

    #[test]
    fn test_crlf_line_endings_are_kept() {
        let mut ctx = context(1);
        let output = run(
            &mut ctx,
            "modbus:\r\n  - name: SungrowSHx\r\n    unique_id: sg_power\r\n",
        );
        assert_eq!(
            output,
            "modbus:\r\n  - name: SungrowSHx_1\r\n    unique_id: power_sgunit1\r\n"
        );
    }

    #[test]
    fn test_direct_converts_are_recorded() {
        let mut ctx = context(1);
        let output = run(
            &mut ctx,
            "modbus:\n  - name: SungrowSHx\n    host: !secret sungrow_modbus_host_ip\n",
        );
        assert!(output.contains("host: !secret sungrow_modbus_host_ip_1"));
        assert_eq!(
            ctx.table.get(Section::Modbus, "sungrow_modbus_host_ip"),
            Some("sungrow_modbus_host_ip_1")
        );
    }

    #[test]
    fn test_simple_profile_suffix() {
        let mut ctx = RewriteContext::new(2, Profile::simple(), &[]);
        assert_eq!(ctx.profile.unit_tag, UnitTag::Sg);
        let output = run(&mut ctx, "modbus:\n  - unique_id: sg_battery_level\n");
        assert_eq!(output, "modbus:\n  - unique_id: battery_level_sg_2\n");
    }

    #[test]
    fn test_non_vendor_ids_follow_their_full_id() {
        let mut ctx = context(1);
        let output = run(
            &mut ctx,
            "modbus:\n\
             \x20 - unique_id: meter_power\n\
             template:\n\
             \x20 - binary_sensor:\n\
             \x20     state: \"{{ states('sensor.meter_power') }}\"\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "  - unique_id: meter_power_1");
        assert_eq!(lines[4], "      state: \"{{ states('sensor.meter_power_1') }}\"");
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let text = "modbus:\n  - name: SungrowSHx\n    unique_id: sg_power\n\
                    template:\n  - binary_sensor:\n      state: sensor.sg_power\n";
        let first = run(&mut context(1), text);
        let second = run(&mut context(1), text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_declared_ids() {
        assert_eq!(
            declared_unique_id("    - unique_id: sg_power").as_deref(),
            Some("sg_power")
        );
        assert_eq!(
            declared_unique_id("      unique_id: sg_power ").as_deref(),
            Some("sg_power")
        );
        assert_eq!(declared_unique_id("      unique_id:"), None);
        assert_eq!(declared_unique_id("      name: unique_id: x"), None);

        assert_eq!(
            declared_automation_id("  - id: automation_sungrow_export_limit").as_deref(),
            Some("automation_sungrow_export_limit")
        );
        assert_eq!(declared_automation_id("  - id: \"my_automation\""), None);
    }
}
