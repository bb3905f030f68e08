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

//! Display names derived from unique ids
//!
//! After renaming, the `name:` of an entity no longer matches its id. This pass
//! rebuilds every `name:`/`alias:` from the id governing the same list item, so the
//! entity ids Home Assistant derives from names stay unique per unit.

use crate::error::Result;
use crate::line_source::{LineSource, MAX_LOOKAHEAD};
use crate::rewriter::{AUTOMATION_ID_KEY, UNIQUE_ID_KEY};
use std::io::{BufRead, Write};

const NAME_KEY: &str = "name:";
const ALIAS_KEY: &str = "alias:";

/// Lower-cased inside a title unless they open it.
const MINOR_WORDS: [&str; 17] = [
    "a", "an", "and", "as", "at", "but", "by", "for", "in", "nor", "of", "on", "or", "the",
    "to", "via", "vs",
];

/// Rewrite `name:`/`alias:` lines from their governing ids. Returns the number of
/// lines changed.
///
/// A `- unique_id:` or `- id:` item governs the sibling keys at its own column until
/// another list item starts or a shallower line closes it.
pub fn fix_names<R: BufRead, W: Write>(source: &mut LineSource<R>, out: &mut W) -> Result<usize> {
    let mut current: Option<(String, usize)> = None;
    let mut fixed = 0;

    while let Some(line) = source.next_line()? {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            let indent = line.len() - line.trim_start().len();
            if current.as_ref().is_some_and(|(_, column)| indent < *column) {
                current = None;
            }
        }

        if let Some(id) = list_item_value(trimmed, UNIQUE_ID_KEY) {
            current = line.find(UNIQUE_ID_KEY).map(|column| (id, column));
        } else if let Some(id) = list_item_value(trimmed, AUTOMATION_ID_KEY) {
            current = line.find(AUTOMATION_ID_KEY).map(|column| (id, column));
        } else if trimmed.starts_with("- ") {
            current = None;
        }

        let mut output = line.clone();
        if let Some(key) = name_key(trimmed) {
            let key_column = line.find(key);
            let governing = match &current {
                Some((id, column)) if Some(*column) == key_column => Some(id.clone()),
                _ => scan_forward(source, &line, key)?,
            };
            if let Some(id) = governing {
                output = rename_line(&line, key, &id);
            }
        }

        if output != line {
            fixed += 1;
        }
        write!(out, "{output}{}", source.line_ending())?;
    }

    Ok(fixed)
}

/// Human readable name for an id: `battery_level_nominal_sgunit1` becomes
/// `Battery Level Nominal Sgunit1`.
pub fn display_name(id: &str) -> String {
    let spaced = id.replace('_', " ");
    let spaced = spaced.strip_prefix("automation ").unwrap_or(&spaced);
    title_case(spaced)
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .enumerate()
        .map(|(position, word)| {
            let lower = word.to_lowercase();
            if position > 0 && MINOR_WORDS.contains(&lower.as_str()) {
                return lower;
            }
            let has_letters = word.chars().any(char::is_alphabetic);
            if has_letters && word.chars().count() > 1 && !word.chars().any(char::is_lowercase)
            {
                return word.to_owned();
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn name_key(trimmed: &str) -> Option<&'static str> {
    let key_text = trimmed.strip_prefix("- ").unwrap_or(trimmed);
    [NAME_KEY, ALIAS_KEY]
        .into_iter()
        .find(|key| key_text.starts_with(key))
}

/// Value of a `- key:` list item line.
fn list_item_value(trimmed: &str, key: &str) -> Option<String> {
    let value = trimmed.strip_prefix("- ")?.strip_prefix(key)?;
    Some(value.trim().trim_matches('"').to_owned())
}

/// Find an id key belonging to the same list item as the name on `line`.
///
/// Only lines at the name key's column are siblings. A shallower line (a new list
/// item or the end of the block) ends the search. Nothing is consumed.
fn scan_forward<R: BufRead>(
    source: &mut LineSource<R>,
    line: &str,
    key: &str,
) -> Result<Option<String>> {
    let Some(key_column) = line.find(key) else {
        return Ok(None);
    };

    for next in source.peek(MAX_LOOKAHEAD)? {
        let trimmed = next.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = next.len() - next.trim_start().len();
        if indent < key_column {
            return Ok(None);
        }
        if indent > key_column {
            continue;
        }
        if let Some(value) = trimmed.strip_prefix(UNIQUE_ID_KEY) {
            return Ok(Some(value.trim().to_owned()));
        }
        if let Some(value) = trimmed.strip_prefix(AUTOMATION_ID_KEY) {
            return Ok(Some(value.trim().trim_matches('"').to_owned()));
        }
    }

    Ok(None)
}

fn rename_line(line: &str, key: &str, id: &str) -> String {
    match line.split_once(key) {
        Some((head, _)) => format!("{head}{key} {}", display_name(id)),
        None => line.to_owned(),
    }
}
