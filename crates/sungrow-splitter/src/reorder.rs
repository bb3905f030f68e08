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

//! Canonical id-then-name order for list items
//!
//! The upstream package declares entities as `- name:` followed by `unique_id:`
//! (sometimes with `device_address:` in between). Moving the id to the front lets
//! the later passes treat `- unique_id:` as the start of every entity.

use crate::error::{Result, SplitterError};
use crate::line_source::LineSource;
use crate::output::write_atomic;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

const NAME_ITEM: &str = "- name:";
const UNIQUE_ID_PREFIX: &str = "unique_id: ";
const DEVICE_ADDRESS_PREFIX: &str = "device_address: ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub lines: usize,
    pub reordered: usize,
}

/// Stream `source` into `out`, moving `unique_id` ahead of `name` in every list item
/// that has one within its first three lines.
pub fn reorder_names_and_ids<R: BufRead, W: Write>(
    source: &mut LineSource<R>,
    out: &mut W,
) -> io::Result<ReorderOutcome> {
    let mut outcome = ReorderOutcome::default();

    while let Some(line) = source.next_line()? {
        let eol = source.line_ending();
        if !line.trim().starts_with(NAME_ITEM) {
            write!(out, "{line}{eol}")?;
            continue;
        }

        let ahead: Vec<String> = source.peek(2)?.map(str::to_owned).collect();
        match ahead.as_slice() {
            [second, ..] if is_unique_id(second) => {
                source.next_line()?;
                let (id, name) = swap_id_and_name(&line, second);
                write!(out, "{id}{eol}")?;
                write!(out, "{name}{eol}")?;
                outcome.reordered += 1;
            }
            [second, third] if is_device_address(second) && is_unique_id(third) => {
                source.next_line()?;
                source.next_line()?;
                let (id, name) = swap_id_and_name(&line, third);
                write!(out, "{id}{eol}")?;
                write!(out, "{name}{eol}")?;
                write!(out, "{second}{eol}")?;
                outcome.reordered += 1;
            }
            _ => write!(out, "{line}{eol}")?,
        }
    }

    outcome.lines = source.line_number();
    Ok(outcome)
}

/// Reorder `input` into `output`.
///
/// Failures carry the line the reader had reached so the caller can decide whether
/// to carry on with the unordered file.
pub fn reorder_file(input: &Path, output: &Path) -> Result<ReorderOutcome> {
    let mut source = LineSource::open(input).map_err(|e| match e {
        SplitterError::File { source, .. } => SplitterError::Reorder { line: 0, source },
        other => other,
    })?;

    let mut buffer = Vec::new();
    let outcome = reorder_names_and_ids(&mut source, &mut buffer).map_err(|e| {
        SplitterError::Reorder {
            line: source.line_number(),
            source: e,
        }
    })?;

    write_atomic(output, &buffer).map_err(|e| match e {
        SplitterError::File { source, .. } => SplitterError::Reorder {
            line: outcome.lines,
            source,
        },
        other => other,
    })?;

    info!(
        "Reordered {} list items ({} lines) into {}",
        outcome.reordered,
        outcome.lines,
        output.display()
    );
    Ok(outcome)
}

fn is_unique_id(line: &str) -> bool {
    line.trim().starts_with(UNIQUE_ID_PREFIX)
}

fn is_device_address(line: &str) -> bool {
    line.trim().starts_with(DEVICE_ADDRESS_PREFIX)
}

/// `  - name: x` + `    unique_id: y` becomes `  - unique_id: y` + `    name: x`.
fn swap_id_and_name(name_line: &str, id_line: &str) -> (String, String) {
    let (indent, rest) = name_line.split_once('-').unwrap_or(("", name_line));
    (
        format!("{indent}- {}", id_line.trim()),
        format!("{indent}  {}", rest.trim()),
    )
}
