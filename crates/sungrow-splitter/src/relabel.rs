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

//! Replace unit placeholders with human labels
//!
//! A generated unit still carries its placeholder tag (`Sgunit1` in names,
//! `sgunit1` in ids). This pass swaps both for a real label such as `Garage` /
//! `garage`. Plain literal replacement, no patterns.

use crate::config::UnitLabel;
use crate::error::Result;
use crate::line_source::LineSource;
use crate::names::display_name;
use crate::output::write_atomic;
use crate::rename::UnitTag;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::info;

/// Two literal replacements applied to every line, name pair first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relabel {
    pub name_to_replace: String,
    pub replacement_name: String,
    pub id_to_replace: String,
    pub replacement_id: String,
}

impl Relabel {
    pub fn new(
        name_to_replace: impl Into<String>,
        replacement_name: impl Into<String>,
        id_to_replace: impl Into<String>,
        replacement_id: impl Into<String>,
    ) -> Self {
        Self {
            name_to_replace: name_to_replace.into(),
            replacement_name: replacement_name.into(),
            id_to_replace: id_to_replace.into(),
            replacement_id: replacement_id.into(),
        }
    }

    /// Placeholders as the splitter generates them for `label.unit`.
    pub fn for_label(label: &UnitLabel, tag: UnitTag) -> Self {
        let id = tag.for_unit(label.unit);
        Self::new(display_name(&id), &label.name, id, &label.slug)
    }

    pub fn apply(&self, line: &str) -> String {
        line.replace(&self.name_to_replace, &self.replacement_name)
            .replace(&self.id_to_replace, &self.replacement_id)
    }
}

pub fn relabel<R: BufRead, W: Write>(
    source: &mut LineSource<R>,
    out: &mut W,
    relabel: &Relabel,
) -> Result<usize> {
    let mut changed = 0;
    while let Some(line) = source.next_line()? {
        let replaced = relabel.apply(&line);
        if replaced != line {
            changed += 1;
        }
        write!(out, "{replaced}{}", source.line_ending())?;
    }
    Ok(changed)
}

pub fn relabel_file(input: &Path, output: &Path, pairs: &Relabel) -> Result<usize> {
    let mut source = LineSource::open(input)?;
    let mut buffer = Vec::new();
    let changed = relabel(&mut source, &mut buffer, pairs)?;
    write_atomic(output, &buffer)?;

    info!(
        "Relabelled {} -> {} in {} lines: {}",
        pairs.name_to_replace,
        pairs.replacement_name,
        changed,
        output.display()
    );
    Ok(changed)
}
