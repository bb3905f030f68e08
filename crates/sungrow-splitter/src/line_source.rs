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

//! Line reader with bounded lookahead

use crate::error::{Result, SplitterError};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Upper bound on how far a caller may peek past the current line.
pub const MAX_LOOKAHEAD: usize = 16;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Sequential line source. Lines come back without their terminator.
///
/// Peeked lines are buffered and handed out again by [`LineSource::next_line`], so
/// looking ahead never consumes input. A leading byte order mark is dropped and
/// invalid UTF-8 is decoded lossily.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    pending: VecDeque<String>,
    line_number: usize,
    lines_read: usize,
    line_ending: Option<&'static str>,
}

impl LineSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SplitterError::file(path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            line_number: 0,
            lines_read: 0,
            line_ending: None,
        }
    }

    /// Number of lines handed out by `next_line` so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Terminator of the first terminated line read, `\n` until one is seen.
    ///
    /// Writers use it so CRLF packages stay CRLF.
    pub fn line_ending(&self) -> &'static str {
        self.line_ending.unwrap_or("\n")
    }

    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = match self.pending.pop_front() {
            Some(line) => Some(line),
            None => self.read_raw()?,
        };
        if line.is_some() {
            self.line_number += 1;
        }
        Ok(line)
    }

    /// Look at up to `count` upcoming lines (capped at [`MAX_LOOKAHEAD`]).
    ///
    /// Fewer lines are returned near the end of input.
    pub fn peek(&mut self, count: usize) -> io::Result<impl Iterator<Item = &str> + '_> {
        let wanted = count.min(MAX_LOOKAHEAD);
        while self.pending.len() < wanted {
            match self.read_raw()? {
                Some(line) => self.pending.push_back(line),
                None => break,
            }
        }
        Ok(self.pending.iter().take(wanted).map(String::as_str))
    }

    fn read_raw(&mut self) -> io::Result<Option<String>> {
        let mut bytes = Vec::new();
        if self.reader.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(None);
        }
        self.lines_read += 1;

        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            let ending = if bytes.last() == Some(&b'\r') {
                bytes.pop();
                "\r\n"
            } else {
                "\n"
            };
            self.line_ending.get_or_insert(ending);
        }

        let line = match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => {
                warn!("Line {} is not valid UTF-8, decoding lossily", self.lines_read);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        if self.lines_read == 1 {
            let stripped = line.strip_prefix(BYTE_ORDER_MARK).map(str::to_owned);
            return Ok(Some(stripped.unwrap_or(line)));
        }
        Ok(Some(line))
    }
}
