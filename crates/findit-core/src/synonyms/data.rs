use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::SynonymError;
use crate::synonyms::table::SynonymTable;

impl SynonymTable {
    /// Load a table from a file of `semantic\-raw1,raw2,...` lines.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SynonymError> {
        let path = path.as_ref();
        let read_err = |source| SynonymError::Read {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(read_err)?;
        let reader = BufReader::new(file);

        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line.map_err(read_err)?);
        }

        Self::parse_lines(lines.iter().map(String::as_str))
    }

    /// Parse table text; blank lines and `#` comments are skipped.
    pub fn parse_str(text: &str) -> Result<Self, SynonymError> {
        Self::parse_lines(text.lines())
    }

    fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Self, SynonymError> {
        let mut table = SynonymTable::empty();

        for (line_num, line) in lines.enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let invalid = || SynonymError::InvalidLine {
                line: line_num + 1,
                content: line.to_string(),
            };

            let (semantic, raws) = trimmed.split_once(r"\-").ok_or_else(invalid)?;
            let raws: Vec<&str> = raws
                .split(',')
                .map(str::trim)
                .filter(|raw| !raw.is_empty())
                .collect();

            if semantic.trim().is_empty() || raws.is_empty() {
                return Err(invalid());
            }

            for raw in raws {
                table.insert_synonym(semantic, raw)?;
            }
        }

        Ok(table)
    }
}
