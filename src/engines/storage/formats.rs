//! FASTA text codec
//!
//! The parser is deliberately lenient: text ahead of the first header is
//! dropped, blank lines are ignored wherever they occur and a header with no
//! sequence lines still yields a record. Malformed input never fails; it
//! only produces fewer or emptier records.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::engines::{EngineError, EngineResult};

/// Untyped row as handed over by other formats
pub type Row = BTreeMap<String, String>;

/// Trait for record parsers
pub trait SequenceParser: Send + Sync {
    /// Parse a string into records
    fn parse_string(&self, content: &str) -> Vec<Record>;

    /// Get the format name
    fn format_name(&self) -> &str;
}

/// Trait for record writers
pub trait SequenceWriter: Send + Sync {
    /// Render records to a string
    fn write_string(&self, records: &[Record]) -> String;

    /// Get the format name
    fn format_name(&self) -> &str;
}

/// One FASTA entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// First token of the header line
    pub name: String,
    /// Remaining header tokens joined by single spaces, possibly empty
    pub description: String,
    /// All sequence lines of the entry concatenated
    pub sequence: String,
}

impl Record {
    /// Field names in output order
    pub const FIELDS: [&'static str; 3] = ["name", "description", "sequence"];

    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sequence: sequence.into(),
        }
    }

    /// Length of the sequence in characters
    pub fn len(&self) -> usize {
        self.sequence.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Build a record from an untyped row; extra columns are ignored
    pub fn from_row(row: &Row) -> EngineResult<Self> {
        let field = |key: &str| {
            row.get(key)
                .cloned()
                .ok_or_else(|| EngineError::MissingField(key.to_string()))
        };

        Ok(Self {
            name: field("name")?,
            description: field("description")?,
            sequence: field("sequence")?,
        })
    }

    /// Flatten into an untyped row
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), self.name);
        row.insert("description".to_string(), self.description);
        row.insert("sequence".to_string(), self.sequence);
        row
    }
}

impl TryFrom<&Row> for Record {
    type Error = EngineError;

    fn try_from(row: &Row) -> EngineResult<Self> {
        Record::from_row(row)
    }
}

impl From<Record> for Row {
    fn from(record: Record) -> Self {
        record.into_row()
    }
}

/// Record being accumulated while its sequence lines are read
struct OpenRecord<'a> {
    name: String,
    description: String,
    fragments: Vec<&'a str>,
}

impl<'a> OpenRecord<'a> {
    fn from_header(header: &str) -> Self {
        let mut tokens = header.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_string();
        let description = tokens.join(" ");

        Self {
            name,
            description,
            fragments: Vec::new(),
        }
    }

    fn finish(self) -> Record {
        Record {
            name: self.name,
            description: self.description,
            sequence: self.fragments.concat(),
        }
    }
}

/// FASTA format parser
#[derive(Debug, Clone, Default)]
pub struct FastaParser;

impl FastaParser {
    pub fn new() -> Self {
        Self
    }
}

impl SequenceParser for FastaParser {
    fn parse_string(&self, content: &str) -> Vec<Record> {
        let mut records = Vec::new();
        let mut current: Option<OpenRecord<'_>> = None;
        let mut orphaned = 0usize;

        for line in content.split('\n') {
            let line = line.trim();

            if let Some(header) = line.strip_prefix('>') {
                if let Some(open) = current.take() {
                    records.push(open.finish());
                }
                current = Some(OpenRecord::from_header(header));
            } else if !line.is_empty() {
                match current.as_mut() {
                    Some(open) => open.fragments.push(line),
                    None => orphaned += 1,
                }
            }
        }

        if let Some(open) = current.take() {
            records.push(open.finish());
        }

        if orphaned > 0 {
            log::warn!("Skipped {} line(s) preceding the first FASTA header", orphaned);
        }

        records
    }

    fn format_name(&self) -> &str {
        "FASTA"
    }
}

/// FASTA format writer
#[derive(Debug, Clone, Default)]
pub struct FastaWriter {
    /// Wrap sequence lines at this width; `None` writes each sequence on one line
    line_width: Option<usize>,
}

impl FastaWriter {
    /// Create a writer that keeps every sequence on a single line
    pub fn new() -> Self {
        Self { line_width: None }
    }

    /// Create a writer that wraps sequences at `line_width` characters
    pub fn with_line_width(line_width: usize) -> Self {
        Self {
            line_width: Some(line_width).filter(|w| *w > 0),
        }
    }

    fn push_sequence(&self, output: &mut String, sequence: &str) {
        match self.line_width {
            None => {
                output.push_str(sequence);
                output.push('\n');
            }
            Some(width) => {
                let chars: Vec<char> = sequence.chars().collect();
                if chars.is_empty() {
                    output.push('\n');
                }
                for line in chars.chunks(width) {
                    output.extend(line);
                    output.push('\n');
                }
            }
        }
    }
}

impl SequenceWriter for FastaWriter {
    fn write_string(&self, records: &[Record]) -> String {
        let mut output = String::new();

        for record in records {
            output.push_str(&format!(">{} {}\n", record.name, record.description));
            self.push_sequence(&mut output, &record.sequence);
        }

        output
    }

    fn format_name(&self) -> &str {
        "FASTA"
    }
}

/// Parse FASTA text into records
pub fn fasta_loads(content: &str) -> Vec<Record> {
    FastaParser::new().parse_string(content)
}

/// Render records as FASTA text, one sequence line per record
pub fn fasta_dumps(records: &[Record]) -> String {
    FastaWriter::new().write_string(records)
}
