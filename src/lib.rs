//! FASTA format adapter
//!
//! Treats FASTA files (plain or gzip-compressed) as tables of
//! `name`/`description`/`sequence` records so a data-migration pipeline can
//! resolve them by path, load and dump them, stage them as temporary files
//! and delete them.

pub mod engines;
pub mod modules;

pub use engines::storage::formats::{fasta_dumps, fasta_loads, Record, Row};
pub use engines::storage::{Chunks, Temp};
pub use engines::{EngineError, EngineResult};
pub use modules::io::{chunks_to_lists, read_fasta, write_fasta, FastaAdapter, FastaFile};
pub use modules::registry::{resolve, FormatAdapter, FormatRegistry, Resource};
pub use modules::schema::{discover, DataShape, Discover};

/// Initialize I/O counters and the default format registry
pub fn initialize() {
    engines::initialize();
    modules::initialize();
}
