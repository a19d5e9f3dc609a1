//! I/O module
//!
//! File handles for the formats this crate can read and write.

pub mod fasta;

/// Convenience re-exports
pub use fasta::{chunks_to_lists, read_fasta, write_fasta, FastaAdapter, FastaFile};
