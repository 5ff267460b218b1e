//! Corpus access: the filesystem seam and the split-aware FASTA reader.

pub mod fasta_reader;
pub mod fs;
