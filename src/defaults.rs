// src/defaults.rs

// Job configuration keys
pub const KEY_SCRATCH_DIR: &str = "job.local.dir";
pub const KEY_BLAST_DB: &str = "fasta.blastdb";
pub const KEY_BLAST_EXE: &str = "fasta.blast.exe";
pub const KEY_CLASSIFIER: &str = "fasta.classifier";
pub const KEY_RECONCILE: &str = "fasta.reconcile";

// Tool defaults
pub const BLAST_EXE: &str = "blastn";
pub const BLAST_OUTFMT_XML: &str = "5";
pub const BLAST_NUM_DESCRIPTIONS: &str = "1";
pub const BLAST_NUM_ALIGNMENTS: &str = "0";

// Label emitted when the search reports no hits
pub const NO_MATCH: &str = "nohit";

// Record formatting
pub const FASTA_LINE_WIDTH: usize = 60;

// Local runner
pub const SPLIT_SIZE: u64 = 64 * 1024 * 1024;
pub const MAX_ATTEMPTS: u32 = 4;
pub const OUTPUT_PART: &str = "part-00000";
pub const VERBOSITY: i32 = 3;
