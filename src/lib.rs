pub mod blast; // External alignment search invocation and XML report parsing
pub mod classify; // Per-record classifiers (alignment search, GC content)
pub mod defaults;
pub mod error;
pub mod io; // Filesystem seam and split-aware FASTA reader
pub mod job; // Local runner standing in for the cluster framework
pub mod job_conf;
pub mod kseq; // Position-tracking buffered stream used by the FASTA reader
pub mod pipes; // Execution protocol callback contract
pub mod reconcile;
pub mod split; // Input splits and the record ownership rule
pub mod task; // Record reader, mapper and reducer bound to the protocol
pub mod utils;
