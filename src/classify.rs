// src/classify.rs
//
// Per-record classification. The alignment classifier stages the record in
// the scratch directory, runs the external search and turns the top hit
// into a label. Scratch names derive from the task attempt, never from the
// record, so co-located tasks cannot collide.

use crate::blast::{BlastCommand, BlastReport};
use crate::defaults::{BLAST_EXE, KEY_BLAST_DB, KEY_BLAST_EXE, KEY_SCRATCH_DIR, NO_MATCH};
use crate::error::Result;
use crate::io::fasta_reader::format_fasta;
use crate::job_conf::{ClassifierKind, JobConf};
use bio::io::fasta;
use bio::seq_analysis::gc::gc_content;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "classify_test.rs"]
mod classify_test;

/// Turns one record into one label
pub trait Classifier: Send {
    fn classify(&mut self, record: &fasta::Record) -> Result<String>;
}

/// Build the classifier the job configuration asks for.
/// Missing required keys fail here, before any record is read.
pub fn from_conf(conf: &JobConf, attempt_id: &str) -> Result<Box<dyn Classifier>> {
    match conf.classifier()? {
        ClassifierKind::Blast => Ok(Box::new(BlastClassifier::from_conf(conf, attempt_id)?)),
        ClassifierKind::GcContent => Ok(Box::new(GcClassifier)),
    }
}

/// Query and report files of one attempt, removed when dropped
pub struct ScratchFiles {
    pub query: PathBuf,
    pub report: PathBuf,
}

impl ScratchFiles {
    pub fn new(scratch_dir: &Path, attempt_id: &str) -> Self {
        Self {
            query: scratch_dir.join(format!("{}-query.fa", attempt_id)),
            report: scratch_dir.join(format!("{}-report.xml", attempt_id)),
        }
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in [&self.query, &self.report] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove scratch file {}: {}", path.display(), e),
            }
        }
    }
}

/// Label = title of the top hit of an external alignment search
#[derive(Debug, Clone)]
pub struct BlastClassifier {
    scratch_dir: PathBuf,
    db: String,
    exe: String,
    attempt_id: String,
}

impl BlastClassifier {
    pub fn from_conf(conf: &JobConf, attempt_id: &str) -> Result<Self> {
        let scratch_dir = PathBuf::from(conf.require(KEY_SCRATCH_DIR)?);
        let db = conf.require(KEY_BLAST_DB)?.to_string();
        let exe = conf.get_or(KEY_BLAST_EXE, BLAST_EXE).to_string();
        Ok(Self {
            scratch_dir,
            db,
            exe,
            attempt_id: attempt_id.to_string(),
        })
    }

    pub fn scratch_files(&self) -> ScratchFiles {
        ScratchFiles::new(&self.scratch_dir, &self.attempt_id)
    }
}

impl Classifier for BlastClassifier {
    fn classify(&mut self, record: &fasta::Record) -> Result<String> {
        let scratch = self.scratch_files();
        fs::create_dir_all(&self.scratch_dir)?;
        fs::write(&scratch.query, format_fasta(record))?;

        BlastCommand::new(&self.exe, &scratch.query, &self.db, &scratch.report).run()?;
        let report = BlastReport::from_file(&scratch.report)?;

        let label = match report.top_hit() {
            Some(hit) => hit.title(),
            None => NO_MATCH.to_string(),
        };
        log::debug!("{} -> {}", record.id(), label);
        Ok(label)
    }
}

/// Label = GC percentage of the sequence, one decimal
#[derive(Debug, Clone, Copy, Default)]
pub struct GcClassifier;

impl Classifier for GcClassifier {
    fn classify(&mut self, record: &fasta::Record) -> Result<String> {
        let seq = record.seq();
        if seq.is_empty() {
            return Ok(format!("{:.1}", 0.0));
        }
        let upper: Vec<u8> = seq.to_ascii_uppercase();
        Ok(format!("{:.1}", gc_content(&upper) * 100.0))
    }
}
