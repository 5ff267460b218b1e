// src/task.rs
//
// Task adapter: the record reader, mapper and reducer the execution
// protocol drives, built on the split reader, classifier and reconciler.

use crate::classify::{self, Classifier};
use crate::error::{Error, Result};
use crate::io::fasta_reader::{format_fasta, parse_fasta_record, FastaSplitReader};
use crate::io::fs::{self, Filesystem};
use crate::job_conf::{JobConf, ReconcilePolicy};
use crate::pipes::{MapContext, Mapper, RecordReader, ReduceContext, Reducer};
use crate::reconcile::reconcile;
use crate::split::InputSplit;
use flate2::read::GzDecoder;

#[path = "task_test.rs"]
mod task_test;

/// Reader role: yields `(record id, FASTA text)` for every record the split owns
pub struct FastaRecordReader {
    // Declared before `_fs` so the stream is dropped before its filesystem
    reader: FastaSplitReader,
    _fs: Box<dyn Filesystem>,
    split: InputSplit,
    records: usize,
}

impl FastaRecordReader {
    /// Connect to the split's filesystem and open it
    pub fn open(split: InputSplit) -> Result<Self> {
        let fs = fs::connect(&split.location())?;
        Self::open_with(split, fs)
    }

    /// Open a split on an already connected filesystem. The handle is
    /// owned from here on and released on every exit path.
    pub fn open_with(split: InputSplit, fs: Box<dyn Filesystem>) -> Result<Self> {
        let location = split.location();
        let source = fs.open_file(&location.path)?;

        let reader = if location.path.ends_with(".gz") {
            if split.offset != 0 {
                return Err(Error::InvalidSplit(format!(
                    "compressed input {} cannot start at offset {}",
                    split.path, split.offset
                )));
            }
            log::debug!("Reading {} through gzip", location.path);
            FastaSplitReader::new(Box::new(GzDecoder::new(source)), &split)
        } else {
            FastaSplitReader::open(source, &split)?
        };

        log::debug!(
            "Opened split {} [{}, {})",
            split.path,
            split.offset,
            split.end()
        );
        Ok(Self {
            reader,
            _fs: fs,
            split,
            records: 0,
        })
    }

    pub fn split(&self) -> &InputSplit {
        &self.split
    }

    pub fn records_read(&self) -> usize {
        self.records
    }

    pub fn malformed_records(&self) -> usize {
        self.reader.malformed_records()
    }
}

impl RecordReader for FastaRecordReader {
    fn next(&mut self) -> Result<Option<(String, String)>> {
        match self.reader.read_record()? {
            Some(record) => {
                self.records += 1;
                Ok(Some((record.id().to_string(), format_fasta(&record))))
            }
            None => Ok(None),
        }
    }

    fn progress(&self) -> f32 {
        self.reader.progress()
    }
}

impl Drop for FastaRecordReader {
    fn drop(&mut self) {
        log::debug!(
            "Closing split {} [{}, {}) after {} records",
            self.split.path,
            self.split.offset,
            self.split.end(),
            self.records
        );
    }
}

/// Mapper role: classify each record and emit `(id, label)`
pub struct FastaMapper {
    classifier: Box<dyn Classifier>,
}

impl FastaMapper {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn from_conf(conf: &JobConf, attempt_id: &str) -> Result<Self> {
        Ok(Self::new(classify::from_conf(conf, attempt_id)?))
    }
}

impl Mapper for FastaMapper {
    fn map(&mut self, ctx: &mut dyn MapContext) -> Result<()> {
        let key = ctx.input_key().to_string();
        let record = parse_fasta_record(ctx.input_value())?;
        let label = self.classifier.classify(&record)?;
        ctx.emit(&key, &label)
    }
}

/// Reducer role: one value per key
pub struct FastaReducer {
    policy: ReconcilePolicy,
}

impl FastaReducer {
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self { policy }
    }

    pub fn from_conf(conf: &JobConf) -> Result<Self> {
        Ok(Self::new(conf.reconcile_policy()?))
    }
}

impl Reducer for FastaReducer {
    fn reduce(&mut self, ctx: &mut dyn ReduceContext) -> Result<()> {
        let key = ctx.input_key().to_string();
        let mut values = Vec::new();
        while ctx.next_value() {
            values.push(ctx.input_value().to_string());
        }
        match reconcile(self.policy, values) {
            Some(value) => ctx.emit(&key, &value),
            None => Ok(()),
        }
    }
}
