// src/job.rs
//
// Local job runner standing in for the cluster framework: plans splits,
// runs map tasks (in parallel, one attempt at a time per split), groups the
// candidates by key, reduces and writes the result.

use crate::defaults::{MAX_ATTEMPTS, OUTPUT_PART, SPLIT_SIZE};
use crate::error::{Error, Result};
use crate::io::fs::{self, Filesystem};
use crate::job_conf::JobConf;
use crate::pipes::{MapContext, Mapper, RecordReader, ReduceContext, Reducer};
use crate::split::{plan_splits, InputSplit};
use crate::task::{FastaMapper, FastaRecordReader, FastaReducer};
use crate::utils::{cputime, realtime};
use anyhow::Context;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[path = "job_test.rs"]
mod job_test;

/// Candidate `(key, value)` pairs produced by one map task
pub type MapOutput = Vec<(String, String)>;

/// Everything the local runner needs to know about a job
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub job_id: String,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub split_size: u64,
    pub max_attempts: u32,
    pub conf: JobConf,
}

// Jobs created so far by this process
static JOB_SEQ: AtomicU64 = AtomicU64::new(0);

/// Job id unique across processes sharing a scratch directory and across
/// jobs within one process: wall clock to the nanosecond, pid, sequence.
pub fn new_job_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!(
        "local{}{:09}_{}_{}",
        now.as_secs(),
        now.subsec_nanos(),
        std::process::id(),
        JOB_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

impl JobSpec {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, conf: JobConf) -> Self {
        Self {
            job_id: new_job_id(),
            input: input.into(),
            output_dir: output_dir.into(),
            split_size: SPLIT_SIZE,
            max_attempts: MAX_ATTEMPTS,
            conf,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub splits: usize,
    pub records: usize,
    pub keys: usize,
    pub failed_attempts: usize,
    pub output: PathBuf,
}

/// Attempt identity in the framework's naming scheme
pub fn attempt_id(job_id: &str, task: usize, attempt: u32) -> String {
    format!("attempt_{}_m_{:06}_{}", job_id, task, attempt)
}

/// Map-side context over one input pair, collecting emitted candidates
pub struct LocalMapContext<'a> {
    key: String,
    value: String,
    conf: &'a JobConf,
    out: &'a mut MapOutput,
}

impl<'a> LocalMapContext<'a> {
    pub fn new(key: String, value: String, conf: &'a JobConf, out: &'a mut MapOutput) -> Self {
        Self {
            key,
            value,
            conf,
            out,
        }
    }
}

impl MapContext for LocalMapContext<'_> {
    fn input_key(&self) -> &str {
        &self.key
    }

    fn input_value(&self) -> &str {
        &self.value
    }

    fn job_conf(&self) -> &JobConf {
        self.conf
    }

    fn emit(&mut self, key: &str, value: &str) -> Result<()> {
        self.out.push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// Reduce-side context over one key group
pub struct LocalReduceContext<'a> {
    key: &'a str,
    values: std::slice::Iter<'a, String>,
    current: Option<&'a String>,
    conf: &'a JobConf,
    out: &'a mut MapOutput,
}

impl<'a> LocalReduceContext<'a> {
    pub fn new(key: &'a str, values: &'a [String], conf: &'a JobConf, out: &'a mut MapOutput) -> Self {
        Self {
            key,
            values: values.iter(),
            current: None,
            conf,
            out,
        }
    }
}

impl ReduceContext for LocalReduceContext<'_> {
    fn input_key(&self) -> &str {
        self.key
    }

    fn next_value(&mut self) -> bool {
        self.current = self.values.next();
        self.current.is_some()
    }

    fn input_value(&self) -> &str {
        self.current.map_or("", String::as_str)
    }

    fn job_conf(&self) -> &JobConf {
        self.conf
    }

    fn emit(&mut self, key: &str, value: &str) -> Result<()> {
        self.out.push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// One map task attempt: decode the split and classify every record in
/// stream order. Any error fails the whole attempt.
pub fn run_map_task(
    split: &InputSplit,
    conf: &JobConf,
    attempt_id: &str,
    fs: Box<dyn Filesystem>,
) -> Result<MapOutput> {
    // Configuration problems surface before the split is touched
    let mut mapper = FastaMapper::from_conf(conf, attempt_id)?;
    let mut reader = FastaRecordReader::open_with(split.clone(), fs)?;
    let mut out = MapOutput::new();

    while let Some((key, value)) = reader.next()? {
        let mut ctx = LocalMapContext::new(key, value, conf, &mut out);
        mapper.map(&mut ctx)?;
    }

    log::info!(
        "{}: {} records from [{}, {}), progress {:.2}",
        attempt_id,
        reader.records_read(),
        split.offset,
        split.end(),
        reader.progress()
    );
    if reader.malformed_records() > 0 {
        log::warn!(
            "{}: skipped {} malformed records",
            attempt_id,
            reader.malformed_records()
        );
    }
    Ok(out)
}

/// Run a split until an attempt succeeds, a non-retryable error occurs, or
/// attempts run out. Returns the output and the number of failed attempts.
fn run_with_retries(spec: &JobSpec, task: usize, split: &InputSplit) -> Result<(MapOutput, usize)> {
    let max_attempts = spec.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        let id = attempt_id(&spec.job_id, task, attempt);
        let result = fs::connect(&split.location())
            .and_then(|fs| run_map_task(split, &spec.conf, &id, fs));
        match result {
            Ok(out) => return Ok((out, attempt as usize)),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                log::warn!("{} failed, retrying: {}", id, e);
                attempt += 1;
            }
            Err(e) => {
                log::error!("{} failed: {}", id, e);
                return Err(e);
            }
        }
    }
}

/// Group candidates by key. Within a key, values keep split order.
pub fn group_by_key(outputs: Vec<MapOutput>) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in outputs.into_iter().flatten() {
        groups.entry(key).or_default().push(value);
    }
    groups
}

/// Reduce every group to at most one `(key, value)`
pub fn reduce_groups(groups: &BTreeMap<String, Vec<String>>, conf: &JobConf) -> Result<MapOutput> {
    let mut reducer = FastaReducer::from_conf(conf)?;
    let mut out = MapOutput::with_capacity(groups.len());
    for (key, values) in groups {
        let mut ctx = LocalReduceContext::new(key, values, conf, &mut out);
        reducer.reduce(&mut ctx)?;
    }
    Ok(out)
}

/// Splits for a local input file. Gzip input is not splittable.
pub fn plan_input(input: &Path, split_size: u64) -> Result<Vec<InputSplit>> {
    let path = input
        .to_str()
        .ok_or_else(|| Error::InvalidSplit(format!("non UTF-8 path {}", input.display())))?;
    if path.ends_with(".gz") {
        return Ok(vec![InputSplit::new(path, 0, u64::MAX)]);
    }
    let len = fs::connect(&InputSplit::new(path, 0, 0).location())?.file_len(path)?;
    Ok(plan_splits(path, len, split_size))
}

/// Count the records each split would emit, without classifying them
pub fn inspect_splits(input: &Path, split_size: u64) -> Result<Vec<(InputSplit, usize)>> {
    plan_input(input, split_size)?
        .into_iter()
        .map(|split| -> Result<(InputSplit, usize)> {
            let mut reader = FastaRecordReader::open(split.clone())?;
            while reader.next()?.is_some() {}
            Ok((split, reader.records_read()))
        })
        .collect()
}

fn write_output(path: &Path, pairs: &[(String, String)]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for (key, value) in pairs {
        writeln!(writer, "{}\t{}", key, value)?;
    }
    writer.flush()
}

/// Run the whole job and write `part-00000` under the output directory
pub fn run_job(spec: &JobSpec) -> anyhow::Result<JobSummary> {
    let start_wall = realtime();
    let start_cpu = cputime();

    // Fail on bad configuration before spawning anything
    spec.conf.classifier()?;
    spec.conf.reconcile_policy()?;

    let splits = plan_input(&spec.input, spec.split_size)
        .with_context(|| format!("Planning splits for {}", spec.input.display()))?;
    log::info!(
        "Job {}: {} splits of up to {} bytes from {}",
        spec.job_id,
        splits.len(),
        spec.split_size,
        spec.input.display()
    );

    let results: Vec<(MapOutput, usize)> = splits
        .par_iter()
        .enumerate()
        .map(|(task, split)| run_with_retries(spec, task, split))
        .collect::<Result<_>>()
        .context("Map phase failed")?;

    let failed_attempts: usize = results.iter().map(|(_, failed)| failed).sum();
    let outputs: Vec<MapOutput> = results.into_iter().map(|(out, _)| out).collect();
    let records: usize = outputs.iter().map(Vec::len).sum();

    let groups = group_by_key(outputs);
    let reduced = reduce_groups(&groups, &spec.conf).context("Reduce phase failed")?;

    std::fs::create_dir_all(&spec.output_dir)
        .with_context(|| format!("Creating output directory {}", spec.output_dir.display()))?;
    let output = spec.output_dir.join(OUTPUT_PART);
    write_output(&output, &reduced)
        .with_context(|| format!("Writing {}", output.display()))?;

    log::info!(
        "Job {} done: {} records, {} keys, {} failed attempts; real {:.3} sec, CPU {:.3} sec",
        spec.job_id,
        records,
        reduced.len(),
        failed_attempts,
        realtime() - start_wall,
        cputime() - start_cpu
    );

    Ok(JobSummary {
        splits: splits.len(),
        records,
        keys: reduced.len(),
        failed_attempts,
        output,
    })
}
