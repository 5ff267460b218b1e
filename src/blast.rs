// src/blast.rs
//
// External alignment search: command construction, blocking invocation and
// parsing of the XML report (-outfmt 5).

use crate::defaults::{BLAST_EXE, BLAST_NUM_ALIGNMENTS, BLAST_NUM_DESCRIPTIONS, BLAST_OUTFMT_XML};
use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[path = "blast_test.rs"]
mod blast_test;

// Longest stderr excerpt carried in a ToolFailed error
const STDERR_TAIL: usize = 2048;

/// One search invocation
#[derive(Debug, Clone)]
pub struct BlastCommand {
    program: String,
    leading_args: Vec<String>,
    query: PathBuf,
    db: String,
    out: PathBuf,
}

impl BlastCommand {
    /// `exe` is whitespace-split: the first word is the program, the rest
    /// are passed before the search arguments.
    pub fn new(exe: &str, query: &Path, db: &str, out: &Path) -> Self {
        let mut words = exe.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| BLAST_EXE.to_string());
        Self {
            program,
            leading_args: words.collect(),
            query: query.to_path_buf(),
            db: db.to_string(),
            out: out.to_path_buf(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.push("-query".into());
        args.push(self.query.clone().into_os_string());
        args.push("-db".into());
        args.push(self.db.clone().into());
        args.push("-out".into());
        args.push(self.out.clone().into_os_string());
        args.push("-outfmt".into());
        args.push(BLAST_OUTFMT_XML.into());
        args.push("-num_descriptions".into());
        args.push(BLAST_NUM_DESCRIPTIONS.into());
        args.push("-num_alignments".into());
        args.push(BLAST_NUM_ALIGNMENTS.into());
        args
    }

    /// Printable command line for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args().iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion. A nonzero exit is an error, never a silent miss.
    pub fn run(&self) -> Result<()> {
        log::debug!("Running: {}", self.command_line());
        let output = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::ToolLaunch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let tail_start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL)
                .map_or(0, |(i, _)| i);
            return Err(Error::ToolFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr[tail_start..].to_string(),
            });
        }
        Ok(())
    }
}

/// One ranked hit from the report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlastHit {
    pub num: u32,
    pub id: String,
    pub def: String,
}

impl BlastHit {
    /// Description used as the classification label
    pub fn title(&self) -> String {
        if self.def.is_empty() {
            self.id.clone()
        } else {
            format!("{} {}", self.id, self.def)
        }
    }
}

/// Parsed report for a single query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlastReport {
    pub program: String,
    pub query_def: String,
    pub hits: Vec<BlastHit>,
}

impl BlastReport {
    /// Read and parse the report the tool wrote to `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path).map_err(|e| Error::Report {
            path: path.to_path_buf(),
            reason: match e.kind() {
                io::ErrorKind::NotFound => "report file was not written".to_string(),
                _ => e.to_string(),
            },
        })?;
        Self::parse(&xml).map_err(|reason| Error::Report {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(xml: &str) -> std::result::Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        let mut report = BlastReport::default();
        let mut open: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut saw_root = false;
        let mut iterations = 0usize;
        let mut in_hit = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| format!("XML error at byte {}: {}", reader.buffer_position(), e))?;
            match event {
                Event::Eof => break,
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    match name.as_str() {
                        "BlastOutput" => saw_root = true,
                        "Iteration" => {
                            iterations += 1;
                            if iterations > 1 {
                                return Err("report holds more than one query".to_string());
                            }
                        }
                        "Hit" => {
                            in_hit = true;
                            report.hits.push(BlastHit::default());
                        }
                        _ => {}
                    }
                    open.push(name);
                    text.clear();
                }
                Event::Text(t) => {
                    let unescaped = t.unescape().map_err(|e| e.to_string())?;
                    text.push_str(&unescaped);
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let value = text.trim();
                    match name.as_str() {
                        "BlastOutput_program" => report.program = value.to_string(),
                        "BlastOutput_query-def" => report.query_def = value.to_string(),
                        "Hit" => in_hit = false,
                        _ if in_hit => {
                            if let Some(hit) = report.hits.last_mut() {
                                assign_hit_field(hit, &name, value)?;
                            }
                        }
                        _ => {}
                    }
                    open.pop();
                    text.clear();
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err("no <BlastOutput> element".to_string());
        }
        if let Some(unclosed) = open.last() {
            return Err(format!("document ends inside <{}>", unclosed));
        }
        Ok(report)
    }

    /// Top-ranked hit, if the search found anything
    pub fn top_hit(&self) -> Option<&BlastHit> {
        self.hits.iter().min_by_key(|h| h.num)
    }
}

// Only the fields the label and ranking need are read
fn assign_hit_field(hit: &mut BlastHit, name: &str, value: &str) -> std::result::Result<(), String> {
    match name {
        "Hit_num" => {
            hit.num = value
                .parse()
                .map_err(|e| format!("bad <{}> value '{}': {}", name, value, e))?
        }
        "Hit_id" => hit.id = value.to_string(),
        "Hit_def" => hit.def = value.to_string(),
        _ => {}
    }
    Ok(())
}
