// FASTA split reader
//
// Decodes the FASTA records owned by one input split. The stream handed in
// may start anywhere in the corpus; ownership follows the marker-position
// rule documented in `crate::split`.
//
// Records are yielded as bio::io::fasta::Record so the rest of the crate
// shares one record type with the bio ecosystem.

use crate::defaults::FASTA_LINE_WIDTH;
use crate::io::fs::ReadSeek;
use crate::kseq::KStream;
use crate::split::InputSplit;
use bio::io::fasta;
use std::io::{self, Read, SeekFrom};

/// Marker line read ahead of the record it opens
struct Marker {
    pos: u64,
    header: Vec<u8>,
}

/// Lazy, forward-only reader over the records a split owns
pub struct FastaSplitReader {
    stream: KStream,
    offset: u64,
    end: u64,
    length: u64,
    started: bool,
    done: bool,
    pending: Option<Marker>,
    line: Vec<u8>,
    progress: f32,
    malformed: usize,
}

impl FastaSplitReader {
    /// `reader` must already be positioned at `split.scan_start()`.
    pub fn new(reader: Box<dyn Read>, split: &InputSplit) -> Self {
        Self {
            stream: KStream::new(reader, split.scan_start()),
            offset: split.offset,
            end: split.end(),
            length: split.length,
            started: false,
            done: false,
            pending: None,
            line: Vec::new(),
            progress: 0.0,
            malformed: 0,
        }
    }

    /// Seek `source` to where the split's scan begins and wrap it
    pub fn open(mut source: Box<dyn ReadSeek>, split: &InputSplit) -> io::Result<Self> {
        source.seek(SeekFrom::Start(split.scan_start()))?;
        Ok(Self::new(Box::new(source), split))
    }

    /// Fraction of the split consumed so far, in [0, 1], never decreasing
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Number of records dropped because their marker line was unusable
    pub fn malformed_records(&self) -> usize {
        self.malformed
    }

    /// Read the next owned record; `Ok(None)` once the split is exhausted
    pub fn read_record(&mut self) -> io::Result<Option<fasta::Record>> {
        if !self.started {
            self.started = true;
            self.pending = self.seek_first_marker()?;
        }

        loop {
            if self.done {
                return Ok(None);
            }
            let marker = match self.pending.take() {
                Some(m) if m.pos < self.end => m,
                _ => {
                    self.finish();
                    return Ok(None);
                }
            };

            let seq = self.read_payload()?;
            self.update_progress();

            match parse_header(&marker.header) {
                Some((id, desc)) => {
                    return Ok(Some(fasta::Record::with_attrs(&id, desc.as_deref(), &seq)));
                }
                None => {
                    self.malformed += 1;
                    log::warn!(
                        "Skipping record at byte {} with an empty identifier",
                        marker.pos
                    );
                }
            }
        }
    }

    /// Position on the first marker line this split may own
    fn seek_first_marker(&mut self) -> io::Result<Option<Marker>> {
        if self.offset > 0 && !self.stream.skip_line()? {
            return Ok(None);
        }

        let mut skipped = 0u64;
        loop {
            let Some(pos) = self.stream.read_line(&mut self.line)? else {
                break;
            };
            if pos >= self.end {
                break;
            }
            if self.line.first() == Some(&b'>') {
                if skipped > 0 {
                    if self.offset == 0 {
                        log::warn!("Skipped {} bytes before the first record", skipped);
                    } else {
                        log::debug!(
                            "Skipped {} bytes of a record owned by an earlier split",
                            skipped
                        );
                    }
                }
                return Ok(Some(Marker {
                    pos,
                    header: self.line[1..].to_vec(),
                }));
            }
            skipped += self.line.len() as u64 + 1;
        }

        log::debug!(
            "No record starts in split [{}, {})",
            self.offset,
            self.end
        );
        Ok(None)
    }

    /// Accumulate payload lines up to the next marker or end of stream.
    /// The next marker, if any, is stashed in `pending`.
    fn read_payload(&mut self) -> io::Result<Vec<u8>> {
        let mut seq = Vec::new();
        while let Some(pos) = self.stream.read_line(&mut self.line)? {
            match self.line.first() {
                Some(b'>') => {
                    self.pending = Some(Marker {
                        pos,
                        header: self.line[1..].to_vec(),
                    });
                    return Ok(seq);
                }
                Some(b';') => continue,
                _ => seq.extend(self.line.iter().copied().filter(|b| !b.is_ascii_whitespace())),
            }
        }
        Ok(seq)
    }

    fn update_progress(&mut self) {
        if self.length == 0 {
            return;
        }
        let consumed = self.stream.position().saturating_sub(self.offset);
        let fraction = (consumed as f64 / self.length as f64).min(1.0) as f32;
        if fraction > self.progress {
            self.progress = fraction;
        }
    }

    fn finish(&mut self) {
        self.done = true;
        if self.length > 0 {
            self.progress = 1.0;
        }
    }
}

impl Iterator for FastaSplitReader {
    type Item = io::Result<fasta::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Split a marker header into identifier and optional description
fn parse_header(header: &[u8]) -> Option<(String, Option<String>)> {
    let text = String::from_utf8_lossy(header);
    let text = text.trim();
    let (id, desc) = match text.find(|c: char| c.is_ascii_whitespace()) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    };
    if id.is_empty() {
        return None;
    }
    let desc = (!desc.is_empty()).then(|| desc.to_string());
    Some((id.to_string(), desc))
}

/// Serialize a record as FASTA text, sequence wrapped at 60 characters
pub fn format_fasta(record: &fasta::Record) -> String {
    let seq = record.seq();
    let mut out = String::with_capacity(record.id().len() + seq.len() + seq.len() / FASTA_LINE_WIDTH + 8);
    out.push('>');
    out.push_str(record.id());
    if let Some(desc) = record.desc() {
        out.push(' ');
        out.push_str(desc);
    }
    out.push('\n');
    // Decode once and wrap on characters so a multi-byte symbol never
    // straddles a line break
    let text = String::from_utf8_lossy(seq);
    let mut column = 0;
    for c in text.chars() {
        out.push(c);
        column += 1;
        if column == FASTA_LINE_WIDTH {
            out.push('\n');
            column = 0;
        }
    }
    if column > 0 {
        out.push('\n');
    }
    out
}

/// Decode a single FASTA record from text, as handed to a mapper
pub fn parse_fasta_record(text: &str) -> io::Result<fasta::Record> {
    let whole = InputSplit::new("<value>", 0, text.len() as u64);
    let mut reader = FastaSplitReader::new(Box::new(io::Cursor::new(text.as_bytes().to_vec())), &whole);
    reader.read_record()?.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "value holds no FASTA record")
    })
}

#[cfg(test)]
#[path = "fasta_reader_test.rs"]
mod fasta_reader_test;
