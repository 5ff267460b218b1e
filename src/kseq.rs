// src/kseq.rs
//
// Buffered byte stream that knows its absolute position in the corpus.
// The split reader needs positions to decide record ownership, which a
// plain BufRead does not report.

use std::io::{self, Read};

pub const KSEQ_BUF_SIZE: usize = 16384;

#[path = "kseq_test.rs"]
mod kseq_test;

pub struct KStream {
    reader: Box<dyn Read>,
    buf: Vec<u8>,
    begin: usize,
    end: usize,
    is_eof: bool,
    pos: u64, // absolute offset of buf[begin]
}

impl KStream {
    /// `start` is the corpus offset the reader is positioned at
    pub fn new(reader: Box<dyn Read>, start: u64) -> Self {
        KStream {
            reader,
            buf: vec![0; KSEQ_BUF_SIZE],
            begin: 0,
            end: 0,
            is_eof: false,
            pos: start,
        }
    }

    /// Absolute offset of the next byte to be consumed
    pub fn position(&self) -> u64 {
        self.pos
    }

    fn fill_buf(&mut self) -> io::Result<usize> {
        if self.is_eof {
            return Ok(0);
        }
        self.begin = 0;
        self.end = loop {
            match self.reader.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if self.end == 0 {
            self.is_eof = true;
        }
        Ok(self.end)
    }

    /// Read bytes up to `delimiter`, which is consumed but not stored.
    /// Returns the delimiter if found, `None` if EOF came first.
    pub fn getuntil(
        &mut self,
        delimiter: u8,
        out: &mut Vec<u8>,
        append: bool,
    ) -> io::Result<Option<u8>> {
        if !append {
            out.clear();
        }

        loop {
            if self.begin >= self.end && self.fill_buf()? == 0 {
                return Ok(None); // EOF
            }

            let window = &self.buf[self.begin..self.end];
            match window.iter().position(|&b| b == delimiter) {
                Some(i) => {
                    out.extend_from_slice(&window[..i]);
                    self.begin += i + 1;
                    self.pos += (i + 1) as u64;
                    return Ok(Some(delimiter));
                }
                None => {
                    out.extend_from_slice(window);
                    self.pos += window.len() as u64;
                    self.begin = self.end;
                }
            }
        }
    }

    /// Discard everything through the next newline.
    /// Returns false if the stream ended first.
    pub fn skip_line(&mut self) -> io::Result<bool> {
        loop {
            if self.begin >= self.end && self.fill_buf()? == 0 {
                return Ok(false);
            }
            let window = &self.buf[self.begin..self.end];
            match window.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    self.begin += i + 1;
                    self.pos += (i + 1) as u64;
                    return Ok(true);
                }
                None => {
                    self.pos += window.len() as u64;
                    self.begin = self.end;
                }
            }
        }
    }

    /// Read one line into `line` without its terminator (`\n` or `\r\n`).
    /// Returns the absolute offset the line started at, or `None` when the
    /// stream is exhausted.
    pub fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<Option<u64>> {
        let start = self.pos;
        let delimiter = self.getuntil(b'\n', line, false)?;
        if delimiter.is_none() && line.is_empty() {
            return Ok(None);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(start))
    }
}
