// src/split.rs
//
// Input splits and the boundary policy that decides which task decodes
// which record.
//
// A record belongs to the split whose byte range contains the '>' of its
// marker line. Consequences for a reader:
// - offset 0 owns the first record of the corpus, nothing else is needed
//   to coordinate this
// - any other split backs up one byte and discards through the next
//   newline, which lands on the first line starting at or after its offset
// - every split keeps reading payload past its end until the record it
//   started is complete, and stops at the first marker at or after the end

use crate::error::{Error, Result};

#[path = "split_test.rs"]
mod split_test;

/// Contiguous byte range of the corpus assigned to one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSplit {
    pub path: String,
    pub offset: u64,
    pub length: u64,
}

/// Where a split's file lives, decoded from its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl InputSplit {
    pub fn new(path: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            length,
        }
    }

    /// Exclusive end offset; saturates for "read to end" splits
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// The task holding offset 0 emits the first record of the corpus
    pub fn owns_first_record(&self) -> bool {
        self.offset == 0
    }

    /// Byte position at which the reader must start scanning
    pub fn scan_start(&self) -> u64 {
        self.offset.saturating_sub(1)
    }

    /// True if a marker found at `pos` belongs to this split
    pub fn owns_marker_at(&self, pos: u64) -> bool {
        pos >= self.offset && pos < self.end()
    }

    pub fn location(&self) -> Location {
        Location::parse(&self.path)
    }

    /// Decode a Hadoop `FileSplit`: UTF path (u16 BE length prefix),
    /// then offset and length as big-endian i64.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(Error::InvalidSplit(format!(
                "{} bytes is too short for a path length",
                bytes.len()
            )));
        }
        let path_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        let path_end = 2 + path_len;
        if bytes.len() < path_end + 16 {
            return Err(Error::InvalidSplit(format!(
                "expected {} bytes, got {}",
                path_end + 16,
                bytes.len()
            )));
        }
        let path = std::str::from_utf8(&bytes[2..path_end])
            .map_err(|e| Error::InvalidSplit(format!("path is not UTF-8: {}", e)))?;

        let read_i64 = |at: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[at..at + 8]);
            i64::from_be_bytes(raw)
        };
        let offset = read_i64(path_end);
        let length = read_i64(path_end + 8);
        if offset < 0 || length < 0 {
            return Err(Error::InvalidSplit(format!(
                "negative range offset={} length={}",
                offset, length
            )));
        }

        Ok(Self::new(path, offset as u64, length as u64))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let path = self.path.as_bytes();
        let path_len = u16::try_from(path.len())
            .map_err(|_| Error::InvalidSplit(format!("path too long: {} bytes", path.len())))?;
        let offset = i64::try_from(self.offset)
            .map_err(|_| Error::InvalidSplit(format!("offset out of range: {}", self.offset)))?;
        let length = i64::try_from(self.length)
            .map_err(|_| Error::InvalidSplit(format!("length out of range: {}", self.length)))?;

        let mut out = Vec::with_capacity(2 + path.len() + 16);
        out.extend_from_slice(&path_len.to_be_bytes());
        out.extend_from_slice(path);
        out.extend_from_slice(&offset.to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
        Ok(out)
    }
}

impl Location {
    /// Split `hdfs://host:port/path`, `file:///path` or a bare path.
    /// Bare paths resolve to the `default` filesystem.
    pub fn parse(raw: &str) -> Self {
        let Some((scheme, rest)) = raw.split_once("://") else {
            return Self {
                scheme: String::new(),
                host: "default".to_string(),
                port: 0,
                path: raw.to_string(),
            };
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => match p.parse::<u16>() {
                Ok(port) => (h, port),
                Err(_) => (authority, 0),
            },
            None => (authority, 0),
        };

        Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
        }
    }

    /// Whether the bundled local filesystem can serve this location
    pub fn is_local(&self) -> bool {
        match self.scheme.as_str() {
            "file" => true,
            "" => self.host == "default" && self.port == 0,
            _ => false,
        }
    }
}

/// Cut a file of `file_len` bytes into consecutive splits of at most
/// `split_size` bytes. An empty file still gets one (empty) split.
pub fn plan_splits(path: &str, file_len: u64, split_size: u64) -> Vec<InputSplit> {
    let split_size = split_size.max(1);
    if file_len == 0 {
        return vec![InputSplit::new(path, 0, 0)];
    }

    let mut splits = Vec::with_capacity(file_len.div_ceil(split_size) as usize);
    let mut offset = 0;
    while offset < file_len {
        let length = split_size.min(file_len - offset);
        splits.push(InputSplit::new(path, offset, length));
        offset += length;
    }
    splits
}
