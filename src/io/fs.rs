// Filesystem seam
//
// The cluster filesystem client is external. Tasks reach files through the
// `Filesystem` trait; the bundled `LocalFs` serves local paths. Handles are
// released by Drop, so every exit path of a task closes them.

use crate::error::{Error, Result};
use crate::split::Location;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

/// Byte stream with read-at-offset support
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Connection to a filesystem that can open corpus files for reading
pub trait Filesystem: Send {
    fn open_file(&self, path: &str) -> io::Result<Box<dyn ReadSeek>>;

    fn file_len(&self, path: &str) -> io::Result<u64>;
}

/// Local disk
#[derive(Debug, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn open_file(&self, path: &str) -> io::Result<Box<dyn ReadSeek>> {
        const BUFFER_SIZE: usize = 1024 * 1024;
        let file = File::open(Path::new(path))?;
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }

    fn file_len(&self, path: &str) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}

impl Drop for LocalFs {
    fn drop(&mut self) {
        log::trace!("Released local filesystem handle");
    }
}

/// Open a filesystem connection for `location`'s host and port
pub fn connect(location: &Location) -> Result<Box<dyn Filesystem>> {
    if location.is_local() {
        return Ok(Box::new(LocalFs));
    }
    Err(Error::UnsupportedFilesystem(format!(
        "{}://{}:{}",
        location.scheme, location.host, location.port
    )))
}
