//! Scoped acquisition of report sources
//!
//! Every report is opened through [`open`]. The returned [`Source`] owns the
//! only handle on the file; dropping it closes the file.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;

/// An open report file
pub struct Source {
    path: PathBuf,
    reader: BufReader<File>,
}

/// Open a report for reading
pub fn open(path: impl AsRef<Path>) -> Result<Source> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Error opening report {}: {}", path.display(), e),
        )
    })?;
    debug!("Opened {}", path.display());
    Ok(Source {
        path: path.to_path_buf(),
        reader: BufReader::new(file),
    })
}

/// Read a whole report into memory, releasing the handle before returning
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let mut source = open(path)?;
    let mut content = String::new();
    source.read_to_string(&mut content)?;
    Ok(content)
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for Source {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        debug!("Closed {}", self.path.display());
    }
}
