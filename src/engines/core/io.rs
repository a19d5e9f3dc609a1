//! Whole-file I/O with transparent gzip handling
//!
//! Files are read and written in a single pass: the reader pulls the entire
//! file into memory (inflating it when the path ends in `gz`) and the writer
//! truncates its target and streams the full payload through an optional
//! gzip encoder.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

// Default buffer sizes
const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * 1024; // 1MB
const DEFAULT_WRITE_BUFFER_SIZE: usize = 1024 * 1024; // 1MB

/// Default gzip level used when writing `.gz` targets
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

// Tracking I/O statistics
static TOTAL_BYTES_READ: AtomicUsize = AtomicUsize::new(0);
static TOTAL_BYTES_WRITTEN: AtomicUsize = AtomicUsize::new(0);

/// Initialize the I/O subsystem
pub fn initialize() {
    // Reset I/O counters
    TOTAL_BYTES_READ.store(0, Ordering::SeqCst);
    TOTAL_BYTES_WRITTEN.store(0, Ordering::SeqCst);
}

/// On-disk compression of a file, derived from its final extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// `Gzip` when the text after the last `.` of the path is exactly `gz`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_string_lossy();
        match path.rsplit('.').next() {
            Some("gz") => Compression::Gzip,
            _ => Compression::None,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Compression::Gzip)
    }
}

/// Buffered whole-file reader
pub struct FastReader {
    reader: BufReader<File>,
    compression: Compression,
    buffer_size: usize,
}

impl FastReader {
    /// Open `path` for reading; compression is inferred from the path
    pub fn new<P: AsRef<Path>>(path: P, buffer_size: Option<usize>) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let buf_size = buffer_size.unwrap_or(DEFAULT_READ_BUFFER_SIZE);
        let reader = BufReader::with_capacity(buf_size, file);

        Ok(Self {
            reader,
            compression: Compression::from_path(path.as_ref()),
            buffer_size: buf_size,
        })
    }

    /// Read the entire file, inflating gzip content.
    ///
    /// A zero-byte gzip file reads as empty; a corrupt gzip stream is
    /// reported as `ErrorKind::InvalidData`.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut raw = Vec::new();
        let bytes_read = self.reader.read_to_end(&mut raw)?;
        TOTAL_BYTES_READ.fetch_add(bytes_read, Ordering::SeqCst);

        match self.compression {
            Compression::None => Ok(raw),
            Compression::Gzip if raw.is_empty() => Ok(raw),
            Compression::Gzip => {
                let mut inflated = Vec::with_capacity(raw.len() * 4);
                MultiGzDecoder::new(raw.as_slice())
                    .read_to_end(&mut inflated)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(inflated)
            }
        }
    }

    /// Read the entire file as UTF-8 text
    pub fn read_to_string(&mut self) -> io::Result<String> {
        let bytes = self.read_all()?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Get the buffer size being used
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

/// Buffered whole-file writer with truncate semantics
pub struct FastWriter {
    sink: Sink,
}

impl FastWriter {
    /// Create (or truncate) `path`; `.gz` targets are gzip-encoded at the default level
    pub fn new<P: AsRef<Path>>(path: P, buffer_size: Option<usize>) -> io::Result<Self> {
        Self::with_level(path, buffer_size, DEFAULT_COMPRESSION_LEVEL)
    }

    /// Create (or truncate) `path` using the given gzip level for `.gz` targets
    pub fn with_level<P: AsRef<Path>>(
        path: P,
        buffer_size: Option<usize>,
        level: u32,
    ) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;

        let buf_size = buffer_size.unwrap_or(DEFAULT_WRITE_BUFFER_SIZE);
        let writer = BufWriter::with_capacity(buf_size, file);

        let sink = match Compression::from_path(path.as_ref()) {
            Compression::None => Sink::Plain(writer),
            Compression::Gzip => {
                Sink::Gzip(GzEncoder::new(writer, flate2::Compression::new(level.min(9))))
            }
        };

        Ok(Self { sink })
    }

    /// Write all of `data`
    pub fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Plain(w) => w.write_all(data)?,
            Sink::Gzip(w) => w.write_all(data)?,
        }

        TOTAL_BYTES_WRITTEN.fetch_add(data.len(), Ordering::SeqCst);
        Ok(data.len())
    }

    /// Flush buffered data and finalize the gzip trailer
    pub fn finish(self) -> io::Result<()> {
        let mut inner = match self.sink {
            Sink::Plain(w) => w,
            Sink::Gzip(w) => w.finish()?,
        };
        inner.flush()
    }
}

/// Get the current I/O statistics as (bytes read, bytes written)
pub fn get_io_stats() -> (usize, usize) {
    (
        TOTAL_BYTES_READ.load(Ordering::SeqCst),
        TOTAL_BYTES_WRITTEN.load(Ordering::SeqCst),
    )
}
