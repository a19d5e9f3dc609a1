//! FASTA file handle
//!
//! [`FastaFile`] ties a path to the FASTA codec. It keeps nothing open
//! between calls: every load reads the whole file and every dump rewrites it.

use std::borrow::Borrow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::engines::core::io::{Compression, FastReader, FastWriter, DEFAULT_COMPRESSION_LEVEL};
use crate::engines::storage::formats::{
    FastaParser, FastaWriter, Record, Row, SequenceParser, SequenceWriter,
};
use crate::engines::storage::{Chunks, Temp};
use crate::engines::{EngineError, EngineResult};
use crate::modules::registry::{FormatAdapter, FormatRegistry, PathPattern, DEFAULT_PRIORITY};
use crate::modules::schema::{DataShape, Discover};

/// Scheme marker accepted in front of FASTA paths
pub const FASTA_SCHEME: &str = "fasta://";

/// Pattern for `fasta://` prefixed paths
pub const FASTA_SCHEME_PATTERN: &str = r"fasta://.*\.fasta(\.gz)?";

/// Pattern for bare FASTA paths
pub const FASTA_PATH_PATTERN: &str = r".*\.fasta(\.gz)?";

/// Priority of the explicit-scheme pattern
pub const FASTA_SCHEME_PRIORITY: u32 = 11;

/// Handle on a FASTA file, optionally gzip-compressed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FastaFile {
    path: PathBuf,
    compression: Compression,
    compression_level: u32,
    buffer_size: Option<usize>,
}

impl FastaFile {
    pub const CANONICAL_EXTENSION: &'static str = "fasta";

    /// Create a handle; a path ending in `gz` is treated as gzip-compressed
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            compression: Compression::from_path(path.as_ref()),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            buffer_size: None,
        }
    }

    /// Set the gzip level (0-9) used when dumping to a `.gz` path
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Set the I/O buffer size
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Resolve a `fasta://` or bare `.fasta[.gz]` path into a handle
    pub fn resource(uri: &str) -> EngineResult<Self> {
        let path = FastaAdapter
            .match_path(uri)
            .ok_or_else(|| EngineError::UnresolvedResource(uri.to_string()))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn is_compressed(&self) -> bool {
        self.compression.is_compressed()
    }

    /// FASTA files are materialized in full and never held in memory by the handle
    pub fn is_out_of_core(&self) -> bool {
        true
    }

    /// Read every record in file order
    pub fn load(&self) -> EngineResult<Vec<Record>> {
        log::debug!("Loading FASTA records from {}", self.path.display());

        let text = FastReader::new(&self.path, self.buffer_size)
            .and_then(|mut reader| reader.read_to_string())
            .map_err(|e| EngineError::from_io(e, &self.path))?;

        let records = FastaParser::new().parse_string(&text);
        log::debug!("Loaded {} record(s) from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Write `records`, replacing any existing content
    pub fn dump(&self, records: &[Record]) -> EngineResult<()> {
        log::debug!("Writing {} record(s) to {}", records.len(), self.path.display());

        let text = FastaWriter::new().write_string(records);
        let mut writer = FastWriter::with_level(&self.path, self.buffer_size, self.compression_level)
            .map_err(|e| EngineError::from_io(e, &self.path))?;
        writer
            .write(text.as_bytes())
            .map_err(|e| EngineError::from_io(e, &self.path))?;
        writer
            .finish()
            .map_err(|e| EngineError::from_io(e, &self.path))
    }

    /// Store `records` in this file and hand the handle back.
    ///
    /// The file is rewritten, not extended.
    pub fn append(&self, records: &[Record]) -> EngineResult<&Self> {
        self.dump(records)?;
        Ok(self)
    }

    /// Convert untyped rows to records, then [`append`](Self::append) them.
    ///
    /// Fails with `MissingField` before touching the file if any row lacks a column.
    pub fn append_rows<I, R>(&self, rows: I) -> EngineResult<&Self>
    where
        I: IntoIterator<Item = R>,
        R: Borrow<Row>,
    {
        let records = rows
            .into_iter()
            .map(|row| Record::from_row(row.borrow()))
            .collect::<EngineResult<Vec<_>>>()?;
        self.append(&records)
    }

    /// Load the file as untyped rows
    pub fn to_rows(&self) -> EngineResult<Vec<Row>> {
        Ok(self.load()?.into_iter().map(Row::from).collect())
    }

    /// Remove the file; a missing or unreachable file is not an error
    pub fn delete(&self) -> EngineResult<()> {
        if !self.path.exists() {
            return Ok(());
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::debug!("Removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::from_io(e, &self.path)),
        }
    }

    /// Load the file and describe its structure
    pub fn discover(&self) -> EngineResult<DataShape> {
        Ok(self.load()?.discover())
    }

    /// Write `records` to a fresh hidden `.fasta` file in the working directory
    pub fn temp_from_records(records: &[Record]) -> EngineResult<Temp<FastaFile>> {
        Self::temp_from_records_in(".", records)
    }

    /// Write `records` to a fresh hidden `.fasta` file in `dir`
    pub fn temp_from_records_in<P: AsRef<Path>>(
        dir: P,
        records: &[Record],
    ) -> EngineResult<Temp<FastaFile>> {
        let suffix = format!(".{}", Self::CANONICAL_EXTENSION);
        let temp = Temp::create_in(dir.as_ref(), &suffix, |path| FastaFile::new(path))
            .map_err(|e| EngineError::from_io(e, dir.as_ref()))?;
        temp.append(records)?;
        Ok(temp)
    }
}

impl AsRef<FastaFile> for FastaFile {
    fn as_ref(&self) -> &FastaFile {
        self
    }
}

/// Turn chunks of FASTA sources into chunks of record lists.
///
/// Each pass loads one source at a time; a source that fails to load yields
/// its error in place of its records.
pub fn chunks_to_lists<S>(sources: Chunks<S>) -> Chunks<EngineResult<Vec<Record>>>
where
    S: AsRef<FastaFile> + 'static,
{
    sources.map(|source| source.as_ref().load())
}

/// Read sequences from a FASTA file
pub fn read_fasta<P: AsRef<Path>>(path: P) -> EngineResult<Vec<Record>> {
    FastaFile::new(path).load()
}

/// Write sequences to a FASTA file
pub fn write_fasta<P: AsRef<Path>>(records: &[Record], path: P) -> EngineResult<()> {
    FastaFile::new(path).dump(records)
}

/// [`FormatAdapter`] registering FASTA paths
#[derive(Debug, Clone, Copy, Default)]
pub struct FastaAdapter;

impl FormatAdapter for FastaAdapter {
    fn format_name(&self) -> &'static str {
        "FASTA"
    }

    fn path_patterns(&self) -> Vec<PathPattern> {
        vec![
            PathPattern::new(FASTA_SCHEME_PATTERN, FASTA_SCHEME_PRIORITY),
            PathPattern::new(FASTA_PATH_PATTERN, DEFAULT_PRIORITY),
        ]
    }

    fn match_path(&self, uri: &str) -> Option<PathBuf> {
        let path = uri.strip_prefix(FASTA_SCHEME).unwrap_or(uri);
        let stem = path.strip_suffix(".gz").unwrap_or(path);
        if stem.ends_with(".fasta") {
            Some(PathBuf::from(path))
        } else {
            None
        }
    }

    fn load(&self, path: &Path) -> EngineResult<Vec<Record>> {
        FastaFile::new(path).load()
    }

    fn dump(&self, records: &[Record], path: &Path) -> EngineResult<()> {
        FastaFile::new(path).dump(records)
    }

    fn delete(&self, path: &Path) -> EngineResult<()> {
        FastaFile::new(path).delete()
    }
}

/// Register the FASTA patterns in `registry`
pub fn register(registry: &mut FormatRegistry) -> EngineResult<()> {
    registry.register(std::sync::Arc::new(FastaAdapter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("chr1", "human", "ACGT"),
            Record::new("chr4", "mouse", "TCAG"),
        ]
    }

    fn row(name: &str, description: &str, sequence: &str) -> Row {
        Record::new(name, description, sequence).into()
    }

    #[test]
    fn test_dump_then_load() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("sample.fasta"));

        fasta.dump(&sample())?;
        assert_eq!(fasta.load()?, sample());
        assert!(!fasta.is_compressed());
        assert!(fasta.is_out_of_core());
        Ok(())
    }

    #[test]
    fn test_append_writes_four_lines() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("sample.fasta"));
        fasta.append(&sample())?;

        let text = fs::read_to_string(fasta.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains(">chr1 human"));
        assert!(lines[2].contains(">chr4 mouse"));
        Ok(())
    }

    #[test]
    fn test_dump_truncates() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("sample.fasta"));
        fasta.dump(&sample())?;
        fasta.dump(&sample()[..1])?;

        assert_eq!(fasta.load()?, sample()[..1].to_vec());
        Ok(())
    }

    #[test]
    fn test_read_existing_file() -> std::io::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.fasta");
        {
            let mut file = fs::File::create(&file_path)?;
            file.write_all(b">chr1 human\nACGT\nTCAG\n\n>chr2\n>chr3 long  description\nGG\n")?;
        }

        let records = read_fasta(&file_path).unwrap();
        assert_eq!(
            records,
            vec![
                Record::new("chr1", "human", "ACGTTCAG"),
                Record::new("chr2", "", ""),
                Record::new("chr3", "long description", "GG"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_gzip_write_matches_plain_text() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.fasta.gz");
        let fasta = FastaFile::new(&path).with_compression_level(9);
        assert!(fasta.is_compressed());
        fasta.dump(&sample())?;

        let raw = fs::File::open(&path).unwrap();
        let mut text = String::new();
        std::io::Read::read_to_string(&mut flate2::read::GzDecoder::new(raw), &mut text).unwrap();
        assert_eq!(text, crate::engines::storage::formats::fasta_dumps(&sample()));
        Ok(())
    }

    #[test]
    fn test_compression_transparency() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let plain = FastaFile::new(dir.path().join("a.fasta"));
        let packed = FastaFile::new(dir.path().join("a.fasta.gz"));
        plain.dump(&sample())?;
        packed.dump(&sample())?;

        assert_eq!(plain.load()?, packed.load()?);
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("absent.fasta"));
        assert!(matches!(fasta.load(), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.fasta");
        fs::write(&path, [b'>', b'x', b'\n', 0xc3, 0x28, b'\n']).unwrap();
        assert!(matches!(read_fasta(&path), Err(EngineError::Decode(_))));
    }

    #[test]
    fn test_load_corrupt_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.fasta.gz");
        fs::write(&path, b">chr1\nACGT\n").unwrap();
        assert!(matches!(read_fasta(&path), Err(EngineError::Decode(_))));
    }

    #[test]
    fn test_dump_into_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.fasta");
        assert!(write_fasta(&sample(), &path).is_err());
    }

    #[test]
    fn test_append_rows() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("rows.fasta"));
        let rows = vec![row("chr2", "human", "TTGG"), row("chr5", "mouse", "CAGG")];

        fasta.append_rows(&rows)?;
        assert_eq!(fasta.to_rows()?, rows);
        Ok(())
    }

    #[test]
    fn test_append_rows_missing_field_leaves_file_alone() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("rows.fasta"));
        fasta.dump(&sample())?;

        let mut broken = row("chr2", "human", "TTGG");
        broken.remove("sequence");
        match fasta.append_rows(vec![broken]) {
            Err(EngineError::MissingField(field)) => assert_eq!(field, "sequence"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(fasta.load()?, sample());
        Ok(())
    }

    #[test]
    fn test_delete() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("drop.fasta"));
        fasta.dump(&sample())?;
        assert!(fasta.path().exists());

        fasta.delete()?;
        assert!(!fasta.path().exists());

        // second delete is a no-op
        fasta.delete()?;
        Ok(())
    }

    #[test]
    fn test_delete_under_regular_file() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("plain");
        fs::write(&plain, b"not a directory").unwrap();

        FastaFile::new(plain.join("child.fasta")).delete()?;
        assert!(plain.is_file());
        Ok(())
    }

    #[test]
    fn test_load_empty_gzip() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.fasta.gz");
        fs::write(&path, b"").unwrap();

        assert!(read_fasta(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("folder.fasta");
        fs::create_dir(&path).unwrap();

        assert!(matches!(read_fasta(&path), Err(EngineError::Io(_))));
        assert!(matches!(write_fasta(&[], &path), Err(EngineError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.fasta");
        write_fasta(&[Record::new("chr1", "human", "ACGT")], &path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // privileged users ignore mode bits
        if fs::File::open(&path).is_ok() {
            return;
        }
        assert!(matches!(read_fasta(&path), Err(EngineError::Io(_))));
        assert!(matches!(
            write_fasta(&[], &path),
            Err(EngineError::Io(_))
        ));
    }

    #[test]
    fn test_discover_matches_in_memory() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let fasta = FastaFile::new(dir.path().join("shape.fasta"));
        fasta.dump(&sample())?;

        assert_eq!(fasta.discover()?, sample().discover());
        Ok(())
    }

    #[test]
    fn test_resource() -> EngineResult<()> {
        let bare = FastaFile::resource("data/reads.fasta.gz")?;
        let schemed = FastaFile::resource("fasta://data/reads.fasta.gz")?;

        assert_eq!(bare, schemed);
        assert_eq!(bare.path(), Path::new("data/reads.fasta.gz"));
        assert!(bare.is_compressed());
        assert!(matches!(
            FastaFile::resource("data/reads.csv"),
            Err(EngineError::UnresolvedResource(_))
        ));
        Ok(())
    }

    #[test]
    fn test_temp_from_records() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let records = vec![
            Record::new("chr1", "human", "GTAT"),
            Record::new("chr4", "mouse", "TTCA"),
        ];

        let temp = FastaFile::temp_from_records_in(dir.path(), &records)?;
        let path = temp.path().to_path_buf();
        assert_eq!(temp.load()?, records);
        assert!(path.to_string_lossy().ends_with(".fasta"));

        drop(temp);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_chunks_to_lists() -> EngineResult<()> {
        let dir = tempdir().unwrap();
        let first = FastaFile::new(dir.path().join("one.fasta"));
        let second = FastaFile::new(dir.path().join("two.fasta.gz"));
        first.dump(&sample()[..1])?;
        second.dump(&sample()[1..])?;

        let lists = chunks_to_lists(Chunks::from_vec(vec![first, second.clone()]));
        let loaded = lists.iter().collect::<EngineResult<Vec<_>>>()?;
        assert_eq!(loaded, vec![sample()[..1].to_vec(), sample()[1..].to_vec()]);

        // restartable: a second pass sees the current file contents
        second.dump(&sample())?;
        let reloaded = lists.iter().collect::<EngineResult<Vec<_>>>()?;
        assert_eq!(reloaded[1], sample());
        Ok(())
    }

    #[test]
    fn test_adapter_match_path() {
        let adapter = FastaAdapter;
        assert_eq!(adapter.match_path("x.fasta"), Some(PathBuf::from("x.fasta")));
        assert_eq!(adapter.match_path("fasta://x.fasta.gz"), Some(PathBuf::from("x.fasta.gz")));
        assert_eq!(adapter.match_path("x.fastq"), None);
        assert_eq!(adapter.match_path("x.gz"), None);
    }
}
