// ABOUTME: Line-oriented dump file streams with transparent gzip support
// ABOUTME: Readers can be reset to the start; writers finalize on finish()

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const BUFFER_CAPACITY: usize = 256 * 1024;

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Buffered reader over a dump file, decompressing when the path ends in `.gz`.
///
/// Gzip streams are not seekable, so `reset` reopens the file; both passes of
/// the merge read the input from its start.
pub struct DumpReader {
    path: PathBuf,
    inner: BufReader<Box<dyn Read>>,
}

impl DumpReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input dump {}", path.display()))?;
        let raw: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self {
            path: path.to_path_buf(),
            inner: BufReader::with_capacity(BUFFER_CAPACITY, raw),
        })
    }

    /// Reopen the input from its beginning.
    pub fn reset(&mut self) -> Result<()> {
        *self = Self::open(&self.path)?;
        Ok(())
    }
}

impl Read for DumpReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for DumpReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

enum SinkInner {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

/// Buffered writer over a dump file, compressing when the path ends in `.gz`.
pub struct DumpWriter {
    path: PathBuf,
    inner: SinkInner,
}

impl DumpWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output dump {}", path.display()))?;
        let buffered = BufWriter::with_capacity(BUFFER_CAPACITY, file);
        let inner = if is_gzip(path) {
            SinkInner::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            SinkInner::Plain(buffered)
        };
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Flush buffers and write the gzip trailer. Dropping the writer also
    /// closes it, but only `finish` surfaces late I/O errors.
    pub fn finish(self) -> Result<()> {
        let path = self.path;
        match self.inner {
            SinkInner::Plain(mut w) => w.flush(),
            SinkInner::Gzip(w) => w.finish().and_then(|mut b| b.flush()),
        }
        .with_context(|| format!("Failed to finalize output dump {}", path.display()))
    }
}

impl Write for DumpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            SinkInner::Plain(w) => w.write(buf),
            SinkInner::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            SinkInner::Plain(w) => w.flush(),
            SinkInner::Gzip(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    #[test]
    fn test_plain_round_trip_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        std::fs::write(&path, "first\nsecond\n").unwrap();

        let mut reader = DumpReader::open(&path).unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "first\n");

        reader.reset().unwrap();
        line.clear();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "first\n");
    }

    #[test]
    fn test_gzip_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sql.gz");

        let mut writer = DumpWriter::create(&path).unwrap();
        writer.write_all(b"hello\nworld\n").unwrap();
        writer.finish().unwrap();

        let mut reader = DumpReader::open(&path).unwrap();
        let mut contents = String::new();
        reader.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello\nworld\n");

        reader.reset().unwrap();
        let mut again = String::new();
        reader.read_to_string(&mut again).unwrap();
        assert_eq!(again, contents);
    }
}
