//! BAM file I/O for raw records.
//!
//! Headers are parsed and written with noodles; records move as raw bytes
//! through [`RawBamReader`] and [`RawBamWriter`] so the core never decodes
//! a record it only needs to forward.
//!
//! # Threading Model
//!
//! BAM files use BGZF compression, which can be parallelized for both reading and writing:
//!
//! - **Single-threaded**: Use `threads=1` (lower overhead, good for small files)
//! - **Multi-threaded**: Use `threads>1` (higher throughput for large files)

use anyhow::{Context, Result};
use fraguniq_raw_bam::{MIN_BAM_HEADER_LEN, RawRecord};
use noodles::bgzf::io::{
    MultithreadedReader, MultithreadedWriter, Reader as BgzfReader, Writer as BgzfWriter,
};
use noodles::sam::Header;
use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::num::NonZero;
use std::path::Path;

use crate::errors::FraguniqError;

// ============================================================================
// Record source / sink
// ============================================================================

/// Supplies records one at a time, in file order.
pub trait RecordSource {
    /// Next record, or `None` at end of input.
    ///
    /// # Errors
    /// Returns [`FraguniqError::Source`] on an I/O failure and
    /// [`FraguniqError::Record`] for a malformed record.
    fn read(&mut self) -> crate::errors::Result<Option<RawRecord>>;

    /// Lengths of the reference sequences in header order.
    fn target_lengths(&self) -> &[usize];

    /// Number of reference sequences in the header.
    fn target_count(&self) -> usize {
        self.target_lengths().len()
    }
}

/// Accepts records for output.
pub trait RecordSink {
    /// # Errors
    /// Returns an error if the record cannot be written.
    fn write(&mut self, record: &RawRecord) -> io::Result<()>;
}

impl RecordSink for Vec<RawRecord> {
    fn write(&mut self, record: &RawRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

// ============================================================================
// BGZF reader / writer wrappers
// ============================================================================

/// Enum wrapping single-threaded and multi-threaded BGZF readers.
pub enum BgzfReaderEnum {
    /// Single-threaded BGZF reader (lower overhead for small files)
    SingleThreaded(BgzfReader<File>),
    /// Multi-threaded BGZF reader (noodles built-in threading)
    MultiThreaded(MultithreadedReader<File>),
}

impl Read for BgzfReaderEnum {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.read(buf),
            BgzfReaderEnum::MultiThreaded(r) => r.read(buf),
        }
    }
}

impl BufRead for BgzfReaderEnum {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.fill_buf(),
            BgzfReaderEnum::MultiThreaded(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.consume(amt),
            BgzfReaderEnum::MultiThreaded(r) => r.consume(amt),
        }
    }
}

/// Enum wrapping single-threaded and multi-threaded BGZF writers
pub enum BgzfWriterEnum {
    /// Single-threaded BGZF writer
    SingleThreaded(BgzfWriter<File>),
    /// Multi-threaded BGZF writer
    MultiThreaded(MultithreadedWriter<File>),
}

impl Write for BgzfWriterEnum {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BgzfWriterEnum::SingleThreaded(w) => w.write(buf),
            BgzfWriterEnum::MultiThreaded(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BgzfWriterEnum::SingleThreaded(w) => w.flush(),
            BgzfWriterEnum::MultiThreaded(w) => w.flush(),
        }
    }
}

impl BgzfWriterEnum {
    /// Finish writing and close the writer properly.
    ///
    /// # Errors
    /// Returns an error if flushing or finalizing the writer fails.
    pub fn finish(self) -> io::Result<()> {
        match self {
            BgzfWriterEnum::SingleThreaded(mut w) => {
                w.flush()?;
                // Single-threaded writer writes EOF on drop
                Ok(())
            }
            BgzfWriterEnum::MultiThreaded(mut w) => {
                w.finish()?;
                Ok(())
            }
        }
    }
}

// ============================================================================
// Raw reader
// ============================================================================

/// Reads a single raw record (the `block_size` word followed by the record).
///
/// Returns the number of bytes read (excluding the 4-byte prefix), or 0 at a
/// clean EOF before the prefix.
///
/// # Errors
///
/// Returns an error if the reader fails, EOF is reached in the middle of a
/// record, or `block_size` is smaller than the fixed record header.
pub fn read_raw_record<R: Read>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let Some(block_size) = read_block_size(reader)? else {
        return Ok(0);
    };
    if block_size < MIN_BAM_HEADER_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("block_size {block_size} is smaller than the {MIN_BAM_HEADER_LEN}-byte record header"),
        ));
    }
    buf.clear();
    buf.resize(block_size, 0);
    reader.read_exact(buf)?;
    Ok(block_size)
}

/// Reads the 4-byte block size prefix, or `None` at EOF.
fn read_block_size<R: Read>(reader: &mut R) -> io::Result<Option<usize>> {
    let mut buf = [0u8; 4];
    loop {
        match reader.read(&mut buf[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    reader.read_exact(&mut buf[1..])?;
    usize::try_from(u32::from_le_bytes(buf))
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// A reader for raw BAM records positioned after the header.
pub struct RawBamReader<R> {
    inner: R,
    target_lengths: Vec<usize>,
}

impl<R: Read> RawBamReader<R> {
    /// Wrap a reader whose header has already been consumed.
    pub fn new(inner: R, target_lengths: Vec<usize>) -> Self {
        Self { inner, target_lengths }
    }

    /// Consumes the reader and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> RecordSource for RawBamReader<R> {
    fn read(&mut self) -> crate::errors::Result<Option<RawRecord>> {
        let mut buf = Vec::new();
        if read_raw_record(&mut self.inner, &mut buf).map_err(FraguniqError::Source)? == 0 {
            return Ok(None);
        }
        Ok(Some(RawRecord::from_bytes(buf)?))
    }

    fn target_lengths(&self) -> &[usize] {
        &self.target_lengths
    }
}

/// Type alias for a raw BAM reader that supports both single and multi-threaded BGZF.
pub type RawBamReaderAuto = RawBamReader<BgzfReaderEnum>;

/// Reference sequence lengths in header order.
#[must_use]
pub fn target_lengths(header: &Header) -> Vec<usize> {
    header.reference_sequences().values().map(|rs| rs.length().get()).collect()
}

/// Open a BAM file, parse its header with noodles and return a raw record reader.
///
/// # Errors
/// Returns an error if the file cannot be opened or the header cannot be read.
pub fn create_raw_bam_reader<P: AsRef<Path>>(
    path: P,
    threads: usize,
) -> Result<(RawBamReaderAuto, Header)> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input BAM: {}", path_ref.display()))?;

    let bgzf_reader = match NonZero::new(threads).filter(|n| n.get() > 1) {
        Some(worker_count) => {
            BgzfReaderEnum::MultiThreaded(MultithreadedReader::with_worker_count(worker_count, file))
        }
        None => BgzfReaderEnum::SingleThreaded(BgzfReader::new(file)),
    };

    // Use noodles to read the header, then take back the BGZF reader
    let mut noodles_reader = noodles::bam::io::Reader::from(bgzf_reader);
    let header = noodles_reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path_ref.display()))?;
    let lengths = target_lengths(&header);

    Ok((RawBamReader::new(noodles_reader.into_inner(), lengths), header))
}

// ============================================================================
// Raw writer
// ============================================================================

/// Raw BAM writer for writing raw record bytes directly.
///
/// Writes records as:
/// - 4-byte `block_size` (little-endian)
/// - raw BAM record bytes
pub struct RawBamWriter<W: Write = BgzfWriterEnum> {
    inner: W,
}

impl<W: Write> RawBamWriter<W> {
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write the BAM magic, the SAM header text and the reference dictionary.
    ///
    /// # Errors
    /// Returns an error if writing to the underlying writer fails.
    pub fn write_header(&mut self, header: &Header) -> io::Result<()> {
        self.inner.write_all(b"BAM\x01")?;

        // Header text (SAM header serialized using noodles)
        let mut sam_writer = noodles::sam::io::Writer::new(Vec::new());
        sam_writer.write_header(header)?;
        let header_bytes = sam_writer.into_inner();
        self.inner.write_all(&to_i32(header_bytes.len())?.to_le_bytes())?;
        self.inner.write_all(&header_bytes)?;

        self.inner.write_all(&to_i32(header.reference_sequences().len())?.to_le_bytes())?;
        for (name, map) in header.reference_sequences() {
            // l_name includes the NUL terminator
            self.inner.write_all(&to_i32(name.len() + 1)?.to_le_bytes())?;
            self.inner.write_all(name)?;
            self.inner.write_all(&[0u8])?;
            self.inner.write_all(&to_i32(map.length().get())?.to_le_bytes())?;
        }
        Ok(())
    }

    /// Write raw record bytes (without the `block_size` prefix).
    ///
    /// # Errors
    /// Returns an error if writing to the underlying writer fails.
    #[inline]
    pub fn write_raw_record(&mut self, record_bytes: &[u8]) -> io::Result<()> {
        let block_size = u32::try_from(record_bytes.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.inner.write_all(&block_size.to_le_bytes())?;
        self.inner.write_all(record_bytes)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl RawBamWriter<BgzfWriterEnum> {
    /// Finish writing and close the writer.
    ///
    /// # Errors
    /// Returns an error if finalizing the writer fails.
    pub fn finish(self) -> io::Result<()> {
        self.inner.finish()
    }
}

impl<W: Write> RecordSink for RawBamWriter<W> {
    fn write(&mut self, record: &RawRecord) -> io::Result<()> {
        self.write_raw_record(record.as_bytes())
    }
}

fn to_i32(n: usize) -> io::Result<i32> {
    i32::try_from(n).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// Create a raw BAM writer and write the header.
///
/// # Errors
/// Returns an error if the file cannot be created or the header cannot be written.
pub fn create_raw_bam_writer<P: AsRef<Path>>(
    path: P,
    header: &Header,
    threads: usize,
) -> Result<RawBamWriter> {
    let path_ref = path.as_ref();
    let output_file = File::create(path_ref)
        .with_context(|| format!("Failed to create output BAM: {}", path_ref.display()))?;

    let bgzf_writer = match NonZero::new(threads).filter(|n| n.get() > 1) {
        Some(worker_count) => BgzfWriterEnum::MultiThreaded(MultithreadedWriter::with_worker_count(
            worker_count,
            output_file,
        )),
        None => BgzfWriterEnum::SingleThreaded(BgzfWriter::new(output_file)),
    };

    let mut writer = RawBamWriter::new(bgzf_writer);
    writer
        .write_header(header)
        .with_context(|| format!("Failed to write header to: {}", path_ref.display()))?;
    Ok(writer)
}
