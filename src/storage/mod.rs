//! # Persistent Log Module
//!
//! Append-only binary staging file between the ring buffer and the
//! network: "unsent samples since the last successful upload".
//!
//! The log is a flat sequence of 6-byte records with no header and no
//! checksum. It is truncated to empty at process start (the node does not
//! resume partially-sent logs across restarts) and again only after a fully
//! successful upload. Truncation is all-or-nothing: a crash mid-upload
//! means already-sent records are re-sent next cycle, which is the accepted
//! at-least-once delivery semantic.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::codec::{self, Calibration, DecodedSample, RECORD_SIZE};
use crate::error::Result;
use crate::sample::Sample;

/// Append-only binary log of unsent samples
#[derive(Debug)]
pub struct PersistentLog {
    /// Path of the backing file
    path: PathBuf,
}

impl PersistentLog {
    /// Create the log, truncating any previous content
    ///
    /// Called once at startup. A log left over from a previous run is
    /// discarded rather than resumed.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the backing file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or truncated.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let log = Self {
            path: path.as_ref().to_path_buf(),
        };
        log.clear()?;
        Ok(log)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log to zero length
    ///
    /// Scoped open-for-write; the handle is closed before returning.
    pub fn clear(&self) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        Ok(())
    }

    /// Append samples to the log as encoded records
    ///
    /// Opens in append mode, writes every record, closes. Called by the
    /// upload cycle whenever the ring drain is non-empty.
    ///
    /// # Arguments
    ///
    /// * `samples` - Drained samples, in insertion order
    pub fn append(&self, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut encoded = Vec::with_capacity(samples.len() * RECORD_SIZE);
        for sample in samples {
            encoded.extend_from_slice(&codec::encode_record(sample));
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        file.write_all(&encoded)?;

        debug!(
            "Appended {} records ({} bytes) to {}",
            samples.len(),
            encoded.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Current size of the log in bytes
    pub fn len_bytes(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// True if the log holds no records
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len_bytes()? < RECORD_SIZE as u64)
    }

    /// Read the log as a lazy sequence of decoded chunks
    ///
    /// Each chunk holds up to `chunk_records` decoded samples. The file is
    /// read sequentially, never loaded whole, so peak memory during an
    /// upload is bounded by the chunk size. A trailing partial record
    /// (fewer than 6 bytes) is discarded silently.
    ///
    /// # Arguments
    ///
    /// * `chunk_records` - Maximum records per chunk (must be non-zero)
    /// * `calibration` - Constants for raw-to-physical conversion
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened; per-chunk read errors
    /// surface through the iterator items.
    pub fn read_chunks(
        &self,
        chunk_records: usize,
        calibration: Calibration,
    ) -> Result<ChunkReader> {
        let file = File::open(&self.path)?;
        Ok(ChunkReader {
            reader: BufReader::new(file),
            chunk_records,
            calibration,
            done: false,
        })
    }
}

/// Lazy, finite, non-restartable iterator over decoded log chunks
pub struct ChunkReader {
    reader: BufReader<File>,
    chunk_records: usize,
    calibration: Calibration,
    done: bool,
}

impl ChunkReader {
    /// Fill `buf` as far as the file allows; returns bytes read
    fn read_up_to(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Vec<DecodedSample>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = vec![0u8; self.chunk_records * RECORD_SIZE];
        let filled = match self.read_up_to(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };

        if filled < buf.len() {
            // Reached end of file; anything after the last whole record is
            // a torn tail from an interrupted append and is dropped.
            self.done = true;
            let tail = filled % RECORD_SIZE;
            if tail != 0 {
                debug!("Discarding {} trailing bytes of partial record", tail);
            }
        }

        let whole_records = filled / RECORD_SIZE;
        if whole_records == 0 {
            return None;
        }

        let mut chunk = Vec::with_capacity(whole_records);
        for i in 0..whole_records {
            let start = i * RECORD_SIZE;
            let mut record = [0u8; RECORD_SIZE];
            record.copy_from_slice(&buf[start..start + RECORD_SIZE]);
            chunk.push(codec::decode_record(&record, &self.calibration));
        }

        Some(Ok(chunk))
    }
}
