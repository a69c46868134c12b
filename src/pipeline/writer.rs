// src/pipeline/writer.rs

//! C8 Chunked Writer — a single serial sink shared by every worker
//! thread. Rolls to a new chunk file once the open chunk reaches the
//! configured record threshold, and keeps an ordered manifest of the
//! chunks it produced.

use crate::pipeline::emitter::RowSink;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One entry of the chunk manifest (§3): `{index, filename, record_count,
/// byte_size}`. `record_count` and `byte_size` are only final for chunks
/// that have been rolled past or for the last chunk after `close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub index: u32,
    pub filename: PathBuf,
    pub record_count: u64,
    pub byte_size: u64,
}

struct WriterState {
    writer: BufWriter<File>,
    chunk_index: u32,
    rows_in_chunk: u64,
    bytes_in_chunk: u64,
    total_rows: u64,
    manifest: Vec<ChunkRecord>,
}

impl WriterState {
    /// Write the in-progress counters for the currently open chunk back
    /// into its manifest entry. Called before rolling and at close, so
    /// the manifest returned to callers always reflects what is actually
    /// on disk.
    fn sync_current_chunk_record(&mut self) {
        if let Some(entry) = self.manifest.last_mut() {
            entry.record_count = self.rows_in_chunk;
            entry.byte_size = self.bytes_in_chunk;
        }
    }
}

/// Writes RDF N-Quads to a sequence of chunk files under `directory`,
/// named `{base_name}_chunk_<n>.rdf` per spec §4.8. Every `write_row` call
/// places its lines on disk as one contiguous block; callers from
/// multiple threads never see interleaved rows.
pub struct ChunkedWriter {
    directory: PathBuf,
    base_name: String,
    chunk_record_threshold: usize,
    state: Mutex<WriterState>,
}

fn chunk_path(directory: &Path, base_name: &str, chunk_index: u32) -> PathBuf {
    directory.join(format!("{base_name}_chunk_{chunk_index}.rdf"))
}

fn open_chunk(directory: &Path, base_name: &str, chunk_index: u32) -> crate::Result<BufWriter<File>> {
    let path = chunk_path(directory, base_name, chunk_index);
    let file = File::create(&path).map_err(|source| crate::Error::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(BufWriter::new(file))
}

impl ChunkedWriter {
    pub fn create(
        directory: impl Into<PathBuf>,
        base_name: impl Into<String>,
        chunk_record_threshold: usize,
    ) -> crate::Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| crate::Error::Write {
            path: directory.display().to_string(),
            source,
        })?;
        let base_name = base_name.into();
        let writer = open_chunk(&directory, &base_name, 0)?;
        let first_chunk = chunk_path(&directory, &base_name, 0);
        Ok(Self {
            directory,
            base_name,
            chunk_record_threshold: chunk_record_threshold.max(1),
            state: Mutex::new(WriterState {
                writer,
                chunk_index: 0,
                rows_in_chunk: 0,
                bytes_in_chunk: 0,
                total_rows: 0,
                manifest: vec![ChunkRecord {
                    index: 0,
                    filename: first_chunk,
                    record_count: 0,
                    byte_size: 0,
                }],
            }),
        })
    }

    /// Flush the open chunk and return the ordered chunk manifest and the
    /// total number of rows written across every chunk.
    pub fn close(&self) -> crate::Result<(Vec<ChunkRecord>, u64)> {
        let mut state = self.state.lock();
        state.writer.flush().map_err(|source| crate::Error::Write {
            path: self.directory.display().to_string(),
            source,
        })?;
        state.sync_current_chunk_record();
        Ok((state.manifest.clone(), state.total_rows))
    }

    fn roll_chunk(&self, state: &mut WriterState) -> crate::Result<()> {
        state.writer.flush().map_err(|source| crate::Error::Write {
            path: self.directory.display().to_string(),
            source,
        })?;
        state.sync_current_chunk_record();

        state.chunk_index += 1;
        state.writer = open_chunk(&self.directory, &self.base_name, state.chunk_index)?;
        state.rows_in_chunk = 0;
        state.bytes_in_chunk = 0;
        state.manifest.push(ChunkRecord {
            index: state.chunk_index,
            filename: chunk_path(&self.directory, &self.base_name, state.chunk_index),
            record_count: 0,
            byte_size: 0,
        });
        Ok(())
    }
}

impl RowSink for ChunkedWriter {
    fn write_row(&self, lines: &[String]) -> crate::Result<()> {
        let mut state = self.state.lock();
        for line in lines {
            writeln!(state.writer, "{line}").map_err(|source| crate::Error::Write {
                path: self.directory.display().to_string(),
                source,
            })?;
            // +1 for the newline `writeln!` appends.
            state.bytes_in_chunk += line.len() as u64 + 1;
        }
        state.rows_in_chunk += 1;
        state.total_rows += 1;

        if state.rows_in_chunk >= self.chunk_record_threshold as u64 {
            self.roll_chunk(&mut state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_below_threshold_stay_in_a_single_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ChunkedWriter::create(dir.path(), "data", 1000).unwrap();
        for i in 0..10 {
            writer
                .write_row(&[format!("_:t_{i} <dgraph.type> \"t\" .")])
                .unwrap();
        }
        let (manifest, total) = writer.close().unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(total, 10);
        assert_eq!(manifest[0].record_count, 10);
        let contents = std::fs::read_to_string(&manifest[0].filename).unwrap();
        assert_eq!(contents.lines().count(), 10);
        assert_eq!(manifest[0].byte_size, contents.len() as u64);
    }

    #[test]
    fn writer_rolls_to_a_new_chunk_at_the_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ChunkedWriter::create(dir.path(), "data", 3).unwrap();
        for i in 0..7 {
            writer
                .write_row(&[format!("_:t_{i} <dgraph.type> \"t\" .")])
                .unwrap();
        }
        let (manifest, total) = writer.close().unwrap();
        assert_eq!(total, 7);
        assert_eq!(manifest.len(), 3);
        assert!(manifest[0].filename.to_string_lossy().ends_with("data_chunk_0.rdf"));
        assert!(manifest[1].filename.to_string_lossy().ends_with("data_chunk_1.rdf"));
        assert!(manifest[2].filename.to_string_lossy().ends_with("data_chunk_2.rdf"));
        assert_eq!(manifest[0].index, 0);
        assert_eq!(manifest[1].index, 1);
        assert_eq!(manifest[2].index, 2);
        assert_eq!(manifest[0].record_count, 3);
        assert_eq!(manifest[1].record_count, 3);
        assert_eq!(manifest[2].record_count, 1);
        assert!(manifest[0].byte_size > 0);
        assert!(manifest[2].byte_size > 0);
    }

    #[test]
    fn a_row_is_never_split_across_two_chunk_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ChunkedWriter::create(dir.path(), "data", 2).unwrap();
        writer
            .write_row(&["a .".to_string(), "b .".to_string()])
            .unwrap();
        writer
            .write_row(&["c .".to_string(), "d .".to_string()])
            .unwrap();
        writer.write_row(&["e .".to_string()]).unwrap();
        let (manifest, _) = writer.close().unwrap();
        let first = std::fs::read_to_string(&manifest[0].filename).unwrap();
        assert_eq!(first.lines().collect::<Vec<_>>(), vec!["a .", "b .", "c .", "d ."]);
    }

    #[test]
    fn manifest_byte_size_matches_the_file_actually_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ChunkedWriter::create(dir.path(), "data", 1000).unwrap();
        writer.write_row(&["a .".to_string(), "bc .".to_string()]).unwrap();
        let (manifest, _) = writer.close().unwrap();
        let on_disk = std::fs::metadata(&manifest[0].filename).unwrap().len();
        assert_eq!(manifest[0].byte_size, on_disk);
    }
}
