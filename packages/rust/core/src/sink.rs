//! Output sinks: per-collection document archives and the channel tree file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use currichef_shared::{ChefError, Result};

// ---------------------------------------------------------------------------
// ArchiveWriter
// ---------------------------------------------------------------------------

/// Produced interface for the per-collection document archive. The archive
/// format itself is not this crate's concern; the assembler only appends
/// named byte blobs and finishes.
pub trait ArchiveWriter {
    fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Deflate-compressed zip archive on disk.
pub struct ZipArchive {
    inner: Option<ZipWriter<BufWriter<File>>>,
}

impl ZipArchive {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChefError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| ChefError::io(path, e))?;
        Ok(Self {
            inner: Some(ZipWriter::new(BufWriter::new(file))),
        })
    }
}

impl ArchiveWriter for ZipArchive {
    fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let Some(writer) = self.inner.as_mut() else {
            return Err(ChefError::Archive("archive already finished".into()));
        };
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(name, options)
            .map_err(|e| ChefError::Archive(format!("{name}: {e}")))?;
        writer
            .write_all(bytes)
            .map_err(|e| ChefError::Archive(format!("{name}: {e}")))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(writer) = self.inner.take() else {
            return Err(ChefError::Archive("archive already finished".into()));
        };
        writer
            .finish()
            .map_err(|e| ChefError::Archive(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TreeWriter
// ---------------------------------------------------------------------------

/// Produced interface for the stage output files (resource tree, channel
/// tree).
pub trait TreeWriter {
    fn write<T: Serialize>(&self, path: &Path, tree: &T) -> Result<()>;
}

/// Pretty-printed JSON on disk.
pub struct JsonTreeWriter;

impl TreeWriter for JsonTreeWriter {
    fn write<T: Serialize>(&self, path: &Path, tree: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChefError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(tree)
            .map_err(|e| ChefError::validation(format!("tree serialization: {e}")))?;
        std::fs::write(path, json).map_err(|e| ChefError::io(path, e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// In-memory archive for assembler tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryArchive {
    pub entries: Vec<(String, Vec<u8>)>,
    pub finished: bool,
}

#[cfg(test)]
impl ArchiveWriter for MemoryArchive {
    fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.entries.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
