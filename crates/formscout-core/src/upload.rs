//! Request-scoped staging of uploaded documents.

use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

/// An uploaded document written to a uniquely named temporary file.
///
/// The file is removed when the value is dropped, whichever way the request
/// ends.
pub struct StagedUpload {
    file: NamedTempFile,
    len: usize,
}

impl StagedUpload {
    /// Stage an in-memory upload.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("formscout-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;

        debug!("Staged {} byte upload at {}", data.len(), file.path().display());
        Ok(Self {
            file,
            len: data.len(),
        })
    }

    /// Stage an upload read from a stream.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the upload in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the staged bytes back.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.file.path())?)
    }
}
