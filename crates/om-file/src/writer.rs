//! Atomic column file writer.
//!
//! Writing always produces a complete new file at a sibling temp name and
//! publishes it with a single rename, so concurrent readers observe either the
//! old file or the new one, never a mix. Partial updates are expressed by the
//! caller as a merge: the chunk provider overlays new cells onto values read
//! from the previous file.

use crate::codec;
use crate::error::{ColumnFileError, Result};
use crate::layout::{ColumnFileLayout, HEADER_LEN, INDEX_ENTRY_LEN};
use std::fs;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies full chunks in index order during a write.
pub trait ChunkProvider {
    /// Produce the values for the chunk covering `locations` × `steps`,
    /// location-major with time as the inner axis.
    fn chunk(&mut self, locations: Range<usize>, steps: Range<usize>) -> Vec<f32>;
}

impl<F> ChunkProvider for F
where
    F: FnMut(Range<usize>, Range<usize>) -> Vec<f32>,
{
    fn chunk(&mut self, locations: Range<usize>, steps: Range<usize>) -> Vec<f32> {
        self(locations, steps)
    }
}

/// Write a column file to `path` via a sibling temp file and rename.
///
/// The provider is called once per chunk in index order. On any failure the
/// previous file at `path` is left untouched.
pub fn write(path: &Path, layout: &ColumnFileLayout, provider: &mut dyn ChunkProvider) -> Result<()> {
    layout
        .validate()
        .map_err(|reason| ColumnFileError::format_invalid(path, reason))?;

    let tmp = temp_sibling(path);
    let result = write_to_temp(&tmp, path, layout, provider)
        .and_then(|()| fs::rename(&tmp, path).map_err(ColumnFileError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_to_temp(
    tmp: &Path,
    target: &Path,
    layout: &ColumnFileLayout,
    provider: &mut dyn ChunkProvider,
) -> Result<()> {
    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(tmp)?;
    let mut out = BufWriter::new(file);

    out.write_all(&layout.encode_header())?;
    // Reserve the index region; entries are filled in after the payload.
    out.write_all(&vec![0u8; layout.index_len()])?;

    let mut index = Vec::with_capacity(layout.n_chunks());
    let mut payload_offset: u64 = 0;
    for cl in 0..layout.n_chunks_loc() {
        let locations = layout.chunk_locations(cl);
        for ct in 0..layout.n_chunks_time() {
            let steps = layout.chunk_steps(ct);
            let values = provider.chunk(locations.clone(), steps.clone());
            if values.len() != locations.len() * steps.len() {
                return Err(ColumnFileError::format_invalid(
                    target,
                    format!(
                        "chunk provider returned {} cells for a {}x{} chunk",
                        values.len(),
                        locations.len(),
                        steps.len()
                    ),
                ));
            }
            let encoded =
                codec::encode_chunk(&values, locations.len(), steps.len(), layout.scalefactor);
            index.push((payload_offset, encoded.len() as u32));
            payload_offset += encoded.len() as u64;
            out.write_all(&encoded)?;
        }
    }

    out.seek(SeekFrom::Start(HEADER_LEN as u64))?;
    let mut index_bytes = Vec::with_capacity(index.len() * INDEX_ENTRY_LEN);
    for (offset, length) in &index {
        index_bytes.extend_from_slice(&offset.to_be_bytes());
        index_bytes.extend_from_slice(&length.to_be_bytes());
    }
    out.write_all(&index_bytes)?;

    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    debug!(
        target = %target.display(),
        chunks = index.len(),
        payload_bytes = payload_offset,
        "column file staged"
    );
    Ok(())
}
