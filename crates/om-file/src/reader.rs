//! Memory-mapped read access to a column file.

use crate::codec;
use crate::error::{ColumnFileError, Result};
use crate::layout::{ColumnFileLayout, HEADER_LEN, INDEX_ENTRY_LEN};
use memmap2::{Advice, Mmap};
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A read-only, memory-mapped column file.
///
/// The handle never mutates the file. A concurrent rewrite-and-rename leaves
/// this mapping pointing at the old inode, so in-flight reads stay consistent;
/// callers that want the new contents reopen.
pub struct ColumnFile {
    mmap: Mmap,
    layout: ColumnFileLayout,
    path: PathBuf,
}

impl ColumnFile {
    /// Map the file and validate header and chunk index bounds.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // Safety: the file is opened read-only and writers never touch an
        // existing inode; they publish a new one via rename.
        let mmap = unsafe { Mmap::map(&file)? };

        let layout = ColumnFileLayout::decode_header(path, &mmap)?;
        if mmap.len() < layout.payload_offset() {
            return Err(ColumnFileError::format_invalid(
                path,
                "chunk index extends past end of file",
            ));
        }

        Ok(Self {
            mmap,
            layout,
            path: path.to_path_buf(),
        })
    }

    pub fn layout(&self) -> &ColumnFileLayout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Chunk index entry: payload-relative offset and compressed length.
    fn index_entry(&self, chunk: usize) -> (u64, u32) {
        let at = HEADER_LEN + chunk * INDEX_ENTRY_LEN;
        let offset = u64::from_be_bytes(self.mmap[at..at + 8].try_into().unwrap());
        let length = u32::from_be_bytes(self.mmap[at + 8..at + 12].try_into().unwrap());
        (offset, length)
    }

    /// Compressed bytes of a chunk, or `None` for an all-missing chunk.
    fn chunk_payload(&self, chunk: usize) -> Result<Option<&[u8]>> {
        let (offset, length) = self.index_entry(chunk);
        if length == 0 {
            return Ok(None);
        }
        let start = self.layout.payload_offset() + offset as usize;
        let end = start + length as usize;
        if end > self.mmap.len() {
            return Err(ColumnFileError::format_invalid(
                &self.path,
                format!("chunk {chunk} extends past end of file"),
            ));
        }
        Ok(Some(&self.mmap[start..end]))
    }

    /// Read one location's values over a step range.
    ///
    /// Steps outside `[0, n_time)` come back as NaN; the range may extend past
    /// the file on either side. Only the location is bounds-checked.
    pub fn read(&self, location: usize, steps: Range<i64>) -> Result<Vec<f32>> {
        if location >= self.layout.n_locations {
            return Err(ColumnFileError::OutOfRange {
                location,
                n_locations: self.layout.n_locations,
            });
        }
        self.read_rect(location..location + 1, steps)
    }

    /// Read a `[location, step]` rectangle, location-major.
    ///
    /// Out-of-file steps fill with NaN so callers can stitch shard windows
    /// without special cases.
    pub fn read_rect(&self, locations: Range<usize>, steps: Range<i64>) -> Result<Vec<f32>> {
        if locations.end > self.layout.n_locations {
            return Err(ColumnFileError::OutOfRange {
                location: locations.end - 1,
                n_locations: self.layout.n_locations,
            });
        }

        let n_steps = (steps.end - steps.start).max(0) as usize;
        let mut out = vec![f32::NAN; locations.len() * n_steps];
        if locations.is_empty() {
            return Ok(out);
        }

        let visible =
            steps.start.max(0) as usize..steps.end.clamp(0, self.layout.n_time as i64) as usize;
        if visible.start >= visible.end {
            return Ok(out);
        }

        let cl_range = locations.start / self.layout.chunk_loc
            ..(locations.end - 1) / self.layout.chunk_loc + 1;
        let ct_range = visible.start / self.layout.chunk_time
            ..(visible.end - 1) / self.layout.chunk_time + 1;

        for cl in cl_range {
            let chunk_locs = self.layout.chunk_locations(cl);
            for ct in ct_range.clone() {
                let chunk_steps = self.layout.chunk_steps(ct);
                let chunk = self.layout.chunk_index(cl, ct);

                let decoded = match self.chunk_payload(chunk)? {
                    // All-missing chunk: the output is already NaN.
                    None => continue,
                    Some(payload) => codec::decode_chunk(
                        &self.path,
                        payload,
                        chunk_locs.len(),
                        chunk_steps.len(),
                        self.layout.scalefactor,
                    )?,
                };

                let loc_overlap =
                    chunk_locs.start.max(locations.start)..chunk_locs.end.min(locations.end);
                let step_overlap =
                    chunk_steps.start.max(visible.start)..chunk_steps.end.min(visible.end);

                for loc in loc_overlap {
                    let src_row = (loc - chunk_locs.start) * chunk_steps.len();
                    let dst_row = (loc - locations.start) * n_steps;
                    for step in step_overlap.clone() {
                        let src = src_row + (step - chunk_steps.start);
                        let dst = dst_row + (step as i64 - steps.start) as usize;
                        out[dst] = decoded[src];
                    }
                }
            }
        }
        Ok(out)
    }

    /// Advise the kernel that the chunks covering a region will be read soon.
    ///
    /// Purely advisory: failures are swallowed and out-of-range regions are
    /// clamped away.
    pub fn will_need(&self, locations: Range<usize>, steps: Range<i64>) {
        let locations = locations.start.min(self.layout.n_locations)
            ..locations.end.min(self.layout.n_locations);
        let visible =
            steps.start.max(0) as usize..steps.end.clamp(0, self.layout.n_time as i64) as usize;
        if locations.is_empty() || visible.start >= visible.end {
            return;
        }

        let cl_range = locations.start / self.layout.chunk_loc
            ..(locations.end - 1) / self.layout.chunk_loc + 1;
        let ct_range = visible.start / self.layout.chunk_time
            ..(visible.end - 1) / self.layout.chunk_time + 1;

        for cl in cl_range {
            for ct in ct_range.clone() {
                let (offset, length) = self.index_entry(self.layout.chunk_index(cl, ct));
                if length == 0 {
                    continue;
                }
                let start = self.layout.payload_offset() + offset as usize;
                if start + length as usize <= self.mmap.len() {
                    let _ = self.mmap.advise_range(Advice::WillNeed, start, length as usize);
                }
            }
        }
    }
}

impl std::fmt::Debug for ColumnFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnFile")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .finish()
    }
}
