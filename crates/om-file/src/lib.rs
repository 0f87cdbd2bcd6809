//! The `.om` column file: one variable, many locations, many timesteps.
//!
//! A column file stores a logical `[location, time]` matrix of `f32` values as
//! int16-quantized, delta-coded, variable-byte-compressed chunks behind a small
//! big-endian header and a chunk index. Reads go through a memory map and touch
//! only the chunks overlapping the requested region; updates rewrite the whole
//! file to a sibling temp name and publish it with a single rename.
//!
//! ```text
//! Point query
//!      │
//!      ▼
//! ColumnFile::read(location, steps)
//!      │
//!      ├─► Locate overlapping chunks (O(1) arithmetic)
//!      │
//!      ├─► Decompress each chunk from the mapped payload
//!      │
//!      └─► Copy the location's row slice into the output
//! ```

pub mod codec;
pub mod error;
pub mod layout;
pub mod reader;
pub mod writer;

pub use error::{ColumnFileError, Result};
pub use layout::{ColumnFileLayout, FORMAT_VERSION, MAGIC};
pub use reader::ColumnFile;
pub use writer::{write, ChunkProvider};
