//! The splitter: an infinite per-variable time axis over fixed-length shards.
//!
//! Time is partitioned into shards of `om_file_length` timesteps from an
//! epoch-aligned origin. Shard `k` lives at `<directory>/<stem>_<k>.om`.
//! Ranges a rolling shard no longer covers are served from the optional
//! yearly archive at `<archive>/<stem>_<year>.om`, one file per UTC calendar
//! year.

use crate::error::{Result, StoreError};
use crate::handle_cache::FileHandleCache;
use chrono::{TimeZone, Utc};
use forecast_common::{TimerangeDt, Timestamp};
use om_file::{ColumnFile, ColumnFileError, ColumnFileLayout};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

/// Where and how a domain's series are sharded.
#[derive(Debug, Clone)]
pub struct ShardLayout {
    /// Directory holding the rolling shards.
    pub directory: PathBuf,
    /// Optional yearly long-term archive.
    pub archive_directory: Option<PathBuf>,
    /// Model step width in seconds.
    pub dt_seconds: i64,
    /// Timesteps per rolling shard.
    pub om_file_length: usize,
    /// Grid points per shard file.
    pub n_locations: usize,
}

impl ShardLayout {
    /// Wall-clock seconds covered by one shard.
    pub fn shard_span(&self) -> i64 {
        self.dt_seconds * self.om_file_length as i64
    }

    /// Shard index containing `t` (epoch-aligned origin).
    pub fn shard_index(&self, t: Timestamp) -> i64 {
        t.0.div_euclid(self.shard_span())
    }

    /// First instant of shard `k`.
    pub fn shard_start(&self, k: i64) -> Timestamp {
        Timestamp(k * self.shard_span())
    }

    /// Path of rolling shard `k` for a variable stem.
    pub fn shard_path(&self, stem: &str, k: i64) -> PathBuf {
        self.directory.join(format!("{stem}_{k}.om"))
    }

    /// Path of the yearly archive file for a variable stem, if archiving is
    /// configured.
    pub fn archive_path(&self, stem: &str, year: i32) -> Option<PathBuf> {
        self.archive_directory
            .as_ref()
            .map(|dir| dir.join(format!("{stem}_{year}.om")))
    }
}

/// Sharded read/write access for one domain's variables.
pub struct Splitter {
    layout: ShardLayout,
    cache: Arc<FileHandleCache>,
}

impl Splitter {
    /// Splitter using the process-wide handle cache.
    pub fn new(layout: ShardLayout) -> Self {
        Self::with_cache(layout, FileHandleCache::global())
    }

    /// Splitter with an explicit handle cache (tests use isolated caches).
    pub fn with_cache(layout: ShardLayout, cache: Arc<FileHandleCache>) -> Self {
        Self { layout, cache }
    }

    pub fn layout(&self) -> &ShardLayout {
        &self.layout
    }

    /// Read one location's series over `range` (at the domain step).
    ///
    /// Every kind of gap — no shard, shard with fewer locations, missing
    /// chunk — fills with NaN.
    pub fn read(&self, stem: &str, location: usize, range: TimerangeDt) -> Result<Vec<f32>> {
        debug_assert_eq!(range.dt_seconds, self.layout.dt_seconds);
        let mut out = vec![f32::NAN; range.count()];
        if range.is_empty() {
            return Ok(out);
        }

        let dt = self.layout.dt_seconds;
        let k0 = self.layout.shard_index(range.start);
        let k1 = self.layout.shard_index(Timestamp(range.end.0 - dt));
        for k in k0..=k1 {
            let shard_start = self.layout.shard_start(k);
            let sub_start = range.start.max(shard_start);
            let sub_end = range.end.min(Timestamp(shard_start.0 + self.layout.shard_span()));
            let n = ((sub_end.0 - sub_start.0) / dt) as usize;
            let out_offset = ((sub_start.0 - range.start.0) / dt) as usize;
            let window = &mut out[out_offset..out_offset + n];

            match self.cache.acquire(&self.layout.shard_path(stem, k))? {
                Some(file) => {
                    let local_start = (sub_start.0 - shard_start.0) / dt;
                    copy_series(&file, location, local_start..local_start + n as i64, window);
                }
                None => self.read_archive(stem, location, sub_start, sub_end, window)?,
            }
        }
        Ok(out)
    }

    /// Fill `out` (covering `[start, end)`) from yearly archive files.
    fn read_archive(
        &self,
        stem: &str,
        location: usize,
        start: Timestamp,
        end: Timestamp,
        out: &mut [f32],
    ) -> Result<()> {
        if self.layout.archive_directory.is_none() {
            return Ok(());
        }
        let dt = self.layout.dt_seconds;
        for year in start.year()..=Timestamp(end.0 - dt).year() {
            let year_start = Timestamp(
                Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap().timestamp(),
            );
            let year_end = Timestamp(
                Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
                    .unwrap()
                    .timestamp(),
            );
            let sub_start = start.max(year_start);
            let sub_end = end.min(year_end);
            if sub_start >= sub_end {
                continue;
            }
            let path = self.layout.archive_path(stem, year).unwrap();
            if let Some(file) = self.cache.acquire(&path)? {
                let local_start = (sub_start.0 - year_start.0) / dt;
                let n = ((sub_end.0 - sub_start.0) / dt) as usize;
                let out_offset = ((sub_start.0 - start.0) / dt) as usize;
                copy_series(
                    &file,
                    location,
                    local_start..local_start + n as i64,
                    &mut out[out_offset..out_offset + n],
                );
            }
        }
        Ok(())
    }

    /// Advise the kernel about an upcoming read.
    pub fn will_need(&self, stem: &str, location: usize, range: TimerangeDt) {
        if range.is_empty() {
            return;
        }
        let dt = self.layout.dt_seconds;
        let k0 = self.layout.shard_index(range.start);
        let k1 = self.layout.shard_index(Timestamp(range.end.0 - dt));
        for k in k0..=k1 {
            let shard_start = self.layout.shard_start(k);
            if let Ok(Some(file)) = self.cache.acquire(&self.layout.shard_path(stem, k)) {
                let local_start = (range.start.max(shard_start).0 - shard_start.0) / dt;
                let local_end =
                    (range.end.min(Timestamp(shard_start.0 + self.layout.shard_span())).0
                        - shard_start.0)
                        / dt;
                file.will_need(location..location + 1, local_start..local_end);
            }
        }
    }

    /// Overlay `values` (location-major, `locations.len() × range.count()`)
    /// onto the affected shards.
    ///
    /// Cells outside the written rectangle keep their previous contents.
    /// Shards are rewritten one at a time under a per-shard lock and
    /// published by rename, so a failure leaves every shard at either its old
    /// or its new version.
    pub fn write(
        &self,
        stem: &str,
        scalefactor: f32,
        locations: Range<usize>,
        range: TimerangeDt,
        values: &[f32],
    ) -> Result<()> {
        debug_assert_eq!(range.dt_seconds, self.layout.dt_seconds);
        if values.len() != locations.len() * range.count() {
            return Err(StoreError::InvalidWrite(format!(
                "{} values for a {}x{} rectangle",
                values.len(),
                locations.len(),
                range.count()
            )));
        }
        if locations.end > self.layout.n_locations {
            return Err(StoreError::InvalidWrite(format!(
                "location range {:?} exceeds grid of {}",
                locations, self.layout.n_locations
            )));
        }
        if range.is_empty() {
            return Ok(());
        }

        let dt = self.layout.dt_seconds;
        let k0 = self.layout.shard_index(range.start);
        let k1 = self.layout.shard_index(Timestamp(range.end.0 - dt));
        for k in k0..=k1 {
            let path = self.layout.shard_path(stem, k);
            let lock = shard_lock(&path);
            let _guard = lock.lock().unwrap();

            let existing = match ColumnFile::open(&path) {
                Ok(file) => Some(file),
                Err(ColumnFileError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            let layout = existing.as_ref().map(|f| *f.layout()).unwrap_or_else(|| {
                ColumnFileLayout::with_default_chunks(
                    self.layout.n_locations,
                    self.layout.om_file_length,
                    dt,
                    scalefactor,
                )
            });

            let shard_start = self.layout.shard_start(k);
            om_file::write(&path, &layout, &mut |chunk_locs: Range<usize>,
                                                 chunk_steps: Range<usize>| {
                let mut cells = match &existing {
                    Some(file) => file
                        .read_rect(
                            chunk_locs.clone(),
                            chunk_steps.start as i64..chunk_steps.end as i64,
                        )
                        .unwrap_or_else(|e| {
                            warn!(path = %path.display(), error = %e, "unreadable chunk treated as missing");
                            vec![f32::NAN; chunk_locs.len() * chunk_steps.len()]
                        }),
                    None => vec![f32::NAN; chunk_locs.len() * chunk_steps.len()],
                };
                for (li, loc) in chunk_locs.clone().enumerate() {
                    if !locations.contains(&loc) {
                        continue;
                    }
                    for (si, step) in chunk_steps.clone().enumerate() {
                        let t = shard_start.0 + step as i64 * dt;
                        if t >= range.start.0 && t < range.end.0 {
                            let src = (loc - locations.start) * range.count()
                                + ((t - range.start.0) / dt) as usize;
                            cells[li * chunk_steps.len() + si] = values[src];
                        }
                    }
                }
                cells
            })?;
        }
        Ok(())
    }
}

/// Copy `steps` of one location from a file into `out`, leaving NaN where the
/// file cannot serve (short file, decode failure).
fn copy_series(file: &ColumnFile, location: usize, steps: Range<i64>, out: &mut [f32]) {
    if location >= file.layout().n_locations {
        return;
    }
    match file.read(location, steps) {
        Ok(values) => out.copy_from_slice(&values),
        Err(e) => {
            warn!(path = %file.path().display(), error = %e, "unreadable shard window treated as missing");
        }
    }
}

/// Per-shard write locks, process-wide so writers for the same shard
/// serialize regardless of which splitter they came through.
fn shard_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let map = LOCKS.get_or_init(Default::default);
    map.lock()
        .unwrap()
        .entry(path.to_path_buf())
        .or_default()
        .clone()
}
