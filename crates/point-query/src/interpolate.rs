//! Temporal interpolation kernels.
//!
//! All kernels resample a source series at the domain step onto a finer query
//! step. Every kernel preserves NaN: any missing sample in the stencil makes
//! the output step missing. Values landing exactly on a source step are
//! returned bit-identical, so resampling at the source step is the identity.

use crate::solar;
use forecast_common::{InterpolationKind, TimerangeDt, Timestamp};

/// Source window the reader must fetch to resample `range` from step
/// `src_dt`: the range snapped outward to source steps, plus the kernel's
/// padding on each side.
pub fn source_window(range: &TimerangeDt, src_dt: i64, kind: InterpolationKind) -> TimerangeDt {
    let pad = (kind.padding() as i64 - 1) * src_dt;
    let last = Timestamp(range.end.0 - range.dt_seconds);
    TimerangeDt {
        start: Timestamp(range.start.floor(src_dt).0 - pad),
        end: Timestamp(last.ceil(src_dt).0 + src_dt + pad),
        dt_seconds: src_dt,
    }
}

/// Sample the source series at instant `t` by linear interpolation.
fn linear_at(samples: &[f32], src: &TimerangeDt, t: Timestamp) -> f32 {
    let off = t.0 - src.start.0;
    let i = off.div_euclid(src.dt_seconds);
    let rem = off.rem_euclid(src.dt_seconds);
    if i < 0 || i as usize >= samples.len() {
        return f32::NAN;
    }
    let i = i as usize;
    if rem == 0 {
        return samples[i];
    }
    if i + 1 >= samples.len() {
        return f32::NAN;
    }
    let f = rem as f32 / src.dt_seconds as f32;
    samples[i] + (samples[i + 1] - samples[i]) * f
}

/// Linear resampling.
pub fn linear(samples: &[f32], src: &TimerangeDt, dst: &TimerangeDt) -> Vec<f32> {
    dst.iter().map(|t| linear_at(samples, src, t)).collect()
}

/// Catmull-Rom value between `p1` and `p2` at fraction `t`.
fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;
    a * t3 + b * t2 + c * t + d
}

/// Hermite (Catmull-Rom) resampling, optionally clamped to variable bounds.
pub fn hermite(
    samples: &[f32],
    src: &TimerangeDt,
    dst: &TimerangeDt,
    bounds: Option<(f32, f32)>,
) -> Vec<f32> {
    dst.iter()
        .map(|t| {
            let off = t.0 - src.start.0;
            let i = off.div_euclid(src.dt_seconds);
            let rem = off.rem_euclid(src.dt_seconds);
            if i < 0 || i as usize >= samples.len() {
                return f32::NAN;
            }
            let i = i as usize;
            if rem == 0 {
                return samples[i];
            }
            if i < 1 || i + 2 >= samples.len() {
                return f32::NAN;
            }
            let f = rem as f32 / src.dt_seconds as f32;
            let y = catmull_rom(samples[i - 1], samples[i], samples[i + 1], samples[i + 2], f);
            match bounds {
                // NaN survives the clamp.
                Some((lo, hi)) => y.clamp(lo, hi),
                None => y,
            }
        })
        .collect()
}

/// Below this mean irradiance the deaveraging ratio is meaningless (night,
/// polar winter) and the kernel degrades to linear interpolation.
const MIN_ETR: f64 = 1e-3;

/// Solar-backwards-averaged resampling.
///
/// Source samples are mean irradiance over the trailing source interval.
/// Each sample is deaveraged into a clearness index against the
/// extra-terrestrial mean over the same interval, the index is interpolated
/// to the destination interval, and re-multiplied by the extra-terrestrial
/// mean over that interval. Output is clamped to be non-negative.
pub fn solar_backwards(
    samples: &[f32],
    src: &TimerangeDt,
    dst: &TimerangeDt,
    latitude: f64,
    longitude: f64,
) -> Vec<f32> {
    let etr_src: Vec<f64> = (0..samples.len())
        .map(|i| {
            let t = src.start.0 + i as i64 * src.dt_seconds;
            solar::average_extraterrestrial(
                Timestamp(t - src.dt_seconds),
                Timestamp(t),
                latitude,
                longitude,
            )
        })
        .collect();

    dst.iter()
        .map(|t| {
            // Clearness indices live at source interval midpoints; find the
            // pair bracketing this destination interval's midpoint.
            let dst_mid = t.0 as f64 - dst.dt_seconds as f64 / 2.0;
            let first_mid = src.start.0 as f64 - src.dt_seconds as f64 / 2.0;
            let pos = (dst_mid - first_mid) / src.dt_seconds as f64;
            let i = pos.floor() as i64;
            let f = (pos - i as f64) as f32;
            if i < 0 || i as usize + 1 >= samples.len() {
                return f32::NAN;
            }
            let i = i as usize;

            if etr_src[i] < MIN_ETR || etr_src[i + 1] < MIN_ETR {
                let v = linear_at(samples, src, t);
                return if v.is_nan() { v } else { v.max(0.0) };
            }

            let kt_lo = samples[i] / etr_src[i] as f32;
            let kt_hi = samples[i + 1] / etr_src[i + 1] as f32;
            let kt = kt_lo + (kt_hi - kt_lo) * f;

            let etr_dst = solar::average_extraterrestrial(
                Timestamp(t.0 - dst.dt_seconds),
                t,
                latitude,
                longitude,
            ) as f32;
            let v = kt * etr_dst;
            if v.is_nan() {
                v
            } else {
                v.max(0.0)
            }
        })
        .collect()
}
