//! Whole-file round-trip behavior: write, map, read back.

use om_file::{write, ColumnFile, ColumnFileLayout};
use std::ops::Range;

fn ramp(loc: usize, step: usize) -> f32 {
    loc as f32 + step as f32 / 24.0
}

fn ramp_provider() -> impl FnMut(Range<usize>, Range<usize>) -> Vec<f32> {
    |locations: Range<usize>, steps: Range<usize>| {
        let mut values = Vec::new();
        for loc in locations {
            for step in steps.clone() {
                values.push(ramp(loc, step));
            }
        }
        values
    }
}

#[test]
fn write_then_point_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temperature_2m_0.om");
    let layout = ColumnFileLayout {
        n_locations: 100,
        n_time: 240,
        chunk_loc: 6,
        chunk_time: 183,
        scalefactor: 20.0,
    };
    write(&path, &layout, &mut ramp_provider()).unwrap();

    let file = ColumnFile::open(&path).unwrap();
    let values = file.read(42, 10..20).unwrap();
    assert_eq!(values.len(), 10);
    for (i, v) in values.iter().enumerate() {
        let expected = ramp(42, 10 + i);
        assert!(
            (v - expected).abs() <= 0.025,
            "step {}: {} vs {}",
            i,
            v,
            expected
        );
    }
}

#[test]
fn missing_cell_round_trips_as_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temperature_2m_0.om");
    let layout = ColumnFileLayout {
        n_locations: 100,
        n_time: 240,
        chunk_loc: 6,
        chunk_time: 183,
        scalefactor: 20.0,
    };
    write(&path, &layout, &mut |locations: Range<usize>,
                                steps: Range<usize>| {
        let mut values = Vec::new();
        for loc in locations {
            for step in steps.clone() {
                if loc == 42 && step == 15 {
                    values.push(f32::NAN);
                } else {
                    values.push(ramp(loc, step));
                }
            }
        }
        values
    })
    .unwrap();

    let file = ColumnFile::open(&path).unwrap();
    let values = file.read(42, 10..20).unwrap();
    assert!(values[5].is_nan());
    for (i, v) in values.iter().enumerate() {
        if i != 5 {
            assert!((v - ramp(42, 10 + i)).abs() <= 0.025);
        }
    }
    // The neighbouring location is untouched.
    let neighbour = file.read(41, 10..20).unwrap();
    assert!(neighbour.iter().all(|v| !v.is_nan()));
}

#[test]
fn chunking_does_not_change_read_results() {
    let dir = tempfile::tempdir().unwrap();
    let coarse = dir.path().join("a.om");
    let fine = dir.path().join("b.om");

    let base = ColumnFileLayout {
        n_locations: 50,
        n_time: 96,
        chunk_loc: 6,
        chunk_time: 48,
        scalefactor: 20.0,
    };
    let alt = ColumnFileLayout {
        chunk_loc: 11,
        chunk_time: 17,
        ..base
    };
    write(&coarse, &base, &mut ramp_provider()).unwrap();
    write(&fine, &alt, &mut ramp_provider()).unwrap();

    let a = ColumnFile::open(&coarse).unwrap();
    let b = ColumnFile::open(&fine).unwrap();
    for location in [0, 7, 23, 49] {
        let va = a.read(location, 0..96).unwrap();
        let vb = b.read(location, 0..96).unwrap();
        assert_eq!(va, vb, "location {}", location);
    }
}

#[test]
fn out_of_file_steps_are_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.om");
    let layout = ColumnFileLayout {
        n_locations: 4,
        n_time: 10,
        chunk_loc: 2,
        chunk_time: 5,
        scalefactor: 10.0,
    };
    write(&path, &layout, &mut ramp_provider()).unwrap();

    let file = ColumnFile::open(&path).unwrap();
    let values = file.read(1, -3..13).unwrap();
    assert_eq!(values.len(), 16);
    assert!(values[..3].iter().all(|v| v.is_nan()));
    assert!(values[13..].iter().all(|v| v.is_nan()));
    assert!((values[3] - ramp(1, 0)).abs() <= 0.05);
    assert!((values[12] - ramp(1, 9)).abs() <= 0.05);
}

#[test]
fn location_out_of_range_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("d.om");
    let layout = ColumnFileLayout {
        n_locations: 4,
        n_time: 10,
        chunk_loc: 2,
        chunk_time: 5,
        scalefactor: 10.0,
    };
    write(&path, &layout, &mut ramp_provider()).unwrap();

    let file = ColumnFile::open(&path).unwrap();
    assert!(file.read(4, 0..10).is_err());
}

#[test]
fn will_need_is_advisory_and_never_panics() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("e.om");
    let layout = ColumnFileLayout {
        n_locations: 10,
        n_time: 20,
        chunk_loc: 3,
        chunk_time: 7,
        scalefactor: 10.0,
    };
    write(&path, &layout, &mut ramp_provider()).unwrap();

    let file = ColumnFile::open(&path).unwrap();
    file.will_need(0..10, 0..20);
    file.will_need(5..100, -50..500);
    file.will_need(0..0, 0..0);
}

#[test]
fn open_rejects_non_column_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.om");
    std::fs::write(&path, b"this is not a column file at all, not even close").unwrap();
    assert!(ColumnFile::open(&path).is_err());
}
