//! Integration tests for the classic NetCDF reader and writer round-trip.

use ncjoin::core::{ArrayData, ArrayValues, AttrValue, DatasetReader, DatasetWriter, VarSchema};
use ncjoin::netcdf::{NcReader, NcVersion, NcWriter};
use ncjoin::util::{Error, NcType};

use tempfile::tempdir;

/// Writes a small trajectory-shaped file: three frames of two atoms plus a
/// fixed cell and a couple of attributes.
fn write_trajectory(path: &std::path::Path, version: NcVersion) {
    let mut writer = NcWriter::create(path, version).expect("Failed to create file");
    writer.put_global_attr("program", AttrValue::text("md")).unwrap();
    writer.add_dimension("frame", None).unwrap();
    writer.add_dimension("atom", Some(2)).unwrap();
    writer.add_dimension("spatial", Some(3)).unwrap();
    writer
        .add_variable(
            &VarSchema::new("time", NcType::Double, &["frame"])
                .with_attr("units", AttrValue::text("picosecond")),
        )
        .unwrap();
    writer
        .add_variable(&VarSchema::new("coordinates", NcType::Double, &["frame", "atom"]))
        .unwrap();
    writer
        .add_variable(&VarSchema::new("cell_lengths", NcType::Double, &["spatial"]))
        .unwrap();

    writer
        .write_all(
            "cell_lengths",
            &ArrayData::new(ArrayValues::Doubles(vec![10.0, 10.0, 10.0]), vec![3]),
        )
        .unwrap();
    for frame in 0..3 {
        let t = frame as f64 * 0.5;
        writer
            .write_frame(
                "time",
                frame,
                &ArrayData::new(ArrayValues::Doubles(vec![t]), Vec::new()),
            )
            .unwrap();
        let base = frame as f64 * 10.0;
        writer
            .write_frame(
                "coordinates",
                frame,
                &ArrayData::new(ArrayValues::Doubles(vec![base, base + 1.0]), vec![2]),
            )
            .unwrap();
    }
    writer.finish().expect("Failed to finalize file");
}

fn roundtrip(version: NcVersion) {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("traj.nc");
    write_trajectory(&path, version);

    let reader = NcReader::open(&path).expect("Failed to open file");
    assert_eq!(reader.version(), version);
    assert_eq!(reader.num_frames(), 3);

    let frame_dim = reader.dimension("frame").expect("frame dimension missing");
    assert!(frame_dim.unlimited);
    assert_eq!(frame_dim.len, 3);
    assert_eq!(reader.dimension("atom").unwrap().len, 2);

    assert_eq!(
        reader.global_attrs(),
        &[("program".to_string(), AttrValue::text("md"))]
    );
    let time = reader.variable("time").expect("time variable missing");
    assert_eq!(time.attr("units"), Some(&AttrValue::text("picosecond")));

    let cell = reader.read_all("cell_lengths").unwrap();
    assert_eq!(cell.shape, vec![3]);
    assert_eq!(cell.to_f64_vec(), vec![10.0, 10.0, 10.0]);

    let coords = reader.read_all("coordinates").unwrap();
    assert_eq!(coords.shape, vec![3, 2]);
    assert_eq!(coords.to_f64_vec(), vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0]);

    let frame1 = reader.read_frame("coordinates", 1).unwrap();
    assert_eq!(frame1.shape, vec![2]);
    assert_eq!(frame1.to_f64_vec(), vec![10.0, 11.0]);

    let times = reader.read_all("time").unwrap().to_f64_vec();
    assert_eq!(times, vec![0.0, 0.5, 1.0]);
}

#[test]
fn test_roundtrip_classic() {
    roundtrip(NcVersion::Classic);
}

#[test]
fn test_roundtrip_offset64() {
    roundtrip(NcVersion::Offset64);
}

#[test]
fn test_single_record_variable_is_unpadded() {
    // One float per record: 4 bytes, no padding on either side of the trip.
    let dir = tempdir().unwrap();
    let path = dir.path().join("time-only.nc");
    {
        let mut writer = NcWriter::create(&path, NcVersion::Classic).unwrap();
        writer.add_dimension("frame", None).unwrap();
        writer
            .add_variable(&VarSchema::new("time", NcType::Float, &["frame"]))
            .unwrap();
        for frame in 0..5 {
            writer
                .write_frame(
                    "time",
                    frame,
                    &ArrayData::new(ArrayValues::Floats(vec![frame as f32]), Vec::new()),
                )
                .unwrap();
        }
        writer.finish().unwrap();
    }
    let reader = NcReader::open(&path).unwrap();
    assert_eq!(reader.num_frames(), 5);
    assert_eq!(
        reader.read_all("time").unwrap().to_f64_vec(),
        vec![0.0, 1.0, 2.0, 3.0, 4.0]
    );
}

#[test]
fn test_mixed_types_survive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mixed.nc");
    {
        let mut writer = NcWriter::create(&path, NcVersion::Offset64).unwrap();
        writer.add_dimension("frame", None).unwrap();
        writer.add_dimension("atom", Some(3)).unwrap();
        writer
            .add_variable(&VarSchema::new("id", NcType::Int, &["frame", "atom"]))
            .unwrap();
        writer
            .add_variable(&VarSchema::new("flags", NcType::Short, &["frame", "atom"]))
            .unwrap();
        writer
            .write_frame(
                "id",
                0,
                &ArrayData::new(ArrayValues::Ints(vec![3, 1, 2]), vec![3]),
            )
            .unwrap();
        writer
            .write_frame(
                "flags",
                0,
                &ArrayData::new(ArrayValues::Shorts(vec![-1, 0, 1]), vec![3]),
            )
            .unwrap();
        writer.finish().unwrap();
    }
    let reader = NcReader::open(&path).unwrap();
    assert_eq!(reader.read_frame("id", 0).unwrap().to_i64_vec(), vec![3, 1, 2]);
    assert_eq!(
        reader.read_frame("flags", 0).unwrap().to_i64_vec(),
        vec![-1, 0, 1]
    );
}

#[test]
fn test_create_refuses_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exists.nc");
    std::fs::write(&path, b"occupied").unwrap();
    let err = NcWriter::create(&path, NcVersion::Offset64).unwrap_err();
    assert!(matches!(err, Error::OutputExists(_)));
}

#[test]
fn test_open_missing_file() {
    let dir = tempdir().unwrap();
    let err = NcReader::open(dir.path().join("nope.nc")).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_open_rejects_bad_magic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("not-netcdf.nc");
    std::fs::write(&path, b"HDF\x05 definitely not classic").unwrap();
    let err = NcReader::open(&path).unwrap_err();
    assert!(matches!(err, Error::InvalidMagic));
}

#[test]
fn test_schema_is_frozen_after_first_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frozen.nc");
    let mut writer = NcWriter::create(&path, NcVersion::Classic).unwrap();
    writer.add_dimension("frame", None).unwrap();
    writer
        .add_variable(&VarSchema::new("time", NcType::Double, &["frame"]))
        .unwrap();
    writer
        .write_frame(
            "time",
            0,
            &ArrayData::new(ArrayValues::Doubles(vec![0.0]), Vec::new()),
        )
        .unwrap();
    let err = writer.add_dimension("atom", Some(4)).unwrap_err();
    assert!(matches!(err, Error::DefineMode(_)));
}

#[test]
fn test_payload_shape_is_checked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shape.nc");
    let mut writer = NcWriter::create(&path, NcVersion::Classic).unwrap();
    writer.add_dimension("frame", None).unwrap();
    writer.add_dimension("atom", Some(2)).unwrap();
    writer
        .add_variable(&VarSchema::new("coordinates", NcType::Double, &["frame", "atom"]))
        .unwrap();
    // Three values into a two-atom record.
    let err = writer
        .write_frame(
            "coordinates",
            0,
            &ArrayData::new(ArrayValues::Doubles(vec![0.0, 1.0, 2.0]), vec![3]),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStructure(_)));
}

#[test]
fn test_frame_out_of_bounds() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bounds.nc");
    write_trajectory(&path, NcVersion::Classic);
    let reader = NcReader::open(&path).unwrap();
    let err = reader.read_frame("coordinates", 3).unwrap_err();
    assert!(matches!(err, Error::FrameOutOfBounds { index: 3, count: 3 }));
}
