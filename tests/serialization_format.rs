//! Byte-level checks of the serialized grid format.

use cgmath::Point3;
use sparse_voxel_grid::serialization::{self, ByteOrder, LeafEncoding, FORMAT_VERSION, HEADER_LEN};
use sparse_voxel_grid::{FormatError, GridConfig, VoxelGrid};

fn tiny_config() -> GridConfig {
    // 2 inner bits over 1 level with 1 leaf bit: a 4x4x4 root over 2x2x2 leaves.
    GridConfig {
        resolution: 0.5,
        depth: 1,
        inner_bits: 2,
        leaf_bits: 1,
    }
}

#[test]
fn test_header_fields() {
    let grid: VoxelGrid<u32> = VoxelGrid::with_config(&tiny_config()).unwrap();
    let bytes = serialization::serialize(&grid);

    assert_eq!(&bytes[0..4], b"SVXG");
    assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
    assert_eq!(bytes[6], ByteOrder::host() as u8);
    assert_eq!(&bytes[7..10], &[1, 2, 1]);
    assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), 4);

    let header = serialization::read_header(&bytes).unwrap();
    assert_eq!(header.resolution, 0.5);
    assert_eq!(header.leaf_count, 0);
    assert_eq!(header.config(), tiny_config());
}

#[test]
fn test_exact_body_layout() {
    let mut grid: VoxelGrid<u8> = VoxelGrid::with_config(&tiny_config()).unwrap();
    // Biased coordinates are offset by 4; (-4, -4, -4) is slot 0, local cell 0.
    grid.set(Point3::new(-4, -4, -4), 9).unwrap();
    let bytes = serialization::serialize(&grid);

    let body = &bytes[HEADER_LEN..];
    let mut expected = vec![0u8; 8];
    expected[0] = 0b0000_0001;
    // A single non-default cell in eight: dense is 8 bytes, runs are 4 + 2 * 5.
    expected.push(LeafEncoding::Dense as u8);
    expected.extend_from_slice(&[9, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(body, expected.as_slice());
}

#[test]
fn test_uniform_leaf_layout() {
    let mut grid: VoxelGrid<u8> = VoxelGrid::with_config(&tiny_config()).unwrap();
    for x in 2..4 {
        for y in 2..4 {
            for z in 2..4 {
                grid.set(Point3::new(x, y, z), 3).unwrap();
            }
        }
    }
    let bytes = serialization::serialize(&grid);
    let body = &bytes[HEADER_LEN..];
    // Biased (6, 6, 6) lies in child (3, 3, 3): slot 3 + 12 + 48 = 63.
    assert_eq!(body[7], 0b1000_0000);
    assert_eq!(&body[8..], &[LeafEncoding::Uniform as u8, 3]);
}

#[test]
fn test_bad_magic() {
    let mut bytes = serialization::serialize(&VoxelGrid::<u8>::new(1.0));
    bytes[0] = b'X';
    assert!(matches!(
        serialization::deserialize::<u8>(&bytes),
        Err(FormatError::BadMagic { found }) if &found == b"XVXG"
    ));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = serialization::serialize(&VoxelGrid::<u8>::new(1.0));
    bytes[4..6].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    assert!(matches!(
        serialization::deserialize::<u8>(&bytes),
        Err(FormatError::UnsupportedVersion { found, supported }) if found == FORMAT_VERSION + 1 && supported == FORMAT_VERSION
    ));
}

#[test]
fn test_foreign_byte_order() {
    let mut bytes = serialization::serialize(&VoxelGrid::<u8>::new(1.0));
    bytes[6] = match ByteOrder::host() {
        ByteOrder::Little => ByteOrder::Big as u8,
        ByteOrder::Big => ByteOrder::Little as u8,
    };
    assert!(matches!(
        serialization::deserialize::<u8>(&bytes),
        Err(FormatError::ByteOrderMismatch)
    ));
}

#[test]
fn test_unknown_leaf_tag() {
    let mut grid: VoxelGrid<u8> = VoxelGrid::with_config(&tiny_config()).unwrap();
    grid.set(Point3::new(0, 0, 0), 1).unwrap();
    let mut bytes = serialization::serialize(&grid);
    bytes[HEADER_LEN + 8] = 7;
    assert!(matches!(
        serialization::deserialize::<u8>(&bytes),
        Err(FormatError::UnknownLeafEncoding(7))
    ));
}

#[test]
fn test_all_default_leaf_rejected() {
    let mut grid: VoxelGrid<u8> = VoxelGrid::with_config(&tiny_config()).unwrap();
    grid.set(Point3::new(-4, -4, -4), 9).unwrap();
    let mut bytes = serialization::serialize(&grid);
    bytes[HEADER_LEN + 9] = 0;
    assert!(matches!(
        serialization::deserialize::<u8>(&bytes),
        Err(FormatError::EmptyLeaf { offset }) if offset == HEADER_LEN + 8
    ));
}

#[test]
fn test_run_lengths_must_cover_block() {
    let mut bytes = serialization::serialize(&VoxelGrid::<u8>::with_config(&tiny_config()).unwrap());
    bytes[20] = 1;
    let mut body = vec![0u8; 8];
    body[0] = 1;
    body.push(LeafEncoding::RunLength as u8);
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend_from_slice(&5u32.to_le_bytes());
    body.push(4);
    bytes.extend_from_slice(&body);

    assert!(matches!(
        serialization::deserialize::<u8>(&bytes),
        Err(FormatError::RunLengthMismatch { covered: 5, expected: 8 })
    ));
}

#[test]
fn test_every_prefix_fails() {
    let mut grid: VoxelGrid<i16> = VoxelGrid::new(0.1);
    for i in 0..40 {
        grid.set(Point3::new(i * 3, -i, i % 5), i as i16 - 20).unwrap();
    }
    let bytes = serialization::serialize(&grid);
    for len in 0..bytes.len() {
        assert!(serialization::deserialize::<i16>(&bytes[..len]).is_err());
    }
    let restored: VoxelGrid<i16> = serialization::deserialize(&bytes).unwrap();
    assert_eq!(restored, grid);
}
