use std::path::Path;

use prism_asset::AssetError;
use prism_asset::cubemap::{CubeFace, decode_cubemap, face_path};

fn write_faces(dir: &Path, size: u32, mips: u32) -> String {
    let pattern = dir.join("sky{mip}{face}.png").to_string_lossy().to_string();
    for (i, face) in CubeFace::ALL.iter().enumerate() {
        for mip in 0..mips {
            let s = (size >> mip).max(1);
            let color = image::Rgba([i as u8 * 40, mip as u8 * 50, 7, 255]);
            image::RgbaImage::from_pixel(s, s, color).save(face_path(&pattern, *face, mip)).unwrap();
        }
    }
    pattern
}

#[test]
fn test_decode_all_faces() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = write_faces(dir.path(), 8, 2);

    let cube = decode_cubemap(&pattern, 2).unwrap();
    assert_eq!(cube.dimensions(), (8, 8));
    assert_eq!(cube.mip_count(), 2);
    assert_eq!(cube.face(3, 1).dimensions(), (4, 4));
    assert_eq!(cube.face(3, 1).pixel(0, 0), [120, 50, 7, 255]);
    assert_eq!(cube.iter().count(), 12);
}

#[test]
fn test_missing_face_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = write_faces(dir.path(), 8, 1);
    std::fs::remove_file(face_path(&pattern, CubeFace::Front, 0)).unwrap();

    let err = decode_cubemap(&pattern, 1).unwrap_err();
    assert!(matches!(err, AssetError::NotFound(_)));
}

#[test]
fn test_face_size_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = write_faces(dir.path(), 8, 1);
    image::RgbaImage::new(4, 4).save(face_path(&pattern, CubeFace::Down, 0)).unwrap();

    match decode_cubemap(&pattern, 1) {
        Err(AssetError::CubemapFaceMismatch { face, width, .. }) => {
            assert_eq!(face, "Down");
            assert_eq!(width, 4);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_mip_level_of_wrong_size_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = write_faces(dir.path(), 8, 2);
    // 六个面的 mip 1 尺寸一致，但都没有缩小
    for face in CubeFace::ALL {
        image::RgbaImage::new(8, 8).save(face_path(&pattern, face, 1)).unwrap();
    }

    match decode_cubemap(&pattern, 2) {
        Err(AssetError::CubemapFaceMismatch { mip, face, expected_width, width, .. }) => {
            assert_eq!(mip, 1);
            assert_eq!(face, "Right");
            assert_eq!(expected_width, 4);
            assert_eq!(width, 8);
        }
        other => panic!("unexpected {other:?}"),
    }
}
