use prism_app::app::run;
use prism_app::config::{AppConfig, ModelEntry};
use prism_gfx::headless::HeadlessBackend;

const TRIANGLE: &str = "\
o tri
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";

#[test]
fn test_default_config_draws_a_sphere() {
    let config = AppConfig {
        frames: 2,
        ..Default::default()
    };
    let summary = run(HeadlessBackend::new(config.headless_config()).unwrap(), &config).unwrap();

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.draws, 2);
    // 一次启动上传加两帧
    assert_eq!(summary.fence_value, 3);
    assert!(summary.staging_released > 0);
    assert_eq!(summary.uav_clears, 2);
}

#[test]
fn test_missing_model_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let obj = dir.path().join("tri.obj");
    std::fs::write(&obj, TRIANGLE).unwrap();

    let config = AppConfig {
        frames: 1,
        models: vec![
            ModelEntry {
                path: obj,
                ..Default::default()
            },
            ModelEntry {
                path: dir.path().join("missing.obj"),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let summary = run(HeadlessBackend::new(config.headless_config()).unwrap(), &config).unwrap();
    assert_eq!(summary.draws, 1);
}

#[test]
fn test_split_sum_table_is_loaded_once_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let lut = dir.path().join("splitsum.png");
    image::RgbaImage::from_pixel(8, 8, image::Rgba([200, 100, 0, 255])).save(&lut).unwrap();

    let base = AppConfig {
        frames: 3,
        ..Default::default()
    };
    let without = run(HeadlessBackend::new(base.headless_config()).unwrap(), &base).unwrap();

    let config = AppConfig {
        split_sum: Some(lut),
        ..base.clone()
    };
    let summary = run(HeadlessBackend::new(config.headless_config()).unwrap(), &config).unwrap();
    assert_eq!(summary.resources, without.resources + 1);
    assert_eq!(summary.uav_clears, 3);
    assert_eq!(summary.frames, 3);
}

#[test]
fn test_missing_split_sum_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        frames: 1,
        split_sum: Some(dir.path().join("missing.png")),
        ..Default::default()
    };
    let summary = run(HeadlessBackend::new(config.headless_config()).unwrap(), &config).unwrap();
    assert_eq!(summary.frames, 1);
    assert_eq!(summary.uav_clears, 1);
}
