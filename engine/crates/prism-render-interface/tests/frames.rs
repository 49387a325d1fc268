use std::path::Path;

use prism_gfx::headless::{HeadlessBackend, HeadlessCompletion, HeadlessConfig};
use prism_render_interface::config::RenderConfig;
use prism_render_interface::frame_pacer::FrameState;
use prism_render_interface::render_context::RenderContext;
use prism_render_interface::resource_registry::TextureLoadOptions;

fn context(completion: HeadlessCompletion) -> RenderContext<HeadlessBackend> {
    let backend = HeadlessBackend::new(HeadlessConfig {
        completion,
        ..Default::default()
    })
    .unwrap();
    RenderContext::new(
        backend,
        RenderConfig {
            fallback_texture_size: 16,
            ..Default::default()
        },
    )
    .unwrap()
}

fn write_png(path: &Path) {
    image::RgbaImage::from_pixel(8, 8, image::Rgba([9, 9, 9, 255])).save(path).unwrap();
}

#[test]
fn test_zero_draw_frame_advances_fence_by_one() {
    let mut ctx = context(HeadlessCompletion::Immediate);
    assert_eq!(ctx.end_frame().unwrap().fence_value(), 1);

    let target = ctx.begin_frame().unwrap();
    assert_eq!(target.resource, ctx.swap_targets()[0]);
    assert_eq!(ctx.submit().unwrap(), 2);
    assert_eq!(ctx.wait().unwrap().fence_value(), 2);

    assert_eq!(ctx.pacer().fence_value(), 2);
    assert_eq!(ctx.backend().stats().presents, 1);
    assert_eq!(ctx.backend().stats().draws, 0);
}

#[test]
fn test_frames_rotate_swap_targets() {
    let mut ctx = context(HeadlessCompletion::Immediate);
    ctx.end_frame().unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(ctx.begin_frame().unwrap().resource);
        ctx.end_frame().unwrap();
    }
    let targets = ctx.swap_targets().to_vec();
    assert_eq!(seen, vec![targets[0], targets[1], targets[0], targets[1]]);
    assert_eq!(ctx.pacer().frame_id(), 4);
}

#[test]
fn test_next_frame_waits_for_previous_submission() {
    let mut ctx = context(HeadlessCompletion::Manual);
    ctx.submit().unwrap();

    assert_eq!(ctx.pacer().state(), FrameState::Submitted);
    assert!(ctx.begin_frame().is_err());
    assert!(ctx.begin_upload("second").is_err());

    ctx.backend().control().complete_all();
    ctx.wait().unwrap();
    assert!(ctx.begin_frame().is_ok());
}

#[test]
fn test_staging_survives_until_fence_signals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tex.png");
    write_png(&path);

    let mut ctx = context(HeadlessCompletion::Manual);
    ctx.load_texture(&path, TextureLoadOptions::COLOR).unwrap();
    let staged: Vec<_> = ctx.staging().pending().iter().map(|e| e.buffer).collect();
    assert_eq!(staged.len(), 2);

    let signal = ctx.submit().unwrap();
    assert_eq!(signal, 1);

    // GPU 还没有完成
    assert!(ctx.poll().unwrap().is_none());
    assert_eq!(ctx.staging().pending_count(), 2);
    assert!(staged.iter().all(|b| ctx.backend().contains_buffer(*b)));

    let control = ctx.backend().control();
    let signaler = std::thread::spawn(move || {
        control.wait_for_submission(signal);
        control.complete_up_to(signal);
    });
    let completion = ctx.wait().unwrap();
    signaler.join().unwrap();

    assert_eq!(completion.fence_value(), 1);
    assert_eq!(ctx.staging().pending_count(), 0);
    assert_eq!(ctx.staging().released_total(), 2);
    assert!(staged.iter().all(|b| !ctx.backend().contains_buffer(*b)));
}

#[test]
fn test_later_stream_staging_waits_for_its_own_fence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.png");
    write_png(&path);

    let mut ctx = context(HeadlessCompletion::Manual);
    let control = ctx.backend().control();
    assert_eq!(ctx.submit().unwrap(), 1);
    control.complete_up_to(1);
    ctx.wait().unwrap();
    assert_eq!(ctx.staging().pending_count(), 0);

    ctx.begin_upload("late-upload").unwrap();
    ctx.load_texture(&path, TextureLoadOptions::LINEAR_NO_MIPS).unwrap();
    let entry = ctx.staging().pending()[0];
    assert_eq!(entry.submission, 2);
    assert_eq!(entry.size, 8 * 8 * 4);

    assert_eq!(ctx.submit().unwrap(), 2);
    assert!(ctx.poll().unwrap().is_none());
    assert_eq!(ctx.staging().pending_count(), 1);
    assert!(ctx.backend().contains_buffer(entry.buffer));

    control.complete_up_to(2);
    assert_eq!(ctx.poll().unwrap().map(|c| c.fence_value()), Some(2));
    assert_eq!(ctx.staging().pending_count(), 0);
    assert!(!ctx.backend().contains_buffer(entry.buffer));
}
