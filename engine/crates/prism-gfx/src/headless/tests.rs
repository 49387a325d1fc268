use super::*;
use crate::commands::barrier::GfxImageBarrier;
use crate::commands::command_list::{GfxAttachment, GfxBufferImageCopy, GfxRenderingInfo};

fn upload_list(buffer: GfxBufferHandle, image: GfxImageHandle, width: u32, height: u32) -> GfxCommandList {
    let mut list = GfxCommandList::new("upload");
    list.image_barrier(GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::CopyDest));
    list.copy_buffer_to_image(
        buffer,
        image,
        GfxBufferImageCopy {
            buffer_offset: 0,
            mip_level: 0,
            array_layer: 0,
            width,
            height,
        },
    );
    list.image_barrier(GfxImageBarrier::new(image).state_transfer(ResourceState::CopyDest, ResourceState::ShaderRead));
    list
}

fn manual_backend() -> HeadlessBackend {
    HeadlessBackend::new(HeadlessConfig {
        completion: HeadlessCompletion::Manual,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn test_swap_targets_start_in_present() {
    let backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    assert_eq!(backend.swap_targets().len(), 2);
    for image in backend.swap_targets() {
        assert_eq!(backend.image_state(*image), Some(ResourceState::Present));
    }
}

#[test]
fn test_upload_copies_pixels() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let image = backend.create_image(&GfxImageDesc::texture_2d(2, 2, GfxFormat::Rgba8Unorm, 1), "tex").unwrap();
    let buffer = backend.create_buffer(&GfxBufferDesc::staging(16), "staging").unwrap();
    let pixels: Vec<u8> = (0..16).collect();
    backend.write_buffer(buffer, 0, &pixels).unwrap();

    backend.submit(&upload_list(buffer, image, 2, 2), 1).unwrap();

    assert_eq!(backend.read_image(image, 0, 0).unwrap(), pixels.as_slice());
    assert_eq!(backend.image_state(image), Some(ResourceState::ShaderRead));
    assert_eq!(backend.completed_value().unwrap(), 1);
    assert_eq!(backend.stats().copies, 1);
}

#[test]
fn test_barrier_state_mismatch_rejects_whole_list() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let image = backend.create_image(&GfxImageDesc::texture_2d(2, 2, GfxFormat::Rgba8Unorm, 1), "tex").unwrap();

    let mut list = GfxCommandList::new("bad");
    list.image_barrier(GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::CopyDest));
    // 状态应该是 CopyDest
    list.image_barrier(GfxImageBarrier::new(image).state_transfer(ResourceState::Undefined, ResourceState::ShaderRead));

    let err = backend.submit(&list, 1).unwrap_err();
    assert!(matches!(err, GfxError::InvalidCommand { index: 1, .. }));
    // 第一条 barrier 也没有生效
    assert_eq!(backend.image_state(image), Some(ResourceState::Undefined));
    assert_eq!(backend.control().submitted_value(), 0);
}

#[test]
fn test_copy_requires_copy_dest() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    let image = backend.create_image(&GfxImageDesc::texture_2d(2, 2, GfxFormat::Rgba8Unorm, 1), "tex").unwrap();
    let buffer = backend.create_buffer(&GfxBufferDesc::staging(16), "staging").unwrap();

    let mut list = GfxCommandList::new("bad-copy");
    list.copy_buffer_to_image(
        buffer,
        image,
        GfxBufferImageCopy {
            buffer_offset: 0,
            mip_level: 0,
            array_layer: 0,
            width: 2,
            height: 2,
        },
    );
    assert!(backend.submit(&list, 1).is_err());
}

#[test]
fn test_in_flight_buffer_can_not_be_destroyed() {
    let mut backend = manual_backend();
    let image = backend.create_image(&GfxImageDesc::texture_2d(2, 2, GfxFormat::Rgba8Unorm, 1), "tex").unwrap();
    let buffer = backend.create_buffer(&GfxBufferDesc::staging(16), "staging").unwrap();
    backend.submit(&upload_list(buffer, image, 2, 2), 1).unwrap();

    assert_eq!(backend.completed_value().unwrap(), 0);
    assert!(matches!(backend.destroy_buffer(buffer), Err(GfxError::ResourceInFlight(_))));

    backend.control().complete_up_to(1);
    backend.destroy_buffer(buffer).unwrap();
    assert_eq!(backend.stats().buffers_destroyed, 1);
}

#[test]
fn test_fence_values_must_increase() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    backend.submit(&GfxCommandList::new("a"), 1).unwrap();
    assert!(matches!(backend.submit(&GfxCommandList::new("b"), 1), Err(GfxError::Submission(_))));
    backend.submit(&GfxCommandList::new("c"), 2).unwrap();
    assert_eq!(backend.completed_value().unwrap(), 2);
}

#[test]
fn test_wait_for_unsubmitted_value_is_error() {
    let backend = manual_backend();
    assert!(backend.wait_for_value(1).is_err());
}

#[test]
fn test_wait_idle_drains_manual_gpu() {
    let mut backend = manual_backend();
    backend.submit(&GfxCommandList::new("a"), 1).unwrap();
    backend.submit(&GfxCommandList::new("b"), 2).unwrap();
    assert_eq!(backend.completed_value().unwrap(), 0);
    backend.wait_idle().unwrap();
    assert_eq!(backend.completed_value().unwrap(), 2);
}

#[test]
fn test_present_requires_present_state() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    backend.create_descriptor_heap(DescriptorHeapKind::RenderTarget, 4).unwrap();
    let target = backend.swap_targets()[0];
    let format = backend.swap_target_format();
    backend
        .write_descriptor(
            DescriptorHeapKind::RenderTarget,
            DescriptorSlot(0),
            &GfxViewDesc::RenderTarget { image: target, format },
        )
        .unwrap();

    let mut list = GfxCommandList::new("frame");
    list.image_barrier(GfxImageBarrier::new(target).state_transfer(ResourceState::Present, ResourceState::RenderTarget));
    list.begin_rendering(GfxRenderingInfo {
        color: GfxAttachment {
            image: target,
            view: DescriptorSlot(0),
        },
        depth: None,
        clear_color: Some([1.0, 0.0, 0.0, 1.0]),
        clear_depth: None,
        extent: backend.swap_extent(),
    });
    list.end_rendering();
    backend.submit(&list, 1).unwrap();

    // 没有切回 Present 就呈现
    assert!(backend.present().is_err());
    assert_eq!(&backend.read_image(target, 0, 0).unwrap()[..4], &[0, 0, 255, 255]);

    let mut list = GfxCommandList::new("finish");
    list.image_barrier(GfxImageBarrier::new(target).state_transfer(ResourceState::RenderTarget, ResourceState::Present));
    backend.submit(&list, 2).unwrap();
    backend.present().unwrap();
    assert_eq!(backend.current_swap_index(), 1);
}

#[test]
fn test_descriptor_heap_bounds() {
    let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
    backend.create_descriptor_heap(DescriptorHeapKind::Sampler, 1).unwrap();
    let sampler = GfxViewDesc::Sampler(Default::default());
    backend.write_descriptor(DescriptorHeapKind::Sampler, DescriptorSlot(0), &sampler).unwrap();
    assert!(backend.write_descriptor(DescriptorHeapKind::Sampler, DescriptorSlot(1), &sampler).is_err());
    assert!(backend.create_descriptor_heap(DescriptorHeapKind::Sampler, 1).is_err());
}
