use prism_gfx::resources::handles::GfxBufferHandle;
use prism_gfx::{GfxBackend, GfxResult};

use crate::frame_pacer::FrameCompletion;

/// 一个尚未释放的 staging buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingEntry {
    pub buffer: GfxBufferHandle,
    pub size: u64,
    /// 创建顺序
    pub order: u64,
    /// 引用它的命令流提交时 signal 的 fence 值
    pub submission: u64,
}

/// staging buffer 的生命周期跟踪
///
/// buffer 只在引用它的命令流的 fence 完成之后才会释放。
/// 释放需要 [`FrameCompletion`]，它只能由 `FramePacer::wait` 产生，因此释放不可能早于等待。
#[derive(Debug, Default)]
pub struct StagingTracker {
    pending: Vec<StagingEntry>,
    next_order: u64,
    released_total: u64,
}

// getters
impl StagingTracker {
    #[inline]
    pub fn pending(&self) -> &[StagingEntry] {
        &self.pending
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_bytes(&self) -> u64 {
        self.pending.iter().map(|e| e.size).sum()
    }

    #[inline]
    pub fn contains(&self, buffer: GfxBufferHandle) -> bool {
        self.pending.iter().any(|e| e.buffer == buffer)
    }

    #[inline]
    pub fn released_total(&self) -> u64 {
        self.released_total
    }
}
// tools
impl StagingTracker {
    pub fn track(&mut self, buffer: GfxBufferHandle, size: u64, submission: u64) {
        self.pending.push(StagingEntry {
            buffer,
            size,
            order: self.next_order,
            submission,
        });
        self.next_order += 1;
    }

    /// 释放 fence 已经完成的 staging buffer，返回释放的数量
    pub fn release_completed(&mut self, backend: &mut dyn GfxBackend, completion: &FrameCompletion) -> GfxResult<usize> {
        let _span = tracy_client::span!("StagingTracker::release_completed");

        let fence_value = completion.fence_value();
        let mut to_release = Vec::new();
        self.pending.retain(|entry| {
            if entry.submission <= fence_value {
                to_release.push(*entry);
                false
            } else {
                true
            }
        });
        self.destroy_entries(backend, to_release)
    }

    /// 设备空闲之后释放全部
    pub(crate) fn release_all_after_idle(&mut self, backend: &mut dyn GfxBackend) -> GfxResult<usize> {
        let entries = std::mem::take(&mut self.pending);
        self.destroy_entries(backend, entries)
    }

    /// 销毁失败的 buffer 放回队列，下次释放时重试；返回第一个错误
    fn destroy_entries(&mut self, backend: &mut dyn GfxBackend, entries: Vec<StagingEntry>) -> GfxResult<usize> {
        let mut released = 0;
        let mut first_error = None;
        for entry in entries {
            match backend.destroy_buffer(entry.buffer) {
                Ok(()) => released += 1,
                Err(e) => {
                    log::error!("failed to release staging buffer #{} ({} bytes): {e}", entry.order, entry.size);
                    self.pending.push(entry);
                    first_error.get_or_insert(e);
                }
            }
        }
        self.released_total += released as u64;
        if first_error.is_some() {
            self.pending.sort_by_key(|e| e.order);
        }
        if released > 0 {
            log::debug!("released {released} staging buffers, {} still pending", self.pending.len());
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(released),
        }
    }
}
