use prism_gfx::basic::state::ResourceState;
use prism_gfx::commands::barrier::GfxImageBarrier;
use prism_gfx::commands::command_list::GfxCommandList;
use prism_gfx::resources::handles::GfxImageHandle;
use prism_gfx::{GfxBackend, GfxError, GfxResult};

use crate::frame_counter::FrameCounter;

/// 一帧（或一段上传命令流）所处的阶段
///
/// `Idle -> Recording -> Submitted -> Waiting -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Recording,
    Submitted,
    Waiting,
}

/// 当前命令流的用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// 只有资源上传，不涉及 swap target
    Upload,
    /// 渲染到 swap target 并呈现
    Frame,
}

/// 某次提交的 fence 已经完成的凭证
///
/// 只能由 [`FramePacer::wait`] / [`FramePacer::try_wait`] 产生。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCompletion {
    fence_value: u64,
}

impl FrameCompletion {
    #[inline]
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }
}

/// 命令流与 fence 的节奏控制
///
/// 同一时间最多只有一个提交在 GPU 上执行：上一次提交的 fence 完成前，不能开始录制下一段。
/// 每次提交 fence 值加 1。
pub struct FramePacer {
    state: FrameState,
    kind: StreamKind,
    commands: GfxCommandList,

    /// 最后一次 signal 的 fence 值
    fence_value: u64,
    swap_index: usize,
    /// 当前帧正在渲染的 swap target
    swap_target: Option<GfxImageHandle>,

    frame_counter: FrameCounter,
}

// new & init
impl FramePacer {
    pub fn new(backend: &dyn GfxBackend) -> GfxResult<Self> {
        Ok(Self {
            state: FrameState::Idle,
            kind: StreamKind::Upload,
            commands: GfxCommandList::default(),
            fence_value: backend.completed_value()?,
            swap_index: backend.current_swap_index(),
            swap_target: None,
            frame_counter: FrameCounter::new(0),
        })
    }
}
// getters
impl FramePacer {
    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    #[inline]
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// 最后一次 signal 的 fence 值
    #[inline]
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    /// 当前打开的命令流提交时会 signal 的值
    #[inline]
    pub fn pending_fence_value(&self) -> u64 {
        self.fence_value + 1
    }

    #[inline]
    pub fn swap_index(&self) -> usize {
        self.swap_index
    }

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_counter.frame_id()
    }

    /// 正在录制的命令流
    pub fn commands_mut(&mut self) -> GfxResult<&mut GfxCommandList> {
        if self.state != FrameState::Recording {
            return Err(GfxError::InvalidState(format!("no command stream is open (state {:?})", self.state)));
        }
        Ok(&mut self.commands)
    }
}
// state machine
impl FramePacer {
    fn expect_state(&self, expected: &[FrameState], action: &str) -> GfxResult<()> {
        if expected.contains(&self.state) {
            Ok(())
        } else {
            Err(GfxError::InvalidState(format!("can not {action} while {:?}", self.state)))
        }
    }

    /// Idle -> Recording，只用于上传资源
    pub fn begin_recording(&mut self, name: &str) -> GfxResult<()> {
        self.expect_state(&[FrameState::Idle], "begin recording")?;
        self.commands.reset(format!("{name} {}", self.frame_counter.frame_name()));
        self.kind = StreamKind::Upload;
        self.swap_target = None;
        self.state = FrameState::Recording;
        Ok(())
    }

    /// Idle -> Recording，首先记录 swap target 的 present -> render target 切换
    pub fn begin_frame(&mut self, backend: &dyn GfxBackend) -> GfxResult<GfxImageHandle> {
        let _span = tracy_client::span!("FramePacer::begin_frame");
        self.expect_state(&[FrameState::Idle], "begin frame")?;

        let target = *backend
            .swap_targets()
            .get(self.swap_index)
            .ok_or_else(|| GfxError::InvalidState(format!("swap index {} out of range", self.swap_index)))?;

        self.commands.reset(format!("frame {}", self.frame_counter.frame_name()));
        self.commands
            .image_barrier(GfxImageBarrier::new(target).state_transfer(ResourceState::Present, ResourceState::RenderTarget));
        self.kind = StreamKind::Frame;
        self.swap_target = Some(target);
        self.state = FrameState::Recording;
        Ok(target)
    }

    /// Recording -> Submitted
    ///
    /// 提交命令流并 signal `fence_value + 1`；如果是渲染帧，之后呈现。返回 signal 的值。
    pub fn submit(&mut self, backend: &mut dyn GfxBackend) -> GfxResult<u64> {
        let _span = tracy_client::span!("FramePacer::submit");
        self.expect_state(&[FrameState::Recording], "submit")?;

        if let (StreamKind::Frame, Some(target)) = (self.kind, self.swap_target) {
            self.commands
                .image_barrier(GfxImageBarrier::new(target).state_transfer(ResourceState::RenderTarget, ResourceState::Present));
        }

        let signal_value = self.fence_value + 1;
        backend.submit(&self.commands, signal_value).inspect_err(|e| {
            log::error!("submission of '{}' failed: {e}", self.commands.name());
        })?;
        self.fence_value = signal_value;
        self.state = FrameState::Submitted;

        if self.kind == StreamKind::Frame {
            backend.present()?;
        }
        Ok(signal_value)
    }

    /// Submitted -> Waiting -> Idle，阻塞直到 GPU 完成最后一次提交
    pub fn wait(&mut self, backend: &dyn GfxBackend) -> GfxResult<FrameCompletion> {
        let _span = tracy_client::span!("FramePacer::wait");
        self.expect_state(&[FrameState::Submitted, FrameState::Waiting], "wait")?;

        self.state = FrameState::Waiting;
        if backend.completed_value()? < self.fence_value {
            backend.wait_for_value(self.fence_value)?;
        }
        Ok(self.finish(backend))
    }

    /// 非阻塞版本的 [`Self::wait`]，GPU 还没完成时返回 `None` 并停留在 Waiting
    pub fn try_wait(&mut self, backend: &dyn GfxBackend) -> GfxResult<Option<FrameCompletion>> {
        self.expect_state(&[FrameState::Submitted, FrameState::Waiting], "poll")?;

        self.state = FrameState::Waiting;
        if backend.completed_value()? < self.fence_value {
            return Ok(None);
        }
        Ok(Some(self.finish(backend)))
    }

    /// Waiting -> Idle：刷新 swap index
    fn finish(&mut self, backend: &dyn GfxBackend) -> FrameCompletion {
        self.swap_index = backend.current_swap_index();
        self.swap_target = None;
        self.state = FrameState::Idle;
        if self.kind == StreamKind::Frame {
            self.frame_counter.next_frame();
        }
        FrameCompletion {
            fence_value: self.fence_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_gfx::headless::{HeadlessBackend, HeadlessCompletion, HeadlessConfig};

    fn manual() -> HeadlessBackend {
        HeadlessBackend::new(HeadlessConfig {
            completion: HeadlessCompletion::Manual,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_state_machine_order() {
        let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
        let mut pacer = FramePacer::new(&backend).unwrap();
        assert_eq!(pacer.state(), FrameState::Idle);

        assert!(pacer.submit(&mut backend).is_err());
        assert!(pacer.wait(&backend).is_err());
        assert!(pacer.commands_mut().is_err());

        pacer.begin_recording("upload").unwrap();
        assert!(pacer.begin_recording("again").is_err());
        assert_eq!(pacer.submit(&mut backend).unwrap(), 1);
        assert_eq!(pacer.state(), FrameState::Submitted);
        assert!(pacer.begin_frame(&backend).is_err());

        let completion = pacer.wait(&backend).unwrap();
        assert_eq!(completion.fence_value(), 1);
        assert_eq!(pacer.state(), FrameState::Idle);
    }

    #[test]
    fn test_frame_rotates_swap_index() {
        let mut backend = HeadlessBackend::new(HeadlessConfig::default()).unwrap();
        let mut pacer = FramePacer::new(&backend).unwrap();

        for frame in 0..4u64 {
            let target = pacer.begin_frame(&backend).unwrap();
            assert_eq!(target, backend.swap_targets()[(frame % 2) as usize]);
            assert_eq!(pacer.submit(&mut backend).unwrap(), frame + 1);
            pacer.wait(&backend).unwrap();
            assert_eq!(pacer.swap_index(), ((frame + 1) % 2) as usize);
            assert_eq!(backend.image_state(target), Some(ResourceState::Present));
        }
        assert_eq!(pacer.frame_id(), 4);
        assert_eq!(backend.stats().presents, 4);
    }

    #[test]
    fn test_try_wait_polls_until_signal() {
        let mut backend = manual();
        let control = backend.control();
        let mut pacer = FramePacer::new(&backend).unwrap();

        pacer.begin_recording("upload").unwrap();
        pacer.submit(&mut backend).unwrap();
        assert_eq!(pacer.try_wait(&backend).unwrap(), None);
        assert_eq!(pacer.state(), FrameState::Waiting);
        assert_eq!(pacer.try_wait(&backend).unwrap(), None);

        control.complete_up_to(1);
        let completion = pacer.try_wait(&backend).unwrap().unwrap();
        assert_eq!(completion.fence_value(), 1);
        assert_eq!(pacer.state(), FrameState::Idle);
    }

    #[test]
    fn test_wait_blocks_until_other_thread_signals() {
        let mut backend = manual();
        let control = backend.control();
        let mut pacer = FramePacer::new(&backend).unwrap();

        pacer.begin_recording("upload").unwrap();
        pacer.submit(&mut backend).unwrap();

        let gpu = std::thread::spawn(move || {
            control.wait_for_submission(1);
            std::thread::sleep(std::time::Duration::from_millis(30));
            control.complete_up_to(1);
        });
        let completion = pacer.wait(&backend).unwrap();
        assert_eq!(completion.fence_value(), 1);
        assert_eq!(backend.completed_value().unwrap(), 1);
        gpu.join().unwrap();
    }
}
