use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct TimelineState {
    /// 已经提交到队列的最大 signal 值
    submitted: u64,
    /// "GPU" 已经完成的值
    completed: u64,
}

/// 模拟的 timeline fence
#[derive(Debug, Default)]
pub(crate) struct HeadlessTimeline {
    state: Mutex<TimelineState>,
    cond: Condvar,
}

impl HeadlessTimeline {
    fn lock(&self) -> MutexGuard<'_, TimelineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.lock().submitted
    }

    pub(crate) fn completed(&self) -> u64 {
        self.lock().completed
    }

    pub(crate) fn mark_submitted(&self, value: u64) {
        let mut state = self.lock();
        state.submitted = state.submitted.max(value);
        self.cond.notify_all();
    }

    /// 完成到 `value` 为止的所有提交；不会超过已提交的值
    pub(crate) fn complete_up_to(&self, value: u64) {
        let mut state = self.lock();
        let target = value.min(state.submitted);
        if target > state.completed {
            state.completed = target;
            self.cond.notify_all();
        }
    }

    pub(crate) fn wait_completed(&self, value: u64) {
        let mut state = self.lock();
        while state.completed < value {
            state = self.cond.wait(state).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub(crate) fn wait_submitted(&self, value: u64) {
        let mut state = self.lock();
        while state.submitted < value {
            state = self.cond.wait(state).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

/// 从外部（通常是另一个线程）推进模拟 GPU 的句柄
///
/// 只在 [`super::HeadlessCompletion::Manual`] 模式下有意义：提交的命令只有在这里被
/// complete 之后，fence 才会前进。
#[derive(Debug, Clone)]
pub struct HeadlessGpuControl {
    pub(crate) timeline: Arc<HeadlessTimeline>,
}

impl HeadlessGpuControl {
    /// GPU 完成 signal 值不超过 `value` 的所有提交
    pub fn complete_up_to(&self, value: u64) {
        self.timeline.complete_up_to(value);
    }

    /// GPU 完成所有已提交的工作
    pub fn complete_all(&self) {
        let submitted = self.timeline.submitted();
        self.timeline.complete_up_to(submitted);
    }

    pub fn completed_value(&self) -> u64 {
        self.timeline.completed()
    }

    pub fn submitted_value(&self) -> u64 {
        self.timeline.submitted()
    }

    /// 阻塞直到有 signal 值不小于 `value` 的提交
    pub fn wait_for_submission(&self, value: u64) {
        self.timeline.wait_submitted(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_complete_is_clamped_to_submitted() {
        let timeline = HeadlessTimeline::default();
        timeline.mark_submitted(2);
        timeline.complete_up_to(5);
        assert_eq!(timeline.completed(), 2);
    }

    #[test]
    fn test_wait_wakes_on_signal() {
        let control = HeadlessGpuControl {
            timeline: Arc::new(HeadlessTimeline::default()),
        };
        control.timeline.mark_submitted(1);

        let signaler = control.clone();
        let handle = thread::spawn(move || {
            signaler.wait_for_submission(1);
            thread::sleep(std::time::Duration::from_millis(20));
            signaler.complete_all();
        });

        control.timeline.wait_completed(1);
        assert_eq!(control.completed_value(), 1);
        handle.join().unwrap();
    }
}
