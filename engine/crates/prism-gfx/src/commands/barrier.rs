use crate::basic::state::ResourceState;
use crate::resources::handles::GfxImageHandle;

/// image 的状态切换，作用于所有 subresource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxImageBarrier {
    pub image: GfxImageHandle,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl GfxImageBarrier {
    #[inline]
    pub fn new(image: GfxImageHandle) -> Self {
        Self {
            image,
            before: ResourceState::Undefined,
            after: ResourceState::Undefined,
        }
    }

    #[inline]
    pub fn state_transfer(mut self, before: ResourceState, after: ResourceState) -> Self {
        self.before = before;
        self.after = after;
        self
    }
}
