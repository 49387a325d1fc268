/// 一个 GPU 资源在整个进程中的标识
///
/// 单调递增，不会复用。`ResourceId(0)` 保留给 fallback 棋盘格纹理，注册表创建时就存在。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u32);

impl ResourceId {
    pub const FALLBACK: ResourceId = ResourceId(0);

    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_fallback(self) -> bool {
        self == Self::FALLBACK
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// binding table 的稳定下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingTableId(u32);

impl BindingTableId {
    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}
