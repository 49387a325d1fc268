use prism_gfx::descriptors::{DescriptorHeapKind, DescriptorSlot};
use prism_gfx::{GfxError, GfxResult};

use crate::config::DescriptorHeapConfig;

/// 单个描述符堆上的 bump 分配器
///
/// 只分配不释放，槽位在整个会话中不会复用；超过容量立即返回致命错误。
#[derive(Debug)]
pub struct DescriptorSlotAllocator {
    heap: DescriptorHeapKind,
    capacity: u32,
    next: u32,
}

// new & init
impl DescriptorSlotAllocator {
    pub fn new(heap: DescriptorHeapKind, capacity: u32) -> Self {
        Self { heap, capacity, next: 0 }
    }
}
// getters
impl DescriptorSlotAllocator {
    #[inline]
    pub fn heap(&self) -> DescriptorHeapKind {
        self.heap
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn used(&self) -> u32 {
        self.next
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.capacity - self.next
    }
}
// tools
impl DescriptorSlotAllocator {
    /// 分配 `count` 个连续的槽位，返回第一个
    pub fn reserve(&mut self, count: u32) -> GfxResult<DescriptorSlot> {
        if count == 0 {
            return Err(GfxError::InvalidState(format!("zero sized reservation in heap {:?}", self.heap)));
        }
        match self.next.checked_add(count) {
            Some(end) if end <= self.capacity => {
                let first = DescriptorSlot(self.next);
                self.next = end;
                Ok(first)
            }
            _ => {
                log::error!(
                    "descriptor heap {:?} exhausted: {} + {} > {}",
                    self.heap,
                    self.next,
                    count,
                    self.capacity
                );
                Err(GfxError::DescriptorHeapExhausted {
                    heap: self.heap,
                    requested: count,
                    used: self.next,
                    capacity: self.capacity,
                })
            }
        }
    }
}

/// 所有种类的描述符堆
#[derive(Debug)]
pub struct DescriptorHeaps {
    allocators: Vec<DescriptorSlotAllocator>,
}

impl DescriptorHeaps {
    pub fn new(config: &DescriptorHeapConfig) -> Self {
        let allocators =
            DescriptorHeapKind::ALL.iter().map(|kind| DescriptorSlotAllocator::new(*kind, config.capacity(*kind))).collect();
        Self { allocators }
    }

    #[inline]
    pub fn allocator(&self, heap: DescriptorHeapKind) -> &DescriptorSlotAllocator {
        &self.allocators[heap.index()]
    }

    #[inline]
    pub fn reserve(&mut self, heap: DescriptorHeapKind, count: u32) -> GfxResult<DescriptorSlot> {
        self.allocators[heap.index()].reserve(count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DescriptorSlotAllocator> {
        self.allocators.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_disjoint_and_gapless() {
        let counts = [1, 3, 1, 7, 2, 1, 5];
        let mut allocator = DescriptorSlotAllocator::new(DescriptorHeapKind::CbvSrvUav, 20);
        let mut covered = vec![false; 20];
        let mut expected_first = 0;
        for count in counts {
            let first = allocator.reserve(count).unwrap();
            assert_eq!(first.index(), expected_first);
            for slot in first.index()..first.index() + count {
                assert!(!covered[slot as usize], "slot {slot} handed out twice");
                covered[slot as usize] = true;
            }
            expected_first += count;
        }
        let total: u32 = counts.iter().sum();
        assert!(covered[..total as usize].iter().all(|c| *c));
        assert_eq!(allocator.used(), total);
    }

    #[test]
    fn test_exhaustion_is_fatal_and_does_not_advance() {
        let mut allocator = DescriptorSlotAllocator::new(DescriptorHeapKind::Sampler, 4);
        allocator.reserve(3).unwrap();
        let err = allocator.reserve(2).unwrap_err();
        assert!(matches!(
            err,
            GfxError::DescriptorHeapExhausted {
                heap: DescriptorHeapKind::Sampler,
                requested: 2,
                used: 3,
                capacity: 4
            }
        ));
        assert_eq!(allocator.used(), 3);
        // 再次越界依旧失败，不会回绕
        assert!(allocator.reserve(u32::MAX).is_err());
        assert_eq!(allocator.reserve(1).unwrap(), DescriptorSlot(3));
        assert!(allocator.reserve(1).is_err());
    }

    #[test]
    fn test_heaps_are_independent() {
        let mut heaps = DescriptorHeaps::new(&DescriptorHeapConfig::default());
        assert_eq!(heaps.reserve(DescriptorHeapKind::CbvSrvUav, 2).unwrap(), DescriptorSlot(0));
        assert_eq!(heaps.reserve(DescriptorHeapKind::CbvSrvUavShaderInvisible, 1).unwrap(), DescriptorSlot(0));
        assert_eq!(heaps.reserve(DescriptorHeapKind::CbvSrvUav, 1).unwrap(), DescriptorSlot(2));
        assert_eq!(heaps.allocator(DescriptorHeapKind::RenderTarget).capacity(), 50);
    }
}
