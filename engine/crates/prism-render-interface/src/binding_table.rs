use prism_gfx::descriptors::{DescriptorHeapKind, DescriptorSlot};

use crate::handles::{BindingTableId, ResourceId};

/// 一段连续的描述符槽位，按顺序存放一组资源的 view
///
/// 绑定时只需要传入第一个槽位，shader 通过 table 内的偏移访问每一项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    name: String,
    heap: DescriptorHeapKind,
    first: DescriptorSlot,
    resources: Vec<ResourceId>,
}

impl BindingTable {
    pub(crate) fn new(name: &str, heap: DescriptorHeapKind, first: DescriptorSlot, resources: Vec<ResourceId>) -> Self {
        Self {
            name: name.to_string(),
            heap,
            first,
            resources,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn heap(&self) -> DescriptorHeapKind {
        self.heap
    }

    #[inline]
    pub fn first(&self) -> DescriptorSlot {
        self.first
    }

    /// table 中的资源，sampler table 为空
    #[inline]
    pub fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    /// 第 `n` 项所在的槽位
    #[inline]
    pub fn slot(&self, n: u32) -> DescriptorSlot {
        self.first.offset(n)
    }
}

#[derive(Debug, Default)]
pub(crate) struct BindingTables {
    tables: Vec<BindingTable>,
}

impl BindingTables {
    pub fn insert(&mut self, table: BindingTable) -> BindingTableId {
        let id = BindingTableId::new(self.tables.len() as u32);
        self.tables.push(table);
        id
    }

    pub fn get(&self, id: BindingTableId) -> &BindingTable {
        &self.tables[id.index() as usize]
    }

    pub fn find(&self, name: &str) -> Option<BindingTableId> {
        self.tables.iter().position(|t| t.name == name).map(|i| BindingTableId::new(i as u32))
    }
}
