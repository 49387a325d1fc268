/// 资源在 GPU 上的使用状态
///
/// 每次状态切换都需要在命令流中记录一个 barrier，`before` 必须和资源当前的状态一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// 刚创建，内容未定义
    Undefined,
    CopyDest,
    CopySrc,
    /// 着色器只读（SRV）
    ShaderRead,
    /// 读写（UAV）
    UnorderedAccess,
    RenderTarget,
    DepthWrite,
    /// 交给呈现引擎
    Present,
}
