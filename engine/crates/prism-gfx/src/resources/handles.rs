use slotmap::new_key_type;

new_key_type! {
    /// 后端内部的 image 句柄
    pub struct GfxImageHandle;
    /// 后端内部的 buffer 句柄
    pub struct GfxBufferHandle;
    pub struct GfxPipelineHandle;
}
