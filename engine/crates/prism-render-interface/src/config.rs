use prism_gfx::descriptors::DescriptorHeapKind;
use serde::Deserialize;

/// 每种描述符堆的容量
///
/// 启动时确定，运行期间不会扩容；超出容量是致命错误。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DescriptorHeapConfig {
    pub cbv_srv_uav: u32,
    pub cbv_srv_uav_shader_invisible: u32,
    pub sampler: u32,
    pub render_target: u32,
    pub depth_stencil: u32,
}

impl Default for DescriptorHeapConfig {
    fn default() -> Self {
        Self {
            cbv_srv_uav: 200,
            cbv_srv_uav_shader_invisible: 200,
            sampler: 10,
            render_target: 50,
            depth_stencil: 50,
        }
    }
}

impl DescriptorHeapConfig {
    #[inline]
    pub fn capacity(&self, heap: DescriptorHeapKind) -> u32 {
        match heap {
            DescriptorHeapKind::CbvSrvUav => self.cbv_srv_uav,
            DescriptorHeapKind::CbvSrvUavShaderInvisible => self.cbv_srv_uav_shader_invisible,
            DescriptorHeapKind::Sampler => self.sampler,
            DescriptorHeapKind::RenderTarget => self.render_target,
            DescriptorHeapKind::DepthStencil => self.depth_stencil,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub heaps: DescriptorHeapConfig,
    /// fallback 棋盘格纹理的边长
    pub fallback_texture_size: u32,
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            heaps: DescriptorHeapConfig::default(),
            fallback_texture_size: 256,
            clear_color: [0.1, 0.1, 0.12, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let config: RenderConfig = toml::from_str("[heaps]\nsampler = 4\n").unwrap();
        assert_eq!(config.heaps.capacity(DescriptorHeapKind::Sampler), 4);
        assert_eq!(config.heaps.capacity(DescriptorHeapKind::CbvSrvUav), 200);
        assert_eq!(config.fallback_texture_size, 256);
    }
}
