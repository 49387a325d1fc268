use std::{
    env,
    path::{Path, PathBuf},
};

/// 统一资源路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导），也可以通过环境变量
/// `PRISM_WORKSPACE` 指定。
///
/// # 使用示例
/// ```ignore
/// let model = PrismPath::assets_path("sponza/sponza.obj");    // assets/sponza/sponza.obj
/// let shader = PrismPath::shader_build_path("forward.vert");  // shader/.build/forward.vert.spv
/// ```
pub struct PrismPath {}
// 核心路径
impl PrismPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        if let Ok(dir) = env::var("PRISM_WORKSPACE") {
            return PathBuf::from(dir);
        }
        // 从当前包的位置推导 workspace 目录
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().unwrap_or(manifest_dir).to_path_buf()
    }

    pub fn target_path() -> PathBuf {
        Self::workspace_path().join("target")
    }
}
// 根目录下
impl PrismPath {
    /// 获取 `assets/` 目录下的文件路径
    pub fn assets_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("assets").join(filename)
    }

    /// 获取 `shader/.build/` 目录下的着色器路径（编译后的 SPIR-V）
    pub fn shader_build_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("shader").join(".build").join(format!("{filename}.spv"))
    }

    /// 相对路径基于工作区解析，绝对路径原样返回
    pub fn resolve(path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() { path.to_path_buf() } else { Self::workspace_path().join(path) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_build_path() {
        let path = PrismPath::shader_build_path("forward.vert");
        assert!(path.ends_with("shader/.build/forward.vert.spv"));
    }

    #[test]
    fn test_resolve_absolute() {
        let abs = env::temp_dir().join("a.png");
        assert_eq!(PrismPath::resolve(&abs), abs);
    }
}
