use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// 从 TOML 文件加载配置
///
/// 文件不存在时返回 `T::default()`；文件存在但格式错误时返回错误。
pub fn load_toml_or_default<T: DeserializeOwned + Default>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("config file {} not found, using defaults", path.display());
        return Ok(T::default());
    }

    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config = toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Default, Debug, PartialEq)]
    #[serde(default)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg: Sample = load_toml_or_default(dir.path().join("none.toml")).unwrap();
        assert_eq!(cfg, Sample::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.toml");
        std::fs::write(&path, "count = 3\n").unwrap();
        let cfg: Sample = load_toml_or_default(&path).unwrap();
        assert_eq!(cfg.count, 3);
        assert_eq!(cfg.name, "");
    }

    #[test]
    fn test_bad_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.toml");
        std::fs::write(&path, "count = \"x\"\n").unwrap();
        assert!(load_toml_or_default::<Sample>(&path).is_err());
    }
}
