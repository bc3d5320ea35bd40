use crate::Result;
use crate::config::types::RexamConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    pub const CONFIG_FILE: &'static str = "rexam.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RexamConfig> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// 加载配置
    ///
    /// 显式路径必须存在；否则按以下顺序查找，找不到时使用默认配置：
    /// 1. 当前目录及其父目录
    /// 2. 用户配置目录 ~/.config/rexam/
    pub fn load(explicit: Option<&Path>) -> Result<RexamConfig> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        match Self::find() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::load_from_path(path)
            }
            None => Ok(RexamConfig::default()),
        }
    }

    /// 查找配置文件路径
    pub fn find() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_from(&current).or_else(Self::user_config_path)
    }

    /// 从给定目录向上查找
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(Self::CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    fn user_config_path() -> Option<PathBuf> {
        let path = dirs::home_dir()?
            .join(".config")
            .join("rexam")
            .join(Self::CONFIG_FILE);
        path.is_file().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::ReactorStrategy;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(ConfigLoader::CONFIG_FILE);
        fs::write(&path, "[reactor]\nstrategy = \"per-class\"\n").unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.reactor.strategy, ReactorStrategy::PerClass);
    }

    #[test]
    fn test_find_from_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(ConfigLoader::CONFIG_FILE), "").unwrap();

        let found = ConfigLoader::find_from(&nested).unwrap();
        assert_eq!(found, temp_dir.path().join(ConfigLoader::CONFIG_FILE));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigLoader::load(Some(&temp_dir.path().join("nope.toml")));
        assert!(result.is_err());
    }
}
