use crate::Result;
use crate::error::RexamError;
use crate::probe::types::TestDescription;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 套件清单文件
///
/// ```toml
/// [probe]
/// name = "smoke"
///
/// [[tests]]
/// class = "net.Smoke"
/// method = "ping"
/// command = "ping -c1 localhost"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteManifest {
    pub probe: ProbeSection,

    #[serde(default)]
    pub tests: Vec<TestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSection {
    pub name: String,
}

/// 清单中的单个测试条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    pub class: String,

    /// 缺省时为类级节点
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// process 运行时执行的 shell 命令
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl TestEntry {
    pub fn description(&self) -> TestDescription {
        TestDescription {
            class_name: self.class.clone(),
            method_name: self.method.clone(),
        }
    }
}

impl SuiteManifest {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: SuiteManifest = toml::from_str(content)?;
        let name = manifest.probe.name.trim();
        if name.is_empty() {
            return Err(RexamError::Configuration(
                "probe name must not be empty".to_string(),
            ));
        }
        if !is_plain_file_name(name) {
            return Err(RexamError::Configuration(format!(
                "probe name '{}' must be a plain file name",
                name
            )));
        }
        Ok(manifest)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| RexamError::Other(format!("probe is not valid UTF-8: {}", e)))?;
        Self::parse(content)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// 按清单顺序返回所有描述（含类级节点）
    pub fn descriptions(&self) -> Vec<TestDescription> {
        self.tests.iter().map(TestEntry::description).collect()
    }
}

/// 探针名会作为部署文件名使用：不允许路径分隔符和 `.`/`..`
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[probe]
name = "smoke"

[[tests]]
class = "net.Smoke"

[[tests]]
class = "net.Smoke"
method = "ping"
command = "true"
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = SuiteManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.probe.name, "smoke");
        assert_eq!(manifest.tests.len(), 2);

        let descriptions = manifest.descriptions();
        assert!(!descriptions[0].is_executable());
        assert_eq!(descriptions[1], TestDescription::new("net.Smoke", "ping"));
    }

    #[test]
    fn test_manifest_survives_probe_bytes() {
        let manifest = SuiteManifest::parse(MANIFEST).unwrap();
        let toml = manifest.to_toml().unwrap();
        let restored = SuiteManifest::from_bytes(toml.as_bytes()).unwrap();
        assert_eq!(restored, manifest);
    }

    #[test]
    fn test_empty_probe_name_rejected() {
        let result = SuiteManifest::parse("[probe]\nname = \" \"\n");
        assert!(matches!(result, Err(RexamError::Configuration(_))));
    }

    #[test]
    fn test_path_like_probe_name_rejected() {
        for name in ["../escape", "a/b", "..", "c:\\\\x"] {
            let content = format!("[probe]\nname = \"{}\"\n", name);
            let result = SuiteManifest::parse(&content);
            assert!(
                matches!(result, Err(RexamError::Configuration(_))),
                "{}",
                name
            );
        }
        assert!(SuiteManifest::parse("[probe]\nname = \"v1.2-smoke\"\n").is_ok());
    }
}
