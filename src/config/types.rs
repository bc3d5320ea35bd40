use crate::probe::InvokerKind;
use crate::reactor::ReactorStrategy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// 完整的 rexam.toml 配置文件
///
/// ```toml
/// [reactor]
/// strategy = "per-class"
/// start_timeout_secs = 60
///
/// [container]
/// runtime = "process"
/// count = 2
///
/// [properties]
/// "rexam.container.home" = "${HOME}/runtime"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RexamConfig {
    #[serde(default)]
    pub reactor: ReactorSection,

    #[serde(default)]
    pub container: ContainerSection,

    /// 具名字符串属性，由 ConfigurationManager 解析
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReactorSection {
    #[serde(default)]
    pub strategy: ReactorStrategy,

    /// 容器启动超时（秒），缺省不限时
    pub start_timeout_secs: Option<u64>,

    /// 容器停止超时（秒），缺省不限时
    pub stop_timeout_secs: Option<u64>,
}

impl ReactorSection {
    pub fn start_timeout(&self) -> Option<Duration> {
        self.start_timeout_secs.map(Duration::from_secs)
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSection {
    #[serde(default)]
    pub runtime: InvokerKind,

    /// 创建的容器数量
    #[serde(default = "default_container_count")]
    pub count: usize,

    /// 容器名称前缀，实际名称为 `{prefix}-{index}`
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_container_count() -> usize {
    1
}

fn default_name_prefix() -> String {
    "runtime".to_string()
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            runtime: InvokerKind::default(),
            count: default_container_count(),
            name_prefix: default_name_prefix(),
        }
    }
}
