use crate::Result;
use crate::error::RexamError;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// 运行时安装根目录
pub const CONTAINER_HOME_KEY: &str = "rexam.container.home";
pub const CONTAINER_HOME_DEFAULT: &str = ".";

/// 运行时发行包地址（只做校验，下载不在本 crate 范围内）
pub const DIST_URL_KEY: &str = "rexam.dist.url";
pub const DIST_URL_DEFAULT: &str = "file:///opt/rexam/runtime";

/// 启动时部署的附加模块，逗号分隔的文件路径
pub const MODULES_KEY: &str = "rexam.container.modules";

/// 导出给运行时的属性，逗号分隔的 key=value
pub const SYSTEM_PROPERTIES_KEY: &str = "rexam.system.properties";

/// 容器工作目录
pub const WORK_DIR_KEY: &str = "rexam.work.dir";
pub const WORK_DIR_DEFAULT: &str = ".rexam/work";

#[derive(Debug, Clone, Default)]
enum EnvSource {
    #[default]
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// 具名字符串属性解析
///
/// 查找顺序：环境变量（`rexam.container.home` → `REXAM_CONTAINER_HOME`）>
/// 配置文件 `[properties]` > 调用方给出的默认值。
/// 值中的 `${NAME}` / `${NAME:default}` 占位符会被替换。
#[derive(Debug, Clone, Default)]
pub struct ConfigurationManager {
    properties: HashMap<String, String>,
    env: EnvSource,
}

impl ConfigurationManager {
    pub fn new(properties: HashMap<String, String>) -> Self {
        Self {
            properties,
            env: EnvSource::Process,
        }
    }

    /// 使用固定的环境变量表代替进程环境
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = EnvSource::Fixed(vars);
        self
    }

    /// 属性键对应的环境变量名
    pub fn env_name(key: &str) -> String {
        key.to_uppercase().replace(['.', '-'], "_")
    }

    pub fn get_property(&self, key: &str) -> Option<String> {
        self.raw(key).map(|value| self.substitute(&value))
    }

    pub fn get_property_or(&self, key: &str, default: &str) -> String {
        self.get_property(key)
            .unwrap_or_else(|| self.substitute(default))
    }

    /// 必需属性，缺失时返回配置错误
    pub fn require(&self, key: &str) -> Result<String> {
        self.get_property(key).ok_or_else(|| {
            RexamError::Configuration(format!(
                "property {} (env {}) must be set",
                key,
                Self::env_name(key)
            ))
        })
    }

    /// 逗号分隔的列表属性，忽略空项
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_property(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 逗号分隔的 key=value 属性
    pub fn get_map(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        for item in self.get_list(key) {
            let (k, v) = item.split_once('=').ok_or_else(|| {
                RexamError::Configuration(format!("{}: expected key=value, got '{}'", key, item))
            })?;
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
        Ok(map)
    }

    /// 所有来自配置文件的属性（已解析）
    pub fn resolved(&self) -> BTreeMap<String, String> {
        self.properties
            .keys()
            .filter_map(|key| self.get_property(key).map(|value| (key.clone(), value)))
            .collect()
    }

    fn raw(&self, key: &str) -> Option<String> {
        self.env
            .get(&Self::env_name(key))
            .or_else(|| self.properties.get(key).cloned())
    }

    /// 替换 `${NAME}` 和 `${NAME:default}`
    ///
    /// NAME 先按原样查环境变量，再查属性表；都没有时使用默认值，
    /// 没有默认值则保留原文。只替换一层。
    pub fn substitute(&self, text: &str) -> String {
        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.\-]*)(?::([^}]*))?\}").unwrap()
        });

        re.replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            self.env
                .get(name)
                .or_else(|| self.properties.get(name).cloned())
                .or_else(|| caps.get(2).map(|default| default.as_str().to_string()))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
    }
}
