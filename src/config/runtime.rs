use crate::Result;
use crate::config::manager::{
    CONTAINER_HOME_DEFAULT, CONTAINER_HOME_KEY, ConfigurationManager, DIST_URL_DEFAULT,
    DIST_URL_KEY, MODULES_KEY, SYSTEM_PROPERTIES_KEY, WORK_DIR_DEFAULT, WORK_DIR_KEY,
};
use crate::error::RexamError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;

/// 传给容器启动的运行时配置
///
/// 运行时需要的属性全部放在这里，不写入进程级环境。
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// 运行时安装根目录，也是测试命令的工作目录
    pub home: PathBuf,

    /// 容器工作区的父目录
    pub work_dir: PathBuf,

    pub dist_url: Url,

    /// 启动时按顺序部署的模块
    pub modules: Vec<PathBuf>,

    /// 仅对运行时可见的属性
    pub system_properties: BTreeMap<String, String>,
}

impl RuntimeConfig {
    pub fn from_manager(cm: &ConfigurationManager) -> Result<Self> {
        let dist = cm.get_property_or(DIST_URL_KEY, DIST_URL_DEFAULT);
        let dist_url = Url::parse(&dist).map_err(|e| {
            RexamError::Configuration(format!("{} '{}' is not a valid URL: {}", DIST_URL_KEY, dist, e))
        })?;

        Ok(Self {
            home: PathBuf::from(cm.get_property_or(CONTAINER_HOME_KEY, CONTAINER_HOME_DEFAULT)),
            work_dir: PathBuf::from(cm.get_property_or(WORK_DIR_KEY, WORK_DIR_DEFAULT)),
            dist_url,
            modules: cm.get_list(MODULES_KEY).into_iter().map(PathBuf::from).collect(),
            system_properties: cm.get_map(SYSTEM_PROPERTIES_KEY)?,
        })
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from(CONTAINER_HOME_DEFAULT),
            work_dir: PathBuf::from(WORK_DIR_DEFAULT),
            dist_url: Url::parse(DIST_URL_DEFAULT).expect("default dist url is valid"),
            modules: Vec::new(),
            system_properties: BTreeMap::new(),
        }
    }
}
