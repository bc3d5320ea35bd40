use crate::error::RexamError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 容器分配策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReactorStrategy {
    /// 每个测试一次全新的 start/install/stop
    #[default]
    Confined,
    /// 每个测试类共享一次容器激活，类之间轮转分配容器
    PerClass,
    /// 整个套件共享一个容器
    PerSuite,
}

impl fmt::Display for ReactorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confined => write!(f, "confined"),
            Self::PerClass => write!(f, "per-class"),
            Self::PerSuite => write!(f, "per-suite"),
        }
    }
}

impl FromStr for ReactorStrategy {
    type Err = RexamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "confined" => Ok(Self::Confined),
            "per-class" => Ok(Self::PerClass),
            "per-suite" => Ok(Self::PerSuite),
            other => Err(RexamError::Configuration(format!(
                "unknown reactor strategy '{}'",
                other
            ))),
        }
    }
}
