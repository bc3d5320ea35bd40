use thiserror::Error;

#[derive(Error, Debug)]
pub enum RexamError {
    #[error("容器启动失败: {0}")]
    ContainerStart(String),

    #[error("部署失败: {0}")]
    Deployment(String),

    #[error("调用失败: {0}")]
    Invocation(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("操作超时: {operation} ({seconds}s)")]
    Timeout { operation: String, seconds: u64 },

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML 序列化错误: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL 解析错误: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl RexamError {
    /// 是否属于基础设施故障（启动/部署/调用/超时）
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            RexamError::ContainerStart(_)
                | RexamError::Deployment(_)
                | RexamError::Invocation(_)
                | RexamError::Timeout { .. }
        )
    }
}

// Add conversion from anyhow::Error
impl From<anyhow::Error> for RexamError {
    fn from(err: anyhow::Error) -> Self {
        RexamError::Other(err.to_string())
    }
}

/// Result type for rexam crate
pub type Result<T> = std::result::Result<T, RexamError>;
