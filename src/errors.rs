use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    LabelSchema(String),
    LabelArity(String),
    NegativeOccupancy(String),
    InvalidObservation(String),
    Registration(String),
    Encoding(String),
    Config(String),
    InvalidTransition(String),
}

impl MetricsError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            MetricsError::LabelSchema(_) => "E001",
            MetricsError::LabelArity(_) => "E002",
            MetricsError::NegativeOccupancy(_) => "E003",
            MetricsError::InvalidObservation(_) => "E004",
            MetricsError::Registration(_) => "E005",
            MetricsError::Encoding(_) => "E006",
            MetricsError::Config(_) => "E007",
            MetricsError::InvalidTransition(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            MetricsError::LabelSchema(_) => "Label Schema Error",
            MetricsError::LabelArity(_) => "Label Arity Mismatch",
            MetricsError::NegativeOccupancy(_) => "Negative Occupancy",
            MetricsError::InvalidObservation(_) => "Invalid Observation",
            MetricsError::Registration(_) => "Registration Error",
            MetricsError::Encoding(_) => "Encoding Error",
            MetricsError::Config(_) => "Configuration Error",
            MetricsError::InvalidTransition(_) => "Invalid Phase Transition",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            MetricsError::LabelSchema(msg) => msg,
            MetricsError::LabelArity(msg) => msg,
            MetricsError::NegativeOccupancy(msg) => msg,
            MetricsError::InvalidObservation(msg) => msg,
            MetricsError::Registration(msg) => msg,
            MetricsError::Encoding(msg) => msg,
            MetricsError::Config(msg) => msg,
            MetricsError::InvalidTransition(msg) => msg,
        }
    }

    /// Configuration errors stop registry construction; everything else is
    /// raised per update and must not fail the observed query.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MetricsError::LabelSchema(_) | MetricsError::Registration(_) | MetricsError::Config(_)
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MetricsError {}

// 便捷的构造函数
impl MetricsError {
    pub fn label_schema<T: Into<String>>(msg: T) -> Self {
        MetricsError::LabelSchema(msg.into())
    }

    pub fn label_arity<T: Into<String>>(msg: T) -> Self {
        MetricsError::LabelArity(msg.into())
    }

    pub fn negative_occupancy<T: Into<String>>(msg: T) -> Self {
        MetricsError::NegativeOccupancy(msg.into())
    }

    pub fn invalid_observation<T: Into<String>>(msg: T) -> Self {
        MetricsError::InvalidObservation(msg.into())
    }

    pub fn registration<T: Into<String>>(msg: T) -> Self {
        MetricsError::Registration(msg.into())
    }

    pub fn encoding<T: Into<String>>(msg: T) -> Self {
        MetricsError::Encoding(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        MetricsError::Config(msg.into())
    }

    pub fn invalid_transition<T: Into<String>>(msg: T) -> Self {
        MetricsError::InvalidTransition(msg.into())
    }
}

impl From<prometheus::Error> for MetricsError {
    fn from(err: prometheus::Error) -> Self {
        match err {
            prometheus::Error::InconsistentCardinality { expect, got } => MetricsError::LabelArity(
                format!("expected {} label values, got {}", expect, got),
            ),
            other => MetricsError::Registration(other.to_string()),
        }
    }
}

impl From<std::string::FromUtf8Error> for MetricsError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        MetricsError::Encoding(err.to_string())
    }
}

impl From<config::ConfigError> for MetricsError {
    fn from(err: config::ConfigError) -> Self {
        MetricsError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MetricsError {
    fn from(err: toml::ser::Error) -> Self {
        MetricsError::Config(err.to_string())
    }
}

impl From<std::io::Error> for MetricsError {
    fn from(err: std::io::Error) -> Self {
        MetricsError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
