use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Free-form structured context attached to an entry.
pub type LogContext = Map<String, Value>;

/// Builds a context from a `json!` object literal. Non-objects yield `None`.
pub fn log_context(value: Value) -> Option<LogContext> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn rank(self) -> u8 {
        match self {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info => 2,
            LogLevel::Debug => 3,
        }
    }

    /// Whether a logger configured at `self` accepts an entry at `level`.
    pub fn admits(self, level: LogLevel) -> bool {
        level.rank() <= self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }
}

impl From<&anyhow::Error> for ErrorInfo {
    fn from(err: &anyhow::Error) -> Self {
        let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        Self {
            name: "Error".to_string(),
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }
}

/// One log event. Built once per accepted call and shared by every sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl LogEntry {
    /// Builds an entry, lifting `userId`, `requestId`, `ipAddress` and
    /// `userAgent` out of the context when present.
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        service: impl Into<String>,
        context: Option<LogContext>,
        error: Option<ErrorInfo>,
    ) -> Self {
        let lift = |key: &str| {
            context
                .as_ref()
                .and_then(|c| c.get(key))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
        };

        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            service: service.into(),
            user_id: lift("userId"),
            request_id: lift("requestId"),
            ip_address: lift("ipAddress"),
            user_agent: lift("userAgent"),
            context,
            error,
        }
    }

    /// `[timestamp] LEVEL service: message | Context: {...} | Error: ... | User: ... | Request: ...`
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "[{}] {} {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.service,
            self.message
        );

        if let Some(context) = self.context.as_ref().filter(|c| !c.is_empty()) {
            line.push_str(&format!(" | Context: {}", Value::Object(context.clone())));
        }
        if let Some(error) = &self.error {
            line.push_str(&format!(" | Error: {}: {}", error.name, error.message));
        }
        if let Some(user) = &self.user_id {
            line.push_str(&format!(" | User: {}", user));
        }
        if let Some(request) = &self.request_id {
            line.push_str(&format!(" | Request: {}", request));
        }
        line
    }
}
