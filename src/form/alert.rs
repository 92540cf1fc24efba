use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Warning,
    Danger,
}

/// A message for the host's alert banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Danger,
            message: message.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            AlertKind::Success => "ok",
            AlertKind::Warning => "warn",
            AlertKind::Danger => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// What happened at mount. Each fetch is reported separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountReport {
    pub values_loaded: bool,
    pub options_loaded: bool,
    pub alerts: Vec<Alert>,
}

impl MountReport {
    pub fn is_complete(&self) -> bool {
        self.values_loaded && self.options_loaded
    }
}
