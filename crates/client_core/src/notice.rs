use shared::error::{ErrorCode, ListError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Non-blocking message surfaced to whoever renders the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            code: None,
            message: message.into(),
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn error(err: &ListError) -> Self {
        Self {
            level: NoticeLevel::Error,
            code: Some(err.code()),
            message: err.to_string(),
        }
    }
}
