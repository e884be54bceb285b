//! SMTP reply types.

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 334).
    pub code: ReplyCode,
    /// Reply message lines, without code and separator.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns true if the server is waiting for an AUTH response.
    #[must_use]
    pub fn is_auth_continue(&self) -> bool {
        self.code == ReplyCode::AUTH_CONTINUE
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is an error code (4xx or 5xx).
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 >= 400 && self.0 < 600
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Codes seen during an AUTH exchange
impl ReplyCode {
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 454 Temporary authentication failure
    pub const AUTH_TEMPORARY_FAILURE: Self = Self(454);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_classes() {
        assert!(ReplyCode::AUTH_SUCCESS.is_success());
        assert!(ReplyCode::AUTH_CONTINUE.is_intermediate());
        assert!(ReplyCode::AUTH_TEMPORARY_FAILURE.is_error());
        assert!(ReplyCode::AUTH_FAILED.is_error());
        assert!(!ReplyCode::AUTH_CONTINUE.is_error());
    }

    #[test]
    fn test_display_and_ordering() {
        assert_eq!(ReplyCode::AUTH_CONTINUE.to_string(), "334");
        assert!(ReplyCode::AUTH_SUCCESS < ReplyCode::AUTH_CONTINUE);
        assert_eq!(ReplyCode::new(535), ReplyCode::AUTH_FAILED);
    }

    #[test]
    fn test_reply_message_text() {
        let reply = Reply::new(
            ReplyCode::AUTH_CONTINUE,
            vec!["first".to_string(), "second".to_string()],
        );
        assert!(reply.is_auth_continue());
        assert!(!reply.is_success());
        assert_eq!(reply.message_text(), "first\nsecond");
        assert_eq!(Reply::new(ReplyCode::AUTH_SUCCESS, vec![]).message_text(), "");
    }
}
