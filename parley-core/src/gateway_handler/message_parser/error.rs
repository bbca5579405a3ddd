use std::fmt::Display;

pub trait GetErrorSeverity {
    fn get_severity(&self) -> ErrorSeverity;
}

#[derive(Debug)]
/// An error when pre-processing the message.
pub enum PreParseError {
    /// Message does not start with the correct prefix.
    MessageNotPrefixed(String),
    /// Invocating user is a bot.
    UserIsBot(u64),
    /// Structured invocations have no prefix to process.
    NotText,
    /// Other unknown failure. Unexpected error with high severity.
    Failure(String),
}
impl Display for PreParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MessageNotPrefixed(prefix) => {
                write!(f, "Message does not start with correct prefix ({prefix})")
            },
            Self::UserIsBot(id) => {
                write!(f, "User is a bot ({id})")
            },
            Self::NotText => f.write_str("Invocation is not a text message"),
            Self::Failure(message) => {
                write!(f, "Preprocessor failure: {message}")
            },
        }
    }
}
impl GetErrorSeverity for PreParseError {
    fn get_severity(&self) -> ErrorSeverity {
        match self {
            PreParseError::Failure(_) => ErrorSeverity::High,
            _ => ErrorSeverity::Low,
        }
    }
}
impl std::error::Error for PreParseError {}

#[derive(Debug)]
pub enum ParseError {
    /// Failure with preprocessing of the message.
    PreParseFail(PreParseError),
    /// Prefixed, but nothing is registered under the token and there is no fallback.
    CommandNotFound(String),
    /// A prefix was found with nothing after it.
    EmptyCommand,
}
impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreParseFail(message) => {
                write!(f, "Pre-parse failed: {message}")
            },
            Self::CommandNotFound(token) => write!(f, "No command found for {token:?}"),
            Self::EmptyCommand => f.write_str("Prefix without a command"),
        }
    }
}
impl std::error::Error for ParseError {}
impl GetErrorSeverity for ParseError {
    fn get_severity(&self) -> ErrorSeverity {
        match self {
            ParseError::PreParseFail(e) => e.get_severity(),
            _ => ErrorSeverity::Low,
        }
    }
}
impl From<PreParseError> for ParseError {
    fn from(value: PreParseError) -> Self {
        ParseError::PreParseFail(value)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_preprocessor_failures_are_severe() {
        assert_eq!(PreParseError::UserIsBot(1).get_severity(), ErrorSeverity::Low);
        assert_eq!(ParseError::EmptyCommand.get_severity(), ErrorSeverity::Low);
        assert_eq!(
            ParseError::from(PreParseError::Failure("settings down".to_owned())).get_severity(),
            ErrorSeverity::High
        );
    }
}
