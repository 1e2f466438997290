/// Error parsing a wire-level value into one of the crate's types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownAction(String),
    InvalidTokenId(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAction(s) => write!(f, "unknown action: {s}"),
            Self::InvalidTokenId(s) => write!(f, "invalid token id: {s}"),
        }
    }
}

impl std::error::Error for ParseError {}
