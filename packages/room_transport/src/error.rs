#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transport session is closed")]
    Closed,

    #[error("publish rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Rejected(_) => "rejected",
        }
    }
}
