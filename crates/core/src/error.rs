#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown notification target: {0}")]
    UnknownTarget(String),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
