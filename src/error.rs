use thiserror::Error;

/// Why a single response line did not decode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("columns {start}..{end} fall outside a {len}-byte line")]
    OutOfRange { start: usize, end: usize, len: usize },
    #[error("bad timestamp '{0}'")]
    Timestamp(String),
    #[error("bad value '{0}'")]
    Value(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Product [{0}] is not yet implemented!")]
pub struct UnknownProduct(pub String);
