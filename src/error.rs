use thiserror::Error;

/// Errors produced while decoding address and prefix text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The text is not a dotted-quad IPv4 address.
    #[error("invalid IPv4 address: {0:?}")]
    InvalidAddress(String),
    /// The mask suffix is missing its digits, is not a number, or is outside `0..=32`.
    #[error("invalid mask length {0:?}: expected 0..=32")]
    InvalidMask(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
