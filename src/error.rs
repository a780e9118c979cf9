//! The error taxonomy shared by the builder and the parser.

use thiserror::Error;

/// Every expected failure mode of the builder/parser pair.
///
/// State-machine misuse that can never produce a valid message (calling a
/// typed appender while a sub-builder is detached, advancing to a section
/// out of order) is a programmer error and is signalled with `panic!`
/// instead of a variant here — see the module docs on `Builder` and
/// `Parser`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("appending would exceed the message size limit")]
    Truncated,

    #[error("resource data would exceed 65535 bytes")]
    ResourceTooLong,

    #[error("section already holds 65535 records")]
    CountLimitReached,

    #[error("invalid textual name: {0}")]
    InvalidName(&'static str),

    #[error("invalid wire-encoded name: {0}")]
    InvalidWireName(&'static str),

    #[error("compression pointer chain exceeded {0} hops")]
    PointerLoop(u16),

    #[error("invalid DNS message: {0}")]
    InvalidMessage(&'static str),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("TXT resource data must contain at least one string")]
    EmptyTxt,

    #[error("TXT string exceeds 255 bytes")]
    TooLongTxtString,
}

/// Crate-wide result alias, matching the single-taxonomy error policy.
pub type Result<T> = std::result::Result<T, DnsError>;
