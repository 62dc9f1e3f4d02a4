use thiserror::Error;

pub type PfResult<T> = Result<T, PfError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PfError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Duplicate tag: {tag}")]
    DuplicateTag { tag: String },

    #[error("Unknown tag: {tag}")]
    UnknownTag { tag: String },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },
}
