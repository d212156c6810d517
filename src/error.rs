use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A `begin…` operator was not preceded by the numeric entry count.
    #[error("expected entry count before `{operator}` but found {found}")]
    MissingEntryCount { operator: &'static str, found: String },
    /// The CMap program uses a feature this crate does not implement.
    #[error("missing feature of pdf-cmap: {0}")]
    Unimplemented(&'static str),
    /// An entry inside a mapping block is malformed (strict parsing only).
    #[error("malformed {block} entry: {reason}")]
    MalformedEntry { block: &'static str, reason: String },
    /// The input could not be tokenized (strict parsing only).
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    /// IO error
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(block: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedEntry {
            block,
            reason: reason.into(),
        }
    }
}
