use thiserror::Error;

/// Errors raised by the tester plumbing.
///
/// A chip that fails verification is not an error: that outcome travels as a
/// [`crate::driver::TestResult`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("worker context has shut down")]
    WorkerGone,

    #[error("a test job is already in flight")]
    Busy,

    #[error("unsupported data width: {0} bits")]
    UnsupportedWidth(u32),

    #[error("unknown chip: {0}")]
    UnknownChip(String),

    #[error("invalid fault description '{0}'")]
    InvalidFault(String),

    #[error("{what} index {index} out of range (0..{len})")]
    SelectionOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
