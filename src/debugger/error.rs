//! Debugger errors and helpers that downgrade non critical errors to log records.

use crate::debugger::debugee::ElementType;
use std::string::FromUtf8Error;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    FromUtf8(#[from] FromUtf8Error),

    // --------------------------------- debugger entity not found----------------------------------
    #[error("no document named `{0}` in loaded modules")]
    DocumentNotFound(String),
    #[error("couldn't find {file}:{line}")]
    SymbolResolution { file: String, line: u32 },
    #[error("breakpoint {0} not found")]
    BreakpointNotFound(u32),
    #[error("no active stopped thread")]
    NoActiveThread,
    #[error("thread has no frames")]
    NoFrames,
    #[error("frame number {0} not found")]
    FrameNotFound(usize),

    // --------------------------------- user input errors -----------------------------------------
    #[error("malformed input: {0}")]
    InputParse(String),

    // --------------------------------- value errors ----------------------------------------------
    #[error("<processing value of type: {0} not implemented>")]
    UnsupportedValue(ElementType),
    #[error("invalid binary representation of `{0}`: {1:?}")]
    ValueDecode(ElementType, Box<[u8]>),

    // --------------------------------- parsing errors --------------------------------------------
    #[error("symbol stream: {0}")]
    SymbolParse(String),

    // --------------------------------- debugee backend errors ------------------------------------
    #[error("launch `{0}`: {1}")]
    Launch(String, std::io::Error),
    #[error("debugee: {0}")]
    Backend(String),
    #[error("debug protocol: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("debugee process exit with code {0}")]
    ProcessExit(i32),

    // --------------------------------- third party errors ----------------------------------------
    #[error("hook: {0}")]
    Hook(anyhow::Error),
}

impl Error {
    /// Return a hint to an interface - continue debugging after error or stop whole process.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::FromUtf8(_) => false,
            Error::DocumentNotFound(_) => false,
            Error::SymbolResolution { .. } => false,
            Error::BreakpointNotFound(_) => false,
            Error::NoActiveThread => false,
            Error::NoFrames => false,
            Error::FrameNotFound(_) => false,
            Error::InputParse(_) => false,
            Error::UnsupportedValue(_) => false,
            Error::ValueDecode(_, _) => false,
            Error::SymbolParse(_) => false,
            Error::Backend(_) => false,
            Error::Hook(_) => false,

            // the connection with the target is gone
            Error::Launch(_, _) => true,
            Error::Protocol(_) => true,
            Error::ProcessExit(_) => true,
        }
    }
}

/// Turn `Result` into `Option`, an error is written with the crate log macro `$log`.
#[doc(hidden)]
#[macro_export]
macro_rules! _ok_or_log {
    ($log: ident, $res: expr) => {
        $res.map_err(|e| $crate::$log!(target: "debugger", "{:#}", e)).ok()
    };
    ($log: ident, $res: expr, $msg: tt) => {
        $res.map_err(|e| $crate::$log!(target: "debugger", concat!($msg, " {:#}"), e))
            .ok()
    };
}

/// Transforms `Result` into `Option` and logs a warning if an error occurs.
/// Nothing is logged while logging is disabled.
#[macro_export]
macro_rules! weak_error {
    ($($arg:tt)+) => {
        $crate::_ok_or_log!(sd_warn, $($arg)+)
    };
}

/// Transforms `Result` into `Option`, an error goes to debug logs only.
#[macro_export]
macro_rules! muted_error {
    ($($arg:tt)+) => {
        $crate::_ok_or_log!(sd_debug, $($arg)+)
    };
}
