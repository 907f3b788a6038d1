//! Debugger commands available while debugee is stopped.

mod backtrace;
mod r#break;
mod r#continue;
mod quit;
mod step_into;
mod step_out;
mod step_over;
mod variables;

pub use backtrace::Backtrace;
pub use r#break::Break;
pub use r#break::BreakpointView;
pub use r#break::Command as BreakpointCommand;
pub use r#break::HandlingResult as BreakpointHandlingResult;
pub use r#continue::Continue;
pub use quit::Quit;
pub use step_into::StepInto;
pub use step_out::StepOut;
pub use step_over::StepOver;
pub use variables::Variables;

use crate::debugger::Error;

/// External commands that can be processed by the debugger.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Continue,
    Quit,
    PrintLocals { show_hidden: bool },
    PrintBacktrace { all: bool },
    StepOver,
    StepInto,
    StepOut,
    Breakpoint(r#break::Command),
    Help,
}

impl Command {
    /// Return true if debugee should be resumed after the command.
    pub fn resumes_debugee(&self) -> bool {
        matches!(
            self,
            Command::Continue
                | Command::Quit
                | Command::StepOver
                | Command::StepInto
                | Command::StepOut
        )
    }
}

pub type HandleResult<T> = Result<T, Error>;
