use crate::debugger::{command, Debugger};

/// Continue debugee execution, actual resume is done by the debugger main loop.
pub struct Continue<'a> {
    dbg: &'a Debugger,
}

impl<'a> Continue<'a> {
    pub fn new(debugger: &'a Debugger) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&self) -> command::HandleResult<()> {
        self.dbg.context().thread()?;
        Ok(())
    }
}
