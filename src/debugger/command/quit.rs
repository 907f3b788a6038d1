use crate::debugger::{command, Debugger};

/// Force stop and terminate debugee.
pub struct Quit<'a> {
    dbg: &'a mut Debugger,
}

impl<'a> Quit<'a> {
    pub fn new(debugger: &'a mut Debugger) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&mut self) -> command::HandleResult<()> {
        self.dbg.quit()
    }
}
