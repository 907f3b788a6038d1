use crate::debugger::{command, Debugger};

/// Step program until it reaches a different source line, entering called user code.
pub struct StepInto<'a> {
    dbg: &'a mut Debugger,
}

impl<'a> StepInto<'a> {
    pub fn new(debugger: &'a mut Debugger) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&mut self) -> command::HandleResult<()> {
        self.dbg.step_into()
    }
}
