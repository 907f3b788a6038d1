use crate::debugger::variable::Variable;
use crate::debugger::{command, Debugger};

pub struct Variables<'a> {
    dbg: &'a Debugger,
}

impl<'a> Variables<'a> {
    pub fn new(debugger: &'a Debugger) -> Self {
        Self { dbg: debugger }
    }

    /// Return local variables followed by arguments of an active frame.
    pub fn handle(&self, show_hidden: bool) -> command::HandleResult<Vec<Variable>> {
        let mut vars = self.dbg.read_locals(show_hidden)?;
        vars.extend(self.dbg.read_arguments(show_hidden)?);
        Ok(vars)
    }
}
