use crate::debugger::{command, Debugger, FrameInfo};

pub struct Backtrace<'a> {
    dbg: &'a Debugger,
}

impl<'a> Backtrace<'a> {
    pub fn new(debugger: &'a Debugger) -> Self {
        Self { dbg: debugger }
    }

    /// Return frames of a stopped thread, infrastructure frames included only if `all` is set.
    pub fn handle(&self, all: bool) -> command::HandleResult<Vec<FrameInfo>> {
        self.dbg.backtrace(all)
    }
}
