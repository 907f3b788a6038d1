use crate::debugger::breakpoint::Breakpoint;
use crate::debugger::error::Error;
use crate::debugger::{command, Debugger};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add breakpoint at `file:line`.
    Add(String, u32),
    List,
    Enable(u32),
    Disable(u32),
}

impl Command {
    /// Parse `<file name>:<line>` breakpoint location.
    pub fn parse_location(input: &str) -> command::HandleResult<(String, u32)> {
        let args: Vec<&str> = input.trim().split(':').collect();
        let [file, line] = args.as_slice() else {
            return Err(Error::InputParse(format!(
                "expected `<file>:<line>`, got {} argument(s)",
                args.len()
            )));
        };
        let file = file.trim();
        if file.is_empty() {
            return Err(Error::InputParse("empty file name".to_string()));
        }
        let line = line
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::InputParse(format!("line number `{}`: {e}", line.trim())))?;
        Ok((file.to_string(), line))
    }

    /// Parse breakpoint number.
    pub fn parse_number(input: &str) -> command::HandleResult<u32> {
        input
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::InputParse(format!("breakpoint number `{}`: {e}", input.trim())))
    }
}

/// Breakpoint representation for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointView {
    pub number: u32,
    /// Document url of the breakpoint, requested file if unknown.
    pub file: String,
    pub line: u32,
    pub enabled: bool,
}

pub enum HandlingResult {
    New(BreakpointView),
    Dump(Vec<BreakpointView>),
    Enabled(BreakpointView),
    Disabled(BreakpointView),
}

pub struct Break<'a> {
    dbg: &'a mut Debugger,
}

impl<'a> Break<'a> {
    pub fn new(debugger: &'a mut Debugger) -> Self {
        Self { dbg: debugger }
    }

    fn view(&self, brkpt: &Breakpoint) -> BreakpointView {
        let (file, line) = match self.dbg.breakpoint_place(brkpt) {
            Some(place) => (place.file, place.point.start_line),
            None => (brkpt.requested_file.clone(), brkpt.requested_line),
        };
        BreakpointView {
            number: brkpt.number,
            file,
            line,
            enabled: brkpt.is_enabled(),
        }
    }

    pub fn handle(&mut self, cmd: &Command) -> command::HandleResult<HandlingResult> {
        let result = match cmd {
            Command::Add(file, line) => {
                let brkpt = self.dbg.add_breakpoint(file, *line)?.clone();
                HandlingResult::New(self.view(&brkpt))
            }
            Command::List => HandlingResult::Dump(
                self.dbg
                    .breakpoints()
                    .iter()
                    .map(|brkpt| self.view(brkpt))
                    .collect(),
            ),
            Command::Enable(number) => {
                let brkpt = self.dbg.enable_breakpoint(*number)?.clone();
                HandlingResult::Enabled(self.view(&brkpt))
            }
            Command::Disable(number) => {
                let brkpt = self.dbg.disable_breakpoint(*number)?.clone();
                HandlingResult::Disabled(self.view(&brkpt))
            }
        };
        Ok(result)
    }
}
