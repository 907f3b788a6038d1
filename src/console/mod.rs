use crate::console::config::{Action, BreakpointAction, Config, KeyMap};
use crate::console::hook::TerminalHook;
use crate::console::input::{Input, InputEvent, TerminalInput};
use crate::console::print::Printer;
use crate::debugger::command::{
    Backtrace, Break, BreakpointCommand, BreakpointHandlingResult, BreakpointView, Command,
    Continue, HandleResult, Quit, StepInto, StepOut, StepOver, Variables,
};
use crate::debugger::debugee::wire::WireDebugee;
use crate::debugger::variable::render::RenderRepr;
use crate::debugger::{Debugger, DebuggerBuilder, Session};
use crate::sd_info;
use crossterm::style::Stylize;
use std::path::PathBuf;

pub mod config;
mod help;
pub mod hook;
pub mod input;
pub mod print;
pub mod view;

const WELCOME_TEXT: &str = "sdbg greets, press `h` for help";
const PROMPT: &str = "sdbg» ";
const LOCATION_PROMPT: &str = "file:line> ";
const NUMBER_PROMPT: &str = "breakpoint number> ";

/// Result of a key press.
enum Dispatch {
    Command(Command),
    /// Input is handled or ignored, wait for the next key.
    Skip,
}

/// Single key session, takes control every time debugee stops.
pub struct ConsoleSession {
    input: Box<dyn Input>,
    keymap: KeyMap,
    printer: Printer,
}

impl ConsoleSession {
    pub fn new(input: impl Input + 'static, keymap: KeyMap, printer: Printer) -> Self {
        Self {
            input: Box::new(input),
            keymap,
            printer,
        }
    }

    fn print_error(&self, msg: impl std::fmt::Display) {
        self.printer.print(format!("{}", msg.to_string().red()));
    }

    /// Read a key and translate it into a debugger command.
    fn next_command(&mut self) -> anyhow::Result<Dispatch> {
        self.printer.prompt(PROMPT);
        let key = match self.input.read_key()? {
            InputEvent::Eof => return Ok(Dispatch::Command(Command::Quit)),
            InputEvent::Key(key) => key,
            InputEvent::Other(_) => {
                self.printer.print("Please enter a valid command");
                return Ok(Dispatch::Skip);
            }
        };

        let Some(action) = self.keymap.action(&key) else {
            self.printer.print("Please enter a valid command");
            return Ok(Dispatch::Skip);
        };

        let cmd = match action {
            Action::Continue => Command::Continue,
            Action::Quit => Command::Quit,
            Action::Locals => Command::PrintLocals { show_hidden: false },
            Action::LocalsAll => Command::PrintLocals { show_hidden: true },
            Action::Trace => Command::PrintBacktrace { all: false },
            Action::TraceAll => Command::PrintBacktrace { all: true },
            Action::StepOver => Command::StepOver,
            Action::StepInto => Command::StepInto,
            Action::StepOut => Command::StepOut,
            Action::Help => Command::Help,
            Action::Breakpoint => return self.next_breakpoint_command(),
        };
        Ok(Dispatch::Command(cmd))
    }

    fn next_breakpoint_command(&mut self) -> anyhow::Result<Dispatch> {
        let key = match self.input.read_key()? {
            InputEvent::Eof => return Ok(Dispatch::Command(Command::Quit)),
            InputEvent::Key(key) => key,
            InputEvent::Other(other) => {
                self.printer
                    .print(format!("Invalid breakpoint command {other}"));
                return Ok(Dispatch::Skip);
            }
        };

        let Some(action) = self.keymap.breakpoint_action(&key) else {
            self.printer
                .print(format!("Invalid breakpoint command {key}"));
            return Ok(Dispatch::Skip);
        };

        let cmd = match action {
            BreakpointAction::List => BreakpointCommand::List,
            BreakpointAction::Add => {
                let Some(input) = self.input.read_line(LOCATION_PROMPT)? else {
                    return Ok(Dispatch::Skip);
                };
                match BreakpointCommand::parse_location(&input) {
                    Ok((file, line)) => BreakpointCommand::Add(file, line),
                    Err(e) => {
                        self.print_error(format!("Add breakpoint failed: {e}"));
                        return Ok(Dispatch::Skip);
                    }
                }
            }
            BreakpointAction::Enable | BreakpointAction::Disable => {
                let Some(input) = self.input.read_line(NUMBER_PROMPT)? else {
                    return Ok(Dispatch::Skip);
                };
                let number = match BreakpointCommand::parse_number(&input) {
                    Ok(number) => number,
                    Err(e) => {
                        self.print_error(e);
                        return Ok(Dispatch::Skip);
                    }
                };
                if action == BreakpointAction::Enable {
                    BreakpointCommand::Enable(number)
                } else {
                    BreakpointCommand::Disable(number)
                }
            }
        };
        Ok(Dispatch::Command(Command::Breakpoint(cmd)))
    }

    fn handle_command(&self, debugger: &mut Debugger, cmd: &Command) -> HandleResult<()> {
        match cmd {
            Command::Continue => {
                self.printer.print("Continuing");
                Continue::new(debugger).handle()?;
            }
            Command::Quit => {
                self.printer.print("Quitting");
                Quit::new(debugger).handle()?;
            }
            Command::StepOver => {
                self.printer.print("Stepping");
                StepOver::new(debugger).handle()?;
            }
            Command::StepInto => {
                self.printer.print("Stepping In");
                StepInto::new(debugger).handle()?;
            }
            Command::StepOut => {
                self.printer.print("Stepping Out");
                StepOut::new(debugger).handle()?;
            }
            Command::PrintLocals { show_hidden } => {
                let vars = Variables::new(debugger).handle(*show_hidden)?;
                if vars.is_empty() {
                    self.printer.print("  No Locals Found");
                }
                for var in vars {
                    self.printer.print(format!(
                        "  {} {} {}",
                        var.name,
                        var.value(),
                        var.r#type().cyan()
                    ));
                }
            }
            Command::PrintBacktrace { all } => {
                self.printer.print("Stack Trace:");
                for info in Backtrace::new(debugger).handle(*all)? {
                    let name = match &info.method {
                        Some(method) => format!("{}::{}", method.declaring_type, method.name),
                        None => "????".to_string(),
                    };
                    let location = match &info.place {
                        Some(place) => place.to_string(),
                        None => format!("(offset {})", info.frame.ip),
                    };
                    self.printer.print(format!(
                        "  {} -- {} {}",
                        name.green(),
                        location,
                        info.frame.kind
                    ));
                }
            }
            Command::Breakpoint(bp_cmd) => {
                let print_bp = |action: &str, bp: &BreakpointView| {
                    self.printer
                        .print(format!("{action} {}: {}:{}", bp.number, bp.file, bp.line));
                };

                let result = Break::new(debugger).handle(bp_cmd);
                match result {
                    Ok(BreakpointHandlingResult::New(bp)) => print_bp("Breakpoint set", &bp),
                    Ok(BreakpointHandlingResult::Dump(brkpts)) => {
                        if brkpts.is_empty() {
                            self.printer.print("  No breakpoints");
                        }
                        for bp in brkpts {
                            let status = if bp.enabled { "Active" } else { "Inactive" };
                            self.printer.print(format!(
                                "  {}. {}:{} {status}",
                                bp.number, bp.file, bp.line
                            ));
                        }
                    }
                    Ok(BreakpointHandlingResult::Enabled(bp)) => {
                        self.printer.print(format!("Breakpoint {} Enabled", bp.number))
                    }
                    Ok(BreakpointHandlingResult::Disabled(bp)) => {
                        self.printer
                            .print(format!("Breakpoint {} Disabled", bp.number))
                    }
                    Err(e) if matches!(bp_cmd, BreakpointCommand::Add(..)) && !e.is_fatal() => {
                        self.print_error(format!("Add breakpoint failed: {e}"))
                    }
                    Err(e) => return Err(e),
                }
            }
            Command::Help => self.printer.print(help::help(&self.keymap)),
        }
        Ok(())
    }
}

impl Session for ConsoleSession {
    fn interact(&mut self, debugger: &mut Debugger) -> anyhow::Result<()> {
        loop {
            let cmd = match self.next_command()? {
                Dispatch::Skip => continue,
                Dispatch::Command(cmd) => cmd,
            };

            match self.handle_command(debugger, &cmd) {
                Ok(()) if cmd.resumes_debugee() => return Ok(()),
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => self.print_error(format!("Error: {e}")),
            }
        }
    }
}

pub struct AppBuilder {
    interpreter: PathBuf,
    config: Config,
    jmc_stepping: bool,
}

impl AppBuilder {
    pub fn new(interpreter: PathBuf, config: Config) -> Self {
        Self {
            interpreter,
            config,
            jmc_stepping: true,
        }
    }

    pub fn with_jmc_stepping(self, jmc_stepping: bool) -> Self {
        Self {
            jmc_stepping,
            ..self
        }
    }

    /// Launch a script under debugger control.
    pub fn build(self, script: &str, args: &[String]) -> anyhow::Result<TerminalApplication> {
        let debugee = WireDebugee::launch(&self.interpreter, script, args)?;
        sd_info!(target: "console", "debugee {script} launched");

        let printer = Printer::stdout();
        let debugger = DebuggerBuilder::new()
            .with_hooks(TerminalHook::new(printer.clone()))
            .with_jmc_policy(self.config.jmc)
            .with_jmc_stepping(self.jmc_stepping)
            .build(Box::new(debugee), script);
        let session = ConsoleSession::new(TerminalInput::new()?, self.config.keymap, printer);

        Ok(TerminalApplication { debugger, session })
    }
}

pub struct TerminalApplication {
    debugger: Debugger,
    session: ConsoleSession,
}

impl TerminalApplication {
    /// Run debug session until debugee exits, return debugee exit code.
    pub fn run(mut self) -> anyhow::Result<i32> {
        self.session.printer.print(WELCOME_TEXT);
        let code = self.debugger.run(&mut self.session)?;
        Ok(code)
    }
}
