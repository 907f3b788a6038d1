use crate::console::config::{Action, BreakpointAction, KeyMap};
use itertools::Itertools;
use strum::IntoEnumIterator;

fn describe(action: Action) -> &'static str {
    match action {
        Action::Continue => "continue program being debugged",
        Action::Quit => "terminate program and exit",
        Action::Locals => "show local variables and arguments",
        Action::LocalsAll => "show local variables and arguments, including generated ones",
        Action::Trace => "show stack trace of user code",
        Action::TraceAll => "show stack trace, including runtime frames",
        Action::StepOver => "step program, stepping over calls",
        Action::StepInto => "step program until it reaches a different source line",
        Action::StepOut => "execute program until current method returns",
        Action::Breakpoint => "manage breakpoints, followed by a breakpoint command",
        Action::Help => "show help",
    }
}

fn describe_breakpoint(action: BreakpointAction) -> &'static str {
    match action {
        BreakpointAction::Add => "add breakpoint, reads `<file>:<line>`",
        BreakpointAction::List => "list breakpoints",
        BreakpointAction::Enable => "enable breakpoint, reads breakpoint number",
        BreakpointAction::Disable => "disable breakpoint, reads breakpoint number",
    }
}

/// Render help for a key map.
pub fn help(keymap: &KeyMap) -> String {
    let keys = |keys: Vec<_>| keys.into_iter().map(ToString::to_string).sorted().join("|");

    let mut help = String::from("Available debugger commands:\n\n");
    for action in Action::iter() {
        help.push_str(&format!(
            "{:<20} -- {}\n",
            keys(keymap.keys_for_action(action)),
            describe(action)
        ));
    }
    help.push_str("\nBreakpoint commands:\n\n");
    for action in BreakpointAction::iter() {
        help.push_str(&format!(
            "{:<20} -- {}\n",
            keys(keymap.keys_for_breakpoint_action(action)),
            describe_breakpoint(action)
        ));
    }
    help
}
