use crate::common::{
    breakpoint_hit, data, debugger, frames, il_frame, step_completed, MockDebugee, FOO_TOKEN,
    MAIN_TOKEN, SCRIPT, SCRIPT_MODULE,
};
use scriptdbg::console::config::KeyMap;
use scriptdbg::console::hook::TerminalHook;
use scriptdbg::console::input::ScriptedInput;
use scriptdbg::console::print::Printer;
use scriptdbg::console::ConsoleSession;
use scriptdbg::debugger::debugee::{ElementType, StepReason};
use scriptdbg::debugger::DebuggerBuilder;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn output(buffer: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    buffer.lock().unwrap().clone()
}

fn contains(out: &[String], pattern: &str) -> bool {
    out.iter().any(|line| line.contains(pattern))
}

#[test]
fn test_console_session() {
    let (mut debugger, state, _) = debugger(vec![
        frames(vec![
            il_frame(SCRIPT_MODULE, FOO_TOKEN, 6),
            il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
        ]),
        breakpoint_hit(),
    ]);
    state.borrow_mut().locals.insert(
        0,
        vec![
            data(ElementType::Class, "IronPython.Runtime.CallSite", &[]),
            data(ElementType::String, "System.String", b"tmp"),
            data(ElementType::I4, "System.Int32", &2i32.to_le_bytes()),
            data(ElementType::Class, "IronPython.Runtime.List", &[]),
        ],
    );

    let input = ScriptedInput::new()
        .key('l')
        .alt_key('l')
        .key('t')
        .key('x')
        .key('b')
        .key('l')
        .key('b')
        .key('a')
        .line("main.py:7")
        .key('b')
        .key('a')
        .line("main.py")
        .key('b')
        .key('a')
        .line("other.py:1")
        .key('b')
        .key('d')
        .line("1")
        .key('b')
        .key('e')
        .line("9")
        .key('b')
        .key('z')
        .key('h')
        .key(' ');
    let (printer, buffer) = Printer::capturing();
    let mut session = ConsoleSession::new(input, KeyMap::default(), printer);

    let code = debugger.run(&mut session).unwrap();
    assert_eq!(code, 0);

    let out = output(&buffer);
    // locals, arguments have no values
    assert!(contains(&out, "  z 2 "));
    assert!(contains(&out, "  w <...> "));
    assert!(contains(&out, "IronPython.Runtime.List"));
    assert!(contains(&out, "  $temp0 \"tmp\" "));
    assert!(contains(&out, "no argument at 1"));

    assert!(contains(&out, "Stack Trace:"));
    assert!(contains(&out, "main.py 4:5-4:14 (offset:6) ILFrame"));
    assert!(contains(&out, "main.py 6:1-6:11 (offset:8) ILFrame"));

    assert!(contains(&out, "Please enter a valid command"));
    assert!(contains(&out, &format!("  1. {SCRIPT}:1 Active")));
    assert!(contains(&out, &format!("Breakpoint set 2: {SCRIPT}:7")));
    assert_eq!(
        out.iter()
            .filter(|l| l.contains("Add breakpoint failed"))
            .count(),
        2
    );
    assert!(contains(&out, "Breakpoint 1 Disabled"));
    assert!(contains(&out, "breakpoint 9 not found"));
    assert!(contains(&out, "Invalid breakpoint command z"));
    assert!(contains(&out, "Available debugger commands"));
    assert_eq!(out.last().map(String::as_str), Some("Continuing"));

    let state = state.borrow();
    assert_eq!(
        state
            .breakpoints
            .iter()
            .map(|b| (b.offset, b.active))
            .collect::<Vec<_>>(),
        vec![(0, false), (16, true)]
    );
}

#[test]
fn test_console_steps() {
    let (mut debugger, state, _) = debugger(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 0)]),
        breakpoint_hit(),
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 4)]),
        step_completed(StepReason::Normal),
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8)]),
        step_completed(StepReason::Normal),
    ]);

    let input = ScriptedInput::new().key('s').key('i').key(' ');
    let (printer, buffer) = Printer::capturing();
    let mut session = ConsoleSession::new(input, KeyMap::default(), printer);
    debugger.run(&mut session).unwrap();

    let out = output(&buffer);
    assert_eq!(out, vec!["Stepping", "Stepping In", "Continuing"]);
    assert_eq!(state.borrow().steps.len(), 2);
}

#[test]
fn test_console_quit_on_input_end() {
    let (mut debugger, state, _) = debugger(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 0)]),
        breakpoint_hit(),
    ]);

    let (printer, buffer) = Printer::capturing();
    let mut session = ConsoleSession::new(ScriptedInput::new(), KeyMap::default(), printer);
    let code = debugger.run(&mut session).unwrap();

    assert_eq!(code, 255);
    assert_eq!(state.borrow().terminated, Some(255));
    assert_eq!(output(&buffer), vec!["Quitting"]);
}

#[test]
fn test_console_custom_keymap() {
    let (mut debugger, _, _) = debugger(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 0)]),
        breakpoint_hit(),
    ]);

    let keymap = KeyMap::with_bindings(&HashMap::from([(
        "quit".to_string(),
        "Q".to_string(),
    )]));
    let input = ScriptedInput::new().key('q').key('Q');
    let (printer, buffer) = Printer::capturing();
    let mut session = ConsoleSession::new(input, keymap, printer);

    assert_eq!(debugger.run(&mut session).unwrap(), 255);
    assert_eq!(
        output(&buffer),
        vec!["Please enter a valid command", "Quitting"]
    );
}

#[test]
fn test_terminal_hook() {
    let (debugee, _) = MockDebugee::with_scenario(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 0)]),
        breakpoint_hit(),
    ]);
    let (printer, buffer) = Printer::capturing();
    let mut debugger = DebuggerBuilder::new()
        .with_hooks(TerminalHook::new(printer.clone()))
        .build(Box::new(debugee), SCRIPT);
    let input = ScriptedInput::new().key(' ');
    let mut session = ConsoleSession::new(input, KeyMap::default(), printer);

    debugger.run(&mut session).unwrap();

    let out = output(&buffer);
    assert!(out[0].starts_with("Hit breakpoint in "));
    assert!(out[0].contains("<module>"));
    // script source is absent
    assert!(out[1].contains("main.py 1:1-1:11 (offset:0)"));
    assert!(out[1].contains("source unavailable"));
    assert_eq!(out[2], "Continuing");
    assert_eq!(out[3], "Program exit with code: 0");
}
