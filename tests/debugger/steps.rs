use crate::common::{
    breakpoint_hit, debugger, frames, il_frame, native_frame, step_completed, HookEvent,
    MockDebugee, TestSession, CALL_TOKEN, FOO_IL_SIZE, FOO_TOKEN, MAIN_TOKEN, RUNTIME_MODULE,
    SCRIPT, SCRIPT_MODULE,
};
use scriptdbg::debugger::debugee::{StepMode, StepRange, StepReason, StepRequest};
use scriptdbg::debugger::{DebuggerBuilder, Error};

fn request(mode: StepMode, range: Option<(u32, u32)>) -> StepRequest {
    StepRequest {
        mode,
        range: range.map(|(start, end)| StepRange { start, end }),
        jmc: true,
    }
}

#[test]
fn test_step_over() {
    let (mut debugger, state, info) = debugger(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8)]),
        breakpoint_hit(),
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 16)]),
        step_completed(StepReason::Normal),
    ]);

    let mut lines = vec![];
    debugger
        .run(&mut TestSession::new(|dbg| {
            let place = dbg.current_place()?.unwrap();
            lines.push(place.point.start_line);
            if lines.len() == 1 {
                dbg.step_over()?;
            }
            Ok(())
        }))
        .unwrap();

    assert_eq!(lines, vec![6, 7]);
    // hidden sequence point at offset 14 doesn't split a line
    assert_eq!(
        state.borrow().steps,
        vec![request(StepMode::Over, Some((8, 16)))]
    );
    assert_eq!(
        info.events.borrow()[1],
        HookEvent::Step {
            ip: 16,
            reason: StepReason::Normal
        }
    );
}

#[test]
fn test_step_into_restep_call() {
    let (mut debugger, state, info) = debugger(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8)]),
        breakpoint_hit(),
        frames(vec![
            il_frame(SCRIPT_MODULE, FOO_TOKEN, 0),
            il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
        ]),
        step_completed(StepReason::Call),
        frames(vec![
            il_frame(SCRIPT_MODULE, FOO_TOKEN, 6),
            il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
        ]),
        step_completed(StepReason::Normal),
    ]);

    let mut stops = 0;
    debugger
        .run(&mut TestSession::new(|dbg| {
            stops += 1;
            if stops == 1 {
                dbg.step_into()?;
            } else {
                let place = dbg.current_place()?.unwrap();
                assert_eq!(place.point.start_line, 4);
            }
            Ok(())
        }))
        .unwrap();

    assert_eq!(stops, 2);
    assert_eq!(
        state.borrow().steps,
        vec![
            request(StepMode::Into, Some((8, 16))),
            request(StepMode::Over, Some((0, 6))),
        ]
    );

    // call boundary stop is never reported
    let events = info.events.borrow();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, HookEvent::Step { .. }))
            .collect::<Vec<_>>(),
        vec![&HookEvent::Step {
            ip: 6,
            reason: StepReason::Normal
        }]
    );
}

#[test]
fn test_step_at_last_line_ends_at_method_end() {
    let (mut debugger, state, _) = debugger(vec![
        frames(vec![
            il_frame(SCRIPT_MODULE, FOO_TOKEN, 6),
            il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
        ]),
        breakpoint_hit(),
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8)]),
        step_completed(StepReason::Return),
    ]);

    let mut stops = 0;
    debugger
        .run(&mut TestSession::new(|dbg| {
            stops += 1;
            if stops == 1 {
                dbg.step_over()?;
            }
            Ok(())
        }))
        .unwrap();

    assert_eq!(
        state.borrow().steps,
        vec![request(StepMode::Over, Some((6, FOO_IL_SIZE)))]
    );
}

#[test]
fn test_step_out() {
    let (mut debugger, state, _) = debugger(vec![
        frames(vec![
            il_frame(SCRIPT_MODULE, FOO_TOKEN, 0),
            il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
        ]),
        breakpoint_hit(),
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8)]),
        step_completed(StepReason::Return),
    ]);

    let mut stops = 0;
    debugger
        .run(&mut TestSession::new(|dbg| {
            stops += 1;
            if stops == 1 {
                dbg.step_out()?;
            } else {
                assert_eq!(dbg.current_place()?.unwrap().point.start_line, 6);
            }
            Ok(())
        }))
        .unwrap();

    assert_eq!(stops, 2);
    assert_eq!(state.borrow().steps, vec![request(StepMode::Out, None)]);
}

#[test]
fn test_step_without_symbols() {
    let (mut debugger, state, info) = debugger(vec![
        frames(vec![
            il_frame(RUNTIME_MODULE, CALL_TOKEN, 3),
            il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
        ]),
        breakpoint_hit(),
        frames(vec![native_frame()]),
        step_completed(StepReason::Normal),
    ]);

    let mut stops = 0;
    debugger
        .run(&mut TestSession::new(|dbg| {
            stops += 1;
            assert!(dbg.current_place()?.is_none());
            if stops == 1 {
                dbg.step_over()?;
            } else {
                dbg.step_into()?;
            }
            Ok(())
        }))
        .unwrap();

    assert_eq!(
        state.borrow().steps,
        vec![request(StepMode::Over, None), request(StepMode::Into, None)]
    );
    assert_eq!(info.line.get(), None);
}

#[test]
fn test_step_without_jmc() {
    let (debugee, state) = MockDebugee::with_scenario(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 0)]),
        breakpoint_hit(),
    ]);
    let mut debugger = DebuggerBuilder::new()
        .with_jmc_stepping(false)
        .build(Box::new(debugee), SCRIPT);

    debugger.continue_debugee().unwrap();
    debugger.step_into().unwrap();

    assert_eq!(
        state.borrow().steps,
        vec![StepRequest {
            mode: StepMode::Into,
            range: Some(StepRange { start: 0, end: 4 }),
            jmc: false,
        }]
    );
}

#[test]
fn test_step_requires_stopped_thread() {
    let (mut debugger, state, _) = debugger(vec![]);
    assert!(matches!(debugger.step_over(), Err(Error::NoActiveThread)));
    assert!(matches!(debugger.step_out(), Err(Error::NoActiveThread)));
    assert!(state.borrow().steps.is_empty());
}
