use crate::common::{
    breakpoint_hit, debugger, frames, il_frame, HookEvent, MockBreakpoint, TestSession,
    FOO_TOKEN, MAIN_TOKEN, SCRIPT, SCRIPT_MODULE,
};
use scriptdbg::debugger::command::{
    Break, BreakpointCommand, BreakpointHandlingResult, BreakpointView,
};
use scriptdbg::debugger::debugee::FunctionRef;
use scriptdbg::debugger::{Debugger, Error};

/// Run debugger until the initial breakpoint and execute `f` there.
fn at_initial_breakpoint(f: impl FnOnce(&mut Debugger)) -> Vec<MockBreakpoint> {
    let (mut debugger, state, _) =
        debugger(vec![frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 0)]), breakpoint_hit()]);
    let mut f = Some(f);
    debugger
        .run(&mut TestSession::new(|dbg| {
            if let Some(f) = f.take() {
                f(dbg);
            }
            Ok(())
        }))
        .unwrap();
    let breakpoints = state.borrow().breakpoints.clone();
    breakpoints
}

#[test]
fn test_brkpt_on_line() {
    let breakpoints = at_initial_breakpoint(|dbg| {
        let brkpt = dbg.add_breakpoint("main.py", 3).unwrap();
        assert_eq!(brkpt.number, 2);
        assert_eq!(brkpt.function, FunctionRef::new(SCRIPT_MODULE, FOO_TOKEN));
        assert_eq!(brkpt.offset, 0);

        let brkpt = dbg.add_breakpoint("main.py", 7).unwrap();
        assert_eq!(brkpt.number, 3);
        assert_eq!(brkpt.function, FunctionRef::new(SCRIPT_MODULE, MAIN_TOKEN));
        assert_eq!(brkpt.offset, 16);
    });

    assert_eq!(breakpoints.len(), 3);
    assert!(breakpoints.iter().all(|b| b.active));
}

#[test]
fn test_brkpt_on_line_without_code() {
    at_initial_breakpoint(|dbg| {
        // line 5 is empty, next line with code is used
        let brkpt = dbg.add_breakpoint("main.py", 5).unwrap().clone();
        assert_eq!(brkpt.function, FunctionRef::new(SCRIPT_MODULE, MAIN_TOKEN));
        assert_eq!(brkpt.offset, 8);
        assert_eq!(brkpt.requested_line, 5);

        let place = dbg.breakpoint_place(&brkpt).unwrap();
        assert_eq!(place.file, SCRIPT);
        assert_eq!(place.point.start_line, 6);
    });
}

#[test]
fn test_brkpt_file_name_case_insensitive() {
    at_initial_breakpoint(|dbg| {
        let brkpt = dbg.add_breakpoint("/another/dir/MAIN.PY", 4).unwrap();
        assert_eq!(brkpt.function, FunctionRef::new(SCRIPT_MODULE, FOO_TOKEN));
        assert_eq!(brkpt.offset, 6);
    });
}

#[test]
fn test_brkpt_resolution_errors() {
    let breakpoints = at_initial_breakpoint(|dbg| {
        assert!(matches!(
            dbg.add_breakpoint("other.py", 1),
            Err(Error::DocumentNotFound(_))
        ));
        assert!(matches!(
            dbg.add_breakpoint("main.py", 100),
            Err(Error::SymbolResolution { line: 100, .. })
        ));
        assert_eq!(dbg.breakpoints().len(), 1);
    });
    assert_eq!(breakpoints.len(), 1);
}

#[test]
fn test_brkpt_enable_disable() {
    let breakpoints = at_initial_breakpoint(|dbg| {
        dbg.add_breakpoint("main.py", 3).unwrap();

        let brkpt = dbg.disable_breakpoint(2).unwrap();
        assert!(!brkpt.is_enabled());
        let brkpt = dbg.disable_breakpoint(1).unwrap();
        assert!(!brkpt.is_enabled());
        let brkpt = dbg.enable_breakpoint(1).unwrap();
        assert!(brkpt.is_enabled());

        assert!(matches!(
            dbg.enable_breakpoint(42),
            Err(Error::BreakpointNotFound(42))
        ));
    });

    assert_eq!(
        breakpoints.iter().map(|b| b.active).collect::<Vec<_>>(),
        vec![true, false]
    );
}

#[test]
fn test_brkpt_disable_twice() {
    let breakpoints = at_initial_breakpoint(|dbg| {
        dbg.add_breakpoint("main.py", 7).unwrap();

        let brkpt = dbg.disable_breakpoint(2).unwrap();
        assert!(!brkpt.is_enabled());
        let brkpt = dbg.disable_breakpoint(2).unwrap();
        assert!(!brkpt.is_enabled());
        assert!(!dbg.breakpoints()[1].is_enabled());
    });

    assert_eq!(
        breakpoints.iter().map(|b| b.active).collect::<Vec<_>>(),
        vec![true, false]
    );
}

#[test]
fn test_brkpt_command() {
    at_initial_breakpoint(|dbg| {
        let (file, line) = BreakpointCommand::parse_location("main.py:4").unwrap();
        match Break::new(dbg)
            .handle(&BreakpointCommand::Add(file, line))
            .unwrap()
        {
            BreakpointHandlingResult::New(view) => assert_eq!(
                view,
                BreakpointView {
                    number: 2,
                    file: SCRIPT.to_string(),
                    line: 4,
                    enabled: true,
                }
            ),
            _ => panic!("new breakpoint expected"),
        }

        Break::new(dbg)
            .handle(&BreakpointCommand::Disable(1))
            .unwrap();
        let BreakpointHandlingResult::Dump(views) =
            Break::new(dbg).handle(&BreakpointCommand::List).unwrap()
        else {
            panic!("breakpoint list expected");
        };
        assert_eq!(
            views
                .iter()
                .map(|v| (v.number, v.line, v.enabled))
                .collect::<Vec<_>>(),
            vec![(1, 1, false), (2, 4, true)]
        );

        assert!(matches!(
            Break::new(dbg).handle(&BreakpointCommand::Enable(3)),
            Err(Error::BreakpointNotFound(3))
        ));
    });
}

#[test]
fn test_brkpt_hit_in_function() {
    let (mut debugger, _, info) = debugger(vec![
        frames(vec![il_frame(SCRIPT_MODULE, MAIN_TOKEN, 0)]),
        breakpoint_hit(),
        frames(vec![
            il_frame(SCRIPT_MODULE, FOO_TOKEN, 0),
            il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
        ]),
        breakpoint_hit(),
    ]);

    let mut stops = 0;
    debugger
        .run(&mut TestSession::new(|dbg| {
            stops += 1;
            if stops == 1 {
                dbg.add_breakpoint("main.py", 3)?;
            }
            Ok(())
        }))
        .unwrap();

    assert_eq!(stops, 2);
    assert_eq!(
        info.events.borrow()[1],
        HookEvent::Breakpoint {
            ip: 0,
            method: Some("foo".to_string())
        }
    );
    assert_eq!(info.line.get(), Some(3));
}
