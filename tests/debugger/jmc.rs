use crate::common::{
    breakpoint_hit, debugger, frames, il_frame, native_frame, runtime_class, script_class,
    TestSession, CALL_TOKEN, FOO_TOKEN, MAIN_TOKEN, RUNTIME_MODULE, SCRIPT_MODULE,
};
use scriptdbg::debugger::command::Backtrace;
use scriptdbg::debugger::debugee::{FrameDescriptor, FrameKind, FunctionRef};
use std::collections::HashMap;

fn stack() -> Vec<FrameDescriptor> {
    vec![
        il_frame(SCRIPT_MODULE, FOO_TOKEN, 6),
        native_frame(),
        il_frame(RUNTIME_MODULE, CALL_TOKEN, 3),
        il_frame(SCRIPT_MODULE, MAIN_TOKEN, 8),
    ]
}

#[test]
fn test_class_classification() {
    let (mut debugger, state, _) = debugger(vec![]);
    debugger
        .run(&mut TestSession::new(|_| Ok(())))
        .unwrap();

    let state = state.borrow();
    assert_eq!(state.class_jmc.get(&script_class().class), Some(&true));
    assert_eq!(state.class_jmc.get(&runtime_class().class), Some(&false));
    // constructor of a user class is infrastructure
    assert_eq!(
        state.function_jmc,
        HashMap::from([(FunctionRef::new(SCRIPT_MODULE, 0x0600_0003), false)])
    );

    let record = debugger.classes().record(script_class().class).unwrap();
    assert!(record.is_user_code);
    assert!(record.is_user_method(FOO_TOKEN));
    assert!(!record.is_user_method(0x0600_0003));
    assert!(!debugger
        .classes()
        .record(runtime_class().class)
        .unwrap()
        .is_user_code);
}

#[test]
fn test_user_backtrace() {
    let (mut debugger, _, _) = debugger(vec![frames(stack()), breakpoint_hit()]);

    debugger
        .run(&mut TestSession::new(|dbg| {
            let bt = Backtrace::new(dbg).handle(false)?;
            assert_eq!(
                bt.iter()
                    .map(|f| (f.num, f.method.as_ref().map(|m| m.name.as_str())))
                    .collect::<Vec<_>>(),
                vec![(0, Some("foo")), (3, Some("<module>"))]
            );
            assert!(bt.iter().all(|f| f.is_user_code));
            assert_eq!(bt[0].place.as_ref().unwrap().point.start_line, 4);
            assert_eq!(bt[1].place.as_ref().unwrap().point.start_line, 6);
            Ok(())
        }))
        .unwrap();
}

#[test]
fn test_full_backtrace() {
    let (mut debugger, _, _) = debugger(vec![frames(stack()), breakpoint_hit()]);

    debugger
        .run(&mut TestSession::new(|dbg| {
            let bt = Backtrace::new(dbg).handle(true)?;
            assert_eq!(bt.len(), 4);
            assert_eq!(
                bt.iter().map(|f| f.is_user_code).collect::<Vec<_>>(),
                vec![true, false, false, true]
            );

            assert_eq!(bt[1].frame.kind, FrameKind::Native);
            assert!(bt[1].method.is_none());
            assert!(bt[1].place.is_none());

            let call = bt[2].method.as_ref().unwrap();
            assert_eq!(call.declaring_type, "IronPython.Runtime.PythonFunction");
            assert!(bt[2].place.is_none());
            Ok(())
        }))
        .unwrap();
}
