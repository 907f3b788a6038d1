use scriptdbg::debugger::debugee::{
    BreakpointHandle, ClassInfo, ClassRef, DebugEvent, Debugee, DomainId, ElementType,
    FrameDescriptor, FrameKind, FunctionRef, MethodInfo, ModuleId, ModuleInfo, ParamInfo,
    RawValue, StepReason, StepRequest, ThreadId,
};
use scriptdbg::debugger::symbol::{LocalScope, LocalVariable, SequencePoint, SymbolStreamWriter};
use scriptdbg::debugger::{Debugger, DebuggerBuilder, Error, EventHook, Place, Session};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Entry script of a scripted debugee:
/// ```text
/// 1: import sys
/// 2: def foo(x):
/// 3:     z = x + 1
/// 4:     w = z * 2
/// 5:
/// 6: y = foo(1)
/// 7: print(y)
/// ```
pub const SCRIPT: &str = "/scripts/main.py";
pub const SCRIPT_MODULE: ModuleId = 1;
pub const RUNTIME_MODULE: ModuleId = 2;
pub const MAIN_TOKEN: u32 = 0x0600_0001;
pub const FOO_TOKEN: u32 = 0x0600_0002;
pub const CALL_TOKEN: u32 = 0x0600_0100;
pub const SCRIPT_CLASS: u32 = 0x0200_0002;
pub const RUNTIME_CLASS: u32 = 0x0200_0010;
pub const MAIN_IL_SIZE: u32 = 24;
pub const FOO_IL_SIZE: u32 = 12;
pub const THREAD: ThreadId = 1;
pub const DOMAIN: DomainId = 1;

pub fn sp(offset: u32, line: u32, start_column: u32, end_column: u32) -> SequencePoint {
    SequencePoint {
        offset,
        document: 0,
        start_line: line,
        start_column,
        end_line: line,
        end_column,
    }
}

fn local(name: &str, slot: u32) -> LocalVariable {
    LocalVariable {
        name: name.to_string(),
        slot,
    }
}

pub fn main_points() -> Vec<SequencePoint> {
    vec![
        sp(0, 1, 1, 11),
        sp(4, 2, 1, 12),
        sp(8, 6, 1, 11),
        SequencePoint::hidden(14, 0),
        sp(16, 7, 1, 9),
    ]
}

pub fn foo_points() -> Vec<SequencePoint> {
    vec![sp(0, 3, 5, 14), sp(6, 4, 5, 14)]
}

/// Symbol stream of the entry script module, `document` is a script url.
pub fn script_symbols(document: &str) -> Vec<u8> {
    let foo_scope = LocalScope {
        start: 0,
        end: FOO_IL_SIZE,
        locals: vec![local("$site", 0), local("$temp0", 1), local("z", 2)],
        children: vec![LocalScope {
            start: 6,
            end: FOO_IL_SIZE,
            locals: vec![local("w", 3)],
            children: vec![],
        }],
    };

    let mut writer = SymbolStreamWriter::new();
    writer.add_document(document);
    writer
        .add_method(MAIN_TOKEN, main_points(), None)
        .add_method(FOO_TOKEN, foo_points(), Some(foo_scope));
    writer.finish().unwrap()
}

pub fn script_module() -> ModuleInfo {
    ModuleInfo {
        id: SCRIPT_MODULE,
        name: "main.py".to_string(),
        is_dynamic: true,
    }
}

pub fn runtime_module() -> ModuleInfo {
    ModuleInfo {
        id: RUNTIME_MODULE,
        name: "IronPython.dll".to_string(),
        is_dynamic: false,
    }
}

pub fn il_frame(module: ModuleId, token: u32, ip: u32) -> FrameDescriptor {
    FrameDescriptor {
        function: Some(FunctionRef::new(module, token)),
        ip,
        kind: FrameKind::Il,
    }
}

pub fn native_frame() -> FrameDescriptor {
    FrameDescriptor {
        function: None,
        ip: 0,
        kind: FrameKind::Native,
    }
}

pub fn method(module: ModuleId, token: u32, class: u32, ty: &str, name: &str) -> MethodInfo {
    MethodInfo {
        function: FunctionRef::new(module, token),
        name: name.to_string(),
        declaring_type: ty.to_string(),
        class_token: class,
        params: vec![],
    }
}

pub fn script_class() -> ClassInfo {
    ClassInfo {
        class: ClassRef {
            module: SCRIPT_MODULE,
            token: SCRIPT_CLASS,
        },
        name: "main$1".to_string(),
        module: script_module(),
    }
}

pub fn runtime_class() -> ClassInfo {
    ClassInfo {
        class: ClassRef {
            module: RUNTIME_MODULE,
            token: RUNTIME_CLASS,
        },
        name: "IronPython.Runtime.PythonFunction".to_string(),
        module: runtime_module(),
    }
}

pub fn data(kind: ElementType, ty: &str, data: &[u8]) -> RawValue {
    RawValue::Data {
        kind,
        type_name: ty.to_string(),
        data: data.to_vec(),
    }
}

/// Step of a debugee scenario.
#[derive(Debug, Clone)]
pub enum Script {
    /// Event reported to the debugger.
    Event(DebugEvent),
    /// Thread stack changes before next event.
    Frames(ThreadId, Vec<FrameDescriptor>),
}

pub fn breakpoint_hit() -> Script {
    Script::Event(DebugEvent::BreakpointHit {
        thread: THREAD,
        domain: DOMAIN,
    })
}

pub fn step_completed(reason: StepReason) -> Script {
    Script::Event(DebugEvent::StepCompleted {
        thread: THREAD,
        domain: DOMAIN,
        reason,
    })
}

pub fn frames(frames: Vec<FrameDescriptor>) -> Script {
    Script::Frames(THREAD, frames)
}

/// Load events of the entry script: domain, symbols and classes.
pub fn startup(document: &str) -> Vec<Script> {
    vec![
        Script::Event(DebugEvent::AppDomainCreated {
            domain: DOMAIN,
            name: "main".to_string(),
        }),
        Script::Event(DebugEvent::ClassLoaded {
            class: runtime_class(),
        }),
        Script::Event(DebugEvent::ModuleSymbolsReady {
            module: script_module(),
            stream: script_symbols(document),
        }),
        Script::Event(DebugEvent::ClassLoaded {
            class: script_class(),
        }),
    ]
}

/// Breakpoint as the runtime sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct MockBreakpoint {
    pub function: FunctionRef,
    pub offset: u32,
    pub active: bool,
}

/// Debugee state, shared between a test and a debugger.
#[derive(Default)]
pub struct MockState {
    pub script: VecDeque<Script>,
    pub frames: HashMap<ThreadId, Vec<FrameDescriptor>>,
    pub methods: HashMap<FunctionRef, MethodInfo>,
    pub class_methods: HashMap<ClassRef, Vec<MethodInfo>>,
    pub il_sizes: HashMap<FunctionRef, u32>,
    /// Locals of a frame by slot.
    pub locals: HashMap<usize, Vec<RawValue>>,
    /// Arguments of a frame by position.
    pub arguments: HashMap<usize, Vec<RawValue>>,
    pub breakpoints: Vec<MockBreakpoint>,
    pub class_jmc: HashMap<ClassRef, bool>,
    pub function_jmc: HashMap<FunctionRef, bool>,
    pub steps: Vec<StepRequest>,
    pub attached_domains: Vec<DomainId>,
    pub resumes: usize,
    pub terminated: Option<i32>,
}

/// Scripted debugee, reports events from a predefined scenario.
pub struct MockDebugee {
    state: Rc<RefCell<MockState>>,
}

impl MockDebugee {
    pub fn new() -> (Self, Rc<RefCell<MockState>>) {
        let state = Rc::new(RefCell::new(MockState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }

    /// Debugee running the entry script, `scenario` follows startup events.
    pub fn with_scenario(scenario: Vec<Script>) -> (Self, Rc<RefCell<MockState>>) {
        Self::with_document(SCRIPT, scenario)
    }

    /// Same as [`MockDebugee::with_scenario`], but the script document url is `document`.
    pub fn with_document(
        document: &str,
        scenario: Vec<Script>,
    ) -> (Self, Rc<RefCell<MockState>>) {
        let (debugee, state) = Self::new();
        {
            let mut st = state.borrow_mut();
            st.script.extend(startup(document));
            st.script.extend(scenario);

            let mut main = method(SCRIPT_MODULE, MAIN_TOKEN, SCRIPT_CLASS, "main$1", "<module>");
            main.params = vec![ParamInfo {
                name: "$globalContext".to_string(),
                position: 0,
            }];
            let mut foo = method(SCRIPT_MODULE, FOO_TOKEN, SCRIPT_CLASS, "main$1", "foo");
            foo.params = vec![
                ParamInfo {
                    name: "$function".to_string(),
                    position: 0,
                },
                ParamInfo {
                    name: "x".to_string(),
                    position: 1,
                },
                ParamInfo {
                    name: "$state".to_string(),
                    position: 2,
                },
            ];
            let ctor = method(SCRIPT_MODULE, 0x0600_0003, SCRIPT_CLASS, "main$1", ".ctor");
            let call = method(
                RUNTIME_MODULE,
                CALL_TOKEN,
                RUNTIME_CLASS,
                "IronPython.Runtime.PythonFunction",
                "Call",
            );

            st.class_methods.insert(
                script_class().class,
                vec![main.clone(), foo.clone(), ctor.clone()],
            );
            for m in [main, foo, ctor, call] {
                st.methods.insert(m.function, m);
            }
            st.il_sizes
                .insert(FunctionRef::new(SCRIPT_MODULE, MAIN_TOKEN), MAIN_IL_SIZE);
            st.il_sizes
                .insert(FunctionRef::new(SCRIPT_MODULE, FOO_TOKEN), FOO_IL_SIZE);
        }
        (debugee, state)
    }
}

impl Debugee for MockDebugee {
    fn next_event(&mut self) -> Result<DebugEvent, Error> {
        let mut state = self.state.borrow_mut();
        if let Some(code) = state.terminated {
            return Ok(DebugEvent::ProcessExited { code });
        }
        loop {
            match state.script.pop_front() {
                Some(Script::Frames(thread, frames)) => {
                    state.frames.insert(thread, frames);
                }
                Some(Script::Event(event)) => return Ok(event),
                None => return Ok(DebugEvent::ProcessExited { code: 0 }),
            }
        }
    }

    fn resume(&mut self) -> Result<(), Error> {
        self.state.borrow_mut().resumes += 1;
        Ok(())
    }

    fn terminate(&mut self, exit_code: i32) -> Result<(), Error> {
        self.state.borrow_mut().terminated = Some(exit_code);
        Ok(())
    }

    fn attach_domain(&mut self, domain: DomainId) -> Result<(), Error> {
        self.state.borrow_mut().attached_domains.push(domain);
        Ok(())
    }

    fn method_info(&self, function: FunctionRef) -> Result<MethodInfo, Error> {
        self.state
            .borrow()
            .methods
            .get(&function)
            .cloned()
            .ok_or_else(|| Error::Backend(format!("unknown method {:#x}", function.token)))
    }

    fn class_methods(&self, class: ClassRef) -> Result<Vec<MethodInfo>, Error> {
        self.state
            .borrow()
            .class_methods
            .get(&class)
            .cloned()
            .ok_or_else(|| Error::Backend(format!("unknown class {:#x}", class.token)))
    }

    fn il_size(&self, function: FunctionRef) -> Result<u32, Error> {
        self.state
            .borrow()
            .il_sizes
            .get(&function)
            .copied()
            .ok_or_else(|| Error::Backend("unknown method".to_string()))
    }

    fn create_breakpoint(
        &mut self,
        function: FunctionRef,
        offset: u32,
    ) -> Result<BreakpointHandle, Error> {
        let mut state = self.state.borrow_mut();
        state.breakpoints.push(MockBreakpoint {
            function,
            offset,
            active: false,
        });
        Ok(BreakpointHandle(state.breakpoints.len() as u32 - 1))
    }

    fn activate_breakpoint(&mut self, handle: BreakpointHandle, active: bool) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        let brkpt = state
            .breakpoints
            .get_mut(handle.0 as usize)
            .ok_or_else(|| Error::Backend("unknown breakpoint".to_string()))?;
        brkpt.active = active;
        Ok(())
    }

    fn set_class_jmc(&mut self, class: ClassRef, user_code: bool) -> Result<(), Error> {
        self.state.borrow_mut().class_jmc.insert(class, user_code);
        Ok(())
    }

    fn set_function_jmc(&mut self, function: FunctionRef, user_code: bool) -> Result<(), Error> {
        self.state
            .borrow_mut()
            .function_jmc
            .insert(function, user_code);
        Ok(())
    }

    fn frames(&self, thread: ThreadId) -> Result<Vec<FrameDescriptor>, Error> {
        Ok(self
            .state
            .borrow()
            .frames
            .get(&thread)
            .cloned()
            .unwrap_or_default())
    }

    fn local_count(&self, _: ThreadId, frame: usize) -> Result<u32, Error> {
        Ok(self
            .state
            .borrow()
            .locals
            .get(&frame)
            .map(|l| l.len() as u32)
            .unwrap_or_default())
    }

    fn local(&self, _: ThreadId, frame: usize, slot: u32) -> Result<RawValue, Error> {
        self.state
            .borrow()
            .locals
            .get(&frame)
            .and_then(|l| l.get(slot as usize))
            .cloned()
            .ok_or_else(|| Error::Backend(format!("no local at slot {slot}")))
    }

    fn argument(&self, _: ThreadId, frame: usize, index: u32) -> Result<RawValue, Error> {
        self.state
            .borrow()
            .arguments
            .get(&frame)
            .and_then(|a| a.get(index as usize))
            .cloned()
            .ok_or_else(|| Error::Backend(format!("no argument at {index}")))
    }

    fn step(&mut self, _: ThreadId, request: StepRequest) -> Result<(), Error> {
        self.state.borrow_mut().steps.push(request);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    Breakpoint { ip: u32, method: Option<String> },
    Step { ip: u32, reason: StepReason },
    Exit(i32),
}

#[derive(Clone, Default)]
pub struct TestInfo {
    pub events: Rc<RefCell<Vec<HookEvent>>>,
    pub line: Rc<Cell<Option<u32>>>,
    pub file: Rc<RefCell<Option<String>>>,
}

#[derive(Default)]
pub struct TestHooks {
    info: TestInfo,
}

impl TestHooks {
    pub fn new(info: TestInfo) -> Self {
        Self { info }
    }

    fn set_place(&self, place: Option<&Place>) {
        self.info.line.set(place.map(|p| p.point.start_line));
        self.info.file.replace(place.map(|p| p.file.clone()));
    }
}

impl EventHook for TestHooks {
    fn on_breakpoint(
        &self,
        ip: u32,
        method: Option<&MethodInfo>,
        place: Option<&Place>,
    ) -> anyhow::Result<()> {
        self.info.events.borrow_mut().push(HookEvent::Breakpoint {
            ip,
            method: method.map(|m| m.name.clone()),
        });
        self.set_place(place);
        Ok(())
    }

    fn on_step(&self, ip: u32, reason: StepReason, place: Option<&Place>) -> anyhow::Result<()> {
        self.info
            .events
            .borrow_mut()
            .push(HookEvent::Step { ip, reason });
        self.set_place(place);
        Ok(())
    }

    fn on_exit(&self, code: i32) {
        self.info.events.borrow_mut().push(HookEvent::Exit(code));
    }
}

/// Create debugger over a scripted debugee.
pub fn debugger(scenario: Vec<Script>) -> (Debugger, Rc<RefCell<MockState>>, TestInfo) {
    let (debugee, state) = MockDebugee::with_scenario(scenario);
    let info = TestInfo::default();
    let debugger = DebuggerBuilder::new()
        .with_hooks(TestHooks::new(info.clone()))
        .build(Box::new(debugee), SCRIPT);
    (debugger, state, info)
}

/// Session driven by a test closure, called on every stop.
pub struct TestSession<F>(F);

impl<F> TestSession<F>
where
    F: FnMut(&mut Debugger) -> anyhow::Result<()>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Session for TestSession<F>
where
    F: FnMut(&mut Debugger) -> anyhow::Result<()>,
{
    fn interact(&mut self, debugger: &mut Debugger) -> anyhow::Result<()> {
        (self.0)(debugger)
    }
}
