//! Runtime debug interface.
//!
//! Everything the engine knows about a target process goes through the [`Debugee`] trait:
//! events, execution control, metadata queries, breakpoint patch points, just-my-code flags,
//! stack frames and raw values. A concrete implementation talks to a runtime
//! (see [`wire::WireDebugee`]), tests use a scripted one.

pub mod wire;

use crate::debugger::error::Error;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Debugee thread identifier.
pub type ThreadId = u32;
/// Loaded module identifier, unique for a process lifetime.
pub type ModuleId = u32;
/// Application domain identifier.
pub type DomainId = u32;

/// Reference to a compiled function (method) of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionRef {
    pub module: ModuleId,
    /// Method metadata token.
    pub token: u32,
}

impl FunctionRef {
    pub fn new(module: ModuleId, token: u32) -> Self {
        Self { module, token }
    }
}

/// Reference to a loaded class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassRef {
    pub module: ModuleId,
    /// Type definition metadata token.
    pub token: u32,
}

/// Breakpoint handle issued by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreakpointHandle(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: String,
    /// True for modules generated at runtime (the running script compiled output).
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub class: ClassRef,
    /// Full type name, including namespace.
    pub name: String,
    pub module: ModuleInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub function: FunctionRef,
    pub name: String,
    /// Declaring type name.
    pub declaring_type: String,
    /// Declaring type token.
    pub class_token: u32,
    #[serde(default)]
    pub params: Vec<ParamInfo>,
}

impl MethodInfo {
    pub fn class(&self) -> ClassRef {
        ClassRef {
            module: self.function.module,
            token: self.class_token,
        }
    }
}

/// Kind of stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum FrameKind {
    /// Managed code frame, may be mapped to a source location.
    #[strum(serialize = "ILFrame")]
    Il,
    #[strum(serialize = "NativeFrame")]
    Native,
    /// Runtime internal frame (transitions, stubs, etc.)
    #[strum(serialize = "InternalFrame")]
    Internal,
}

/// Stack frame snapshot, valid until debugee resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    pub function: Option<FunctionRef>,
    /// Current instruction offset.
    pub ip: u32,
    pub kind: FrameKind,
}

impl FrameDescriptor {
    /// Frame without managed code semantic never resolves into source location.
    pub fn is_mappable(&self) -> bool {
        self.kind == FrameKind::Il && self.function.is_some()
    }
}

/// Reason of step completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum StepReason {
    #[strum(serialize = "STEP_NORMAL")]
    Normal,
    #[strum(serialize = "STEP_RETURN")]
    Return,
    /// Stepped across a call boundary.
    #[strum(serialize = "STEP_CALL")]
    Call,
    #[strum(serialize = "STEP_EXCEPTION_FILTER")]
    ExceptionFilter,
    #[strum(serialize = "STEP_EXCEPTION_HANDLER")]
    ExceptionHandler,
    #[strum(serialize = "STEP_INTERCEPT")]
    Intercept,
    #[strum(serialize = "STEP_EXIT")]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum StepMode {
    Into,
    Over,
    Out,
}

/// Instruction range `[start, end)` of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub start: u32,
    pub end: u32,
}

/// A step request, stepper never stops in unmapped code.
///
/// Without a range `Into` and `Over` are single instruction steps, `Out` always
/// unwinds to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRequest {
    pub mode: StepMode,
    pub range: Option<StepRange>,
    /// Stop only in user code frames.
    pub jmc: bool,
}

/// Events reported by a debugee. Target is suspended after each event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DebugEvent {
    ProcessExited {
        code: i32,
    },
    AppDomainCreated {
        domain: DomainId,
        name: String,
    },
    ModuleSymbolsReady {
        module: ModuleInfo,
        stream: Vec<u8>,
    },
    ClassLoaded {
        class: ClassInfo,
    },
    BreakpointHit {
        thread: ThreadId,
        domain: DomainId,
    },
    StepCompleted {
        thread: ThreadId,
        domain: DomainId,
        reason: StepReason,
    },
}

/// Element kind of a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ElementType {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    /// Native sized signed integer.
    I,
    /// Native sized unsigned integer.
    U,
    String,
    Ptr,
    ByRef,
    ValueType,
    Class,
    Object,
    Array,
    SzArray,
    GenericInst,
    Other,
}

/// Value snapshot as the runtime reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawValue {
    /// Reference indirection, `None` target means a null reference.
    Reference {
        declared_type: String,
        target: Option<Box<RawValue>>,
    },
    /// Boxed value type.
    Boxed { inner: Box<RawValue> },
    /// Value itself. Generic values carry little endian bytes, strings carry UTF-8 bytes.
    Data {
        kind: ElementType,
        type_name: String,
        #[serde(default)]
        data: Vec<u8>,
    },
}

/// Interface to a debugee managed runtime.
pub trait Debugee {
    /// Block until next debug event.
    fn next_event(&mut self) -> Result<DebugEvent, Error>;

    /// Continue debugee execution after event.
    fn resume(&mut self) -> Result<(), Error>;

    /// Stop and kill debugee process.
    fn terminate(&mut self, exit_code: i32) -> Result<(), Error>;

    /// Attach debugger to application domain.
    fn attach_domain(&mut self, domain: DomainId) -> Result<(), Error>;

    fn method_info(&self, function: FunctionRef) -> Result<MethodInfo, Error>;

    /// Return all methods of a class.
    fn class_methods(&self, class: ClassRef) -> Result<Vec<MethodInfo>, Error>;

    /// Function instruction stream size.
    fn il_size(&self, function: FunctionRef) -> Result<u32, Error>;

    fn create_breakpoint(
        &mut self,
        function: FunctionRef,
        offset: u32,
    ) -> Result<BreakpointHandle, Error>;

    fn activate_breakpoint(&mut self, handle: BreakpointHandle, active: bool) -> Result<(), Error>;

    fn set_class_jmc(&mut self, class: ClassRef, user_code: bool) -> Result<(), Error>;

    fn set_function_jmc(&mut self, function: FunctionRef, user_code: bool) -> Result<(), Error>;

    /// Thread frames, active frame first.
    fn frames(&self, thread: ThreadId) -> Result<Vec<FrameDescriptor>, Error>;

    fn local_count(&self, thread: ThreadId, frame: usize) -> Result<u32, Error>;

    fn local(&self, thread: ThreadId, frame: usize, slot: u32) -> Result<RawValue, Error>;

    fn argument(&self, thread: ThreadId, frame: usize, index: u32) -> Result<RawValue, Error>;

    fn step(&mut self, thread: ThreadId, request: StepRequest) -> Result<(), Error>;
}
