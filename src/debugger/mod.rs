pub mod breakpoint;
pub mod command;
pub mod debugee;
pub mod error;
pub mod jmc;
pub mod location;
pub mod step;
pub mod symbol;
pub mod utils;
pub mod variable;

pub use error::Error;

use crate::debugger::breakpoint::{Breakpoint, BreakpointRegistry, DocumentMatch};
use crate::debugger::debugee::{
    DebugEvent, Debugee, DomainId, FrameDescriptor, MethodInfo, StepMode, StepReason, ThreadId,
};
use crate::debugger::jmc::{JmcPolicy, JmcRegistry};
use crate::debugger::location::{find_place, offset_to_location};
use crate::debugger::symbol::{absolute_path, SequencePoint, SymbolStore};
use crate::debugger::variable::Variable;
use crate::{sd_debug, sd_info, sd_warn, weak_error};
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Source code place of a stopped frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Document url (absolute path of a source file).
    pub file: String,
    pub point: SequencePoint,
}

impl Display for Place {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let file_name = Path::new(&self.file)
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        let sp = &self.point;
        write!(
            f,
            "{file_name} {}:{}-{}:{} (offset:{})",
            sp.start_line, sp.start_column, sp.end_line, sp.end_column, sp.offset
        )
    }
}

/// Stack frame with resolved method information and source place.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub num: usize,
    pub frame: FrameDescriptor,
    pub method: Option<MethodInfo>,
    pub place: Option<Place>,
    pub is_user_code: bool,
}

/// Events reported into a user interface.
pub trait EventHook {
    /// Called when debugee stops at breakpoint.
    fn on_breakpoint(
        &self,
        ip: u32,
        method: Option<&MethodInfo>,
        place: Option<&Place>,
    ) -> anyhow::Result<()>;

    /// Called when step is completed.
    fn on_step(&self, ip: u32, reason: StepReason, place: Option<&Place>) -> anyhow::Result<()>;

    /// Called when debugee process exits.
    fn on_exit(&self, code: i32);
}

pub struct NopHook;

impl EventHook for NopHook {
    fn on_breakpoint(&self, _: u32, _: Option<&MethodInfo>, _: Option<&Place>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_step(&self, _: u32, _: StepReason, _: Option<&Place>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_exit(&self, _: i32) {}
}

/// Interactive part of a debug session. Takes control every time debugee stops.
pub trait Session {
    /// Interact with a user, return when debugee should be resumed.
    fn interact(&mut self, debugger: &mut Debugger) -> anyhow::Result<()>;
}

/// Debugee lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugeeState {
    Launching,
    Running,
    Stopped,
    Terminated,
}

/// Reason of returning control to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint,
    Step(StepReason),
    Exit(i32),
}

/// Mutable session state, valid between a stop and the next resume.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionContext {
    pub active_thread: Option<ThreadId>,
    pub active_domain: Option<DomainId>,
}

impl SessionContext {
    pub fn clear(&mut self) {
        self.active_thread = None;
        self.active_domain = None;
    }

    /// Return stopped thread.
    pub fn thread(&self) -> Result<ThreadId, Error> {
        self.active_thread.ok_or(Error::NoActiveThread)
    }
}

pub struct DebuggerBuilder {
    hooks: Box<dyn EventHook>,
    jmc_policy: JmcPolicy,
    jmc_stepping: bool,
}

impl Default for DebuggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DebuggerBuilder {
    pub fn new() -> Self {
        Self {
            hooks: Box::new(NopHook),
            jmc_policy: JmcPolicy::default(),
            jmc_stepping: true,
        }
    }

    pub fn with_hooks(self, hooks: impl EventHook + 'static) -> Self {
        Self {
            hooks: Box::new(hooks),
            ..self
        }
    }

    pub fn with_jmc_policy(self, jmc_policy: JmcPolicy) -> Self {
        Self { jmc_policy, ..self }
    }

    /// Enable or disable stepping only through user code.
    pub fn with_jmc_stepping(self, jmc_stepping: bool) -> Self {
        Self {
            jmc_stepping,
            ..self
        }
    }

    /// Create debugger for a launched (suspended) debugee.
    ///
    /// # Arguments
    ///
    /// * `debugee`: debugee runtime interface
    /// * `entry_script`: script executed by debugee, initial breakpoint set at its first line
    pub fn build(self, debugee: Box<dyn Debugee>, entry_script: &str) -> Debugger {
        Debugger {
            debugee,
            entry_script: absolute_path(entry_script).to_string_lossy().to_string(),
            state: DebugeeState::Launching,
            ctx: SessionContext::default(),
            symbols: SymbolStore::default(),
            classes: JmcRegistry::new(self.jmc_policy),
            breakpoints: BreakpointRegistry::default(),
            initial_breakpoint: None,
            hooks: self.hooks,
            jmc_stepping: self.jmc_stepping,
        }
    }
}

/// Main structure of a debug engine, owns a debugee and all per process caches.
pub struct Debugger {
    debugee: Box<dyn Debugee>,
    entry_script: String,
    state: DebugeeState,
    ctx: SessionContext,
    symbols: SymbolStore,
    classes: JmcRegistry,
    breakpoints: BreakpointRegistry,
    /// Breakpoint number of the entry script first line.
    initial_breakpoint: Option<u32>,
    hooks: Box<dyn EventHook>,
    jmc_stepping: bool,
}

impl Debugger {
    pub fn state(&self) -> DebugeeState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn symbols(&self) -> &SymbolStore {
        &self.symbols
    }

    pub fn classes(&self) -> &JmcRegistry {
        &self.classes
    }

    pub fn entry_script(&self) -> &str {
        &self.entry_script
    }

    pub fn initial_breakpoint(&self) -> Option<&Breakpoint> {
        self.initial_breakpoint
            .and_then(|number| self.breakpoints.get(number))
    }

    /// Run debugee until it exits. Session takes control on every stop.
    /// Return debugee exit code.
    pub fn run(&mut self, session: &mut dyn Session) -> Result<i32, Error> {
        loop {
            if self.state == DebugeeState::Terminated {
                return self.wait_exit();
            }

            if let StopReason::Exit(code) = self.continue_debugee()? {
                return Ok(code);
            }
            session.interact(self).map_err(Error::Hook)?;
        }
    }

    /// Resume debugee, stop data is invalid after this.
    pub fn resume(&mut self) -> Result<(), Error> {
        self.ctx.clear();
        self.state = DebugeeState::Running;
        self.debugee.resume()
    }

    /// Resume debugee and wait until next stop. This is a single step of [`Debugger::run`],
    /// it allows driving debugee without a [`Session`].
    pub fn continue_debugee(&mut self) -> Result<StopReason, Error> {
        self.resume()?;
        self.wait_stop()
    }

    /// Process debugee events until one of them requires user attention.
    /// Debugee must be running.
    pub fn wait_stop(&mut self) -> Result<StopReason, Error> {
        loop {
            let event = self.debugee.next_event()?;
            if let Some(reason) = self.handle_event(event)? {
                return Ok(reason);
            }
            self.debugee.resume()?;
        }
    }

    /// Handle debug event, return `Some` if debugee should stay stopped.
    fn handle_event(&mut self, event: DebugEvent) -> Result<Option<StopReason>, Error> {
        match event {
            DebugEvent::ProcessExited { code } => {
                sd_debug!(target: "debugger", "OnProcessExit {code}");
                self.state = DebugeeState::Terminated;
                self.hooks.on_exit(code);
                return Ok(Some(StopReason::Exit(code)));
            }
            DebugEvent::AppDomainCreated { domain, name } => {
                sd_debug!(target: "debugger", "OnCreateAppDomain {name}");
                self.debugee.attach_domain(domain)?;
            }
            DebugEvent::ModuleSymbolsReady { module, stream } => {
                sd_debug!(target: "debugger", "OnUpdateModuleSymbols {}", module.name);
                let id = module.id;
                self.symbols.build_index(module, &stream);
                if self.initial_breakpoint.is_none() {
                    self.set_initial_breakpoint(id)?;
                }
            }
            DebugEvent::ClassLoaded { class } => {
                sd_debug!(target: "debugger", "OnClassLoad {}", class.name);
                weak_error!(
                    self.classes.on_class_load(self.debugee.as_mut(), &class),
                    "class classification failed:"
                );
            }
            DebugEvent::BreakpointHit { thread, domain } => {
                let frame = self.active_frame(thread)?;
                let method = frame
                    .function
                    .and_then(|f| weak_error!(self.debugee.method_info(f)));
                let place = self.place(&frame);
                sd_debug!(
                    target: "debugger",
                    "OnBreakpoint {} Location: {}",
                    method.as_ref().map(|m| m.name.as_str()).unwrap_or_default(),
                    location_repr(&frame, place.as_ref())
                );

                self.stop(thread, domain);
                self.hooks
                    .on_breakpoint(frame.ip, method.as_ref(), place.as_ref())
                    .map_err(Error::Hook)?;
                return Ok(Some(StopReason::Breakpoint));
            }
            DebugEvent::StepCompleted {
                thread,
                domain,
                reason,
            } => {
                let frame = self.active_frame(thread)?;
                let place = self.place(&frame);
                sd_debug!(
                    target: "debugger",
                    "OnStepComplete Reason: {reason} Location: {}",
                    location_repr(&frame, place.as_ref())
                );

                // stepped into a call, continue until the end of current line
                if reason == StepReason::Call {
                    let restepped = weak_error!(step::step(
                        self.debugee.as_mut(),
                        &self.symbols,
                        thread,
                        StepMode::Over,
                        self.jmc_stepping
                    ));
                    if restepped.is_some() {
                        return Ok(None);
                    }
                }

                self.stop(thread, domain);
                self.hooks
                    .on_step(frame.ip, reason, place.as_ref())
                    .map_err(Error::Hook)?;
                return Ok(Some(StopReason::Step(reason)));
            }
        }
        Ok(None)
    }

    fn stop(&mut self, thread: ThreadId, domain: DomainId) {
        self.state = DebugeeState::Stopped;
        self.ctx.active_thread = Some(thread);
        self.ctx.active_domain = Some(domain);
    }

    /// Set a breakpoint at the first line of the entry script if module contains it.
    fn set_initial_breakpoint(&mut self, module: u32) -> Result<(), Error> {
        let Some(index) = self.symbols.index(module) else {
            return Ok(());
        };
        match self.breakpoints.add_in_module(
            self.debugee.as_mut(),
            index,
            module,
            &self.entry_script,
            1,
            DocumentMatch::FullPath,
        ) {
            Ok(None) => {}
            Ok(Some(brkpt)) => {
                sd_info!(target: "debugger", "initial breakpoint at offset {}", brkpt.offset);
                self.initial_breakpoint = Some(brkpt.number);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                sd_warn!(target: "debugger", "initial breakpoint not set: {e}");
            }
        }
        Ok(())
    }

    /// Wait for a terminated debugee exit.
    fn wait_exit(&mut self) -> Result<i32, Error> {
        loop {
            match self.debugee.next_event() {
                Ok(DebugEvent::ProcessExited { code }) => {
                    self.hooks.on_exit(code);
                    return Ok(code);
                }
                Ok(event) => {
                    sd_debug!(target: "debugger", "event after termination ignored: {event:?}");
                }
                Err(Error::ProcessExit(code)) => return Ok(code),
                Err(e) => return Err(e),
            }
        }
    }

    fn active_frame(&self, thread: ThreadId) -> Result<FrameDescriptor, Error> {
        self.debugee
            .frames(thread)?
            .into_iter()
            .next()
            .ok_or(Error::NoFrames)
    }

    /// Resolve frame into a source place.
    pub fn place(&self, frame: &FrameDescriptor) -> Option<Place> {
        let point = offset_to_location(&self.symbols, frame)?;
        let module = frame.function?.module;
        Some(Place {
            file: self.symbols.document_url(module, point.document)?.to_string(),
            point: *point,
        })
    }

    /// Return place of a stopped thread.
    pub fn current_place(&self) -> Result<Option<Place>, Error> {
        let frame = self.active_frame(self.ctx.thread()?)?;
        Ok(self.place(&frame))
    }

    /// Force stop and kill debugee.
    pub fn quit(&mut self) -> Result<(), Error> {
        if self.state == DebugeeState::Terminated {
            return Ok(());
        }
        self.debugee.terminate(255)?;
        self.state = DebugeeState::Terminated;
        Ok(())
    }

    fn step(&mut self, mode: StepMode) -> Result<(), Error> {
        let thread = self.ctx.thread()?;
        step::step(
            self.debugee.as_mut(),
            &self.symbols,
            thread,
            mode,
            self.jmc_stepping,
        )?;
        Ok(())
    }

    /// Request a step over current line, debugee should be resumed after.
    pub fn step_over(&mut self) -> Result<(), Error> {
        self.step(StepMode::Over)
    }

    /// Request a step into current line, debugee should be resumed after.
    pub fn step_into(&mut self) -> Result<(), Error> {
        self.step(StepMode::Into)
    }

    /// Request a step out of current method, debugee should be resumed after.
    pub fn step_out(&mut self) -> Result<(), Error> {
        self.step(StepMode::Out)
    }

    /// Return stack trace of a stopped thread.
    ///
    /// # Arguments
    ///
    /// * `all`: if false, infrastructure frames are skipped
    pub fn backtrace(&self, all: bool) -> Result<Vec<FrameInfo>, Error> {
        let thread = self.ctx.thread()?;
        let frames = self.debugee.frames(thread)?;

        let backtrace = frames
            .into_iter()
            .enumerate()
            .map(|(num, frame)| {
                let method = frame
                    .function
                    .and_then(|f| weak_error!(self.debugee.method_info(f)));
                let is_user_code = method
                    .as_ref()
                    .map(|m| self.classes.is_user_method(m))
                    .unwrap_or(false);
                FrameInfo {
                    num,
                    place: self.place(&frame),
                    frame,
                    method,
                    is_user_code,
                }
            })
            .filter(|info| all || info.is_user_code)
            .collect();
        Ok(backtrace)
    }

    /// Read local variables of an active frame.
    pub fn read_locals(&self, show_hidden: bool) -> Result<Vec<Variable>, Error> {
        variable::read_locals(
            self.debugee.as_ref(),
            &self.symbols,
            self.ctx.thread()?,
            0,
            show_hidden,
        )
    }

    /// Read arguments of an active frame.
    pub fn read_arguments(&self, show_hidden: bool) -> Result<Vec<Variable>, Error> {
        variable::read_arguments(self.debugee.as_ref(), self.ctx.thread()?, 0, show_hidden)
    }

    /// Set a breakpoint at the first loaded document with `file` name.
    pub fn add_breakpoint(&mut self, file: &str, line: u32) -> Result<&Breakpoint, Error> {
        self.breakpoints
            .add(self.debugee.as_mut(), &self.symbols, file, line)
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        self.breakpoints.list()
    }

    pub fn enable_breakpoint(&mut self, number: u32) -> Result<&Breakpoint, Error> {
        self.breakpoints.enable(self.debugee.as_mut(), number)
    }

    pub fn disable_breakpoint(&mut self, number: u32) -> Result<&Breakpoint, Error> {
        self.breakpoints.disable(self.debugee.as_mut(), number)
    }

    /// Return a source place of a breakpoint.
    pub fn breakpoint_place(&self, brkpt: &Breakpoint) -> Option<Place> {
        let module = brkpt.function.module;
        let point = find_place(self.symbols.sequence_points(brkpt.function)?, brkpt.offset)?;
        Some(Place {
            file: self.symbols.document_url(module, point.document)?.to_string(),
            point: *point,
        })
    }
}

fn location_repr(frame: &FrameDescriptor, place: Option<&Place>) -> String {
    match place {
        Some(place) => place.to_string(),
        None => format!("offset {}", frame.ip),
    }
}

impl Drop for Debugger {
    fn drop(&mut self) {
        if self.state != DebugeeState::Terminated {
            weak_error!(self.debugee.terminate(255), "debugee termination:");
        }
    }
}
