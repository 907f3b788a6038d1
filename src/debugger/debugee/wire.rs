//! JSON-lines debug protocol over a loopback TCP connection.
//!
//! Debugger listens on `127.0.0.1`, interpreter is started with `-D` flag and
//! `SDBG_DEBUG_ADDR` environment variable and connects back. Each message is a single
//! line with a JSON object:
//! ```text
//! debugger -> runtime: {"id": 1, "request": {"type": "Frames", "thread": 1}}
//! runtime -> debugger: {"id": 1, "result": [...]} | {"id": 1, "error": "..."}
//! runtime -> debugger: {"event": {"type": "BreakpointHit", "thread": 1, "domain": 1}}
//! ```

use crate::debugger::debugee::{
    BreakpointHandle, ClassRef, DebugEvent, Debugee, DomainId, FrameDescriptor, FunctionRef,
    MethodInfo, RawValue, StepRequest, ThreadId,
};
use crate::debugger::error::Error;
use crate::{muted_error, sd_debug, sd_warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Duration;

/// Environment variable with a debugger address, runtime should connect to it.
pub const DEBUG_ADDR_ENV: &str = "SDBG_DEBUG_ADDR";
/// Interpreter flag that enables debug mode.
pub const DEBUG_FLAG: &str = "-D";
/// Exit code reported if real code is unknown.
const UNKNOWN_EXIT_CODE: i32 = 255;

/// Debugger to runtime requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Resume,
    Terminate {
        exit_code: i32,
    },
    AttachDomain {
        domain: DomainId,
    },
    MethodInfo {
        function: FunctionRef,
    },
    ClassMethods {
        class: ClassRef,
    },
    IlSize {
        function: FunctionRef,
    },
    CreateBreakpoint {
        function: FunctionRef,
        offset: u32,
    },
    ActivateBreakpoint {
        handle: BreakpointHandle,
        active: bool,
    },
    SetClassJmc {
        class: ClassRef,
        user_code: bool,
    },
    SetFunctionJmc {
        function: FunctionRef,
        user_code: bool,
    },
    Frames {
        thread: ThreadId,
    },
    LocalCount {
        thread: ThreadId,
        frame: usize,
    },
    Local {
        thread: ThreadId,
        frame: usize,
        slot: u32,
    },
    Argument {
        thread: ThreadId,
        frame: usize,
        index: u32,
    },
    Step {
        thread: ThreadId,
        request: StepRequest,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestMessage {
    pub id: u64,
    pub request: Request,
}

/// Runtime to debugger message, either an event or a response to request.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<DebugEvent>,
}

type Response = (u64, Result<serde_json::Value, String>);

/// Read runtime messages until connection closed, events and responses are sent
/// into separate channels.
fn read_loop(stream: TcpStream, events: Sender<DebugEvent>, responses: Sender<Response>) {
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                sd_debug!(target: "debugger", "debug connection: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let msg: IncomingMessage = match serde_json::from_str(&line) {
            Ok(msg) => msg,
            Err(e) => {
                sd_warn!(target: "debugger", "malformed runtime message ignored: {e}");
                continue;
            }
        };

        let sent = match msg {
            IncomingMessage {
                event: Some(event), ..
            } => events.send(event).is_ok(),
            IncomingMessage {
                id: Some(id),
                error: Some(error),
                ..
            } => responses.send((id, Err(error))).is_ok(),
            IncomingMessage {
                id: Some(id),
                result,
                ..
            } => responses
                .send((id, Ok(result.unwrap_or(serde_json::Value::Null))))
                .is_ok(),
            _ => {
                sd_warn!(target: "debugger", "runtime message without id or event ignored");
                true
            }
        };
        if !sent {
            break;
        }
    }
}

/// [`Debugee`] implementation over the wire protocol.
pub struct WireDebugee {
    stream: TcpStream,
    child: RefCell<Option<Child>>,
    events: Receiver<DebugEvent>,
    responses: Receiver<Response>,
    next_id: Cell<u64>,
    exited: bool,
}

impl WireDebugee {
    /// Start an interpreter in debug mode and wait until it connects.
    pub fn launch(interpreter: &Path, script: &str, args: &[String]) -> Result<Self, Error> {
        let launch_err = |e: std::io::Error| Error::Launch(interpreter.display().to_string(), e);

        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let mut child = Command::new(interpreter)
            .arg(DEBUG_FLAG)
            .arg(script)
            .args(args)
            .env(DEBUG_ADDR_ENV, addr.to_string())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(launch_err)?;
        sd_debug!(target: "debugger", "debugee pid {} waits on {addr}", child.id());

        // runtime may die before connecting, check it while waiting
        listener.set_nonblocking(true)?;
        let stream = loop {
            match listener.accept() {
                Ok((stream, _)) => break stream,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if let Some(status) = child.try_wait()? {
                        return Err(launch_err(std::io::Error::new(
                            ErrorKind::ConnectionRefused,
                            format!("process exit before debugger connection ({status})"),
                        )));
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(launch_err(e)),
            }
        };
        stream.set_nonblocking(false)?;

        Self::with_stream(stream, Some(child))
    }

    /// Create debugee from established connection, `child` is a runtime process if known.
    pub fn with_stream(stream: TcpStream, child: Option<Child>) -> Result<Self, Error> {
        let (events_tx, events) = mpsc::channel();
        let (responses_tx, responses) = mpsc::channel();
        let reader = stream.try_clone()?;
        thread::Builder::new()
            .name("sdbg-wire".to_string())
            .spawn(move || read_loop(reader, events_tx, responses_tx))?;

        Ok(Self {
            stream,
            child: RefCell::new(child),
            events,
            responses,
            next_id: Cell::new(1),
            exited: false,
        })
    }

    /// Wait for runtime process and return its exit code.
    fn exit_code(&self) -> i32 {
        let mut child = self.child.borrow_mut();
        let Some(child) = child.as_mut() else {
            return UNKNOWN_EXIT_CODE;
        };
        muted_error!(child.wait())
            .and_then(|status| status.code())
            .unwrap_or(UNKNOWN_EXIT_CODE)
    }

    fn call<T: DeserializeOwned>(&self, request: Request) -> Result<T, Error> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let mut line = serde_json::to_vec(&RequestMessage { id, request })?;
        line.push(b'\n');
        (&self.stream).write_all(&line)?;

        loop {
            let Ok((resp_id, result)) = self.responses.recv() else {
                return Err(Error::ProcessExit(self.exit_code()));
            };
            // responses to previous (failed) requests
            if resp_id != id {
                sd_debug!(target: "debugger", "stale response {resp_id} skipped");
                continue;
            }
            return match result {
                Ok(value) => Ok(serde_json::from_value(value)?),
                Err(msg) => Err(Error::Backend(msg)),
            };
        }
    }
}

impl Drop for WireDebugee {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.get_mut().take() {
            if let Ok(None) = child.try_wait() {
                muted_error!(child.kill());
                muted_error!(child.wait());
            }
        }
    }
}

impl Debugee for WireDebugee {
    fn next_event(&mut self) -> Result<DebugEvent, Error> {
        if self.exited {
            return Err(Error::ProcessExit(self.exit_code()));
        }
        match self.events.recv() {
            Ok(event) => {
                if let DebugEvent::ProcessExited { .. } = event {
                    self.exited = true;
                }
                Ok(event)
            }
            Err(_) => {
                self.exited = true;
                Ok(DebugEvent::ProcessExited {
                    code: self.exit_code(),
                })
            }
        }
    }

    fn resume(&mut self) -> Result<(), Error> {
        self.call(Request::Resume)
    }

    fn terminate(&mut self, exit_code: i32) -> Result<(), Error> {
        muted_error!(self.call::<()>(Request::Terminate { exit_code }));
        if let Some(child) = self.child.get_mut().as_mut() {
            if let Ok(None) = child.try_wait() {
                muted_error!(child.kill());
            }
        }
        Ok(())
    }

    fn attach_domain(&mut self, domain: DomainId) -> Result<(), Error> {
        self.call(Request::AttachDomain { domain })
    }

    fn method_info(&self, function: FunctionRef) -> Result<MethodInfo, Error> {
        self.call(Request::MethodInfo { function })
    }

    fn class_methods(&self, class: ClassRef) -> Result<Vec<MethodInfo>, Error> {
        self.call(Request::ClassMethods { class })
    }

    fn il_size(&self, function: FunctionRef) -> Result<u32, Error> {
        self.call(Request::IlSize { function })
    }

    fn create_breakpoint(
        &mut self,
        function: FunctionRef,
        offset: u32,
    ) -> Result<BreakpointHandle, Error> {
        self.call(Request::CreateBreakpoint { function, offset })
    }

    fn activate_breakpoint(&mut self, handle: BreakpointHandle, active: bool) -> Result<(), Error> {
        self.call(Request::ActivateBreakpoint { handle, active })
    }

    fn set_class_jmc(&mut self, class: ClassRef, user_code: bool) -> Result<(), Error> {
        self.call(Request::SetClassJmc { class, user_code })
    }

    fn set_function_jmc(&mut self, function: FunctionRef, user_code: bool) -> Result<(), Error> {
        self.call(Request::SetFunctionJmc {
            function,
            user_code,
        })
    }

    fn frames(&self, thread: ThreadId) -> Result<Vec<FrameDescriptor>, Error> {
        self.call(Request::Frames { thread })
    }

    fn local_count(&self, thread: ThreadId, frame: usize) -> Result<u32, Error> {
        self.call(Request::LocalCount { thread, frame })
    }

    fn local(&self, thread: ThreadId, frame: usize, slot: u32) -> Result<RawValue, Error> {
        self.call(Request::Local {
            thread,
            frame,
            slot,
        })
    }

    fn argument(&self, thread: ThreadId, frame: usize, index: u32) -> Result<RawValue, Error> {
        self.call(Request::Argument {
            thread,
            frame,
            index,
        })
    }

    fn step(&mut self, thread: ThreadId, request: StepRequest) -> Result<(), Error> {
        self.call(Request::Step { thread, request })
    }
}
