//! Source level stepping: step ranges over instruction offsets of a current line.

use crate::debugger::debugee::{
    Debugee, FrameDescriptor, StepMode, StepRange, StepRequest, ThreadId,
};
use crate::debugger::error::Error;
use crate::debugger::symbol::{SequencePoint, SymbolStore};
use crate::sd_debug;

/// Return instruction range of a current source line: `[ip, next sequence point)`.
/// If there is no visible sequence point after `ip`, range ends at the end of method.
pub fn step_range(points: &[SequencePoint], ip: u32, il_size: u32) -> StepRange {
    let end = points
        .iter()
        .filter(|sp| !sp.is_hidden())
        .find(|sp| sp.offset > ip)
        .map(|sp| sp.offset)
        .unwrap_or(il_size);
    StepRange { start: ip, end }
}

/// Make a step request for the frame.
///
/// Methods without symbols can't be stepped by source lines, in this case
/// a single instruction step is requested.
pub fn make_request(
    debugee: &dyn Debugee,
    symbols: &SymbolStore,
    frame: &FrameDescriptor,
    mode: StepMode,
    jmc: bool,
) -> Result<StepRequest, Error> {
    let range = match (mode, frame.function) {
        (StepMode::Out, _) | (_, None) => None,
        (_, Some(function)) => match symbols.sequence_points(function) {
            Some(points) if !points.is_empty() => {
                let il_size = debugee.il_size(function)?;
                Some(step_range(points, frame.ip, il_size))
            }
            _ => None,
        },
    };
    Ok(StepRequest { mode, range, jmc })
}

/// Step a thread from its active frame. Return issued request.
pub fn step(
    debugee: &mut dyn Debugee,
    symbols: &SymbolStore,
    thread: ThreadId,
    mode: StepMode,
    jmc: bool,
) -> Result<StepRequest, Error> {
    let frames = debugee.frames(thread)?;
    let frame = frames.first().ok_or(Error::NoFrames)?;
    let request = make_request(debugee, symbols, frame, mode, jmc)?;

    match request.range {
        Some(range) => sd_debug!(
            target: "debugger",
            "step {mode} in range [{}, {})",
            range.start,
            range.end
        ),
        None => sd_debug!(target: "debugger", "step {mode} without range"),
    }
    debugee.step(thread, request)?;
    Ok(request)
}
