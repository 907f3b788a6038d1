//! Breakpoint manager.
//!
//! Breakpoints are numbered from 1 in creation order. Source line is resolved into a
//! method and an instruction offset through module symbols, then the runtime creates a
//! breakpoint at that offset.

use crate::debugger::debugee::{BreakpointHandle, Debugee, FunctionRef, ModuleId};
use crate::debugger::error::Error;
use crate::debugger::location::line_to_method;
use crate::debugger::symbol::{same_file_name, same_path, DocumentId, SymbolIndex, SymbolStore};
use crate::sd_debug;

/// How requested file is compared with symbol documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentMatch {
    /// Compare file names only, case insensitive. Files with the same name in
    /// different directories are not distinguished.
    FileName,
    /// Compare absolute paths, case insensitive. Symlinked paths to the same file match.
    FullPath,
}

impl DocumentMatch {
    fn matches(self, requested: &str, url: &str) -> bool {
        match self {
            DocumentMatch::FileName => same_file_name(requested, url),
            DocumentMatch::FullPath => same_path(requested, url),
        }
    }
}

/// Breakpoint representation.
#[derive(Debug, Clone)]
pub struct Breakpoint {
    /// Breakpoint number, starts from 1.
    pub number: u32,
    pub requested_file: String,
    pub requested_line: u32,
    pub function: FunctionRef,
    /// Instruction offset of the patch point inside `function`.
    pub offset: u32,
    enabled: bool,
    handle: BreakpointHandle,
}

impl Breakpoint {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Resolve document line into a patch point, return method token and instruction offset.
///
/// Offset is a sequence point at the nearest line with code, method entry if
/// the method has no such point.
pub fn resolve(index: &SymbolIndex, document: DocumentId, line: u32) -> Result<(u32, u32), Error> {
    let (method, line) = line_to_method(index, document, line)?;
    let offset = index
        .visible_sequence_points(method)
        .find(|sp| sp.document == document && sp.start_line == line)
        .map(|sp| sp.offset)
        .unwrap_or(0);
    Ok((method, offset))
}

/// All breakpoints of a debug session. Breakpoints are never removed, only disabled.
#[derive(Default)]
pub struct BreakpointRegistry {
    breakpoints: Vec<Breakpoint>,
}

impl BreakpointRegistry {
    /// Set and activate a breakpoint at the first document (in module load order) with
    /// file name equal to `file`.
    pub fn add(
        &mut self,
        debugee: &mut dyn Debugee,
        symbols: &SymbolStore,
        file: &str,
        line: u32,
    ) -> Result<&Breakpoint, Error> {
        for module in symbols.modules() {
            if let Some(idx) = self.install(
                debugee,
                &module.index,
                module.module.id,
                file,
                line,
                DocumentMatch::FileName,
            )? {
                return Ok(&self.breakpoints[idx]);
            }
        }
        Err(Error::DocumentNotFound(file.to_string()))
    }

    /// Set and activate a breakpoint in a module.
    /// Return `None` if module has no document matching the `file`.
    pub fn add_in_module(
        &mut self,
        debugee: &mut dyn Debugee,
        index: &SymbolIndex,
        module: ModuleId,
        file: &str,
        line: u32,
        matching: DocumentMatch,
    ) -> Result<Option<&Breakpoint>, Error> {
        let idx = self.install(debugee, index, module, file, line, matching)?;
        Ok(idx.map(|idx| &self.breakpoints[idx]))
    }

    fn install(
        &mut self,
        debugee: &mut dyn Debugee,
        index: &SymbolIndex,
        module: ModuleId,
        file: &str,
        line: u32,
        matching: DocumentMatch,
    ) -> Result<Option<usize>, Error> {
        let Some(document) = index
            .documents()
            .iter()
            .position(|url| matching.matches(file, url))
        else {
            return Ok(None);
        };

        let (method, offset) = resolve(index, document, line)?;
        let function = FunctionRef::new(module, method);
        let handle = debugee.create_breakpoint(function, offset)?;
        debugee.activate_breakpoint(handle, true)?;

        let number = self.breakpoints.len() as u32 + 1;
        sd_debug!(
            target: "debugger",
            "breakpoint {number} set at {file}:{line} (method {method:#x}, offset {offset})"
        );
        self.breakpoints.push(Breakpoint {
            number,
            requested_file: file.to_string(),
            requested_line: line,
            function,
            offset,
            enabled: true,
            handle,
        });
        Ok(Some(self.breakpoints.len() - 1))
    }

    pub fn list(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn get(&self, number: u32) -> Option<&Breakpoint> {
        self.breakpoints.iter().find(|b| b.number == number)
    }

    fn set_enabled(
        &mut self,
        debugee: &mut dyn Debugee,
        number: u32,
        enabled: bool,
    ) -> Result<&Breakpoint, Error> {
        let brkpt = self
            .breakpoints
            .iter_mut()
            .find(|b| b.number == number)
            .ok_or(Error::BreakpointNotFound(number))?;
        debugee.activate_breakpoint(brkpt.handle, enabled)?;
        brkpt.enabled = enabled;
        Ok(brkpt)
    }

    pub fn enable(&mut self, debugee: &mut dyn Debugee, number: u32) -> Result<&Breakpoint, Error> {
        self.set_enabled(debugee, number, true)
    }

    pub fn disable(
        &mut self,
        debugee: &mut dyn Debugee,
        number: u32,
    ) -> Result<&Breakpoint, Error> {
        self.set_enabled(debugee, number, false)
    }
}
