//! Mapping between instruction offsets and source locations.

use crate::debugger::debugee::FrameDescriptor;
use crate::debugger::error::Error;
use crate::debugger::symbol::{DocumentId, SequencePoint, SymbolIndex, SymbolStore};

/// Return a visible sequence point with the greatest offset less or equal to `offset`.
pub fn find_place(points: &[SequencePoint], offset: u32) -> Option<&SequencePoint> {
    points
        .iter()
        .take_while(|sp| sp.offset <= offset)
        .filter(|sp| !sp.is_hidden())
        .last()
}

/// Resolve frame into a source location.
/// Return `None` for unmappable frames and offsets before the first sequence point.
pub fn offset_to_location<'a>(
    symbols: &'a SymbolStore,
    frame: &FrameDescriptor,
) -> Option<&'a SequencePoint> {
    if !frame.is_mappable() {
        return None;
    }
    let function = frame.function?;
    find_place(symbols.sequence_points(function)?, frame.ip)
}

/// Resolve document line into a method token and a nearest line that has code.
pub fn line_to_method(
    index: &SymbolIndex,
    document: DocumentId,
    line: u32,
) -> Result<(u32, u32), Error> {
    let not_found = || Error::SymbolResolution {
        file: index.document_url(document).unwrap_or_default().to_string(),
        line,
    };
    let line = index.closest_line(document, line).ok_or_else(not_found)?;
    let method = index.method_at(document, line).ok_or_else(not_found)?;
    Ok((method, line))
}
