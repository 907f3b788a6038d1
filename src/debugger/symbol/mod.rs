//! Symbol provider.
//!
//! Every loaded module may ship a symbol stream, it is parsed once into a [`SymbolIndex`]
//! when the module symbols become available and lives until debugee exit.
//!
//! Stream layout (all fixed size integers are little endian):
//! ```text
//! magic "SDSY", version u16
//! documents: count (compressed), [len (compressed), utf-8 url]
//! methods:   count (compressed), [token u32, blob len (compressed), sequence points blob,
//!            has_scope u8, root scope]
//! scope:     start u32, end u32, locals count (compressed), [slot (compressed), name],
//!            children count (compressed), [scope]
//! ```
//! Names are encoded as compressed length followed by utf-8 bytes. Sequence points
//! blob format described in [`blob`].

pub mod blob;

use crate::debugger::debugee::{FunctionRef, ModuleId, ModuleInfo};
use crate::debugger::error::Error;
use crate::{sd_debug, weak_error};
use blob::{decode_sequence_points, read_compressed_u32, write_compressed_u32, HIDDEN_LINE};
use bytes::{Buf, BufMut};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::{env, fs};

pub const MAGIC: &[u8; 4] = b"SDSY";
pub const VERSION: u16 = 1;
/// Deeper scope nesting is considered as a malformed stream.
const MAX_SCOPE_DEPTH: usize = 128;

/// Document index in a module symbol index.
pub type DocumentId = usize;

/// Mapping between an instruction offset and a source code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePoint {
    pub offset: u32,
    pub document: DocumentId,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SequencePoint {
    pub fn hidden(offset: u32, document: DocumentId) -> Self {
        Self {
            offset,
            document,
            start_line: HIDDEN_LINE,
            start_column: 0,
            end_line: HIDDEN_LINE,
            end_column: 0,
        }
    }

    /// Hidden points are compiler generated and have no source representation.
    pub fn is_hidden(&self) -> bool {
        self.start_line == HIDDEN_LINE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    /// Local variable slot in a frame.
    pub slot: u32,
}

/// Lexical scope, covers instructions in `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalScope {
    pub start: u32,
    pub end: u32,
    pub locals: Vec<LocalVariable>,
    pub children: Vec<LocalScope>,
}

impl LocalScope {
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodSymbols {
    pub sequence_points: Vec<SequencePoint>,
    pub root_scope: Option<LocalScope>,
}

/// Symbol information of a single module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolIndex {
    documents: Vec<String>,
    methods: BTreeMap<u32, MethodSymbols>,
}

struct StreamReader<'a> {
    buf: &'a [u8],
}

impl<'a> StreamReader<'a> {
    fn ensure(&self, size: usize, what: &str) -> Result<(), Error> {
        if self.buf.remaining() < size {
            return Err(Error::SymbolParse(format!("unexpected end of stream ({what})")));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8, Error> {
        self.ensure(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, what: &str) -> Result<u16, Error> {
        self.ensure(2, what)?;
        Ok(self.buf.get_u16_le())
    }

    fn u32(&mut self, what: &str) -> Result<u32, Error> {
        self.ensure(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    fn compressed(&mut self) -> Result<u32, Error> {
        read_compressed_u32(&mut self.buf)
    }

    fn bytes(&mut self, what: &str) -> Result<&'a [u8], Error> {
        let len = self.compressed()? as usize;
        self.ensure(len, what)?;
        let (data, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(data)
    }

    fn string(&mut self, what: &str) -> Result<String, Error> {
        Ok(String::from_utf8(self.bytes(what)?.to_vec())?)
    }

    fn scope(&mut self, depth: usize) -> Result<LocalScope, Error> {
        if depth > MAX_SCOPE_DEPTH {
            return Err(Error::SymbolParse("scope nesting too deep".to_string()));
        }
        let start = self.u32("scope start")?;
        let end = self.u32("scope end")?;
        let locals_count = self.compressed()?;
        let locals = (0..locals_count)
            .map(|_| {
                let slot = self.compressed()?;
                let name = self.string("local name")?;
                Ok(LocalVariable { name, slot })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let children_count = self.compressed()?;
        let children = (0..children_count)
            .map(|_| self.scope(depth + 1))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(LocalScope {
            start,
            end,
            locals,
            children,
        })
    }
}

impl SymbolIndex {
    /// Parse raw symbol stream.
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        let mut reader = StreamReader { buf: raw };
        reader.ensure(MAGIC.len(), "magic")?;
        if &reader.buf[..MAGIC.len()] != MAGIC {
            return Err(Error::SymbolParse("unknown stream magic".to_string()));
        }
        reader.buf.advance(MAGIC.len());
        let version = reader.u16("version")?;
        if version != VERSION {
            return Err(Error::SymbolParse(format!("unsupported version {version}")));
        }

        let doc_count = reader.compressed()?;
        let documents = (0..doc_count)
            .map(|_| reader.string("document url"))
            .collect::<Result<Vec<_>, Error>>()?;

        let method_count = reader.compressed()?;
        let mut methods = BTreeMap::new();
        for _ in 0..method_count {
            let token = reader.u32("method token")?;
            let blob = reader.bytes("sequence points")?;
            let sequence_points = if blob.is_empty() {
                vec![]
            } else {
                decode_sequence_points(blob)?
            };
            if let Some(sp) = sequence_points.iter().find(|sp| sp.document >= documents.len()) {
                return Err(Error::SymbolParse(format!(
                    "method {token:#x} refers to unknown document {}",
                    sp.document
                )));
            }
            let root_scope = match reader.u8("scope flag")? {
                0 => None,
                _ => Some(reader.scope(0)?),
            };
            methods.insert(
                token,
                MethodSymbols {
                    sequence_points,
                    root_scope,
                },
            );
        }

        Ok(Self { documents, methods })
    }

    /// Build index from a raw symbol stream.
    /// Malformed stream produces an empty index, debugee continues without symbols for it.
    pub fn build(raw: &[u8]) -> Self {
        weak_error!(Self::parse(raw), "symbol stream ignored:").unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn document_url(&self, document: DocumentId) -> Option<&str> {
        self.documents.get(document).map(String::as_str)
    }

    pub fn method(&self, token: u32) -> Option<&MethodSymbols> {
        self.methods.get(&token)
    }

    /// Ordered method sequence points including hidden ones.
    pub fn sequence_points(&self, token: u32) -> &[SequencePoint] {
        self.methods
            .get(&token)
            .map(|m| m.sequence_points.as_slice())
            .unwrap_or_default()
    }

    /// Ordered method sequence points without hidden ones.
    pub fn visible_sequence_points(&self, token: u32) -> impl Iterator<Item = &SequencePoint> {
        self.sequence_points(token)
            .iter()
            .filter(|sp| !sp.is_hidden())
    }

    pub fn root_scope(&self, token: u32) -> Option<&LocalScope> {
        self.methods.get(&token).and_then(|m| m.root_scope.as_ref())
    }

    fn document_points(&self, document: DocumentId) -> impl Iterator<Item = (u32, &SequencePoint)> {
        self.methods.iter().flat_map(move |(token, m)| {
            m.sequence_points
                .iter()
                .filter(move |sp| !sp.is_hidden() && sp.document == document)
                .map(move |sp| (*token, sp))
        })
    }

    /// Return the smallest line number greater or equal to `line` that has at least one
    /// sequence point in a document.
    pub fn closest_line(&self, document: DocumentId, line: u32) -> Option<u32> {
        self.document_points(document)
            .map(|(_, sp)| sp.start_line)
            .filter(|l| *l >= line)
            .min()
    }

    /// Return a method containing sequence point at the document line.
    /// If several methods do, a method with the lowest token wins.
    pub fn method_at(&self, document: DocumentId, line: u32) -> Option<u32> {
        self.document_points(document)
            .find(|(_, sp)| sp.start_line == line)
            .map(|(token, _)| token)
    }
}

/// Make path absolute against the current directory, `.` and `..` components are
/// resolved lexically. Symlinks are kept as is, the file may not exist.
pub fn absolute_path(file: &str) -> PathBuf {
    let path = Path::new(file);
    let path = match env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            c => normalized.push(c),
        }
    }
    normalized
}

/// Compare two paths to the same document, case insensitive. Paths that differ
/// literally still match if they lead to the same existing file.
pub fn same_path(a: &str, b: &str) -> bool {
    let (a, b) = (absolute_path(a), absolute_path(b));
    if a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase() {
        return true;
    }
    match (fs::canonicalize(&a), fs::canonicalize(&b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Find documents with the same file name (directories are ignored, case insensitive).
pub fn same_file_name(a: &str, b: &str) -> bool {
    let name = |p: &str| {
        Path::new(p)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
    };
    match (name(a), name(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub struct ModuleSymbols {
    pub module: ModuleInfo,
    pub index: SymbolIndex,
}

/// Symbol indexes of all loaded modules in load order.
#[derive(Default)]
pub struct SymbolStore {
    modules: IndexMap<ModuleId, ModuleSymbols>,
}

impl SymbolStore {
    /// Build and cache symbol index for a module, return the new index.
    pub fn build_index(&mut self, module: ModuleInfo, raw: &[u8]) -> &SymbolIndex {
        let index = SymbolIndex::build(raw);
        sd_debug!(
            target: "debugger",
            "module {} symbols: {} documents, {} methods",
            module.name,
            index.documents.len(),
            index.methods.len()
        );
        let id = module.id;
        self.modules.insert(id, ModuleSymbols { module, index });
        &self.modules[&id].index
    }

    pub fn index(&self, module: ModuleId) -> Option<&SymbolIndex> {
        self.modules.get(&module).map(|m| &m.index)
    }

    /// Iterate over modules in load order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleSymbols> {
        self.modules.values()
    }

    /// Return function sequence points (including hidden), `None` if there is no symbols for
    /// the function.
    pub fn sequence_points(&self, function: FunctionRef) -> Option<&[SequencePoint]> {
        let index = self.index(function.module)?;
        index.method(function.token)?;
        Some(index.sequence_points(function.token))
    }

    pub fn document_url(&self, module: ModuleId, document: DocumentId) -> Option<&str> {
        self.index(module)?.document_url(document)
    }
}

/// Encoder of symbol streams, used by runtimes to publish module symbols.
#[derive(Default)]
pub struct SymbolStreamWriter {
    documents: Vec<String>,
    methods: Vec<(u32, Vec<SequencePoint>, Option<LocalScope>)>,
}

impl SymbolStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add document, return its id.
    pub fn add_document(&mut self, url: impl Into<String>) -> DocumentId {
        self.documents.push(url.into());
        self.documents.len() - 1
    }

    pub fn add_method(
        &mut self,
        token: u32,
        sequence_points: Vec<SequencePoint>,
        root_scope: Option<LocalScope>,
    ) -> &mut Self {
        self.methods.push((token, sequence_points, root_scope));
        self
    }

    fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), Error> {
        write_compressed_u32(buf, bytes.len() as u32)?;
        buf.put_slice(bytes);
        Ok(())
    }

    fn put_scope(buf: &mut Vec<u8>, scope: &LocalScope) -> Result<(), Error> {
        buf.put_u32_le(scope.start);
        buf.put_u32_le(scope.end);
        write_compressed_u32(buf, scope.locals.len() as u32)?;
        for var in &scope.locals {
            write_compressed_u32(buf, var.slot)?;
            Self::put_bytes(buf, var.name.as_bytes())?;
        }
        write_compressed_u32(buf, scope.children.len() as u32)?;
        scope
            .children
            .iter()
            .try_for_each(|child| Self::put_scope(buf, child))
    }

    pub fn finish(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        buf.put_slice(MAGIC);
        buf.put_u16_le(VERSION);

        write_compressed_u32(&mut buf, self.documents.len() as u32)?;
        for doc in &self.documents {
            Self::put_bytes(&mut buf, doc.as_bytes())?;
        }

        write_compressed_u32(&mut buf, self.methods.len() as u32)?;
        for (token, points, scope) in &self.methods {
            buf.put_u32_le(*token);
            let blob = if points.is_empty() {
                vec![]
            } else {
                blob::encode_sequence_points(points)?
            };
            Self::put_bytes(&mut buf, &blob)?;
            match scope {
                None => buf.put_u8(0),
                Some(scope) => {
                    buf.put_u8(1);
                    Self::put_scope(&mut buf, scope)?;
                }
            }
        }
        Ok(buf)
    }
}
