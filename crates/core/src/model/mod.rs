//! Read-only metadata graph scanned for string literals.
//!
//! A [`ModuleDef`] owns types, a [`TypeDef`] owns methods, and a [`MethodDef`] may carry a
//! body of decoded instructions plus the sequence points used for source mapping. Modules
//! are shared between scan workers behind an `Arc` and are never written during a scan.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod reference;

pub use reference::{RawReference, StringReference};

/// Line number compilers use for sequence points that have no source text.
pub const HIDDEN_LINE: u32 = 0x00FE_EFEE;

/// A loaded binary module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), types: Vec::new() }
    }

    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }

    /// Total number of methods across all types.
    pub fn method_count(&self) -> usize {
        self.types.iter().map(|t| t.methods.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into(), methods: Vec::new() }
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// `Namespace.Name`, or just `Name` for types in the global namespace.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// A method definition. `body` is `None` for abstract, extern and runtime-implemented
/// methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub token: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MethodBody>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequence_points: Vec<SequencePoint>,
}

impl MethodDef {
    pub fn new(token: u32, name: impl Into<String>) -> Self {
        Self { token, name: name.into(), body: None, sequence_points: Vec::new() }
    }

    pub fn with_body(mut self, instructions: Vec<Instruction>) -> Self {
        self.body = Some(MethodBody { instructions });
        self
    }

    pub fn with_sequence_points(mut self, points: Vec<SequencePoint>) -> Self {
        self.sequence_points = points;
        self
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Instructions of the body in offset order.
    ///
    /// Bodiless methods yield an empty slice. A body that fails validation is reported as
    /// a [`BodyError`] so callers can skip just this method.
    pub fn instructions(&self) -> Result<&[Instruction], BodyError> {
        match &self.body {
            Some(body) => {
                body.validate()?;
                Ok(&body.instructions)
            }
            None => Ok(&[]),
        }
    }

    /// The statement covering `offset`: the visible sequence point with the greatest
    /// offset not past it.
    pub fn find_sequence_point(&self, offset: u32) -> Option<&SequencePoint> {
        self.sequence_points
            .iter()
            .filter(|sp| !sp.is_hidden() && sp.offset <= offset)
            .max_by_key(|sp| sp.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodBody {
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    fn validate(&self) -> Result<(), BodyError> {
        let mut previous: Option<u32> = None;
        for insn in &self.instructions {
            if let Some(prev) = previous {
                if insn.offset <= prev {
                    return Err(BodyError::OffsetOrder { previous: prev, offset: insn.offset });
                }
            }
            if insn.opcode == OpCode::Ldstr && !matches!(insn.operand, Operand::String(_)) {
                return Err(BodyError::OperandMismatch { offset: insn.offset });
            }
            previous = Some(insn.offset);
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BodyError {
    #[error("instruction at IL_{offset:04X} does not follow IL_{previous:04X}")]
    OffsetOrder { previous: u32, offset: u32 },
    #[error("ldstr at IL_{offset:04X} has a non-string operand")]
    OperandMismatch { offset: u32 },
}

/// Opcodes the graph distinguishes. Only `Ldstr` matters to the scanner; the rest keep
/// bodies realistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    Nop,
    Ldstr,
    LdcI4,
    Ldarg,
    Ldloc,
    Stloc,
    Ldfld,
    Stfld,
    Call,
    Callvirt,
    Newobj,
    Br,
    Brtrue,
    Brfalse,
    Pop,
    Throw,
    Ret,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    #[default]
    None,
    String(String),
    Int(i64),
    Token(u32),
    Target(u32),
}

impl Operand {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: OpCode,
    #[serde(default)]
    pub operand: Operand,
}

impl Instruction {
    pub fn new(offset: u32, opcode: OpCode, operand: Operand) -> Self {
        Self { offset, opcode, operand }
    }

    /// An instruction without an operand.
    pub fn op(offset: u32, opcode: OpCode) -> Self {
        Self::new(offset, opcode, Operand::None)
    }

    pub fn ldstr(offset: u32, literal: impl Into<String>) -> Self {
        Self::new(offset, OpCode::Ldstr, Operand::String(literal.into()))
    }

    /// The literal pushed by this instruction, if it is a `ldstr` with a non-empty operand.
    pub fn string_literal(&self) -> Option<&str> {
        match (self.opcode, self.operand.as_str()) {
            (OpCode::Ldstr, Some(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Debug information tying an IL offset to a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePoint {
    pub offset: u32,
    pub document: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl SequencePoint {
    pub fn new(offset: u32, document: impl Into<String>, line: u32, column: u32) -> Self {
        Self { offset, document: document.into(), line, column }
    }

    pub fn is_hidden(&self) -> bool {
        self.line == HIDDEN_LINE
    }

    pub fn position(&self) -> SourcePosition {
        SourcePosition { document: self.document.clone(), line: self.line, column: self.column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub document: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.document, self.line, self.column)
    }
}

/// Identity of a method within one scan: the module's position in the scanned set, the
/// method's metadata token, then its position in the module.
///
/// Tokens order methods the way metadata tables do; the position keeps two methods
/// distinct when a module carries duplicate tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodId {
    pub module: u32,
    pub token: u32,
    pub type_index: u32,
    pub method_index: u32,
}

/// Cheap, clonable handle to a method inside a shared module.
#[derive(Clone)]
pub struct MethodRef {
    module: Arc<ModuleDef>,
    ordinal: u32,
    type_index: usize,
    method_index: usize,
}

impl MethodRef {
    /// Returns `None` when the indices do not name a method of `module`.
    pub fn new(
        module: Arc<ModuleDef>,
        ordinal: u32,
        type_index: usize,
        method_index: usize,
    ) -> Option<Self> {
        let exists = module.types.get(type_index).is_some_and(|t| method_index < t.methods.len());
        exists.then_some(Self { module, ordinal, type_index, method_index })
    }

    pub fn id(&self) -> MethodId {
        MethodId {
            module: self.ordinal,
            token: self.method().token,
            type_index: self.type_index as u32,
            method_index: self.method_index as u32,
        }
    }

    pub fn module(&self) -> &Arc<ModuleDef> {
        &self.module
    }

    pub fn module_name(&self) -> &str {
        &self.module.name
    }

    pub fn declaring_type(&self) -> &TypeDef {
        &self.module.types[self.type_index]
    }

    pub fn method(&self) -> &MethodDef {
        &self.declaring_type().methods[self.method_index]
    }

    pub fn name(&self) -> &str {
        &self.method().name
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.module, &other.module)
            && self.ordinal == other.ordinal
            && self.type_index == other.type_index
            && self.method_index == other.method_index
    }
}

impl Eq for MethodRef {}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRef")
            .field("module", &self.module.name)
            .field("type", &self.declaring_type().full_name())
            .field("method", &self.method().name)
            .field("token", &format_args!("0x{:08X}", self.method().token))
            .finish()
    }
}
