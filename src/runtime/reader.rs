//! Binary reader for the modules the emitter produces.
//!
//! Accepts exactly the four-section layout the compiler writes (Type,
//! Function, Export, Code, in that order). Each section's declared size is
//! checked against the bytes its contents actually occupy.

use super::RuntimeError;
use crate::encoding::{
    decode_signed_leb128, decode_unsigned_leb128, DESC_FUNC, MAGIC, OP_CALL, OP_END, OP_I32_CONST,
    OP_LOCAL_GET, SECTION_CODE, SECTION_EXPORT, SECTION_FUNCTION,
    SECTION_TYPE, TYPE_FUNC, VALTYPE_F32, VALTYPE_F64, VALTYPE_I32, VALTYPE_I64,
};
use crate::wat::BinaryOp;
use byteorder::{LittleEndian, ReadBytesExt};

/// Maximum number of locals a single function body may declare, summed
/// across its local groups.
pub const MAX_FUNCTION_LOCALS: u32 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    fn from_byte(byte: u8) -> Result<Self, RuntimeError> {
        match byte {
            VALTYPE_I32 => Ok(ValueType::I32),
            VALTYPE_I64 => Ok(ValueType::I64),
            VALTYPE_F32 => Ok(ValueType::F32),
            VALTYPE_F64 => Ok(ValueType::F64),
            other => Err(RuntimeError::InvalidValueType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuncType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// The name exactly as stored, quotes and all.
    pub name: String,
    pub function: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    LocalGet(u32),
    I32Const(i32),
    Call(u32),
    Binary(BinaryOp),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
    /// Locals declared beyond the parameters.
    pub locals: u32,
    pub instructions: Vec<Instruction>,
}

/// A decoded module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleAst {
    pub types: Vec<FuncType>,
    /// Type index of each function.
    pub functions: Vec<u32>,
    pub exports: Vec<Export>,
    pub code: Vec<Body>,
}

impl ModuleAst {
    /// Signature of the function at `index`.
    pub fn func_type(&self, index: u32) -> Result<&FuncType, RuntimeError> {
        self.functions
            .get(index as usize)
            .and_then(|&ty| self.types.get(ty as usize))
            .ok_or(RuntimeError::FunctionIndexOutOfBounds(index))
    }
}

// ============================================================================
// Reader
// ============================================================================

/// A position within a borrowed byte slice.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Offset of `bytes[0]` within the whole module, for error reporting.
    base: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0, base: 0 }
    }

    pub fn pos(&self) -> usize {
        self.base + self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn read_byte(&mut self) -> Result<u8, RuntimeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(RuntimeError::UnexpectedEnd { offset: self.pos() })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], RuntimeError> {
        if len > self.remaining() {
            return Err(RuntimeError::UnexpectedEnd { offset: self.pos() });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Splits off the next `len` bytes as their own reader.
    fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, RuntimeError> {
        let base = self.pos();
        let bytes = self.read_bytes(len)?;
        Ok(Reader { bytes, pos: 0, base })
    }

    // le
    pub fn read_u32(&mut self) -> Result<u32, RuntimeError> {
        let offset = self.pos();
        let mut bytes = self.read_bytes(4)?;
        bytes
            .read_u32::<LittleEndian>()
            .map_err(|_| RuntimeError::UnexpectedEnd { offset })
    }

    pub fn read_vu32(&mut self) -> Result<u32, RuntimeError> {
        let offset = self.pos();
        let (value, len) =
            decode_unsigned_leb128(&self.bytes[self.pos..]).map_err(|_| RuntimeError::UnexpectedEnd { offset })?;
        let value = u32::try_from(value).map_err(|_| RuntimeError::InvalidInteger { offset })?;
        self.pos += len;
        Ok(value)
    }

    pub fn read_vs32(&mut self) -> Result<i32, RuntimeError> {
        let offset = self.pos();
        let (value, len) =
            decode_signed_leb128(&self.bytes[self.pos..]).map_err(|_| RuntimeError::UnexpectedEnd { offset })?;
        let value = i32::try_from(value).map_err(|_| RuntimeError::InvalidInteger { offset })?;
        self.pos += len;
        Ok(value)
    }

    /// Reads a `vec(T)` with `read_item` for each element.
    fn read_vec<T>(
        &mut self,
        mut read_item: impl FnMut(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<Vec<T>, RuntimeError> {
        let count = self.read_vu32()?;
        let mut items = Vec::new();
        for _ in 0..count {
            items.push(read_item(self)?);
        }
        Ok(items)
    }
}

// ============================================================================
// Module
// ============================================================================

/// Decodes a module, validating its header and each of its sections.
pub fn read_module(bytes: &[u8]) -> Result<ModuleAst, RuntimeError> {
    if bytes.is_empty() {
        return Err(RuntimeError::ModuleIsEmpty);
    }
    if bytes.len() < 8 {
        return Err(RuntimeError::ModuleTooShort);
    }

    let mut reader = Reader::new(bytes);
    check_header(&mut reader)?;
    if reader.is_empty() {
        return Err(RuntimeError::ModuleIsEmpty);
    }

    let types = read_section(&mut reader, SECTION_TYPE, |r| r.read_vec(read_func_type))?;
    let functions = read_section(&mut reader, SECTION_FUNCTION, |r| r.read_vec(Reader::read_vu32))?;
    let exports = read_section(&mut reader, SECTION_EXPORT, |r| r.read_vec(read_export))?;
    let code = read_section(&mut reader, SECTION_CODE, |r| r.read_vec(read_body))?;

    if !reader.is_empty() {
        return Err(RuntimeError::InvalidSection {
            expected: None,
            found: reader.read_byte()?,
        });
    }

    let module = ModuleAst {
        types,
        functions,
        exports,
        code,
    };
    validate(&module)?;
    Ok(module)
}

fn check_header(reader: &mut Reader<'_>) -> Result<(), RuntimeError> {
    if reader.read_bytes(4)? != MAGIC {
        return Err(RuntimeError::InvalidMagicHeader);
    }
    if reader.read_u32()? != 1 {
        return Err(RuntimeError::InvalidVersionHeader);
    }
    Ok(())
}

/// Reads one section of kind `id`, requiring its contents to fill exactly the declared size.
fn read_section<'a, T>(
    reader: &mut Reader<'a>,
    id: u8,
    read_contents: impl FnOnce(&mut Reader<'a>) -> Result<T, RuntimeError>,
) -> Result<T, RuntimeError> {
    let found = reader.read_byte()?;
    if found != id {
        return Err(RuntimeError::InvalidSection {
            expected: Some(id),
            found,
        });
    }

    let size = reader.read_vu32()? as usize;
    if size > reader.remaining() {
        return Err(RuntimeError::SectionSizeMismatch { id });
    }
    let mut contents = reader.sub_reader(size)?;
    let value = read_contents(&mut contents).map_err(|e| match e {
        RuntimeError::UnexpectedEnd { .. } => RuntimeError::SectionSizeMismatch { id },
        other => other,
    })?;
    if !contents.is_empty() {
        return Err(RuntimeError::SectionSizeMismatch { id });
    }
    Ok(value)
}

fn read_func_type(reader: &mut Reader<'_>) -> Result<FuncType, RuntimeError> {
    let form = reader.read_byte()?;
    if form != TYPE_FUNC {
        return Err(RuntimeError::InvalidSection {
            expected: Some(TYPE_FUNC),
            found: form,
        });
    }
    let params = reader.read_vec(|r| ValueType::from_byte(r.read_byte()?))?;
    let results = reader.read_vec(|r| ValueType::from_byte(r.read_byte()?))?;
    Ok(FuncType { params, results })
}

fn read_export(reader: &mut Reader<'_>) -> Result<Export, RuntimeError> {
    let len = reader.read_vu32()? as usize;
    let name = std::str::from_utf8(reader.read_bytes(len)?).map_err(|_| RuntimeError::InvalidExportName)?;
    if name.is_empty() {
        return Err(RuntimeError::InvalidExportName);
    }

    let kind = reader.read_byte()?;
    if kind != DESC_FUNC {
        return Err(RuntimeError::InvalidExportType(kind));
    }
    Ok(Export {
        name: name.to_string(),
        function: reader.read_vu32()?,
    })
}

fn read_body(reader: &mut Reader<'_>) -> Result<Body, RuntimeError> {
    let size = reader.read_vu32()? as usize;
    let mut body = reader.sub_reader(size)?;

    let mut locals = 0u32;
    for (count, _) in body.read_vec(|r| Ok((r.read_vu32()?, ValueType::from_byte(r.read_byte()?)?)))? {
        locals = match locals.checked_add(count) {
            Some(total) if total <= MAX_FUNCTION_LOCALS => total,
            _ => return Err(RuntimeError::TooManyLocals(MAX_FUNCTION_LOCALS)),
        };
    }

    let mut instructions = Vec::new();
    loop {
        let instruction = read_instruction(&mut body)?;
        instructions.push(instruction);
        if instruction == Instruction::End {
            break;
        }
    }
    if !body.is_empty() {
        return Err(RuntimeError::SectionSizeMismatch { id: SECTION_CODE });
    }
    Ok(Body { locals, instructions })
}

fn read_instruction(reader: &mut Reader<'_>) -> Result<Instruction, RuntimeError> {
    let opcode = reader.read_byte()?;
    let instruction = match opcode {
        OP_LOCAL_GET => Instruction::LocalGet(reader.read_vu32()?),
        OP_I32_CONST => Instruction::I32Const(reader.read_vs32()?),
        OP_CALL => Instruction::Call(reader.read_vu32()?),
        OP_END => Instruction::End,
        other => match BinaryOp::from_opcode(other) {
            Some(op) => Instruction::Binary(op),
            None => return Err(RuntimeError::InvalidInstruction(other)),
        },
    };
    Ok(instruction)
}

/// Cross-section checks: every index must point at something that exists.
fn validate(module: &ModuleAst) -> Result<(), RuntimeError> {
    if module.functions.len() != module.code.len() {
        return Err(RuntimeError::FunctionCountMismatch {
            functions: module.functions.len(),
            bodies: module.code.len(),
        });
    }
    for index in 0..module.functions.len() as u32 {
        module.func_type(index)?;
    }
    for export in &module.exports {
        module.func_type(export.function)?;
    }
    Ok(())
}
