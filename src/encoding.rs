//! Binary encoding primitives for WebAssembly values.
//!
//! Provides LEB128 integer encoding, IEEE 754 float encoding, UTF-8 strings and
//! count-prefixed vectors as specified by the WebAssembly binary format.
//!
//! The `write_*` functions append into a caller-provided `&mut Vec<u8>` buffer;
//! the `encode_*` functions return a fresh byte vector for callers that build
//! fragments before assembling them.

use byteorder::{ByteOrder, LittleEndian};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// WebAssembly binary format constants
// ---------------------------------------------------------------------------

/// `\0asm`
pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
/// Binary format version 1, little-endian.
pub const VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

// Section IDs
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_CODE: u8 = 10;

// Type constructors
pub const TYPE_FUNC: u8 = 0x60;

// Export descriptor kind (only functions are exported)
pub const DESC_FUNC: u8 = 0x00;

// Opcodes
pub const OP_END: u8 = 0x0b;
pub const OP_CALL: u8 = 0x10;
pub const OP_LOCAL_GET: u8 = 0x20;
pub const OP_I32_CONST: u8 = 0x41;
pub const OP_I32_ADD: u8 = 0x6a;
pub const OP_I32_SUB: u8 = 0x6b;
pub const OP_I32_MUL: u8 = 0x6c;
pub const OP_I32_DIV_S: u8 = 0x6d;

// Value types
pub const VALTYPE_I32: u8 = 0x7f;
pub const VALTYPE_I64: u8 = 0x7e;
pub const VALTYPE_F32: u8 = 0x7d;
pub const VALTYPE_F64: u8 = 0x7c;

/// Instruction mnemonic to opcode. The parser resolves every instruction
/// token through this table; `call` is a keyword and is not listed.
pub static OPCODES: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        ("local.get", OP_LOCAL_GET),
        ("i32.const", OP_I32_CONST),
        ("i32.add", OP_I32_ADD),
        ("i32.sub", OP_I32_SUB),
        ("i32.mul", OP_I32_MUL),
        ("i32.div", OP_I32_DIV_S),
        ("i32.div_s", OP_I32_DIV_S),
    ])
});

/// Value type name to its one-byte encoding.
pub static VALUE_TYPES: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        ("i32", VALTYPE_I32),
        ("i64", VALTYPE_I64),
        ("f32", VALTYPE_F32),
        ("f64", VALTYPE_F64),
    ])
});

// ---------------------------------------------------------------------------
// Unsigned LEB128
// ---------------------------------------------------------------------------

/// Appends the unsigned LEB128 encoding of a u64 value to `buf`.
pub fn write_vu64(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Appends the unsigned LEB128 encoding of a u32 value to `buf`.
pub fn write_vu32(buf: &mut Vec<u8>, v: u32) {
    write_vu64(buf, v as u64);
}

/// Unsigned LEB128 encoding of `n`. Zero encodes as a single `0x00` byte.
pub fn encode_unsigned_leb128(n: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5);
    write_vu64(&mut buf, n);
    buf
}

// ---------------------------------------------------------------------------
// Signed LEB128
// ---------------------------------------------------------------------------

/// Appends the signed LEB128 encoding of an i64 value to `buf`.
pub fn write_vs64(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

/// Appends the signed LEB128 encoding of an i32 value to `buf`.
pub fn write_vs32(buf: &mut Vec<u8>, v: i32) {
    write_vs64(buf, v as i64);
}

/// Signed (two's complement) LEB128 encoding of `n`.
pub fn encode_signed_leb128(n: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5);
    write_vs64(&mut buf, n);
    buf
}

// ---------------------------------------------------------------------------
// LEB128 decoding
// ---------------------------------------------------------------------------

/// A LEB128 value ran past the end of its input or past 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leb128Error;

impl fmt::Display for Leb128Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed LEB128 integer")
    }
}

impl std::error::Error for Leb128Error {}

/// Decodes an unsigned LEB128 value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_unsigned_leb128(bytes: &[u8]) -> Result<(u64, usize), Leb128Error> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().enumerate() {
        // the tenth byte carries only bit 63
        if shift >= 64 || (shift == 63 && byte & 0x7e != 0) {
            return Err(Leb128Error);
        }
        result |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }
    Err(Leb128Error)
}

/// Decodes a signed LEB128 value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_signed_leb128(bytes: &[u8]) -> Result<(i64, usize), Leb128Error> {
    let mut result: i64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().enumerate() {
        // the tenth byte carries bit 63, and its unused bits must repeat it
        if shift >= 64 || (shift == 63 && !matches!(byte & 0x7f, 0x00 | 0x7f)) {
            return Err(Leb128Error);
        }
        result |= ((byte & 0x7f) as i64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && (byte & 0x40) != 0 {
                result |= -1i64 << shift;
            }
            return Ok((result, i + 1));
        }
    }
    Err(Leb128Error)
}

// ---------------------------------------------------------------------------
// Strings and floats
// ---------------------------------------------------------------------------

/// Raw UTF-8 bytes of `s`, without a length prefix.
pub fn encode_utf8_string(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Appends a UTF-8 name as a length-prefixed byte vector.
pub fn write_name(buf: &mut Vec<u8>, name: &str) {
    let bytes = encode_utf8_string(name);
    write_vector(buf, bytes.len(), &bytes);
}

/// IEEE 754 single precision, little-endian. The value is narrowed to f32 first.
pub fn encode_float32_le(n: f64) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    LittleEndian::write_f32(&mut bytes, n as f32);
    bytes
}

// ---------------------------------------------------------------------------
// Vectors and sections
// ---------------------------------------------------------------------------

/// Appends `count` as unsigned LEB128 followed by the already-encoded elements.
pub fn write_vector(buf: &mut Vec<u8>, count: usize, elements: &[u8]) {
    write_vu32(buf, count as u32);
    buf.extend_from_slice(elements);
}

/// `LEB128(len(items)) ++ flatten(items)`.
///
/// Each item is one encoded element; the element fragments are concatenated in
/// order behind the count.
pub fn encode_vector<I, T>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut count = 0usize;
    let mut flat = Vec::new();
    for item in items {
        flat.extend_from_slice(item.as_ref());
        count += 1;
    }
    let mut buf = Vec::with_capacity(flat.len() + 5);
    write_vector(&mut buf, count, &flat);
    buf
}

/// Wraps section contents with a section ID and length prefix.
pub fn create_section(id: u8, contents: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(contents.len() + 6);
    emit_section(&mut buf, id, contents);
    buf
}

/// Appends `id | LEB128(len) | contents` to `buf`.
pub fn emit_section(buf: &mut Vec<u8>, id: u8, contents: &[u8]) {
    buf.push(id);
    write_vu32(buf, contents.len() as u32);
    buf.extend_from_slice(contents);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_leb128_known_values() {
        assert_eq!(encode_unsigned_leb128(0), vec![0x00]);
        assert_eq!(encode_unsigned_leb128(1), vec![0x01]);
        assert_eq!(encode_unsigned_leb128(127), vec![0x7f]);
        assert_eq!(encode_unsigned_leb128(128), vec![0x80, 0x01]);
        assert_eq!(encode_unsigned_leb128(624485), vec![0xe5, 0x8e, 0x26]);
        assert_eq!(
            encode_unsigned_leb128(u32::MAX as u64),
            vec![0xff, 0xff, 0xff, 0xff, 0x0f]
        );
    }

    #[test]
    fn signed_leb128_known_values() {
        assert_eq!(encode_signed_leb128(0), vec![0x00]);
        assert_eq!(encode_signed_leb128(-1), vec![0x7f]);
        assert_eq!(encode_signed_leb128(63), vec![0x3f]);
        assert_eq!(encode_signed_leb128(64), vec![0xc0, 0x00]);
        assert_eq!(encode_signed_leb128(82), vec![0xd2, 0x00]);
        assert_eq!(encode_signed_leb128(-128), vec![0x80, 0x7f]);
        assert_eq!(encode_signed_leb128(-123456), vec![0xc0, 0xbb, 0x78]);
    }

    #[test]
    fn signed_decode_sign_extends() {
        assert_eq!(decode_signed_leb128(&[0x7f]), Ok((-1, 1)));
        assert_eq!(decode_signed_leb128(&[0x80, 0x7f]), Ok((-128, 2)));
        assert_eq!(decode_signed_leb128(&[0xd2, 0x00, 0xff]), Ok((82, 2)));
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert_eq!(decode_unsigned_leb128(&[0x80, 0x80]), Err(Leb128Error));
        assert_eq!(decode_unsigned_leb128(&[]), Err(Leb128Error));
        assert_eq!(decode_signed_leb128(&[0xff]), Err(Leb128Error));
    }

    #[test]
    fn decode_ten_byte_values() {
        let max = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(decode_unsigned_leb128(&max), Ok((u64::MAX, 10)));
        assert_eq!(encode_unsigned_leb128(u64::MAX), max);

        let mut min = [0x80; 10];
        min[9] = 0x7f;
        assert_eq!(decode_signed_leb128(&min), Ok((i64::MIN, 10)));
        let mut positive = [0xff; 10];
        positive[9] = 0x00;
        assert_eq!(decode_signed_leb128(&positive), Ok((i64::MAX, 10)));
    }

    #[test]
    fn decode_rejects_bits_past_64() {
        let mut unsigned = [0x80; 10];
        unsigned[9] = 0x02;
        assert_eq!(decode_unsigned_leb128(&unsigned), Err(Leb128Error));
        unsigned[9] = 0x7f;
        assert_eq!(decode_unsigned_leb128(&unsigned), Err(Leb128Error));

        let mut signed = [0x80; 10];
        signed[9] = 0x01;
        assert_eq!(decode_signed_leb128(&signed), Err(Leb128Error));
        signed[9] = 0x7e;
        assert_eq!(decode_signed_leb128(&signed), Err(Leb128Error));
        assert_eq!(decode_unsigned_leb128(&[0x80; 11]), Err(Leb128Error));
    }

    #[test]
    fn float32_is_little_endian() {
        assert_eq!(encode_float32_le(1.0), [0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(encode_float32_le(-2.5), [0x00, 0x00, 0x20, 0xc0]);
        // narrowed to f32 before reinterpreting
        assert_eq!(encode_float32_le(0.1), 0.1f32.to_le_bytes());
    }

    #[test]
    fn utf8_string_has_no_prefix() {
        assert_eq!(encode_utf8_string("add"), vec![0x61, 0x64, 0x64]);
        assert_eq!(encode_utf8_string("é"), vec![0xc3, 0xa9]);
        assert!(encode_utf8_string("").is_empty());
    }

    #[test]
    fn name_is_length_prefixed() {
        let mut buf = Vec::new();
        write_name(&mut buf, "add");
        assert_eq!(buf, vec![0x03, 0x61, 0x64, 0x64]);
    }

    #[test]
    fn vector_flattens_items() {
        let params: [&[u8]; 2] = [&[VALTYPE_I32], &[VALTYPE_I32]];
        assert_eq!(encode_vector(params), vec![0x02, 0x7f, 0x7f]);
        assert_eq!(encode_vector(Vec::<Vec<u8>>::new()), vec![0x00]);
        assert_eq!(
            encode_vector(vec![vec![0x01, 0x02], vec![0x03]]),
            vec![0x02, 0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn section_length_matches_payload() {
        let section = create_section(SECTION_FUNCTION, &[0x01, 0x00]);
        assert_eq!(section, vec![0x03, 0x02, 0x01, 0x00]);

        let big = vec![0u8; 200];
        let section = create_section(SECTION_CODE, &big);
        assert_eq!(&section[..3], &[0x0a, 0xc8, 0x01]);
        assert_eq!(section.len(), 203);
    }

    #[test]
    fn opcode_table_matches_constants() {
        assert_eq!(OPCODES["i32.add"], 0x6a);
        assert_eq!(OPCODES["i32.sub"], 0x6b);
        assert_eq!(OPCODES["i32.mul"], 0x6c);
        assert_eq!(OPCODES["i32.div"], 0x6d);
        assert_eq!(OPCODES["local.get"], 0x20);
        assert_eq!(OPCODES["i32.const"], 0x41);
        assert!(!OPCODES.contains_key("call"));
        assert_eq!(VALUE_TYPES["i32"], 0x7f);
        assert!(!VALUE_TYPES.contains_key("i31"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn unsigned_round_trip(n in 0u64..(1u64 << 32)) {
            let bytes = encode_unsigned_leb128(n);
            prop_assert_eq!(decode_unsigned_leb128(&bytes), Ok((n, bytes.len())));
        }

        #[test]
        fn signed_round_trip(n in i32::MIN as i64..=i32::MAX as i64) {
            let bytes = encode_signed_leb128(n);
            prop_assert_eq!(decode_signed_leb128(&bytes), Ok((n, bytes.len())));
        }

        #[test]
        fn unsigned_encoding_is_minimal(n in any::<u64>()) {
            let bytes = encode_unsigned_leb128(n);
            let last = *bytes.last().unwrap();
            prop_assert_eq!(last & 0x80, 0);
            prop_assert!(bytes.len() == 1 || last != 0);
        }
    }
}
