//! A compiler for a small subset of the WebAssembly text format.
//!
//! luna turns a single-module WAT program built from i32 arithmetic, local
//! reads, constants and calls into the exact bytes of a WebAssembly binary
//! module:
//!
//! - [`wat`] -- Tokeniser and parser. Reads WAT source into a flat statement list.
//! - [`emitter`] -- Builds the Type, Function, Export and Code sections from statements.
//! - [`encoding`] -- LEB128, vector, name and section encoders shared by the above.
//! - [`runtime`] -- Reads a compiled module back and interprets its exports.
//! - [`file_output`] -- Writes compiled bytes to disk.
//!
//! # Example
//!
//! ```
//! let wasm = luna::compile(r#"
//!     (module
//!         (func (export "addNumbers") (param i32 i32) (result i32)
//!             local.get 0
//!             local.get 1
//!             i32.add))
//! "#).unwrap();
//!
//! assert_eq!(&wasm[..8], &[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]);
//!
//! let instance = luna::runtime::Instance::new(&wasm).unwrap();
//! assert_eq!(instance.invoke("addNumbers", &[2, 3]).unwrap(), 5);
//! ```
//!
//! Compilation is a pure function of the source and [`Options`]: the same
//! input always produces the same bytes.

mod dev_log;

pub mod emitter;
pub mod encoding;
pub mod file_output;
pub mod options;
pub mod runtime;
pub mod wat;

pub use emitter::EmitError;
pub use options::{Mode, Options};
pub use wat::{LexError, ParseError};

use thiserror::Error;

/// Any failure along the source-to-bytes pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("emit error: {0}")]
    Emit(#[from] EmitError),
}

/// Compiles WAT source to a binary module with the default (permissive) options.
pub fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
    compile_with(source, &Options::default())
}

/// Compiles WAT source to a binary module.
pub fn compile_with(source: &str, options: &Options) -> Result<Vec<u8>, CompileError> {
    let tokens = wat::tokenize_with(source, options)?;
    let statements = wat::parse_with(tokens, options)?;
    Ok(emitter::emit_with(&statements, options)?)
}

/// Compiles WAT source and renders the bytes as space-separated decimal values.
///
/// ```
/// let text = luna::compile_to_text("(module)").unwrap();
/// assert_eq!(text, "0 97 115 109 1 0 0 0 1 1 0 3 1 0 7 1 0 10 1 0");
/// ```
pub fn compile_to_text(source: &str) -> Result<String, CompileError> {
    compile_to_text_with(source, &Options::default())
}

/// [`compile_to_text`] under the given options.
pub fn compile_to_text_with(source: &str, options: &Options) -> Result<String, CompileError> {
    let bytes = compile_with(source, options)?;
    Ok(bytes
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_an_error() {
        assert_eq!(compile(""), Err(CompileError::Parse(ParseError::NoTokens)));
        assert_eq!(compile("  ( )\n"), Err(CompileError::Parse(ParseError::NoTokens)));
    }

    #[test]
    fn errors_pass_through_each_stage() {
        let strict = Options::strict();
        assert!(matches!(compile_with("(module #)", &strict), Err(CompileError::Lex(_))));
        assert!(matches!(
            compile_with("(module (func local.get))", &strict),
            Err(CompileError::Parse(_))
        ));
        assert!(matches!(
            compile_with("(func)", &strict),
            Err(CompileError::Emit(EmitError::MissingModule))
        ));
    }

    #[test]
    fn text_output_follows_options() {
        let source = r#"(module (func (export "f")))"#;
        assert_eq!(compile_to_text_with(source, &Options::default()), compile_to_text(source));

        let unquoted = Options {
            unquote_exports: true,
            ..Options::default()
        };
        let text = compile_to_text_with(source, &unquoted).unwrap();
        assert!(text.contains("7 5 1 1 102 0 0"), "{text}");
        assert!(compile_to_text_with("(module #)", &Options::strict()).is_err());
    }

    #[test]
    fn compile_error_display() {
        let err = CompileError::from(ParseError::NoTokens);
        assert_eq!(err.to_string(), "parse error: no tokens to parse");
    }
}
