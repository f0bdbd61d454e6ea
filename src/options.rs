//! Compiler configuration.
//!
//! The grammar is forgiving by default: unknown characters are skipped, unknown
//! statements become no-ops and numbers that do not fit are read as zero.
//! [`Mode::Strict`] turns each of those into a fatal error instead.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// How the pipeline treats input it cannot make sense of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Skip or zero out anything unrecognised.
    #[default]
    Permissive,
    /// Fail on anything the permissive mode would silently recover from.
    Strict,
}

/// Options accepted by [`crate::compile_with`].
///
/// ```
/// use luna::{Mode, Options};
///
/// let options = Options::from_json(r#"{ "mode": "strict" }"#).unwrap();
/// assert_eq!(options.mode, Mode::Strict);
/// assert!(!options.unquote_exports);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub mode: Mode,
    /// Strip the surrounding `"` from export names and call targets.
    ///
    /// Off by default: the exported name is the literal exactly as written,
    /// quotes included.
    pub unquote_exports: bool,
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("reading options: {0}")]
    Io(#[from] io::Error),
    #[error("invalid options: {0}")]
    Json(#[from] serde_json::Error),
}

impl Options {
    pub fn strict() -> Self {
        Self {
            mode: Mode::Strict,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.mode == Mode::Strict
    }

    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The name a literal resolves to, honouring `unquote_exports`.
    pub(crate) fn literal_name<'a>(&self, literal: &'a str) -> &'a str {
        if self.unquote_exports {
            unquote(literal)
        } else {
            literal
        }
    }
}

/// `"name"` -> `name`. Text without both quotes is returned unchanged.
pub(crate) fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal)
}
