use std::fmt::{Debug, Display, Formatter};

pub mod demangle;
pub mod image;
pub mod inline;
pub mod range;
pub mod session;
mod symbolizer;

pub use session::{DebugSession, DieHandle, ModuleHandle, UnitHandle};
pub use symbolizer::{ReportState, Symbolizer};

/// Placeholder used wherever a name or a file could not be recovered.
pub const UNKNOWN: &str = "??";

#[derive(thiserror::Error, Debug)]
pub enum SymbolizeError {
    IOError(#[from] std::io::Error),
    ObjectParsingError(#[from] object::Error),
    GimliError(#[from] gimli::Error),
    NoLoadableSegments(String),
    NotReporting,
    OverlappingModules { first: String, second: String },
}

impl Display for SymbolizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolizeError::IOError(e) => Display::fmt(e, f),
            SymbolizeError::ObjectParsingError(e) => Display::fmt(e, f),
            SymbolizeError::GimliError(e) => Display::fmt(e, f),
            SymbolizeError::NoLoadableSegments(path) => {
                write!(f, "{} has no loadable segments", path)
            }
            SymbolizeError::NotReporting => {
                write!(f, "no module reporting batch is open")
            }
            SymbolizeError::OverlappingModules { first, second } => {
                write!(f, "modules {} and {} overlap", first, second)
            }
        }
    }
}

/// One logical level of a (possibly inlined) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub is_inlined: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            name: UNKNOWN.to_string(),
            file: UNKNOWN.to_string(),
            line: 0,
            column: 0,
            is_inlined: false,
        }
    }
}

impl Frame {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Frame {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}:{}", self.name, self.file, self.line)?;
        if self.column != 0 {
            write!(f, ":{}", self.column)?;
        }
        if self.is_inlined {
            write!(f, " (inlined)")?;
        }
        Ok(())
    }
}

/// Everything known about a single instruction pointer.
///
/// `frames` is ordered innermost first: the first entry is the most deeply
/// inlined routine, the last one is the real function holding the code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub module_name: String,
    pub module_offset: u64,
    pub symbol_offset: u64,
    pub frames: Vec<Frame>,
}

impl ResolvedLocation {
    pub fn is_empty(&self) -> bool {
        self.module_name.is_empty() && self.frames.is_empty()
    }
}

impl Display for ResolvedLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "{}", UNKNOWN);
        }
        write!(f, "{}+{:#x}", self.module_name, self.module_offset)?;
        for frame in &self.frames {
            write!(f, "\n    {}", frame)?;
        }
        Ok(())
    }
}
