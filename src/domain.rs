use std::fmt;
use std::io::Error;
use std::sync::Arc;

use derive_setters::Setters;
use polars::error::PolarsError;

pub const HELP_TEXT: &str =
    " Quit <q> | Move <←↓↑→> | Top/Bottom <g/G> | Follow link <Enter> | Copy cell <y> ";

// Crate wide error type. The table view itself never fails, everything in here
// comes from loading and decoding the data that is shown.
#[derive(Debug)]
pub enum AVError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    MissingColumn(String),
    InvalidValue(String),
    LoggingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for AVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AVError::IoError(e) => write!(f, "io error: {e}"),
            AVError::PolarsError(e) => write!(f, "polars error: {e}"),
            AVError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            AVError::MissingColumn(name) => write!(f, "missing column \"{name}\""),
            AVError::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            AVError::LoggingFailed(msg) => write!(f, "could not set up logging: {msg}"),
            AVError::FileNotFound => write!(f, "file not found"),
            AVError::PermissionDenied => write!(f, "permission denied"),
            AVError::UnknownFileType => write!(f, "unknown file type"),
        }
    }
}

impl std::error::Error for AVError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AVError::IoError(e) => Some(e),
            AVError::PolarsError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for AVError {
    fn from(err: Error) -> Self {
        AVError::IoError(err)
    }
}

impl From<PolarsError> for AVError {
    fn from(err: PolarsError) -> Self {
        AVError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct ViewConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Quit,
    MoveUp(usize),
    MoveDown(usize),
    PageUp,
    PageDown,
    MoveLeft,
    MoveRight,
    MoveBeginning,
    MoveEnd,
    FollowLink,
    CopyCell,
    Resize(usize, usize),
}

/// Type tag of a table column, used by the host widget for alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Number,
    Text,
    Link,
}

/// Destination of a cross reference contained in a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    ConstantPool(u16),
    Code(u16),
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::ConstantPool(idx) => write!(f, "cp_info #{idx}"),
            LinkTarget::Code(pc) => write!(f, "pc {pc}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(Arc<str>),
    Number(i64),
    Link { label: Arc<str>, target: LinkTarget },
}

impl CellValue {
    pub fn text(s: impl Into<Arc<str>>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn link(label: impl Into<Arc<str>>, target: LinkTarget) -> Self {
        CellValue::Link {
            label: label.into(),
            target,
        }
    }

    pub fn link_target(&self) -> Option<LinkTarget> {
        match self {
            CellValue::Link { target, .. } => Some(*target),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Link { label, .. } => f.write_str(label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_setters_chain() {
        let cfg = ViewConfig::default()
            .with_event_poll_time(25)
            .with_max_column_width(12);
        assert_eq!(cfg.event_poll_time, 25);
        assert_eq!(cfg.max_column_width, 12);
    }

    #[test]
    fn cell_values_display_their_text() {
        assert_eq!(CellValue::text("abc").to_string(), "abc");
        assert_eq!(CellValue::Number(-4).to_string(), "-4");
        let link = CellValue::link("cp_info #3 <Foo>", LinkTarget::ConstantPool(3));
        assert_eq!(link.to_string(), "cp_info #3 <Foo>");
        assert_eq!(link.link_target(), Some(LinkTarget::ConstantPool(3)));
        assert_eq!(CellValue::Number(1).link_target(), None);
    }

    #[test]
    fn io_errors_convert() {
        let err: AVError = Error::other("boom").into();
        assert!(matches!(err, AVError::IoError(_)));
        assert_eq!(err.to_string(), "io error: boom");
    }
}
