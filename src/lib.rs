//! Cached table views over class file attribute data and a terminal viewer
//! that hosts them.

pub mod attributes;
pub mod controller;
pub mod domain;
pub mod frame;
pub mod logging;
pub mod model;
pub mod rowindex;
pub mod table;
pub mod ui;

pub use domain::{AVError, CellValue, ColumnType, LinkTarget};
pub use rowindex::{RowIndexCache, SharedRowIndex};
pub use table::{AttributeSource, CachedAttributeTable, Navigator};
