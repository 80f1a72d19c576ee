use tracing::trace;

use crate::domain::{CellValue, ColumnType, LinkTarget};
use crate::rowindex::{self, SharedRowIndex};

/// Name of the leading row number column.
pub const INDEX_COLUMN_NAME: &str = "Nr.";
/// Columns the table adds in front of the source columns.
pub const BASE_COLUMN_COUNT: usize = 1;

/// Read only data of one attribute, addressed by row and logical column.
///
/// Logical columns do not include the row number column, so column 0 of a
/// source is column 1 of the table.
pub trait AttributeSource {
    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    fn value_at(&self, row: usize, column: usize) -> CellValue;

    fn column_name(&self, column: usize) -> String;

    fn column_type(&self, column: usize) -> ColumnType;

    /// Width of a *table* column in terminal cells, row number column included.
    fn column_width(&self, column: usize) -> u16;

    fn link_target(&self, _row: usize, _column: usize) -> Option<LinkTarget> {
        None
    }
}

/// Receives the cross references a user follows.
pub trait Navigator {
    fn navigate(&mut self, target: LinkTarget);
}

// Dense memo of computed cells, `None` marks a cell that was never requested.
struct CellCache {
    nrows: usize,
    ncolumns: usize,
    cells: Vec<Option<CellValue>>,
}

impl CellCache {
    fn new(nrows: usize, ncolumns: usize) -> Self {
        Self {
            nrows,
            ncolumns,
            cells: vec![None; nrows * ncolumns],
        }
    }

    fn slot(&self, row: usize, column: usize) -> Option<usize> {
        (row < self.nrows && column < self.ncolumns).then(|| row * self.ncolumns + column)
    }

    fn get(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.slot(row, column).and_then(|idx| self.cells[idx].as_ref())
    }

    fn set(&mut self, row: usize, column: usize, value: CellValue) {
        if let Some(idx) = self.slot(row, column) {
            self.cells[idx] = Some(value);
        }
    }
}

/// Table view over an [`AttributeSource`] with a leading row number column.
///
/// Cell values are computed on first access and memoized for the lifetime of
/// the view. Row number strings come from a [`SharedRowIndex`] that can be
/// shared by many views so numbers are formatted once.
pub struct CachedAttributeTable<'a, S: AttributeSource + ?Sized> {
    source: &'a S,
    row_index: SharedRowIndex,
    cells: Option<CellCache>,
}

impl<'a, S: AttributeSource + ?Sized> CachedAttributeTable<'a, S> {
    pub fn new(source: &'a S, row_index: SharedRowIndex) -> Self {
        rowindex::lock(&row_index).ensure_capacity(source.row_count());
        Self {
            source,
            row_index,
            cells: None,
        }
    }

    pub fn source(&self) -> &'a S {
        self.source
    }

    pub fn row_count(&self) -> usize {
        self.source.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.source.column_count() + BASE_COLUMN_COUNT
    }

    pub fn column_name(&self, column: usize) -> String {
        if column == 0 {
            INDEX_COLUMN_NAME.to_string()
        } else {
            self.source.column_name(column - BASE_COLUMN_COUNT)
        }
    }

    pub fn column_type(&self, column: usize) -> ColumnType {
        if column == 0 {
            ColumnType::Number
        } else {
            self.source.column_type(column - BASE_COLUMN_COUNT)
        }
    }

    pub fn column_width(&self, column: usize) -> u16 {
        self.source.column_width(column)
    }

    pub fn is_editable(&self, _row: usize, _column: usize) -> bool {
        false
    }

    pub fn cell_value(&mut self, row: usize, column: usize) -> CellValue {
        if column == 0 {
            return CellValue::Text(rowindex::lock(&self.row_index).get(row));
        }
        let column = column - BASE_COLUMN_COUNT;
        let source = self.source;
        let cells = self
            .cells
            .get_or_insert_with(|| CellCache::new(source.row_count(), source.column_count()));

        if let Some(value) = cells.get(row, column) {
            return value.clone();
        }
        trace!("Cell cache miss at row {row}, column {column}");
        let value = source.value_at(row, column);
        cells.set(row, column, value.clone());
        value
    }

    /// Forwards the cross reference of a cell to `navigator`.
    /// Returns false if the cell does not hold a link.
    pub fn activate_link(&self, row: usize, column: usize, navigator: &mut dyn Navigator) -> bool {
        if column == 0 {
            return false;
        }
        match self.source.link_target(row, column - BASE_COLUMN_COUNT) {
            Some(target) => {
                trace!("Following link at row {row}, column {column} to {target}");
                navigator.navigate(target);
                true
            }
            None => false,
        }
    }
}
