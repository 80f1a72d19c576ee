use std::collections::HashMap;

use crate::domain::{CellValue, ColumnType, LinkTarget};
use crate::table::AttributeSource;

pub const INDEX_COLUMN_WIDTH: u16 = 6;
pub const NUMBER_COLUMN_WIDTH: u16 = 12;
pub const LINK_COLUMN_WIDTH: u16 = 40;

/// Resolves constant pool indices to display text.
pub trait ConstantPool {
    fn resolve(&self, index: u16) -> Option<String>;
}

#[derive(Debug, Default, Clone)]
pub struct MapConstantPool {
    entries: HashMap<u16, String>,
}

impl MapConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u16, value: impl Into<String>) {
        self.entries.insert(index, value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(u16, String)> for MapConstantPool {
    fn from_iter<T: IntoIterator<Item = (u16, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl ConstantPool for MapConstantPool {
    fn resolve(&self, index: u16) -> Option<String> {
        self.entries.get(&index).cloned()
    }
}

fn constant_pool_link(pool: &dyn ConstantPool, index: u16) -> CellValue {
    let resolved = pool.resolve(index).unwrap_or_else(|| "invalid".to_string());
    CellValue::link(
        format!("cp_info #{index} <{resolved}>"),
        LinkTarget::ConstantPool(index),
    )
}

fn code_link(pc: u16) -> CellValue {
    CellValue::link(pc.to_string(), LinkTarget::Code(pc))
}

fn number_or_link_width(column: usize, link_columns: &[usize]) -> u16 {
    match column {
        0 => INDEX_COLUMN_WIDTH,
        c if link_columns.contains(&(c - 1)) => LINK_COLUMN_WIDTH,
        _ => NUMBER_COLUMN_WIDTH,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

pub struct ExceptionTableSource<'a> {
    entries: &'a [ExceptionTableEntry],
    pool: &'a dyn ConstantPool,
}

impl<'a> ExceptionTableSource<'a> {
    pub fn new(entries: &'a [ExceptionTableEntry], pool: &'a dyn ConstantPool) -> Self {
        Self { entries, pool }
    }
}

impl AttributeSource for ExceptionTableSource<'_> {
    fn row_count(&self) -> usize {
        self.entries.len()
    }

    fn column_count(&self) -> usize {
        4
    }

    fn value_at(&self, row: usize, column: usize) -> CellValue {
        let entry = &self.entries[row];
        match column {
            0 => code_link(entry.start_pc),
            1 => code_link(entry.end_pc),
            2 => code_link(entry.handler_pc),
            // A catch type of zero catches everything.
            _ if entry.catch_type == 0 => CellValue::text("any"),
            _ => constant_pool_link(self.pool, entry.catch_type),
        }
    }

    fn column_name(&self, column: usize) -> String {
        match column {
            0 => "Start PC",
            1 => "End PC",
            2 => "Handler PC",
            _ => "Catch Type",
        }
        .to_string()
    }

    fn column_type(&self, _column: usize) -> ColumnType {
        ColumnType::Link
    }

    fn column_width(&self, column: usize) -> u16 {
        number_or_link_width(column, &[3])
    }

    fn link_target(&self, row: usize, column: usize) -> Option<LinkTarget> {
        let entry = self.entries.get(row)?;
        match column {
            0 => Some(LinkTarget::Code(entry.start_pc)),
            1 => Some(LinkTarget::Code(entry.end_pc)),
            2 => Some(LinkTarget::Code(entry.handler_pc)),
            3 if entry.catch_type != 0 => Some(LinkTarget::ConstantPool(entry.catch_type)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

pub struct LineNumberTableSource<'a> {
    entries: &'a [LineNumberEntry],
}

impl<'a> LineNumberTableSource<'a> {
    pub fn new(entries: &'a [LineNumberEntry]) -> Self {
        Self { entries }
    }
}

impl AttributeSource for LineNumberTableSource<'_> {
    fn row_count(&self) -> usize {
        self.entries.len()
    }

    fn column_count(&self) -> usize {
        2
    }

    fn value_at(&self, row: usize, column: usize) -> CellValue {
        let entry = &self.entries[row];
        match column {
            0 => code_link(entry.start_pc),
            _ => CellValue::Number(entry.line_number.into()),
        }
    }

    fn column_name(&self, column: usize) -> String {
        match column {
            0 => "Start PC",
            _ => "Line Number",
        }
        .to_string()
    }

    fn column_type(&self, column: usize) -> ColumnType {
        match column {
            0 => ColumnType::Link,
            _ => ColumnType::Number,
        }
    }

    fn column_width(&self, column: usize) -> u16 {
        number_or_link_width(column, &[])
    }

    fn link_target(&self, row: usize, column: usize) -> Option<LinkTarget> {
        let entry = self.entries.get(row)?;
        (column == 0).then_some(LinkTarget::Code(entry.start_pc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

pub struct LocalVariableTableSource<'a> {
    entries: &'a [LocalVariableEntry],
    pool: &'a dyn ConstantPool,
}

impl<'a> LocalVariableTableSource<'a> {
    pub fn new(entries: &'a [LocalVariableEntry], pool: &'a dyn ConstantPool) -> Self {
        Self { entries, pool }
    }
}

impl AttributeSource for LocalVariableTableSource<'_> {
    fn row_count(&self) -> usize {
        self.entries.len()
    }

    fn column_count(&self) -> usize {
        5
    }

    fn value_at(&self, row: usize, column: usize) -> CellValue {
        let entry = &self.entries[row];
        match column {
            0 => code_link(entry.start_pc),
            1 => CellValue::Number(entry.length.into()),
            2 => CellValue::Number(entry.index.into()),
            3 => constant_pool_link(self.pool, entry.name_index),
            _ => constant_pool_link(self.pool, entry.descriptor_index),
        }
    }

    fn column_name(&self, column: usize) -> String {
        match column {
            0 => "Start PC",
            1 => "Length",
            2 => "Index",
            3 => "Name",
            _ => "Descriptor",
        }
        .to_string()
    }

    fn column_type(&self, column: usize) -> ColumnType {
        match column {
            1 | 2 => ColumnType::Number,
            _ => ColumnType::Link,
        }
    }

    fn column_width(&self, column: usize) -> u16 {
        number_or_link_width(column, &[3, 4])
    }

    fn link_target(&self, row: usize, column: usize) -> Option<LinkTarget> {
        let entry = self.entries.get(row)?;
        match column {
            0 => Some(LinkTarget::Code(entry.start_pc)),
            3 => Some(LinkTarget::ConstantPool(entry.name_index)),
            4 => Some(LinkTarget::ConstantPool(entry.descriptor_index)),
            _ => None,
        }
    }
}

/// The `Exceptions` attribute of a method: constant pool indices of the
/// declared exception classes.
pub struct ExceptionsSource<'a> {
    exception_indices: &'a [u16],
    pool: &'a dyn ConstantPool,
}

impl<'a> ExceptionsSource<'a> {
    pub fn new(exception_indices: &'a [u16], pool: &'a dyn ConstantPool) -> Self {
        Self {
            exception_indices,
            pool,
        }
    }
}

impl AttributeSource for ExceptionsSource<'_> {
    fn row_count(&self) -> usize {
        self.exception_indices.len()
    }

    fn column_count(&self) -> usize {
        1
    }

    fn value_at(&self, row: usize, _column: usize) -> CellValue {
        constant_pool_link(self.pool, self.exception_indices[row])
    }

    fn column_name(&self, _column: usize) -> String {
        "Exception".to_string()
    }

    fn column_type(&self, _column: usize) -> ColumnType {
        ColumnType::Link
    }

    fn column_width(&self, column: usize) -> u16 {
        number_or_link_width(column, &[0])
    }

    fn link_target(&self, row: usize, _column: usize) -> Option<LinkTarget> {
        self.exception_indices
            .get(row)
            .map(|&idx| LinkTarget::ConstantPool(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rowindex::RowIndexCache;
    use crate::table::{CachedAttributeTable, Navigator};

    fn pool() -> MapConstantPool {
        [
            (7, "java/io/IOException".to_string()),
            (9, "count".to_string()),
            (10, "I".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[derive(Default)]
    struct Visits(Vec<LinkTarget>);

    impl Navigator for Visits {
        fn navigate(&mut self, target: LinkTarget) {
            self.0.push(target);
        }
    }

    #[test]
    fn exception_table_cells() {
        let pool = pool();
        let entries = [
            ExceptionTableEntry {
                start_pc: 0,
                end_pc: 12,
                handler_pc: 15,
                catch_type: 7,
            },
            ExceptionTableEntry {
                start_pc: 0,
                end_pc: 12,
                handler_pc: 30,
                catch_type: 0,
            },
        ];
        let source = ExceptionTableSource::new(&entries, &pool);
        let mut table = CachedAttributeTable::new(&source, RowIndexCache::shared());

        assert_eq!(table.column_count(), 5);
        assert_eq!(table.column_name(3), "Handler PC");
        assert_eq!(table.cell_value(0, 2).to_string(), "12");
        assert_eq!(
            table.cell_value(0, 4).to_string(),
            "cp_info #7 <java/io/IOException>"
        );
        assert_eq!(table.cell_value(1, 4).to_string(), "any");
        assert_eq!(table.column_width(4), LINK_COLUMN_WIDTH);
        assert_eq!(table.column_width(1), NUMBER_COLUMN_WIDTH);

        let mut visits = Visits::default();
        assert!(table.activate_link(0, 3, &mut visits));
        assert!(table.activate_link(0, 4, &mut visits));
        assert!(!table.activate_link(1, 4, &mut visits));
        assert_eq!(
            visits.0,
            vec![LinkTarget::Code(15), LinkTarget::ConstantPool(7)]
        );
    }

    #[test]
    fn line_numbers() {
        let entries = [
            LineNumberEntry {
                start_pc: 0,
                line_number: 42,
            },
            LineNumberEntry {
                start_pc: 5,
                line_number: 43,
            },
        ];
        let source = LineNumberTableSource::new(&entries);
        let mut table = CachedAttributeTable::new(&source, RowIndexCache::shared());

        assert_eq!(table.column_name(2), "Line Number");
        assert_eq!(table.column_type(2), ColumnType::Number);
        assert_eq!(table.cell_value(1, 2), CellValue::Number(43));
        assert_eq!(table.cell_value(1, 0).to_string(), "1");
        assert_eq!(table.column_width(0), INDEX_COLUMN_WIDTH);
    }

    #[test]
    fn local_variables_resolve_names() {
        let pool = pool();
        let entries = [LocalVariableEntry {
            start_pc: 2,
            length: 10,
            name_index: 9,
            descriptor_index: 10,
            index: 1,
        }];
        let source = LocalVariableTableSource::new(&entries, &pool);
        let mut table = CachedAttributeTable::new(&source, RowIndexCache::shared());

        assert_eq!(table.cell_value(0, 2), CellValue::Number(10));
        assert_eq!(table.cell_value(0, 3), CellValue::Number(1));
        assert_eq!(table.cell_value(0, 4).to_string(), "cp_info #9 <count>");
        assert_eq!(table.cell_value(0, 5).to_string(), "cp_info #10 <I>");
        assert_eq!(
            table.cell_value(0, 5).link_target(),
            Some(LinkTarget::ConstantPool(10))
        );
    }

    #[test]
    fn unresolved_exception_is_marked_invalid() {
        let pool = pool();
        let indices = [7, 99];
        let source = ExceptionsSource::new(&indices, &pool);
        let mut table = CachedAttributeTable::new(&source, RowIndexCache::shared());

        assert_eq!(table.column_name(1), "Exception");
        assert_eq!(table.cell_value(1, 1).to_string(), "cp_info #99 <invalid>");

        let mut visits = Visits::default();
        assert!(table.activate_link(1, 1, &mut visits));
        assert_eq!(visits.0, vec![LinkTarget::ConstantPool(99)]);
    }
}
