use arboard::Clipboard;
use std::time::Instant;
use tracing::{debug, trace};

use crate::domain::{AVError, ColumnType, LinkTarget, Message};
use crate::table::{AttributeSource, CachedAttributeTable, Navigator};
use crate::ui::{STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: u16,
    pub column_type: ColumnType,
    pub data: Vec<String>,
}

/// Everything the ui needs to draw one frame.
pub struct UIData {
    pub name: String,
    pub columns: Vec<ColumnView>,
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            columns: Vec::new(),
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

/// Remembers followed links. There is no class file behind the viewer to jump
/// into, so following a link only records it.
#[derive(Debug, Default)]
pub struct LinkHistory {
    visited: Vec<LinkTarget>,
}

impl LinkHistory {
    pub fn last(&self) -> Option<LinkTarget> {
        self.visited.last().copied()
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

impl Navigator for LinkHistory {
    fn navigate(&mut self, target: LinkTarget) {
        debug!("Navigating to {target}");
        self.visited.push(target);
    }
}

pub struct Model<'a> {
    pub status: Status,
    name: String,
    table: CachedAttributeTable<'a, dyn AttributeSource + 'a>,
    // Cursor and offset address table columns, so column 0 is the row number.
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>,
    width: usize,
    height: usize,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    links: LinkHistory,
}

impl<'a> Model<'a> {
    pub fn init(
        name: String,
        table: CachedAttributeTable<'a, dyn AttributeSource + 'a>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                debug!("No clipboard available: {e:?}");
                None
            }
        };
        let mut model = Self {
            status: Status::READY,
            name,
            table,
            curser_row: 0,
            curser_column: 1,
            offset_row: 0,
            offset_column: 1,
            visible_columns: Vec::new(),
            width: 0,
            height: 0,
            uidata: UIData::empty(),
            clipboard,
            links: LinkHistory::default(),
        };
        model.ui_resize(ui_width, ui_height);
        let message = format!(
            "{} rows, {} columns",
            model.table.row_count(),
            model.table.column_count() - 1
        );
        model.set_status_message(message);
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn links(&self) -> &LinkHistory {
        &self.links
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Message) -> Result<(), AVError> {
        trace!("Update: {message:?}");
        match message {
            Message::Quit => self.quit(),
            Message::MoveUp(size) => self.move_selection_up(size),
            Message::MoveDown(size) => self.move_selection_down(size),
            Message::PageUp => self.move_selection_up(self.height.max(1)),
            Message::PageDown => self.move_selection_down(self.height.max(1)),
            Message::MoveLeft => self.move_selection_left(),
            Message::MoveRight => self.move_selection_right(),
            Message::MoveBeginning => self.move_selection_beginning(),
            Message::MoveEnd => self.move_selection_end(),
            Message::FollowLink => self.follow_link(),
            Message::CopyCell => self.copy_cell(),
            Message::Resize(width, height) => self.ui_resize(width, height),
        }
        Ok(())
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.uidata.status_message = message.into();
        self.uidata.last_update = Instant::now();
    }

    fn selected_row(&self) -> usize {
        self.offset_row + self.curser_row
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.width, width, self.height, height
        );
        self.width = width;
        self.height = height.saturating_sub(STATUSLINE_HEIGHT + TABLE_HEADER_HEIGHT);
        if self.height > 0 && self.curser_row >= self.height {
            self.offset_row += self.curser_row + 1 - self.height;
            self.curser_row = self.height - 1;
        }
        self.update_table_data();
        self.scroll_to_curser_column();
    }

    // Scroll right until the cursor column is part of the layout.
    fn scroll_to_curser_column(&mut self) {
        while self.curser_column < self.table.column_count()
            && !self.visible_columns.contains(&self.curser_column)
        {
            self.offset_column += 1;
            self.update_table_data();
        }
    }

    // Row number column first, then as many source columns as fit.
    fn layout_columns(&mut self) {
        self.visible_columns = vec![0];
        let mut used = self.table.column_width(0) as usize + 1;
        for column in self.offset_column..self.table.column_count() {
            let width = self.table.column_width(column) as usize + 1;
            if used + width > self.width && self.visible_columns.len() > 1 {
                break;
            }
            self.visible_columns.push(column);
            used += width;
        }
    }

    fn update_table_data(&mut self) {
        self.layout_columns();
        let nrows = self.table.row_count();
        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.height, nrows);

        let mut columns = Vec::with_capacity(self.visible_columns.len());
        for &column in self.visible_columns.iter() {
            let data = (rbegin..rend)
                .map(|row| self.table.cell_value(row, column).to_string())
                .collect();
            columns.push(ColumnView {
                name: self.table.column_name(column),
                width: self.table.column_width(column),
                column_type: self.table.column_type(column),
                data,
            });
        }

        let selected_column = self
            .visible_columns
            .iter()
            .position(|&c| c == self.curser_column)
            .unwrap_or(0);

        self.uidata.name = self.name.clone();
        self.uidata.columns = columns;
        self.uidata.nrows = nrows;
        self.uidata.selected_row = self.curser_row;
        self.uidata.selected_column = selected_column;
        self.uidata.abs_selected_row = self.selected_row();
        self.uidata.last_update = Instant::now();
    }

    fn follow_link(&mut self) {
        let row = self.selected_row();
        if row >= self.table.row_count() || self.curser_column >= self.table.column_count() {
            return;
        }
        if self
            .table
            .activate_link(row, self.curser_column, &mut self.links)
        {
            let target = self.links.last().map(|t| t.to_string()).unwrap_or_default();
            self.set_status_message(format!("Followed link to {target}"));
        } else {
            self.set_status_message("No link in this cell");
        }
    }

    fn copy_cell(&mut self) {
        let row = self.selected_row();
        if row >= self.table.row_count() || self.curser_column >= self.table.column_count() {
            return;
        }
        let cell = self.table.cell_value(row, self.curser_column).to_string();
        trace!("Cell content: {}", cell);

        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("No clipboard available");
            return;
        };
        match clipboard.set_text(cell) {
            Ok(_) => self.set_status_message("Copied cell content to clipboard."),
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Copying to clipboard failed");
            }
        }
    }

    fn move_selection_beginning(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    fn move_selection_end(&mut self) {
        let nrows = self.table.row_count();
        if nrows == 0 {
            return;
        }
        if nrows < self.height {
            self.offset_row = 0;
            self.curser_row = nrows - 1;
        } else {
            self.offset_row = nrows - self.height;
            self.curser_row = self.height.saturating_sub(1);
        }
        self.update_table_data();
    }

    fn move_selection_up(&mut self, size: usize) {
        let target = self.selected_row().saturating_sub(size);
        if target >= self.offset_row {
            self.curser_row = target - self.offset_row;
        } else {
            // Above the top of the table, shift table up
            self.offset_row = target;
            self.curser_row = 0;
        }
        self.update_table_data();
    }

    fn move_selection_down(&mut self, size: usize) {
        let nrows = self.table.row_count();
        if self.height == 0 || self.selected_row() + 1 >= nrows {
            return;
        }
        let target = std::cmp::min(self.selected_row() + size, nrows - 1);
        if target < self.offset_row + self.height {
            self.curser_row = target - self.offset_row;
        } else {
            // Past the bottom of the table, shift table down
            self.offset_row = target + 1 - self.height;
            self.curser_row = self.height - 1;
        }
        self.update_table_data();
    }

    fn move_selection_left(&mut self) {
        if self.curser_column <= 1 {
            return;
        }
        self.curser_column -= 1;
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        if self.curser_column + 1 >= self.table.column_count() {
            return;
        }
        self.curser_column += 1;
        self.update_table_data();
        self.scroll_to_curser_column();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{ExceptionTableEntry, ExceptionTableSource, MapConstantPool};
    use crate::domain::CellValue;
    use crate::rowindex::RowIndexCache;
    use std::cell::Cell;

    struct Numbers {
        nrows: usize,
        calls: Cell<usize>,
    }

    impl AttributeSource for Numbers {
        fn row_count(&self) -> usize {
            self.nrows
        }

        fn column_count(&self) -> usize {
            3
        }

        fn value_at(&self, row: usize, column: usize) -> CellValue {
            self.calls.set(self.calls.get() + 1);
            CellValue::Number((row * 100 + column) as i64)
        }

        fn column_name(&self, column: usize) -> String {
            format!("n{column}")
        }

        fn column_type(&self, _column: usize) -> ColumnType {
            ColumnType::Number
        }

        fn column_width(&self, _column: usize) -> u16 {
            8
        }
    }

    fn numbers(nrows: usize) -> Numbers {
        Numbers {
            nrows,
            calls: Cell::new(0),
        }
    }

    // 10 visible rows with header and status line
    fn model<'a>(source: &'a dyn AttributeSource) -> Model<'a> {
        let table = CachedAttributeTable::new(source, RowIndexCache::shared());
        Model::init("test".into(), table, 80, 12)
    }

    #[test]
    fn shows_visible_window_with_row_numbers() {
        let source = numbers(25);
        let model = model(&source);
        let ui = model.get_uidata();

        assert_eq!(ui.nrows, 25);
        assert_eq!(ui.columns.len(), 4);
        assert_eq!(ui.columns[0].name, "Nr.");
        assert_eq!(ui.columns[0].data.len(), 10);
        assert_eq!(ui.columns[0].data[9], "9");
        assert_eq!(ui.columns[2].data[3], "301");
        assert_eq!(ui.selected_column, 1);
    }

    #[test]
    fn redraws_hit_the_cache() {
        let source = numbers(25);
        let mut model = model(&source);
        assert_eq!(source.calls.get(), 30);
        model.update(Message::Resize(80, 12)).unwrap();
        model.update(Message::MoveDown(1)).unwrap();
        assert_eq!(source.calls.get(), 30);
    }

    #[test]
    fn scrolling_down_shifts_the_window() {
        let source = numbers(25);
        let mut model = model(&source);
        model.update(Message::MoveDown(12)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.abs_selected_row, 12);
        assert_eq!(ui.selected_row, 9);
        assert_eq!(ui.columns[0].data[0], "3");

        model.update(Message::MoveEnd).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 24);
        model.update(Message::MoveDown(1)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 24);

        model.update(Message::MoveBeginning).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        model.update(Message::MoveUp(3)).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn narrow_screen_scrolls_columns() {
        let source = numbers(2);
        let dynamic: &dyn AttributeSource = &source;
        let table = CachedAttributeTable::new(dynamic, RowIndexCache::shared());
        let mut model = Model::init("narrow".into(), table, 20, 12);
        assert_eq!(model.get_uidata().columns.len(), 2);

        model.update(Message::MoveRight).unwrap();
        model.update(Message::MoveRight).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.columns[0].name, "Nr.");
        assert_eq!(ui.columns[ui.selected_column].name, "n2");

        model.update(Message::MoveRight).unwrap();
        model.update(Message::MoveLeft).unwrap();
        model.update(Message::MoveLeft).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.columns[ui.selected_column].name, "n0");
    }

    #[test]
    fn narrowing_resize_keeps_cursor_column_visible() {
        let source = numbers(2);
        let mut model = model(&source);
        model.update(Message::MoveRight).unwrap();
        model.update(Message::MoveRight).unwrap();
        model.update(Message::Resize(20, 12)).unwrap();

        let ui = model.get_uidata();
        let names: Vec<&str> = ui.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Nr.", "n2"]);
        assert_eq!(ui.columns[ui.selected_column].name, "n2");

        model.update(Message::MoveLeft).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.columns[ui.selected_column].name, "n1");
    }

    #[test]
    fn source_without_columns_survives_resize() {
        struct NoColumns;

        impl AttributeSource for NoColumns {
            fn row_count(&self) -> usize {
                3
            }

            fn column_count(&self) -> usize {
                0
            }

            fn value_at(&self, _row: usize, _column: usize) -> CellValue {
                unreachable!("no columns to read")
            }

            fn column_name(&self, _column: usize) -> String {
                String::new()
            }

            fn column_type(&self, _column: usize) -> ColumnType {
                ColumnType::Text
            }

            fn column_width(&self, _column: usize) -> u16 {
                4
            }
        }

        let source = NoColumns;
        let mut model = model(&source);
        model.update(Message::Resize(10, 6)).unwrap();
        model.update(Message::CopyCell).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.columns.len(), 1);
        assert_eq!(ui.columns[0].data, vec!["0", "1", "2"]);
    }

    #[test]
    fn moving_up_carries_past_the_window_top() {
        let source = numbers(25);
        let mut model = model(&source);
        model.update(Message::MoveEnd).unwrap();
        model.update(Message::MoveUp(20)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.abs_selected_row, 4);
        assert_eq!(ui.selected_row, 0);
        assert_eq!(ui.columns[0].data[0], "4");

        model.update(Message::MoveDown(2)).unwrap();
        model.update(Message::MoveUp(1)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.abs_selected_row, 5);
        assert_eq!(ui.selected_row, 1);
    }

    #[test]
    fn pages_follow_the_visible_height() {
        let source = numbers(25);
        let mut model = model(&source);
        model.update(Message::PageDown).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 10);
        model.update(Message::PageDown).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 20);
        model.update(Message::PageUp).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 10);

        model.update(Message::Resize(80, 7)).unwrap();
        model.update(Message::PageUp).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, 5);
    }

    #[test]
    fn following_links_records_target() {
        let pool: MapConstantPool = [(4, "java/lang/Exception".to_string())]
            .into_iter()
            .collect();
        let entries = [ExceptionTableEntry {
            start_pc: 1,
            end_pc: 9,
            handler_pc: 12,
            catch_type: 4,
        }];
        let source = ExceptionTableSource::new(&entries, &pool);
        let mut model = model(&source);

        model.update(Message::FollowLink).unwrap();
        assert_eq!(model.links().last(), Some(LinkTarget::Code(1)));

        model.update(Message::MoveRight).unwrap();
        model.update(Message::MoveRight).unwrap();
        model.update(Message::MoveRight).unwrap();
        model.update(Message::FollowLink).unwrap();
        assert_eq!(model.links().last(), Some(LinkTarget::ConstantPool(4)));
        assert_eq!(model.links().len(), 2);
        assert_eq!(
            model.get_uidata().status_message,
            "Followed link to cp_info #4"
        );
    }

    #[test]
    fn empty_source_is_harmless() {
        let source = numbers(0);
        let mut model = model(&source);
        for message in [
            Message::MoveDown(1),
            Message::MoveEnd,
            Message::FollowLink,
            Message::CopyCell,
        ] {
            model.update(message).unwrap();
        }
        assert!(model.links().is_empty());
        assert_eq!(model.get_uidata().columns[0].data.len(), 0);
    }

    #[test]
    fn quit_sets_status() {
        let source = numbers(1);
        let mut model = model(&source);
        model.update(Message::Quit).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }
}
