use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout},
    style::{Modifier, Style, Stylize},
    text::{Line, Text},
    widgets::{Cell, Paragraph, Row, Table, TableState},
};

use crate::domain::{ColumnType, HELP_TEXT};
use crate::model::{ColumnView, Model};

pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;

#[derive(Debug, Default)]
pub struct TableUI {
    state: TableState,
}

fn column_cell(column: &ColumnView, text: &str) -> Cell<'static> {
    let text = Text::from(text.to_string());
    match column.column_type {
        ColumnType::Number => Cell::from(text.alignment(Alignment::Right)),
        ColumnType::Link => Cell::from(text).style(Style::new().blue().underlined()),
        ColumnType::Text => Cell::from(text),
    }
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        let header = Row::new(
            uidata
                .columns
                .iter()
                .map(|c| Cell::from(c.name.clone()).bold()),
        )
        .height(TABLE_HEADER_HEIGHT as u16)
        .underlined();

        let nvisible = uidata.columns.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nvisible).map(|ridx| {
            Row::new(
                uidata
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(cidx, column)| {
                        let cell = column_cell(column, &column.data[ridx]);
                        // The row number column is dimmed, never highlighted.
                        if cidx == 0 { cell.dim() } else { cell }
                    }),
            )
        });
        let widths = uidata
            .columns
            .iter()
            .map(|c| Constraint::Length(c.width));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::new().add_modifier(Modifier::BOLD))
            .cell_highlight_style(Style::new().reversed());

        self.state.select(Some(uidata.selected_row));
        self.state.select_column(Some(uidata.selected_column));
        // Rows handed to the widget are already the visible window.
        *self.state.offset_mut() = 0;
        frame.render_stateful_widget(table, table_area, &mut self.state);

        let position = if uidata.nrows == 0 {
            "0/0".to_string()
        } else {
            format!("{}/{}", uidata.abs_selected_row + 1, uidata.nrows)
        };
        let status = Line::from(vec![
            format!(" {} ", uidata.name).bold().reversed(),
            format!(" {position} ").yellow(),
            format!(" {} ", uidata.status_message).into(),
            HELP_TEXT.dark_gray(),
        ]);
        frame.render_widget(Paragraph::new(status), status_area);
    }
}
