use std::io::Write;

use tabled::settings::{
    object::{Cell, Columns, Rows},
    style::On,
    Alignment, Border, Style,
};

use crate::util::rw::WriteHandle;

use super::model::{Error, LotWriter, OutputType, RenderTable};

pub struct TextWriter {
    w: WriteHandle,
}

impl TextWriter {
    pub fn new(w: WriteHandle) -> TextWriter {
        TextWriter { w }
    }
}

struct CellBorder {
    top: char,
    bottom: char,
    left: char,
    right: char,
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
}

impl CellBorder {
    fn to_border(&self) -> Border<On, On, On, On> {
        Border::full(
            self.top,
            self.bottom,
            self.left,
            self.right,
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        )
    }

    fn blank() -> CellBorder {
        CellBorder {
            top: ' ',
            bottom: ' ',
            left: ' ',
            right: ' ',
            top_left: ' ',
            top_right: ' ',
            bottom_left: ' ',
            bottom_right: ' ',
        }
    }
}

impl Default for CellBorder {
    fn default() -> Self {
        CellBorder {
            top: '-',
            bottom: '-',
            left: '|',
            right: '|',
            top_left: '+',
            top_right: '+',
            bottom_left: '+',
            bottom_right: '+',
        }
    }
}

/// Renders a table as ascii text, with an open top edge and the footer
/// boxed separately underneath.
pub fn render_text_table(table_model: &RenderTable) -> String {
    let n_cols = table_model.header.len();
    if n_cols == 0 {
        return String::new();
    }

    let mut table_bldr = tabled::builder::Builder::default();
    table_bldr.push_record(
        table_model.header.iter().map(|h| h.to_uppercase()).collect::<Vec<String>>(),
    );
    for row in &table_model.rows {
        table_bldr.push_record(row.clone());
    }

    // One blank separator row, then the footer
    let footer_sep_row: Option<usize> = if !table_model.footer.is_empty() {
        table_bldr.push_record(vec![String::new(); table_model.footer.len()]);
        table_bldr.push_record(table_model.footer.clone());
        Some(1 + table_model.rows.len())
    } else {
        None
    };

    let mut table = table_bldr.build();
    table.with(Style::ascii());
    table.modify(Rows::first(), Alignment::center());

    // No outer border above the header, or on the outer edges
    table.modify(
        Rows::first(),
        CellBorder { top: ' ', top_left: ' ', top_right: ' ', ..Default::default() }.to_border(),
    );
    table.modify(
        Columns::first(),
        CellBorder { left: ' ', top_left: '-', bottom_left: '-', ..Default::default() }
            .to_border(),
    );
    table.modify(
        Columns::last(),
        CellBorder { right: ' ', top_right: '-', bottom_right: '-', ..Default::default() }
            .to_border(),
    );
    table.modify(
        Cell::new(0, 0),
        CellBorder {
            left: ' ',
            top: ' ',
            top_right: ' ',
            top_left: ' ',
            bottom_left: '-',
            ..Default::default()
        }
        .to_border(),
    );
    table.modify(
        Cell::new(0, n_cols - 1),
        CellBorder {
            right: ' ',
            top: ' ',
            top_right: ' ',
            top_left: ' ',
            bottom_right: '-',
            ..Default::default()
        }
        .to_border(),
    );

    if let Some(sep_row) = footer_sep_row {
        let footer_row = sep_row + 1;
        table.modify(Rows::single(sep_row), Border::new().set_left(' ').set_right(' '));
        table.modify(Rows::single(footer_row), CellBorder::blank().to_border());

        // Only the filled footer cells get a box
        for (col, footer_cell) in table_model.footer.iter().enumerate() {
            if !footer_cell.is_empty() {
                table.modify(Cell::new(sep_row, col), CellBorder::default().to_border());
                table.modify(Cell::new(footer_row, col), CellBorder::default().to_border());
            }
        }
    }

    table.to_string()
}

impl LotWriter for TextWriter {
    fn print_render_table(
        &mut self,
        out_type: OutputType,
        name: &str,
        table_model: &RenderTable,
    ) -> Result<(), Error> {
        let map_write_err = |e| format!("{e}");

        for err in &table_model.errors {
            writeln!(self.w, "[!] {}", err).map_err(map_write_err)?;
        }

        let title = match out_type {
            OutputType::Lots => format!("Lots for {}", name),
            OutputType::Allocation => format!("Allocation for {}", name),
            OutputType::Summary => format!("{} Summary", name),
        };
        writeln!(self.w, "{}", title).map_err(map_write_err)?;

        if table_model.rows.is_empty() && table_model.footer.is_empty() {
            writeln!(self.w, "(none)").map_err(map_write_err)?;
        } else {
            writeln!(self.w, "{}", render_text_table(table_model)).map_err(map_write_err)?;
        }

        for note in &table_model.notes {
            writeln!(self.w, "{note}").map_err(map_write_err)?;
        }
        writeln!(self.w).map_err(map_write_err)?;
        Ok(())
    }
}
