//! Plain-text table rendering for the results report.
//!
//! Columns are sized to their widest cell; selected columns can carry a
//! vertical separator and selected rows a horizontal rule, which is how the
//! report groups the source / change / result column blocks.

use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

#[derive(Clone)]
struct Cell {
    text: String,
    align: Align,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            text: String::new(),
            align: Align::Left,
        }
    }
}

pub struct Table {
    columns: usize,
    rows: Vec<Vec<Cell>>,
    rules_after: BTreeSet<usize>,
    bars_before: BTreeSet<usize>,
}

impl Table {
    pub fn new(columns: usize) -> Self {
        Table {
            columns,
            rows: Vec::new(),
            rules_after: BTreeSet::new(),
            bars_before: BTreeSet::new(),
        }
    }

    /// Append an empty row and return its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(vec![Cell::default(); self.columns]);
        self.rows.len() - 1
    }

    pub fn set(&mut self, row: usize, col: usize, text: impl Into<String>, align: Align) {
        self.rows[row][col] = Cell {
            text: text.into(),
            align,
        };
    }

    /// Draw a horizontal rule under `row`.
    pub fn rule_after(&mut self, row: usize) {
        self.rules_after.insert(row);
    }

    /// Draw a vertical separator to the left of `col`.
    pub fn bar_before(&mut self, col: usize) {
        self.bars_before.insert(col);
    }

    pub fn render(&self) -> String {
        let mut widths = vec![0usize; self.columns];
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.text.chars().count());
            }
        }

        let mut out = String::new();
        self.push_rule(&widths, &mut out);
        for (index, row) in self.rows.iter().enumerate() {
            for (col, (width, cell)) in widths.iter().zip(row).enumerate() {
                if col == 0 || self.bars_before.contains(&col) {
                    out.push('|');
                }
                out.push(' ');
                let pad = width - cell.text.chars().count();
                let (left, right) = match cell.align {
                    Align::Left => (0, pad),
                    Align::Right => (pad, 0),
                    Align::Center => (pad / 2, pad - pad / 2),
                };
                for _ in 0..left {
                    out.push(' ');
                }
                out.push_str(&cell.text);
                for _ in 0..right {
                    out.push(' ');
                }
                out.push(' ');
            }
            out.push('|');
            out.push('\n');
            if self.rules_after.contains(&index) {
                self.push_rule(&widths, &mut out);
            }
        }
        self.push_rule(&widths, &mut out);
        out
    }

    fn push_rule(&self, widths: &[usize], out: &mut String) {
        for (col, width) in widths.iter().enumerate() {
            out.push(if col == 0 || self.bars_before.contains(&col) {
                '+'
            } else {
                '-'
            });
            for _ in 0..width + 2 {
                out.push('-');
            }
        }
        out.push_str("+\n");
    }
}
