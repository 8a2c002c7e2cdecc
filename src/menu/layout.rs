//! # Layout Engine
//!
//! Turns the fields of the visible rows into fixed-width text lines.
//!
//! ```text
//! gpu_1x_a100     us-east-1        $1.29/hr
//! gpu_8x_h100     europe-central-1 $23.92/hr
//! ```
//!
//! Columns are sized to their widest visible cell. Whatever space is left on
//! the line is shared equally between the gaps after every column but the
//! last, and the last column is right-aligned so prices and statuses line up
//! against the right edge.
//!
//! All widths are terminal cells, not `char`s: East Asian wide characters
//! and most emoji take two cells, combining marks none.

use unicode_width::UnicodeWidthChar;

/// Cells kept free on each line: one blank before and one after the text.
pub const PADDING: usize = 2;

const TAB_STOP: usize = 8;

/// Cells `c` occupies once drawn. Control characters are drawn as a blank.
pub fn char_width(c: char) -> usize {
    if c.is_control() {
        1
    } else {
        UnicodeWidthChar::width(c).unwrap_or(0)
    }
}

/// Cells `text` occupies once drawn, before tab expansion.
pub fn cell_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Printable cells available for row text on a terminal `width` cells wide.
pub fn text_width(width: usize) -> usize {
    width.saturating_sub(PADDING)
}

/// Lay out rows of fields into one line per row for a terminal `width` wide.
///
/// Rows with fewer fields than the widest row are treated as having empty
/// trailing cells, so the last column is the same for every line.
pub fn stretch(rows: &[Vec<String>], width: usize) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return vec![String::new(); rows.len()];
    }

    let mut widths = vec![0usize; columns];
    for row in rows {
        for (j, field) in row.iter().enumerate() {
            widths[j] = widths[j].max(cell_width(field));
        }
    }

    let used: usize = widths.iter().sum();
    let remaining = text_width(width).saturating_sub(used);
    let gap = if columns > 1 {
        remaining / (columns - 1)
    } else {
        0
    };

    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for (j, &w) in widths.iter().enumerate() {
                let field = row.get(j).map_or("", String::as_str);
                let pad = w.saturating_sub(cell_width(field));
                if j + 1 == columns {
                    push_blanks(&mut line, pad);
                    line.push_str(field);
                } else {
                    line.push_str(field);
                    push_blanks(&mut line, pad + gap);
                }
            }
            line
        })
        .collect()
}

fn push_blanks(line: &mut String, count: usize) {
    line.extend(std::iter::repeat(' ').take(count));
}

/// Truncate or pad `text` to exactly `cells` printable cells.
///
/// Tabs advance to the next multiple-of-eight column. Other control
/// characters would move the terminal cursor and are shown as blanks. A wide
/// character that would straddle the last cell is dropped and the line
/// padded instead.
pub fn fit(text: &str, cells: usize) -> String {
    let mut out = String::with_capacity(cells);
    let mut column = 0;

    for c in text.chars() {
        if c == '\t' {
            if column >= cells {
                break;
            }
            let stop = ((column / TAB_STOP + 1) * TAB_STOP).min(cells);
            push_blanks(&mut out, stop - column);
            column = stop;
            continue;
        }

        let w = char_width(c);
        if column + w > cells {
            break;
        }
        if c.is_control() {
            out.push(' ');
        } else {
            out.push(c);
        }
        column += w;
    }

    push_blanks(&mut out, cells - column);
    out
}
