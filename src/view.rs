//! Layout of a document into blocks of columns.
//!
//! With wrapping on, the shown columns are cut into blocks of
//! [`ViewSettings::columns`] entries. Each block is drawn as a two line ruler
//! followed by one row per sequence, and blocks are separated by an empty
//! line. Without wrapping all shown columns form a single block.
//!
//! Hidden columns are left out unless [`ViewSettings::show_hidden`] is set.
//! Ruler numbers always refer to document columns, so a jump in the numbering
//! shows where columns were left out.

use crate::document::Document;
use crate::ui::glyphs::Glyphs;

/// Columns per block when wrapping.
pub const DEFAULT_COLUMNS: usize = 50;

/// Width of the name column in text output.
pub const NAME_WIDTH: usize = 16;

/// How a document is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    /// Cut rows into blocks of `columns`
    pub wrap: bool,
    /// Columns per block (values below 1 count as 1)
    pub columns: usize,
    /// Draw hidden columns too
    pub show_hidden: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            wrap: true,
            columns: DEFAULT_COLUMNS,
            show_hidden: false,
        }
    }
}

impl ViewSettings {
    /// Document columns that are drawn, in order.
    pub fn shown_columns(&self, document: &Document) -> Vec<usize> {
        (0..document.width())
            .filter(|col| self.show_hidden || !document.is_hidden(*col))
            .collect()
    }
}

/// What a line of the layout shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Column numbers
    Numbers,
    /// Tick marks
    Ticks,
    /// Letters of the sequence with this index
    Letters(usize),
    /// Empty line between blocks
    Spacer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutLine {
    pub block: usize,
    pub kind: LineKind,
}

/// Blocks of shown columns and the lines that draw them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Document columns of each block, ascending
    pub blocks: Vec<Vec<usize>>,
    pub lines: Vec<LayoutLine>,
}

impl Layout {
    pub fn new(document: &Document, settings: &ViewSettings) -> Self {
        let shown = settings.shown_columns(document);
        let mut blocks: Vec<Vec<usize>> = if settings.wrap {
            shown.chunks(settings.columns.max(1)).map(<[usize]>::to_vec).collect()
        } else {
            vec![shown]
        };
        blocks.retain(|b| !b.is_empty());
        // keep the names visible even when nothing else is
        if blocks.is_empty() && !document.is_empty() {
            blocks.push(Vec::new());
        }

        let mut lines = Vec::with_capacity(blocks.len() * (document.sequence_count() + 3));
        for block in 0..blocks.len() {
            if block > 0 {
                lines.push(LayoutLine {
                    block,
                    kind: LineKind::Spacer,
                });
            }
            lines.push(LayoutLine {
                block,
                kind: LineKind::Numbers,
            });
            lines.push(LayoutLine {
                block,
                kind: LineKind::Ticks,
            });
            for row in 0..document.sequence_count() {
                lines.push(LayoutLine {
                    block,
                    kind: LineKind::Letters(row),
                });
            }
        }

        Self { blocks, lines }
    }

    /// Block index and offset within the block of a document column.
    pub fn locate(&self, column: usize) -> Option<(usize, usize)> {
        self.blocks
            .iter()
            .enumerate()
            .find_map(|(b, cols)| cols.binary_search(&column).ok().map(|i| (b, i)))
    }

    /// Index of the line showing sequence `row` in `block`.
    pub fn letters_line(&self, block: usize, row: usize) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.block == block && l.kind == LineKind::Letters(row))
    }

    /// All shown columns in display order.
    pub fn shown_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().flatten().copied()
    }

    /// Widest block, in columns.
    pub fn max_block_width(&self) -> usize {
        self.blocks.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Column numbers of a block, each ending above the tick of its column.
///
/// A number that would overlap the previous one is left out.
pub fn ruler_numbers(columns: &[usize]) -> String {
    let mut cells = vec![' '; columns.len()];
    let mut free_from = 0;
    for (i, &col) in columns.iter().enumerate() {
        let number = col + 1;
        if number % 10 != 0 {
            continue;
        }
        let digits = number.to_string();
        if digits.len() > i + 1 || i + 1 - digits.len() < free_from {
            continue;
        }
        let start = i + 1 - digits.len();
        for (k, d) in digits.chars().enumerate() {
            cells[start + k] = d;
        }
        free_from = i + 1;
    }
    cells.into_iter().collect()
}

/// Tick marks of a block: a tick at every tenth column, a dot elsewhere.
pub fn ruler_ticks(document: &Document, columns: &[usize], glyphs: &Glyphs) -> String {
    columns
        .iter()
        .map(|&col| {
            if document.is_hidden(col) {
                glyphs.ruler_hidden
            } else if (col + 1) % 10 == 0 {
                glyphs.ruler_tick
            } else {
                glyphs.ruler_dot
            }
        })
        .collect()
}

/// Letters of a sequence at the given columns; blank past its end.
pub fn row_letters(document: &Document, row: usize, columns: &[usize]) -> String {
    let Some(sequence) = document.sequences().get(row) else {
        return String::new();
    };
    columns
        .iter()
        .map(|&col| sequence.char_at(col).unwrap_or(' '))
        .collect()
}

/// Shortens `name` to `width` characters, marking the cut with `ellipsis`.
pub fn short_name(name: &str, width: usize, ellipsis: &str) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let keep = width.saturating_sub(ellipsis.chars().count());
    let mut short: String = name.chars().take(keep).collect();
    short.push_str(ellipsis);
    short
}

/// Renders the layout as plain text, names right-aligned in front of the rows.
pub fn render_text(document: &Document, settings: &ViewSettings, glyphs: &Glyphs) -> String {
    let layout = Layout::new(document, settings);
    let mut out = String::new();

    for line in &layout.lines {
        let columns = &layout.blocks[line.block];
        let text = match line.kind {
            LineKind::Numbers => format!("{:>w$} {}", "", ruler_numbers(columns), w = NAME_WIDTH),
            LineKind::Ticks => format!(
                "{:>w$} {}",
                "",
                ruler_ticks(document, columns, glyphs),
                w = NAME_WIDTH
            ),
            LineKind::Letters(row) => {
                let name = document.sequences().get(row).map(|s| s.name()).unwrap_or("");
                format!(
                    "{:>w$} {}",
                    short_name(name, NAME_WIDTH, glyphs.ellipsis),
                    row_letters(document, row, columns),
                    w = NAME_WIDTH
                )
            }
            LineKind::Spacer => String::new(),
        };
        out.push_str(text.trim_end());
        out.push('\n');
    }

    out
}
