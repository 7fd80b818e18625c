//! Glyph sets for the ruler and truncated names.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyphs {
    /// Ruler mark of an ordinary column
    pub ruler_dot: char,
    /// Ruler mark of every tenth column
    pub ruler_tick: char,
    /// Ruler mark of a hidden column (when hidden columns are shown)
    pub ruler_hidden: char,
    /// Appended to names that had to be shortened
    pub ellipsis: &'static str,
}

pub fn select(fancy_requested: bool) -> Glyphs {
    if fancy_requested {
        fancy()
    } else {
        ascii()
    }
}

fn ascii() -> Glyphs {
    Glyphs {
        ruler_dot: '.',
        ruler_tick: '|',
        ruler_hidden: '#',
        ellipsis: "...",
    }
}

fn fancy() -> Glyphs {
    Glyphs {
        ruler_dot: '∙',
        ruler_tick: '│',
        ruler_hidden: '░',
        ellipsis: "…",
    }
}

impl Default for Glyphs {
    fn default() -> Self {
        ascii()
    }
}
