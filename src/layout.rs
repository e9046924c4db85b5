// Layout controller: visible set and grid arrangement derived from registry state.

use crate::registry::{EntryId, EntrySnapshot};

/// Viewport width class, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Breakpoint {
    Base,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// One entry expanded to a single full-size cell.
    Focus,
    /// All entries, up to `columns` per row on the widest viewport.
    Grid { columns: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub visible: Vec<EntryId>,
    pub arrangement: Arrangement,
}

impl Layout {
    pub fn is_focused(&self) -> bool {
        self.arrangement == Arrangement::Focus
    }

    /// Columns to render at the given breakpoint. Narrow viewports always
    /// stack; medium viewports never exceed two columns.
    pub fn columns_at(&self, breakpoint: Breakpoint) -> u8 {
        match (self.arrangement, breakpoint) {
            (Arrangement::Focus, _) | (_, Breakpoint::Base) => 1,
            (Arrangement::Grid { columns }, Breakpoint::Medium) => columns.min(2),
            (Arrangement::Grid { columns }, Breakpoint::Large) => columns,
        }
    }
}

/// Column count for an unfocused grid of `count` entries.
pub fn grid_columns(count: usize) -> u8 {
    match count {
        0 | 1 => 1,
        2..=4 => 2,
        _ => 3,
    }
}

pub fn arrange(entries: &[EntrySnapshot]) -> Layout {
    if let Some(focused) = entries.iter().find(|e| e.expanded) {
        return Layout {
            visible: vec![focused.id],
            arrangement: Arrangement::Focus,
        };
    }

    Layout {
        visible: entries.iter().map(|e| e.id).collect(),
        arrangement: Arrangement::Grid {
            columns: grid_columns(entries.len()),
        },
    }
}
