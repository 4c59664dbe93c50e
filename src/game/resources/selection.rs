//! Selection resource for tracking the selected square

use crate::game::types::BoardPos;

/// Currently selected square and its cached legal destinations
///
/// Only meaningful in play mode. Targets keep the oracle's order with
/// duplicates removed (the four promotion moves to one square collapse into
/// a single target).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected_position: Option<BoardPos>,
    pub legal_targets: Vec<BoardPos>,
}

impl Selection {
    /// Select `pos` with the given destinations
    pub fn set(&mut self, pos: BoardPos, targets: impl IntoIterator<Item = BoardPos>) {
        self.selected_position = Some(pos);
        self.legal_targets.clear();
        for target in targets {
            if !self.legal_targets.contains(&target) {
                self.legal_targets.push(target);
            }
        }
    }

    pub fn clear(&mut self) {
        self.selected_position = None;
        self.legal_targets.clear();
    }

    pub fn is_selected(&self) -> bool {
        self.selected_position.is_some()
    }

    /// Whether anything would be visibly removed by [`Selection::clear`]
    pub fn is_empty(&self) -> bool {
        self.selected_position.is_none() && self.legal_targets.is_empty()
    }

    pub fn is_target(&self, pos: BoardPos) -> bool {
        self.legal_targets.contains(&pos)
    }
}
