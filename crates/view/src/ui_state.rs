use chamber_runtime_config::ToolCallExpansion;
use std::collections::{BTreeSet, HashMap};

/// Per-turn presentation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnUiState {
    pub is_expanded: bool,
    pub previewed_part_ids: BTreeSet<String>,
}

/// Expand/collapse and preview bookkeeping, keyed by turn id.
///
/// Entries are created on first read with an expansion derived from the
/// density the store was built with. They are independent of turn content.
#[derive(Debug, Clone)]
pub struct TurnUiStore {
    density: ToolCallExpansion,
    states: HashMap<String, TurnUiState>,
}

impl TurnUiStore {
    pub fn new(density: ToolCallExpansion) -> Self {
        Self {
            density,
            states: HashMap::new(),
        }
    }

    fn fresh(&self) -> TurnUiState {
        TurnUiState {
            is_expanded: self.density.expands_by_default(),
            previewed_part_ids: BTreeSet::new(),
        }
    }

    pub fn get(&mut self, turn_id: &str) -> &TurnUiState {
        self.entry(turn_id)
    }

    /// Read without creating an entry.
    pub fn peek(&self, turn_id: &str) -> Option<&TurnUiState> {
        self.states.get(turn_id)
    }

    pub fn is_expanded(&self, turn_id: &str) -> bool {
        self.peek(turn_id)
            .map_or_else(|| self.density.expands_by_default(), |s| s.is_expanded)
    }

    /// Flip expansion; returns the new value.
    pub fn toggle(&mut self, turn_id: &str) -> bool {
        let state = self.entry(turn_id);
        state.is_expanded = !state.is_expanded;
        state.is_expanded
    }

    pub fn mark_previewed<I, S>(&mut self, turn_id: &str, part_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut part_ids = part_ids.into_iter().peekable();
        if part_ids.peek().is_none() {
            return;
        }
        self.entry(turn_id).previewed_part_ids.extend(part_ids.map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn entry(&mut self, turn_id: &str) -> &mut TurnUiState {
        let fresh = self.fresh();
        self.states.entry(turn_id.to_string()).or_insert(fresh)
    }
}
