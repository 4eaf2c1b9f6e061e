use crate::models::{BeverageType, TastingEntry};

/// Type filter offered by the list view.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TypeFilter {
    All,
    Only(BeverageType),
}

impl TypeFilter {
    /// Cycle All -> Wine -> Whisky -> All.
    pub(crate) fn next(self) -> Self {
        match self {
            TypeFilter::All => TypeFilter::Only(BeverageType::Wine),
            TypeFilter::Only(BeverageType::Wine) => TypeFilter::Only(BeverageType::Whisky),
            TypeFilter::Only(BeverageType::Whisky) => TypeFilter::All,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            TypeFilter::All => "All Tastings",
            TypeFilter::Only(BeverageType::Wine) => "Wine Only",
            TypeFilter::Only(BeverageType::Whisky) => "Whisky Only",
        }
    }
}

/// Journal list with the current filter and selection.
pub(crate) struct ListScreen {
    pub(crate) entries: Vec<TastingEntry>,
    pub(crate) filter: TypeFilter,
    pub(crate) selected: usize,
}

impl ListScreen {
    pub(crate) fn new(entries: Vec<TastingEntry>) -> Self {
        let mut screen = Self {
            entries,
            filter: TypeFilter::All,
            selected: 0,
        };
        screen.ensure_in_bounds();
        screen
    }

    pub(crate) fn current(&self) -> Option<&TastingEntry> {
        self.entries.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.entries.is_empty() {
            return;
        }
        let len = self.entries.len() as isize;
        let new = (self.selected as isize + offset).clamp(0, len - 1);
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.entries.len().saturating_sub(1);
    }

    /// Replace the entries, keeping focus on `focus_id` when it is still
    /// listed.
    pub(crate) fn set_entries(&mut self, entries: Vec<TastingEntry>, focus_id: Option<&str>) {
        self.entries = entries;
        if let Some(id) = focus_id {
            if let Some(idx) = self.entries.iter().position(|entry| entry.id == id) {
                self.selected = idx;
                return;
            }
        }
        self.ensure_in_bounds();
    }

    pub(crate) fn ensure_in_bounds(&mut self) {
        if self.entries.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.entries.len() {
            self.selected = self.entries.len() - 1;
        }
    }
}

/// Read-only view of a single entry.
pub(crate) struct DetailScreen {
    pub(crate) entry: TastingEntry,
    pub(crate) scroll: u16,
}

impl DetailScreen {
    pub(crate) fn new(entry: TastingEntry) -> Self {
        Self { entry, scroll: 0 }
    }

    pub(crate) fn scroll_by(&mut self, delta: i32) {
        let next = (self.scroll as i32 + delta).max(0);
        self.scroll = next.min(u16::MAX as i32) as u16;
    }
}
