use crate::message::{ActivityRecord, ThinkingFragment};

/// Agent narration in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct ThinkingLog {
    fragments: Vec<ThinkingFragment>,
    visible: bool,
}

impl Default for ThinkingLog {
    fn default() -> Self {
        Self {
            fragments: Vec::new(),
            visible: true,
        }
    }
}

impl ThinkingLog {
    pub fn push(&mut self, fragment: ThinkingFragment) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[ThinkingFragment] {
        &self.fragments
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|f| f.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Display only; fragments keep accumulating while hidden.
    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Drops fragments for a new job. Visibility is a viewer preference and survives.
    pub fn clear(&mut self) {
        self.fragments.clear();
    }
}

/// Structured tool activity in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityLog {
    records: Vec<ActivityRecord>,
}

impl ActivityLog {
    pub fn push(&mut self, record: ActivityRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
