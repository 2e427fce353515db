/// Aggregated view of survey progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionProgress {
    pub answered: usize,
    pub skipped: usize,
    pub is_finished: bool,
}

impl SessionProgress {
    /// Questions handled so far, answered or skipped.
    #[must_use]
    pub fn handled(&self) -> usize {
        self.answered + self.skipped
    }
}
