use store::SaveError;

/// Outcome of one [`Indexer::index_all`](crate::Indexer::index_all) run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexReport {
    /// Ids passed in, duplicates included.
    pub requested: usize,
    /// Distinct ids handed to the worker pool.
    pub scheduled: usize,
    pub encoded: usize,
    /// Distinct ids skipped because the store already held them.
    pub skipped_existing: usize,
    /// Fetch or encode failures. The ids stay unindexed.
    pub failed: usize,
    /// Scheduled ids that never completed because the run was cancelled.
    pub cancelled: usize,
    /// Result of the single save.
    ///
    /// A call that schedules at least one id saves exactly once. A call
    /// where every id was a duplicate or already indexed (or no ids were
    /// passed) leaves the store untouched and reports `None` here, since
    /// there is nothing new to persist.
    pub saved: Option<Result<usize, SaveError>>,
}

impl IndexReport {
    pub fn save_succeeded(&self) -> bool {
        matches!(self.saved, Some(Ok(_)))
    }
}
