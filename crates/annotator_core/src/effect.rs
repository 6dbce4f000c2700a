use crate::{Epoch, FilterState, ProgressView, Sentiment};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Remove the single-target banner and restore body spacing.
    TeardownBanner,
    /// Drop per-session DOM references and unhide filtered groupings.
    ResetSession { epoch: Epoch },
    /// Render the banner for `subject_id` and fetch its scores.
    ShowBanner { subject_id: String },
    /// Run element discovery and annotate whatever it finds.
    ScanCards { epoch: Epoch },
    /// Make sure the progress indicator exists and is not in its settled state.
    ResumeProgress,
    RenderProgress(ProgressView),
    EnsureFilterBar(FilterState),
    ScheduleSettle { epoch: Epoch, generation: u64 },
    /// Decorate the indicator as settled if progress is still complete at
    /// `generation`.
    MarkProgressSettled { generation: u64 },
    SyncFilterButton { category: Sentiment, active: bool },
    ApplyFilters(FilterState),
    RemoveBanner,
}
