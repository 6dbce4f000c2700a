use crate::{Epoch, FilterState};

/// Render-ready snapshot of the progress indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub done: usize,
    pub total: usize,
    /// Fill width in percent, `0.0..=100.0`.
    pub percent: f64,
    pub text: String,
    pub complete: bool,
}

impl ProgressView {
    pub fn fill_width(&self) -> String {
        format!("{}%", self.percent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub epoch: Epoch,
    pub progress: ProgressView,
    pub filters: FilterState,
}
