use crate::view_model::ProgressView;

/// Done/total counters for one session.
///
/// Both counters only grow and `done <= total` always holds. `generation`
/// moves whenever new work is added so a pending "settled" decoration taken
/// at an older generation can be recognised as outdated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressState {
    done: usize,
    total: usize,
    generation: u64,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn add_to_total(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.total += count;
        self.generation += 1;
    }

    /// Records one settlement. Returns `false` (and changes nothing) when
    /// every counted element has already settled.
    pub fn increment_done(&mut self) -> bool {
        if self.done >= self.total {
            return false;
        }
        self.done += 1;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f64 * 100.0 / self.total as f64
        }
    }

    pub fn view(&self) -> ProgressView {
        let complete = self.is_complete();
        let text = if complete {
            format!("{} issues scored", self.total)
        } else {
            format!("Scoring {}/{}", self.done, self.total)
        };
        ProgressView {
            done: self.done,
            total: self.total,
            percent: self.percent(),
            text,
            complete,
        }
    }
}
