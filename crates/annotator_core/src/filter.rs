use crate::Sentiment;

/// Which sentiment categories are currently shown. All visible by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    pub positive: bool,
    pub negative: bool,
    pub unscored: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            positive: true,
            negative: true,
            unscored: true,
        }
    }
}

impl FilterState {
    pub fn is_visible(&self, sentiment: Sentiment) -> bool {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Unscored => self.unscored,
        }
    }

    /// Flips one category and returns its new visibility.
    pub fn toggle(&mut self, sentiment: Sentiment) -> bool {
        let slot = match sentiment {
            Sentiment::Positive => &mut self.positive,
            Sentiment::Negative => &mut self.negative,
            Sentiment::Unscored => &mut self.unscored,
        };
        *slot = !*slot;
        *slot
    }

    pub fn hides_anything(&self) -> bool {
        Sentiment::ALL.iter().any(|s| !self.is_visible(*s))
    }
}
