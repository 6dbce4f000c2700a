use url::Url;

use crate::{Epoch, Sentiment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Script start: first look at the host location.
    Started { location: Url },
    /// A batch of child-list mutation notifications was observed; `location`
    /// is the host location at the time the batch was handled.
    DocumentMutated { location: Url },
    /// A discovery pass claimed `count` new groupings.
    CardsDiscovered { epoch: Epoch, count: usize },
    /// One element's fetch settled, successfully or not.
    ScoreSettled { epoch: Epoch },
    /// The completion delay scheduled at `generation` has elapsed.
    SettleDelayElapsed { epoch: Epoch, generation: u64 },
    /// User clicked a filter button.
    FilterToggled(Sentiment),
    /// User clicked the banner's close button.
    BannerDismissed,
}
