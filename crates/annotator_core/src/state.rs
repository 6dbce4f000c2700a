use url::Url;

use crate::view_model::SessionView;
use crate::{FilterState, ProgressState, Route, RoutePattern};

/// Generation number of a navigation session. Starts at 1 on script start.
pub type Epoch = u64;

/// Everything that is scoped to one navigation session.
///
/// The result cache deliberately lives elsewhere: it outlives sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    routes: RoutePattern,
    epoch: Epoch,
    location: Option<Url>,
    progress: ProgressState,
    filters: FilterState,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(RoutePattern::default())
    }
}

impl SessionState {
    pub fn new(routes: RoutePattern) -> Self {
        Self {
            routes,
            epoch: 1,
            location: None,
            progress: ProgressState::new(),
            filters: FilterState::default(),
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    pub fn routes(&self) -> &RoutePattern {
        &self.routes
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn filters(&self) -> FilterState {
        self.filters
    }

    /// Route of the last observed location; empty before the first observation.
    pub fn route(&self) -> Route {
        self.location
            .as_ref()
            .map(|location| self.routes.classify(location))
            .unwrap_or_default()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            epoch: self.epoch,
            progress: self.progress.view(),
            filters: self.filters,
        }
    }

    pub(crate) fn observe_location(&mut self, location: Url) {
        self.location = Some(location);
    }

    /// Starts a fresh session for `location`: new epoch, empty progress,
    /// all filters visible.
    pub(crate) fn begin_epoch(&mut self, location: Url) {
        self.epoch += 1;
        self.location = Some(location);
        self.progress = ProgressState::new();
        self.filters = FilterState::default();
    }

    pub(crate) fn progress_mut(&mut self) -> &mut ProgressState {
        &mut self.progress
    }

    pub(crate) fn filters_mut(&mut self) -> &mut FilterState {
        &mut self.filters
    }
}
