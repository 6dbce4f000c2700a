//! Annotator core: pure session state machine and view-model helpers.
mod effect;
mod filter;
mod msg;
mod progress;
mod route;
mod sentiment;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use filter::FilterState;
pub use msg::Msg;
pub use progress::ProgressState;
pub use route::{Route, RoutePattern, DEFAULT_LISTING_INFIX, DEFAULT_SUBJECT_MARKER};
pub use sentiment::{Sentiment, UnknownSentiment};
pub use state::{Epoch, SessionState};
pub use update::update;
pub use view_model::{ProgressView, SessionView};
