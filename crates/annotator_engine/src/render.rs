//! Markup the overlay injects into the host page.

use annotator_core::Sentiment;

use crate::dom::Fragment;
use crate::{Score, ScoreOutcome};

pub const LOADING_TEXT: &str = "Loading scores…";

pub const CARD_ROW_CLASS: &str = "scfs-card-scores";
pub const CARD_LOADING_CLASS: &str = "scfs-card-loading";
pub const CARD_MESSAGE_CLASS: &str = "scfs-card-error";
pub const CARD_BADGE_CLASS: &str = "scfs-card-badge-wrap";
pub const CARD_UNAVAILABLE: &str = "Score unavailable";
pub const CARD_TIMED_OUT: &str = "Score timed out";
pub const CARD_NO_DATA: &str = "No scores";

pub const BANNER_SCORES_CLASS: &str = "scfs-scores";
pub const BANNER_CLOSE_CLASS: &str = "scfs-close";
pub const BANNER_MESSAGE_CLASS: &str = "scfs-error";
pub const BANNER_NO_DATA: &str = "No scores available for this issue.";

pub const PROGRESS_CLASS: &str = "scfs-progress";
pub const PROGRESS_FILL_CLASS: &str = "scfs-progress-fill";
pub const PROGRESS_TEXT_CLASS: &str = "scfs-progress-text";
pub const PROGRESS_SETTLED_CLASS: &str = "scfs-progress-done";

pub const FILTER_BAR_CLASS: &str = "scfs-filters";
pub const FILTER_BUTTON_CLASS: &str = "scfs-filter-btn";
pub const FILTER_ACTIVE_CLASS: &str = "active";

pub fn card_placeholder() -> Fragment {
    Fragment::element("div").class(CARD_ROW_CLASS).child(
        Fragment::element("span")
            .class(CARD_LOADING_CLASS)
            .child(Fragment::text(LOADING_TEXT)),
    )
}

/// Contents of a card row once its fetch settled.
pub fn card_scores(outcome: &ScoreOutcome) -> Vec<Fragment> {
    let message = match outcome {
        Err(err) if err.is_timeout() => CARD_TIMED_OUT,
        Err(_) => CARD_UNAVAILABLE,
        Ok(result) if !result.has_data() => CARD_NO_DATA,
        Ok(result) => {
            return result
                .sub_scores()
                .map(|(name, score)| inline_badge(name, score))
                .collect();
        }
    };
    vec![Fragment::element("span")
        .class(CARD_MESSAGE_CLASS)
        .child(Fragment::text(message))]
}

fn inline_badge(name: &str, score: &Score) -> Fragment {
    let label = score.label.as_str();
    Fragment::element("div")
        .class(CARD_BADGE_CLASS)
        .class(&format!("scfs-card-{label}"))
        .attr("title", score.reasoning.as_str())
        .child(
            Fragment::element("span")
                .class("scfs-card-label")
                .child(Fragment::text(name)),
        )
        .child(badge(label))
        .child(
            Fragment::element("span")
                .class("scfs-card-conf")
                .child(Fragment::text(format!("{}%", score.confidence_percent()))),
        )
}

fn badge(label: &str) -> Fragment {
    Fragment::element("span")
        .class("scfs-badge")
        .class(label)
        .child(Fragment::text(label))
}

pub fn banner(banner_id: &str) -> Fragment {
    Fragment::element("div")
        .id(banner_id)
        .child(
            Fragment::element("span")
                .class("scfs-title")
                .child(Fragment::text("SCFS Scores")),
        )
        .child(
            Fragment::element("div").class(BANNER_SCORES_CLASS).child(
                Fragment::element("span")
                    .class("scfs-loading")
                    .child(Fragment::text(LOADING_TEXT)),
            ),
        )
        .child(
            Fragment::element("button")
                .class(BANNER_CLOSE_CLASS)
                .attr("title", "Dismiss")
                .child(Fragment::text("×")),
        )
}

pub fn banner_scores(outcome: &ScoreOutcome) -> Vec<Fragment> {
    let message = match outcome {
        Err(err) => format!("Failed to load scores: {}", err.message),
        Ok(result) if !result.has_data() => BANNER_NO_DATA.to_string(),
        Ok(result) => {
            return result
                .sub_scores()
                .map(|(name, score)| banner_card(name, score))
                .collect();
        }
    };
    vec![Fragment::element("span")
        .class(BANNER_MESSAGE_CLASS)
        .child(Fragment::text(message))]
}

fn banner_card(name: &str, score: &Score) -> Fragment {
    Fragment::element("div")
        .class("scfs-score-card")
        .child(
            Fragment::element("span")
                .class("scfs-label")
                .child(Fragment::text(name)),
        )
        .child(badge(score.label.as_str()))
        .child(
            Fragment::element("span")
                .class("scfs-confidence")
                .child(Fragment::text(format!("{}%", score.confidence_percent()))),
        )
        .child(
            Fragment::element("div")
                .class("scfs-tooltip")
                .child(Fragment::text(score.reasoning.as_str())),
        )
}

pub fn progress_indicator() -> Fragment {
    Fragment::element("div")
        .class(PROGRESS_CLASS)
        .child(
            Fragment::element("div")
                .class("scfs-progress-bar")
                .child(Fragment::element("div").class(PROGRESS_FILL_CLASS)),
        )
        .child(Fragment::element("span").class(PROGRESS_TEXT_CLASS))
}

pub fn filter_button_class(category: Sentiment) -> String {
    format!("scfs-filter-{}", category.as_str())
}

pub fn filter_bar(is_active: impl Fn(Sentiment) -> bool) -> Fragment {
    let buttons = Sentiment::ALL.into_iter().map(|category| {
        let button = Fragment::element("button")
            .class(FILTER_BUTTON_CLASS)
            .class(&filter_button_class(category))
            .attr("data-filter", category.as_str())
            .child(Fragment::text(category.display_name()));
        if is_active(category) {
            button.class(FILTER_ACTIVE_CLASS)
        } else {
            button
        }
    });
    Fragment::element("div")
        .class(FILTER_BAR_CLASS)
        .child(
            Fragment::element("span")
                .class("scfs-filters-label")
                .child(Fragment::text("Filter:")),
        )
        .children(buttons)
}
