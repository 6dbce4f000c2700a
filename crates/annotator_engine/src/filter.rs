use annotator_core::{FilterState, Sentiment};

use crate::discovery::{PROCESSED_ATTR, SENTIMENT_ATTR};
use crate::dom::{Document, NodeId};
use crate::render::{
    filter_bar, filter_button_class, FILTER_ACTIVE_CLASS, FILTER_BAR_CLASS, PROGRESS_CLASS,
};

/// Injects the filter bar once per panel, right after the progress indicator.
/// A bar left over from an earlier session is reused and brought in line
/// with `filters`.
pub(crate) fn ensure_bar(
    document: &mut Document,
    panel: NodeId,
    filters: FilterState,
) -> Option<NodeId> {
    if let Some(existing) = document.find_by_class(panel, FILTER_BAR_CLASS) {
        sync_bar(document, existing, filters);
        return Some(existing);
    }
    let bar = filter_bar(|category| filters.is_visible(category));
    match document.find_by_class(panel, PROGRESS_CLASS) {
        Some(progress) => document.insert_after(progress, bar),
        None => document.prepend(panel, bar),
    }
}

pub(crate) fn sync_button(document: &mut Document, bar: NodeId, category: Sentiment, active: bool) {
    let class = filter_button_class(category);
    if let Some(button) = document.find_by_class(bar, &class) {
        document.toggle_class(button, FILTER_ACTIVE_CLASS, active);
    }
}

fn sync_bar(document: &mut Document, bar: NodeId, filters: FilterState) {
    for category in Sentiment::ALL {
        sync_button(document, bar, category, filters.is_visible(category));
    }
}

/// Brings every filter bar still in the page in line with `filters`, whether
/// or not the current session owns it.
pub(crate) fn sync_all_bars(document: &mut Document, filters: FilterState) {
    let bars = document.descendants_where(document.root(), |el| el.has_class(FILTER_BAR_CLASS));
    for bar in bars {
        sync_bar(document, bar, filters);
    }
}

/// Shows or hides every scored grouping under `panel`. Groupings still
/// loading carry no sentiment and stay visible.
pub(crate) fn apply(document: &mut Document, panel: NodeId, filters: FilterState) {
    let groupings = document.descendants_where(panel, |el| el.attr(PROCESSED_ATTR).is_some());
    for grouping in groupings {
        let Some(sentiment) = document
            .attr(grouping, SENTIMENT_ATTR)
            .and_then(|raw| raw.parse::<Sentiment>().ok())
        else {
            continue;
        };
        let display = (!filters.is_visible(sentiment)).then_some("none");
        document.set_style(grouping, "display", display);
    }
}

/// Makes every grouping visible again after the filters were reset.
pub(crate) fn reveal_all(document: &mut Document) {
    let hidden = document.descendants_where(document.root(), |el| {
        el.attr(PROCESSED_ATTR).is_some() && el.style("display") == Some("none")
    });
    for grouping in hidden {
        document.set_style(grouping, "display", None);
    }
}
