use annotator_core::ProgressView;

use crate::dom::{Document, NodeId};
use crate::render::{
    progress_indicator, PROGRESS_CLASS, PROGRESS_FILL_CLASS, PROGRESS_SETTLED_CLASS,
    PROGRESS_TEXT_CLASS,
};

/// Finds or creates the indicator at the top of `panel` and takes it out of
/// its settled state.
pub(crate) fn resume(document: &mut Document, panel: NodeId) -> Option<NodeId> {
    let indicator = match document.find_by_class(panel, PROGRESS_CLASS) {
        Some(existing) => existing,
        None => document.prepend(panel, progress_indicator())?,
    };
    document.remove_class(indicator, PROGRESS_SETTLED_CLASS);
    Some(indicator)
}

pub(crate) fn render(document: &mut Document, indicator: NodeId, view: &ProgressView) {
    if let Some(fill) = document.find_by_class(indicator, PROGRESS_FILL_CLASS) {
        document.set_style(fill, "width", Some(view.fill_width().as_str()));
    }
    if let Some(text) = document.find_by_class(indicator, PROGRESS_TEXT_CLASS) {
        if document.text_content(text) != view.text {
            document.update_text(text, &view.text);
        }
    }
}

pub(crate) fn mark_settled(document: &mut Document, indicator: NodeId) {
    document.add_class(indicator, PROGRESS_SETTLED_CLASS);
}
