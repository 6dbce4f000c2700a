use annotator_core::Epoch;

use crate::dom::{Document, NodeId};
use crate::{HostContract, SubjectId};

/// Set on every claimed grouping; the value is the claiming epoch.
pub const PROCESSED_ATTR: &str = "data-scfs-processed";
/// Derived sentiment of a grouping once its fetch settled.
pub const SENTIMENT_ATTR: &str = "data-scfs-sentiment";

/// A grouping claimed for annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub element: NodeId,
    pub subject_id: SubjectId,
}

/// Finds groupings not yet claimed in `epoch` and claims them.
///
/// Claiming happens before returning, so overlapping passes never yield the
/// same grouping twice. Groupings whose link carries no subject id are left
/// unmarked and reconsidered on later passes.
pub fn scan(document: &mut Document, contract: &HostContract, epoch: Epoch) -> Vec<Card> {
    let link_marker = contract.routes.listing_link_marker();
    let mark = epoch.to_string();
    let links = document.descendants_where(document.root(), |el| {
        el.tag() == "a" && el.attr("href").is_some_and(|href| href.contains(&link_marker))
    });

    let mut cards = Vec::new();
    for link in links {
        let Some(grouping) = document.closest(link, &contract.grouping_tag) else {
            continue;
        };
        if document.attr(grouping, PROCESSED_ATTR) == Some(mark.as_str()) {
            continue;
        }
        let Some(subject_id) = document
            .attr(link, "href")
            .and_then(|href| contract.routes.extract_subject_id(href))
            .map(str::to_owned)
        else {
            continue;
        };
        document.set_attr(grouping, PROCESSED_ATTR, &mark);
        cards.push(Card {
            element: grouping,
            subject_id,
        });
    }
    cards
}
