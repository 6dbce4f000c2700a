use annotator_core::{Epoch, Msg, Sentiment};
use engine_logging::{engine_debug, engine_warn};

use crate::discovery::{Card, SENTIMENT_ATTR};
use crate::dom::{Document, NodeId};
use crate::engine::Overlay;
use crate::render::{self, CARD_ROW_CLASS};
use crate::ScoreOutcome;

/// Annotates one claimed grouping.
///
/// The placeholder is inserted before this returns; the fetch and the final
/// render run on a detached task that turns every outcome, including a
/// timeout, into a rendered state and one progress settlement.
pub(crate) fn annotate(overlay: &Overlay, card: Card, epoch: Epoch) {
    let row = insert_placeholder(&mut overlay.lock_document(), card.element);
    let Some(row) = row else {
        engine_warn!("grouping for subject {} vanished before annotation", card.subject_id);
        return;
    };

    let overlay = overlay.clone();
    tokio::spawn(async move {
        let outcome = overlay.await_score(&card.subject_id).await;
        settle(&overlay, &card, row, epoch, &outcome);
    });
}

fn insert_placeholder(document: &mut Document, grouping: NodeId) -> Option<NodeId> {
    // A grouping re-claimed in a newer epoch still holds its previous row,
    // sentiment and visibility. Loading groupings carry none of them.
    while let Some(stale) = document.find_by_class(grouping, CARD_ROW_CLASS) {
        document.remove(stale);
    }
    document.remove_attr(grouping, SENTIMENT_ATTR);
    document.set_style(grouping, "display", None);
    document.append(grouping, render::card_placeholder())
}

fn settle(overlay: &Overlay, card: &Card, row: NodeId, epoch: Epoch, outcome: &ScoreOutcome) {
    let sentiment = match outcome {
        Ok(result) => result.sentiment(),
        Err(err) => {
            engine_warn!("scores for subject {} unavailable: {}", card.subject_id, err);
            Sentiment::Unscored
        }
    };

    {
        let mut document = overlay.lock_document();
        if document.is_connected(row) {
            document.set_attr(card.element, SENTIMENT_ATTR, sentiment.as_str());
            document.replace_children(row, render::card_scores(outcome));
            engine_debug!("subject {} settled as {}", card.subject_id, sentiment);
        } else {
            engine_debug!("discarding result for detached subject {}", card.subject_id);
        }
    }

    overlay.dispatch(Msg::ScoreSettled { epoch });
}
