//! Single-target overlay: a dismissible banner for the subject named by the
//! current URL. Shares the cache with the listing view but nothing else.

use engine_logging::{engine_debug, engine_info};

use crate::dom::Document;
use crate::engine::Overlay;
use crate::render::{self, BANNER_SCORES_CLASS};
use crate::{OverlayConfig, SubjectId};

pub(crate) fn show(overlay: &Overlay, subject_id: SubjectId) {
    let config = overlay.config();
    let banner = {
        let mut document = overlay.lock_document();
        teardown(&mut document, config);
        let body = document.body();
        let banner = document.prepend(body, render::banner(&config.contract.banner_id));
        if banner.is_some() {
            let margin = format!("{}px", config.banner_height_px);
            document.set_style(body, "margin-top", Some(margin.as_str()));
        }
        banner
    };
    let Some(banner) = banner else {
        return;
    };
    engine_info!("showing banner for subject {}", subject_id);

    let overlay = overlay.clone();
    tokio::spawn(async move {
        let outcome = overlay.await_score(&subject_id).await;
        let mut document = overlay.lock_document();
        if !document.is_connected(banner) {
            engine_debug!("banner for subject {} closed before its scores arrived", subject_id);
            return;
        }
        if let Some(scores) = document.find_by_class(banner, BANNER_SCORES_CLASS) {
            document.replace_children(scores, render::banner_scores(&outcome));
        }
    });
}

/// Removes the banner, if any, and restores the body spacing.
pub(crate) fn teardown(document: &mut Document, config: &OverlayConfig) {
    let Some(banner) = document.get_element_by_id(&config.contract.banner_id) else {
        return;
    };
    document.remove(banner);
    let body = document.body();
    document.set_style(body, "margin-top", None);
}
