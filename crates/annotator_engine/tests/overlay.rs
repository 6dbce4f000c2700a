use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::time::Duration;

use annotator_core::Sentiment;
use annotator_engine::discovery::SENTIMENT_ATTR;
use annotator_engine::dom::lock_document;
use annotator_engine::render::{
    filter_button_class, BANNER_NO_DATA, CARD_ROW_CLASS, CARD_TIMED_OUT, CARD_UNAVAILABLE,
    FILTER_ACTIVE_CLASS, FILTER_BAR_CLASS, LOADING_TEXT, PROGRESS_CLASS, PROGRESS_SETTLED_CLASS,
    PROGRESS_TEXT_CLASS,
};
use annotator_engine::{
    Document, FailureKind, FetchError, Label, NodeId, Overlay, OverlayConfig, Score, ScoreFetcher,
    ScoreOutcome, ScoreResult, SharedDocument,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use url::Url;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(engine_logging::initialize_for_tests);
}

const LISTING: &str = "https://host.example/issues/map";

/// Answers from a fixed script after a simulated latency and records every call.
#[derive(Default)]
struct ScriptedFetcher {
    script: HashMap<String, (Duration, ScoreOutcome)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn respond(mut self, subject_id: &str, latency_ms: u64, outcome: ScoreOutcome) -> Self {
        self.script.insert(
            subject_id.to_string(),
            (Duration::from_millis(latency_ms), outcome),
        );
        self
    }

    fn calls_for(&self, subject_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == subject_id)
            .count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ScoreFetcher for ScriptedFetcher {
    async fn fetch_scores(&self, subject_id: &str) -> Result<ScoreResult, FetchError> {
        self.calls.lock().unwrap().push(subject_id.to_string());
        let (latency, outcome) = self
            .script
            .get(subject_id)
            .cloned()
            .unwrap_or((Duration::ZERO, Ok(ScoreResult::default())));
        tokio::time::sleep(latency).await;
        outcome
    }
}

fn scores(interaction: Option<&str>, outcome: Option<&str>) -> ScoreOutcome {
    let score = |label: &str| Score {
        label: Label::from(label.to_string()),
        confidence: 0.9,
        reasoning: format!("{label} because of the thread"),
    };
    Ok(ScoreResult {
        interaction: interaction.map(score),
        outcome: outcome.map(score),
    })
}

fn failure(status: u16) -> ScoreOutcome {
    Err(FetchError {
        kind: FailureKind::HttpStatus(status),
        message: status.to_string(),
    })
}

fn cards(ids: &[&str]) -> String {
    ids.iter()
        .map(|id| {
            format!(
                r#"<section id="card-{id}"><h3>Issue {id}</h3><a href="/issues/map/{id}">open</a></section>"#
            )
        })
        .collect()
}

fn listing(ids: &[&str]) -> String {
    format!(r#"<main><div id="panel">{}</div></main>"#, cards(ids))
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Host side of the page: loads markup and inspects what the overlay wrote.
struct Page {
    shared: SharedDocument,
}

impl Page {
    fn load(location: &str, body: &str) -> Self {
        let document = Document::parse(
            &format!("<html><body>{body}</body></html>"),
            Url::parse(location).unwrap(),
        );
        Self {
            shared: document.into_shared(),
        }
    }

    fn shared(&self) -> SharedDocument {
        Arc::clone(&self.shared)
    }

    fn doc(&self) -> MutexGuard<'_, Document> {
        lock_document(&self.shared)
    }

    fn node(&self, html_id: &str) -> NodeId {
        self.doc().get_element_by_id(html_id).unwrap()
    }

    /// Client-side route change followed by the host's own re-render.
    fn navigate(&self, location: &str, render: impl FnOnce(&mut Document)) {
        let mut doc = self.doc();
        doc.navigate(Url::parse(location).unwrap());
        render(&mut doc);
    }

    fn append_cards(&self, ids: &[&str]) {
        let mut doc = self.doc();
        let panel = doc.get_element_by_id("panel").unwrap();
        doc.append_html(panel, &cards(ids));
    }

    fn sentiment(&self, html_id: &str) -> Option<String> {
        let doc = self.doc();
        let node = doc.get_element_by_id(html_id)?;
        doc.attr(node, SENTIMENT_ATTR).map(str::to_owned)
    }

    fn is_hidden(&self, html_id: &str) -> bool {
        let node = self.node(html_id);
        self.doc().is_hidden(node)
    }

    fn row_text(&self, html_id: &str) -> String {
        let card = self.node(html_id);
        let doc = self.doc();
        let row = doc.find_by_class(card, CARD_ROW_CLASS).unwrap();
        doc.text_content(row)
    }

    fn count(&self, scope_id: &str, class: &str) -> usize {
        let scope = self.node(scope_id);
        self.doc()
            .descendants_where(scope, |el| el.has_class(class))
            .len()
    }

    fn progress_text(&self) -> Option<String> {
        let doc = self.doc();
        let text = doc.find_by_class(doc.root(), PROGRESS_TEXT_CLASS)?;
        Some(doc.text_content(text))
    }

    fn progress_settled(&self) -> bool {
        let doc = self.doc();
        doc.find_by_class(doc.root(), PROGRESS_CLASS)
            .is_some_and(|indicator| doc.has_class(indicator, PROGRESS_SETTLED_CLASS))
    }

    fn button_active(&self, category: Sentiment) -> bool {
        let doc = self.doc();
        let Some(bar) = doc.find_by_class(doc.root(), FILTER_BAR_CLASS) else {
            return false;
        };
        doc.find_by_class(bar, &filter_button_class(category))
            .is_some_and(|button| doc.has_class(button, FILTER_ACTIVE_CLASS))
    }

    fn banner(&self) -> Option<NodeId> {
        self.doc().get_element_by_id("scfs-banner")
    }

    fn banner_text(&self) -> Option<String> {
        let banner = self.banner()?;
        Some(self.doc().text_content(banner))
    }

    fn banner_count(&self) -> usize {
        let doc = self.doc();
        doc.descendants_where(doc.root(), |el| el.attr("id") == Some("scfs-banner"))
            .len()
    }

    fn body_margin(&self) -> Option<String> {
        let doc = self.doc();
        doc.style(doc.body(), "margin-top").map(str::to_owned)
    }
}

fn start(page: &Page, fetcher: &Arc<ScriptedFetcher>, config: OverlayConfig) -> Running {
    init_logging();
    let overlay = Overlay::with_fetcher(page.shared(), config, fetcher.clone());
    let cancel = CancellationToken::new();
    let handle = overlay.spawn(cancel.clone());
    Running {
        overlay,
        cancel,
        handle,
    }
}

struct Running {
    overlay: Overlay,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl Running {
    async fn stop(self) {
        self.cancel.cancel();
        self.handle.await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn listing_is_annotated_counted_and_filtered() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("101", 100, scores(Some("positive"), Some("positive")))
            .respond("102", 150, scores(Some("negative"), Some("neutral")))
            .respond("103", 50, failure(500)),
    );
    let page = Page::load(LISTING, &listing(&["101", "102", "103"]));
    let running = start(&page, &fetcher, OverlayConfig::default());
    let overlay = &running.overlay;

    assert_eq!(page.progress_text().as_deref(), Some("Scoring 0/3"));
    assert_eq!(page.row_text("card-101"), LOADING_TEXT);
    assert_eq!(page.count("panel", PROGRESS_CLASS), 1);
    assert_eq!(page.count("panel", FILTER_BAR_CLASS), 1);

    advance(60).await;
    assert_eq!(page.progress_text().as_deref(), Some("Scoring 1/3"));
    assert_eq!(page.row_text("card-103"), CARD_UNAVAILABLE);
    assert_eq!(page.sentiment("card-103").as_deref(), Some("unscored"));
    assert_eq!(page.sentiment("card-101"), None);

    advance(100).await;
    let progress = overlay.progress();
    assert_eq!(progress.text, "3 issues scored");
    assert!(progress.complete);
    assert!(!page.progress_settled());
    assert_eq!(page.sentiment("card-101").as_deref(), Some("positive"));
    assert_eq!(page.sentiment("card-102").as_deref(), Some("negative"));
    let row = page.row_text("card-101");
    assert!(row.contains("Interaction") && row.contains("Outcome"));
    assert!(row.contains("90%"));

    advance(800).await;
    assert!(page.progress_settled());

    overlay.toggle_filter(Sentiment::Negative);
    overlay.toggle_filter(Sentiment::Unscored);
    assert!(!page.is_hidden("card-101"));
    assert!(page.is_hidden("card-102"));
    assert!(page.is_hidden("card-103"));
    assert!(page.button_active(Sentiment::Positive));
    assert!(!page.button_active(Sentiment::Negative));
    assert_eq!(overlay.progress().text, "3 issues scored");

    overlay.toggle_filter(Sentiment::Unscored);
    assert!(!page.is_hidden("card-103"));
    assert!(overlay.filters().is_visible(Sentiment::Unscored));

    assert_eq!(fetcher.total_calls(), 3);
    assert_eq!(overlay.cache().len(), 3);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn navigation_starts_a_fresh_session_but_keeps_the_cache() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("101", 10, scores(Some("positive"), None))
            .respond("102", 10, scores(Some("negative"), None))
            .respond("103", 10, scores(None, Some("positive"))),
    );
    let page = Page::load(LISTING, &listing(&["101", "102"]));
    let running = start(&page, &fetcher, OverlayConfig::default());
    let overlay = &running.overlay;

    advance(1000).await;
    assert!(page.progress_settled());
    overlay.toggle_filter(Sentiment::Negative);
    assert!(page.is_hidden("card-102"));
    assert_eq!(overlay.epoch(), 1);

    page.navigate("https://host.example/issues/map?page=2", |doc| {
        let gone = doc.get_element_by_id("card-101").unwrap();
        doc.remove(gone);
        let panel = doc.get_element_by_id("panel").unwrap();
        doc.append_html(panel, &cards(&["103"]));
    });
    advance(1).await;

    assert_eq!(overlay.epoch(), 2);
    assert!(overlay.filters().is_visible(Sentiment::Negative));
    assert!(page.button_active(Sentiment::Negative));
    assert!(!page.is_hidden("card-102"));
    assert!(!page.progress_settled());
    assert_eq!(overlay.progress().total, 2);
    assert_eq!(page.count("card-102", CARD_ROW_CLASS), 1);

    advance(50).await;
    assert_eq!(page.progress_text().as_deref(), Some("2 issues scored"));
    assert_eq!(page.sentiment("card-102").as_deref(), Some("negative"));
    assert_eq!(page.sentiment("card-103").as_deref(), Some("positive"));
    assert_eq!(fetcher.calls_for("102"), 1);
    assert_eq!(fetcher.calls_for("103"), 1);
    assert_eq!(overlay.cache().len(), 3);
    assert_eq!(page.count("panel", PROGRESS_CLASS), 1);
    assert_eq!(page.count("panel", FILTER_BAR_CLASS), 1);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn results_for_a_previous_session_are_discarded() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("101", 500, scores(Some("positive"), None))
            .respond("77", 10, scores(Some("positive"), Some("positive"))),
    );
    let page = Page::load(LISTING, &listing(&["101"]));
    let running = start(&page, &fetcher, OverlayConfig::default());
    let overlay = &running.overlay;
    let old_card = page.node("card-101");

    advance(100).await;
    page.navigate("https://host.example/issues/77", |doc| {
        doc.remove(old_card);
        let body = doc.body();
        doc.append_html(body, "<h1>Issue 77</h1>");
    });
    advance(1).await;

    assert_eq!(overlay.epoch(), 2);
    let progress = overlay.progress();
    assert_eq!((progress.done, progress.total), (0, 0));
    assert!(page.banner().is_some());

    advance(600).await;
    assert_eq!(page.doc().attr(old_card, SENTIMENT_ATTR), None);
    assert_eq!(overlay.progress().done, 0);
    assert!(overlay.cache().peek("101").is_some_and(|outcome| outcome.is_ok()));
    let banner = page.banner_text().unwrap();
    assert!(banner.contains("Interaction") && banner.contains("Outcome"));
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn hung_request_settles_as_timed_out() {
    let fetcher = Arc::new(ScriptedFetcher::default().respond("101", 3_600_000, scores(Some("positive"), None)));
    let config = OverlayConfig {
        settle_timeout: Some(Duration::from_secs(2)),
        ..OverlayConfig::default()
    };
    let page = Page::load(LISTING, &listing(&["101"]));
    let running = start(&page, &fetcher, config);

    advance(1_900).await;
    assert_eq!(page.row_text("card-101"), LOADING_TEXT);

    advance(200).await;
    assert_eq!(page.row_text("card-101"), CARD_TIMED_OUT);
    assert_eq!(page.sentiment("card-101").as_deref(), Some("unscored"));
    assert_eq!(page.progress_text().as_deref(), Some("1 issues scored"));
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn late_cards_extend_progress_and_cancel_pending_completion() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("101", 10, scores(Some("positive"), None))
            .respond("102", 50, scores(Some("positive"), None)),
    );
    let page = Page::load(LISTING, &listing(&["101"]));
    let running = start(&page, &fetcher, OverlayConfig::default());
    let overlay = &running.overlay;

    advance(100).await;
    assert_eq!(page.progress_text().as_deref(), Some("1 issues scored"));

    page.append_cards(&["102"]);
    advance(1).await;
    assert_eq!(page.progress_text().as_deref(), Some("Scoring 1/2"));
    assert_eq!(overlay.progress().percent, 50.0);

    // the first completion's delay has passed by now, but it was superseded
    advance(799).await;
    assert_eq!(page.progress_text().as_deref(), Some("2 issues scored"));
    assert!(!page.progress_settled());

    advance(100).await;
    assert!(page.progress_settled());
    assert_eq!(page.count("panel", PROGRESS_CLASS), 1);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn detail_page_banner_shows_scores_until_dismissed() {
    let fetcher = Arc::new(
        ScriptedFetcher::default().respond("31", 20, scores(Some("positive"), Some("negative"))),
    );
    let page = Page::load("https://host.example/issues/31", "<main><h1>Issue 31</h1></main>");
    let running = start(&page, &fetcher, OverlayConfig::default());
    let overlay = &running.overlay;

    let banner = page.banner().unwrap();
    {
        let doc = page.doc();
        assert_eq!(doc.parent_element(banner), Some(doc.body()));
    }
    assert_eq!(page.body_margin().as_deref(), Some("56px"));
    assert!(page.banner_text().unwrap().contains(LOADING_TEXT));
    assert_eq!(overlay.progress().total, 0);
    assert_eq!(page.progress_text(), None);

    advance(50).await;
    let text = page.banner_text().unwrap();
    assert!(!text.contains(LOADING_TEXT));
    assert!(text.contains("Interaction") && text.contains("Outcome"));
    assert!(text.contains("positive") && text.contains("negative"));

    overlay.dismiss_banner();
    assert_eq!(page.banner(), None);
    assert_eq!(page.body_margin(), None);

    advance(1).await;
    assert_eq!(page.banner(), None);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dismissed_banner_ignores_late_scores() {
    let fetcher = Arc::new(ScriptedFetcher::default().respond("31", 200, scores(Some("positive"), None)));
    let page = Page::load("https://host.example/issues/31", "<main></main>");
    let running = start(&page, &fetcher, OverlayConfig::default());

    running.overlay.dismiss_banner();
    advance(300).await;

    assert_eq!(page.banner(), None);
    assert_eq!(fetcher.calls_for("31"), 1);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn banner_follows_navigation_between_subjects() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("32", 5, Ok(ScoreResult::default()))
            .respond("33", 5, failure(500)),
    );
    let page = Page::load("https://host.example/issues/32", "<main></main>");
    let running = start(&page, &fetcher, OverlayConfig::default());

    advance(10).await;
    assert!(page.banner_text().unwrap().contains(BANNER_NO_DATA));

    page.navigate("https://host.example/issues/33", |doc| {
        let body = doc.body();
        doc.append_html(body, "<p>Issue 33</p>");
    });
    advance(10).await;

    assert_eq!(page.banner_count(), 1);
    assert!(page.banner_text().unwrap().contains("Failed to load scores: 500"));
    assert_eq!(page.body_margin().as_deref(), Some("56px"));
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn banner_and_listing_share_one_fetch() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("101", 30, scores(Some("negative"), Some("negative")))
            .respond("102", 30, scores(Some("positive"), None)),
    );
    let page = Page::load(
        "https://host.example/issues/map/101",
        &listing(&["101", "102"]),
    );
    let running = start(&page, &fetcher, OverlayConfig::default());

    advance(50).await;
    assert_eq!(fetcher.calls_for("101"), 1);
    assert!(page.banner_text().unwrap().contains("Interaction"));
    assert_eq!(page.sentiment("card-101").as_deref(), Some("negative"));
    assert_eq!(page.progress_text().as_deref(), Some("2 issues scored"));
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn host_rerenders_without_navigation_keep_the_session() {
    let fetcher = Arc::new(ScriptedFetcher::default().respond("101", 10, scores(Some("positive"), None)));
    let page = Page::load(LISTING, &listing(&["101"]));
    let running = start(&page, &fetcher, OverlayConfig::default());

    advance(20).await;
    {
        let mut doc = page.doc();
        let body = doc.body();
        doc.append_html(body, "<footer>unrelated</footer>");
    }
    running.overlay.reconcile();
    advance(1).await;

    assert_eq!(running.overlay.epoch(), 1);
    assert_eq!(page.count("card-101", CARD_ROW_CLASS), 1);
    assert_eq!(running.overlay.progress().total, 1);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn regrouped_card_is_visible_and_unscored_while_loading_again() {
    let fetcher = Arc::new(ScriptedFetcher::default().respond("101", 3_600_000, scores(Some("positive"), None)));
    let config = OverlayConfig {
        settle_timeout: Some(Duration::from_secs(2)),
        ..OverlayConfig::default()
    };
    let page = Page::load(LISTING, &listing(&["101"]));
    let running = start(&page, &fetcher, config);
    let overlay = &running.overlay;

    advance(2_100).await;
    assert_eq!(page.sentiment("card-101").as_deref(), Some("unscored"));

    page.navigate("https://host.example/issues/map?page=2", |doc| {
        let body = doc.body();
        doc.append_html(body, "<p>page 2</p>");
    });
    advance(1).await;
    assert_eq!(overlay.epoch(), 2);
    assert_eq!(page.row_text("card-101"), LOADING_TEXT);
    assert_eq!(page.sentiment("card-101"), None);

    overlay.toggle_filter(Sentiment::Unscored);
    assert!(!page.is_hidden("card-101"));

    advance(2_100).await;
    assert_eq!(page.row_text("card-101"), CARD_TIMED_OUT);
    assert!(page.is_hidden("card-101"));
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn leaving_the_listing_resets_the_filter_buttons() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .respond("101", 10, scores(Some("negative"), None))
            .respond("77", 10, scores(Some("positive"), None)),
    );
    let page = Page::load(LISTING, &listing(&["101"]));
    let running = start(&page, &fetcher, OverlayConfig::default());

    advance(20).await;
    running.overlay.toggle_filter(Sentiment::Negative);
    assert!(!page.button_active(Sentiment::Negative));

    page.navigate("https://host.example/issues/77", |doc| {
        let body = doc.body();
        doc.append_html(body, "<h1>Issue 77</h1>");
    });
    advance(1).await;

    assert_eq!(running.overlay.epoch(), 2);
    for category in Sentiment::ALL {
        assert!(page.button_active(category), "{category} should be active");
    }
    assert!(!page.is_hidden("card-101"));
    running.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn indicator_converges_under_parallel_settlements() {
    let ids: Vec<String> = (1..=200).map(|n| (1000 + n).to_string()).collect();
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

    for _ in 0..5 {
        let fetcher = Arc::new(ids.iter().fold(ScriptedFetcher::default(), |fetcher, id| {
            fetcher.respond(id, 5, scores(Some("positive"), None))
        }));
        let page = Page::load(LISTING, &listing(&ids));
        let running = start(&page, &fetcher, OverlayConfig::default());

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while !page.progress_settled() {
            assert!(std::time::Instant::now() < deadline, "progress never settled");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(running.overlay.progress().text, "200 issues scored");
        assert_eq!(page.progress_text().as_deref(), Some("200 issues scored"));
        running.stop().await;
    }
}
