use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use annotator_core::{
    update, Effect, Epoch, FilterState, Msg, ProgressView, Sentiment, SessionState, SessionView,
};
use engine_logging::{engine_debug, engine_info, engine_trace};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dom::{lock_document, Document, MutationRecord, NodeId, SharedDocument};
use crate::fetch::{ReqwestScoreFetcher, ScoreFetcher};
use crate::{
    banner, discovery, filter, pipeline, progress, FailureKind, FetchError, OverlayConfig,
    ResultCache, ScoreOutcome,
};

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("cannot build scoring client: {0}")]
    Client(#[from] FetchError),
}

/// DOM handles that belong to the current session.
#[derive(Debug, Clone, Copy, Default)]
struct PanelRefs {
    panel: Option<NodeId>,
    indicator: Option<NodeId>,
    filter_bar: Option<NodeId>,
}

#[derive(Debug, Default)]
struct SessionContext {
    state: SessionState,
    refs: PanelRefs,
}

struct Inner {
    document: SharedDocument,
    cache: ResultCache,
    config: OverlayConfig,
    session: Mutex<SessionContext>,
}

/// The live annotation engine bound to one host document.
///
/// All methods that may start work (`start`, `reconcile`, `run`,
/// `toggle_filter`) must be called from within a tokio runtime, of either
/// flavor.
///
/// Lock order is document, then session; the session lock is never held
/// while the document lock is being taken. Effects that mirror session state
/// into the page (progress text, settled class, filter buttons, visibility)
/// read it while holding the document lock, never from the effect payload.
#[derive(Clone)]
pub struct Overlay {
    inner: Arc<Inner>,
}

impl Overlay {
    pub fn new(document: SharedDocument, config: OverlayConfig) -> Result<Self, OverlayError> {
        let fetcher = ReqwestScoreFetcher::new(&config.api_base, config.fetch.clone())?;
        Ok(Self::with_fetcher(document, config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(
        document: SharedDocument,
        config: OverlayConfig,
        fetcher: Arc<dyn ScoreFetcher>,
    ) -> Self {
        let session = SessionContext {
            state: SessionState::new(config.contract.routes.clone()),
            refs: PanelRefs::default(),
        };
        Self {
            inner: Arc::new(Inner {
                document,
                cache: ResultCache::new(fetcher),
                config,
                session: Mutex::new(session),
            }),
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.inner.config
    }

    pub fn epoch(&self) -> Epoch {
        self.session().state.epoch()
    }

    pub fn progress(&self) -> ProgressView {
        self.session().state.progress().view()
    }

    pub fn filters(&self) -> FilterState {
        self.session().state.filters()
    }

    pub fn view(&self) -> SessionView {
        self.session().state.view()
    }

    /// Initial pass for the location the page was loaded with.
    pub fn start(&self) {
        let location = self.lock_document().location().clone();
        engine_info!("overlay starting at {}", location);
        self.dispatch(Msg::Started { location });
    }

    /// One reconciliation pass: reacts to a navigation, if any, then rescans.
    pub fn reconcile(&self) {
        let location = self.lock_document().location().clone();
        self.dispatch(Msg::DocumentMutated { location });
    }

    /// Subscribes to the document, runs the initial pass and spawns the
    /// reconciliation loop.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let notifications = self.lock_document().observe();
        self.start();
        tokio::spawn(self.clone().run(notifications, cancel))
    }

    /// Reconciliation loop. Bursts of notifications that are already queued
    /// are folded into a single pass.
    pub async fn run(
        self,
        mut notifications: UnboundedReceiver<MutationRecord>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                record = notifications.recv() => {
                    if record.is_none() {
                        break;
                    }
                }
            }
            let mut folded = 1usize;
            while notifications.try_recv().is_ok() {
                folded += 1;
            }
            engine_trace!("reconciling after {} mutation records", folded);
            self.reconcile();
        }
        engine_debug!("reconciliation loop stopped");
    }

    pub fn toggle_filter(&self, category: Sentiment) {
        self.dispatch(Msg::FilterToggled(category));
    }

    pub fn dismiss_banner(&self) {
        self.dispatch(Msg::BannerDismissed);
    }

    pub(crate) fn lock_document(&self) -> MutexGuard<'_, Document> {
        lock_document(&self.inner.document)
    }

    fn session(&self) -> MutexGuard<'_, SessionContext> {
        self.inner.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refs(&self) -> PanelRefs {
        self.session().refs
    }

    /// Runs `render` with the document locked and a consistent view of the
    /// session taken under that lock.
    fn with_page<R>(&self, render: impl FnOnce(&mut Document, &SessionContext) -> R) -> R {
        let mut document = self.lock_document();
        let session = self.session();
        render(&mut document, &session)
    }

    /// Waits for a subject's scores, bounded by `settle_timeout`.
    pub(crate) async fn await_score(&self, subject_id: &str) -> ScoreOutcome {
        let pending = self.inner.cache.get_or_fetch(subject_id);
        let Some(limit) = self.inner.config.settle_timeout else {
            return pending.await;
        };
        tokio::time::timeout(limit, pending)
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::new(
                    FailureKind::Timeout,
                    format!("no response within {limit:?}"),
                ))
            })
    }

    pub(crate) fn dispatch(&self, msg: Msg) {
        let effects = {
            let mut session = self.session();
            let state = std::mem::take(&mut session.state);
            let (state, effects) = update(state, msg);
            session.state = state;
            effects
        };
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::TeardownBanner | Effect::RemoveBanner => {
                banner::teardown(&mut self.lock_document(), &self.inner.config);
            }
            Effect::ResetSession { epoch } => {
                self.session().refs = PanelRefs::default();
                self.with_page(|document, session| {
                    filter::reveal_all(document);
                    filter::sync_all_bars(document, session.state.filters());
                });
                engine_info!("navigation detected, session {} started", epoch);
            }
            Effect::ShowBanner { subject_id } => banner::show(self, subject_id),
            Effect::ScanCards { epoch } => self.scan_cards(epoch),
            Effect::ResumeProgress => {
                let Some(panel) = self.refs().panel else {
                    return;
                };
                let indicator = progress::resume(&mut self.lock_document(), panel);
                self.session().refs.indicator = indicator;
            }
            Effect::RenderProgress(_) => self.with_page(|document, session| {
                if let Some(indicator) = session.refs.indicator {
                    progress::render(document, indicator, &session.state.progress().view());
                }
            }),
            Effect::EnsureFilterBar(_) => {
                let mut document = self.lock_document();
                let (panel, filters) = {
                    let session = self.session();
                    (session.refs.panel, session.state.filters())
                };
                let Some(panel) = panel else {
                    return;
                };
                let bar = filter::ensure_bar(&mut document, panel, filters);
                self.session().refs.filter_bar = bar;
            }
            Effect::ScheduleSettle { epoch, generation } => {
                let overlay = self.clone();
                let delay = self.inner.config.settle_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    overlay.dispatch(Msg::SettleDelayElapsed { epoch, generation });
                });
            }
            Effect::MarkProgressSettled { generation } => self.with_page(|document, session| {
                let progress = session.state.progress();
                // new work may have arrived since the settle was scheduled
                if progress.generation() != generation || !progress.is_complete() {
                    return;
                }
                if let Some(indicator) = session.refs.indicator {
                    progress::mark_settled(document, indicator);
                }
            }),
            Effect::SyncFilterButton { category, .. } => self.with_page(|document, session| {
                if let Some(bar) = session.refs.filter_bar {
                    let active = session.state.filters().is_visible(category);
                    filter::sync_button(document, bar, category, active);
                }
            }),
            Effect::ApplyFilters(_) => self.with_page(|document, session| {
                if let Some(panel) = session.refs.panel {
                    filter::apply(document, panel, session.state.filters());
                }
            }),
        }
    }

    fn scan_cards(&self, epoch: Epoch) {
        let (cards, first_parent) = {
            let mut document = self.lock_document();
            let cards = discovery::scan(&mut document, &self.inner.config.contract, epoch);
            let first_parent = cards
                .first()
                .and_then(|card| document.parent_element(card.element));
            (cards, first_parent)
        };
        if cards.is_empty() {
            return;
        }
        engine_info!("discovered {} groupings in session {}", cards.len(), epoch);

        {
            let mut session = self.session();
            if session.refs.panel.is_none() {
                session.refs.panel = first_parent;
            }
        }
        self.dispatch(Msg::CardsDiscovered {
            epoch,
            count: cards.len(),
        });
        for card in cards {
            pipeline::annotate(self, card, epoch);
        }
    }
}
