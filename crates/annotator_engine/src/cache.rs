use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use engine_logging::{engine_debug, engine_error};
use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::fetch::ScoreFetcher;
use crate::{FailureKind, FetchError, ScoreOutcome, SubjectId};

type PendingScore = Shared<BoxFuture<'static, ScoreOutcome>>;

/// Memoizes fetches by subject id.
///
/// The stored value is the fetch operation itself, so callers arriving while
/// a request is in flight join it instead of issuing another one. Failures
/// are part of the stored value and are never retried. Entries are never
/// evicted.
#[derive(Clone)]
pub struct ResultCache {
    fetcher: Arc<dyn ScoreFetcher>,
    entries: Arc<Mutex<HashMap<SubjectId, PendingScore>>>,
}

impl ResultCache {
    pub fn new(fetcher: Arc<dyn ScoreFetcher>) -> Self {
        Self {
            fetcher,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Must be called from within a tokio runtime: the first call for a key
    /// spawns the underlying fetch immediately.
    pub fn get_or_fetch(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = ScoreOutcome> + Send + 'static {
        let mut entries = self.entries();
        if let Some(pending) = entries.get(subject_id) {
            engine_debug!("cache hit for subject {}", subject_id);
            return pending.clone();
        }

        let fetcher = Arc::clone(&self.fetcher);
        let key = subject_id.to_string();
        let task = tokio::spawn(async move { fetcher.fetch_scores(&key).await });
        let pending = async move {
            task.await.unwrap_or_else(|err| {
                engine_error!("score fetch task failed: {}", err);
                Err(FetchError::new(FailureKind::Aborted, err.to_string()))
            })
        }
        .boxed()
        .shared();
        entries.insert(subject_id.to_string(), pending.clone());
        pending
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.entries().contains_key(subject_id)
    }

    /// Result of a settled entry; `None` while pending or unknown.
    pub fn peek(&self, subject_id: &str) -> Option<ScoreOutcome> {
        self.entries().get(subject_id).and_then(|p| p.peek().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SubjectId, PendingScore>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
