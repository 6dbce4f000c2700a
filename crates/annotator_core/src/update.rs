use crate::{Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SessionState, msg: Msg) -> (SessionState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started { location } => {
            state.observe_location(location);
            let route = state.route();
            let mut effects = Vec::with_capacity(2);
            if let Some(subject_id) = route.subject_id {
                effects.push(Effect::ShowBanner { subject_id });
            }
            if route.listing {
                effects.push(Effect::ScanCards {
                    epoch: state.epoch(),
                });
            }
            effects
        }
        Msg::DocumentMutated { location } => {
            let mut effects = Vec::new();
            // Navigation is handled before the rescan so discovery runs
            // against the fresh epoch.
            if state.location() != Some(&location) {
                state.begin_epoch(location);
                effects.push(Effect::TeardownBanner);
                effects.push(Effect::ResetSession {
                    epoch: state.epoch(),
                });
                if let Some(subject_id) = state.route().subject_id {
                    effects.push(Effect::ShowBanner { subject_id });
                }
            }
            if state.route().listing {
                effects.push(Effect::ScanCards {
                    epoch: state.epoch(),
                });
            }
            effects
        }
        Msg::CardsDiscovered { epoch, count } => {
            if epoch != state.epoch() || count == 0 {
                return (state, Vec::new());
            }
            state.progress_mut().add_to_total(count);
            vec![
                Effect::ResumeProgress,
                Effect::RenderProgress(state.progress().view()),
                Effect::EnsureFilterBar(state.filters()),
            ]
        }
        Msg::ScoreSettled { epoch } => {
            if epoch != state.epoch() || !state.progress_mut().increment_done() {
                return (state, Vec::new());
            }
            let progress = state.progress();
            let mut effects = Vec::with_capacity(3);
            effects.push(Effect::RenderProgress(progress.view()));
            if progress.is_complete() {
                effects.push(Effect::ScheduleSettle {
                    epoch,
                    generation: progress.generation(),
                });
            }
            effects.push(Effect::ApplyFilters(state.filters()));
            effects
        }
        Msg::SettleDelayElapsed { epoch, generation } => {
            let progress = state.progress();
            if epoch == state.epoch()
                && generation == progress.generation()
                && progress.is_complete()
            {
                vec![Effect::MarkProgressSettled { generation }]
            } else {
                Vec::new()
            }
        }
        Msg::FilterToggled(category) => {
            let active = state.filters_mut().toggle(category);
            vec![
                Effect::SyncFilterButton { category, active },
                Effect::ApplyFilters(state.filters()),
            ]
        }
        Msg::BannerDismissed => vec![Effect::RemoveBanner],
    };

    (state, effects)
}
