//! Shared application state, wiring the stub adapters to the orchestrator.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use voice_agent_adapters::{
    PassThroughRecognizer, RecordingHandoff, RuleBasedUnderstander, StubDataClient,
    StubSynthesizer,
};
use voice_agent_config::Settings;
use voice_agent_core::{DataClient, Handoff, Recognizer, SessionStore, Synthesizer, Understander};
use voice_agent_orchestrator::Orchestrator;
use voice_agent_session::StubDurableSessionStore;

/// Everything an axum handler needs, cloned cheaply per request.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub recognizer: Arc<dyn Recognizer>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub session_store: Arc<dyn SessionStore>,
    pub settings: Arc<Settings>,
    /// `None` outside `main` (tests, anything that didn't call
    /// `crate::metrics::init_metrics`) — the `/metrics` route renders an
    /// empty body rather than installing a second process-wide recorder.
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Wires the configured adapter selection. Every selection in
    /// `Settings::adapters` ships only a `"stub"` implementation in this
    /// core; a deployment that registers a real provider under a different
    /// name would extend the checks below.
    pub fn new(settings: Settings) -> Self {
        Self::with_metrics_handle(settings, None)
    }

    /// Same wiring as `new`, but attaches the process-wide Prometheus handle
    /// `main` installed via `crate::metrics::init_metrics`.
    pub fn with_metrics_handle(settings: Settings, metrics_handle: Option<PrometheusHandle>) -> Self {
        let settings = Arc::new(settings);

        warn_if_not_stub("understander", &settings.adapters.understander);
        warn_if_not_stub("data_client", &settings.adapters.data_client);
        warn_if_not_stub("handoff", &settings.adapters.handoff);
        warn_if_not_stub("recognizer", &settings.adapters.recognizer);
        warn_if_not_stub("synthesizer", &settings.adapters.synthesizer);

        let understander: Arc<dyn Understander> = Arc::new(RuleBasedUnderstander::new());
        let data_client: Arc<dyn DataClient> = Arc::new(StubDataClient::new());
        let handoff: Arc<dyn Handoff> = Arc::new(RecordingHandoff::new());
        let recognizer: Arc<dyn Recognizer> = Arc::new(PassThroughRecognizer::new());
        let synthesizer: Arc<dyn Synthesizer> = Arc::new(StubSynthesizer::new());
        let session_store: Arc<dyn SessionStore> = Arc::new(StubDurableSessionStore::new("memory"));

        tracing::info!(
            understander = %settings.adapters.understander,
            recognizer = %settings.adapters.recognizer,
            synthesizer = %settings.adapters.synthesizer,
            data_client = %settings.adapters.data_client,
            handoff = %settings.adapters.handoff,
            "adapter selection resolved"
        );

        let orchestrator = Arc::new(Orchestrator::new(
            understander,
            data_client,
            handoff,
            session_store.clone(),
            settings.clone(),
        ));

        Self {
            orchestrator,
            recognizer,
            synthesizer,
            session_store,
            settings,
            metrics_handle,
        }
    }
}

fn warn_if_not_stub(adapter_class: &'static str, selection: &str) {
    if selection != "stub" {
        tracing::warn!(adapter_class, selection, "unknown adapter selection, falling back to stub");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_resolves_every_adapter_to_its_stub() {
        let state = AppState::new(Settings::default());
        assert_eq!(state.settings.adapters.understander, "stub");
    }
}
