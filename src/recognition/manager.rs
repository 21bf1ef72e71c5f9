use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;

use super::{ProviderError, ProviderKind, RecognitionProvider, RecognitionResult};
use crate::config::RecognitionConfig;

/// A request to recognize the current selection.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub kind: ProviderKind,
    /// Selection generation the request belongs to.
    pub generation: u64,
    pub png: Arc<Vec<u8>>,
}

/// Outcome delivered back to the dispatch thread.
#[derive(Debug, Clone)]
pub struct RecognitionOutcome {
    pub kind: ProviderKind,
    pub generation: u64,
    pub result: Result<Vec<RecognitionResult>, String>,
}

/// Receives outcomes on the worker side.
pub trait OutcomeSink: Send + 'static {
    fn deliver(&self, outcome: RecognitionOutcome);
}

impl OutcomeSink for mpsc::UnboundedSender<RecognitionOutcome> {
    fn deliver(&self, outcome: RecognitionOutcome) {
        if self.send(outcome).is_err() {
            log::warn!("Recognition outcome dropped: receiver closed");
        }
    }
}

/// Builds providers for incoming requests. Swapped out in tests.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, kind: ProviderKind) -> Box<dyn RecognitionProvider>;
}

struct ConfiguredFactory {
    config: RecognitionConfig,
}

impl ProviderFactory for ConfiguredFactory {
    fn build(&self, kind: ProviderKind) -> Box<dyn RecognitionProvider> {
        kind.build(&self.config)
    }
}

/// Runs recognition requests on the Tokio runtime, one at a time, and hands
/// each outcome to an [`OutcomeSink`].
///
/// The dispatch thread never waits on a provider; it only queues requests.
#[derive(Clone)]
pub struct RecognitionManager {
    request_tx: mpsc::UnboundedSender<RecognitionRequest>,
}

impl RecognitionManager {
    pub fn new(
        runtime_handle: &tokio::runtime::Handle,
        config: RecognitionConfig,
        sink: impl OutcomeSink,
    ) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self::with_factory(
            runtime_handle,
            Arc::new(ConfiguredFactory { config }),
            timeout,
            sink,
        )
    }

    /// Creates a manager with a custom provider factory (useful for testing).
    pub fn with_factory(
        runtime_handle: &tokio::runtime::Handle,
        factory: Arc<dyn ProviderFactory>,
        timeout: Duration,
        sink: impl OutcomeSink,
    ) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<RecognitionRequest>();

        runtime_handle.spawn(async move {
            while let Some(request) = request_rx.recv().await {
                log::debug!(
                    "Processing recognition request: {} (generation {}, {} bytes)",
                    request.kind,
                    request.generation,
                    request.png.len()
                );
                let provider = factory.build(request.kind);
                let result = match run_with_timeout(provider.as_ref(), &request.png, timeout).await
                {
                    Ok(results) => {
                        log::info!("{} returned {} result(s)", provider.name(), results.len());
                        Ok(results)
                    }
                    Err(e) => {
                        log::warn!("{} failed: {}", provider.name(), e);
                        Err(e.to_string())
                    }
                };
                sink.deliver(RecognitionOutcome {
                    kind: request.kind,
                    generation: request.generation,
                    result,
                });
            }
            log::debug!("Recognition worker stopped");
        });

        Self { request_tx }
    }

    /// Queues a request. Non-blocking.
    pub fn submit(&self, request: RecognitionRequest) -> Result<(), ProviderError> {
        self.request_tx
            .send(request)
            .map_err(|_| ProviderError::Unavailable("recognition worker not running".to_string()))
    }
}

async fn run_with_timeout(
    provider: &dyn RecognitionProvider,
    png: &[u8],
    timeout: Duration,
) -> Result<Vec<RecognitionResult>, ProviderError> {
    match tokio::time::timeout(timeout, provider.recognize(png)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout.as_secs())),
    }
}

#[cfg(test)]
impl RecognitionManager {
    pub(crate) fn with_closed_channel_for_test() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<RecognitionRequest>();
        drop(rx);
        Self { request_tx: tx }
    }
}
