use tokio_util::sync::CancellationToken;

/// Cooperative cancellation signal shared by the batch loop and crawl sessions
///
/// The orchestrator checks the token before each claim and the session runner
/// before each page. A provider call in flight is abandoned on cancellation;
/// store writes always run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone observes it
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }
}
