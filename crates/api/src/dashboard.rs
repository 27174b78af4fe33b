use axum::http::StatusCode;
use bazaar_core::domain::market::AnalysisSnapshot;
use bazaar_core::llm::error::{AnalysisError, ErrorKind};
use bazaar_core::llm::LlmClient;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AnalysisError> for ErrorView {
    fn from(err: &AnalysisError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<AnalysisSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorView>,
}

#[derive(Debug)]
pub enum RefreshError {
    /// A fetch is already in flight.
    Busy,
    Failed(AnalysisError),
}

#[derive(Debug, Default)]
struct Held {
    snapshot: Option<AnalysisSnapshot>,
    error: Option<ErrorView>,
}

/// Latest analysis plus the single-flight loading gate.
pub struct Dashboard {
    llm: Result<Arc<dyn LlmClient>, AnalysisError>,
    loading: AtomicBool,
    held: RwLock<Held>,
}

impl Dashboard {
    /// `llm` is the construction outcome of the client; a credential failure is
    /// kept and reported on every refresh instead of aborting startup.
    pub fn new(llm: Result<Arc<dyn LlmClient>, AnalysisError>) -> Self {
        Self {
            llm,
            loading: AtomicBool::new(false),
            held: RwLock::new(Held::default()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub async fn view(&self) -> DashboardView {
        let held = self.held.read().await;
        DashboardView {
            loading: self.is_loading(),
            snapshot: held.snapshot.clone(),
            error: held.error.clone(),
        }
    }

    pub async fn refresh(&self) -> Result<AnalysisSnapshot, RefreshError> {
        let Some(_gate) = LoadingGate::try_acquire(&self.loading) else {
            return Err(RefreshError::Busy);
        };

        let outcome = match &self.llm {
            Ok(client) => client.fetch_analysis().await,
            Err(err) => Err(err.clone()),
        };

        let mut held = self.held.write().await;
        match outcome {
            Ok(result) => {
                let snapshot = AnalysisSnapshot::new(result, chrono::Utc::now());
                held.snapshot = Some(snapshot.clone());
                held.error = None;
                Ok(snapshot)
            }
            Err(err) => {
                held.snapshot = None;
                held.error = Some(ErrorView::from(&err));
                Err(RefreshError::Failed(err))
            }
        }
    }
}

struct LoadingGate<'a>(&'a AtomicBool);

impl<'a> LoadingGate<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadingGate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::AuthError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::EmptyResponse
        | ErrorKind::MalformedResponse
        | ErrorKind::IncompleteData
        | ErrorKind::TransportError => StatusCode::BAD_GATEWAY,
    }
}
