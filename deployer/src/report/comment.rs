//! Single status comment, updated in place

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::deploy::events::{Phase, ProgressEvent, ProgressSink};
use crate::deploy::request::EnvironmentMapping;
use crate::errors::DeployError;
use crate::image::{EnvHints, ImageMetadataSource};
use crate::models::image::ImageReference;
use crate::report::render::{render, ReportContext};
use crate::report::{CommentApi, CommentId};

/// Where the image's declared environment comes from, and what overrides it
pub struct EnvHintLookup {
    pub source: Arc<dyn ImageMetadataSource>,
    pub image: ImageReference,
    pub overrides: EnvironmentMapping,
}

#[derive(Default)]
struct ReportState {
    history: Vec<ProgressEvent>,
    comment: Option<CommentId>,
    env_hints: Option<EnvHints>,
    pending_hints: Option<JoinHandle<Option<EnvHints>>>,
}

/// Posts the first event and rewrites the same comment for every later one
///
/// The image environment is looked up in the background once the image is
/// known to exist, and shows up in the first render after it completes.
pub struct CommentReporter {
    api: Arc<dyn CommentApi>,
    context: ReportContext,
    hint_lookup: Option<Arc<EnvHintLookup>>,
    state: Mutex<ReportState>,
}

impl CommentReporter {
    pub fn new(api: Arc<dyn CommentApi>, context: ReportContext) -> Self {
        Self {
            api,
            context,
            hint_lookup: None,
            state: Mutex::new(ReportState::default()),
        }
    }

    pub fn with_env_hints(mut self, lookup: EnvHintLookup) -> Self {
        self.hint_lookup = Some(Arc::new(lookup));
        self
    }

    pub async fn comment_id(&self) -> Option<CommentId> {
        self.state.lock().await.comment
    }

    pub async fn history(&self) -> Vec<ProgressEvent> {
        self.state.lock().await.history.clone()
    }

    /// The image resolved once the deployment moves past the probe
    fn start_hint_lookup(&self, state: &mut ReportState) {
        let Some(lookup) = self.hint_lookup.clone() else {
            return;
        };
        if state.pending_hints.is_some() || state.env_hints.is_some() {
            return;
        }

        state.pending_hints = Some(tokio::spawn(async move {
            lookup
                .source
                .lookup_env(&lookup.image)
                .await
                .map(|declared| EnvHints::new(&declared, &lookup.overrides))
        }));
    }

    /// Collect a finished lookup; on a terminal phase wait for it
    async fn collect_hints(state: &mut ReportState, wait: bool) {
        let ready = match &state.pending_hints {
            Some(handle) => wait || handle.is_finished(),
            None => false,
        };
        if !ready {
            return;
        }

        if let Some(handle) = state.pending_hints.take() {
            match handle.await {
                Ok(hints) => state.env_hints = hints,
                Err(e) => warn!(error = %e, "Image environment lookup did not complete"),
            }
        }
    }
}

#[async_trait]
impl ProgressSink for CommentReporter {
    async fn emit(&self, event: &ProgressEvent) -> Result<(), DeployError> {
        // held across the remote call so concurrent emits cannot post twice
        let mut state = self.state.lock().await;
        state.history.push(event.clone());

        if event.phase == Phase::Upserting {
            self.start_hint_lookup(&mut state);
        }
        Self::collect_hints(&mut state, event.phase.is_terminal()).await;

        let body = render(&self.context, state.env_hints.as_ref(), &state.history);
        let id = match state.comment {
            Some(id) => self.api.update(id, &body).await,
            None => self.api.post(&body).await,
        }
        .map_err(|e| DeployError::ReportError(e.to_string()))?;

        debug!(comment = id.0, phase = ?event.phase, "Updated status comment");
        state.comment = Some(id);
        Ok(())
    }
}
