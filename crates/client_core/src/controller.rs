//! Workflow controller: image selection, translation requests, export.
//!
//! All state lives behind one mutex that is never held across an await.
//! `translate` drops the lock while the request is in flight, which is what
//! lets a new selection land during `Translating`. When the response comes
//! back the controller only applies it if the request is still the tracked
//! one; selecting a new image untracks it, so late answers for an old image
//! are dropped on the floor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{RequestSeq, Revision, WorkflowState},
    protocol::EXPORT_FILE_NAME,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    error::{ConfigError, ControllerError},
    events::{describe_request_failure, ControllerEvent, Notification},
    export::{Exporter, FileExporter},
    handles::{DisplayHandle, HandleRegistry},
    media,
    service::{HttpTranslationService, SourceUpload, TranslationService},
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ImageView {
    pub label: String,
    pub handle: DisplayHandle,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub revision: Revision,
    pub source: Option<ImageView>,
    pub translated: Option<ImageView>,
    pub last_error: Option<String>,
}

impl WorkflowSnapshot {
    pub fn can_translate(&self) -> bool {
        self.source.is_some() && self.state != WorkflowState::Translating
    }

    pub fn can_download(&self) -> bool {
        self.translated.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    Translated,
    Failed(String),
    /// The source changed while the request was in flight; its answer was discarded.
    Stale,
    AlreadyInFlight,
    NoSource,
}

struct SourceImage {
    upload: SourceUpload,
    handle: DisplayHandle,
}

struct TranslatedImage {
    handle: DisplayHandle,
}

#[derive(Default)]
struct ControllerState {
    source: Option<SourceImage>,
    translated: Option<TranslatedImage>,
    in_flight: Option<RequestSeq>,
    last_error: Option<String>,
    next_seq: u64,
    revision: u64,
}

impl ControllerState {
    fn workflow_state(&self) -> WorkflowState {
        WorkflowState::derive(
            self.source.is_some(),
            self.translated.is_some(),
            self.in_flight.is_some(),
            self.last_error.is_some(),
        )
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            state: self.workflow_state(),
            revision: Revision(self.revision),
            source: self.source.as_ref().map(|source| ImageView {
                label: source.upload.file_name.clone(),
                handle: source.handle.clone(),
            }),
            translated: self.translated.as_ref().map(|translated| ImageView {
                label: "translated".to_string(),
                handle: translated.handle.clone(),
            }),
            last_error: self.last_error.clone(),
        }
    }
}

pub struct WorkflowController {
    service: Arc<dyn TranslationService>,
    exporter: Arc<dyn Exporter>,
    export_file_name: String,
    handles: HandleRegistry,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl WorkflowController {
    pub fn new(service: Arc<dyn TranslationService>, exporter: Arc<dyn Exporter>) -> Arc<Self> {
        Self::with_export_file_name(service, exporter, EXPORT_FILE_NAME)
    }

    pub fn with_export_file_name(
        service: Arc<dyn TranslationService>,
        exporter: Arc<dyn Exporter>,
        export_file_name: impl Into<String>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            service,
            exporter,
            export_file_name: export_file_name.into(),
            handles: HandleRegistry::new(),
            inner: Mutex::new(ControllerState::default()),
            events,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Arc<Self>, ConfigError> {
        let service = HttpTranslationService::from_settings(settings)?;
        info!(endpoint = %service.endpoint(), "translation service configured");
        Ok(Self::with_export_file_name(
            Arc::new(service),
            Arc::new(FileExporter::new(settings.resolved_export_dir())),
            settings.export_file_name.clone(),
        ))
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.lock_state().snapshot()
    }

    pub fn state(&self) -> WorkflowState {
        self.lock_state().workflow_state()
    }

    pub fn select_image(&self, bytes: impl Into<Vec<u8>>) -> Result<WorkflowSnapshot, ControllerError> {
        self.select_image_file(None, bytes)
    }

    /// Replaces the current source. Any result, error, or tracked request
    /// belonging to the previous source is dropped in the same step.
    pub fn select_image_file(
        &self,
        file_name: Option<&str>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<WorkflowSnapshot, ControllerError> {
        let bytes: Vec<u8> = bytes.into();
        let format = match media::validate_selection(&bytes) {
            Ok(format) => format,
            Err(err) => {
                debug!("ignoring selection: {err}");
                return Err(err);
            }
        };

        let file_name = media::upload_file_name(file_name, format);
        let mime_type =
            media::mime_for_file_name(&file_name).unwrap_or_else(|| media::mime_for_format(format));
        let bytes: Arc<[u8]> = bytes.into();
        let handle = self.handles.acquire(Arc::clone(&bytes), mime_type.clone());

        let mut state = self.lock_state();
        if let Some(superseded) = state.in_flight.take() {
            debug!(request = superseded.0, "selection superseded in-flight translation");
        }
        let previous_source = state.source.replace(SourceImage {
            upload: SourceUpload {
                file_name,
                mime_type,
                bytes,
            },
            handle,
        });
        let previous_result = state.translated.take();
        state.last_error = None;
        drop(previous_source);
        drop(previous_result);

        info!(
            bytes = state.source.as_ref().map(|s| s.handle.len()).unwrap_or_default(),
            "image selected"
        );
        Ok(self.publish(&mut state))
    }

    /// Sends the current source to the translation service and applies the
    /// answer if it still belongs to the current source.
    pub async fn translate(&self) -> TranslateOutcome {
        let (seq, upload) = {
            let mut state = self.lock_state();
            let Some(source) = state.source.as_ref() else {
                debug!("translate ignored: no image selected");
                return TranslateOutcome::NoSource;
            };
            if let Some(pending) = state.in_flight {
                debug!(request = pending.0, "translate ignored: request already in flight");
                return TranslateOutcome::AlreadyInFlight;
            }

            let upload = source.upload.clone();
            state.next_seq += 1;
            let seq = RequestSeq(state.next_seq);
            state.in_flight = Some(seq);
            state.last_error = None;
            let previous_result = state.translated.take();
            drop(previous_result);
            self.publish(&mut state);
            (seq, upload)
        };

        info!(
            request = seq.0,
            file_name = %upload.file_name,
            bytes = upload.bytes.len(),
            "translation request issued"
        );
        let mut guard = InFlightGuard {
            controller: self,
            seq,
            settled: false,
        };
        let result = self.service.translate(&upload).await;
        guard.settled = true;

        let mut state = self.lock_state();
        if state.in_flight != Some(seq) {
            debug!(request = seq.0, "discarding stale translation response");
            return TranslateOutcome::Stale;
        }
        state.in_flight = None;

        match result {
            Ok(payload) => {
                info!(request = seq.0, bytes = payload.bytes.len(), "translation completed");
                let handle = self.handles.acquire(payload.bytes, payload.mime_type);
                state.translated = Some(TranslatedImage { handle });
                self.publish(&mut state);
                TranslateOutcome::Translated
            }
            Err(err) => {
                let message = describe_request_failure(&err);
                warn!(request = seq.0, status = ?err.status(), "translation failed: {err}");
                state.last_error = Some(message.clone());
                self.publish(&mut state);
                let _ = self
                    .events
                    .send(ControllerEvent::Notification(Notification::error(message.clone())));
                TranslateOutcome::Failed(message)
            }
        }
    }

    /// Exports the translated image. Does nothing unless the workflow is in
    /// `Translated`; returns whether an export was triggered.
    pub fn download(&self) -> bool {
        let bytes = {
            let state = self.lock_state();
            if state.workflow_state() != WorkflowState::Translated {
                debug!(state = state.workflow_state().label(), "download ignored");
                return false;
            }
            match state.translated.as_ref() {
                Some(translated) => translated.handle.shared_bytes(),
                None => return false,
            }
        };

        self.exporter.export(&self.export_file_name, &bytes);
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &mut ControllerState) -> WorkflowSnapshot {
        state.revision += 1;
        let snapshot = state.snapshot();
        debug!(
            state = snapshot.state.label(),
            revision = state.revision,
            "workflow state changed"
        );
        let _ = self.events.send(ControllerEvent::StateChanged {
            state: snapshot.state,
            revision: snapshot.revision,
        });
        snapshot
    }
}

/// Untracks the request when `translate` is dropped before the service
/// answers, so the workflow falls back to `Ready` instead of `Translating`.
struct InFlightGuard<'a> {
    controller: &'a WorkflowController,
    seq: RequestSeq,
    settled: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.controller.lock_state();
        if state.in_flight == Some(self.seq) {
            debug!(request = self.seq.0, "translation abandoned before a response arrived");
            state.in_flight = None;
            self.controller.publish(&mut state);
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
