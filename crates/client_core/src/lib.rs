pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod export;
pub mod handles;
pub mod media;
pub mod service;

pub use config::{load_settings, ClientSettings};
pub use controller::{ImageView, TranslateOutcome, WorkflowController, WorkflowSnapshot};
pub use error::{ConfigError, ControllerError, RequestError};
pub use events::{ControllerEvent, Notification, NotificationLevel};
pub use export::{Exporter, FileExporter};
pub use handles::{DisplayHandle, HandleRegistry};
pub use service::{HttpTranslationService, SourceUpload, TranslatedPayload, TranslationService};
