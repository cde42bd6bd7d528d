use serde::{Deserialize, Serialize};

macro_rules! seq_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

seq_newtype!(RequestSeq);
seq_newtype!(Revision);

/// Where the translation workflow currently stands.
///
/// Never stored on its own; always derived from what the controller holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Empty,
    Ready,
    Translating,
    Translated,
    Failed,
}

impl WorkflowState {
    pub fn derive(has_source: bool, has_result: bool, in_flight: bool, has_error: bool) -> Self {
        if !has_source {
            Self::Empty
        } else if in_flight {
            Self::Translating
        } else if has_result {
            Self::Translated
        } else if has_error {
            Self::Failed
        } else {
            Self::Ready
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Ready => "ready",
            Self::Translating => "translating",
            Self::Translated => "translated",
            Self::Failed => "failed",
        }
    }
}
