//! Persistent data processing (pfop) models.

use serde::{Deserialize, Serialize};

/// Options for a pfop submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PfopOptions {
    /// URL notified when the job finishes
    pub notify_url: Option<String>,
    /// Overwrite existing outputs
    pub force: bool,
}

/// Response to a pfop submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PfopResult {
    pub persistent_id: String,
}

/// State of a persistent processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum JobState {
    Succeeded,
    Queued,
    Running,
    Failed,
    /// Processing finished but the notify callback failed
    NotifyFailed,
    Unknown(i32),
}

impl JobState {
    pub fn code(&self) -> i32 {
        match self {
            JobState::Succeeded => 0,
            JobState::Queued => 1,
            JobState::Running => 2,
            JobState::Failed => 3,
            JobState::NotifyFailed => 4,
            JobState::Unknown(code) => *code,
        }
    }

    /// No more updates are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::NotifyFailed
        )
    }
}

impl From<i32> for JobState {
    fn from(code: i32) -> Self {
        match code {
            0 => JobState::Succeeded,
            1 => JobState::Queued,
            2 => JobState::Running,
            3 => JobState::Failed,
            4 => JobState::NotifyFailed,
            other => JobState::Unknown(other),
        }
    }
}

impl From<JobState> for i32 {
    fn from(state: JobState) -> Self {
        state.code()
    }
}

/// Outcome of one command in a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefopItem {
    pub cmd: String,
    pub code: JobState,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Output key, set once the command succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default)]
    pub return_old: i32,
}

/// Status of a persistent processing job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefopStatus {
    pub id: String,
    pub code: JobState,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub input_key: String,
    #[serde(default)]
    pub input_bucket: String,
    #[serde(default)]
    pub pipeline: String,
    #[serde(default)]
    pub reqid: String,
    #[serde(default)]
    pub items: Vec<PrefopItem>,
}

impl PrefopStatus {
    /// Output keys of the commands that produced one.
    pub fn output_keys(&self) -> Vec<&str> {
        self.items.iter().filter_map(|i| i.key.as_deref()).collect()
    }
}
