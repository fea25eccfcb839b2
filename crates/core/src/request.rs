//! Job requests submitted to the remote agent.
//!
//! A request becomes the `inputs` object of the execute call. Optional
//! fields that are blank are left out of that object entirely: the
//! remote service treats an absent key, not an empty string, as "not
//! provided".

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::payload::PayloadKind;

/// Reference to a file that has already been uploaded elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub url: String,
    pub file_name: String,
}

/// Free-text question for the chat agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub user_prompt: String,
    pub file: Option<FileData>,
}

impl ChatRequest {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            file: None,
        }
    }

    pub fn with_file(mut self, file: FileData) -> Self {
        self.file = Some(file);
        self
    }
}

/// Parameters for the schedule validation agent.
///
/// `ms_token` is the only optional field.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ScheduleInputs {
    pub ms_token: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
    #[validate(custom(function = "not_blank"))]
    pub input_folder: String,
    #[validate(custom(function = "not_blank"))]
    pub output_file: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// A unit of work to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Chat(ChatRequest),
    Schedule(ScheduleInputs),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatInputs<'a> {
    user_prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a FileData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleWireInputs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ms_token: Option<&'a str>,
    user_id: &'a str,
    input_folder: &'a str,
    output_file: &'a str,
}

impl JobRequest {
    /// Payload shape the agent behind this request produces.
    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            JobRequest::Chat(_) => PayloadKind::Chat,
            JobRequest::Schedule(_) => PayloadKind::Validation,
        }
    }

    /// Check that every required field is filled in.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            JobRequest::Chat(chat) => {
                if chat.user_prompt.trim().is_empty() {
                    return Err(CoreError::Validation("prompt must not be blank".into()));
                }
                Ok(())
            }
            JobRequest::Schedule(schedule) => Ok(schedule.validate()?),
        }
    }

    /// Build the `inputs` object for the execute call.
    pub fn to_inputs(&self) -> Result<serde_json::Value, CoreError> {
        let value = match self {
            JobRequest::Chat(chat) => serde_json::to_value(ChatInputs {
                user_prompt: &chat.user_prompt,
                file: chat.file.as_ref().filter(|f| !f.url.trim().is_empty()),
            }),
            JobRequest::Schedule(schedule) => serde_json::to_value(ScheduleWireInputs {
                ms_token: non_blank(schedule.ms_token.as_deref()),
                user_id: &schedule.user_id,
                input_folder: &schedule.input_folder,
                output_file: &schedule.output_file,
            }),
        };
        value.map_err(|e| CoreError::Internal(format!("failed to encode inputs: {e}")))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
