use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::{ModLoaderMetadata, VersionMetadata};

use super::command::{
    FN_ENQUEUE_OPEN_JDK, FN_PROCESS_DL_QUEUES, FN_VALIDATE_EVERYTHING, FN_VALIDATE_JAVA,
};

/// Raw response envelope as written by a worker, one JSON object per line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
}

/// Logical sub-pipeline a progress / complete / error message belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTag {
    Download,
    Extract,
    Java,
    Assets,
    Other(String),
}

impl ChannelTag {
    fn parse(raw: Option<&Value>) -> Self {
        match raw.and_then(Value::as_str) {
            Some("download") => ChannelTag::Download,
            Some("extract") => ChannelTag::Extract,
            Some("java") => ChannelTag::Java,
            Some("assets") => ChannelTag::Assets,
            Some(other) => ChannelTag::Other(other.to_string()),
            None => ChannelTag::Other(String::new()),
        }
    }
}

/// Validation step reported by the asset worker under the `validate` context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationPhase {
    Distribution,
    Version,
    Assets,
    Libraries,
    Files,
    Other(String),
}

impl ValidationPhase {
    fn parse(raw: Option<&Value>) -> Self {
        match raw.and_then(Value::as_str) {
            Some("distribution") => ValidationPhase::Distribution,
            Some("version") => ValidationPhase::Version,
            Some("assets") => ValidationPhase::Assets,
            Some("libraries") => ValidationPhase::Libraries,
            Some("files") => ValidationPhase::Files,
            Some(other) => ValidationPhase::Other(other.to_string()),
            None => ValidationPhase::Other(String::new()),
        }
    }
}

/// Error payload carried by an `error` message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkerFailure {
    pub code: Option<String>,
    pub message: String,
}

impl WorkerFailure {
    fn parse(raw: Option<&Value>) -> Self {
        match raw {
            Some(Value::String(message)) => WorkerFailure {
                code: None,
                message: message.clone(),
            },
            Some(Value::Object(obj)) => WorkerFailure {
                code: obj.get("code").and_then(Value::as_str).map(str::to_string),
                message: obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            },
            Some(other) => WorkerFailure {
                code: None,
                message: other.to_string(),
            },
            None => WorkerFailure::default(),
        }
    }

    /// The worker could not reach the file server at all.
    pub fn is_unreachable(&self) -> bool {
        self.code.as_deref() == Some("ENOENT")
    }
}

/// Payload of the final `validateEverything` response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    pub version: Option<VersionMetadata>,
    pub mod_loader: Option<ModLoaderMetadata>,
    pub error: Option<String>,
}

impl ValidationResult {
    fn parse(raw: Option<&Value>) -> Self {
        let Some(obj) = raw.and_then(Value::as_object) else {
            return ValidationResult::default();
        };

        let present = |key: &str| obj.get(key).filter(|value| !value.is_null()).cloned();

        ValidationResult {
            version: present("versionData").map(VersionMetadata::new),
            mod_loader: present("forgeData").map(ModLoaderMetadata::new),
            error: present("error").map(|value| match value {
                Value::String(s) => s,
                other => other.to_string(),
            }),
        }
    }
}

/// Typed worker message, one variant per response context.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// `validateJava`: `None` means no usable installation was found.
    ValidateJava { executable: Option<PathBuf> },
    /// `_enqueueOpenJDK`: only a literal `true` counts as enqueued.
    JavaEnqueued { enqueued: bool },
    Progress {
        channel: ChannelTag,
        value: f64,
        total: f64,
        percent: Option<u8>,
    },
    Complete {
        channel: ChannelTag,
        args: Vec<Value>,
    },
    Failure {
        channel: ChannelTag,
        error: WorkerFailure,
    },
    Validate { phase: ValidationPhase },
    ValidateEverything(ValidationResult),
}

impl WorkerMessage {
    /// Name of the `execute` function whose in-flight slot this message
    /// settles, if any.
    pub fn settles(&self) -> Option<&'static str> {
        match self {
            WorkerMessage::ValidateJava { .. } => Some(FN_VALIDATE_JAVA),
            WorkerMessage::JavaEnqueued { .. } => Some(FN_ENQUEUE_OPEN_JDK),
            WorkerMessage::Complete {
                channel: ChannelTag::Java,
                ..
            } => Some(FN_PROCESS_DL_QUEUES),
            WorkerMessage::Failure {
                channel: ChannelTag::Download | ChannelTag::Java,
                ..
            } => Some(FN_PROCESS_DL_QUEUES),
            WorkerMessage::ValidateEverything(_) => Some(FN_VALIDATE_EVERYTHING),
            _ => None,
        }
    }
}

impl TryFrom<WorkerResponse> for WorkerMessage {
    type Error = LauncherError;

    fn try_from(response: WorkerResponse) -> LauncherResult<Self> {
        let message = match response.context.as_str() {
            "validateJava" => WorkerMessage::ValidateJava {
                executable: response
                    .result
                    .as_ref()
                    .and_then(Value::as_str)
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from),
            },
            "_enqueueOpenJDK" => WorkerMessage::JavaEnqueued {
                enqueued: matches!(response.result, Some(Value::Bool(true))),
            },
            "progress" => WorkerMessage::Progress {
                channel: ChannelTag::parse(response.data.as_ref()),
                value: response.value.unwrap_or(0.0),
                total: response.total.unwrap_or(0.0),
                percent: parse_percent(response.percent.as_ref()),
            },
            "complete" => WorkerMessage::Complete {
                channel: ChannelTag::parse(response.data.as_ref()),
                args: response.args.unwrap_or_default(),
            },
            "error" => WorkerMessage::Failure {
                channel: ChannelTag::parse(response.data.as_ref()),
                error: WorkerFailure::parse(response.error.as_ref()),
            },
            "validate" => WorkerMessage::Validate {
                phase: ValidationPhase::parse(response.data.as_ref()),
            },
            "validateEverything" => {
                WorkerMessage::ValidateEverything(ValidationResult::parse(response.result.as_ref()))
            }
            other => return Err(LauncherError::UnknownContext(other.to_string())),
        };

        Ok(message)
    }
}

fn parse_percent(raw: Option<&Value>) -> Option<u8> {
    let percent = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    Some(percent.clamp(0.0, 100.0) as u8)
}
