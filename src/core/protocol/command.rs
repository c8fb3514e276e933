use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const FN_VALIDATE_JAVA: &str = "validateJava";
pub const FN_ENQUEUE_OPEN_JDK: &str = "_enqueueOpenJDK";
pub const FN_PROCESS_DL_QUEUES: &str = "processDlQueues";
pub const FN_VALIDATE_EVERYTHING: &str = "validateEverything";

/// Command sent to a worker.
///
/// `changeContext` re-targets the subsystem inside the worker that later
/// commands apply to and never produces a response. `execute` invokes a
/// named operation and is answered by exactly one completion or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task")]
pub enum WorkerCommand {
    #[serde(rename = "changeContext")]
    ChangeContext { class: String, args: Vec<Value> },
    #[serde(rename = "execute")]
    Execute {
        function: String,
        #[serde(rename = "argsArr")]
        args: Vec<Value>,
    },
}

/// One entry of a `processDlQueues` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQueue {
    pub id: String,
    pub limit: u32,
}

impl WorkerCommand {
    pub fn change_context(class: &str, args: Vec<Value>) -> Self {
        WorkerCommand::ChangeContext {
            class: class.to_string(),
            args,
        }
    }

    pub fn execute(function: &str, args: Vec<Value>) -> Self {
        WorkerCommand::Execute {
            function: function.to_string(),
            args,
        }
    }

    pub fn validate_java(data_dir: &Path) -> Self {
        Self::execute(FN_VALIDATE_JAVA, vec![path_value(data_dir)])
    }

    pub fn enqueue_open_jdk(data_dir: &Path) -> Self {
        Self::execute(FN_ENQUEUE_OPEN_JDK, vec![path_value(data_dir)])
    }

    pub fn process_download_queues(queues: &[DownloadQueue]) -> Self {
        Self::execute(FN_PROCESS_DL_QUEUES, vec![json!(queues)])
    }

    pub fn validate_everything(server_id: &str, dev_mode: bool) -> Self {
        Self::execute(
            FN_VALIDATE_EVERYTHING,
            vec![Value::String(server_id.to_string()), Value::Bool(dev_mode)],
        )
    }

    /// Context key the worker answers this command under, or `None` for
    /// commands that are never answered.
    pub fn response_context(&self) -> Option<&str> {
        match self {
            WorkerCommand::ChangeContext { .. } => None,
            WorkerCommand::Execute { function, .. } => Some(function.as_str()),
        }
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().to_string())
}
