// ─── Worker Protocol ───
// Line-delimited JSON envelopes exchanged with the JavaGuard / AssetGuard
// worker processes. Commands go out on the worker's stdin, responses come
// back on its stdout and are decoded into `WorkerMessage` at the boundary.

pub mod command;
pub mod message;

pub use command::{DownloadQueue, WorkerCommand};
pub use message::{
    ChannelTag, ValidationPhase, ValidationResult, WorkerFailure, WorkerMessage, WorkerResponse,
};
