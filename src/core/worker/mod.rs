// ─── Workers ───
// Forked JavaGuard / AssetGuard processes behind the worker protocol.
//
//   channel.rs — transport-agnostic channel: in-flight gating, decoding,
//                idempotent teardown
//   process.rs — child-process transport and spawner
//   lines.rs   — lossy line reader shared with the game supervisor

pub mod channel;
pub mod lines;
pub mod process;

pub use channel::{TransportEvent, WorkerChannel, WorkerEvent, WorkerKind, WorkerTransport};
pub use lines::LossyLines;
pub use process::{ProcessWorkerSpawner, WorkerSpawner};
