// ─── LaunchSuite Core ───
// Launch orchestration for a modded Minecraft server distribution.
//
// Architecture:
//   core/
//     protocol/   — Worker command/response envelopes and decoded messages
//     worker/     — Worker channel, process transport, spawner seam
//     distro/     — Distribution index model + acquisition strategies
//     java/       — Java probe/validation + provisioning coordinator
//     assets/     — Asset pipeline coordinator
//     launch/     — Game command builder, output classifier, supervisor
//     state/      — Persisted launcher configuration
//     session.rs  — Per-attempt launch session
//     orchestrator.rs — Entry points tying the coordinators together

pub mod assets;
pub mod auth;
pub mod distro;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod orchestrator;
pub mod presence;
pub mod progress;
pub mod protocol;
pub mod session;
pub mod state;
pub mod version;
pub mod view;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;
