// ─── Presence ───
// Rich-presence integration seam. The launch core only initialises it,
// pushes status text and shuts it down.

use tracing::info;

use crate::core::distro::{DistroPresence, ServerPresence};

pub const PRESENCE_LOADING: &str = "Loading game..";
pub const PRESENCE_WORLD_JOINED: &str = "Exploring the realm!";
pub const PRESENCE_NEW_WORLD: &str = "Heading into a new world!";

pub trait PresenceNotifier: Send {
    fn init(&mut self, distro: &DistroPresence, server: &ServerPresence);

    fn update_details(&mut self, details: &str);

    fn shutdown(&mut self);
}

/// Presence notifier that only logs. Used when no chat client is wired in.
#[derive(Debug, Default)]
pub struct TracingPresence {
    client_id: Option<String>,
}

impl PresenceNotifier for TracingPresence {
    fn init(&mut self, distro: &DistroPresence, server: &ServerPresence) {
        info!(
            "Presence started (client {}, server {})",
            distro.client_id,
            server.short_id.as_deref().unwrap_or("-")
        );
        self.client_id = Some(distro.client_id.clone());
    }

    fn update_details(&mut self, details: &str) {
        if self.client_id.is_some() {
            info!("Presence: {}", details);
        }
    }

    fn shutdown(&mut self) {
        if self.client_id.take().is_some() {
            info!("Shutting down presence..");
        }
    }
}
