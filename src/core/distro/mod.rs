// ─── Distribution Index ───
// The server list the launcher validates against, acquired from an ordered
// list of sources.

pub mod acquire;
pub mod model;

pub use acquire::{AcquisitionStrategy, Acquired, CachedDistro, DistroManager, RemoteDistro};
pub use model::{DistroIndex, DistroPresence, Server, ServerPresence};
