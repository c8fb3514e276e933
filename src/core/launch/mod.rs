pub mod builder;
pub mod classifier;
pub mod supervisor;

pub use builder::{GameCommand, GameCommandBuilder, LaunchContext, MinecraftCommandBuilder};
pub use classifier::{is_missing_main_class, LineClassifier, LineEvent, WatchState};
pub use supervisor::{GameExit, GameLine, GameProcessHandle, GameSupervisor, MIN_LINGER};
