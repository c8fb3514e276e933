// ─── Line Classifier ───
// Infers game state from its console output. Which patterns apply depends
// on how far the game has got, so the classifier carries that state.

use regex::Regex;

use crate::core::error::LauncherResult;

const LAUNCH_PATTERN: &str =
    r"^\[.+\]: (?:MinecraftForge .+ Initialized|ModLauncher .+ starting: .+)$";
const SOUND_ENGINE_PATTERN: &str = r"\[.+\]: Sound engine started";
const MISSING_MAIN_CLASS: &str =
    "Could not find or load main class net.minecraft.launchwrapper.Launch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for the loader to report it has initialised.
    AwaitingLaunch,
    /// Launch seen; waiting out the minimum linger before watching.
    LaunchDetected,
    /// Loading UI dismissed; in-game markers are tracked.
    Watching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    LaunchDetected,
    WorldJoined,
    SoundEngineStarted,
}

#[derive(Debug)]
pub struct LineClassifier {
    state: WatchState,
    launch: Regex,
    world_joined: Regex,
    sound_engine: Regex,
}

impl LineClassifier {
    /// `display_name` is the player name announced in chat on join.
    pub fn new(display_name: &str) -> LauncherResult<Self> {
        let world_joined = format!(
            r"\[.+\]: \[CHAT\] {} joined the game",
            regex::escape(display_name)
        );
        Ok(Self {
            state: WatchState::AwaitingLaunch,
            launch: Regex::new(LAUNCH_PATTERN)?,
            world_joined: Regex::new(&world_joined)?,
            sound_engine: Regex::new(SOUND_ENGINE_PATTERN)?,
        })
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Classify one stdout line against the patterns of the current state.
    pub fn classify(&mut self, line: &str) -> Option<LineEvent> {
        let line = line.trim();
        match self.state {
            WatchState::AwaitingLaunch => {
                if self.launch.is_match(line) {
                    self.state = WatchState::LaunchDetected;
                    Some(LineEvent::LaunchDetected)
                } else {
                    None
                }
            }
            WatchState::LaunchDetected => None,
            WatchState::Watching => {
                if self.world_joined.is_match(line) {
                    Some(LineEvent::WorldJoined)
                } else if self.sound_engine.is_match(line) {
                    Some(LineEvent::SoundEngineStarted)
                } else {
                    None
                }
            }
        }
    }

    /// Swap to the in-game pattern set. Only valid after a launch match.
    pub fn begin_watching(&mut self) -> bool {
        if self.state == WatchState::LaunchDetected {
            self.state = WatchState::Watching;
            true
        } else {
            false
        }
    }
}

/// Stderr marker of a corrupted LaunchWrapper download.
pub fn is_missing_main_class(line: &str) -> bool {
    line.contains(MISSING_MAIN_CLASS)
}
