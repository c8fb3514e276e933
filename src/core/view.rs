// ─── Launch View ───
// What the launch core needs from the presentation layer. Implemented by
// the console front-end in the binary and by a recorder in tests.

use async_trait::async_trait;

use crate::core::progress::OsProgress;

const CONSOLE_HINT: &str = "See the log output for more details.";

/// Presentation-layer seam: progress, labels, overlays and confirmations.
#[async_trait]
pub trait LaunchView: Send {
    /// Show (`true`) or hide the loading area in place of the launch button.
    fn toggle_launch_area(&mut self, loading: bool);

    fn set_launch_details(&mut self, details: &str);

    fn set_launch_percentage(&mut self, percent: u8);

    fn set_os_progress(&mut self, progress: OsProgress);

    fn show_failure(&mut self, failure: &LaunchFailure);

    /// Block on a two-button overlay. No choice is preselected.
    async fn prompt(&mut self, prompt: &Prompt) -> PromptChoice;

    /// Failure overlay plus hiding the loading area.
    fn fail(&mut self, failure: &LaunchFailure) {
        self.show_failure(failure);
        self.toggle_launch_area(false);
    }

    /// Mirror a download fraction on both the OS indicator and the bar.
    fn show_download_progress(&mut self, fraction: f64, percent: u8) {
        self.set_os_progress(OsProgress::Fraction(fraction.clamp(0.0, 1.0)));
        self.set_launch_percentage(percent);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Primary,
    Secondary,
    /// Closed without picking an action (no input available).
    Dismissed,
}

/// Two-button confirmation overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub description: String,
    pub primary: String,
    pub secondary: String,
}

impl Prompt {
    pub fn java_missing() -> Self {
        Self {
            title: "No Compatible Java Installation Found".into(),
            description: "In order to join the server you need a 64-bit installation of Java. \
                          Would you like us to install a copy?"
                .into(),
            primary: "Install Java".into(),
            secondary: "Install Manually".into(),
        }
    }

    pub fn java_required() -> Self {
        Self {
            title: "Java is Required to Launch".into(),
            description: "A valid x64 installation of Java is required to launch. \
                          Please refer to the Java Management guide for instructions on \
                          how to manually install Java."
                .into(),
            primary: "I Understand".into(),
            secondary: "Go Back".into(),
        }
    }
}

/// Which branch of the error taxonomy produced a failure overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    JavaInstall,
    Download,
    Validation,
    Launch,
    DistroUnavailable,
    CorruptedCoreLibrary,
    WorkerExited,
}

/// Blocking overlay with an acknowledgement action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFailure {
    pub kind: FailureKind,
    pub title: String,
    pub description: String,
}

impl LaunchFailure {
    fn new(kind: FailureKind, title: &str, description: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn java_download_failed() -> Self {
        Self::new(
            FailureKind::JavaInstall,
            "Unexpected Issue: Java Download Failed",
            "Unfortunately we've encountered an issue while attempting to install Java. \
             You will need to manually install a copy. Please check out the troubleshooting \
             guide for more details and instructions.",
        )
    }

    pub fn download_failed(unreachable: bool) -> Self {
        let description = if unreachable {
            "Unable to connect to the file server. Ensure that you are connected to the \
             internet and try again."
        } else {
            CONSOLE_HINT
        };
        Self::new(FailureKind::Download, "Error During File Download", description)
    }

    pub fn validation_failed() -> Self {
        Self::new(FailureKind::Validation, "Error During Launch", CONSOLE_HINT)
    }

    pub fn launch_failed() -> Self {
        Self::new(FailureKind::Launch, "Error During Launch", CONSOLE_HINT)
    }

    pub fn distro_unavailable() -> Self {
        Self::new(
            FailureKind::DistroUnavailable,
            "Fatal Error",
            &format!("Could not load a copy of the distribution index. {CONSOLE_HINT}"),
        )
    }

    pub fn corrupted_core_library() -> Self {
        Self::new(
            FailureKind::CorruptedCoreLibrary,
            "Game Launch Failed",
            "The main file, LaunchWrapper, failed to download properly. As a result, the game \
             cannot launch.\n\nTo fix this issue, temporarily turn off your antivirus software \
             and launch the game again.",
        )
    }

    pub fn worker_exited(code: Option<i32>) -> Self {
        let description = match code {
            Some(code) => format!("The validation process exited with code {code}. {CONSOLE_HINT}"),
            None => format!("The validation process was terminated. {CONSOLE_HINT}"),
        };
        Self {
            kind: FailureKind::WorkerExited,
            title: "Error During Launch".into(),
            description,
        }
    }
}
