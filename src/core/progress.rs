// ─── Progress ───
// Phase weights for both pipelines, the monotonic percentage aggregator and
// the cosmetic "Extracting..." label animation.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::core::protocol::ValidationPhase;

/// Period of the animated status label.
pub const ANIMATION_TICK: Duration = Duration::from_millis(750);

/// Longest dot suffix before the animation wraps back to none.
const MAX_DOTS: usize = 3;

/// State of the single OS-level (taskbar) progress indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OsProgress {
    Fraction(f64),
    Indeterminate,
    Hidden,
}

/// A step of a pipeline with a fixed place on the aggregated bar.
pub trait ProgressPhase: Copy {
    /// Cumulative percentage once this phase is done.
    fn weight(self) -> u8;

    /// Range that fine-grained sub-progress of this phase is rescaled into.
    fn band(self) -> (u8, u8) {
        (self.weight(), self.weight())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JavaPhase {
    Scanning,
    Enqueueing,
    Downloading,
    Extracting,
    Installed,
}

impl ProgressPhase for JavaPhase {
    fn weight(self) -> u8 {
        match self {
            JavaPhase::Scanning | JavaPhase::Enqueueing => 0,
            JavaPhase::Downloading | JavaPhase::Extracting | JavaPhase::Installed => 100,
        }
    }

    fn band(self) -> (u8, u8) {
        match self {
            JavaPhase::Downloading => (0, 100),
            other => (other.weight(), other.weight()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetPhase {
    Distribution,
    Version,
    Assets,
    Libraries,
    Files,
    Downloading,
    Extracting,
    Ready,
}

impl AssetPhase {
    pub fn from_validation(phase: &ValidationPhase) -> Option<Self> {
        match phase {
            ValidationPhase::Distribution => Some(AssetPhase::Distribution),
            ValidationPhase::Version => Some(AssetPhase::Version),
            ValidationPhase::Assets => Some(AssetPhase::Assets),
            ValidationPhase::Libraries => Some(AssetPhase::Libraries),
            ValidationPhase::Files => Some(AssetPhase::Files),
            ValidationPhase::Other(_) => None,
        }
    }

    /// Label shown once this phase has been reported done.
    pub fn next_label(self) -> &'static str {
        match self {
            AssetPhase::Distribution => "Loading version information..",
            AssetPhase::Version => "Validating asset integrity..",
            AssetPhase::Assets => "Validating library integrity..",
            AssetPhase::Libraries => "Validating miscellaneous file integrity..",
            AssetPhase::Files => "Downloading files..",
            AssetPhase::Downloading => "Downloading files..",
            AssetPhase::Extracting => "Extracting libraries",
            AssetPhase::Ready => "Preparing to launch..",
        }
    }
}

impl ProgressPhase for AssetPhase {
    fn weight(self) -> u8 {
        match self {
            AssetPhase::Distribution => 20,
            AssetPhase::Version => 40,
            AssetPhase::Assets => 60,
            AssetPhase::Libraries => 80,
            AssetPhase::Files
            | AssetPhase::Downloading
            | AssetPhase::Extracting
            | AssetPhase::Ready => 100,
        }
    }

    fn band(self) -> (u8, u8) {
        match self {
            // Asset validation sub-progress fills the gap between the
            // `version` and `assets` markers.
            AssetPhase::Assets => (40, 60),
            AssetPhase::Downloading => (0, 100),
            other => (other.weight(), other.weight()),
        }
    }
}

/// Folds phase markers and sub-progress into one percentage.
///
/// Within a run the value never decreases and never exceeds 100.
#[derive(Debug, Default, Clone)]
pub struct ProgressAggregator {
    current: u8,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.current
    }

    /// A phase marker arrived: jump to its cumulative weight.
    pub fn complete<P: ProgressPhase>(&mut self, phase: P) -> u8 {
        self.raise(phase.weight())
    }

    /// Sub-progress inside a phase, rescaled into the phase's band.
    pub fn advance<P: ProgressPhase>(&mut self, phase: P, value: f64, total: f64) -> u8 {
        let (low, high) = phase.band();
        let fraction = if total > 0.0 && value.is_finite() {
            (value / total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let scaled = f64::from(low) + fraction * f64::from(high.saturating_sub(low));
        self.raise(scaled.floor() as u8)
    }

    /// Start a new run (e.g. the download stage after validation finished).
    pub fn restart(&mut self) {
        self.current = 0;
    }

    fn raise(&mut self, candidate: u8) -> u8 {
        self.current = self.current.max(candidate.min(100));
        self.current
    }
}

/// Cosmetic "Label", "Label.", "Label..", "Label..." cycle.
///
/// Driven by the owning coordinator's event loop, so it stops existing when
/// the coordinator returns; it never gates completion logic.
#[derive(Debug, Default)]
pub struct StatusAnimator {
    base: Option<String>,
    dots: usize,
    ticker: Option<Interval>,
}

impl StatusAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin animating `base`, returning the first label to show.
    pub fn start(&mut self, base: &str) -> String {
        self.base = Some(base.to_string());
        self.dots = 0;
        let mut ticker = interval_at(Instant::now() + ANIMATION_TICK, ANIMATION_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        base.to_string()
    }

    pub fn stop(&mut self) {
        self.base = None;
        self.dots = 0;
        self.ticker = None;
    }

    pub fn is_active(&self) -> bool {
        self.base.is_some()
    }

    /// Wait for the next tick and return the label to display.
    ///
    /// Pends forever while inactive; callers guard the branch with
    /// `is_active()`.
    pub async fn tick(&mut self) -> String {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
        self.advance().unwrap_or_default()
    }

    fn advance(&mut self) -> Option<String> {
        let base = self.base.as_ref()?;
        if self.dots >= MAX_DOTS {
            self.dots = 0;
        } else {
            self.dots += 1;
        }
        Some(format!("{}{}", base, ".".repeat(self.dots)))
    }
}
