//! Sampler lifecycle state machine.
//!
//! A sampler starts [`SamplerStatus::Idle`], runs as `Active` or `Paused`,
//! and ends in `Stopped`. `Stopped` is terminal: a new sampler session is
//! required to sample again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally visible state of a sampler session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerStatus {
    /// Constructed but never started.
    Idle,
    /// Running and producing one reading per tick.
    Active,
    /// Running, ticking, but skipping production.
    Paused,
    /// Terminal. The background task has exited or will exit on its next tick.
    Stopped,
}

impl SamplerStatus {
    /// Whether the background task is (still) alive in this state.
    pub fn is_running(self) -> bool {
        matches!(self, SamplerStatus::Active | SamplerStatus::Paused)
    }
}

impl fmt::Display for SamplerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SamplerStatus::Idle => "idle",
            SamplerStatus::Active => "active",
            SamplerStatus::Paused => "paused",
            SamplerStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Operator-issued control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Pause => "pause",
            LifecycleAction::Resume => "resume",
            LifecycleAction::Stop => "stop",
        };
        f.write_str(s)
    }
}

/// Why a sampler session reached [`SamplerStatus::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// An operator called `stop`.
    Operator,
    /// A threshold breach triggered an automatic shutdown.
    CriticalShutdown,
}

/// Compute the status that results from applying `action` in `current`.
///
/// Returns `None` when the transition is not allowed. `pause` and `resume`
/// are idempotent while running; nothing leaves `Stopped`.
pub fn next_status(current: SamplerStatus, action: LifecycleAction) -> Option<SamplerStatus> {
    use LifecycleAction::*;
    use SamplerStatus::*;

    match (current, action) {
        (Idle, Start) => Some(Active),
        (Active | Paused, Pause) => Some(Paused),
        (Active | Paused, Resume) => Some(Active),
        (Idle | Active | Paused, Stop) => Some(Stopped),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_only_from_idle() {
        assert_eq!(
            next_status(SamplerStatus::Idle, LifecycleAction::Start),
            Some(SamplerStatus::Active)
        );
        assert_eq!(next_status(SamplerStatus::Active, LifecycleAction::Start), None);
        assert_eq!(next_status(SamplerStatus::Stopped, LifecycleAction::Start), None);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let paused = next_status(SamplerStatus::Active, LifecycleAction::Pause);
        assert_eq!(paused, Some(SamplerStatus::Paused));
        assert_eq!(
            next_status(SamplerStatus::Paused, LifecycleAction::Pause),
            paused
        );

        assert_eq!(
            next_status(SamplerStatus::Active, LifecycleAction::Resume),
            Some(SamplerStatus::Active)
        );
    }

    #[test]
    fn stopped_is_terminal() {
        for action in [
            LifecycleAction::Start,
            LifecycleAction::Pause,
            LifecycleAction::Resume,
            LifecycleAction::Stop,
        ] {
            assert_eq!(next_status(SamplerStatus::Stopped, action), None);
        }
    }

    #[test]
    fn pause_requires_running_sampler() {
        assert_eq!(next_status(SamplerStatus::Idle, LifecycleAction::Pause), None);
        assert_eq!(next_status(SamplerStatus::Idle, LifecycleAction::Resume), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SamplerStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }
}
