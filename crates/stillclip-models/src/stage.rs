//! Pipeline stages and the request state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unit of work in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    FramePreparation,
    AudioExtraction,
    BoundsDetection,
    LoudnessNormalization,
    Assembly,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::FramePreparation => "frame_preparation",
            StageKind::AudioExtraction => "audio_extraction",
            StageKind::BoundsDetection => "bounds_detection",
            StageKind::LoudnessNormalization => "loudness_normalization",
            StageKind::Assembly => "assembly",
        }
    }

    /// State reached once this stage's output exists.
    pub fn completes_into(&self) -> PipelineState {
        match self {
            StageKind::FramePreparation => PipelineState::FramePrepared,
            StageKind::AudioExtraction => PipelineState::AudioExtracted,
            StageKind::BoundsDetection => PipelineState::BoundsDetected,
            StageKind::LoudnessNormalization => PipelineState::AudioNormalized,
            StageKind::Assembly => PipelineState::Assembled,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request lifecycle.
///
/// ```text
/// Received → FramePrepared → AudioExtracted → BoundsDetected
///          → AudioNormalized → Assembled → Delivered
///
/// any non-terminal state ──► Failed
/// ```
///
/// Frame preparation and audio extraction are independent, so
/// `AudioExtracted` may be reached before `FramePrepared` has been recorded.
/// The transition table accepts either order for that pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    FramePrepared,
    AudioExtracted,
    BoundsDetected,
    AudioNormalized,
    Assembled,
    Delivered,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Delivered | PipelineState::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }

        matches!(
            (self, next),
            (Received, FramePrepared)
                | (Received, AudioExtracted)
                | (FramePrepared, AudioExtracted)
                | (AudioExtracted, FramePrepared)
                | (AudioExtracted, BoundsDetected)
                | (FramePrepared, BoundsDetected)
                | (BoundsDetected, AudioNormalized)
                | (AudioNormalized, Assembled)
                | (Assembled, Delivered)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Received => "received",
            PipelineState::FramePrepared => "frame_prepared",
            PipelineState::AudioExtracted => "audio_extracted",
            PipelineState::BoundsDetected => "bounds_detected",
            PipelineState::AudioNormalized => "audio_normalized",
            PipelineState::Assembled => "assembled",
            PipelineState::Delivered => "delivered",
            PipelineState::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use PipelineState::*;
        let path = [
            Received,
            FramePrepared,
            AudioExtracted,
            BoundsDetected,
            AudioNormalized,
            Assembled,
            Delivered,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_independent_stages_either_order() {
        assert!(PipelineState::Received.can_transition_to(PipelineState::AudioExtracted));
        assert!(PipelineState::AudioExtracted.can_transition_to(PipelineState::FramePrepared));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!PipelineState::Received.can_transition_to(PipelineState::Assembled));
        assert!(!PipelineState::BoundsDetected.can_transition_to(PipelineState::Delivered));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        assert!(PipelineState::Assembled.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::Delivered.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::Failed.can_transition_to(PipelineState::Received));
    }

    #[test]
    fn test_stage_completion_states() {
        assert_eq!(
            StageKind::LoudnessNormalization.completes_into(),
            PipelineState::AudioNormalized
        );
        assert_eq!(StageKind::Assembly.to_string(), "assembly");
    }
}
