//! Crop identification / recommendation state machine.
//!
//! Only one stage may be in flight at a time. Used by RecommendationWorkflow.

/// Stage of one crop-identification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    ImageCaptured,
    Classifying,
    Classified,
    ClassifyFailed,
    FamilyLookupFailed,
    RecommendationRequested,
    RecommendationReady,
    RecommendationFailed,
}

impl WorkflowState {
    /// True while a network stage is running.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            WorkflowState::Classifying | WorkflowState::RecommendationRequested
        )
    }

    /// True for states that end a cycle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::ClassifyFailed
                | WorkflowState::FamilyLookupFailed
                | WorkflowState::RecommendationReady
                | WorkflowState::RecommendationFailed
        )
    }

    /// True if a classification can be started (an image is held).
    pub fn can_start_classify(self) -> bool {
        !self.is_in_flight() && self != WorkflowState::Idle
    }

    /// True if a species with a resolved family is available.
    pub fn can_request_recommendations(self) -> bool {
        matches!(
            self,
            WorkflowState::Classified
                | WorkflowState::RecommendationReady
                | WorkflowState::RecommendationFailed
        )
    }

    /// State after the classify + family lookup pair completes.
    pub fn on_classify_done(self, family_resolved: bool) -> Self {
        if family_resolved {
            WorkflowState::Classified
        } else {
            WorkflowState::FamilyLookupFailed
        }
    }

    /// State to fall back to when an in-flight stage is abandoned without a result.
    pub fn on_abandoned(self) -> Self {
        match self {
            WorkflowState::Classifying => WorkflowState::ImageCaptured,
            WorkflowState::RecommendationRequested => WorkflowState::Classified,
            other => other,
        }
    }
}
