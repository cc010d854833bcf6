use farmie_core::{FarmieError, WorkflowState};
use farmie_services::ImageRef;
use serde::Serialize;

/// Species, family and confidence for one classified image.
///
/// `family` is `None` only after a failed family lookup; such a result is
/// partial and must be shown as "family unavailable".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub species: String,
    pub family: Option<String>,
    pub confidence: f64,
}

impl PredictionResult {
    pub fn is_complete(&self) -> bool {
        self.family.is_some()
    }
}

/// Companion crops in server relevance order. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecommendationSet(Vec<String>);

impl RecommendationSet {
    pub fn new(crops: Vec<String>) -> Self {
        Self(crops)
    }

    pub fn crops(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Outcome of a trigger that was accepted or deliberately skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    /// The stage ran and its result was applied.
    Done(T),
    /// The same stage was already running; nothing was sent.
    AlreadyInFlight,
    /// The session moved on while the call was running; the response was dropped.
    Superseded,
}

impl<T> Submission<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Submission::Done(value) => Some(value),
            Submission::AlreadyInFlight | Submission::Superseded => None,
        }
    }
}

/// Point-in-time copy of a workflow, for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub image: Option<ImageRef>,
    pub prediction: Option<PredictionResult>,
    pub recommendations: Option<RecommendationSet>,
    pub last_error: Option<FarmieError>,
}
