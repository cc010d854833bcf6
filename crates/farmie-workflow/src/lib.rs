//! Client-side orchestration for the farm-detail and crop-identification screens.
//!
//! [`RecommendationWorkflow`] drives one identification session: capture,
//! classify plus family lookup, then companion-crop recommendations.
//! [`FarmOverview`] loads the yearly weather profile and the crop listing for
//! one farm. Each screen owns its own instance; nothing is shared between them.

pub mod overview;
pub mod recommendation;
pub mod types;

pub use overview::{Farm, FarmOverview, LoadState};
pub use recommendation::{RecommendationWorkflow, DEFAULT_STAGE_TIMEOUT};
pub use types::{PredictionResult, RecommendationSet, Submission, WorkflowSnapshot};
