//! Crop identification and companion-crop recommendation session.
//!
//! Stages run strictly in order: classify, then family lookup for the
//! classified species, then (on request) recommendations for a farm. A
//! generation counter ties every in-flight call to the session that issued it;
//! responses for an older generation are dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use farmie_core::{FarmieError, WorkflowState};
use farmie_services::{CropBackend, ImageRef};
use parking_lot::Mutex;
use tracing::instrument;

use crate::types::{PredictionResult, RecommendationSet, Submission, WorkflowSnapshot};

/// Upper bound on each backend call made by a stage.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct Session {
    generation: u64,
    state: WorkflowState,
    image: Option<ImageRef>,
    prediction: Option<PredictionResult>,
    recommendations: Option<RecommendationSet>,
    last_error: Option<FarmieError>,
    /// A backend call is running, possibly for an older generation.
    outstanding: bool,
}

impl Session {
    fn bump(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// Ties a running stage to the generation that started it.
///
/// Dropping the guard without settling (the caller dropped the future) rolls
/// the in-flight state back so the stage can be triggered again. Settling or
/// dropping always releases the outstanding-call slot, even for a stale
/// generation.
struct StageGuard<'a> {
    session: &'a Mutex<Session>,
    generation: u64,
    settled: bool,
}

impl<'a> StageGuard<'a> {
    fn new(session: &'a Mutex<Session>, generation: u64) -> Self {
        Self {
            session,
            generation,
            settled: false,
        }
    }

    fn is_current(&self) -> bool {
        self.session.lock().generation == self.generation
    }

    /// Apply a stage result, unless the session has moved on.
    fn settle<R>(mut self, apply: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.settled = true;
        let mut session = self.session.lock();
        session.outstanding = false;
        if session.generation != self.generation {
            tracing::debug!(
                "Dropping result for generation {} (now {})",
                self.generation,
                session.generation
            );
            return None;
        }
        Some(apply(&mut session))
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut session = self.session.lock();
        session.outstanding = false;
        if session.generation == self.generation {
            let rolled_back = session.state.on_abandoned();
            tracing::debug!("Stage abandoned: {:?} -> {:?}", session.state, rolled_back);
            session.state = rolled_back;
        }
    }
}

fn into_submission<T>(outcome: Option<Result<T, FarmieError>>) -> Result<Submission<T>, FarmieError> {
    match outcome {
        Some(Ok(value)) => Ok(Submission::Done(value)),
        Some(Err(e)) => Err(e),
        None => Ok(Submission::Superseded),
    }
}

/// One crop-identification session. Owned by a single screen.
pub struct RecommendationWorkflow {
    backend: Arc<dyn CropBackend>,
    stage_timeout: Duration,
    session: Mutex<Session>,
}

impl RecommendationWorkflow {
    pub fn new(backend: Arc<dyn CropBackend>) -> Self {
        Self {
            backend,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            session: Mutex::new(Session::default()),
        }
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    /// Hold a new image, clearing any prediction and recommendations.
    ///
    /// Ignored with [`Submission::AlreadyInFlight`] while a stage is running.
    pub fn capture_image(&self, image: ImageRef) -> Submission<()> {
        let mut session = self.session.lock();
        if session.state.is_in_flight() {
            tracing::debug!("Ignoring capture while {:?}", session.state);
            return Submission::AlreadyInFlight;
        }
        let generation = session.bump();
        tracing::info!("Captured {} (generation {})", image.path.display(), generation);

        session.state = WorkflowState::ImageCaptured;
        session.image = Some(image);
        session.prediction = None;
        session.recommendations = None;
        session.last_error = None;
        Submission::Done(())
    }

    /// Back to `Idle`, e.g. when the screen is left. In-flight responses are
    /// dropped, but no new stage starts until the abandoned call returns.
    pub fn reset(&self) {
        let mut session = self.session.lock();
        let generation = session.bump();
        let outstanding = session.outstanding;
        *session = Session {
            generation,
            outstanding,
            ..Session::default()
        };
    }

    /// Classify the held image, then resolve the species' family.
    ///
    /// A classification failure ends in `ClassifyFailed`. A failed family
    /// lookup ends in `FamilyLookupFailed` with the partial prediction kept.
    #[instrument(skip(self), level = "info")]
    pub async fn classify(&self) -> Result<Submission<PredictionResult>, FarmieError> {
        let (generation, image) = {
            let mut session = self.session.lock();
            if session.outstanding {
                tracing::debug!("Ignoring classify while {:?}", session.state);
                return Ok(Submission::AlreadyInFlight);
            }
            if !session.state.can_start_classify() {
                return Err(FarmieError::MissingContext("no image captured"));
            }
            let image = session
                .image
                .clone()
                .ok_or(FarmieError::MissingContext("no image captured"))?;

            session.state = WorkflowState::Classifying;
            session.outstanding = true;
            session.prediction = None;
            session.recommendations = None;
            session.last_error = None;
            (session.generation, image)
        };
        let guard = StageGuard::new(&self.session, generation);

        let classification = match self.bounded(self.backend.predict_crop(&image)).await {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!("Classification failed: {}", e);
                return into_submission(guard.settle(|session| {
                    session.state = WorkflowState::ClassifyFailed;
                    session.last_error = Some(e.clone());
                    Err(e)
                }));
            }
        };

        if !guard.is_current() {
            tracing::debug!("Session moved on, skipping family lookup");
            return Ok(Submission::Superseded);
        }

        let family = self
            .bounded(self.backend.crop_family(&classification.species))
            .await;

        into_submission(guard.settle(|session| {
            let resolved = family.is_ok();
            let mut prediction = PredictionResult {
                species: classification.species,
                family: None,
                confidence: classification.confidence,
            };
            let result = match family {
                Ok(family) => {
                    prediction.family = Some(family);
                    Ok(prediction.clone())
                }
                Err(e) => {
                    tracing::warn!("Family lookup for {} failed: {}", prediction.species, e);
                    session.last_error = Some(e.clone());
                    Err(e)
                }
            };
            session.prediction = Some(prediction);
            session.state = session.state.on_classify_done(resolved);
            result
        }))
    }

    /// Fetch companion crops for the classified species on `farm_id`.
    ///
    /// Requires a complete prediction and a non-blank farm id; otherwise
    /// `MissingContext` is returned and nothing changes.
    #[instrument(skip(self), level = "info")]
    pub async fn request_recommendations(
        &self,
        farm_id: Option<&str>,
    ) -> Result<Submission<RecommendationSet>, FarmieError> {
        let (generation, species, farm_id) = {
            let mut session = self.session.lock();
            if session.outstanding {
                tracing::debug!("Ignoring recommendation request while {:?}", session.state);
                return Ok(Submission::AlreadyInFlight);
            }
            let farm_id = farm_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or(FarmieError::MissingContext("farm id is required"))?;
            if !session.state.can_request_recommendations() {
                return Err(FarmieError::MissingContext("no classified crop"));
            }
            let species = session
                .prediction
                .as_ref()
                .filter(|p| p.is_complete())
                .map(|p| p.species.clone())
                .ok_or(FarmieError::MissingContext("no classified crop"))?;

            session.state = WorkflowState::RecommendationRequested;
            session.outstanding = true;
            session.recommendations = None;
            session.last_error = None;
            (session.generation, species, farm_id)
        };
        let guard = StageGuard::new(&self.session, generation);

        let result = self
            .bounded(self.backend.crop_recommendations(&species, farm_id))
            .await;

        into_submission(guard.settle(|session| match result {
            Ok(crops) => {
                let recommendations = RecommendationSet::new(crops);
                tracing::info!(
                    "{} recommendations for {} on farm {}",
                    recommendations.len(),
                    species,
                    farm_id
                );
                session.recommendations = Some(recommendations.clone());
                session.state = WorkflowState::RecommendationReady;
                Ok(recommendations)
            }
            Err(e) => {
                tracing::warn!("Recommendations failed: {}", e);
                session.state = WorkflowState::RecommendationFailed;
                session.last_error = Some(e.clone());
                Err(e)
            }
        }))
    }

    pub fn state(&self) -> WorkflowState {
        self.session.lock().state
    }

    pub fn image(&self) -> Option<ImageRef> {
        self.session.lock().image.clone()
    }

    pub fn prediction(&self) -> Option<PredictionResult> {
        self.session.lock().prediction.clone()
    }

    pub fn recommendations(&self) -> Option<RecommendationSet> {
        self.session.lock().recommendations.clone()
    }

    pub fn last_error(&self) -> Option<FarmieError> {
        self.session.lock().last_error.clone()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let session = self.session.lock();
        WorkflowSnapshot {
            state: session.state,
            image: session.image.clone(),
            prediction: session.prediction.clone(),
            recommendations: session.recommendations.clone(),
            last_error: session.last_error.clone(),
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, FarmieError>>,
    ) -> Result<T, FarmieError> {
        match tokio::time::timeout(self.stage_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Stage timed out after {:?}", self.stage_timeout);
                Err(FarmieError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use async_trait::async_trait;
    use farmie_core::ErrorKind;
    use farmie_services::Classification;

    struct FakeBackend {
        prediction: Result<Classification, FarmieError>,
        family: Result<String, FarmieError>,
        recommendations: Result<Vec<String>, FarmieError>,
        delay: Duration,
        calls: Mutex<Vec<&'static str>>,
        /// (running calls, most ever running at once)
        load: Mutex<(usize, usize)>,
    }

    impl FakeBackend {
        fn tomato() -> Self {
            Self {
                prediction: Ok(Classification {
                    species: "Tomato".into(),
                    confidence: 0.92,
                }),
                family: Ok("Solanaceae".into()),
                recommendations: Ok(vec!["basil".into(), "carrot".into(), "onion".into()]),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
                load: Mutex::new((0, 0)),
            }
        }

        fn with_prediction(mut self, prediction: Result<Classification, FarmieError>) -> Self {
            self.prediction = prediction;
            self
        }

        fn with_family(mut self, family: Result<String, FarmieError>) -> Self {
            self.family = family;
            self
        }

        fn with_recommendations(mut self, recommendations: Result<Vec<String>, FarmieError>) -> Self {
            self.recommendations = recommendations;
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }

        fn peak_concurrency(&self) -> usize {
            self.load.lock().1
        }

        async fn call(&self, name: &'static str) {
            self.calls.lock().push(name);
            {
                let mut load = self.load.lock();
                load.0 += 1;
                load.1 = load.1.max(load.0);
            }
            tokio::time::sleep(self.delay).await;
            self.load.lock().0 -= 1;
        }
    }

    #[async_trait]
    impl CropBackend for FakeBackend {
        async fn predict_crop(&self, _image: &ImageRef) -> Result<Classification, FarmieError> {
            self.call("predict_crop").await;
            self.prediction.clone()
        }

        async fn crop_family(&self, _species: &str) -> Result<String, FarmieError> {
            self.call("crop_family").await;
            self.family.clone()
        }

        async fn crop_recommendations(
            &self,
            _species: &str,
            _farm_id: &str,
        ) -> Result<Vec<String>, FarmieError> {
            self.call("crop_recommendation").await;
            self.recommendations.clone()
        }
    }

    fn workflow(backend: &Arc<FakeBackend>) -> RecommendationWorkflow {
        let workflow = RecommendationWorkflow::new(backend.clone());
        workflow.capture_image(ImageRef::jpeg("/tmp/leaf.jpg"));
        workflow
    }

    fn server_error() -> FarmieError {
        FarmieError::Upstream {
            status: 500,
            message: "boom".into(),
        }
    }

    #[tokio::test]
    async fn test_classify_then_recommend() {
        let backend = Arc::new(FakeBackend::tomato());
        let workflow = workflow(&backend);

        let prediction = workflow.classify().await.unwrap().done().unwrap();
        assert_eq!(prediction.family.as_deref(), Some("Solanaceae"));
        assert_eq!(workflow.state(), WorkflowState::Classified);

        let recommendations = workflow
            .request_recommendations(Some("7"))
            .await
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(recommendations.crops(), ["basil", "carrot", "onion"]);
        assert_eq!(workflow.state(), WorkflowState::RecommendationReady);
        assert_eq!(
            backend.calls(),
            vec!["predict_crop", "crop_family", "crop_recommendation"]
        );
    }

    #[tokio::test]
    async fn test_classify_without_image() {
        let backend = Arc::new(FakeBackend::tomato());
        let workflow = RecommendationWorkflow::new(backend.clone());

        let err = workflow.classify().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingContext);
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_classify_failure_skips_family_lookup() {
        let backend = Arc::new(FakeBackend::tomato().with_prediction(Err(server_error())));
        let workflow = workflow(&backend);

        let err = workflow.classify().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(workflow.state(), WorkflowState::ClassifyFailed);
        assert!(workflow.prediction().is_none());
        assert_eq!(workflow.last_error(), Some(server_error()));
        assert_eq!(backend.calls(), vec!["predict_crop"]);
    }

    #[tokio::test]
    async fn test_family_failure_keeps_partial_prediction() {
        let backend = Arc::new(FakeBackend::tomato().with_family(Err(server_error())));
        let workflow = workflow(&backend);

        assert!(workflow.classify().await.is_err());
        assert_eq!(workflow.state(), WorkflowState::FamilyLookupFailed);

        let prediction = workflow.prediction().unwrap();
        assert_eq!(prediction.species, "Tomato");
        assert_eq!(prediction.confidence, 0.92);
        assert!(!prediction.is_complete());

        let err = workflow.request_recommendations(Some("7")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingContext);
        assert_eq!(workflow.state(), WorkflowState::FamilyLookupFailed);
        assert_eq!(backend.calls(), vec!["predict_crop", "crop_family"]);
    }

    #[tokio::test]
    async fn test_retry_after_family_failure() {
        let backend = Arc::new(FakeBackend::tomato().with_family(Err(server_error())));
        let workflow = workflow(&backend);

        assert!(workflow.classify().await.is_err());
        assert!(workflow.classify().await.is_err());
        assert_eq!(
            backend.calls(),
            vec!["predict_crop", "crop_family", "predict_crop", "crop_family"]
        );
    }

    #[tokio::test]
    async fn test_recommendations_require_farm_id() {
        let backend = Arc::new(FakeBackend::tomato());
        let workflow = workflow(&backend);
        workflow.classify().await.unwrap();

        for farm_id in [None, Some(""), Some("   ")] {
            let err = workflow.request_recommendations(farm_id).await.unwrap_err();
            assert_eq!(err, FarmieError::MissingContext("farm id is required"));
        }
        assert_eq!(workflow.state(), WorkflowState::Classified);
        assert!(!backend.calls().contains(&"crop_recommendation"));
    }

    #[tokio::test]
    async fn test_recommendations_require_classification() {
        let backend = Arc::new(FakeBackend::tomato());
        let workflow = workflow(&backend);

        let err = workflow.request_recommendations(Some("7")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingContext);
        assert_eq!(workflow.state(), WorkflowState::ImageCaptured);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_recommendations_are_ready() {
        let backend = Arc::new(FakeBackend::tomato().with_recommendations(Ok(vec![])));
        let workflow = workflow(&backend);
        workflow.classify().await.unwrap();

        let recommendations = workflow
            .request_recommendations(Some("7"))
            .await
            .unwrap()
            .done()
            .unwrap();
        assert!(recommendations.is_empty());
        assert_eq!(workflow.state(), WorkflowState::RecommendationReady);
    }

    #[tokio::test]
    async fn test_recommendation_failure_allows_retry() {
        let backend = Arc::new(FakeBackend::tomato().with_recommendations(Err(FarmieError::Timeout)));
        let workflow = workflow(&backend);
        workflow.classify().await.unwrap();

        assert!(workflow.request_recommendations(Some("7")).await.is_err());
        assert_eq!(workflow.state(), WorkflowState::RecommendationFailed);
        assert!(workflow.recommendations().is_none());
        assert!(workflow.last_error().unwrap().is_retryable());

        assert!(workflow.request_recommendations(Some("7")).await.is_err());
        let recommendation_calls = backend
            .calls()
            .into_iter()
            .filter(|c| *c == "crop_recommendation")
            .count();
        assert_eq!(recommendation_calls, 2);
    }

    #[tokio::test]
    async fn test_unauthenticated_halts_classification() {
        let backend =
            Arc::new(FakeBackend::tomato().with_prediction(Err(FarmieError::Unauthenticated)));
        let workflow = workflow(&backend);

        let err = workflow.classify().await.unwrap_err();
        assert!(err.should_reauthenticate());
        assert_eq!(workflow.state(), WorkflowState::ClassifyFailed);
        assert_eq!(backend.calls(), vec!["predict_crop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_classify_is_ignored() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = workflow(&backend);

        let (first, second) = tokio::join!(workflow.classify(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            workflow.classify().await
        });

        assert!(matches!(first.unwrap(), Submission::Done(_)));
        assert_eq!(second.unwrap(), Submission::AlreadyInFlight);
        assert_eq!(backend.calls(), vec!["predict_crop", "crop_family"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_recommendation_request_is_ignored() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = workflow(&backend);
        workflow.classify().await.unwrap();

        let (first, second) = tokio::join!(workflow.request_recommendations(Some("7")), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(workflow.state(), WorkflowState::RecommendationRequested);
            workflow.request_recommendations(Some("7")).await
        });

        assert!(matches!(first.unwrap(), Submission::Done(_)));
        assert_eq!(second.unwrap(), Submission::AlreadyInFlight);
        assert_eq!(
            backend.calls(),
            vec!["predict_crop", "crop_family", "crop_recommendation"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_is_ignored_while_classifying() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = workflow(&backend);

        let (first, second) = tokio::join!(workflow.classify(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(
                workflow.capture_image(ImageRef::jpeg("/tmp/second.jpg")),
                Submission::AlreadyInFlight
            );
            assert_eq!(workflow.state(), WorkflowState::Classifying);
            workflow.classify().await
        });

        assert!(matches!(first.unwrap(), Submission::Done(_)));
        assert_eq!(second.unwrap(), Submission::AlreadyInFlight);
        assert_eq!(workflow.image().unwrap().upload_name(), "leaf.jpg");
        assert_eq!(backend.calls(), vec!["predict_crop", "crop_family"]);
        assert_eq!(backend.peak_concurrency(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_waits_for_abandoned_upload_before_next_classify() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = workflow(&backend);

        let (late, _) = tokio::join!(workflow.classify(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            workflow.reset();
            assert_eq!(
                workflow.capture_image(ImageRef::jpeg("/tmp/second.jpg")),
                Submission::Done(())
            );
            assert_eq!(workflow.classify().await.unwrap(), Submission::AlreadyInFlight);
        });

        assert_eq!(late.unwrap(), Submission::Superseded);
        assert_eq!(workflow.state(), WorkflowState::ImageCaptured);
        assert!(workflow.prediction().is_none());
        assert_eq!(workflow.image().unwrap().upload_name(), "second.jpg");

        assert!(matches!(workflow.classify().await.unwrap(), Submission::Done(_)));
        assert_eq!(
            backend.calls(),
            vec!["predict_crop", "predict_crop", "crop_family"]
        );
        assert_eq!(backend.peak_concurrency(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_drops_late_recommendations() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = workflow(&backend);
        workflow.classify().await.unwrap();

        let (late, _) = tokio::join!(workflow.request_recommendations(Some("7")), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            workflow.reset();
        });

        assert_eq!(late.unwrap(), Submission::Superseded);
        assert_eq!(workflow.snapshot(), WorkflowSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout_fails_classification() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(60)));
        let workflow = workflow(&backend);

        let err = workflow.classify().await.unwrap_err();
        assert_eq!(err, FarmieError::Timeout);
        assert_eq!(workflow.state(), WorkflowState::ClassifyFailed);
        assert_eq!(workflow.last_error(), Some(FarmieError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_stage_timeout() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = RecommendationWorkflow::new(backend.clone())
            .with_stage_timeout(Duration::from_secs(2));
        workflow.capture_image(ImageRef::jpeg("/tmp/leaf.jpg"));

        assert_eq!(workflow.classify().await.unwrap_err(), FarmieError::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_classification_rolls_back() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = workflow(&backend);

        let abandoned = tokio::time::timeout(Duration::from_secs(1), workflow.classify()).await;
        assert!(abandoned.is_err());
        assert_eq!(workflow.state(), WorkflowState::ImageCaptured);

        assert!(matches!(workflow.classify().await.unwrap(), Submission::Done(_)));
        assert_eq!(workflow.state(), WorkflowState::Classified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_recommendation_request_rolls_back() {
        let backend = Arc::new(FakeBackend::tomato().with_delay(Duration::from_secs(5)));
        let workflow = workflow(&backend);
        workflow.classify().await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            workflow.request_recommendations(Some("7")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(workflow.state(), WorkflowState::Classified);
        assert!(workflow.prediction().unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_capture_after_terminal_state_clears_results() {
        let cases = [
            (
                FakeBackend::tomato().with_prediction(Err(server_error())),
                WorkflowState::ClassifyFailed,
            ),
            (
                FakeBackend::tomato().with_family(Err(server_error())),
                WorkflowState::FamilyLookupFailed,
            ),
            (FakeBackend::tomato(), WorkflowState::RecommendationReady),
            (
                FakeBackend::tomato().with_recommendations(Err(server_error())),
                WorkflowState::RecommendationFailed,
            ),
        ];

        for (backend, terminal) in cases {
            let backend = Arc::new(backend);
            let workflow = workflow(&backend);
            if workflow.classify().await.is_ok() {
                let _ = workflow.request_recommendations(Some("7")).await;
            }
            assert_eq!(workflow.state(), terminal);
            assert!(terminal.is_terminal());

            assert_eq!(
                workflow.capture_image(ImageRef::jpeg("/tmp/next.jpg")),
                Submission::Done(())
            );

            let snapshot = workflow.snapshot();
            assert_eq!(snapshot.state, WorkflowState::ImageCaptured, "from {:?}", terminal);
            assert_eq!(snapshot.image.unwrap().upload_name(), "next.jpg");
            assert!(snapshot.prediction.is_none());
            assert!(snapshot.recommendations.is_none());
            assert!(snapshot.last_error.is_none());
        }
    }

    #[tokio::test]
    async fn test_reclassify_clears_recommendations() {
        let backend = Arc::new(FakeBackend::tomato());
        let workflow = workflow(&backend);
        workflow.classify().await.unwrap();
        workflow.request_recommendations(Some("7")).await.unwrap();

        workflow.classify().await.unwrap();
        assert_eq!(workflow.state(), WorkflowState::Classified);
        assert!(workflow.recommendations().is_none());
    }
}
