//! Landmark recognition resolver
//!
//! Accepts the detector's top landmark when its score reaches the confidence
//! threshold, it carries a coordinate, and that coordinate is inside the
//! photo's bias radius. An out-of-range landmark is rejected without retry.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Attempt, FolderState, PhotoContext, Rejection, Resolution, Resolver};
use crate::ledger::ActionKind;
use crate::phash_cache::CachedResult;
use crate::types::{within_bias, LandmarkDetector};

pub struct LandmarkResolver {
    detector: Arc<dyn LandmarkDetector>,
    min_confidence: f32,
    timeout: Duration,
}

impl LandmarkResolver {
    pub fn new(detector: Arc<dyn LandmarkDetector>, min_confidence: f32, timeout: Duration) -> Self {
        Self {
            detector,
            min_confidence,
            timeout,
        }
    }
}

#[async_trait]
impl Resolver for LandmarkResolver {
    fn name(&self) -> &'static str {
        "landmark"
    }

    async fn attempt(&self, photo: &PhotoContext, _state: &FolderState<'_>) -> Attempt {
        let Some(image) = photo.image.as_deref() else {
            return Attempt::Reject(Rejection::new(ActionKind::LandmarkError, "image unreadable"));
        };

        let candidate = match self.detector.detect_landmark(image, self.timeout).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return Attempt::Reject(Rejection::new(ActionKind::LandmarkEmpty, "")),
            Err(e) => {
                return Attempt::Reject(Rejection::new(ActionKind::LandmarkError, e.to_string()))
            }
        };

        let provider = self.detector.name();
        let Some(coordinate) = candidate.coordinate else {
            return Attempt::Reject(Rejection::new(
                ActionKind::LandmarkEmpty,
                format!("no_location:{}", candidate.label),
            ));
        };
        if candidate.score < self.min_confidence {
            debug!(
                label = %candidate.label,
                score = candidate.score,
                threshold = self.min_confidence,
                "Landmark below confidence threshold"
            );
            return Attempt::Reject(Rejection::new(
                ActionKind::LandmarkEmpty,
                format!("low_confidence:{}:{:.2}", candidate.label, candidate.score),
            ));
        }
        if !within_bias(&coordinate, photo.bias.as_ref()) {
            return Attempt::Reject(Rejection::too_far(
                ActionKind::LandmarkTooFar,
                coordinate,
                format!("[{}:{}:out_of_range]", provider, candidate.label),
            ));
        }

        Attempt::Accept(Resolution {
            action: ActionKind::WriteLandmark,
            coordinate,
            note: format!("detected:{}:{}:{:.2}", provider, candidate.label, candidate.score),
            memory_label: format!("[{}:{}]", provider, candidate.label),
            cache_entry: Some(CachedResult::new(coordinate, candidate.label, provider)),
        })
    }
}
