//! Web-entity label resolver
//!
//! Best-guess labels and web entities for the image are deduplicated and the
//! first few fed to the gazetteer under the photo's bias constraints.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{dedup_labels, Attempt, FolderState, PhotoContext, Rejection, Resolution, Resolver};
use crate::gazetteer::{Gazetteer, LookupConstraints};
use crate::ledger::ActionKind;
use crate::phash_cache::CachedResult;
use crate::types::WebEntityDetector;

/// Labels tried per photo
pub const MAX_WEB_CANDIDATES: usize = 8;

pub struct WebEntityResolver {
    detector: Arc<dyn WebEntityDetector>,
    gazetteer: Arc<Gazetteer>,
    timeout: Duration,
}

impl WebEntityResolver {
    pub fn new(detector: Arc<dyn WebEntityDetector>, gazetteer: Arc<Gazetteer>, timeout: Duration) -> Self {
        Self {
            detector,
            gazetteer,
            timeout,
        }
    }
}

#[async_trait]
impl Resolver for WebEntityResolver {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn attempt(&self, photo: &PhotoContext, _state: &FolderState<'_>) -> Attempt {
        let Some(image) = photo.image.as_deref() else {
            return Attempt::Reject(Rejection::new(ActionKind::WebError, "image unreadable"));
        };

        let labels = match self.detector.detect_web_labels(image, self.timeout).await {
            Ok(labels) => dedup_labels(labels),
            Err(e) => return Attempt::Reject(Rejection::new(ActionKind::WebError, e.to_string())),
        };
        if labels.is_empty() {
            return Attempt::Reject(Rejection::new(ActionKind::WebEmpty, ""));
        }

        let constraints = LookupConstraints::from_bias(photo.bias.as_ref());
        let tried = labels.len().min(MAX_WEB_CANDIDATES);
        for label in labels.into_iter().take(MAX_WEB_CANDIDATES) {
            if let Some(found) = self.gazetteer.resolve(&label, &constraints).await {
                let source = found.source.to_string();
                return Attempt::Accept(Resolution {
                    action: ActionKind::WriteWeb,
                    coordinate: found.coordinate,
                    note: format!("derived_from_web:{}:{}", found.label, source),
                    memory_label: format!("[web:{}]", found.label),
                    cache_entry: Some(CachedResult::new(found.coordinate, found.label, source)),
                });
            }
            debug!(label = %label, "Web label did not resolve");
        }

        Attempt::Reject(Rejection::new(
            ActionKind::WebUnresolved,
            format!("{} labels tried", tried),
        ))
    }
}
