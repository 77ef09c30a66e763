//! Perceptual-hash reuse resolver
//!
//! Reuses the coordinate accepted for an earlier photo with the same
//! fingerprint. The cached coordinate is re-validated against the current
//! photo's bias, which may differ from the one it was accepted under.

use async_trait::async_trait;

use super::{Attempt, FolderState, PhotoContext, Rejection, Resolution, Resolver};
use crate::ledger::ActionKind;
use crate::types::within_bias;

#[derive(Debug, Clone, Copy, Default)]
pub struct PhashReuseResolver;

#[async_trait]
impl Resolver for PhashReuseResolver {
    fn name(&self) -> &'static str {
        "phash"
    }

    async fn attempt(&self, photo: &PhotoContext, state: &FolderState<'_>) -> Attempt {
        let Some(fingerprint) = photo.fingerprint else {
            return Attempt::Defer;
        };
        let Some(hit) = state.cache.get(&fingerprint) else {
            return Attempt::Defer;
        };

        if !within_bias(&hit.coordinate, photo.bias.as_ref()) {
            return Attempt::Reject(Rejection::too_far(
                ActionKind::SkipPhashTooFar,
                hit.coordinate,
                format!("[phash_out_of_range:{}]", hit.label),
            ));
        }

        Attempt::Accept(Resolution {
            action: ActionKind::WritePhash,
            coordinate: hit.coordinate,
            note: format!("reused_from_phash:{}:{}", hit.label, hit.source),
            memory_label: "[phash]".to_string(),
            cache_entry: None,
        })
    }
}
