//! Fallback resolvers used when no image evidence resolved
//!
//! - **PlanSeedResolver:** the plan's hint for this photo's index
//! - **LastKnownResolver:** the folder's most recent accepted position
//! - **HintSeedResolver:** the global `--hint`, only when no plan was given

use async_trait::async_trait;

use super::{Attempt, FolderState, PhotoContext, Rejection, Resolution, Resolver};
use crate::ledger::ActionKind;
use crate::types::within_bias;

/// Assigns the plan hint for the photo's index
///
/// Plan seeds are trusted as-is: they are the bias, so no radius check applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanSeedResolver;

#[async_trait]
impl Resolver for PlanSeedResolver {
    fn name(&self) -> &'static str {
        "plan_seed"
    }

    async fn attempt(&self, photo: &PhotoContext, state: &FolderState<'_>) -> Attempt {
        if !state.hints.has_plan {
            return Attempt::Defer;
        }
        let Some(hint) = state.hints.index.lookup(photo.index) else {
            return Attempt::Defer;
        };

        Attempt::Accept(Resolution {
            action: ActionKind::WritePlanSeed,
            coordinate: hint.coordinate,
            note: format!("assigned_hint_seed_file:{}", hint.name),
            memory_label: format!("[seed-hint-file:{}]", hint.name),
            cache_entry: None,
        })
    }
}

/// Inherits the last accepted coordinate, subject to the photo's bias
#[derive(Debug, Clone, Copy, Default)]
pub struct LastKnownResolver;

#[async_trait]
impl Resolver for LastKnownResolver {
    fn name(&self) -> &'static str {
        "last_known"
    }

    async fn attempt(&self, photo: &PhotoContext, state: &FolderState<'_>) -> Attempt {
        let Some(last) = state.last_known else {
            return Attempt::Defer;
        };

        if !within_bias(&last.coordinate, photo.bias.as_ref()) {
            return Attempt::Reject(Rejection::too_far(
                ActionKind::SkipLastKnownTooFar,
                last.coordinate,
                format!("[last_known_out_of_range:{}]", last.label),
            ));
        }

        Attempt::Accept(Resolution {
            action: ActionKind::WriteLastKnown,
            coordinate: last.coordinate,
            note: format!("assigned_last_known:{}", last.label),
            memory_label: last.label.clone(),
            cache_entry: None,
        })
    }
}

/// Assigns the global hint when the run has no plan
#[derive(Debug, Clone, Copy, Default)]
pub struct HintSeedResolver;

#[async_trait]
impl Resolver for HintSeedResolver {
    fn name(&self) -> &'static str {
        "hint_seed"
    }

    async fn attempt(&self, _photo: &PhotoContext, state: &FolderState<'_>) -> Attempt {
        if state.hints.has_plan {
            return Attempt::Defer;
        }
        let Some(hint) = &state.hints.global else {
            return Attempt::Defer;
        };

        Attempt::Accept(Resolution {
            action: ActionKind::WriteHintSeed,
            coordinate: hint.coordinate,
            note: format!("assigned_hint_seed:{}", hint.name),
            memory_label: format!("[seed-hint:{}]", hint.name),
            cache_entry: None,
        })
    }
}
