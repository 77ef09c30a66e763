//! geofill-cascade library interface
//!
//! Assigns coordinates to photos without GPS metadata by running each photo
//! through a prioritized chain of evidence sources:
//!
//! 1. Landmark recognition
//! 2. Perceptual-hash reuse of an earlier result
//! 3. Web-entity labels resolved through the gazetteer
//! 4. On-image text resolved through the gazetteer
//! 5. Plan seed, last known position, global hint
//!
//! Every candidate is filtered against the photo's bias (plan hint or global
//! hint, 20 km radius). Outcomes are collected in an [`OutcomeLedger`].

pub mod config;
pub mod error;
pub mod gazetteer;
pub mod hint_index;
pub mod ledger;
pub mod phash_cache;
pub mod pipeline;
pub mod plan;
pub mod resolvers;
pub mod services;
pub mod session;
pub mod types;

pub use crate::error::{CascadeError, CascadeResult};
pub use crate::ledger::{ActionKind, OutcomeLedger, OutcomeRecord};
pub use crate::pipeline::{PipelineOptions, ResolutionPipeline};
pub use crate::session::{FolderReport, Session};
