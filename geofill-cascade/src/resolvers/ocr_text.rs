//! On-image text resolver
//!
//! Signs and plaques often name the place outright. Detected text is split
//! into lines, longest first, sanitized and fed to the gazetteer.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Attempt, FolderState, PhotoContext, Rejection, Resolution, Resolver};
use crate::gazetteer::{Gazetteer, LookupConstraints};
use crate::ledger::ActionKind;
use crate::phash_cache::CachedResult;
use crate::types::TextDetector;

/// Text lines tried per photo
pub const MAX_OCR_CANDIDATES: usize = 5;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || ('\u{C0}'..='\u{FF}').contains(&c)
        || matches!(c, ' ' | '\'' | '\u{2019}' | '&' | '-' | ',' | '.')
}

/// Replace anything outside letters, digits and light punctuation with spaces
pub fn sanitize_line(line: &str) -> String {
    let cleaned: String = line.chars().map(|c| if is_allowed(c) { c } else { ' ' }).collect();
    cleaned.trim().to_string()
}

/// The `limit` longest lines, longest first (stable), sanitized
///
/// Lines that sanitize to nothing are dropped without pulling in a shorter one.
pub fn candidate_lines(text: &str, limit: usize) -> Vec<String> {
    let mut lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines.sort_by_key(|l| std::cmp::Reverse(l.chars().count()));
    lines
        .into_iter()
        .take(limit)
        .map(sanitize_line)
        .filter(|l| !l.is_empty())
        .collect()
}

pub struct OcrTextResolver {
    detector: Arc<dyn TextDetector>,
    gazetteer: Arc<Gazetteer>,
    timeout: Duration,
}

impl OcrTextResolver {
    pub fn new(detector: Arc<dyn TextDetector>, gazetteer: Arc<Gazetteer>, timeout: Duration) -> Self {
        Self {
            detector,
            gazetteer,
            timeout,
        }
    }
}

#[async_trait]
impl Resolver for OcrTextResolver {
    fn name(&self) -> &'static str {
        "ocr"
    }

    async fn attempt(&self, photo: &PhotoContext, _state: &FolderState<'_>) -> Attempt {
        let Some(image) = photo.image.as_deref() else {
            return Attempt::Reject(Rejection::new(ActionKind::OcrError, "image unreadable"));
        };

        let text = match self.detector.detect_text(image, self.timeout).await {
            Ok(Some(text)) => text,
            Ok(None) => return Attempt::Reject(Rejection::new(ActionKind::OcrEmpty, "")),
            Err(e) => return Attempt::Reject(Rejection::new(ActionKind::OcrError, e.to_string())),
        };

        let lines = candidate_lines(&text, MAX_OCR_CANDIDATES);
        if lines.is_empty() {
            return Attempt::Reject(Rejection::new(ActionKind::OcrEmpty, ""));
        }

        let constraints = LookupConstraints::from_bias(photo.bias.as_ref());
        for line in &lines {
            if let Some(found) = self.gazetteer.resolve(line, &constraints).await {
                let source = found.source.to_string();
                return Attempt::Accept(Resolution {
                    action: ActionKind::WriteOcr,
                    coordinate: found.coordinate,
                    note: format!("derived_from_ocr:{}:{}", found.label, source),
                    memory_label: format!("[ocr:{}]", found.label),
                    cache_entry: Some(CachedResult::new(found.coordinate, found.label, source)),
                });
            }
            debug!(line = %line, "Text line did not resolve");
        }

        Attempt::Reject(Rejection::new(
            ActionKind::OcrUnresolved,
            format!("{} lines tried", lines.len()),
        ))
    }
}
