//! Page-wide OCR and tagging runs.
//!
//! Targets are processed one at a time in reading order. Each result is
//! committed through the store as the annotation's new text; a failure is
//! recorded and the run moves on.

use std::time::Duration;

use koma_core::recognition::{validate_threshold, BatchReport, Tagger, TextRecognizer};
use koma_core::repository::AnnotationRepository;
use koma_core::sequence;
use koma_core::types::AnnotationId;

use crate::error::EditorError;
use crate::store::AnnotationStore;

/// Default pause between two recognition calls.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(200);

fn targets<R: AnnotationRepository>(
    store: &AnnotationStore<R>,
    include: impl Fn(&koma_core::annotation::Annotation) -> bool,
) -> Vec<AnnotationId> {
    sequence::reading_sequence(store.annotations())
        .into_iter()
        .filter(|a| include(a))
        .map(|a| a.id.clone())
        .collect()
}

fn announce<R: AnnotationRepository>(store: &AnnotationStore<R>, what: &str, report: &BatchReport) {
    let message = format!("{what}: {}", report.summary());
    if report.failed() == 0 {
        store.notifications().info(message);
    } else {
        store.notifications().error(message);
    }
}

/// Re-run OCR over every text annotation on the loaded page.
pub async fn run_batch_ocr<R, O>(
    store: &mut AnnotationStore<R>,
    ocr: &O,
    pause: Duration,
) -> Result<BatchReport, EditorError>
where
    R: AnnotationRepository,
    O: TextRecognizer,
{
    let page_id = store.current_page_id()?;
    let ids = targets(store, |a| a.kind.is_ocr_target());
    let mut report = BatchReport::default();
    tracing::info!(page_id = %page_id, targets = ids.len(), "Batch OCR started");

    for (i, id) in ids.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let Some(bbox) = store.get(id).map(|a| a.bbox) else {
            report.record_failure(id.as_str(), "annotation disappeared");
            continue;
        };
        let outcome = match ocr.recognize_text(&page_id, &bbox).await {
            Ok(text) => store.update_text(id, &text).await.map(|_| ()),
            Err(err) => Err(err.into()),
        };
        match outcome {
            Ok(()) => report.record_success(),
            Err(err) => {
                tracing::warn!(page_id = %page_id, annotation_id = %id, error = %err, "OCR failed");
                report.record_failure(id.as_str(), err.to_string());
            }
        }
    }

    tracing::info!(
        page_id = %page_id,
        attempted = report.attempted,
        succeeded = report.succeeded,
        "Batch OCR finished"
    );
    announce(store, "OCR", &report);
    Ok(report)
}

/// Re-run the tagger over every person, body part and object annotation.
///
/// The annotation's own type is sent as the classification hint.
pub async fn run_batch_tagging<R, T>(
    store: &mut AnnotationStore<R>,
    tagger: &T,
    threshold: f64,
    pause: Duration,
) -> Result<BatchReport, EditorError>
where
    R: AnnotationRepository,
    T: Tagger,
{
    let page_id = store.current_page_id()?;
    validate_threshold(threshold).map_err(|e| store.rejected(e))?;
    let ids = targets(store, |a| a.kind.is_tagger_target());
    let mut report = BatchReport::default();
    tracing::info!(page_id = %page_id, targets = ids.len(), threshold, "Batch tagging started");

    for (i, id) in ids.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let Some((bbox, hint)) = store.get(id).map(|a| (a.bbox, a.kind)) else {
            report.record_failure(id.as_str(), "annotation disappeared");
            continue;
        };
        let outcome = match tagger.tag(&page_id, &bbox, threshold, hint).await {
            Ok(result) => store.update_text(id, &result.text).await.map(|_| ()),
            Err(err) => Err(err.into()),
        };
        match outcome {
            Ok(()) => report.record_success(),
            Err(err) => {
                tracing::warn!(page_id = %page_id, annotation_id = %id, error = %err, "Tagging failed");
                report.record_failure(id.as_str(), err.to_string());
            }
        }
    }

    tracing::info!(
        page_id = %page_id,
        attempted = report.attempted,
        succeeded = report.succeeded,
        "Batch tagging finished"
    );
    announce(store, "Tagging", &report);
    Ok(report)
}
