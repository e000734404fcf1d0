//! Integration tests for the annotation store: create/update/delete, box
//! commits, page metadata, and reload-on-failure recovery.

mod common;

use assert_matches::assert_matches;
use common::{anno, dialogue_page, loaded_store, orders, page_of, pairs, PAGE};
use koma_core::annotation::{AnnotationType, BodyPartSubtype, SOUND_EFFECT_PLACEHOLDER};
use koma_core::error::CoreError;
use koma_core::geometry::{BoundingBox, DraftBox, EditMode, Handle};
use koma_editor::box_edit::BoxEditSession;
use koma_editor::{AnnotationStore, EditorError, MemoryRepository, NewAnnotation, NotificationBus, NotifyLevel};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn operations_require_a_loaded_page() {
    let mut store = AnnotationStore::new(MemoryRepository::new(), Arc::new(NotificationBus::default()));
    assert!(store.annotations().is_empty());
    let result = store
        .create(NewAnnotation::new(AnnotationType::Dialogue, BoundingBox::new(0.0, 0.0, 50.0, 50.0)))
        .await;
    assert_matches!(result, Err(EditorError::NoPage));
    assert_matches!(store.reload().await, Err(EditorError::NoPage));
}

#[tokio::test]
async fn loading_unknown_page_is_a_persistence_failure() {
    let mut store = AnnotationStore::new(MemoryRepository::new(), Arc::new(NotificationBus::default()));
    let err = store.load("missing").await.unwrap_err();
    assert!(err.requires_reload());
    assert!(store.page().is_none());
}

#[tokio::test]
async fn character_ids_are_distinct_and_sorted() {
    let mut with_ids = Vec::new();
    for (id, character) in [("a", Some("mio")), ("b", Some("aki")), ("c", Some("mio")), ("d", Some(" ")), ("e", None)] {
        let mut a = anno(id, 1, AnnotationType::Person);
        a.character_id = character.map(str::to_string);
        with_ids.push(a);
    }
    let store = loaded_store(page_of(with_ids)).await;
    assert_eq!(store.character_ids(), vec!["aki".to_string(), "mio".to_string()]);
}

#[tokio::test]
async fn labels_follow_groups() {
    let store = loaded_store(dialogue_page(&[("b", 2), ("a", 1), ("c", 2)])).await;
    let labels: Vec<(String, String)> = store
        .labelled()
        .into_iter()
        .map(|(label, a)| (label, a.id.clone()))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("1".into(), "a".into()),
            ("2-1".into(), "b".into()),
            ("2-2".into(), "c".into()),
        ]
    );
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_appends_with_clamped_box_and_encoded_text() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 3)])).await;

    let mut draft = DraftBox::start(100.0, 100.0);
    draft.update(90.0, 110.0);
    let bbox = draft.finish().expect("larger than 5px");

    let created = store
        .create(NewAnnotation::new(AnnotationType::Dialogue, bbox).with_text("|東京{とうきょう}の猫"))
        .await
        .unwrap();

    assert_eq!(created.order, 4);
    assert_eq!(created.bbox, BoundingBox::new(90.0, 100.0, 20.0, 20.0));
    assert_eq!(created.text, "<ruby>東京<rt>とうきょう</rt></ruby>の猫");
    assert!(store.get(&created.id).is_some());
    assert_eq!(store.display_text(&created.id).as_deref(), Some("東京{とうきょう}の猫"));
}

#[test]
fn tiny_drafts_are_discarded_before_create() {
    let mut draft = DraftBox::start(10.0, 10.0);
    draft.update(14.0, 40.0);
    assert!(draft.finish().is_none());
}

#[tokio::test]
async fn create_normalises_sound_effect_and_subtype() {
    let mut store = loaded_store(dialogue_page(&[])).await;
    let bbox = BoundingBox::new(0.0, 0.0, 30.0, 30.0);

    let sfx = store
        .create(NewAnnotation::new(AnnotationType::SoundEffect, bbox).with_subtype(BodyPartSubtype::Penis))
        .await
        .unwrap();
    assert_eq!(sfx.text, SOUND_EFFECT_PLACEHOLDER);
    assert_eq!(sfx.subtype, None);
    assert_eq!(sfx.order, 1);

    let part = store
        .create(NewAnnotation::new(AnnotationType::BodyPart, bbox))
        .await
        .unwrap();
    assert_eq!(part.subtype, Some(BodyPartSubtype::Other));
}

#[tokio::test]
async fn create_at_occupied_order_shifts_and_reloads() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 2), ("c", 3)])).await;
    let created = store
        .create(
            NewAnnotation::new(AnnotationType::Narration, BoundingBox::new(0.0, 0.0, 30.0, 30.0))
                .with_order(2),
        )
        .await
        .unwrap();

    assert_eq!(created.order, 2);
    assert_eq!(
        orders(store.annotations()),
        pairs(&[("a", 1), (created.id.as_str(), 2), ("b", 3), ("c", 4)])
    );
}

#[tokio::test]
async fn create_with_out_of_range_order_is_rejected_locally() {
    let mut store = loaded_store(dialogue_page(&[("a", 1)])).await;
    let result = store
        .create(
            NewAnnotation::new(AnnotationType::Dialogue, BoundingBox::new(0.0, 0.0, 30.0, 30.0))
                .with_order(5),
        )
        .await;
    let err = result.unwrap_err();
    assert_matches!(err, EditorError::Core(CoreError::Validation(_)));
    assert!(!err.requires_reload());
    assert_eq!(store.repository().stored().await.annotations.len(), 1);
}

#[tokio::test]
async fn failed_create_notifies_and_requests_reload() {
    let mut store = loaded_store(dialogue_page(&[("a", 1)])).await;
    let mut rx = store.notifications().subscribe();
    store.repository().fail_create(true);

    let err = store
        .create(NewAnnotation::new(AnnotationType::Dialogue, BoundingBox::new(0.0, 0.0, 30.0, 30.0)))
        .await
        .unwrap_err();

    assert!(err.requires_reload());
    let note = rx.recv().await.unwrap();
    assert_eq!(note.level, NotifyLevel::Error);
    assert!(note.message.contains("create annotation"));
    assert_eq!(store.annotations().len(), 1);
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retype_drops_or_defaults_subtype() {
    let mut page = dialogue_page(&[("a", 1)]);
    page.annotations[0].kind = AnnotationType::BodyPart;
    page.annotations[0].subtype = Some(BodyPartSubtype::Vagina);
    let mut store = loaded_store(page).await;

    let person = store.retype("a", AnnotationType::Person, Some(BodyPartSubtype::Vagina)).await.unwrap();
    assert_eq!(person.subtype, None);
    let part = store.retype("a", AnnotationType::BodyPart, None).await.unwrap();
    assert_eq!(part.subtype, Some(BodyPartSubtype::Other));
    assert_eq!(store.repository().stored().await.annotations[0].kind, AnnotationType::BodyPart);
}

#[tokio::test]
async fn set_character_ignores_blank_ids() {
    let mut store = loaded_store(dialogue_page(&[("a", 1)])).await;
    let updated = store.set_character("a", Some("hero".into())).await.unwrap();
    assert_eq!(updated.character_id.as_deref(), Some("hero"));
    let cleared = store.set_character("a", Some("  ".into())).await.unwrap();
    assert_eq!(cleared.character_id, None);
}

#[tokio::test]
async fn delete_keeps_remaining_orders() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 2), ("c", 3)])).await;
    store.delete("b").await.unwrap();
    assert_eq!(orders(store.annotations()), pairs(&[("a", 1), ("c", 3)]));
    assert_eq!(
        orders(&store.repository().stored().await.annotations),
        pairs(&[("a", 1), ("c", 3)])
    );
    assert_matches!(
        store.delete("b").await,
        Err(EditorError::Core(CoreError::NotFound { .. }))
    );
}

#[tokio::test]
async fn failed_update_recovers_authoritative_state() {
    let mut store = loaded_store(dialogue_page(&[("a", 1)])).await;
    store.repository().fail_update_at(1);

    let err = store.update_text("a", "new text").await.unwrap_err();
    assert!(err.requires_reload());
    assert!(store.recover(&err).await.unwrap());
    assert_eq!(store.get("a").unwrap().text, "");

    let validation = EditorError::Core(CoreError::Validation("x".into()));
    assert!(!store.recover(&validation).await.unwrap());
}

// ---------------------------------------------------------------------------
// Box edits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resize_commits_only_on_release_with_floor() {
    let mut page = page_of(vec![anno("a", 1, AnnotationType::Panel)]);
    page.annotations[0].bbox = BoundingBox::new(100.0, 100.0, 200.0, 100.0);
    let mut store = loaded_store(page).await;

    let mut session = BoxEditSession::pick(store.annotations(), None, 100.0, 100.0).unwrap();
    assert_eq!(session.mode(), EditMode::Resize(Handle::NorthWest));
    session.preview(150.0, 150.0);
    assert_eq!(store.repository().update_calls(), 0);

    let committed = session.commit(&mut store, 350.0, 250.0).await.unwrap().unwrap();
    assert_eq!(committed.bbox, BoundingBox::new(280.0, 180.0, 20.0, 20.0));
    assert_eq!(store.repository().stored().await.annotations[0].bbox, committed.bbox);
    assert_eq!(store.repository().update_calls(), 1);
}

#[tokio::test]
async fn unchanged_or_cancelled_edit_writes_nothing() {
    let mut store = loaded_store(dialogue_page(&[("a", 1)])).await;
    let session = BoxEditSession::pick(store.annotations(), Some("a"), 30.0, 30.0).unwrap();
    assert_eq!(session.commit(&mut store, 30.0, 30.0).await.unwrap(), None);

    let mut session = BoxEditSession::pick(store.annotations(), Some("a"), 30.0, 30.0).unwrap();
    session.preview(80.0, 80.0);
    let original = session.cancel();
    assert_eq!(original, store.get("a").unwrap().bbox);
    assert_eq!(store.repository().update_calls(), 0);
}

// ---------------------------------------------------------------------------
// Page metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_and_status_are_persisted() {
    let mut store = loaded_store(dialogue_page(&[])).await;
    store.update_summary("Two characters argue").await.unwrap();
    store.set_completed(true).await.unwrap();

    let stored = store.repository().stored().await;
    assert_eq!(stored.page_summary.as_deref(), Some("Two characters argue"));
    assert!(stored.is_completed);
    assert!(store.page().unwrap().is_completed);
    assert_eq!(store.page_id(), Some(PAGE));
}
