//! Integration tests for reading-order operations driven through a session.

mod common;

use assert_matches::assert_matches;
use common::{dialogue_page, loaded_store, orders, pairs};
use koma_core::error::CoreError;
use koma_core::sequence::Direction;
use koma_editor::{EditorError, NotifyLevel};

// ---------------------------------------------------------------------------
// compact
// ---------------------------------------------------------------------------

#[tokio::test]
async fn compact_writes_each_changed_annotation() {
    let mut store = loaded_store(dialogue_page(&[("a", 2), ("b", 5), ("c", 5), ("d", 9)])).await;
    let changes = store.sequence().compact().await.unwrap();

    assert_eq!(changes.len(), 4);
    assert_eq!(store.repository().update_calls(), 4);
    let expected = pairs(&[("a", 1), ("b", 2), ("c", 2), ("d", 3)]);
    assert_eq!(orders(store.annotations()), expected);
    assert_eq!(orders(&store.repository().stored().await.annotations), expected);
}

#[tokio::test]
async fn compact_of_contiguous_page_writes_nothing() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 1), ("c", 2)])).await;
    assert!(store.sequence().compact().await.unwrap().is_empty());
    assert_eq!(store.repository().update_calls(), 0);
}

// ---------------------------------------------------------------------------
// set_order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_order_forms_group() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 2), ("c", 3)])).await;
    store.sequence().set_order("c", 1).await.unwrap();

    let expected = pairs(&[("a", 1), ("b", 2), ("c", 1)]);
    assert_eq!(orders(store.annotations()), expected);
    assert_eq!(orders(&store.repository().stored().await.annotations), expected);
    assert_eq!(store.repository().update_calls(), 1);

    let labels: Vec<String> = store.labelled().into_iter().map(|(l, _)| l).collect();
    assert_eq!(labels, vec!["1-1", "1-2", "2"]);
}

#[tokio::test]
async fn set_order_shifts_after_old_slot() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 2), ("c", 3)])).await;
    let changes = store.sequence().set_order("a", 3).await.unwrap();

    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0].id, "a");
    assert_eq!(
        orders(&store.repository().stored().await.annotations),
        pairs(&[("a", 3), ("b", 1), ("c", 2)])
    );
}

#[tokio::test]
async fn set_order_out_of_range_is_rejected_without_writes() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 2)])).await;
    let mut rx = store.notifications().subscribe();

    let err = store.sequence().set_order("a", 4).await.unwrap_err();
    assert_matches!(err, EditorError::Core(CoreError::Validation(_)));
    assert!(!err.requires_reload());
    assert_eq!(store.repository().update_calls(), 0);
    assert_eq!(orders(store.annotations()), pairs(&[("a", 1), ("b", 2)]));
    assert_eq!(rx.recv().await.unwrap().level, NotifyLevel::Error);
}

#[tokio::test]
async fn set_order_stops_at_first_failed_write() {
    let mut store =
        loaded_store(dialogue_page(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)])).await;
    store.repository().fail_update_at(2);

    let err = store.sequence().set_order("a", 4).await.unwrap_err();
    assert!(err.requires_reload());
    assert_eq!(store.repository().update_calls(), 2);

    assert!(store.recover(&err).await.unwrap());
    assert_eq!(
        orders(store.annotations()),
        pairs(&[("a", 4), ("b", 2), ("c", 3), ("d", 4)])
    );
}

// ---------------------------------------------------------------------------
// Linear moves
// ---------------------------------------------------------------------------

#[tokio::test]
async fn swap_adjacent_linearizes_groups() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 1), ("c", 2)])).await;
    assert!(store.sequence().swap_adjacent("c", Direction::Up).await.unwrap());

    let expected = pairs(&[("a", 1), ("c", 2), ("b", 3)]);
    assert_eq!(orders(store.annotations()), expected);
    assert_eq!(orders(&store.repository().stored().await.annotations), expected);
    assert_eq!(store.repository().reorder_calls(), 1);
}

#[tokio::test]
async fn swap_at_edge_is_noop() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 2)])).await;
    assert!(!store.sequence().swap_adjacent("a", Direction::Up).await.unwrap());
    assert!(!store.sequence().swap_adjacent("b", Direction::Down).await.unwrap());
    assert_eq!(store.repository().reorder_calls(), 0);
}

#[tokio::test]
async fn swap_unknown_id_is_rejected() {
    let mut store = loaded_store(dialogue_page(&[("a", 1)])).await;
    let err = store
        .sequence()
        .swap_adjacent("zz", Direction::Down)
        .await
        .unwrap_err();
    assert_matches!(err, EditorError::Core(CoreError::NotFound { .. }));
}

#[tokio::test]
async fn move_to_position_reinserts_and_renumbers() {
    let mut store =
        loaded_store(dialogue_page(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)])).await;
    assert!(store.sequence().move_to_position("d", 2).await.unwrap());
    assert_eq!(
        orders(&store.repository().stored().await.annotations),
        pairs(&[("a", 1), ("d", 2), ("b", 3), ("c", 4)])
    );

    assert!(!store.sequence().move_to_position("d", 2).await.unwrap());
    assert!(!store.sequence().move_to_position("d", 0).await.unwrap());
    assert!(!store.sequence().move_to_position("d", 5).await.unwrap());
    assert_eq!(store.repository().reorder_calls(), 1);
}

#[tokio::test]
async fn failed_reorder_is_undone_by_reload() {
    let mut store = loaded_store(dialogue_page(&[("a", 1), ("b", 2), ("c", 3)])).await;
    store.repository().fail_reorder(true);

    let err = store
        .sequence()
        .swap_adjacent("b", Direction::Down)
        .await
        .unwrap_err();
    assert!(err.requires_reload());
    assert_eq!(orders(store.annotations()), pairs(&[("a", 1), ("c", 2), ("b", 3)]));

    store.recover(&err).await.unwrap();
    assert_eq!(orders(store.annotations()), pairs(&[("a", 1), ("b", 2), ("c", 3)]));
}
