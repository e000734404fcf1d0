//! Reading-order operations bound to an editor session.
//!
//! Planning happens in `koma_core::sequence`; this module applies a plan to
//! the session's collection and drives the writes. Per-annotation writes
//! (`compact`, `set_order`) are awaited one after another and stop at the
//! first failure. Linear moves (`swap_adjacent`, `move_to_position`) send a
//! single reorder request with the full id ordering.

use koma_core::annotation::AnnotationDraft;
use koma_core::repository::AnnotationRepository;
use koma_core::sequence::{self, Direction, OrderChange};
use koma_core::types::AnnotationId;

use crate::error::EditorError;
use crate::store::AnnotationStore;

/// Mutable view over a store's reading sequence.
pub struct SequenceManager<'a, R> {
    store: &'a mut AnnotationStore<R>,
}

impl<'a, R: AnnotationRepository> SequenceManager<'a, R> {
    pub fn new(store: &'a mut AnnotationStore<R>) -> Self {
        Self { store }
    }

    /// Close gaps so the distinct orders become `1..=k`, keeping groups.
    pub async fn compact(&mut self) -> Result<Vec<OrderChange>, EditorError> {
        let page_id = self.store.current_page_id()?;
        let changes = sequence::compact(self.store.annotations_mut()?);
        if changes.is_empty() {
            tracing::debug!(page_id = %page_id, "Orders already contiguous");
            return Ok(changes);
        }

        self.persist_changes(&page_id, &changes, "renumber annotations")
            .await?;

        tracing::info!(page_id = %page_id, changed = changes.len(), "Orders compacted");
        self.store
            .notifications()
            .info(format!("Renumbered {} annotations", changes.len()));
        Ok(changes)
    }

    /// Direct numeric entry: move `id` to `new_order` and close the slot it
    /// left behind.
    ///
    /// Out-of-range values are rejected before anything is written; the
    /// caller reverts its input.
    pub async fn set_order(
        &mut self,
        id: &str,
        new_order: u32,
    ) -> Result<Vec<OrderChange>, EditorError> {
        let page_id = self.store.current_page_id()?;
        let planned = sequence::set_order(self.store.annotations_mut()?, id, new_order);
        let changes = match planned {
            Ok(changes) => changes,
            Err(err) => return Err(self.store.rejected(err)),
        };
        if changes.is_empty() {
            tracing::debug!(page_id = %page_id, annotation_id = %id, "Order unchanged");
            return Ok(changes);
        }

        self.persist_changes(&page_id, &changes, "change order")
            .await?;

        tracing::info!(
            page_id = %page_id,
            annotation_id = %id,
            new_order,
            shifted = changes.len() - 1,
            "Order set"
        );
        self.store
            .notifications()
            .info(format!("Moved to #{new_order}"));
        Ok(changes)
    }

    /// Swap `id` with its neighbour in the reading sequence and renumber the
    /// whole page `1..=N`. Returns `false` when already at the edge.
    pub async fn swap_adjacent(
        &mut self,
        id: &str,
        direction: Direction,
    ) -> Result<bool, EditorError> {
        let planned = sequence::swap_adjacent(self.store.annotations(), id, direction);
        let ids = match planned {
            Ok(Some(ids)) => ids,
            Ok(None) => {
                tracing::debug!(annotation_id = %id, direction = direction.as_str(), "Already at edge");
                return Ok(false);
            }
            Err(err) => return Err(self.store.rejected(err)),
        };
        self.persist_reorder(ids).await?;
        Ok(true)
    }

    /// Move `id` to the 1-based `position` and renumber the whole page.
    /// Returns `false` for the current position or one outside `1..=N`.
    pub async fn move_to_position(
        &mut self,
        id: &str,
        position: usize,
    ) -> Result<bool, EditorError> {
        let planned = sequence::move_to_position(self.store.annotations(), id, position);
        let ids = match planned {
            Ok(Some(ids)) => ids,
            Ok(None) => {
                tracing::debug!(annotation_id = %id, position, "Move is a no-op");
                return Ok(false);
            }
            Err(err) => return Err(self.store.rejected(err)),
        };
        self.persist_reorder(ids).await?;
        Ok(true)
    }

    // -- persistence ----------------------------------------------------------

    /// Apply a full ordering locally, then send it as one reorder request.
    async fn persist_reorder(&mut self, ids: Vec<AnnotationId>) -> Result<(), EditorError> {
        let page_id = self.store.current_page_id()?;
        sequence::apply_reorder(self.store.annotations_mut()?, &ids);

        if let Err(err) = self.store.repository().reorder(&page_id, &ids).await {
            return Err(self.store.persistence_failed("reorder annotations", err));
        }

        tracing::info!(page_id = %page_id, count = ids.len(), "Sequence reordered");
        self.store.notifications().info("Order updated");
        Ok(())
    }

    /// Write each changed annotation in turn, waiting for every write.
    async fn persist_changes(
        &mut self,
        page_id: &str,
        changes: &[OrderChange],
        action: &str,
    ) -> Result<(), EditorError> {
        for change in changes {
            let Some(annotation) = self.store.get(&change.id) else {
                continue;
            };
            let draft = AnnotationDraft::from_annotation(page_id, annotation);
            if let Err(err) = self.store.repository().update(&change.id, &draft).await {
                tracing::warn!(
                    page_id = %page_id,
                    annotation_id = %change.id,
                    from = change.from,
                    to = change.to,
                    "Order write failed"
                );
                return Err(self.store.persistence_failed(action, err));
            }
        }
        Ok(())
    }
}
