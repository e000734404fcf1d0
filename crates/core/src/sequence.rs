//! Reading-order sequencing.
//!
//! Pure planners over a page's annotation list. Each planner mutates the
//! in-memory list and reports which annotations changed, in the order the
//! changes must be persisted; the editor crate drives the actual writes.
//!
//! Annotations sharing an `order` form a group. Groups are derived on every
//! read: members are ranked by ascending `id` and labelled `order-rank`.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::annotation::{Annotation, AnnotationType};
use crate::error::CoreError;
use crate::types::AnnotationId;

/// One annotation's order moving from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChange {
    pub id: AnnotationId,
    pub from: u32,
    pub to: u32,
}

/// Direction of a single-step move in the reading sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(CoreError::Validation(format!(
                "Invalid direction '{s}'. Must be one of: up, down"
            ))),
        }
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "Annotation",
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Reading views
// ---------------------------------------------------------------------------

/// Largest order on the page, `0` when empty.
pub fn max_order(annotations: &[Annotation]) -> u32 {
    annotations.iter().map(|a| a.order).max().unwrap_or(0)
}

/// Order given to an annotation appended at the end.
pub fn next_order(annotations: &[Annotation]) -> u32 {
    max_order(annotations) + 1
}

/// Annotations sorted by `(order, id)`.
pub fn reading_sequence(annotations: &[Annotation]) -> Vec<&Annotation> {
    let mut seq: Vec<&Annotation> = annotations.iter().collect();
    seq.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    seq
}

/// Ids in reading order.
pub fn sequence_ids(annotations: &[Annotation]) -> Vec<AnnotationId> {
    reading_sequence(annotations)
        .into_iter()
        .map(|a| a.id.clone())
        .collect()
}

/// 1-based rank of `id` within its group and the group size.
pub fn group_rank(annotations: &[Annotation], id: &str) -> Option<(usize, usize)> {
    let target = annotations.iter().find(|a| a.id == id)?;
    let mut members: Vec<&str> = annotations
        .iter()
        .filter(|a| a.order == target.order)
        .map(|a| a.id.as_str())
        .collect();
    members.sort_unstable();
    let rank = members.iter().position(|m| *m == id)? + 1;
    Some((rank, members.len()))
}

/// Display label: `"3"` for a lone annotation, `"3-2"` for the second
/// member (by id) of the group at order 3.
pub fn group_label(annotations: &[Annotation], id: &str) -> Option<String> {
    let order = annotations.iter().find(|a| a.id == id)?.order;
    let (rank, size) = group_rank(annotations, id)?;
    Some(if size > 1 {
        format!("{order}-{rank}")
    } else {
        order.to_string()
    })
}

/// Reading sequence paired with group labels.
pub fn labelled_sequence(annotations: &[Annotation]) -> Vec<(String, &Annotation)> {
    let mut sizes: BTreeMap<u32, usize> = BTreeMap::new();
    for a in annotations {
        *sizes.entry(a.order).or_default() += 1;
    }

    let mut out = Vec::with_capacity(annotations.len());
    let mut current: Option<(u32, usize)> = None;
    for a in reading_sequence(annotations) {
        let rank = match current {
            Some((order, rank)) if order == a.order => rank + 1,
            _ => 1,
        };
        current = Some((a.order, rank));
        let label = if sizes.get(&a.order).copied().unwrap_or(1) > 1 {
            format!("{}-{rank}", a.order)
        } else {
            a.order.to_string()
        };
        out.push((label, a));
    }
    out
}

// ---------------------------------------------------------------------------
// Compaction
// ---------------------------------------------------------------------------

/// Map from each distinct order to its compacted value, or `None` when the
/// distinct orders already are `1..=k`.
pub fn compaction_map(annotations: &[Annotation]) -> Option<BTreeMap<u32, u32>> {
    let distinct: BTreeSet<u32> = annotations.iter().map(|a| a.order).collect();
    let contiguous = distinct
        .iter()
        .enumerate()
        .all(|(i, order)| *order as usize == i + 1);
    if contiguous {
        return None;
    }
    Some(
        distinct
            .into_iter()
            .enumerate()
            .map(|(i, old)| (old, i as u32 + 1))
            .collect(),
    )
}

/// Close gaps so the distinct orders become `1..=k`.
///
/// Orders are remapped by value, so annotations that shared an order still
/// share one afterwards. Changes are reported in reading order.
pub fn compact(annotations: &mut [Annotation]) -> Vec<OrderChange> {
    let Some(mapping) = compaction_map(annotations) else {
        return Vec::new();
    };

    let mut changes = Vec::new();
    for a in annotations.iter_mut() {
        let to = mapping.get(&a.order).copied().unwrap_or(a.order);
        if to != a.order {
            changes.push(OrderChange {
                id: a.id.clone(),
                from: a.order,
                to,
            });
            a.order = to;
        }
    }
    changes.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.id.cmp(&b.id)));
    changes
}

// ---------------------------------------------------------------------------
// Direct order entry
// ---------------------------------------------------------------------------

/// Accept `1 <= new_order <= max + 1`.
pub fn validate_new_order(annotations: &[Annotation], new_order: u32) -> Result<(), CoreError> {
    let upper = next_order(annotations);
    if new_order < 1 || new_order > upper {
        return Err(CoreError::Validation(format!(
            "order must be between 1 and {upper}, got {new_order}"
        )));
    }
    Ok(())
}

/// Give `id` the order `new_order`, then pull every other annotation that
/// sat after the target's old slot down by one.
///
/// The shift is keyed on the *old* order regardless of where the target
/// lands, so the result may contain a duplicate at `new_order` (a new group)
/// or a gap. The first change is the target; the rest follow ascending.
pub fn set_order(
    annotations: &mut [Annotation],
    id: &str,
    new_order: u32,
) -> Result<Vec<OrderChange>, CoreError> {
    validate_new_order(annotations, new_order)?;
    let target = annotations
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| not_found(id))?;

    let old_order = target.order;
    if old_order == new_order {
        return Ok(Vec::new());
    }
    target.order = new_order;

    let mut changes = vec![OrderChange {
        id: id.to_string(),
        from: old_order,
        to: new_order,
    }];

    let mut trailing: Vec<&mut Annotation> = annotations
        .iter_mut()
        .filter(|a| a.id != id && a.order > old_order)
        .collect();
    trailing.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    for a in trailing {
        changes.push(OrderChange {
            id: a.id.clone(),
            from: a.order,
            to: a.order - 1,
        });
        a.order -= 1;
    }

    Ok(changes)
}

// ---------------------------------------------------------------------------
// Linear moves
// ---------------------------------------------------------------------------

/// New id ordering after swapping `id` with its neighbour, or `None` when it
/// is already first (`Up`) or last (`Down`).
pub fn swap_adjacent(
    annotations: &[Annotation],
    id: &str,
    direction: Direction,
) -> Result<Option<Vec<AnnotationId>>, CoreError> {
    let mut ids = sequence_ids(annotations);
    let index = ids.iter().position(|a| a == id).ok_or_else(|| not_found(id))?;

    let neighbour = match direction {
        Direction::Up if index == 0 => return Ok(None),
        Direction::Up => index - 1,
        Direction::Down if index + 1 == ids.len() => return Ok(None),
        Direction::Down => index + 1,
    };
    ids.swap(index, neighbour);
    Ok(Some(ids))
}

/// New id ordering after moving `id` to the 1-based `position`, or `None`
/// when the position is its current one or outside `1..=len`.
pub fn move_to_position(
    annotations: &[Annotation],
    id: &str,
    position: usize,
) -> Result<Option<Vec<AnnotationId>>, CoreError> {
    let mut ids = sequence_ids(annotations);
    let index = ids.iter().position(|a| a == id).ok_or_else(|| not_found(id))?;

    if position < 1 || position > ids.len() || position - 1 == index {
        return Ok(None);
    }
    let moved = ids.remove(index);
    ids.insert(position - 1, moved);
    Ok(Some(ids))
}

/// Renumber by an explicit id ordering.
///
/// Listed ids get `1..=k` in list order (unknown ids are skipped); unlisted
/// annotations follow in their current list position. The list itself is
/// rearranged to match.
pub fn apply_reorder(annotations: &mut Vec<Annotation>, ids: &[AnnotationId]) -> Vec<OrderChange> {
    let mut pool: Vec<Option<Annotation>> = annotations.drain(..).map(Some).collect();
    let mut arranged: Vec<Annotation> = Vec::with_capacity(pool.len());
    let mut seen: HashSet<&str> = HashSet::new();

    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(slot) = pool
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|a| &a.id == id))
        {
            arranged.extend(slot.take());
        }
    }
    arranged.extend(pool.into_iter().flatten());

    let mut changes = Vec::new();
    for (i, a) in arranged.iter_mut().enumerate() {
        let to = i as u32 + 1;
        if a.order != to {
            changes.push(OrderChange {
                id: a.id.clone(),
                from: a.order,
                to,
            });
            a.order = to;
        }
    }
    *annotations = arranged;
    changes
}

// ---------------------------------------------------------------------------
// Insertion
// ---------------------------------------------------------------------------

/// Whether two annotations may share one order slot.
///
/// Sound effects group with sound effects; faces, people, body parts and
/// objects group when they carry the same non-empty character id.
pub fn can_share_order(
    a: (AnnotationType, Option<&str>),
    b: (AnnotationType, Option<&str>),
) -> bool {
    if a.0 == AnnotationType::SoundEffect && b.0 == AnnotationType::SoundEffect {
        return true;
    }
    if a.0.is_character_figure() && b.0.is_character_figure() {
        return match (a.1, b.1) {
            (Some(x), Some(y)) => !x.is_empty() && x == y,
            _ => false,
        };
    }
    false
}

/// Insert `annotation`, resolving its order against existing occupants.
///
/// `requested = None` appends at `max + 1`. A requested slot that is free,
/// or whose occupants may all share with the newcomer, is used as is;
/// otherwise everything at or after the slot moves up by one first.
/// Returns the shifted annotations.
pub fn insert_annotation(
    annotations: &mut Vec<Annotation>,
    mut annotation: Annotation,
    requested: Option<u32>,
) -> Vec<OrderChange> {
    let Some(target) = requested else {
        annotation.order = next_order(annotations);
        annotations.push(annotation);
        return Vec::new();
    };
    annotation.order = target.max(1);
    let target = annotation.order;

    let newcomer = (annotation.kind, annotation.character_id.as_deref());
    let occupants: Vec<&Annotation> = annotations.iter().filter(|a| a.order == target).collect();
    let shares = occupants
        .iter()
        .all(|o| can_share_order(newcomer, (o.kind, o.character_id.as_deref())));

    let mut changes = Vec::new();
    if !occupants.is_empty() && !shares {
        for a in annotations.iter_mut().filter(|a| a.order >= target) {
            changes.push(OrderChange {
                id: a.id.clone(),
                from: a.order,
                to: a.order + 1,
            });
            a.order += 1;
        }
    }

    annotations.push(annotation);
    annotations.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    changes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
