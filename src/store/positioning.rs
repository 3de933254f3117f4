//! Position Management
//!
//! Keeps `order` a contiguous 0-based sequence matching list positions.

use crate::models::{Ingredient, OrderEntry};

/// Renumber every record to its index in `items`.
pub fn reindex(items: &mut [Ingredient]) {
    for (position, item) in items.iter_mut().enumerate() {
        item.order = position as i32;
    }
}

/// Reorder payload for the current sequence
pub fn order_entries(items: &[Ingredient]) -> Vec<OrderEntry> {
    items
        .iter()
        .map(|item| OrderEntry {
            id: item.id.clone(),
            order: item.order,
        })
        .collect()
}

/// Rearrange `current` into the sequence named by `ids`.
///
/// Only positions change: records keep their current field values. Unknown
/// and repeated ids are skipped, and records `ids` leaves out follow in their
/// current relative order.
pub fn arrange(current: Vec<Ingredient>, ids: &[&str]) -> Vec<Ingredient> {
    let mut remaining: Vec<Option<Ingredient>> = current.into_iter().map(Some).collect();
    let mut arranged = Vec::with_capacity(remaining.len());

    for id in ids {
        let slot = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|item| item.id == *id));
        if let Some(item) = slot.and_then(Option::take) {
            arranged.push(item);
        }
    }
    arranged.extend(remaining.into_iter().flatten());
    arranged
}

/// Move the entry at `from` to `to` (clamped to the last index).
pub fn move_to<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let to = to.min(items.len() - 1);
    if from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// True when `order` values are exactly 0..len in list order
pub fn is_contiguous(items: &[Ingredient]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(position, item)| item.order == position as i32)
}
