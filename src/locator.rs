//! Lookups by id, name, index, and parent pair.
//!
//! Ids are only monotonic *within* a block (see `store::GenotypeStore`'s
//! compaction note), so an id lookup binary-searches within whichever
//! block's `[first_id, last_id]` range contains the target, rather than
//! across the whole store.

use crate::error::{SimError, SimResult};
use crate::store::GenotypeStore;

fn block_contains_id(store: &GenotypeStore, block_idx: usize, id: u32) -> bool {
    let block = &store.blocks()[block_idx];
    if block.n_subjects() == 0 {
        return false;
    }
    let first = block.id_at(0);
    let last = block.id_at(block.n_subjects() - 1);
    id >= first && id <= last
}

/// Binary search for `id` within the given block's occupied ids, which
/// are strictly increasing by slot.
fn binary_search_in_block(store: &GenotypeStore, block_idx: usize, id: u32) -> Option<usize> {
    let block = &store.blocks()[block_idx];
    let mut lo = 0usize;
    let mut hi = block.n_subjects();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match block.id_at(mid).cmp(&id) {
            std::cmp::Ordering::Equal => return Some(mid),
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
        }
    }
    None
}

fn find_slot_by_id(store: &GenotypeStore, id: u32) -> Option<(usize, usize)> {
    for block_idx in 0..store.n_blocks() {
        if block_contains_id(store, block_idx, id) {
            if let Some(slot) = binary_search_in_block(store, block_idx, id) {
                return Some((block_idx, slot));
            }
        }
    }
    None
}

pub fn name_of(store: &GenotypeStore, id: u32) -> SimResult<Option<&str>> {
    let (block_idx, slot) =
        find_slot_by_id(store, id).ok_or_else(|| SimError::not_found(format!("name_of: no individual with id {id}")))?;
    Ok(store.blocks()[block_idx].name_at(slot))
}

pub fn genes_of(store: &GenotypeStore, id: u32) -> SimResult<&str> {
    let (block_idx, slot) =
        find_slot_by_id(store, id).ok_or_else(|| SimError::not_found(format!("genes_of: no individual with id {id}")))?;
    store.blocks()[block_idx]
        .alleles_at(slot)
        .ok_or_else(|| SimError::not_found(format!("genes_of: slot for id {id} is empty")))
}

/// `(p1, p2)` if at least one parent is known, else `None`.
pub fn parents_of(store: &GenotypeStore, id: u32) -> SimResult<Option<(u32, u32)>> {
    let (block_idx, slot) = find_slot_by_id(store, id)
        .ok_or_else(|| SimError::not_found(format!("parents_of: no individual with id {id}")))?;
    let parents = store.blocks()[block_idx].parents_at(slot);
    Ok(if parents == (0, 0) { None } else { Some(parents) })
}

/// For each name, the id of the first matching individual, or `0`
/// ("unknown") if not found.
pub fn ids_of_names(store: &GenotypeStore, names: &[String]) -> Vec<u32> {
    names
        .iter()
        .map(|name| {
            for block in store.blocks() {
                for slot in 0..block.n_subjects() {
                    if block.name_at(slot) == Some(name.as_str()) {
                        return block.id_at(slot);
                    }
                }
            }
            0
        })
        .collect()
}

/// First individual whose parent pair equals `{p1, p2}` as an unordered
/// set, returned as a global index.
pub fn index_of_child(store: &GenotypeStore, p1: u32, p2: u32) -> SimResult<usize> {
    let mut seen = 0usize;
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            let (a, b) = block.parents_at(slot);
            if (a == p1 && b == p2) || (a == p2 && b == p1) {
                return Ok(seen + slot);
            }
        }
        seen += block.n_subjects();
    }
    Err(SimError::not_found(format!(
        "index_of_child: no individual with parent pair {{{p1}, {p2}}}"
    )))
}

pub fn id_of_child(store: &GenotypeStore, p1: u32, p2: u32) -> SimResult<u32> {
    let index = index_of_child(store, p1, p2)?;
    let (block_idx, slot) = store.locate(index)?;
    Ok(store.blocks()[block_idx].id_at(slot))
}

/// First global index whose name matches.
pub fn index_of_name(store: &GenotypeStore, name: &str) -> SimResult<usize> {
    let mut seen = 0usize;
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            if block.name_at(slot) == Some(name) {
                return Ok(seen + slot);
            }
        }
        seen += block.n_subjects();
    }
    Err(SimError::not_found(format!("index_of_name: no individual named '{name}'")))
}

pub fn genes_of_index(store: &GenotypeStore, index: usize) -> SimResult<&str> {
    let (block_idx, slot) = store.locate(index)?;
    store.blocks()[block_idx]
        .alleles_at(slot)
        .ok_or_else(|| SimError::not_found(format!("genes_of_index: slot at index {index} is empty")))
}

pub fn id_of_index(store: &GenotypeStore, index: usize) -> SimResult<u32> {
    let (block_idx, slot) = store.locate(index)?;
    Ok(store.blocks()[block_idx].id_at(slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genotype() -> String {
        "AA".to_string()
    }

    fn store_with_three() -> GenotypeStore {
        let mut store = GenotypeStore::new(1);
        store.append(genotype(), (0, 0), Some("alpha".into()), 1).unwrap();
        store.append(genotype(), (0, 0), Some("beta".into()), 1).unwrap();
        store.append(genotype(), (1, 2), Some("gamma".into()), 1).unwrap();
        store.allocate_ids(0, 2).unwrap();
        store
    }

    #[test]
    fn genes_and_name_of_id_round_trip() {
        let store = store_with_three();
        let id = id_of_index(&store, 1).unwrap();
        assert_eq!(name_of(&store, id).unwrap(), Some("beta"));
        assert_eq!(genes_of(&store, id).unwrap(), "AA");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = store_with_three();
        assert!(name_of(&store, 999).is_err());
    }

    #[test]
    fn parents_of_reports_none_when_both_parents_unknown() {
        let store = store_with_three();
        let id = id_of_index(&store, 0).unwrap();
        assert_eq!(parents_of(&store, id).unwrap(), None);
    }

    #[test]
    fn index_of_child_matches_unordered_parent_pair() {
        let store = store_with_three();
        let idx = index_of_child(&store, 2, 1).unwrap();
        assert_eq!(idx, 2);
    }

    #[test]
    fn ids_of_names_returns_zero_for_unknown_name() {
        let store = store_with_three();
        let ids = ids_of_names(&store, &["beta".to_string(), "nope".to_string()]);
        assert_eq!(ids[1], 0);
        assert_ne!(ids[0], 0);
    }
}
