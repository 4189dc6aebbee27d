//! Group algebra: assignment, combination, splitting, and enumeration of
//! group tags.

use std::collections::HashMap;

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::store::GenotypeStore;

/// Smallest positive integer not currently used as a group tag by any
/// individual.
pub fn new_group_tag(store: &GenotypeStore) -> u32 {
    let mut used: Vec<u32> = existing_tags(store);
    used.sort_unstable();
    used.dedup();
    smallest_unused_above(&used, 1)
}

/// Advances a cursor over the sorted `existing` list, returning the next
/// integer at or above `start` that is not present in `existing`: the
/// smallest unused positive integer, skipping over tags already in use.
fn smallest_unused_above(existing: &[u32], start: u32) -> u32 {
    let mut candidate = start;
    for &tag in existing {
        if tag < candidate {
            continue;
        }
        if tag == candidate {
            candidate += 1;
        } else {
            break;
        }
    }
    candidate
}

fn existing_tags(store: &GenotypeStore) -> Vec<u32> {
    let mut tags = Vec::new();
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            let g = block.group_at(slot);
            if g != 0 {
                tags.push(g);
            }
        }
    }
    tags
}

/// Reassigns every individual tagged with any of `others` to `into`.
pub fn combine(store: &mut GenotypeStore, into: u32, others: &[u32]) -> SimResult<()> {
    if into == 0 || others.iter().any(|&o| o == 0) {
        return Err(SimError::invalid_argument("combine: group tag 0 is unassigned"));
    }
    for block in store.blocks_mut() {
        for slot in 0..block.n_subjects() {
            if others.contains(&block.group_at(slot)) {
                block.set_group_at(slot, into);
            }
        }
    }
    Ok(())
}

/// Assigns each member of `g` a distinct fresh tag, skipping over tags
/// already in use. Returns the fresh tags produced, one per member, in
/// population order.
pub fn split_into_individuals(store: &mut GenotypeStore, g: u32) -> SimResult<Vec<u32>> {
    if g == 0 {
        return Err(SimError::invalid_argument("split_into_individuals: group 0 is unassigned"));
    }
    let mut existing = existing_tags(store);
    existing.sort_unstable();
    existing.dedup();

    let mut produced = Vec::new();
    let mut cursor = 1u32;
    for block in store.blocks_mut() {
        for slot in 0..block.n_subjects() {
            if block.group_at(slot) == g {
                let tag = smallest_unused_above(&existing, cursor);
                existing.push(tag);
                existing.sort_unstable();
                cursor = tag + 1;
                block.set_group_at(slot, tag);
                produced.push(tag);
            }
        }
    }
    Ok(produced)
}

/// Members sharing the same parent pair, as an *unordered* set, receive
/// the same fresh tag; distinct parent pairs receive distinct fresh tags.
/// Backed by a growable map rather than a fixed-size scratch buffer, so
/// there is no cap on the number of distinct families per invocation.
pub fn split_into_families(store: &mut GenotypeStore, g: u32, config: &SimConfig) -> SimResult<Vec<u32>> {
    if g == 0 {
        return Err(SimError::invalid_argument("split_into_families: group 0 is unassigned"));
    }
    let mut existing = existing_tags(store);
    existing.sort_unstable();
    existing.dedup();

    let mut family_tags: HashMap<(u32, u32), u32> = HashMap::with_capacity(config.family_split_map_hint);
    let mut cursor = 1u32;
    let mut produced = Vec::new();

    for block in store.blocks_mut() {
        for slot in 0..block.n_subjects() {
            if block.group_at(slot) != g {
                continue;
            }
            let (p1, p2) = block.parents_at(slot);
            let key = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            let tag = *family_tags.entry(key).or_insert_with(|| {
                let tag = smallest_unused_above(&existing, cursor);
                existing.push(tag);
                existing.sort_unstable();
                cursor = tag + 1;
                tag
            });
            block.set_group_at(slot, tag);
            produced.push(tag);
        }
    }
    Ok(produced)
}

/// Allocates one new tag and reassigns every listed global index to it.
pub fn split_by_indices(store: &mut GenotypeStore, indices: &[usize]) -> SimResult<u32> {
    let tag = new_group_tag(store);
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    for index in sorted {
        let (block_idx, slot) = store.locate(index)?;
        store.blocks_mut()[block_idx].set_group_at(slot, tag);
    }
    Ok(tag)
}

/// `(tag, count)` pairs, ordered by tag ascending.
pub fn enumerate_groups(store: &GenotypeStore) -> Vec<(u32, usize)> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            let g = block.group_at(slot);
            if g != 0 {
                *counts.entry(g).or_insert(0) += 1;
            }
        }
    }
    let mut out: Vec<(u32, usize)> = counts.into_iter().collect();
    out.sort_by_key(|&(tag, _)| tag);
    out
}

pub fn group_size(store: &GenotypeStore, g: u32) -> usize {
    group_indexes(store, g).len()
}

pub fn group_indexes(store: &GenotypeStore, g: u32) -> Vec<usize> {
    let mut out = Vec::new();
    let mut seen = 0usize;
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            if block.group_at(slot) == g {
                out.push(seen + slot);
            }
        }
        seen += block.n_subjects();
    }
    out
}

pub fn group_ids(store: &GenotypeStore, g: u32) -> Vec<u32> {
    let mut out = Vec::new();
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            if block.group_at(slot) == g {
                out.push(block.id_at(slot));
            }
        }
    }
    out
}

pub fn group_names(store: &GenotypeStore, g: u32) -> Vec<Option<&str>> {
    let mut out = Vec::new();
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            if block.group_at(slot) == g {
                out.push(block.name_at(slot));
            }
        }
    }
    out
}

pub fn group_genes(store: &GenotypeStore, g: u32) -> Vec<&str> {
    let mut out = Vec::new();
    for block in store.blocks() {
        for slot in 0..block.n_subjects() {
            if block.group_at(slot) == g {
                out.push(block.alleles_at(slot).expect("occupied slot has alleles"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genotype() -> String {
        "AA".to_string()
    }

    #[test]
    fn new_group_tag_picks_smallest_unused() {
        let mut store = GenotypeStore::new(1);
        store.append(genotype(), (0, 0), None, 1).unwrap();
        store.append(genotype(), (0, 0), None, 3).unwrap();
        assert_eq!(new_group_tag(&store), 2);
    }

    #[test]
    fn combine_merges_groups_and_removes_the_source_tag() {
        let mut store = GenotypeStore::new(1);
        store.append(genotype(), (0, 0), None, 1).unwrap();
        store.append(genotype(), (0, 0), None, 2).unwrap();
        combine(&mut store, 1, &[2]).unwrap();
        let groups = enumerate_groups(&store);
        assert_eq!(groups, vec![(1, 2)]);
    }

    #[test]
    fn split_into_individuals_skips_over_existing_tags() {
        let mut store = GenotypeStore::new(1);
        // Pre-existing tag 2 should be skipped by the allocator.
        store.append(genotype(), (0, 0), None, 2).unwrap();
        store.append(genotype(), (0, 0), None, 9).unwrap();
        store.append(genotype(), (0, 0), None, 9).unwrap();
        let produced = split_into_individuals(&mut store, 9).unwrap();
        assert_eq!(produced, vec![1, 3]);
    }

    #[test]
    fn split_into_families_groups_by_unordered_parent_pair() {
        let mut store = GenotypeStore::new(1);
        store.append(genotype(), (10, 20), None, 5).unwrap();
        store.append(genotype(), (20, 10), None, 5).unwrap();
        store.append(genotype(), (10, 20), None, 5).unwrap();
        store.append(genotype(), (30, 40), None, 5).unwrap();
        let config = SimConfig::default();
        let produced = split_into_families(&mut store, 5, &config).unwrap();
        assert_eq!(produced[0], produced[1]);
        assert_eq!(produced[1], produced[2]);
        assert_ne!(produced[0], produced[3]);
    }

    #[test]
    fn split_by_indices_creates_one_fresh_group() {
        let mut store = GenotypeStore::new(1);
        for _ in 0..4 {
            store.append(genotype(), (0, 0), None, 1).unwrap();
        }
        let tag = split_by_indices(&mut store, &[0, 2]).unwrap();
        assert_eq!(group_size(&store, tag), 2);
        assert_eq!(group_indexes(&store, tag), vec![0, 2]);
    }

    #[test]
    fn enumerate_groups_is_sorted_ascending_by_tag() {
        let mut store = GenotypeStore::new(1);
        store.append(genotype(), (0, 0), None, 5).unwrap();
        store.append(genotype(), (0, 0), None, 2).unwrap();
        let groups = enumerate_groups(&store);
        assert_eq!(groups, vec![(2, 1), (5, 1)]);
    }
}
