//! The genotype store: a chain of fixed-capacity blocks of diploid
//! individuals, addressed internally by `(block_idx, slot)` and externally
//! by `index` (position in block-order enumeration of occupied slots).
//!
//! The chain is an arena (`Vec<GenotypeBlock>`) and presence is an
//! explicit `Option<String>` per slot, so "occupied" is a property the
//! type system can't get out of sync with the rest of the row.

use crate::config::BLOCK_CAPACITY;
use crate::error::{SimError, SimResult};
use crate::interrupt::{NeverInterrupt, YieldCheck};

/// One page of the store. Parallel arrays, one entry per slot.
pub struct GenotypeBlock {
    alleles: Vec<Option<String>>,
    ids: Vec<u32>,
    parent1: Vec<u32>,
    parent2: Vec<u32>,
    names: Vec<Option<String>>,
    groups: Vec<u32>,
    n_subjects: usize,
}

impl GenotypeBlock {
    fn empty() -> Self {
        Self {
            alleles: vec![None; BLOCK_CAPACITY],
            ids: vec![0; BLOCK_CAPACITY],
            parent1: vec![0; BLOCK_CAPACITY],
            parent2: vec![0; BLOCK_CAPACITY],
            names: vec![None; BLOCK_CAPACITY],
            groups: vec![0; BLOCK_CAPACITY],
            n_subjects: 0,
        }
    }

    pub fn n_subjects(&self) -> usize {
        self.n_subjects
    }

    fn is_full(&self) -> bool {
        self.n_subjects >= BLOCK_CAPACITY
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.alleles.iter().position(|a| a.is_none())
    }

    pub fn alleles_at(&self, slot: usize) -> Option<&str> {
        self.alleles[slot].as_deref()
    }

    pub fn id_at(&self, slot: usize) -> u32 {
        self.ids[slot]
    }

    pub fn parents_at(&self, slot: usize) -> (u32, u32) {
        (self.parent1[slot], self.parent2[slot])
    }

    pub fn name_at(&self, slot: usize) -> Option<&str> {
        self.names[slot].as_deref()
    }

    pub fn group_at(&self, slot: usize) -> u32 {
        self.groups[slot]
    }

    pub fn set_group_at(&mut self, slot: usize, group: u32) {
        self.groups[slot] = group;
    }

    /// Ids of occupied slots, in slot order. Empty for a fully-empty block.
    fn occupied_ids(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.n_subjects).map(move |s| self.ids[s])
    }
}

pub struct GenotypeStore {
    blocks: Vec<GenotypeBlock>,
    n_markers: usize,
    current_id: u32,
}

impl GenotypeStore {
    pub fn new(n_markers: usize) -> Self {
        Self {
            blocks: vec![GenotypeBlock::empty()],
            n_markers,
            current_id: 0,
        }
    }

    pub fn n_markers(&self) -> usize {
        self.n_markers
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[GenotypeBlock] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [GenotypeBlock] {
        &mut self.blocks
    }

    pub fn n_individuals(&self) -> usize {
        self.blocks.iter().map(GenotypeBlock::n_subjects).sum()
    }

    /// Converts a global index into `(block_idx, slot)`. Fails if the
    /// index is past the end of the population.
    pub fn locate(&self, index: usize) -> SimResult<(usize, usize)> {
        let mut remaining = index;
        for (block_idx, block) in self.blocks.iter().enumerate() {
            if remaining < block.n_subjects {
                return Ok((block_idx, remaining));
            }
            remaining -= block.n_subjects;
        }
        Err(SimError::invalid_argument(format!(
            "locate: index {index} out of range (0..{})",
            self.n_individuals()
        )))
    }

    /// Places `allele_string` into the first slot with free capacity,
    /// allocating a new block on overflow. Returns the new individual's
    /// global index.
    pub fn append(
        &mut self,
        allele_string: String,
        parents: (u32, u32),
        name: Option<String>,
        group: u32,
    ) -> SimResult<usize> {
        if allele_string.chars().count() != 2 * self.n_markers {
            return Err(SimError::invalid_argument(format!(
                "append: genotype length {} does not match 2*n_markers ({})",
                allele_string.chars().count(),
                2 * self.n_markers
            )));
        }

        let mut preceding = 0usize;
        let mut target_block = None;
        for (block_idx, block) in self.blocks.iter().enumerate() {
            if !block.is_full() {
                target_block = Some(block_idx);
                break;
            }
            preceding += block.n_subjects;
        }
        let block_idx = match target_block {
            Some(idx) => idx,
            None => {
                self.blocks.push(GenotypeBlock::empty());
                self.blocks.len() - 1
            }
        };

        let block = &mut self.blocks[block_idx];
        let slot = block
            .first_free_slot()
            .ok_or_else(|| SimError::ResourceExhaustion("append: no free slot in target block".into()))?;
        block.alleles[slot] = Some(allele_string);
        block.ids[slot] = 0;
        block.parent1[slot] = parents.0;
        block.parent2[slot] = parents.1;
        block.names[slot] = name;
        block.groups[slot] = group;
        block.n_subjects += 1;

        Ok(preceding + slot)
    }

    /// Sequentially assigns `++current_id` to individuals at global
    /// indices `from_index..=to_index`, warning (not failing) if the
    /// counter would overflow `u32::MAX`.
    pub fn allocate_ids(&mut self, from_index: usize, to_index: usize) -> SimResult<()> {
        if from_index > to_index {
            return Err(SimError::invalid_argument(
                "allocate_ids: from_index must not exceed to_index",
            ));
        }
        let n = self.n_individuals();
        if to_index >= n {
            return Err(SimError::invalid_argument(format!(
                "allocate_ids: to_index {to_index} out of range (0..{n})"
            )));
        }

        let count = (to_index - from_index + 1) as u64;
        if self.current_id as u64 + count > u32::MAX as u64 {
            log::warn!(
                "allocate_ids: id counter would overflow u32::MAX over range [{from_index}, {to_index}]; \
                 remaining ids will saturate and pedigree lookups afterwards are undefined"
            );
        }

        for index in from_index..=to_index {
            let (block_idx, slot) = self.locate(index)?;
            self.current_id = self.current_id.saturating_add(1);
            self.blocks[block_idx].ids[slot] = self.current_id;
        }
        Ok(())
    }

    /// Rewrites names in `[from_slot, n_subjects)` of `block_idx` to
    /// `"{prefix}{suffix:0W}"`, `W` the digit count of
    /// `n_subjects - from_slot`. Suffix increments per row, starting at
    /// `starting_suffix + 1`.
    pub fn set_names(
        &mut self,
        block_idx: usize,
        prefix: &str,
        starting_suffix: u32,
        from_slot: usize,
    ) -> SimResult<u32> {
        let block = self
            .blocks
            .get_mut(block_idx)
            .ok_or_else(|| SimError::invalid_argument(format!("set_names: block {block_idx} does not exist")))?;
        if from_slot > block.n_subjects {
            return Err(SimError::invalid_argument(format!(
                "set_names: from_slot {from_slot} past block occupancy {}",
                block.n_subjects
            )));
        }

        let span = block.n_subjects - from_slot;
        let width = digit_count(span);
        let mut suffix = starting_suffix;
        for slot in from_slot..block.n_subjects {
            suffix += 1;
            block.names[slot] = Some(format!("{prefix}{suffix:0width$}", width = width));
        }
        Ok(suffix)
    }

    /// Convenience over `set_names` for a tail range that may span
    /// multiple blocks, as crossing output does: renames every individual
    /// from `from_index` through the end of the population. The suffix
    /// counter carries across blocks; each block still computes its own
    /// digit width from its own occupancy, matching the block-scoped
    /// primitive above.
    pub fn set_names_from(&mut self, from_index: usize, prefix: &str) -> SimResult<()> {
        let total = self.n_individuals();
        if from_index >= total {
            return Ok(());
        }
        let (mut block_idx, slot) = self.locate(from_index)?;
        let mut suffix = self.set_names(block_idx, prefix, 0, slot)?;
        block_idx += 1;
        while block_idx < self.blocks.len() {
            suffix = self.set_names(block_idx, prefix, suffix, 0)?;
            block_idx += 1;
        }
        Ok(())
    }

    /// Deletes every individual tagged `group`, then compacts. Returns the
    /// number of individuals deleted.
    pub fn delete_by_group(&mut self, group: u32) -> SimResult<usize> {
        self.delete_by_group_yielding(group, &mut NeverInterrupt)
    }

    pub fn delete_by_group_yielding(
        &mut self,
        group: u32,
        yield_check: &mut dyn YieldCheck,
    ) -> SimResult<usize> {
        if group == 0 {
            return Err(SimError::invalid_argument("delete_by_group: group 0 is unassigned"));
        }
        let mut deleted = 0usize;
        for block in &mut self.blocks {
            for slot in 0..block.n_subjects {
                yield_check.check()?;
                if block.groups[slot] == group {
                    block.alleles[slot] = None;
                    block.names[slot] = None;
                    block.ids[slot] = 0;
                    block.parent1[slot] = 0;
                    block.parent2[slot] = 0;
                    block.groups[slot] = 0;
                    deleted += 1;
                }
            }
        }
        if deleted > 0 {
            self.compact_yielding(yield_check)?;
            log::info!("delete_by_group: {deleted} genotypes were deleted (group {group})");
        }
        Ok(deleted)
    }

    /// Moves surviving individuals from later slots into earlier empty
    /// slots, preserving relative order, and unlinks fully-empty trailing
    /// blocks.
    pub fn compact(&mut self) -> SimResult<()> {
        self.compact_yielding(&mut NeverInterrupt)
    }

    pub fn compact_yielding(&mut self, yield_check: &mut dyn YieldCheck) -> SimResult<()> {
        struct Survivor {
            alleles: String,
            id: u32,
            parent1: u32,
            parent2: u32,
            name: Option<String>,
            group: u32,
        }

        let mut survivors = Vec::new();
        for block in &self.blocks {
            for slot in 0..BLOCK_CAPACITY {
                if let Some(alleles) = &block.alleles[slot] {
                    yield_check.check()?;
                    survivors.push(Survivor {
                        alleles: alleles.clone(),
                        id: block.ids[slot],
                        parent1: block.parent1[slot],
                        parent2: block.parent2[slot],
                        name: block.names[slot].clone(),
                        group: block.groups[slot],
                    });
                }
            }
        }

        let n_blocks_needed = survivors.len().div_ceil(BLOCK_CAPACITY).max(1);
        let mut new_blocks: Vec<GenotypeBlock> = (0..n_blocks_needed).map(|_| GenotypeBlock::empty()).collect();
        for (i, survivor) in survivors.into_iter().enumerate() {
            let block_idx = i / BLOCK_CAPACITY;
            let slot = i % BLOCK_CAPACITY;
            let block = &mut new_blocks[block_idx];
            block.alleles[slot] = Some(survivor.alleles);
            block.ids[slot] = survivor.id;
            block.parent1[slot] = survivor.parent1;
            block.parent2[slot] = survivor.parent2;
            block.names[slot] = survivor.name;
            block.groups[slot] = survivor.group;
            block.n_subjects += 1;
        }

        self.blocks = new_blocks;
        Ok(())
    }

    pub(crate) fn current_id(&self) -> u32 {
        self.current_id
    }
}

fn digit_count(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        n.ilog10() as usize + 1
    }
}
