//! Crossing orchestrator (interface only).
//!
//! The core never generates gametes itself: the meiosis/recombination
//! sampler stays external. `GameteSampler` is that seam; the
//! orchestrator's job is purely to turn one of the named cross schedules
//! into a list of parent-index pairs, ask the sampler for offspring, and
//! thread the result through the store, the locator, and the group
//! algebra with the configured naming/pedigree/id-allocation/file-output
//! behaviour.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::effects::EffectTable;
use crate::error::{SimError, SimResult};
use crate::genmap::GeneticMap;
use crate::groups;
use crate::interrupt::{NeverInterrupt, YieldCheck};
use crate::locator;
use crate::store::GenotypeStore;

/// The external meiosis collaborator. Given two (possibly identical)
/// diploid parent genotypes, produces one diploid offspring genotype.
/// `sample_gamete` produces a single haploid allele string, used only by
/// the doubled-haploid schedule.
pub trait GameteSampler {
    fn sample_offspring(&mut self, parent1: &str, parent2: &str, map: &GeneticMap) -> String;
    fn sample_gamete(&mut self, parent: &str, map: &GeneticMap) -> String;
}

/// Reference sampler: independent assortment per marker, no linkage. Only
/// here so the orchestrator and its tests are exercisable; not a stand-in
/// for a real meiosis model.
pub struct FreeRecombinationSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> FreeRecombinationSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> GameteSampler for FreeRecombinationSampler<R> {
    fn sample_offspring(&mut self, parent1: &str, parent2: &str, map: &GeneticMap) -> String {
        let n_markers = map.n_markers();
        let mut out = String::with_capacity(2 * n_markers);
        for m in 0..n_markers {
            let hap1 = if self.rng.gen_bool(0.5) { 0 } else { 1 };
            let hap2 = if self.rng.gen_bool(0.5) { 0 } else { 1 };
            out.push(parent1.chars().nth(m * 2 + hap1).expect("marker in range"));
            out.push(parent2.chars().nth(m * 2 + hap2).expect("marker in range"));
        }
        out
    }

    fn sample_gamete(&mut self, parent: &str, map: &GeneticMap) -> String {
        let n_markers = map.n_markers();
        let mut out = String::with_capacity(n_markers);
        for m in 0..n_markers {
            let hap = if self.rng.gen_bool(0.5) { 0 } else { 1 };
            out.push(parent.chars().nth(m * 2 + hap).expect("marker in range"));
        }
        out
    }
}

/// Configuration carried across all cross-schedule variants.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrossOptions {
    pub will_name: bool,
    pub name_prefix: Option<String>,
    pub family_size: u32,
    pub track_pedigree: bool,
    pub allocate_ids: bool,
    pub file_prefix: Option<String>,
    pub save_pedigree_to_file: bool,
    pub save_effects_to_file: bool,
    pub save_genes_to_file: bool,
    pub retain_in_simdata: bool,
}

impl Default for CrossOptions {
    fn default() -> Self {
        Self {
            will_name: false,
            name_prefix: None,
            family_size: 1,
            track_pedigree: false,
            allocate_ids: true,
            file_prefix: None,
            save_pedigree_to_file: false,
            save_effects_to_file: false,
            save_genes_to_file: false,
            retain_in_simdata: true,
        }
    }
}

fn write_optional_dumps(
    store: &GenotypeStore,
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
    group: u32,
    yc: &mut dyn YieldCheck,
) -> SimResult<()> {
    if !(opts.save_genes_to_file || opts.save_pedigree_to_file || opts.save_effects_to_file) {
        return Ok(());
    }
    let prefix = opts
        .file_prefix
        .as_deref()
        .ok_or_else(|| SimError::invalid_argument("cross: file output requested but no file_prefix was given"))?;

    if opts.save_genes_to_file {
        let mut f = std::fs::File::create(format!("{prefix}_genes.txt"))?;
        crate::io::write_genotypes(store, Some(group), &mut f, yc)?;
    }
    if opts.save_pedigree_to_file {
        let mut f = std::fs::File::create(format!("{prefix}_pedigree.txt"))?;
        crate::io::write_pedigree_one_step(store, Some(group), &mut f, yc)?;
    }
    if opts.save_effects_to_file {
        let effects = effects.ok_or_else(|| {
            SimError::missing_prerequisite("cross: save_effects_to_file requested but no effect table was given")
        })?;
        let mut f = std::fs::File::create(format!("{prefix}_effects.txt"))?;
        crate::io::write_gebvs(store, effects, Some(group), &mut f, yc)?;
    }
    Ok(())
}

/// Core funnel every named schedule variant goes through: given a list of
/// parent-index pairs, materialise `opts.family_size` offspring per pair.
/// `effects` is only required when `opts.save_effects_to_file` is set.
pub fn run_cross_schedule(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    parent_index_pairs: &[(usize, usize)],
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
) -> SimResult<u32> {
    run_cross_schedule_yielding(store, map, sampler, parent_index_pairs, effects, opts, &mut NeverInterrupt)
}

pub fn run_cross_schedule_yielding(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    parent_index_pairs: &[(usize, usize)],
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
    yield_check: &mut dyn YieldCheck,
) -> SimResult<u32> {
    if opts.family_size == 0 {
        return Err(SimError::invalid_argument("run_cross_schedule: family_size must be >= 1"));
    }

    let group = groups::new_group_tag(store);
    let start_index = store.n_individuals();

    for &(p1_idx, p2_idx) in parent_index_pairs {
        yield_check.check()?;
        let id1 = locator::id_of_index(store, p1_idx)?;
        let id2 = locator::id_of_index(store, p2_idx)?;
        let genes1 = locator::genes_of_index(store, p1_idx)?.to_string();
        let genes2 = locator::genes_of_index(store, p2_idx)?.to_string();

        for _ in 0..opts.family_size {
            let child = sampler.sample_offspring(&genes1, &genes2, map);
            let parents = if opts.track_pedigree { (id1, id2) } else { (0, 0) };
            store.append(child, parents, None, group)?;
        }
    }

    let end_index = store.n_individuals();
    if opts.allocate_ids && end_index > start_index {
        store.allocate_ids(start_index, end_index - 1)?;
    }
    if opts.will_name {
        let prefix = opts.name_prefix.as_deref().unwrap_or("");
        store.set_names_from(start_index, prefix)?;
    }

    write_optional_dumps(store, effects, opts, group, yield_check)?;

    if !opts.retain_in_simdata {
        store.delete_by_group_yielding(group, yield_check)?;
    }

    Ok(group)
}

/// Draws `n_crosses` unordered pairs of distinct indices from `group`
/// uniformly at random.
pub fn cross_randomly(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    group: u32,
    n_crosses: usize,
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
    rng: &mut impl Rng,
) -> SimResult<u32> {
    let members = groups::group_indexes(store, group);
    if members.len() < 2 {
        return Err(SimError::invalid_argument("cross_randomly: group needs at least 2 members"));
    }
    let mut pairs = Vec::with_capacity(n_crosses);
    for _ in 0..n_crosses {
        let mut draw = members.choose_multiple(rng, 2).copied();
        let a = draw.next().unwrap();
        let b = draw.next().unwrap();
        pairs.push((a, b));
    }
    run_cross_schedule(store, map, sampler, &pairs, effects, opts)
}

/// Crosses an explicit list of parent-index pairs.
pub fn cross_index_pairs(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    pairs: &[(usize, usize)],
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
) -> SimResult<u32> {
    run_cross_schedule(store, map, sampler, pairs, effects, opts)
}

/// Crosses an explicit list of parent-name pairs. The file that would
/// supply these name pairs is parsed outside this crate; this takes the
/// already-parsed list.
pub fn cross_name_pairs(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    name_pairs: &[(String, String)],
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
) -> SimResult<u32> {
    let mut pairs = Vec::with_capacity(name_pairs.len());
    for (n1, n2) in name_pairs {
        let i1 = locator::index_of_name(store, n1)?;
        let i2 = locator::index_of_name(store, n2)?;
        pairs.push((i1, i2));
    }
    run_cross_schedule(store, map, sampler, &pairs, effects, opts)
}

/// Full Cartesian within a group, unidirectional (`i < j`, no reciprocal
/// duplicates).
pub fn cross_all_pairs(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    group: u32,
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
) -> SimResult<u32> {
    let members = groups::group_indexes(store, group);
    let mut pairs = Vec::new();
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            pairs.push((members[i], members[j]));
        }
    }
    run_cross_schedule(store, map, sampler, &pairs, effects, opts)
}

/// Each member of `group` crossed with itself.
pub fn self_cross(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    group: u32,
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
) -> SimResult<u32> {
    let members = groups::group_indexes(store, group);
    let pairs: Vec<(usize, usize)> = members.iter().map(|&i| (i, i)).collect();
    run_cross_schedule(store, map, sampler, &pairs, effects, opts)
}

/// One gamete per member, duplicated to a homozygous diploid genotype,
/// without going through the sampler's two-parent path.
pub fn doubled_haploid(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    group: u32,
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
) -> SimResult<u32> {
    if opts.family_size == 0 {
        return Err(SimError::invalid_argument("doubled_haploid: family_size must be >= 1"));
    }
    let members = groups::group_indexes(store, group);
    let new_group = groups::new_group_tag(store);
    let start_index = store.n_individuals();

    for &index in &members {
        let id = locator::id_of_index(store, index)?;
        let genes = locator::genes_of_index(store, index)?.to_string();
        for _ in 0..opts.family_size {
            let gamete = sampler.sample_gamete(&genes, map);
            let mut child = String::with_capacity(2 * gamete.chars().count());
            for allele in gamete.chars() {
                child.push(allele);
                child.push(allele);
            }
            let parents = if opts.track_pedigree { (id, id) } else { (0, 0) };
            store.append(child, parents, None, new_group)?;
        }
    }

    let end_index = store.n_individuals();
    if opts.allocate_ids && end_index > start_index {
        store.allocate_ids(start_index, end_index - 1)?;
    }
    if opts.will_name {
        let prefix = opts.name_prefix.as_deref().unwrap_or("");
        store.set_names_from(start_index, prefix)?;
    }
    write_optional_dumps(store, effects, opts, new_group, &mut NeverInterrupt)?;
    if !opts.retain_in_simdata {
        store.delete_by_group(new_group)?;
    }
    Ok(new_group)
}

/// One specific pair.
pub fn one_cross(
    store: &mut GenotypeStore,
    map: &GeneticMap,
    sampler: &mut dyn GameteSampler,
    parent1_index: usize,
    parent2_index: usize,
    effects: Option<&EffectTable>,
    opts: &CrossOptions,
) -> SimResult<u32> {
    run_cross_schedule(store, map, sampler, &[(parent1_index, parent2_index)], effects, opts)
}
