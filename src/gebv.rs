//! GEBV and selection kernel: count matrices, breeding-value sums, top-N
//! selection, and block-partitioned GEBVs.

use crate::effects::EffectTable;
use crate::error::{SimError, SimResult};
use crate::groups::{self, split_by_indices};
use crate::interrupt::{NeverInterrupt, YieldCheck};
use crate::io::BlockDefinition;
use crate::matrix::DecimalMatrix;
use crate::store::GenotypeStore;

fn allele_at(genotype: &str, marker: usize, haplotype: usize) -> char {
    genotype.chars().nth(marker * 2 + haplotype).expect("marker in range")
}

/// `DecimalMatrix(n_markers x ids.len())` where entry `[m, i]` counts
/// occurrences of `allele_char` in individual `i`'s diploid cell at
/// marker `m` (0, 1, or 2). Missing genotype rows contribute all zeros.
pub fn count_matrix_for_ids(
    store: &GenotypeStore,
    ids: &[u32],
    allele_char: char,
) -> SimResult<DecimalMatrix> {
    count_matrix_for_ids_yielding(store, ids, allele_char, &mut NeverInterrupt)
}

/// As `count_matrix_for_ids`, but polls `yield_check` once per individual,
/// so a long fill can be cancelled by the host between rows.
pub fn count_matrix_for_ids_yielding(
    store: &GenotypeStore,
    ids: &[u32],
    allele_char: char,
    yield_check: &mut dyn YieldCheck,
) -> SimResult<DecimalMatrix> {
    let n_markers = store.n_markers();
    let mut out = DecimalMatrix::zeros(n_markers, ids.len());
    for (i, &id) in ids.iter().enumerate() {
        yield_check.check()?;
        let genotype = match crate::locator::genes_of(store, id) {
            Ok(g) => g,
            Err(_) => continue,
        };
        for m in 0..n_markers {
            let count = (allele_at(genotype, m, 0) == allele_char) as u8
                + (allele_at(genotype, m, 1) == allele_char) as u8;
            out.set(m, i, count as f64);
        }
    }
    Ok(out)
}

/// `Sigma_a (effects_row_a . counts_a)`, a `1 x |g|` matrix. Fails if no
/// effects are loaded or the group is empty.
pub fn gebv_for_group(store: &GenotypeStore, effects: &EffectTable, g: u32) -> SimResult<DecimalMatrix> {
    gebv_for_group_yielding(store, effects, g, &mut NeverInterrupt)
}

pub fn gebv_for_group_yielding(
    store: &GenotypeStore,
    effects: &EffectTable,
    g: u32,
    yield_check: &mut dyn YieldCheck,
) -> SimResult<DecimalMatrix> {
    if effects.n_alleles() == 0 {
        return Err(SimError::missing_prerequisite("gebv_for_group: no effects loaded"));
    }
    let ids = groups::group_ids(store, g);
    if ids.is_empty() {
        return Err(SimError::missing_prerequisite(format!(
            "gebv_for_group: group {g} is empty"
        )));
    }

    let mut totals = DecimalMatrix::zeros(1, ids.len());
    for &label in effects.allele_labels() {
        let counts = count_matrix_for_ids_yielding(store, &ids, label, yield_check)?;
        let effect_row = effects.effects().row_subset(effects.row_of(label).unwrap())?;
        let contribution = effect_row.multiply(&counts)?;
        totals.add_into(&contribution)?;
    }
    Ok(totals)
}

/// Ranks the group by GEBV (ascending if `low_is_best`, else descending),
/// lifts the top `n` into a fresh group, returns its tag. Ties are broken
/// by ascending original index: a stable sort on GEBV value followed by
/// index order.
pub fn top_n_by_gebv(
    store: &mut GenotypeStore,
    effects: &EffectTable,
    g: u32,
    n: usize,
    low_is_best: bool,
) -> SimResult<u32> {
    let indexes = groups::group_indexes(store, g);
    let gebvs = gebv_for_group(store, effects, g)?;

    let mut order: Vec<usize> = (0..indexes.len()).collect();
    order.sort_by(|&a, &b| {
        let va = gebvs.get(0, a);
        let vb = gebvs.get(0, b);
        let cmp = if low_is_best {
            va.partial_cmp(&vb).unwrap()
        } else {
            vb.partial_cmp(&va).unwrap()
        };
        cmp.then(a.cmp(&b))
    });

    let chosen: Vec<usize> = order.into_iter().take(n).map(|pos| indexes[pos]).collect();
    split_by_indices(store, &chosen)
}

/// `n = floor(|g| * pct / 100)`, then `top_n_by_gebv`.
pub fn select_by_percent(
    store: &mut GenotypeStore,
    effects: &EffectTable,
    g: u32,
    pct: f64,
    low_is_best: bool,
) -> SimResult<u32> {
    if !pct.is_finite() || pct < 0.0 {
        return Err(SimError::invalid_argument("select_by_percent: percentage must be a non-negative finite number"));
    }
    let size = groups::group_size(store, g);
    let n = ((size as f64) * pct / 100.0).floor() as usize;
    top_n_by_gebv(store, effects, g, n, low_is_best)
}

pub fn ideal_genotype(effects: &EffectTable) -> SimResult<String> {
    effects.ideal_genotype()
}

fn label_for_individual(
    store: &GenotypeStore,
    index: usize,
) -> SimResult<String> {
    match crate::locator::id_of_index(store, index) {
        Ok(_) => {}
        Err(e) => return Err(e),
    }
    let (block_idx, slot) = store.locate(index)?;
    let block = &store.blocks()[block_idx];
    Ok(match block.name_at(slot) {
        Some(name) => name.to_string(),
        None => format!("G{index}"),
    })
}

/// For each individual (in `group` or all individuals if `None`), writes
/// two rows: `"{label}_1 v1 v2 ..."` and `"{label}_2 v1 v2 ..."`, where
/// `vk` is the sum over markers in block `k` of the effect contribution of
/// the individual's hap-A (resp. hap-B) allele at that marker. Blocks are
/// columns, in block-table order. Unknown marker names within a block are
/// silently skipped. A single group-filter parameter covers both the
/// whole-population and the single-group dump.
pub fn block_gebvs(
    store: &GenotypeStore,
    effects: &EffectTable,
    genmap: &crate::genmap::GeneticMap,
    blocks: &[BlockDefinition],
    group: Option<u32>,
    out: &mut dyn std::io::Write,
    yield_check: &mut dyn YieldCheck,
) -> SimResult<()> {
    let indexes = match group {
        Some(g) => groups::group_indexes(store, g),
        None => (0..store.n_individuals()).collect(),
    };

    let block_markers: Vec<Vec<usize>> = blocks
        .iter()
        .map(|block| {
            block
                .markers
                .iter()
                .filter_map(|name| genmap.marker_index(name).ok())
                .collect()
        })
        .collect();

    for &index in &indexes {
        yield_check.check()?;
        let label = label_for_individual(store, index)?;
        let genotype = crate::locator::genes_of_index(store, index)?;

        for (hap, suffix) in [(0usize, 1), (1usize, 2)] {
            write!(out, "{label}_{suffix}").map_err(SimError::Io)?;
            for marker_indexes in &block_markers {
                let mut sum = 0.0;
                for &marker in marker_indexes {
                    let allele = allele_at(genotype, marker, hap);
                    if let Some(effect) = effects.effect_of(allele, marker) {
                        sum += effect;
                    }
                }
                write!(out, " {sum}").map_err(SimError::Io)?;
            }
            writeln!(out).map_err(SimError::Io)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genmap::{GeneticMap, MarkerPosition};
    use crate::interrupt::CountdownInterrupt;

    fn store_with_two_individuals(n_markers: usize, genotypes: &[&str]) -> GenotypeStore {
        let mut store = GenotypeStore::new(n_markers);
        for g in genotypes {
            store.append(g.to_string(), (0, 0), None, 1).unwrap();
        }
        store.allocate_ids(0, genotypes.len() - 1).unwrap();
        store
    }

    #[test]
    fn count_matrix_for_ids_yielding_polls_once_per_individual() {
        let store = store_with_two_individuals(1, &["AA", "AT", "TT"]);
        let ids: Vec<u32> = (0..3).map(|i| crate::locator::id_of_index(&store, i).unwrap()).collect();

        // Two individuals' worth of checks succeed, the third cancels.
        let mut yc = CountdownInterrupt::new(2);
        let err = count_matrix_for_ids_yielding(&store, &ids, 'A', &mut yc).unwrap_err();
        assert!(matches!(err, SimError::Cancelled));

        let mut yc = CountdownInterrupt::new(3);
        assert!(count_matrix_for_ids_yielding(&store, &ids, 'A', &mut yc).is_ok());
    }

    #[test]
    fn effects_linearity_scenario() {
        let effects = EffectTable::new(
            vec!['A', 'T'],
            DecimalMatrix::from_rows(vec![vec![1.0, 1.0], vec![0.0, 0.0]]).unwrap(),
        )
        .unwrap();
        let store = store_with_two_individuals(2, &["AAAA", "AATT"]);
        let gebvs = gebv_for_group(&store, &effects, 1).unwrap();
        assert_eq!(gebvs.get(0, 0), 0.0);
        assert_eq!(gebvs.get(0, 1), 2.0);
    }

    #[test]
    fn gebv_for_group_is_linear_in_effects() {
        let effects = EffectTable::new(
            vec!['A', 'T'],
            DecimalMatrix::from_rows(vec![vec![1.0, -1.0], vec![0.5, 0.5]]).unwrap(),
        )
        .unwrap();
        let doubled = EffectTable::new(
            vec!['A', 'T'],
            DecimalMatrix::from_rows(vec![vec![2.0, -2.0], vec![1.0, 1.0]]).unwrap(),
        )
        .unwrap();
        let store = store_with_two_individuals(2, &["AAAT", "ATTT"]);
        let base = gebv_for_group(&store, &effects, 1).unwrap();
        let scaled = gebv_for_group(&store, &doubled, 1).unwrap();
        assert_eq!(scaled.get(0, 0), base.get(0, 0) * 2.0);
        assert_eq!(scaled.get(0, 1), base.get(0, 1) * 2.0);
    }

    #[test]
    fn top_n_selects_highest_values() {
        // GEBVs, by construction below, are [3, 1, 4, 1, 5] (three markers,
        // A contributes 1 per copy, T contributes 0): the top 2 descending
        // are the individuals worth 5 and 4.
        let effects = EffectTable::new(
            vec!['A', 'T'],
            DecimalMatrix::from_rows(vec![vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]]).unwrap(),
        )
        .unwrap();
        let mut store = store_with_two_individuals(
            3,
            &["ATATAT", "ATTTTT", "AAAATT", "ATTTTT", "AAAAAT"],
        );
        let tag = top_n_by_gebv(&mut store, &effects, 1, 2, false).unwrap();
        // group_genes scans in population order, not rank order, so the
        // lower-index member (value 4) precedes the higher-index one
        // (value 5) even though 5 ranked first.
        let chosen_genes: Vec<String> = groups::group_genes(&store, tag).into_iter().map(str::to_string).collect();
        assert_eq!(chosen_genes, vec!["AAAATT".to_string(), "AAAAAT".to_string()]);
    }

    #[test]
    fn block_gebvs_matches_round_trip_scenario() {
        let genmap = GeneticMap::new(
            vec!["m0".into(), "m1".into(), "m2".into()],
            vec![
                MarkerPosition { chromosome: 1, position: 0.0 },
                MarkerPosition { chromosome: 1, position: 1.0 },
                MarkerPosition { chromosome: 1, position: 2.0 },
            ],
        )
        .unwrap();
        let effects = EffectTable::new(
            vec!['A', 'T', 'G', 'C'],
            DecimalMatrix::from_rows(vec![
                vec![1.0, 1.0, 0.0],
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 2.0],
            ])
            .unwrap(),
        )
        .unwrap();
        let store = store_with_two_individuals(3, &["ATAGCC"]);
        let blocks = vec![
            BlockDefinition {
                name: "b0".into(),
                markers: vec!["m0".into(), "m1".into()],
            },
            BlockDefinition {
                name: "b1".into(),
                markers: vec!["m2".into()],
            },
        ];
        let mut out = Vec::new();
        block_gebvs(&store, &effects, &genmap, &blocks, None, &mut out, &mut NeverInterrupt).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "G0_1 2 2");
        assert_eq!(lines[1], "G0_2 0 2");
    }
}
