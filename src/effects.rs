//! Effect table: per-allele marker effect rows and the ideal genotype.

use crate::error::{SimError, SimResult};
use crate::matrix::DecimalMatrix;

#[derive(Debug, Clone)]
pub struct EffectTable {
    effect_names: Vec<char>,
    effects: DecimalMatrix,
}

impl EffectTable {
    pub fn new(effect_names: Vec<char>, effects: DecimalMatrix) -> SimResult<Self> {
        if effect_names.is_empty() {
            return Err(SimError::invalid_argument(
                "EffectTable::new: at least one allele label is required",
            ));
        }
        if effects.rows() != effect_names.len() {
            return Err(SimError::shape_mismatch(format!(
                "EffectTable::new: {} allele labels but {} effect rows",
                effect_names.len(),
                effects.rows()
            )));
        }
        Ok(Self {
            effect_names,
            effects,
        })
    }

    pub fn n_alleles(&self) -> usize {
        self.effect_names.len()
    }

    pub fn n_markers(&self) -> usize {
        self.effects.cols()
    }

    pub fn allele_labels(&self) -> &[char] {
        &self.effect_names
    }

    /// Row index of `label` in the effect table, if it has one.
    pub fn row_of(&self, label: char) -> Option<usize> {
        self.effect_names.iter().position(|&c| c == label)
    }

    pub fn effect_of(&self, label: char, marker: usize) -> Option<f64> {
        self.row_of(label).map(|row| self.effects.get(row, marker))
    }

    pub fn effects(&self) -> &DecimalMatrix {
        &self.effects
    }

    /// Best single-copy allele at `marker`: argmax over rows, ties broken
    /// toward the lowest row index (i.e. the allele listed first).
    pub fn best_allele_at(&self, marker: usize) -> SimResult<char> {
        if marker >= self.n_markers() {
            return Err(SimError::invalid_argument(format!(
                "best_allele_at: marker {marker} out of range (0..{})",
                self.n_markers()
            )));
        }
        let mut best_row = 0;
        let mut best_value = self.effects.get(0, marker);
        for row in 1..self.n_alleles() {
            let value = self.effects.get(row, marker);
            if value > best_value {
                best_value = value;
                best_row = row;
            }
        }
        Ok(self.effect_names[best_row])
    }

    /// Length-`n_markers` string of best single-copy alleles.
    pub fn ideal_genotype(&self) -> SimResult<String> {
        (0..self.n_markers()).map(|m| self.best_allele_at(m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_genotype_breaks_ties_toward_first_row() {
        let effects =
            DecimalMatrix::from_rows(vec![vec![0.1, -0.2, 0.5], vec![0.0, 0.9, 0.5]]).unwrap();
        let table = EffectTable::new(vec!['A', 'T'], effects).unwrap();
        assert_eq!(table.ideal_genotype().unwrap(), "ATA");
    }

    #[test]
    fn row_count_must_match_label_count() {
        let effects = DecimalMatrix::zeros(1, 2);
        assert!(EffectTable::new(vec!['A', 'T'], effects).is_err());
    }

    #[test]
    fn effect_of_unknown_label_is_none() {
        let effects = DecimalMatrix::from_rows(vec![vec![1.0]]).unwrap();
        let table = EffectTable::new(vec!['A'], effects).unwrap();
        assert_eq!(table.effect_of('A', 0), Some(1.0));
        assert_eq!(table.effect_of('T', 0), None);
    }
}
