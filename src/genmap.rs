//! Genetic map: marker name/position table and chromosome boundaries.

use crate::error::{SimError, SimResult};

/// `(chromosome, position)`. Chromosome `0` means "uninitialised /
/// missing"; such markers sort to the tail of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPosition {
    pub chromosome: u8,
    pub position: f64,
}

#[derive(Debug, Clone)]
pub struct GeneticMap {
    names: Vec<String>,
    positions: Vec<MarkerPosition>,
    /// Marker-index bounds per chromosome, length `n_chr + 1`.
    chr_ends: Vec<usize>,
    /// centiMorgan span per chromosome, length `n_chr`.
    chr_lengths: Vec<f64>,
}

impl GeneticMap {
    /// Builds a map from a parallel name/position list, sorting by
    /// `(chromosome, position)` with chromosome-0 entries moved to the
    /// tail. Order among equal keys is unspecified, so a plain
    /// (non-stable-guaranteed) key comparison suffices.
    pub fn new(names: Vec<String>, positions: Vec<MarkerPosition>) -> SimResult<Self> {
        if names.len() != positions.len() {
            return Err(SimError::shape_mismatch(
                "GeneticMap::new: names and positions must have equal length",
            ));
        }
        let mut order: Vec<usize> = (0..names.len()).collect();
        order.sort_by(|&a, &b| sort_key(&positions[a]).partial_cmp(&sort_key(&positions[b])).unwrap());

        let sorted_names = order.iter().map(|&i| names[i].clone()).collect();
        let sorted_positions: Vec<MarkerPosition> = order.iter().map(|&i| positions[i]).collect();

        let mut map = Self {
            names: sorted_names,
            positions: sorted_positions,
            chr_ends: Vec::new(),
            chr_lengths: Vec::new(),
        };
        map.compute_chromosome_bounds();
        Ok(map)
    }

    fn compute_chromosome_bounds(&mut self) {
        self.chr_ends.clear();
        self.chr_lengths.clear();
        self.chr_ends.push(0);

        let mut i = 0;
        while i < self.positions.len() && self.positions[i].chromosome != 0 {
            let chrom = self.positions[i].chromosome;
            let start = i;
            while i < self.positions.len() && self.positions[i].chromosome == chrom {
                i += 1;
            }
            let span = self.positions[i - 1].position - self.positions[start].position;
            self.chr_lengths.push(span);
            self.chr_ends.push(i);
        }
    }

    pub fn n_markers(&self) -> usize {
        self.names.len()
    }

    pub fn n_chromosomes(&self) -> usize {
        self.chr_lengths.len()
    }

    pub fn chr_ends(&self) -> &[usize] {
        &self.chr_ends
    }

    pub fn chr_lengths(&self) -> &[f64] {
        &self.chr_lengths
    }

    pub fn name(&self, marker_index: usize) -> Option<&str> {
        self.names.get(marker_index).map(String::as_str)
    }

    pub fn position(&self, marker_index: usize) -> Option<MarkerPosition> {
        self.positions.get(marker_index).copied()
    }

    /// Linear scan over the unordered name list.
    pub fn marker_index(&self, name: &str) -> SimResult<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SimError::not_found(format!("marker_index: no marker named '{name}'")))
    }
}

fn sort_key(p: &MarkerPosition) -> (u16, f64) {
    if p.chromosome == 0 {
        (u16::MAX, p.position)
    } else {
        (p.chromosome as u16, p.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(chr: u8, p: f64) -> MarkerPosition {
        MarkerPosition {
            chromosome: chr,
            position: p,
        }
    }

    #[test]
    fn sorts_by_chromosome_then_position() {
        let names = vec!["m2".into(), "m0".into(), "m1".into()];
        let positions = vec![pos(1, 5.0), pos(1, 1.0), pos(1, 3.0)];
        let map = GeneticMap::new(names, positions).unwrap();
        assert_eq!(map.name(0), Some("m0"));
        assert_eq!(map.name(1), Some("m1"));
        assert_eq!(map.name(2), Some("m2"));
    }

    #[test]
    fn chromosome_zero_sorts_to_the_tail() {
        let names = vec!["unplaced".into(), "chr1_marker".into()];
        let positions = vec![pos(0, 0.0), pos(1, 10.0)];
        let map = GeneticMap::new(names, positions).unwrap();
        assert_eq!(map.name(0), Some("chr1_marker"));
        assert_eq!(map.name(1), Some("unplaced"));
        assert_eq!(map.n_chromosomes(), 1);
    }

    #[test]
    fn computes_chromosome_bounds_and_lengths() {
        let names = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let positions = vec![pos(1, 0.0), pos(1, 5.0), pos(2, 0.0), pos(2, 2.0)];
        let map = GeneticMap::new(names, positions).unwrap();
        assert_eq!(map.chr_ends(), &[0, 2, 4]);
        assert_eq!(map.chr_lengths(), &[5.0, 2.0]);
    }

    #[test]
    fn marker_index_finds_by_name_and_fails_otherwise() {
        let map = GeneticMap::new(vec!["m0".into()], vec![pos(1, 0.0)]).unwrap();
        assert_eq!(map.marker_index("m0").unwrap(), 0);
        assert!(map.marker_index("missing").is_err());
    }
}
