//! Tabular file conventions and plain-text dump writers.
//!
//! File *parsing* beyond dimension-checking and the block-definition
//! table stays out of scope (these are the tabular conventions the
//! core's external collaborators are expected to honour), plus the
//! plain dump writers the crossing orchestrator can optionally stream
//! to.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{SimError, SimResult};
use crate::groups;
use crate::interrupt::YieldCheck;
use crate::store::GenotypeStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TableSize {
    pub num_rows: usize,
    pub num_columns: usize,
}

/// Reports `(num_rows, num_columns)` for a delimited text file. Columns
/// are counted by separator occurrences + 1 on the first non-empty row;
/// every later non-empty row must match that column count.
pub fn file_dimensions(path: &Path, sep: u8) -> SimResult<TableSize> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut num_rows = 0usize;
    let mut expected_columns = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let columns = line.as_bytes().iter().filter(|&&b| b == sep).count() + 1;
        match expected_columns {
            None => expected_columns = Some(columns),
            Some(expected) if columns != expected => {
                return Err(SimError::invalid_argument(format!(
                    "Bad columns on row {}",
                    line_no + 1
                )));
            }
            _ => {}
        }
        num_rows += 1;
    }

    Ok(TableSize {
        num_rows,
        num_columns: expected_columns.unwrap_or(0),
    })
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockDefinition {
    pub name: String,
    pub markers: Vec<String>,
}

/// Reads a tab-separated block-definition file with a one-line header:
/// each subsequent row has four leading tokens (`chrom pos name class`)
/// followed by a whitespace-delimited field of semicolon-separated
/// marker names forming that block.
pub fn read_block_definitions(path: &Path) -> SimResult<Vec<BlockDefinition>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (line_no, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 5 {
            return Err(SimError::invalid_argument(format!(
                "read_block_definitions: row {} has fewer than 5 columns",
                line_no + 1
            )));
        }
        let name = columns[2].to_string();
        let markers = columns[4].split(';').map(str::to_string).collect();
        out.push(BlockDefinition { name, markers });
    }
    Ok(out)
}

fn individual_label(store: &GenotypeStore, index: usize) -> SimResult<String> {
    let (block_idx, slot) = store.locate(index)?;
    Ok(match store.blocks()[block_idx].name_at(slot) {
        Some(name) => name.to_string(),
        None => format!("G{index}"),
    })
}

/// Dumps the genotype string of every member of `group` (or the whole
/// population if `None`), one row per individual.
pub fn write_genotypes(
    store: &GenotypeStore,
    group: Option<u32>,
    out: &mut dyn Write,
    yield_check: &mut dyn YieldCheck,
) -> SimResult<()> {
    let indexes = match group {
        Some(g) => groups::group_indexes(store, g),
        None => (0..store.n_individuals()).collect(),
    };
    for index in indexes {
        yield_check.check()?;
        let label = individual_label(store, index)?;
        let genes = crate::locator::genes_of_index(store, index)?;
        writeln!(out, "{label} {genes}").map_err(SimError::Io)?;
    }
    Ok(())
}

/// Dumps one-step pedigree (`label parent1 parent2`) for every member of
/// `group` (or the whole population).
pub fn write_pedigree_one_step(
    store: &GenotypeStore,
    group: Option<u32>,
    out: &mut dyn Write,
    yield_check: &mut dyn YieldCheck,
) -> SimResult<()> {
    let indexes = match group {
        Some(g) => groups::group_indexes(store, g),
        None => (0..store.n_individuals()).collect(),
    };
    for index in indexes {
        yield_check.check()?;
        let label = individual_label(store, index)?;
        let (block_idx, slot) = store.locate(index)?;
        let (p1, p2) = store.blocks()[block_idx].parents_at(slot);
        writeln!(out, "{label} {p1} {p2}").map_err(SimError::Io)?;
    }
    Ok(())
}

/// Dumps `label gebv` for every member of `group` (or the whole
/// population).
pub fn write_gebvs(
    store: &GenotypeStore,
    effects: &crate::effects::EffectTable,
    group: Option<u32>,
    out: &mut dyn Write,
    yield_check: &mut dyn YieldCheck,
) -> SimResult<()> {
    let g = group.ok_or_else(|| SimError::invalid_argument("write_gebvs: an explicit group is required"))?;
    let values = crate::gebv::gebv_for_group_yielding(store, effects, g, yield_check)?;
    let indexes = groups::group_indexes(store, g);
    for (i, index) in indexes.into_iter().enumerate() {
        let label = individual_label(store, index)?;
        writeln!(out, "{label} {}", values.get(0, i)).map_err(SimError::Io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::NeverInterrupt;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write as _;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn file_dimensions_counts_rows_and_columns() {
        let path = write_temp("a,b,c\n1,2,3\n4,5,6\n");
        let size = file_dimensions(path.path(), b',').unwrap();
        assert_eq!(size, TableSize { num_rows: 3, num_columns: 3 });
    }

    #[test]
    fn file_dimensions_rejects_ragged_rows() {
        let path = write_temp("a,b,c\n1,2\n");
        let err = file_dimensions(path.path(), b',').unwrap_err();
        assert!(err.to_string().contains("Bad columns on row 2"));
    }

    #[test]
    fn read_block_definitions_parses_semicolon_marker_lists() {
        let path = write_temp("chrom\tpos\tname\tclass\tmarkers\n1\t0.0\tb0\tQTL\tm0;m1\n1\t2.0\tb1\tQTL\tm2\n");
        let blocks = read_block_definitions(path.path()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "b0");
        assert_eq!(blocks[0].markers, vec!["m0".to_string(), "m1".to_string()]);
        assert_eq!(blocks[1].markers, vec!["m2".to_string()]);
    }

    #[test]
    fn write_genotypes_uses_synthetic_label_when_unnamed() {
        let mut store = GenotypeStore::new(1);
        store.append("AA".to_string(), (0, 0), None, 1).unwrap();
        let mut out = Vec::new();
        write_genotypes(&store, None, &mut out, &mut NeverInterrupt).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "G0 AA\n");
    }
}
