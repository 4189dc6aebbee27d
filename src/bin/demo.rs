//! A small command-line driver over the breeding simulation core.
//!
//! This is not a collaborator the library depends on (it is an ambient
//! demonstration harness): parse a subcommand, wire a few library calls
//! together, print the result. It hardcodes a tiny founder population so
//! the whole pipeline (map -> effects -> store -> cross -> GEBV) is
//! runnable end to end without external file parsers, which this crate
//! deliberately does not provide.

use std::process;

use clap::{Parser, Subcommand};
use rand::SeedableRng;

use bijmantra_breeding::config;
use bijmantra_breeding::cross::{self, CrossOptions, FreeRecombinationSampler};
use bijmantra_breeding::effects::EffectTable;
use bijmantra_breeding::gebv;
use bijmantra_breeding::genmap::{GeneticMap, MarkerPosition};
use bijmantra_breeding::groups;
use bijmantra_breeding::matrix::DecimalMatrix;
use bijmantra_breeding::store::GenotypeStore;

#[derive(Parser)]
#[command(name = "breeding-sim-demo", about = "Demonstrates the breeding simulation core end to end")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Found a population of homozygous parents, cross them at random, and
    /// print the GEBV ranking of the resulting cohort.
    Cross {
        /// Number of founder individuals to create.
        #[arg(long, default_value_t = 6)]
        founders: usize,
        /// Number of random crosses to perform among the founders.
        #[arg(long, default_value_t = 4)]
        crosses: usize,
        /// Offspring produced per cross.
        #[arg(long, default_value_t = 2)]
        family_size: u32,
        /// Random seed, for reproducible demo runs.
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Print the ideal (best single-copy-per-marker) genotype for the
    /// built-in demo marker/effect set.
    Ideal,
}

fn demo_map() -> GeneticMap {
    GeneticMap::new(
        vec!["m0".into(), "m1".into(), "m2".into(), "m3".into()],
        vec![
            MarkerPosition { chromosome: 1, position: 0.0 },
            MarkerPosition { chromosome: 1, position: 12.5 },
            MarkerPosition { chromosome: 2, position: 0.0 },
            MarkerPosition { chromosome: 2, position: 8.0 },
        ],
    )
    .expect("demo map is internally consistent")
}

fn demo_effects() -> EffectTable {
    // Rows: A, T. Column per marker.
    let effects = DecimalMatrix::from_rows(vec![
        vec![1.0, 0.5, -0.5, 0.2],
        vec![0.0, 0.0, 0.0, 0.0],
    ])
    .expect("demo effect table is rectangular");
    EffectTable::new(vec!['A', 'T'], effects).expect("demo effect table row count matches labels")
}

fn found_population(store: &mut GenotypeStore, n_founders: usize) -> u32 {
    let founders_group = 1;
    for i in 0..n_founders {
        let allele = if i % 2 == 0 { 'A' } else { 'T' };
        let genotype: String = std::iter::repeat(allele).take(2 * store.n_markers()).collect();
        store.append(genotype, (0, 0), None, founders_group).unwrap();
    }
    store.allocate_ids(0, n_founders - 1).unwrap();
    store.set_names_from(0, "Founder").unwrap();
    founders_group
}

fn run_cross(founders: usize, crosses: usize, family_size: u32, seed: u64) {
    let map = demo_map();
    let effects = demo_effects();
    let mut store = GenotypeStore::new(map.n_markers());

    let founders_group = found_population(&mut store, founders);
    log::info!("founded {founders} individuals in group {founders_group}");

    let mut pair_rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut sampler = FreeRecombinationSampler::new(rand::rngs::StdRng::seed_from_u64(seed.wrapping_add(1)));
    let opts = CrossOptions {
        will_name: true,
        name_prefix: Some("Cross".into()),
        family_size,
        track_pedigree: true,
        ..CrossOptions::default()
    };

    let offspring_group = match cross::cross_randomly(
        &mut store,
        &map,
        &mut sampler,
        founders_group,
        crosses,
        Some(&effects),
        &opts,
        &mut pair_rng,
    ) {
        Ok(g) => g,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };

    let size = groups::group_size(&store, offspring_group);
    println!("produced {size} offspring in group {offspring_group}");

    let ranked = match gebv::top_n_by_gebv(&mut store, &effects, offspring_group, size.min(3), false) {
        Ok(g) => g,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };

    println!("top {} by GEBV:", groups::group_size(&store, ranked));
    for (name, id) in groups::group_names(&store, ranked)
        .into_iter()
        .zip(groups::group_ids(&store, ranked))
    {
        println!("  {} (id {id})", name.unwrap_or("<unnamed>"));
    }
}

fn run_ideal() {
    let effects = demo_effects();
    match gebv::ideal_genotype(&effects) {
        Ok(genotype) => println!("{genotype}"),
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    }
}

fn main() {
    config::init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Cross { founders, crosses, family_size, seed } => run_cross(founders, crosses, family_size, seed),
        Command::Ideal => run_ideal(),
    }
}
