//! Sample catalog generation.
//!
//! When no models exist yet, we generate a set of channel models with a
//! spread of link qualities so the simulator has something to run against.
//!
//! # Design
//!
//! Generated models mix:
//! - Good links (rare, short failure bursts)
//! - Average links
//! - Poor links (frequent, long failure bursts)
//!
//! Probabilities are drawn in whole thousandths so the written records stay
//! readable and every row sums to exactly 1.

use linksim_core::ChannelModel;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

/// Slot times offered to generated models, in milliseconds.
const TX_TIMES_MS: [u32; 6] = [25, 50, 100, 200, 400, 1000];

/// Generate `count` sample models from `seed`.
pub fn generate_models(seed: u64, count: usize) -> Vec<ChannelModel> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    (0..count)
        .map(|i| {
            let tx_time_ms = TX_TIMES_MS[rng.gen_range(0..TX_TIMES_MS.len())];

            // Choose link quality randomly
            let quality: u8 = rng.gen_range(0..10);
            let (label, leave_good, leave_bad) = match quality {
                // 30% good
                0..=2 => ("good", rng.gen_range(5..=50), rng.gen_range(500..=950)),
                // 40% average
                3..=6 => ("average", rng.gen_range(50..=200), rng.gen_range(200..=600)),
                // 30% poor
                _ => ("poor", rng.gen_range(200..=600), rng.gen_range(20..=200)),
            };

            ChannelModel::new(
                format!("Generated {:02}", i + 1),
                format!("Seeded sample, {label} link (seed {seed})"),
                f64::from(tx_time_ms),
                [
                    milli(1000 - leave_good),
                    milli(leave_good),
                    milli(leave_bad),
                    milli(1000 - leave_bad),
                ],
            )
        })
        .collect()
}

fn milli(value: u32) -> f64 {
    f64::from(value) / 1000.0
}

/// Write generated models into `dir` as `generated_NN.txt` records.
///
/// Numbers are zero-padded to the width of `count` (at least two digits), so
/// file-name order matches generation order. Creates the directory if needed
/// and returns the written paths.
pub fn write_sample_catalog(dir: &Path, seed: u64, count: usize) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let width = count.to_string().len().max(2);
    let mut paths = Vec::with_capacity(count);
    for (i, model) in generate_models(seed, count).iter().enumerate() {
        let path = dir.join(format!("generated_{:0width$}.txt", i + 1));
        std::fs::write(&path, model.to_record())?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linksim_core::ModelCatalog;

    #[test]
    fn test_generate_models() {
        let models = generate_models(42, 8);
        assert_eq!(models.len(), 8);

        for model in &models {
            assert!(model.validate().is_ok(), "{model}");
            assert!((model.p00() + model.p01() - 1.0).abs() < 1e-12);
            assert!((model.p10() + model.p11() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_determinism() {
        assert_eq!(generate_models(12345, 5), generate_models(12345, 5));
    }

    #[test]
    fn test_different_seeds() {
        assert_ne!(generate_models(1, 5), generate_models(2, 5));
    }

    #[test]
    fn test_written_catalog_loads_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("Models");

        let paths = write_sample_catalog(&target, 7, 12).unwrap();
        assert_eq!(paths.len(), 12);

        let catalog = ModelCatalog::load(&target).unwrap();
        let loaded: Vec<ChannelModel> = catalog.models().map(|m| (**m).clone()).collect();
        assert_eq!(loaded, generate_models(7, 12));
    }

    #[test]
    fn test_large_catalog_keeps_generation_order() {
        let dir = tempfile::TempDir::new().unwrap();

        let paths = write_sample_catalog(dir.path(), 3, 120).unwrap();
        assert!(paths[0].ends_with("generated_001.txt"));
        assert!(paths[119].ends_with("generated_120.txt"));

        let catalog = ModelCatalog::load(dir.path()).unwrap();
        let titles: Vec<&str> = catalog.models().map(|m| m.title()).collect();
        let expected: Vec<String> = (1..=120).map(|i| format!("Generated {:02}", i)).collect();
        assert_eq!(titles, expected);
    }
}
