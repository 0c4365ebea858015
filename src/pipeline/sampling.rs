//! Seeded row subsampling of large raw extracts

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::seq::index;
use rand::Rng;

use crate::pipeline::columns::take_rows;
use crate::pipeline::loader::{load_dataset, save_dataset};

/// Draw `n` rows without replacement, preserving their original order.
/// Returns the frame unchanged when it has at most `n` rows.
pub fn sample_rows<R: Rng + ?Sized>(df: &DataFrame, n: usize, rng: &mut R) -> Result<DataFrame> {
    if n == 0 {
        anyhow::bail!("Sample size must be at least 1");
    }
    if df.height() <= n {
        return Ok(df.clone());
    }

    let mut picked = index::sample(rng, df.height(), n).into_vec();
    picked.sort_unstable();
    Ok(take_rows(df, &picked)?)
}

/// Sample `n` rows of `input` into `output`
pub fn sample_file<R: Rng + ?Sized>(
    input: &Path,
    output: &Path,
    n: usize,
    infer_schema_length: Option<usize>,
    rng: &mut R,
) -> Result<usize> {
    let df = load_dataset(input, infer_schema_length)?;
    let mut sampled = sample_rows(&df, n, rng)
        .with_context(|| format!("Failed to sample {}", input.display()))?;
    save_dataset(&mut sampled, output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        rows_before = df.height(),
        rows_after = sampled.height(),
        "Sampled dataset"
    );
    Ok(sampled.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frame() -> DataFrame {
        df! { "id" => (0..20i64).collect::<Vec<_>>() }.unwrap()
    }

    #[test]
    fn test_sample_keeps_order_and_size() {
        let mut rng = StdRng::seed_from_u64(10);
        let sampled = sample_rows(&frame(), 5, &mut rng).unwrap();
        let ids: Vec<i64> = sampled.column("id").unwrap().i64().unwrap().into_no_null_iter().collect();

        assert_eq!(ids.len(), 5);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_is_reproducible() {
        let a = sample_rows(&frame(), 7, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = sample_rows(&frame(), 7, &mut StdRng::seed_from_u64(3)).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_sample_larger_than_frame_returns_all() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_rows(&frame(), 100, &mut rng).unwrap().height(), 20);
    }

    #[test]
    fn test_zero_sample_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample_rows(&frame(), 0, &mut rng).is_err());
    }
}
