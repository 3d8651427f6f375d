//! Random vessel positions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use streaming::{FeedConfig, PointRecord};

/// Produces full batches of uniformly distributed point records.
///
/// The random source is injected so tests can run with a fixed seed.
#[derive(Debug)]
pub struct PointGenerator<R> {
    rng: R,
    batch_size: usize,
    icon_url: String,
}

impl<R: Rng> PointGenerator<R> {
    pub fn new(rng: R, config: &FeedConfig) -> Self {
        Self {
            rng,
            batch_size: config.batch_size,
            icon_url: config.icon_url.clone(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// One batch with ids `0..batch_size`, longitude in `[-180, 180)` and
    /// latitude in `[-90, 90)`.
    pub fn batch(&mut self) -> Vec<PointRecord> {
        (0..self.batch_size as u64)
            .map(|id| {
                let longitude = self.rng.gen_range(-180.0..180.0);
                let latitude = self.rng.gen_range(-90.0..90.0);
                PointRecord::new(id, longitude, latitude).with_icon(self.icon_url.as_str())
            })
            .collect()
    }
}

impl PointGenerator<StdRng> {
    pub fn seeded(seed: u64, config: &FeedConfig) -> Self {
        Self::new(StdRng::seed_from_u64(seed), config)
    }

    pub fn from_entropy(config: &FeedConfig) -> Self {
        Self::new(StdRng::from_entropy(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::PointGenerator;
    use streaming::{FeedConfig, DEFAULT_ICON_URL};

    fn config(batch_size: usize) -> FeedConfig {
        FeedConfig {
            batch_size,
            ..FeedConfig::default()
        }
    }

    #[test]
    fn batch_has_configured_shape() {
        let mut generator = PointGenerator::seeded(42, &config(5_000));
        let batch = generator.batch();
        assert_eq!(batch.len(), 5_000);
        for (i, rec) in batch.iter().enumerate() {
            assert_eq!(rec.id, i as u64);
            assert!((-180.0..180.0).contains(&rec.longitude), "lon {}", rec.longitude);
            assert!((-90.0..90.0).contains(&rec.latitude), "lat {}", rec.latitude);
            assert_eq!(rec.icon_url.as_deref(), Some(DEFAULT_ICON_URL));
            assert!(rec.color.is_none());
        }
    }

    #[test]
    fn ids_restart_every_batch() {
        let mut generator = PointGenerator::seeded(1, &config(3));
        let first = generator.batch();
        let second = generator.batch();
        let ids = |b: &[streaming::PointRecord]| b.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec![0, 1, 2]);
        assert_eq!(ids(&second), vec![0, 1, 2]);
        assert_ne!(first, second);
    }

    #[test]
    fn same_seed_same_positions() {
        let a = PointGenerator::seeded(9, &config(10)).batch();
        let b = PointGenerator::seeded(9, &config(10)).batch();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_batch_is_allowed() {
        assert!(PointGenerator::seeded(0, &config(0)).batch().is_empty());
    }
}
