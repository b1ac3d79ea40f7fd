//! Random segment test between two cell boxes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;
use pvgrid_core::{Aabb, CellId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::scene::LineOfSight;
use crate::tasks::shard_len;

/// Derive the seed of one shard from the build seed and the pair under test.
///
/// The same inputs always produce the same sequence of segments, regardless
/// of which thread runs the shard.
pub fn shard_seed(seed: u64, source: CellId, target: CellId, shard: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    source.hash(&mut hasher);
    target.hash(&mut hasher);
    shard.hash(&mut hasher);
    hasher.finish()
}

/// Uniform point inside `bounds`.
#[inline]
pub fn random_point(rng: &mut impl Rng, bounds: &Aabb) -> Vec3 {
    let t = Vec3::new(rng.random(), rng.random(), rng.random());
    bounds.min + bounds.size() * t
}

/// Casts `rays` random segments between two boxes, split over `shards`.
#[derive(Clone, Copy, Debug)]
pub struct Shotgun {
    pub rays: usize,
    pub shards: usize,
    pub seed: u64,
}

impl Shotgun {
    /// Returns `true` as soon as any segment from `from` to `to` is clear.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn any_clear<S: LineOfSight + ?Sized>(
        &self,
        scene: &S,
        source: CellId,
        from: &Aabb,
        target: CellId,
        to: &Aabb,
    ) -> bool {
        if self.rays == 0 {
            return false;
        }

        let shards = self.shards.max(1);
        let per_shard = shard_len(self.rays, shards);
        let clear = AtomicBool::new(false);

        (0..shards).into_par_iter().for_each(|shard| {
            let count = per_shard.min(self.rays.saturating_sub(shard * per_shard));
            let mut rng = ChaCha8Rng::seed_from_u64(shard_seed(self.seed, source, target, shard));
            for _ in 0..count {
                if clear.load(Ordering::Relaxed) {
                    return;
                }
                let a = random_point(&mut rng, from);
                let b = random_point(&mut rng, to);
                if !scene.is_blocked(a, b) {
                    clear.store(true, Ordering::Relaxed);
                    return;
                }
            }
        });

        clear.into_inner()
    }
}
