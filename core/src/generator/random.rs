use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::*;

/// Uniform placement without replacement: every cell is equally likely to
/// hold a bomb and no cell holds two. Deterministic for a given seed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RandomBombPlacer {
    seed: u64,
}

impl RandomBombPlacer {
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::rng().random())
    }
}

impl BombPlacer for RandomBombPlacer {
    fn place(self, size: Coord2, bombs: CellCount) -> Result<BombLayout> {
        let cells = area(size.0, size.1);
        if bombs == 0 || bombs >= cells {
            return Err(GameError::InvalidBombCount { bombs, cells });
        }

        let width = usize::from(size.1);
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut mask: Array2<bool> = Array2::default(size.to_nd_index());

        // distinct cell indices, uniformly chosen
        for index in rand::seq::index::sample(&mut rng, usize::from(cells), usize::from(bombs)) {
            mask[[index / width, index % width]] = true;
        }

        Ok(BombLayout::from_mask(mask))
    }
}
