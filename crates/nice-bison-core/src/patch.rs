use crate::entity::EntityId;
use crate::grid::Cell;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A bison's registered interest in a patch for the current tick.
///
/// The trait is captured at claim time; it is fixed for life, so the copy is exact
/// even if the claimant dies before the patch resolves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub bison: EntityId,
    pub cooperation: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrassPatch {
    pub id: EntityId,
    pub cell: Cell,
    pub amount: f64,
    pub claimants: Vec<Claim>,
}

impl GrassPatch {
    pub fn new(id: EntityId, cell: Cell, amount: f64) -> Self {
        Self {
            id,
            cell,
            amount,
            claimants: Vec::new(),
        }
    }

    pub fn claim(&mut self, claim: Claim) {
        self.claimants.push(claim);
    }
}

/// How a patch left the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    /// Nobody claimed it.
    Expired,
    /// A single claimant took the full amount.
    Eaten(Claim),
    /// Two claimants drawn from the full list play the game; the rest get nothing.
    Contested([Claim; 2]),
}

/// Decide who competes for `claimants`. Draws two distinct indices when contested.
pub fn resolve_claims<R: Rng + ?Sized>(rng: &mut R, claimants: &[Claim]) -> Resolution {
    match claimants.len() {
        0 => Resolution::Expired,
        1 => Resolution::Eaten(claimants[0]),
        n => {
            let i = rng.random_range(0..n);
            let mut j = rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            Resolution::Contested([claimants[i], claimants[j]])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn claim(n: u64) -> Claim {
        Claim {
            bison: EntityId(n),
            cooperation: 0.5,
        }
    }

    #[test]
    fn no_claims_expires() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        assert_eq!(resolve_claims(&mut rng, &[]), Resolution::Expired);
    }

    #[test]
    fn single_claim_is_eaten_without_drawing() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mut reference = rng.clone();
        assert_eq!(resolve_claims(&mut rng, &[claim(7)]), Resolution::Eaten(claim(7)));
        assert_eq!(rng.random::<u64>(), reference.random::<u64>());
    }

    #[test]
    fn contested_pair_is_distinct_and_covers_every_claimant() {
        let mut rng = ChaCha12Rng::seed_from_u64(13);
        let claims: Vec<Claim> = (0..4).map(claim).collect();
        let mut seen = [0usize; 4];
        for _ in 0..2_000 {
            let Resolution::Contested([a, b]) = resolve_claims(&mut rng, &claims) else {
                panic!("four claimants must be contested");
            };
            assert_ne!(a.bison, b.bison);
            seen[a.bison.0 as usize] += 1;
            seen[b.bison.0 as usize] += 1;
        }
        // each claimant is in the pair half the time
        for count in seen {
            assert!((800..1200).contains(&count), "selection count {count}");
        }
    }
}
