//! The symmetric two-player game played over a contested grass patch.

use crate::grid::Cell;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Strategy 0: fight for the whole patch.
    Escalate,
    /// Strategy 1: offer to split.
    Share,
}

impl Strategy {
    fn index(self) -> usize {
        match self {
            Strategy::Escalate => 0,
            Strategy::Share => 1,
        }
    }
}

/// A bison shares with probability equal to its cooperation trait.
pub fn choose_strategy<R: Rng + ?Sized>(rng: &mut R, cooperation: f64) -> Strategy {
    if rng.random::<f64>() < cooperation {
        Strategy::Share
    } else {
        Strategy::Escalate
    }
}

/// Fractional shares of the contested amount, indexed `[self][opponent]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PayoffMatrix {
    shares: [[[f64; 2]; 2]; 2],
}

impl PayoffMatrix {
    /// Mutual escalation costs `battle_cost` of each half.
    pub fn with_battle_cost(battle_cost: f64) -> Self {
        let escalated = 0.5 - battle_cost;
        Self {
            shares: [
                [[escalated, escalated], [1.0, 0.0]],
                [[0.0, 1.0], [0.5, 0.5]],
            ],
        }
    }

    pub fn shares(&self, one: Strategy, two: Strategy) -> [f64; 2] {
        self.shares[one.index()][two.index()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContestOutcome {
    pub strategies: [Strategy; 2],
    /// Energy each contestant gains, already scaled by the patch amount.
    pub gains: [f64; 2],
}

/// Play one contest between two bison over `amount` of grass.
///
/// The first contestant draws its strategy first.
pub fn contest<R: Rng + ?Sized>(
    rng: &mut R,
    payoffs: &PayoffMatrix,
    cooperation: [f64; 2],
    amount: f64,
) -> ContestOutcome {
    let one = choose_strategy(rng, cooperation[0]);
    let two = choose_strategy(rng, cooperation[1]);
    let [share_one, share_two] = payoffs.shares(one, two);
    ContestOutcome {
        strategies: [one, two],
        gains: [share_one * amount, share_two * amount],
    }
}

/// Battle locations of the tick being run and of the tick before it.
#[derive(Clone, Debug, Default)]
pub struct BattleLog {
    current: Vec<Cell>,
    previous: Vec<Cell>,
}

impl BattleLog {
    pub fn record(&mut self, cell: Cell) {
        self.current.push(cell);
    }

    /// Battles of the last completed tick; the input to movement.
    pub fn previous(&self) -> &[Cell] {
        &self.previous
    }

    pub fn current(&self) -> &[Cell] {
        &self.current
    }

    /// Close the tick: current becomes previous and a fresh buffer starts.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }
}
