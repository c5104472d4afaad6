use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// How regenerated grass patches are spread over the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrassDistribution {
    /// Per-axis normal around the grid midpoint with `grass_spread` deviation.
    #[default]
    Clustered,
    /// Every cell equally likely.
    Uniform,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Grid width in cells; x coordinates wrap modulo this.
    pub width: usize,
    /// Grid height in cells; y coordinates wrap modulo this.
    pub height: usize,
    /// Number of bison placed at construction.
    pub initial_bison: usize,
    /// Starting energy of every initial bison.
    pub initial_energy: f64,
    /// Mean of the truncated normal the initial cooperation traits are drawn from.
    pub initial_cooperation_mean: f64,
    /// Deviation of the initial cooperation distribution. Zero gives every bison the mean.
    pub initial_cooperation_std: f64,
    /// A bison reproduces once its energy is strictly above this.
    pub reproduce_threshold: f64,
    /// Grass patches spawned at the end of every tick.
    pub grass_per_tick: usize,
    /// Resource carried by each spawned patch.
    pub grass_amount: f64,
    pub grass_distribution: GrassDistribution,
    /// Per-axis deviation, in cells, of clustered regrowth.
    pub grass_spread: f64,
    /// Chance that an offspring's trait is perturbed at all.
    pub mutation_probability: f64,
    pub mutation_std: f64,
    /// Inclusive `[lo, hi]` range every cooperation trait stays within.
    pub cooperation_bounds: [f64; 2],
    /// Claim one random adjacent patch per tick instead of all of them.
    pub single_claim: bool,
    /// Cost `k` of mutual escalation; both escalators receive `0.5 - k`.
    pub battle_cost: f64,
    /// Weight `w` of battle history versus grass attraction in movement.
    pub movement_fight_weight: f64,
    /// Emit per-entity trace events (births, deaths, meals, battles).
    pub verbose: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 10,
            height: 10,
            initial_bison: 10,
            initial_energy: 4.0,
            initial_cooperation_mean: 0.5,
            initial_cooperation_std: 0.1,
            reproduce_threshold: 10.0,
            grass_per_tick: 20,
            grass_amount: 4.0,
            grass_distribution: GrassDistribution::Clustered,
            grass_spread: 2.5,
            mutation_probability: 1.0,
            mutation_std: 0.1,
            cooperation_bounds: [0.05, 0.95],
            single_claim: true,
            battle_cost: 0.5,
            movement_fight_weight: 0.5,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    ZeroGridDimension,
    GridTooLarge { max: usize, actual: usize },
    TooManyBison { max: usize, actual: usize },
    TooMuchGrass { max: usize, actual: usize },
    NonFinite { field: &'static str },
    Negative { field: &'static str, value: f64 },
    NotPositive { field: &'static str, value: f64 },
    NotUnitInterval { field: &'static str, value: f64 },
    InvalidCooperationBounds { lo: f64, hi: f64 },
    CooperationMeanOutOfBounds { mean: f64, lo: f64, hi: f64 },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::ZeroGridDimension => write!(f, "width and height must be positive"),
            SimConfigError::GridTooLarge { max, actual } => {
                write!(f, "grid dimension ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::TooManyBison { max, actual } => {
                write!(f, "initial_bison ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::TooMuchGrass { max, actual } => {
                write!(f, "grass_per_tick ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::NonFinite { field } => write!(f, "{field} must be finite"),
            SimConfigError::Negative { field, value } => {
                write!(f, "{field} must be non-negative, got {value}")
            }
            SimConfigError::NotPositive { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            SimConfigError::NotUnitInterval { field, value } => {
                write!(f, "{field} must lie in [0, 1], got {value}")
            }
            SimConfigError::InvalidCooperationBounds { lo, hi } => write!(
                f,
                "cooperation_bounds [{lo}, {hi}] must satisfy 0 <= lo <= hi <= 1"
            ),
            SimConfigError::CooperationMeanOutOfBounds { mean, lo, hi } => write!(
                f,
                "initial_cooperation_mean ({mean}) must lie within cooperation_bounds [{lo}, {hi}]"
            ),
        }
    }
}

impl Error for SimConfigError {}

fn finite(field: &'static str, value: f64) -> Result<f64, SimConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimConfigError::NonFinite { field })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SimConfigError> {
    if finite(field, value)? < 0.0 {
        return Err(SimConfigError::Negative { field, value });
    }
    Ok(())
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), SimConfigError> {
    if !(0.0..=1.0).contains(&finite(field, value)?) {
        return Err(SimConfigError::NotUnitInterval { field, value });
    }
    Ok(())
}

impl SimConfig {
    pub const MAX_GRID_DIMENSION: usize = 4096;
    pub const MAX_INITIAL_BISON: usize = 1_000_000;
    pub const MAX_GRASS_PER_TICK: usize = 1_000_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(SimConfigError::ZeroGridDimension);
        }
        let largest = self.width.max(self.height);
        if largest > Self::MAX_GRID_DIMENSION {
            return Err(SimConfigError::GridTooLarge {
                max: Self::MAX_GRID_DIMENSION,
                actual: largest,
            });
        }
        if self.initial_bison > Self::MAX_INITIAL_BISON {
            return Err(SimConfigError::TooManyBison {
                max: Self::MAX_INITIAL_BISON,
                actual: self.initial_bison,
            });
        }
        if self.grass_per_tick > Self::MAX_GRASS_PER_TICK {
            return Err(SimConfigError::TooMuchGrass {
                max: Self::MAX_GRASS_PER_TICK,
                actual: self.grass_per_tick,
            });
        }

        non_negative("initial_energy", self.initial_energy)?;
        non_negative("reproduce_threshold", self.reproduce_threshold)?;
        if finite("grass_amount", self.grass_amount)? <= 0.0 {
            return Err(SimConfigError::NotPositive {
                field: "grass_amount",
                value: self.grass_amount,
            });
        }
        non_negative("grass_spread", self.grass_spread)?;
        non_negative("mutation_std", self.mutation_std)?;
        non_negative("initial_cooperation_std", self.initial_cooperation_std)?;
        non_negative("battle_cost", self.battle_cost)?;
        unit_interval("mutation_probability", self.mutation_probability)?;
        unit_interval("movement_fight_weight", self.movement_fight_weight)?;

        let [lo, hi] = self.cooperation_bounds;
        finite("cooperation_bounds", lo)?;
        finite("cooperation_bounds", hi)?;
        if lo < 0.0 || hi > 1.0 || lo > hi {
            return Err(SimConfigError::InvalidCooperationBounds { lo, hi });
        }
        let mean = finite("initial_cooperation_mean", self.initial_cooperation_mean)?;
        if !(lo..=hi).contains(&mean) {
            return Err(SimConfigError::CooperationMeanOutOfBounds { mean, lo, hi });
        }
        Ok(())
    }

    /// Parse a possibly partial JSON config; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Whether `value` lies inside the inclusive cooperation bounds.
    pub fn cooperation_in_bounds(&self, value: f64) -> bool {
        let [lo, hi] = self.cooperation_bounds;
        (lo..=hi).contains(&value)
    }
}
