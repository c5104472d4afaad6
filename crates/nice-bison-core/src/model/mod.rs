pub mod lifecycle;
pub mod metrics;

pub use metrics::*;

use crate::config::{SimConfig, SimConfigError};
use crate::conflict::{BattleLog, PayoffMatrix};
use crate::entity::{Breed, EntityId};
use crate::forager::{AxisHistogram, Bison};
use crate::grid::{Cell, SpatialGrid};
use crate::patch::GrassPatch;
use crate::sampling;
use crate::schedule::BreedScheduler;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::collections::HashMap;
use std::time::Instant;
use std::{error::Error, fmt};

/// Entity state and everything the behaviours draw on. The scheduler drives it
/// through [`crate::schedule::Activate`].
pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) grid: SpatialGrid,
    pub(crate) bison: HashMap<EntityId, Bison>,
    pub(crate) grass: HashMap<EntityId, GrassPatch>,
    /// Row and column counts of live grass, for the movement bias.
    pub(crate) grass_axes: AxisHistogram,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) battles: BattleLog,
    pub(crate) payoffs: PayoffMatrix,
    pub(crate) next_entity_id: u64,
    pub(crate) step_index: usize,
    pub(crate) tick: TickCounters,
    pub(crate) total_births: usize,
    pub(crate) total_deaths: usize,
    pub(crate) total_battles: usize,
}

/// Events counted during the tick in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TickCounters {
    pub grass_available: usize,
    pub births: usize,
    pub deaths: usize,
    pub battles: usize,
    pub grass_eaten: usize,
    pub grass_expired: usize,
}

pub struct Model {
    pub(crate) world: World,
    pub(crate) schedule: BreedScheduler,
    pub(crate) last_metrics: StepMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

impl Model {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Validate `config`, scatter the initial herd, and grow the first grass.
    pub fn try_new(config: SimConfig) -> Result<Self, SimConfigError> {
        config.validate()?;

        let mut world = World {
            grid: SpatialGrid::new(config.width, config.height),
            bison: HashMap::with_capacity(config.initial_bison),
            grass: HashMap::with_capacity(config.grass_per_tick),
            grass_axes: AxisHistogram::new(config.width, config.height),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            battles: BattleLog::default(),
            payoffs: PayoffMatrix::with_battle_cost(config.battle_cost),
            next_entity_id: 0,
            step_index: 0,
            tick: TickCounters::default(),
            total_births: 0,
            total_deaths: 0,
            total_battles: 0,
            config,
        };
        let mut schedule = BreedScheduler::new();

        let [lo, hi] = world.config.cooperation_bounds;
        for _ in 0..world.config.initial_bison {
            let cell = Cell::new(
                world.rng.random_range(0..world.config.width),
                world.rng.random_range(0..world.config.height),
            );
            let cooperation = sampling::truncated_normal(
                &mut world.rng,
                world.config.initial_cooperation_mean,
                world.config.initial_cooperation_std,
                lo,
                hi,
            );
            let energy = world.config.initial_energy;
            world.spawn_bison(cell, energy, cooperation, 0, &mut schedule);
        }
        world.grow_grass(&mut schedule);

        let mut model = Self {
            world,
            schedule,
            last_metrics: StepMetrics::default(),
        };
        model.last_metrics = model.collect_step_metrics();
        Ok(model)
    }

    /// Run one tick: bison, then grass, then the metrics snapshot, then regrowth.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.world.step_index = self.world.step_index.saturating_add(1);
        self.world.tick = TickCounters {
            grass_available: self.schedule.count(Breed::Grass),
            ..TickCounters::default()
        };

        let t0 = Instant::now();
        self.schedule.step(&mut self.world);
        let activation_us = t0.elapsed().as_micros() as u64;

        self.world.total_births += self.world.tick.births;
        self.world.total_deaths += self.world.tick.deaths;
        self.world.total_battles += self.world.tick.battles;
        self.last_metrics = self.collect_step_metrics();

        let t1 = Instant::now();
        self.world.grow_grass(&mut self.schedule);
        self.world.battles.rotate();
        let regrowth_us = t1.elapsed().as_micros() as u64;

        tracing::debug!(
            step = self.world.step_index,
            bison = self.last_metrics.bison_count,
            births = self.last_metrics.births,
            deaths = self.last_metrics.deaths,
            battles = self.last_metrics.battles,
            cooperation_mean = self.last_metrics.cooperation_mean,
            "tick complete"
        );

        StepTimings {
            activation_us,
            regrowth_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.world.config
    }

    /// Completed ticks.
    pub fn step_index(&self) -> usize {
        self.world.step_index
    }

    /// Metrics taken after the last tick's activation phase (or at construction).
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.world.grid
    }

    pub fn schedule(&self) -> &BreedScheduler {
        &self.schedule
    }

    /// Battle locations recorded in the last completed tick.
    pub fn last_battles(&self) -> &[Cell] {
        self.world.battles.previous()
    }

    /// Live bison in scheduler insertion order.
    pub fn bison(&self) -> impl Iterator<Item = &Bison> + '_ {
        self.schedule
            .ids(Breed::Bison)
            .filter_map(move |id| self.world.bison.get(&id))
    }

    /// Live grass patches in scheduler insertion order.
    pub fn grass(&self) -> impl Iterator<Item = &GrassPatch> + '_ {
        self.schedule
            .ids(Breed::Grass)
            .filter_map(move |id| self.world.grass.get(&id))
    }

    pub fn bison_by_id(&self, id: EntityId) -> Option<&Bison> {
        self.world.bison.get(&id)
    }

    pub fn bison_count(&self) -> usize {
        self.schedule.count(Breed::Bison)
    }

    pub fn grass_count(&self) -> usize {
        self.schedule.count(Breed::Grass)
    }

    /// Place an extra bison, e.g. to set up a scenario. Its trait must lie within
    /// the configured cooperation bounds.
    pub fn add_bison(&mut self, cell: Cell, energy: f64, cooperation: f64) -> EntityId {
        assert!(
            self.world.config.cooperation_in_bounds(cooperation),
            "cooperation {cooperation} outside configured bounds"
        );
        let cell = self.world.grid.wrap(cell.x as i64, cell.y as i64);
        self.world
            .spawn_bison(cell, energy, cooperation, 0, &mut self.schedule)
    }

    pub fn add_grass(&mut self, cell: Cell, amount: f64) -> EntityId {
        let cell = self.world.grid.wrap(cell.x as i64, cell.y as i64);
        self.world.spawn_grass(cell, amount, &mut self.schedule)
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Step `steps` times, sampling metrics every `sample_every` ticks and on the last tick.
    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        let estimated_samples = Self::check_experiment(steps, sample_every)?;

        let births_before = self.world.total_births;
        let deaths_before = self.world.total_deaths;
        let battles_before = self.world.total_battles;
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut extinction_step = None;
        for step in 1..=steps {
            self.step();
            if extinction_step.is_none() && self.last_metrics.bison_count == 0 {
                extinction_step = Some(self.world.step_index);
            }
            if step % sample_every == 0 || step == steps {
                samples.push(self.last_metrics.clone());
            }
        }
        let (run_cooperation_mean, run_cooperation_std) = metrics::run_cooperation_stats(&samples);
        Ok(RunSummary {
            schema_version: 1,
            seed: self.world.config.seed,
            steps,
            sample_every,
            final_bison_count: self.bison_count(),
            samples,
            total_births: self.world.total_births - births_before,
            total_deaths: self.world.total_deaths - deaths_before,
            total_battles: self.world.total_battles - battles_before,
            extinction_step,
            run_cooperation_mean,
            run_cooperation_std,
        })
    }

    pub(crate) fn check_experiment(
        steps: usize,
        sample_every: usize,
    ) -> Result<usize, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }
        Ok(estimated_samples)
    }
}
