use super::{ExperimentError, Model};
use crate::config::{SimConfig, SimConfigError};
use crate::entity::{Breed, EntityId};
use crate::schedule;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub activation_us: u64,
    pub regrowth_us: u64,
    pub total_us: u64,
}

/// Read-only projection of the model taken after each tick's activation phase.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub bison_count: usize,
    /// Patches live when the tick started, i.e. the grass the herd competed for.
    pub grass_available: usize,
    /// Patches left after resolution and before regrowth. Every patch resolves
    /// within its first tick, so this is 0 unless grass was added mid-tick.
    pub grass_count: usize,
    pub cooperation_mean: f64,
    /// Population standard deviation.
    pub cooperation_std: f64,
    pub battles: usize,
    pub births: usize,
    pub deaths: usize,
    pub grass_eaten: usize,
    pub grass_expired: usize,
    pub energy_total: f64,
    pub mean_generation: f64,
    /// Mean ticks since birth over the live herd.
    pub mean_age: f64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub steps: usize,
    pub sample_every: usize,
    pub final_bison_count: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub total_births: usize,
    #[serde(default)]
    pub total_deaths: usize,
    #[serde(default)]
    pub total_battles: usize,
    /// First tick that ended with no bison alive.
    #[serde(default)]
    pub extinction_step: Option<usize>,
    /// Mean of the sampled cooperation means over non-extinct samples.
    #[serde(default)]
    pub run_cooperation_mean: Option<f64>,
    #[serde(default)]
    pub run_cooperation_std: Option<f64>,
}

impl RunSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run-level cooperation statistics; `None` with fewer than two populated samples.
pub(crate) fn run_cooperation_stats(samples: &[StepMetrics]) -> (Option<f64>, Option<f64>) {
    let values: Vec<f64> = samples
        .iter()
        .filter(|s| s.bison_count > 0)
        .map(|s| s.cooperation_mean)
        .collect();
    if values.len() < 2 {
        return (None, None);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (Some(mean), Some(schedule::population_std(&values)))
}

impl Model {
    pub(crate) fn collect_step_metrics(&self) -> StepMetrics {
        let bison = &self.world.bison;
        let cooperation = |id: EntityId| bison.get(&id).map(|b| b.cooperation);
        let count = self.schedule.count(Breed::Bison);
        let step = self.world.step_index;
        let (energy_total, generation_sum, age_sum) = self
            .schedule
            .ids(Breed::Bison)
            .filter_map(|id| bison.get(&id))
            .fold((0.0, 0.0, 0.0), |(e, g, a), b| {
                (
                    e + b.energy,
                    g + b.generation as f64,
                    a + step.saturating_sub(b.born_step) as f64,
                )
            });
        let denom = count.max(1) as f64;

        StepMetrics {
            step,
            bison_count: count,
            grass_available: self.world.tick.grass_available,
            grass_count: self.schedule.count(Breed::Grass),
            cooperation_mean: self.schedule.mean(Breed::Bison, cooperation),
            cooperation_std: self.schedule.population_std(Breed::Bison, cooperation),
            battles: self.world.tick.battles,
            births: self.world.tick.births,
            deaths: self.world.tick.deaths,
            grass_eaten: self.world.tick.grass_eaten,
            grass_expired: self.world.tick.grass_expired,
            energy_total,
            mean_generation: generation_sum / denom,
            mean_age: age_sum / denom,
        }
    }

    /// Metrics of the model as it stands right now, e.g. after regrowth.
    pub fn snapshot(&self) -> StepMetrics {
        self.collect_step_metrics()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicateError {
    Config(SimConfigError),
    Experiment(ExperimentError),
}

impl fmt::Display for ReplicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicateError::Config(e) => write!(f, "{}", e),
            ReplicateError::Experiment(e) => write!(f, "{}", e),
        }
    }
}

impl From<SimConfigError> for ReplicateError {
    fn from(err: SimConfigError) -> Self {
        ReplicateError::Config(err)
    }
}

impl From<ExperimentError> for ReplicateError {
    fn from(err: ExperimentError) -> Self {
        ReplicateError::Experiment(err)
    }
}

impl Error for ReplicateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReplicateError::Config(e) => Some(e),
            ReplicateError::Experiment(e) => Some(e),
        }
    }
}

/// Run one independent world per seed in parallel. Summaries come back in `seeds` order.
pub fn run_replicates(
    config: &SimConfig,
    seeds: &[u64],
    steps: usize,
    sample_every: usize,
) -> Result<Vec<RunSummary>, ReplicateError> {
    config.validate()?;
    Model::check_experiment(steps, sample_every)?;
    seeds
        .par_iter()
        .map(|&seed| -> Result<RunSummary, ReplicateError> {
            let mut model = Model::try_new(SimConfig {
                seed,
                ..config.clone()
            })?;
            Ok(model.try_run_experiment(steps, sample_every)?)
        })
        .collect()
}
