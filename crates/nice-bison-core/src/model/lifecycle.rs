use super::World;
use crate::config::GrassDistribution;
use crate::conflict;
use crate::entity::{Breed, EntityId, Occupant};
use crate::forager::{self, Bison, DirectionWeights};
use crate::grid::Cell;
use crate::patch::{self, Claim, GrassPatch, Resolution};
use crate::sampling;
use crate::schedule::{Activate, BreedScheduler};
use rand::Rng;
use rand_chacha::ChaCha12Rng;

impl Activate for World {
    fn rng(&mut self) -> &mut ChaCha12Rng {
        &mut self.rng
    }

    fn activate(&mut self, breed: Breed, id: EntityId, schedule: &mut BreedScheduler) {
        match breed {
            Breed::Bison => self.step_bison(id, schedule),
            Breed::Grass => self.step_grass(id, schedule),
        }
    }
}

impl World {
    fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub(crate) fn spawn_bison(
        &mut self,
        cell: Cell,
        energy: f64,
        cooperation: f64,
        generation: u32,
        schedule: &mut BreedScheduler,
    ) -> EntityId {
        debug_assert!(self.config.cooperation_in_bounds(cooperation));
        let id = self.next_entity_id();
        self.bison.insert(
            id,
            Bison {
                id,
                cell,
                energy,
                cooperation,
                born_step: self.step_index,
                generation,
            },
        );
        self.grid.place(Occupant::Bison(id), cell);
        schedule.add(Breed::Bison, id);
        id
    }

    pub(crate) fn spawn_grass(
        &mut self,
        cell: Cell,
        amount: f64,
        schedule: &mut BreedScheduler,
    ) -> EntityId {
        let id = self.next_entity_id();
        self.grass.insert(id, GrassPatch::new(id, cell, amount));
        self.grid.place(Occupant::Grass(id), cell);
        self.grass_axes.insert(cell);
        schedule.add(Breed::Grass, id);
        id
    }

    fn remove_bison(&mut self, id: EntityId, schedule: &mut BreedScheduler) {
        if let Some(bison) = self.bison.remove(&id) {
            self.grid.remove(Occupant::Bison(id), bison.cell);
            schedule.remove(Breed::Bison, id);
        }
    }

    /// Credit energy to a claimant that may have died since claiming.
    fn feed(&mut self, id: EntityId, amount: f64) {
        if let Some(bison) = self.bison.get_mut(&id) {
            bison.energy += amount;
        }
    }

    fn register_claim(&mut self, patch: EntityId, claim: Claim) {
        if let Some(patch) = self.grass.get_mut(&patch) {
            patch.claim(claim);
        }
    }

    /// Move, metabolise, claim, then die or maybe reproduce.
    fn step_bison(&mut self, id: EntityId, schedule: &mut BreedScheduler) {
        let Some((from, cooperation)) = self.bison.get(&id).map(|b| (b.cell, b.cooperation))
        else {
            return;
        };

        let fights = DirectionWeights::half_plane(from, self.battles.previous().iter().copied());
        let food = self.grass_axes.direction_weights(from);
        let weights = forager::movement_weights(
            cooperation,
            &fights,
            &food,
            self.config.movement_fight_weight,
        );
        let direction = weights.pick(self.rng.random::<f64>());
        let (dx, dy) = direction.offset();
        let target = self.grid.offset(from, dx, dy);
        let cell = self.grid.move_to(Occupant::Bison(id), from, target);

        let energy = match self.bison.get_mut(&id) {
            Some(bison) => {
                bison.cell = cell;
                bison.energy -= 1.0;
                bison.energy
            }
            None => return,
        };

        let patches: Vec<EntityId> = self
            .grid
            .neighbors(cell, 1, true)
            .into_iter()
            .filter_map(Occupant::grass)
            .collect();
        let claim = Claim {
            bison: id,
            cooperation,
        };
        if self.config.single_claim {
            if !patches.is_empty() {
                let pick = patches[self.rng.random_range(0..patches.len())];
                self.register_claim(pick, claim);
            }
        } else {
            for patch in patches {
                self.register_claim(patch, claim);
            }
        }

        if energy < 0.0 {
            self.remove_bison(id, schedule);
            self.tick.deaths += 1;
            if self.config.verbose {
                tracing::debug!(bison = %id, ?cell, "bison starved");
            }
            return;
        }

        if energy > self.config.reproduce_threshold {
            self.reproduce(id, schedule);
        }
    }

    fn reproduce(&mut self, parent: EntityId, schedule: &mut BreedScheduler) {
        let Some(bison) = self.bison.get_mut(&parent) else {
            return;
        };
        bison.energy /= 2.0;
        let (cell, energy, parent_cooperation, generation) =
            (bison.cell, bison.energy, bison.cooperation, bison.generation);

        let cooperation = forager::inherit_cooperation(&mut self.rng, parent_cooperation, &self.config);
        let child = self.spawn_bison(
            cell,
            energy,
            cooperation,
            generation.saturating_add(1),
            schedule,
        );
        self.tick.births += 1;
        if self.config.verbose {
            tracing::debug!(
                parent = %parent,
                child = %child,
                energy,
                cooperation,
                "bison reproduced"
            );
        }
    }

    /// Resolve claims and leave the world, whatever the outcome.
    fn step_grass(&mut self, id: EntityId, schedule: &mut BreedScheduler) {
        let Some(patch) = self.grass.remove(&id) else {
            return;
        };
        self.grid.remove(Occupant::Grass(id), patch.cell);
        self.grass_axes.remove(patch.cell);
        schedule.remove(Breed::Grass, id);

        match patch::resolve_claims(&mut self.rng, &patch.claimants) {
            Resolution::Expired => {
                self.tick.grass_expired += 1;
            }
            Resolution::Eaten(claim) => {
                self.feed(claim.bison, patch.amount);
                self.tick.grass_eaten += 1;
                if self.config.verbose {
                    tracing::trace!(grass = %id, bison = %claim.bison, amount = patch.amount, "grass eaten");
                }
            }
            Resolution::Contested([one, two]) => {
                let outcome = conflict::contest(
                    &mut self.rng,
                    &self.payoffs,
                    [one.cooperation, two.cooperation],
                    patch.amount,
                );
                self.feed(one.bison, outcome.gains[0]);
                self.feed(two.bison, outcome.gains[1]);
                self.battles.record(patch.cell);
                self.tick.battles += 1;
                if self.config.verbose {
                    tracing::debug!(
                        grass = %id,
                        one = %one.bison,
                        two = %two.bison,
                        claimants = patch.claimants.len(),
                        strategies = ?outcome.strategies,
                        gains = ?outcome.gains,
                        "battle over grass"
                    );
                }
            }
        }
    }

    /// Spawn this tick's batch of patches.
    pub(crate) fn grow_grass(&mut self, schedule: &mut BreedScheduler) {
        let (width, height) = (self.config.width, self.config.height);
        let spread = self.config.grass_spread;
        for _ in 0..self.config.grass_per_tick {
            let cell = match self.config.grass_distribution {
                GrassDistribution::Clustered => Cell::new(
                    sampling::clustered_index(&mut self.rng, width, spread),
                    sampling::clustered_index(&mut self.rng, height, spread),
                ),
                GrassDistribution::Uniform => Cell::new(
                    self.rng.random_range(0..width),
                    self.rng.random_range(0..height),
                ),
            };
            let amount = self.config.grass_amount;
            self.spawn_grass(cell, amount, schedule);
        }
    }
}
