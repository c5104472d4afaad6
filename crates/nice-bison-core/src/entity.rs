use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity shared by every entity kind, assigned monotonically by the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity kind, activated as a batch by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Breed {
    Bison,
    Grass,
}

impl Breed {
    /// Activation order within one tick: claims must exist before patches resolve them.
    pub const ORDER: [Breed; 2] = [Breed::Bison, Breed::Grass];

    pub(crate) fn index(self) -> usize {
        match self {
            Breed::Bison => 0,
            Breed::Grass => 1,
        }
    }
}

/// What a grid cell holds. The tag is resolved once, at query time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Occupant {
    Bison(EntityId),
    Grass(EntityId),
}

impl Occupant {
    pub fn id(self) -> EntityId {
        match self {
            Occupant::Bison(id) | Occupant::Grass(id) => id,
        }
    }

    pub fn breed(self) -> Breed {
        match self {
            Occupant::Bison(_) => Breed::Bison,
            Occupant::Grass(_) => Breed::Grass,
        }
    }

    pub fn grass(self) -> Option<EntityId> {
        match self {
            Occupant::Grass(id) => Some(id),
            Occupant::Bison(_) => None,
        }
    }

    pub fn bison(self) -> Option<EntityId> {
        match self {
            Occupant::Bison(id) => Some(id),
            Occupant::Grass(_) => None,
        }
    }
}
