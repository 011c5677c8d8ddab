pub mod biome;
pub mod catalog;
pub mod coherence;
pub mod config;
pub mod dungeon;
pub mod error;
pub mod pipeline;
pub mod populate;
pub mod rng;
pub mod room;
pub mod sector;
pub mod template;

pub use biome::Biome;
pub use catalog::{Catalog, EntityTemplateProvider, RoomTemplateProvider, TierProvider};
pub use coherence::{CoherenceReport, CoherenceValidator, TagCoherenceValidator};
pub use config::{DifficultyTier, DungeonGenerationParams, GenerationSettings, TagFilter};
pub use dungeon::{DefaultAssembler, Dungeon, DungeonAssembler, DungeonLayout};
pub use error::{GenerationError, GenerationResult};
pub use pipeline::{DungeonGenerator, DungeonRequest, GenerationArena};
pub use populate::{BudgetedEntityPopulator, EntityPopulator};
pub use rng::{RandomSource, SeededRandom};
pub use room::instantiate::{RoomInstantiator, WeightedRoomInstantiator};
pub use room::{Room, RoomId};
pub use sector::budget::{DepthScaledBudget, ThreatBudgetCalculator};
pub use sector::topology::{SproutingVine, TopologyGenerator};
pub use sector::Sector;
