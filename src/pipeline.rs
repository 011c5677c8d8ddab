// src/pipeline.rs
//! Конвейер генерации подземелья
//!
//! Топология → бюджет угрозы → комнаты → существа → согласованность → сборка.
//! Каждая стадия скрыта за своим трейтом и может быть заменена; все стадии
//! тянут случайность из одного источника, созданного по сиду запроса.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::biome::Biome;
use crate::catalog::Catalog;
use crate::coherence::{CoherenceReport, CoherenceValidator, TagCoherenceValidator};
use crate::config::{DifficultyTier, GenerationSettings};
use crate::dungeon::{DefaultAssembler, Dungeon, DungeonAssembler};
use crate::error::{GenerationError, GenerationResult};
use crate::populate::{BudgetedEntityPopulator, EntityPopulator};
use crate::rng::{RandomSource, SeededRandom};
use crate::room::Room;
use crate::room::instantiate::{RoomInstantiator, WeightedRoomInstantiator};
use crate::sector::budget::{DepthScaledBudget, ThreatBudgetCalculator};
use crate::sector::topology::{SproutingVine, TopologyGenerator};
use crate::sector::{NodeId, Sector};

pub const DEFAULT_ROOM_COUNT: usize = 15;
pub const MIN_ROOM_COUNT: usize = 3;

/// Параметры одного вызова генерации
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonRequest {
    pub name: String,
    pub biome: Biome,
    pub difficulty: DifficultyTier,
    pub room_count: usize,
    pub seed: Option<u64>,
}

impl DungeonRequest {
    pub fn new(name: impl Into<String>, biome: Biome, difficulty: DifficultyTier) -> Self {
        Self {
            name: name.into(),
            biome,
            difficulty,
            room_count: DEFAULT_ROOM_COUNT,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_room_count(mut self, room_count: usize) -> Self {
        self.room_count = room_count;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Предусловия проверяются до любой работы конвейера
    pub fn validate(&self) -> GenerationResult<()> {
        if self.name.trim().is_empty() {
            return Err(GenerationError::validation("имя подземелья не может быть пустым"));
        }
        if self.room_count < MIN_ROOM_COUNT {
            return Err(GenerationError::validation(format!(
                "нужно минимум {MIN_ROOM_COUNT} комнаты, запрошено {}",
                self.room_count
            )));
        }
        Ok(())
    }
}

/// Временное владение сектором и комнатами на время одного вызова.
/// После сборки подземелья арена уничтожается.
#[derive(Debug)]
pub struct GenerationArena {
    pub sector: Sector,
    pub rooms: BTreeMap<NodeId, Room>,
}

/// Оркестратор стадий. Клонирование дешёвое: стадии и каталоги лежат в `Arc`.
#[derive(Clone)]
pub struct DungeonGenerator {
    topology: Arc<dyn TopologyGenerator>,
    budget: Arc<dyn ThreatBudgetCalculator>,
    instantiator: Arc<dyn RoomInstantiator>,
    populator: Arc<dyn EntityPopulator>,
    validator: Arc<dyn CoherenceValidator>,
    assembler: Arc<dyn DungeonAssembler>,
    root_depth: u32,
}

impl DungeonGenerator {
    /// Стандартные стадии поверх одного каталога
    #[must_use]
    pub fn from_catalog(catalog: Arc<Catalog>, settings: GenerationSettings) -> Self {
        Self {
            topology: Arc::new(SproutingVine::new(settings.vine)),
            budget: Arc::new(DepthScaledBudget::new(settings.budget)),
            instantiator: Arc::new(WeightedRoomInstantiator::new(catalog.clone(), settings.tags)),
            populator: Arc::new(BudgetedEntityPopulator::new(
                catalog.clone(),
                catalog.clone(),
                settings.population,
            )),
            validator: Arc::new(TagCoherenceValidator::new(catalog, settings.coherence)),
            assembler: Arc::new(DefaultAssembler),
            root_depth: settings.root_depth,
        }
    }

    /// Встроенный каталог и настройки по умолчанию
    pub fn builtin() -> GenerationResult<Self> {
        Ok(Self::from_catalog(
            Arc::new(Catalog::builtin()?),
            GenerationSettings::default(),
        ))
    }

    #[must_use]
    pub fn with_topology(mut self, topology: impl TopologyGenerator + 'static) -> Self {
        self.topology = Arc::new(topology);
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: impl ThreatBudgetCalculator + 'static) -> Self {
        self.budget = Arc::new(budget);
        self
    }

    #[must_use]
    pub fn with_instantiator(mut self, instantiator: impl RoomInstantiator + 'static) -> Self {
        self.instantiator = Arc::new(instantiator);
        self
    }

    #[must_use]
    pub fn with_populator(mut self, populator: impl EntityPopulator + 'static) -> Self {
        self.populator = Arc::new(populator);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl CoherenceValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    #[must_use]
    pub fn with_assembler(mut self, assembler: impl DungeonAssembler + 'static) -> Self {
        self.assembler = Arc::new(assembler);
        self
    }

    pub fn generate_dungeon(&self, request: &DungeonRequest) -> GenerationResult<Dungeon> {
        self.generate_with_report(request).map(|(dungeon, _)| dungeon)
    }

    /// Как [`Self::generate_dungeon`], но вместе с отчётом стадии согласованности
    pub fn generate_with_report(
        &self,
        request: &DungeonRequest,
    ) -> GenerationResult<(Dungeon, CoherenceReport)> {
        request.validate()?;

        // Без сида берём случайный и запоминаем его в подземелье
        let seed = request.seed.unwrap_or_else(rand::random::<u64>);
        let mut rng = SeededRandom::new(seed);
        tracing::debug!(name = %request.name, seed, biome = %request.biome, "старт генерации");

        let (arena, report) = self.run_stages(request, &mut rng);
        let threat_budget = arena.sector.budget.total;
        let dungeon = self
            .assembler
            .build(&request.name, seed, &arena.sector, arena.rooms)?;

        tracing::info!(
            name = %dungeon.name,
            seed,
            biome = %dungeon.biome,
            difficulty = ?request.difficulty,
            rooms = dungeon.len(),
            threat_budget,
            placed_threat = dungeon.total_threat(),
            repairs = report.repairs(),
            "подземелье сгенерировано"
        );
        Ok((dungeon, report))
    }

    /// Стадии 1–5 на уже проверенном запросе
    fn run_stages(
        &self,
        request: &DungeonRequest,
        rng: &mut dyn RandomSource,
    ) -> (GenerationArena, CoherenceReport) {
        let mut sector = self.topology.generate_sector(
            request.biome,
            request.room_count,
            self.root_depth,
            rng,
        );
        sector.budget = self.budget.calculate(&sector, request.difficulty);

        let rooms = self.instantiator.instantiate_sector(&sector, rng);
        let mut arena = GenerationArena { sector, rooms };
        tracing::debug!(rooms = arena.rooms.len(), "комнаты созданы");

        self.populator
            .populate_sector(&arena.sector, &mut arena.rooms, rng);
        let report = self
            .validator
            .validate_and_fix(&arena.sector, &mut arena.rooms, rng);
        (arena, report)
    }

    /// Асинхронная обёртка: весь конвейер уходит в блокирующий пул tokio.
    ///
    /// Токен проверяется только до старта: начавшаяся генерация доводится до конца.
    pub async fn generate_dungeon_async(
        &self,
        request: DungeonRequest,
        cancel: CancellationToken,
    ) -> GenerationResult<Dungeon> {
        request.validate()?;
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let generator = self.clone();
        tokio::task::spawn_blocking(move || {
            if cancel.is_cancelled() {
                tracing::debug!(name = %request.name, "отмена до старта фоновой задачи");
                return Err(GenerationError::Cancelled);
            }
            generator.generate_dungeon(&request)
        })
        .await
        .map_err(|e| GenerationError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRandom;

    #[test]
    fn request_defaults_to_fifteen_rooms() {
        let request = DungeonRequest::new("Blackroot Hollow", Biome::Forest, DifficultyTier::Normal);
        assert_eq!(request.room_count, DEFAULT_ROOM_COUNT);
        assert_eq!(request.seed, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn preconditions_are_checked() {
        let base = DungeonRequest::new("X", Biome::Citadel, DifficultyTier::Easy);
        assert!(matches!(
            base.clone().with_room_count(2).validate(),
            Err(GenerationError::Validation(_))
        ));
        assert!(base.clone().with_room_count(3).validate().is_ok());
        let blank = DungeonRequest::new(" \t", Biome::Citadel, DifficultyTier::Easy);
        assert!(matches!(blank.validate(), Err(GenerationError::Validation(_))));
    }

    #[test]
    fn missing_seed_is_recorded() {
        let generator = DungeonGenerator::builtin().unwrap();
        let request = DungeonRequest::new("Ashen Deep", Biome::Muspelheim, DifficultyTier::Hard);
        let dungeon = generator.generate_dungeon(&request).unwrap();
        let replay = generator
            .generate_dungeon(&request.clone().with_seed(dungeon.seed))
            .unwrap();
        assert_eq!(dungeon.layout(), replay.layout());
    }

    #[test]
    fn stages_share_one_random_stream() {
        let generator = DungeonGenerator::builtin().unwrap();
        let request =
            DungeonRequest::new("Stream", Biome::Forest, DifficultyTier::Normal).with_room_count(6);
        let mut rng = ScriptedRandom::new([]);
        let (arena, _) = generator.run_stages(&request, &mut rng);
        assert_eq!(arena.rooms.len(), 6);
        // Топология и выбор шаблонов обязаны брать числа из переданного источника
        assert!(rng.draws >= 5 + 6);
    }
}
