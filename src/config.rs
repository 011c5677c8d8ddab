// src/config.rs
//! Конфигурация генерации подземелья
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией:
//! - Уровни сложности и их множители бюджета угрозы
//! - Параметры роста «вьющейся лозы» (топология сектора)
//! - Бюджет угрозы, заселение комнат и правила согласованности тегов
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.

use crate::biome::Biome;
use crate::error::GenerationResult;
use crate::pipeline::DungeonRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Уровень сложности подземелья
///
/// Масштабирует общий бюджет угрозы сектора.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DifficultyTier {
    Easy,
    #[default]
    Normal,
    Hard,
    Nightmare,
}

impl DifficultyTier {
    /// Множитель общего бюджета угрозы.
    ///
    /// # Примеры
    /// ```
    /// use dungeongen::config::DifficultyTier;
    /// assert_eq!(DifficultyTier::Normal.budget_multiplier(), 1.0);
    /// assert!(DifficultyTier::Nightmare.budget_multiplier() > DifficultyTier::Hard.budget_multiplier());
    /// ```
    #[must_use]
    pub fn budget_multiplier(self) -> f64 {
        match self {
            DifficultyTier::Easy => 0.6,
            DifficultyTier::Normal => 1.0,
            DifficultyTier::Hard => 1.5,
            DifficultyTier::Nightmare => 2.25,
        }
    }
}

/// Параметры роста «вьющейся лозы»
///
/// Точные константы ветвления не зафиксированы, поэтому всё вынесено сюда.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VineSettings {
    /// Вероятность того, что новый узел получит второе ребро (петлю) к соседу родителя
    #[serde(default = "default_branch_probability")]
    pub branch_probability: f64,

    /// Насколько сильно выбор узла фронтира смещён к недавно добавленным:
    /// вес i-го узла фронтира равен `1 + i * recency_bias`.
    /// - `0` — равномерный выбор (широкое ветвление),
    /// - большие значения — почти линейная «лоза».
    #[serde(default = "default_recency_bias")]
    pub recency_bias: u32,

    /// Максимальная степень узла; узлы, достигшие её, покидают фронтир
    #[serde(default = "default_max_degree")]
    pub max_degree: usize,

    /// Допустимая разница глубин между родителем и целью петли
    #[serde(default = "default_loop_depth_window")]
    pub loop_depth_window: u32,

    /// Сколько раз перебрасывать цель петли, если ребро уже существует
    #[serde(default = "default_max_branch_rerolls")]
    pub max_branch_rerolls: u32,
}

fn default_branch_probability() -> f64 {
    0.15
}
fn default_recency_bias() -> u32 {
    3
}
fn default_max_degree() -> usize {
    4
}
fn default_loop_depth_window() -> u32 {
    1
}
fn default_max_branch_rerolls() -> u32 {
    4
}

impl Default for VineSettings {
    fn default() -> Self {
        Self {
            branch_probability: 0.15,
            recency_bias: 3,
            max_degree: 4,
            loop_depth_window: 1,
            max_branch_rerolls: 4,
        }
    }
}

/// Настройки бюджета угрозы
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetSettings {
    /// Базовая угроза на одну комнату при сложности Normal
    #[serde(default = "default_base_per_room")]
    pub base_per_room: u32,

    /// Прирост бюджета за каждый уровень средней глубины сверх первого
    #[serde(default = "default_depth_scaling")]
    pub depth_scaling: f64,
}

fn default_base_per_room() -> u32 {
    12
}
fn default_depth_scaling() -> f64 {
    0.15
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            base_per_room: 12,
            depth_scaling: 0.15,
        }
    }
}

/// Настройки заселения комнат
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopulationSettings {
    /// Жёсткий предел существ на комнату (поверх числа слотов шаблона)
    #[serde(default = "default_max_entities_per_room")]
    pub max_entities_per_room: usize,

    /// Комнаты с любым из этих тегов не заселяются
    #[serde(default = "default_non_combat_tags")]
    pub non_combat_tags: Vec<String>,
}

fn default_max_entities_per_room() -> usize {
    4
}
fn default_non_combat_tags() -> Vec<String> {
    vec!["entrance".to_string(), "rest".to_string()]
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self {
            max_entities_per_room: default_max_entities_per_room(),
            non_combat_tags: default_non_combat_tags(),
        }
    }
}

/// Пара взаимоисключающих тегов
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagConflict {
    pub first: String,
    pub second: String,
}

impl TagConflict {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }
}

/// Правила согласованности тегов
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoherenceSettings {
    /// Проверяются в порядке объявления
    #[serde(default = "default_conflicts")]
    pub conflicts: Vec<TagConflict>,

    /// Приоритет тега; при конфликте снимается тег с меньшим приоритетом.
    /// Теги без записи имеют приоритет 0.
    #[serde(default = "default_priorities")]
    pub priorities: BTreeMap<String, u8>,
}

fn default_conflicts() -> Vec<TagConflict> {
    vec![
        TagConflict::new("fire", "submerged"),
        TagConflict::new("fire", "frozen"),
        TagConflict::new("frozen", "wet"),
        TagConflict::new("lit", "dark"),
        TagConflict::new("quiet", "echoing"),
    ]
}

fn default_priorities() -> BTreeMap<String, u8> {
    [
        ("fire", 3),
        ("frozen", 3),
        ("submerged", 2),
        ("wet", 1),
        ("lit", 1),
        ("dark", 1),
    ]
    .into_iter()
    .map(|(tag, p)| (tag.to_string(), p))
    .collect()
}

impl Default for CoherenceSettings {
    fn default() -> Self {
        Self {
            conflicts: default_conflicts(),
            priorities: default_priorities(),
        }
    }
}

impl CoherenceSettings {
    #[must_use]
    pub fn priority(&self, tag: &str) -> u8 {
        self.priorities.get(tag).copied().unwrap_or(0)
    }
}

/// Обязательные и запрещённые теги шаблонов комнат
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TagFilter {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

impl TagFilter {
    /// Проверяет набор тегов шаблона (теги каталога уже в нижнем регистре)
    #[must_use]
    pub fn accepts<'a>(&self, tags: impl IntoIterator<Item = &'a String> + Clone) -> bool {
        let has = |wanted: &String| {
            tags.clone()
                .into_iter()
                .any(|t| t.eq_ignore_ascii_case(wanted))
        };
        self.required.iter().all(has) && !self.excluded.iter().any(has)
    }
}

/// Настройки стадий конвейера, не зависящие от конкретного запроса
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    /// Глубина корневого узла (по соглашению 1)
    #[serde(default = "default_root_depth")]
    pub root_depth: u32,

    #[serde(default)]
    pub vine: VineSettings,

    #[serde(default)]
    pub budget: BudgetSettings,

    #[serde(default)]
    pub population: PopulationSettings,

    #[serde(default)]
    pub coherence: CoherenceSettings,

    #[serde(default)]
    pub tags: TagFilter,
}

fn default_root_depth() -> u32 {
    1
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            root_depth: 1,
            vine: VineSettings::default(),
            budget: BudgetSettings::default(),
            population: PopulationSettings::default(),
            coherence: CoherenceSettings::default(),
            tags: TagFilter::default(),
        }
    }
}

/// Основные параметры генерации подземелья
///
/// Полная конфигурация одного вызова генерации. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DungeonGenerationParams {
    /// Имя подземелья (не может быть пустым)
    pub name: String,

    pub biome: Biome,

    #[serde(default)]
    pub difficulty: DifficultyTier,

    /// Количество комнат (минимум 3, по умолчанию 15)
    #[serde(default = "default_room_count")]
    pub room_count: usize,

    /// Сид генератора случайных чисел; без него берётся случайный
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(flatten)]
    pub settings: GenerationSettings,
}

fn default_room_count() -> usize {
    crate::pipeline::DEFAULT_ROOM_COUNT
}

impl DungeonGenerationParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # dungeon.toml
    /// name = "Blackroot Hollow"
    /// biome = "Forest"
    /// difficulty = "Normal"
    /// room_count = 15
    /// seed = 42
    ///
    /// [vine]
    /// branch_probability = 0.2
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> GenerationResult<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Self = toml::from_str(&contents)?;
        Ok(params)
    }

    #[must_use]
    pub fn request(&self) -> DungeonRequest {
        DungeonRequest {
            name: self.name.clone(),
            biome: self.biome,
            difficulty: self.difficulty,
            room_count: self.room_count,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_fills_defaults() {
        let params: DungeonGenerationParams =
            toml::from_str("name = \"Blackroot Hollow\"\nbiome = \"Forest\"").unwrap();
        assert_eq!(params.room_count, 15);
        assert_eq!(params.difficulty, DifficultyTier::Normal);
        assert_eq!(params.seed, None);
        assert_eq!(params.settings.root_depth, 1);
        assert_eq!(params.settings.vine, VineSettings::default());
        assert_eq!(params.settings.coherence, CoherenceSettings::default());
    }

    #[test]
    fn nested_tables_override_single_fields() {
        let src = r#"
            name = "Ashen Forge"
            biome = "Muspelheim"
            difficulty = "Hard"
            seed = 7

            [vine]
            branch_probability = 0.4

            [population]
            max_entities_per_room = 2
        "#;
        let params: DungeonGenerationParams = toml::from_str(src).unwrap();
        assert_eq!(params.seed, Some(7));
        assert!((params.settings.vine.branch_probability - 0.4).abs() < f64::EPSILON);
        assert_eq!(params.settings.vine.recency_bias, 3);
        assert_eq!(params.settings.population.max_entities_per_room, 2);
        assert_eq!(
            params.settings.population.non_combat_tags,
            vec!["entrance", "rest"]
        );
        assert_eq!(params.request().difficulty, DifficultyTier::Hard);
    }

    #[test]
    fn tag_filter_required_and_excluded() {
        let filter = TagFilter {
            required: vec!["Wet".to_string()],
            excluded: vec!["boss".to_string()],
        };
        let ok: Vec<String> = vec!["wet".into(), "dark".into()];
        let missing: Vec<String> = vec!["dark".into()];
        let banned: Vec<String> = vec!["wet".into(), "boss".into()];
        assert!(filter.accepts(&ok));
        assert!(!filter.accepts(&missing));
        assert!(!filter.accepts(&banned));
        assert!(TagFilter::default().accepts(&missing));
    }

    #[test]
    fn unknown_tag_priority_is_zero() {
        let settings = CoherenceSettings::default();
        assert_eq!(settings.priority("fire"), 3);
        assert_eq!(settings.priority("mossy"), 0);
    }
}
