use serde::{Deserialize, Serialize};

/// Биом подземелья: определяет доступные шаблоны комнат, существ и фоновые теги
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Biome {
    Citadel,
    Forest,
    TheRoots,
    Muspelheim,
    Niflheim,
    Jotunheim,
}

impl Biome {
    pub const ALL: [Biome; 6] = [
        Biome::Citadel,
        Biome::Forest,
        Biome::TheRoots,
        Biome::Muspelheim,
        Biome::Niflheim,
        Biome::Jotunheim,
    ];

    /// Теги, которые получает каждая комната этого биома поверх тегов шаблона.
    ///
    /// Именно отсюда берутся конфликты вроде `fire` + `submerged`: шаблон может
    /// описывать затопленный зал, а биом при этом остаётся огненным.
    #[must_use]
    pub fn ambient_tags(self) -> &'static [&'static str] {
        match self {
            Biome::Citadel => &["stone"],
            Biome::Forest => &["overgrown"],
            Biome::TheRoots => &["organic", "dark"],
            Biome::Muspelheim => &["fire"],
            Biome::Niflheim => &["frozen"],
            Biome::Jotunheim => &["stone", "cold"],
        }
    }

    /// Название синтетической комнаты, когда в каталоге нет ни одного подходящего шаблона
    #[must_use]
    pub fn fallback_name(self) -> &'static str {
        match self {
            Biome::Citadel => "Bare Stone Chamber",
            Biome::Forest => "Quiet Clearing",
            Biome::TheRoots => "Root-Choked Chamber",
            Biome::Muspelheim => "Scorched Chamber",
            Biome::Niflheim => "Frost-Rimed Chamber",
            Biome::Jotunheim => "Giant-Hewn Chamber",
        }
    }

    #[must_use]
    pub fn fallback_description(self) -> &'static str {
        match self {
            Biome::Citadel => "A {ADJ_SIZE} chamber of plain fitted stone. Nothing here hints at its purpose.",
            Biome::Forest => "A {ADJ_SIZE} clearing hemmed in by trunks. The canopy keeps the light {ADJ_ATMOSPHERE}.",
            Biome::TheRoots => "A {ADJ_SIZE} hollow between tangled roots. The air is {ADJ_ATMOSPHERE} and damp.",
            Biome::Muspelheim => "A {ADJ_SIZE} chamber of blackened rock, still warm to the touch.",
            Biome::Niflheim => "A {ADJ_SIZE} chamber glazed with ice. Your breath hangs in the {ADJ_ATMOSPHERE} air.",
            Biome::Jotunheim => "A {ADJ_SIZE} chamber cut for beings far larger than you. The floor is {ADJ_CONDITION}.",
        }
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_biome_has_ambient_tags_and_fallback_text() {
        for biome in Biome::ALL {
            assert!(!biome.ambient_tags().is_empty(), "{biome} без фоновых тегов");
            assert!(!biome.fallback_name().is_empty());
            assert!(biome.fallback_description().contains("{ADJ_SIZE}"));
        }
    }

    #[test]
    fn biome_deserializes_from_variant_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            biome: Biome,
        }
        let parsed: Wrapper = toml::from_str("biome = \"Muspelheim\"").unwrap();
        assert_eq!(parsed.biome, Biome::Muspelheim);
    }
}
