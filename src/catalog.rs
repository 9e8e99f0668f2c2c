use crate::challenge::{ChallengeConfig, ChallengeGenerator, Strategy};
use crate::errors::ChallengeError;
use crate::index::AnagramIndex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Presentation and tuning for one named dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictionaryOptions {
    pub id: &'static str,
    pub app_name: &'static str,
    pub filename: &'static str,
    pub max_unique_characters: usize,
    pub min_results_count: usize,
}

pub const POKEMON: DictionaryOptions = DictionaryOptions {
    id: "pokemon",
    app_name: "Spell that Pokémon",
    filename: "pokemon.csv",
    max_unique_characters: 10,
    min_results_count: 3,
};

pub const CITIES: DictionaryOptions = DictionaryOptions {
    id: "cities",
    app_name: "City Spellers",
    filename: "cities.csv",
    max_unique_characters: 12,
    min_results_count: 3,
};

static BUILTIN: [DictionaryOptions; 2] = [POKEMON, CITIES];

/// Dictionaries known out of the box.
pub fn builtin_dictionaries() -> &'static [DictionaryOptions] {
    &BUILTIN
}

/// Looks up a built-in dictionary by id.
pub fn dictionary_options(id: &str) -> Option<&'static DictionaryOptions> {
    builtin_dictionaries().iter().find(|options| options.id == id)
}

impl DictionaryOptions {
    pub fn challenge_config(&self, strategy: Strategy) -> ChallengeConfig {
        ChallengeConfig {
            strategy,
            max_signature_length: self.max_unique_characters,
            min_match_count: self.min_results_count,
            ..ChallengeConfig::default()
        }
    }
}

/// Independent indexes, one per dictionary.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: BTreeMap<&'static str, (DictionaryOptions, AnagramIndex)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a built index, replacing any previous one with the same id.
    pub fn insert(&mut self, options: DictionaryOptions, index: AnagramIndex) {
        self.entries.insert(options.id, (options, index));
    }

    pub fn get(&self, id: &str) -> Option<(&DictionaryOptions, &AnagramIndex)> {
        self.entries.get(id).map(|(options, index)| (options, index))
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Generator tuned with the dictionary's own limits.
    pub fn generator(
        &self,
        id: &str,
        strategy: Strategy,
    ) -> Result<ChallengeGenerator<'_>, ChallengeError> {
        let (options, index) = self
            .get(id)
            .ok_or_else(|| ChallengeError::UnknownDictionary(id.to_string()))?;
        Ok(ChallengeGenerator::new(index, options.challenge_config(strategy)))
    }
}
