mod catalog;
mod challenge;
mod errors;
mod index;
mod normalize;

pub use catalog::{
    CITIES, Catalog, DictionaryOptions, POKEMON, builtin_dictionaries, dictionary_options,
};
pub use challenge::{
    Challenge, ChallengeConfig, ChallengeGenerator, Strategy, StressReport, stress,
};
pub use errors::ChallengeError;
pub use index::{AnagramGroup, AnagramIndex};
pub use normalize::{ALPHANUMERIC, Record, Signature, normalize, normalize_word};
