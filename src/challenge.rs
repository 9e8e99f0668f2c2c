use crate::errors::ChallengeError;
use crate::index::AnagramIndex;
use crate::normalize::{ALPHANUMERIC, Record, Signature, is_signature_char};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

const DEFAULT_MAX_SIGNATURE_LENGTH: usize = 8;
const DEFAULT_MIN_MATCH_COUNT: usize = 4;
// Callers should retry with backoff rather than raise this.
const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// How candidate signatures are sampled.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Draw random `[a-z0-9]` characters; bounded by `max_attempts`.
    RandomCharacters,
    /// Grow a signature from shuffled dictionary words; bounded by the dictionary.
    #[default]
    DictionaryWords,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::RandomCharacters => write!(f, "random-characters"),
            Strategy::DictionaryWords => write!(f, "dictionary-words"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ChallengeConfig {
    pub strategy: Strategy,
    /// Length of each random draw, or the soft cap on accumulated letters.
    pub max_signature_length: usize,
    /// Matches a challenge must contain.
    pub min_match_count: usize,
    /// Random draws before giving up; unused by [`Strategy::DictionaryWords`].
    pub max_attempts: usize,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_signature_length: DEFAULT_MAX_SIGNATURE_LENGTH,
            min_match_count: DEFAULT_MIN_MATCH_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// A puzzle: spell every match using only `letters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub letters: String,
    pub matches: Vec<Record>,
    pub punctuation: String,
}

impl Challenge {
    /// Derives the letter set and punctuation actually needed by `matches`.
    pub fn from_matches(matches: Vec<&Record>) -> Self {
        let combined: String = matches
            .iter()
            .map(|record| record.normalized_word.as_str())
            .collect();
        let punctuation: BTreeSet<char> =
            combined.chars().filter(|ch| !is_signature_char(*ch)).collect();
        Self {
            letters: Signature::of(&combined).into_string(),
            matches: matches.into_iter().cloned().collect(),
            punctuation: punctuation.into_iter().collect(),
        }
    }
}

/// Samples challenges from a borrowed index.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeGenerator<'a> {
    index: &'a AnagramIndex,
    config: ChallengeConfig,
}

impl<'a> ChallengeGenerator<'a> {
    pub fn new(index: &'a AnagramIndex, config: ChallengeConfig) -> Self {
        Self { index, config }
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    /// Produces a challenge with at least `min_match_count` matches.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Challenge, ChallengeError> {
        self.generate_counted(rng).map(|(challenge, _)| challenge)
    }

    fn generate_counted<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Challenge, usize), ChallengeError> {
        let outcome = match self.config.strategy {
            Strategy::RandomCharacters => self.sample_random_characters(rng),
            Strategy::DictionaryWords => self.sample_dictionary_words(rng),
        };
        match outcome {
            Ok((matches, attempts)) => Ok((Challenge::from_matches(matches), attempts)),
            Err(attempts) => Err(ChallengeError::Unsatisfiable {
                strategy: self.config.strategy,
                attempts,
            }),
        }
    }

    fn sample_random_characters<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Vec<&'a Record>, usize), usize> {
        for attempt in 1..=self.config.max_attempts {
            let drawn = random_characters(rng, self.config.max_signature_length);
            let query = Signature::of(&drawn);
            let matches = self.index.find(&query);
            if matches.len() >= self.config.min_match_count {
                debug!(
                    %query,
                    attempt,
                    matches = matches.len(),
                    "random characters satisfied challenge"
                );
                return Ok((matches, attempt));
            }
        }
        Err(self.config.max_attempts)
    }

    fn sample_dictionary_words<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Vec<&'a Record>, usize), usize> {
        let min = self.config.min_match_count;
        let cap = self.config.max_signature_length;
        let mut queries = 0;
        if self.index.is_empty() {
            queries += 1;
            let matches = self.index.find(&Signature::default());
            return if matches.len() >= min {
                Ok((matches, queries))
            } else {
                Err(queries)
            };
        }

        let mut order: Vec<Signature> =
            self.index.records().iter().map(Record::signature).collect();
        order.shuffle(rng);

        // Words that would push the letters past the cap are set aside and
        // seed a fresh accumulation once the current one runs dry.
        let mut pending = order.clone();
        let mut any_deferred = false;
        loop {
            let mut accumulated: Option<Signature> = None;
            let mut deferred = Vec::new();
            while let Some(word) = pending.pop() {
                let candidate = match &accumulated {
                    Some(current) => current.union(&word),
                    None => word.clone(),
                };
                if candidate.len() > cap {
                    deferred.push(word);
                    continue;
                }
                if accumulated.as_ref() == Some(&candidate) {
                    continue;
                }
                queries += 1;
                let matches = self.index.find(&candidate);
                debug!(query = %candidate, matches = matches.len(), "dictionary words query");
                if matches.len() >= min {
                    return Ok((matches, queries));
                }
                accumulated = Some(candidate);
            }
            any_deferred |= !deferred.is_empty();
            if accumulated.is_none() || !deferred.iter().any(|word| word.len() <= cap) {
                break;
            }
            pending = deferred;
        }

        if !any_deferred {
            return Err(queries);
        }
        // No accumulation fits under the cap: let the letters grow past it
        // until the whole dictionary is covered.
        debug!(cap, "accumulating past the letter cap");
        let mut accumulated: Option<Signature> = None;
        while let Some(word) = order.pop() {
            let candidate = match &accumulated {
                Some(current) => current.union(&word),
                None => word,
            };
            if accumulated.as_ref() == Some(&candidate) {
                continue;
            }
            queries += 1;
            let matches = self.index.find(&candidate);
            if matches.len() >= min {
                return Ok((matches, queries));
            }
            accumulated = Some(candidate);
        }
        Err(queries)
    }
}

fn random_characters<R: Rng + ?Sized>(rng: &mut R, count: usize) -> String {
    (0..count)
        .map(|_| char::from(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())]))
        .collect()
}

/// Outcome of [`stress`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StressReport {
    pub rounds: usize,
    pub satisfied: usize,
    pub unsatisfiable: usize,
    /// Queries issued across all rounds, successful or not.
    pub total_attempts: usize,
    pub largest_match_count: usize,
}

/// Runs `rounds` independent random-character generations in parallel
/// against one shared index.
///
/// Round `n` is seeded with `seed + n`, so a report is reproducible.
pub fn stress(
    index: &AnagramIndex,
    config: ChallengeConfig,
    rounds: usize,
    seed: u64,
) -> StressReport {
    let generator = ChallengeGenerator::new(
        index,
        ChallengeConfig {
            strategy: Strategy::RandomCharacters,
            ..config
        },
    );
    (0..rounds)
        .into_par_iter()
        .map(|round| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(round as u64));
            let mut report = StressReport {
                rounds: 1,
                ..StressReport::default()
            };
            match generator.generate_counted(&mut rng) {
                Ok((challenge, attempts)) => {
                    report.satisfied = 1;
                    report.total_attempts = attempts;
                    report.largest_match_count = challenge.matches.len();
                }
                Err(ChallengeError::Unsatisfiable { attempts, .. }) => {
                    report.unsatisfiable = 1;
                    report.total_attempts = attempts;
                }
                Err(_) => report.unsatisfiable = 1,
            }
            report
        })
        .reduce(StressReport::default, StressReport::merge)
}

impl StressReport {
    fn merge(self, other: StressReport) -> StressReport {
        StressReport {
            rounds: self.rounds + other.rounds,
            satisfied: self.satisfied + other.satisfied,
            unsatisfiable: self.unsatisfiable + other.unsatisfiable,
            total_attempts: self.total_attempts + other.total_attempts,
            largest_match_count: self.largest_match_count.max(other.largest_match_count),
        }
    }
}
