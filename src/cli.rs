use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use rand::{SeedableRng, rngs::SmallRng};
use serde_json::json;
use spellers_rs::{
    AnagramIndex, Challenge, ChallengeConfig, ChallengeError, ChallengeGenerator, Record,
    Signature, Strategy, builtin_dictionaries, dictionary_options, normalize_word, stress,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CATALOG: &str = "pokemon";

#[derive(Parser, Debug)]
#[command(name = "spellers-rs", about = "Anagram challenges over word lists", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Dictionary file with one `<word>[,<ignored>]` entry per line.
    #[arg(long, global = true)]
    dictionary: Option<PathBuf>,

    /// Built-in dictionary to load when `--dictionary` is not given.
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Directory holding the built-in dictionary files.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List entries spellable with the letters of the given text.
    Find {
        /// Free text; only its distinct letters and digits matter.
        #[arg(required = true)]
        text: Vec<String>,
        /// Only list entries using exactly these letters.
        #[arg(long)]
        exact: bool,
    },
    /// Generate a challenge.
    Challenge {
        #[arg(long, value_enum, default_value_t = StrategyArg::Words)]
        strategy: StrategyArg,
        /// Letters per random draw, or the cap on accumulated letters.
        #[arg(long)]
        max_letters: Option<usize>,
        /// Matches the challenge must contain.
        #[arg(long)]
        min_matches: Option<usize>,
        /// Random draws before giving up.
        #[arg(long)]
        max_attempts: Option<usize>,
        /// Seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
        /// Extra generations to try when one comes back unsatisfiable.
        #[arg(long, default_value_t = 0)]
        retries: usize,
    },
    /// List groups of entries sharing exactly the same letters.
    Anagrams {
        /// Maximum number of groups to print.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Run many random-character generations in parallel.
    Stress {
        #[arg(long, default_value_t = 1000)]
        rounds: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        max_letters: Option<usize>,
        #[arg(long)]
        max_attempts: Option<usize>,
    },
    /// Show the built-in dictionaries.
    Dictionaries,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Grow letters from shuffled dictionary entries.
    Words,
    /// Draw random letters and digits.
    Random,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Words => Strategy::DictionaryWords,
            StrategyArg::Random => Strategy::RandomCharacters,
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let Cli {
        json,
        dictionary,
        catalog,
        data_dir,
        command,
    } = Cli::parse();
    let source = DictionarySource {
        dictionary,
        catalog,
        data_dir,
    };

    match command {
        Command::Dictionaries => handle_dictionaries(json),
        Command::Find { text, exact } => {
            let (index, _) = source.load()?;
            handle_find(&index, &text.join(" "), exact, json)
        }
        Command::Challenge {
            strategy,
            max_letters,
            min_matches,
            max_attempts,
            seed,
            retries,
        } => {
            let (index, base) = source.load()?;
            let config = ChallengeConfig {
                strategy: strategy.into(),
                max_signature_length: max_letters.unwrap_or(base.max_signature_length),
                min_match_count: min_matches.unwrap_or(base.min_match_count),
                max_attempts: max_attempts.unwrap_or(base.max_attempts),
            };
            handle_challenge(&index, config, seed, retries, json)
        }
        Command::Anagrams { limit } => {
            let (index, _) = source.load()?;
            handle_anagrams(&index, limit, json)
        }
        Command::Stress {
            rounds,
            seed,
            max_letters,
            max_attempts,
        } => {
            let (index, base) = source.load()?;
            let config = ChallengeConfig {
                max_signature_length: max_letters.unwrap_or(base.max_signature_length),
                max_attempts: max_attempts.unwrap_or(base.max_attempts),
                ..base
            };
            handle_stress(&index, config, rounds, seed, json)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

struct DictionarySource {
    dictionary: Option<PathBuf>,
    catalog: Option<String>,
    data_dir: PathBuf,
}

impl DictionarySource {
    /// Builds the index along with the dictionary's challenge defaults.
    fn load(&self) -> Result<(AnagramIndex, ChallengeConfig), Box<dyn Error>> {
        if let Some(path) = &self.dictionary {
            let index = AnagramIndex::build(read_lines(path)?);
            info!(path = %path.display(), records = index.len(), "loaded dictionary file");
            return Ok((index, ChallengeConfig::default()));
        }
        let id = self.catalog.as_deref().unwrap_or(DEFAULT_CATALOG);
        let options = dictionary_options(id)
            .ok_or_else(|| ChallengeError::UnknownDictionary(id.to_string()))?;
        let path = self.data_dir.join(options.filename);
        let index = AnagramIndex::build(read_lines(&path)?);
        info!(
            dictionary = id,
            path = %path.display(),
            records = index.len(),
            "loaded dictionary"
        );
        Ok((index, options.challenge_config(Strategy::default())))
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let file =
        File::open(path).map_err(|err| format!("Failed to open {}: {err}", path.display()))?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        lines.push(line);
    }
    Ok(lines)
}

fn handle_find(
    index: &AnagramIndex,
    text: &str,
    exact: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let signature = Signature::of(&normalize_word(text));
    let found = if exact {
        index.exact(&signature)
    } else {
        index.find(&signature)
    };

    if as_json {
        let payload = json!({
            "query": text,
            "signature": signature,
            "exact": exact,
            "results": found,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Letters \"{signature}\":");
        print_record_table(&found);
    }
    Ok(())
}

fn handle_challenge(
    index: &AnagramIndex,
    config: ChallengeConfig,
    seed: Option<u64>,
    retries: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let challenge = generate_with_retries(&ChallengeGenerator::new(index, config), seed, retries)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&challenge)?);
    } else {
        print_challenge(&challenge);
    }
    Ok(())
}

fn generate_with_retries(
    generator: &ChallengeGenerator<'_>,
    seed: Option<u64>,
    retries: usize,
) -> Result<Challenge, ChallengeError> {
    let mut try_number = 0;
    loop {
        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(try_number as u64)),
            None => SmallRng::from_entropy(),
        };
        match generator.generate(&mut rng) {
            Ok(challenge) => return Ok(challenge),
            Err(err) if try_number < retries => {
                warn!(error = %err, try_number, "challenge generation failed, retrying");
                try_number += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn handle_anagrams(
    index: &AnagramIndex,
    limit: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut groups = index.exact_anagrams();
    let total = groups.len();
    groups.sort_by(|a, b| b.records.len().cmp(&a.records.len()));
    groups.truncate(limit);

    if as_json {
        let payload = json!({ "total": total, "limit": limit, "groups": groups });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if groups.is_empty() {
        println!("No entries share the same letters.");
        return Ok(());
    }
    let width = groups
        .iter()
        .map(|group| group.signature.len())
        .max()
        .unwrap_or(0)
        .max("LETTERS".len());
    println!("Showing {} of {total} groups:", groups.len());
    println!("{:<width$}  {}", "LETTERS", "ENTRIES", width = width);
    println!("{:-<width$}  {}", "", "--------", width = width);
    for group in &groups {
        let names: Vec<&str> = group
            .records
            .iter()
            .map(|record| record.display_text.as_str())
            .collect();
        println!("{:<width$}  {}", group.signature, names.join(", "), width = width);
    }
    Ok(())
}

fn handle_stress(
    index: &AnagramIndex,
    config: ChallengeConfig,
    rounds: usize,
    seed: u64,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let started = Instant::now();
    let report = stress(index, config, rounds, seed);
    let elapsed = started.elapsed();

    if as_json {
        let payload = json!({
            "report": report,
            "max_letters": config.max_signature_length,
            "min_matches": config.min_match_count,
            "max_attempts": config.max_attempts,
            "elapsed_ms": elapsed.as_millis() as u64,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{} rounds in {:.2?}: {} satisfied, {} unsatisfiable",
            report.rounds, elapsed, report.satisfied, report.unsatisfiable
        );
        println!("Queries issued: {}", report.total_attempts);
        println!("Largest match count: {}", report.largest_match_count);
    }
    Ok(())
}

fn handle_dictionaries(as_json: bool) -> Result<(), Box<dyn Error>> {
    let dictionaries = builtin_dictionaries();
    if as_json {
        println!("{}", serde_json::to_string_pretty(dictionaries)?);
        return Ok(());
    }
    println!(
        "{:<10}  {:<20}  {:<14}  {:>9}  {:>11}",
        "ID", "NAME", "FILE", "MAX_CHARS", "MIN_RESULTS"
    );
    for options in dictionaries {
        println!(
            "{:<10}  {:<20}  {:<14}  {:>9}  {:>11}",
            options.id,
            options.app_name,
            options.filename,
            options.max_unique_characters,
            options.min_results_count
        );
    }
    Ok(())
}

fn print_challenge(challenge: &Challenge) {
    println!("Letters: {}", challenge.letters);
    if !challenge.punctuation.is_empty() {
        println!("Punctuation: {:?}", challenge.punctuation);
    }
    println!("Answers ({}):", challenge.matches.len());
    let records: Vec<&Record> = challenge.matches.iter().collect();
    print_record_table(&records);
}

fn print_record_table(rows: &[&Record]) {
    if rows.is_empty() {
        println!("No entries matched.");
        return;
    }
    let width = rows
        .iter()
        .map(|record| record.display_text.chars().count())
        .max()
        .unwrap_or(0)
        .max("ENTRY".len());
    println!("{:<width$}  {}", "ENTRY", "ASSET", width = width);
    println!("{:-<width$}  {}", "", "----------", width = width);
    for record in rows {
        println!(
            "{:<width$}  {}",
            record.display_text,
            record.asset_filename,
            width = width
        );
    }
}
