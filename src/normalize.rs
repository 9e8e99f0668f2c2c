use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Characters a signature may contain, in signature order.
pub const ALPHANUMERIC: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const MALE_SIGN: char = '\u{2642}';
const FEMALE_SIGN: char = '\u{2640}';

/// A single dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Leading field of the raw line, kept verbatim for display.
    pub display_text: String,
    /// Canonical form used to compute the signature.
    pub normalized_word: String,
    /// Derived image slug, e.g. `nidoran-f.png`.
    pub asset_filename: String,
}

impl Record {
    /// Builds a record from a raw dictionary line such as `Nidoran♀,29`.
    pub fn from_line(line: &str) -> Self {
        let (display_text, normalized_word) = normalize(line);
        let asset_filename = asset_filename(line, &normalized_word);
        Self {
            display_text,
            normalized_word,
            asset_filename,
        }
    }

    pub fn signature(&self) -> Signature {
        Signature::of(&self.normalized_word)
    }
}

/// Splits a raw line at its first comma and canonicalizes the leading field.
///
/// Returns `(display_text, normalized_word)`.
pub fn normalize(line: &str) -> (String, String) {
    let display = leading_field(line);
    (display.to_string(), normalize_word(display))
}

/// Lowercases, decomposes (NFD) and drops everything outside ASCII.
///
/// Diacritics vanish while the letters they decorate survive; symbols with no
/// ASCII decomposition (`♀`, `♂`) are removed outright.
pub fn normalize_word(text: &str) -> String {
    text.to_lowercase().nfd().filter(char::is_ascii).collect()
}

fn leading_field(line: &str) -> &str {
    match line.split_once(',') {
        Some((head, _)) => head,
        None => line,
    }
}

fn asset_filename(line: &str, word: &str) -> String {
    let mut name: String = word
        .replace(' ', "-")
        .chars()
        .filter(|ch| !matches!(ch, '.' | ':' | '\''))
        .collect();
    if line.contains(MALE_SIGN) {
        name.push_str("-m");
    } else if line.contains(FEMALE_SIGN) {
        name.push_str("-f");
    }
    name.push_str(".png");
    name
}

/// Sorted, deduplicated set of `[a-z0-9]` characters.
///
/// Deserializing goes through [`Signature::of`], so stored text is re-sorted
/// and stripped of anything outside the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Signature(String);

impl Signature {
    /// Collects the distinct alphanumeric characters of `word`.
    ///
    /// Input is expected to be normalized already; uppercase and non-ASCII
    /// characters are ignored rather than folded.
    pub fn of(word: &str) -> Self {
        let unique: BTreeSet<char> = word.chars().filter(|ch| is_signature_char(*ch)).collect();
        Self(unique.into_iter().collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, ch: char) -> bool {
        self.0.contains(ch)
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }

    /// Set union of both signatures.
    pub fn union(&self, other: &Signature) -> Signature {
        let mut merged = String::with_capacity(self.len() + other.len());
        merged.push_str(&self.0);
        merged.push_str(&other.0);
        Signature::of(&merged)
    }

    pub fn is_subset_of(&self, other: &Signature) -> bool {
        self.chars().all(|ch| other.contains(ch))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<String> for Signature {
    fn from(text: String) -> Self {
        Signature::of(&text)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub(crate) fn is_signature_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_sign_is_dropped_not_transliterated() {
        let (display, word) = normalize("Nidoran♀,some-other-field");
        assert_eq!(display, "Nidoran♀");
        assert_eq!(word, "nidoran");
        assert_eq!(Signature::of(&word).as_str(), "adinor");
    }

    #[test]
    fn whole_line_used_without_comma() {
        let (display, word) = normalize("Mr. Mime");
        assert_eq!(display, "Mr. Mime");
        assert_eq!(word, "mr. mime");
    }

    #[test]
    fn diacritics_fold_to_base_letters() {
        assert_eq!(normalize_word("Flabébé"), "flabebe");
        assert_eq!(normalize_word("São Paulo"), "sao paulo");
        assert_eq!(normalize_word("Kraków"), "krakow");
    }

    #[test]
    fn normalize_is_deterministic() {
        let line = "Zürich,Switzerland";
        assert_eq!(normalize(line), normalize(line));
    }

    #[test]
    fn signature_is_sorted_and_unique() {
        let sig = Signature::of("mississippi");
        assert_eq!(sig.as_str(), "imps");
        assert_eq!(Signature::of("ppiimmss"), sig);
        assert_eq!(Signature::of("spim"), sig);
    }

    #[test]
    fn signature_keeps_digits_and_drops_punctuation() {
        assert_eq!(Signature::of("porygon2").as_str(), "2gnopry");
        assert_eq!(Signature::of("ho-oh").as_str(), "ho");
        assert!(Signature::of("-- ..").is_empty());
    }

    #[test]
    fn signature_set_operations() {
        let cat = Signature::of("cat");
        let dog = Signature::of("dog");
        let both = cat.union(&dog);
        assert_eq!(both.as_str(), "acdgot");
        assert!(cat.is_subset_of(&both));
        assert!(!both.is_subset_of(&cat));
        assert!(Signature::default().is_subset_of(&cat));
    }

    #[test]
    fn deserialized_signature_is_canonical() {
        let sig: Signature = serde_json::from_str("\"tcaA-t\"").unwrap();
        assert_eq!(sig, Signature::of("cat"));
        assert_eq!(serde_json::to_string(&sig).unwrap(), "\"act\"");
    }

    #[test]
    fn asset_filename_slugs_punctuation_and_gender() {
        assert_eq!(Record::from_line("Mr. Mime,122").asset_filename, "mr-mime.png");
        assert_eq!(Record::from_line("Farfetch'd,83").asset_filename, "farfetchd.png");
        assert_eq!(Record::from_line("Type: Null,772").asset_filename, "type-null.png");
        assert_eq!(Record::from_line("Nidoran♂,32").asset_filename, "nidoran-m.png");
        assert_eq!(Record::from_line("Nidoran♀,29").asset_filename, "nidoran-f.png");
    }

    #[test]
    fn empty_line_yields_empty_record() {
        let record = Record::from_line("");
        assert_eq!(record.display_text, "");
        assert_eq!(record.normalized_word, "");
        assert!(record.signature().is_empty());
    }
}
