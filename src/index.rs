use crate::normalize::{Record, Signature, normalize_word};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

type NodeId = usize;
type RecordId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<char, NodeId>,
    records: Vec<RecordId>,
}

/// Trie keyed by word signatures rather than words.
///
/// Each path from the root spells a signature in ascending character order,
/// and the node at the end of the path lists every record with exactly that
/// signature. Nodes live in a flat arena and only point at their children.
#[derive(Debug)]
pub struct AnagramIndex {
    nodes: Vec<Node>,
    records: Vec<Record>,
}

/// Records sharing one signature.
#[derive(Debug, Clone, Serialize)]
pub struct AnagramGroup<'a> {
    pub signature: Signature,
    pub records: Vec<&'a Record>,
}

impl Default for AnagramIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AnagramIndex {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            records: Vec::new(),
        }
    }

    /// Indexes every line in one pass.
    ///
    /// Lines are taken as `<display_text>[,<ignored>]`; trailing line breaks
    /// are trimmed and nothing is rejected.
    pub fn build<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for line in lines {
            let line = line.as_ref().trim_end_matches(['\r', '\n']);
            let record = Record::from_line(line);
            let signature = record.signature();
            index.insert(record, &signature);
        }
        debug!(
            records = index.records.len(),
            nodes = index.nodes.len(),
            "built anagram index"
        );
        index
    }

    /// Files `record` under `signature`, creating intermediate nodes as needed.
    pub fn insert(&mut self, record: Record, signature: &Signature) {
        let mut node = ROOT;
        for ch in signature.chars() {
            node = match self.nodes[node].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node].children.insert(ch, child);
                    child
                }
            };
        }
        let id = self.records.len();
        self.records.push(record);
        self.nodes[node].records.push(id);
    }

    /// Returns every record whose signature is a subset of `query`.
    ///
    /// Records with an empty signature sit at the root and are therefore part
    /// of every result, including the result for an empty query.
    pub fn find(&self, query: &Signature) -> Vec<&Record> {
        let mut found = Vec::new();
        self.collect_subsets(ROOT, query.as_str(), &mut found);
        found
    }

    /// Normalizes free text into a signature before searching.
    pub fn find_text(&self, text: &str) -> Vec<&Record> {
        self.find(&Signature::of(&normalize_word(text)))
    }

    fn collect_subsets<'a>(&'a self, node: NodeId, remaining: &str, found: &mut Vec<&'a Record>) {
        let current = &self.nodes[node];
        found.extend(current.records.iter().map(|&id| &self.records[id]));
        // Children only ever extend a path with larger characters, so each
        // branch only needs the part of the query after its own character.
        for (offset, ch) in remaining.char_indices() {
            if let Some(&child) = current.children.get(&ch) {
                let rest = &remaining[offset + ch.len_utf8()..];
                self.collect_subsets(child, rest, found);
            }
        }
    }

    /// Records whose signature equals `signature` exactly.
    pub fn exact(&self, signature: &Signature) -> Vec<&Record> {
        let mut node = ROOT;
        for ch in signature.chars() {
            match self.nodes[node].children.get(&ch) {
                Some(&child) => node = child,
                None => return Vec::new(),
            }
        }
        self.records_at(node).collect()
    }

    /// Every signature shared by at least two records, in signature order.
    pub fn exact_anagrams(&self) -> Vec<AnagramGroup<'_>> {
        let mut groups = Vec::new();
        let mut path = String::new();
        self.collect_groups(ROOT, &mut path, &mut groups);
        groups.sort_by(|a, b| a.signature.cmp(&b.signature));
        groups
    }

    fn collect_groups<'a>(
        &'a self,
        node: NodeId,
        path: &mut String,
        groups: &mut Vec<AnagramGroup<'a>>,
    ) {
        let current = &self.nodes[node];
        if current.records.len() > 1 {
            groups.push(AnagramGroup {
                signature: Signature::of(path),
                records: self.records_at(node).collect(),
            });
        }
        for (&ch, &child) in &current.children {
            path.push(ch);
            self.collect_groups(child, path, groups);
            path.pop();
        }
    }

    fn records_at(&self, node: NodeId) -> impl Iterator<Item = &Record> + '_ {
        self.nodes[node]
            .records
            .iter()
            .map(move |&id| &self.records[id])
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const POKEMON: &str = include_str!("../data/pokemon.csv");

    fn words<'a>(records: &[&'a Record]) -> HashSet<&'a str> {
        records.iter().map(|r| r.display_text.as_str()).collect()
    }

    fn subsets(signature: &Signature) -> Vec<Signature> {
        let chars: Vec<char> = signature.chars().collect();
        (0..1u32 << chars.len())
            .map(|mask| {
                let picked: String = chars
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| mask & (1 << bit) != 0)
                    .map(|(_, ch)| *ch)
                    .collect();
                Signature::of(&picked)
            })
            .collect()
    }

    #[test]
    fn finds_exact_anagrams_and_excludes_others() {
        let index = AnagramIndex::build(["cat", "act", "tac", "dog"]);
        let found = index.find(&Signature::of("act"));
        assert_eq!(found.len(), 3);
        assert_eq!(words(&found), HashSet::from(["cat", "act", "tac"]));
    }

    #[test]
    fn find_includes_shorter_signatures_on_the_path() {
        let index = AnagramIndex::build(["a", "at", "cat", "tacit", "dog"]);
        let found = index.find(&Signature::of("act"));
        assert_eq!(words(&found), HashSet::from(["a", "at", "cat"]));
    }

    #[test]
    fn find_includes_subsets_off_the_query_path() {
        // "ct" and "t" never share a prefix with "act".
        let index = AnagramIndex::build(["tt", "ct", "cc", "ox"]);
        let found = index.find(&Signature::of("act"));
        assert_eq!(words(&found), HashSet::from(["tt", "ct", "cc"]));
    }

    #[test]
    fn subset_law_matches_brute_force() {
        let index = AnagramIndex::build(POKEMON.lines());
        for query in ["adinor", "aeklmouz", "eijmr", "ehilmopt", "abcghort", "xyz", ""] {
            let query = Signature::of(query);
            let found: HashSet<&Record> = index.find(&query).into_iter().collect();
            let expected: HashSet<&Record> = index
                .records()
                .iter()
                .filter(|r| r.signature().is_subset_of(&query))
                .collect();
            assert_eq!(found, expected, "query {query}");
        }
    }

    #[test]
    fn nidoran_family_matches() {
        let index = AnagramIndex::build(POKEMON.lines());
        let found = words(&index.find(&Signature::of("adinor")));
        for name in ["Nidoran♀", "Nidoran♂", "Nidorina", "Nidorino", "Dodrio", "Aron"] {
            assert!(found.contains(name), "missing {name}");
        }
    }

    #[test]
    fn find_is_monotone() {
        let index = AnagramIndex::build(POKEMON.lines());
        let wide = Signature::of("aeilmnrt");
        let wide_found: HashSet<&Record> = index.find(&wide).into_iter().collect();
        for narrow in subsets(&wide) {
            for record in index.find(&narrow) {
                assert!(wide_found.contains(record), "{narrow} not within {wide}");
            }
        }
    }

    #[test]
    fn build_order_does_not_change_results() {
        let forward: Vec<&str> = POKEMON.lines().collect();
        let mut backward = forward.clone();
        backward.reverse();
        let a = AnagramIndex::build(&forward);
        let b = AnagramIndex::build(&backward);
        assert_eq!(a.node_count(), b.node_count());
        for query in ["acdefhirst", "aelnptuy", "eilopsvw", "abcefl"] {
            let query = Signature::of(query);
            let left: HashSet<&Record> = a.find(&query).into_iter().collect();
            let right: HashSet<&Record> = b.find(&query).into_iter().collect();
            assert_eq!(left, right);
        }
    }

    #[test]
    fn repeated_queries_are_identical() {
        let index = AnagramIndex::build(POKEMON.lines());
        let query = Signature::of("eilopsvw");
        assert_eq!(index.find(&query), index.find(&query));
    }

    #[test]
    fn empty_signature_records_match_every_query() {
        let index = AnagramIndex::build(["cat", "!!!", "♀"]);
        assert_eq!(index.find(&Signature::default()).len(), 2);
        let found = words(&index.find(&Signature::of("act")));
        assert_eq!(found, HashSet::from(["cat", "!!!", "♀"]));
        assert_eq!(words(&index.find(&Signature::of("xyz"))), HashSet::from(["!!!", "♀"]));
    }

    #[test]
    fn find_text_normalizes_the_query() {
        let index = AnagramIndex::build(["Flabébé,669", "Cleffa,173", "Clefable,36"]);
        let found = index.find_text("Fable, Clé!");
        assert_eq!(words(&found), HashSet::from(["Flabébé", "Cleffa", "Clefable"]));
    }

    #[test]
    fn exact_lookup_stops_at_the_signature_node() {
        let index = AnagramIndex::build(["cat", "act", "at", "tact"]);
        let found = words(&index.exact(&Signature::of("act")));
        assert_eq!(found, HashSet::from(["cat", "act", "tact"]));
        assert!(index.exact(&Signature::of("ac")).is_empty());
        assert!(index.exact(&Signature::of("q")).is_empty());
    }

    #[test]
    fn exact_anagram_groups() {
        let index = AnagramIndex::build(["Grookey,810", "Kyogre,382", "Pikachu,25"]);
        let groups = index.exact_anagrams();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].signature.as_str(), "egkory");
        assert_eq!(groups[0].records.len(), 2);
    }

    #[test]
    fn build_trims_line_endings_and_keeps_insertion_order() {
        let index = AnagramIndex::build(["Bulbasaur,1\r\n", "Ivysaur,2\n"]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.records()[0].display_text, "Bulbasaur");
        assert_eq!(index.records()[1].normalized_word, "ivysaur");
    }

    #[test]
    fn index_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnagramIndex>();
    }
}
