//! Script-mapping primitives for orthographies with multi-character
//! digraphs.
//!
//! Transcription between a native script and a romanization is not a
//! character-to-character map: digraphs like `aw` or `tʻ` must win over
//! their single-character prefixes, so all table lookups here are greedy and
//! longest-first.

/// An ordered substitution table applied greedily, longest key first.
///
/// Unmatched input characters are copied through unchanged, so a string that
/// mixes mapped and unmapped content (punctuation, digits) stays intact.
#[derive(Debug, Clone)]
pub struct Transcription {
    entries: Vec<(String, String)>,
}

impl Transcription {
    pub fn new(pairs: &[(&str, &str)]) -> Transcription {
        let mut entries: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // Longest keys first so digraphs are matched before their prefixes.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Transcription { entries }
    }

    /// The table with keys and values swapped.
    pub fn inverted(&self) -> Transcription {
        let pairs: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (v.as_str(), k.as_str()))
            .collect();
        Transcription::new(&pairs)
    }

    pub fn apply(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        'outer: while !rest.is_empty() {
            for (key, value) in &self.entries {
                if rest.starts_with(key.as_str()) {
                    out.push_str(value);
                    rest = &rest[key.len()..];
                    continue 'outer;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
        out
    }

    /// Exact whole-string lookup, for single translated units such as an
    /// alphabetical-index cursor.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The canonical alphabet of initials, in display order. Initials may span
/// several characters (`tʻ`, `čʻ`), so extracting the initial of a word is a
/// longest-prefix match and a single-character cursor can conflict with
/// longer initials that extend it.
#[derive(Debug, Clone)]
pub struct InitialIndex {
    initials: Vec<String>,
}

impl InitialIndex {
    pub fn new(initials: &[&str]) -> InitialIndex {
        InitialIndex {
            initials: initials.iter().map(|i| i.to_string()).collect(),
        }
    }

    pub fn ordered(&self) -> impl Iterator<Item = &str> {
        self.initials.iter().map(|i| i.as_str())
    }

    pub fn contains(&self, initial: &str) -> bool {
        self.initials.iter().any(|i| i == initial)
    }

    /// The canonical initial of `word`: the longest listed initial that
    /// prefixes it.
    pub fn initial_of(&self, word: &str) -> Option<&str> {
        self.initials
            .iter()
            .filter(|i| word.starts_with(i.as_str()))
            .max_by_key(|i| i.len())
            .map(|i| i.as_str())
    }

    /// Other initials that begin with `initial` and would therefore also
    /// match a prefix query for it.
    pub fn conflicting(&self, initial: &str) -> Vec<&str> {
        self.initials
            .iter()
            .filter(|i| i.as_str() != initial && i.starts_with(initial))
            .map(|i| i.as_str())
            .collect()
    }

    /// Restrict the canonical ordering to the initials present in `found`.
    pub fn in_order<'a>(&'a self, found: &[&str]) -> Vec<&'a str> {
        self.initials
            .iter()
            .filter(|i| found.contains(&i.as_str()))
            .map(|i| i.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Transcription {
        Transcription::new(&[("t'", "tʻ"), ("aw", "aw"), ("a", "a"), ("t", "t"), ("w", "w")])
    }

    #[test]
    fn digraphs_win_over_prefixes() {
        let t = sample();
        assert_eq!("tʻa", t.apply("t'a"));
        assert_eq!("tta", t.apply("tta"));
    }

    #[test]
    fn unmapped_characters_pass_through() {
        let t = sample();
        assert_eq!("tʻ-a 5", t.apply("t'-a 5"));
    }

    #[test]
    fn inverted_round_trips_unambiguous_input() {
        let t = Transcription::new(&[("tʻ", "թ"), ("a", "ա"), ("w", "ւ"), ("aw", "աւ")]);
        let back = t.inverted();
        assert_eq!("tʻaw", back.apply(&t.apply("tʻaw")));
    }

    #[test]
    fn initial_extraction_prefers_longest() {
        let idx = InitialIndex::new(&["c", "cʻ", "č", "čʻ", "a"]);
        assert_eq!(Some("cʻ"), idx.initial_of("cʻorek"));
        assert_eq!(Some("c"), idx.initial_of("car"));
        assert_eq!(None, idx.initial_of("xot"));
    }

    #[test]
    fn conflicting_initials_extend_the_cursor() {
        let idx = InitialIndex::new(&["c", "cʻ", "č", "čʻ", "a"]);
        assert_eq!(vec!["cʻ"], idx.conflicting("c"));
        assert!(idx.conflicting("a").is_empty());
    }

    #[test]
    fn canonical_order_is_preserved() {
        let idx = InitialIndex::new(&["b", "g", "d", "a"]);
        assert_eq!(vec!["b", "d", "a"], idx.in_order(&["a", "d", "b"]));
    }
}
