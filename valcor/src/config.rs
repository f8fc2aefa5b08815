//! Corpus-level configuration.
//!
//! Everything here is data about the corpus deployment, not about a single
//! request: the occurrence-window size, the preferred display order of
//! dependency relations, and the named source partitions that map sentence
//! identifier patterns to sub-corpora.

use crate::errors::Result;

/// One pattern matched against the sentence identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePattern {
    /// The identifier contains the given text.
    Contains { text: String },
    /// The identifier matches the given regular expression.
    Matches { pattern: String },
}

/// A named partition of the corpus, selected by sentence-identifier
/// patterns. A `residual` partition matches exactly the sentences that no
/// named pattern of any other partition matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePartition {
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<SourcePattern>,
    #[serde(default)]
    pub residual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Occurrences per page; pagination slices the matched-occurrence
    /// stream into windows of this size, not into sentence counts.
    pub window_size: u32,
    /// Dependency relations shown first in facet lists, in this order;
    /// everything else follows lexically.
    pub relation_order: Vec<String>,
    pub sources: Vec<SourcePartition>,
}

impl CorpusConfig {
    pub fn from_toml_str(input: &str) -> Result<CorpusConfig> {
        let config = toml::from_str(input)?;
        Ok(config)
    }

    pub fn partition(&self, name: &str) -> Option<&SourcePartition> {
        self.sources.iter().find(|p| p.name == name)
    }

    /// All patterns of non-residual partitions; a residual partition is the
    /// negation of every one of these.
    pub fn named_patterns(&self) -> impl Iterator<Item = &SourcePattern> {
        self.sources
            .iter()
            .filter(|p| !p.residual)
            .flat_map(|p| p.patterns.iter())
    }
}

impl Default for CorpusConfig {
    fn default() -> CorpusConfig {
        CorpusConfig {
            window_size: 50,
            relation_order: [
                "nsubj",
                "nsubj:pass",
                "nsubj:caus",
                "csubj",
                "csubj:caus",
                "csubj:pass",
                "obj",
                "ccomp",
                "iobj",
                "obl",
                "obl:agent",
                "obl:arg",
                "aux",
                "aux:caus",
            ]
            .iter()
            .map(|r| r.to_string())
            .collect(),
            sources: vec![
                contains_partition("German", &["hdt"]),
                contains_partition("Dutch", &["wiki", "WR-P-E-I"]),
                contains_partition("French", &["fr"]),
                contains_partition("English", &["GUM"]),
                SourcePartition {
                    name: "Greek".to_string(),
                    patterns: vec![SourcePattern::Matches {
                        pattern: "^[0-9]{5}$".to_string(),
                    }],
                    residual: false,
                },
                SourcePartition {
                    name: "Armenian".to_string(),
                    patterns: Vec::new(),
                    residual: true,
                },
            ],
        }
    }
}

fn contains_partition(name: &str, texts: &[&str]) -> SourcePartition {
    SourcePartition {
        name: name.to_string(),
        patterns: texts
            .iter()
            .map(|t| SourcePattern::Contains {
                text: t.to_string(),
            })
            .collect(),
        residual: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_describe_the_shipped_corpus() {
        let config = CorpusConfig::default();
        assert_eq!(50, config.window_size);
        assert_eq!("nsubj", config.relation_order[0]);
        assert!(config.partition("Armenian").unwrap().residual);
        // Every named pattern participates in the residual negation.
        assert_eq!(6, config.named_patterns().count());
    }

    #[test]
    fn config_loads_from_toml() {
        let config = CorpusConfig::from_toml_str(
            r#"
            window_size = 25
            relation_order = ["obj", "nsubj"]

            [[sources]]
            name = "Main"
            patterns = [{ contains = { text = "main" } }]

            [[sources]]
            name = "Rest"
            residual = true
            "#,
        )
        .unwrap();
        assert_eq!(25, config.window_size);
        assert_eq!(
            Some(&SourcePattern::Contains {
                text: "main".to_string()
            }),
            config.partition("Main").unwrap().patterns.first()
        );
        assert!(config.partition("Rest").unwrap().residual);
    }

    #[test]
    fn unknown_partition_lookup_is_none() {
        assert!(CorpusConfig::default().partition("Klingon").is_none());
    }
}
