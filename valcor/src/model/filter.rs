//! The normalized filter state of one exploration request.
//!
//! The request layer hands the engine a flat parameter multi-map plus the
//! session-carried values (selected verb, sense and alphabetical cursor).
//! Resolution is a pure function: it returns the effective [`FilterState`]
//! together with the updated carry-over, and the engine itself never touches
//! any ambient session store.

use std::collections::BTreeMap;

use crate::model::params::ParamMap;

/// Upper bound of simultaneously filterable dependency rows. Each active row
/// contributes one join, which also bounds the cost of facet discovery.
pub const MAX_DEPENDENCY_ROWS: usize = 5;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

/// Which of the two parallel orthographies a request works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Script {
    Native,
    Transliterated,
}

impl Script {
    pub fn other(self) -> Script {
        match self {
            Script::Native => Script::Transliterated,
            Script::Transliterated => Script::Native,
        }
    }

    /// Parameter key of the script-side exact-match search field.
    pub fn search_key(self) -> &'static str {
        match self {
            Script::Native => "language_search_query",
            Script::Transliterated => "translit_search_query",
        }
    }

    /// Parameter key of the first dependency row's lemma field.
    pub fn row_lemma_key(self, index: usize) -> String {
        if index == 0 {
            match self {
                Script::Native => "case_dependant_lemma".to_string(),
                Script::Transliterated => "translit_lemma".to_string(),
            }
        } else {
            format!("co_occurring_lemma_{}", index + 1)
        }
    }

    pub fn row_relation_key(self, index: usize) -> String {
        if index == 0 {
            "syntactic_relation".to_string()
        } else {
            format!("co_occurring_deprel_{}", index + 1)
        }
    }

    pub fn row_encoding_key(self, index: usize) -> String {
        if index == 0 {
            "case_value".to_string()
        } else {
            format!("co_occurring_case_value_{}", index + 1)
        }
    }
}

/// One of the three filterable facets of a dependency row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FacetColumn {
    Relation,
    Encoding,
    Lemma,
}

impl FacetColumn {
    pub const ALL: [FacetColumn; 3] = [FacetColumn::Relation, FacetColumn::Encoding, FacetColumn::Lemma];
}

/// One dependency-constraint row: an argument of the selected verb filtered
/// by relation, encoding and/or lemma. Row 0 is always visible in the UI;
/// later rows carry an explicit visibility flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyRow {
    pub relation: Option<String>,
    pub encoding: Option<String>,
    pub lemma: Option<String>,
    pub visible: bool,
}

impl DependencyRow {
    pub fn is_active(&self) -> bool {
        self.relation.is_some() || self.encoding.is_some() || self.lemma.is_some()
    }

    pub fn get(&self, column: FacetColumn) -> Option<&str> {
        match column {
            FacetColumn::Relation => self.relation.as_deref(),
            FacetColumn::Encoding => self.encoding.as_deref(),
            FacetColumn::Lemma => self.lemma.as_deref(),
        }
    }

    /// The two facets of this row other than `column`, in a fixed
    /// (relation, encoding, lemma)-minus-column order.
    pub fn others(&self, column: FacetColumn) -> (Option<&str>, Option<&str>) {
        match column {
            FacetColumn::Relation => (self.encoding.as_deref(), self.lemma.as_deref()),
            FacetColumn::Encoding => (self.relation.as_deref(), self.lemma.as_deref()),
            FacetColumn::Lemma => (self.relation.as_deref(), self.encoding.as_deref()),
        }
    }
}

/// The nine morphological feature categories of a verb occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FeatureCategory {
    VerbForm,
    Aspect,
    Case,
    Negation,
    Mood,
    Number,
    Person,
    Tense,
    Voice,
}

impl FeatureCategory {
    pub const ALL: [FeatureCategory; 9] = [
        FeatureCategory::VerbForm,
        FeatureCategory::Aspect,
        FeatureCategory::Case,
        FeatureCategory::Negation,
        FeatureCategory::Mood,
        FeatureCategory::Number,
        FeatureCategory::Person,
        FeatureCategory::Tense,
        FeatureCategory::Voice,
    ];

    /// Column name on the verbs table. The negation category is annotated as
    /// connegative in the corpus.
    pub fn column(self) -> &'static str {
        match self {
            FeatureCategory::VerbForm => "VerbForm",
            FeatureCategory::Aspect => "Aspect",
            FeatureCategory::Case => "Case",
            FeatureCategory::Negation => "Connegative",
            FeatureCategory::Mood => "Mood",
            FeatureCategory::Number => "Number",
            FeatureCategory::Person => "Person",
            FeatureCategory::Tense => "Tense",
            FeatureCategory::Voice => "Voice",
        }
    }

    /// Request parameter key of the category's multi-select.
    pub fn param_key(self) -> &'static str {
        match self {
            FeatureCategory::VerbForm => "verbform",
            FeatureCategory::Aspect => "aspect",
            FeatureCategory::Case => "case_feature",
            FeatureCategory::Negation => "Negation",
            FeatureCategory::Mood => "mood",
            FeatureCategory::Number => "number",
            FeatureCategory::Person => "person",
            FeatureCategory::Tense => "tense",
            FeatureCategory::Voice => "voice",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureCategory::Negation => "Negation",
            other => other.column(),
        }
    }
}

/// Chosen values per feature category; an absent category is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureSelections {
    selected: BTreeMap<FeatureCategory, Vec<String>>,
}

impl FeatureSelections {
    pub fn from_params(params: &ParamMap) -> FeatureSelections {
        let mut selected = BTreeMap::new();
        for category in FeatureCategory::ALL {
            let values: Vec<String> = params
                .get_all(category.param_key())
                .into_iter()
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
                .collect();
            if !values.is_empty() {
                selected.insert(category, values);
            }
        }
        FeatureSelections { selected }
    }

    pub fn get(&self, category: FeatureCategory) -> &[String] {
        self.selected
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureCategory, &[String])> {
        self.selected.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Source-subset selection. A panel that was submitted with nothing checked
/// is explicit user intent and must produce zero results; a panel that was
/// never submitted is no filter at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceFilter {
    NotSubmitted,
    Submitted(Vec<String>),
}

impl SourceFilter {
    pub fn selected(&self) -> &[String] {
        match self {
            SourceFilter::NotSubmitted => &[],
            SourceFilter::Submitted(names) => names.as_slice(),
        }
    }

    pub fn is_empty_submission(&self) -> bool {
        matches!(self, SourceFilter::Submitted(names) if names.is_empty())
    }
}

impl Default for SourceFilter {
    fn default() -> SourceFilter {
        SourceFilter::NotSubmitted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortKey {
    Lemma,
    Frequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Session-carried values owned by the (external) request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionCarry {
    pub selected_verb: Option<String>,
    pub selected_gloss: Option<String>,
    pub initial: Option<String>,
}

/// The effective filter state of one request plus the carry-over the request
/// layer should persist for the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRequest {
    pub filter: FilterState,
    pub session: SessionCarry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    pub script: Script,
    pub selected_verb: Option<String>,
    pub selected_gloss: Option<String>,
    pub rows: Vec<DependencyRow>,
    pub features: FeatureSelections,
    pub sources: SourceFilter,
    /// Exact-match search against the script-side lemma.
    pub script_search: Option<String>,
    /// Exact-match (case-folded) search against the translated gloss.
    pub gloss_search: Option<String>,
    pub initial: Option<String>,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub page: u32,
    pub per_page: u32,
}

impl FilterState {
    pub fn empty(script: Script) -> FilterState {
        FilterState {
            script,
            selected_verb: None,
            selected_gloss: None,
            rows: vec![DependencyRow::default(); MAX_DEPENDENCY_ROWS],
            features: FeatureSelections::default(),
            sources: SourceFilter::NotSubmitted,
            script_search: None,
            gloss_search: None,
            initial: None,
            sort: SortKey::Lemma,
            direction: SortDirection::Ascending,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// True when the request asks for a full reset of carried state.
    pub fn is_reset(params: &ParamMap) -> bool {
        params.get("reset") == Some("1")
    }

    /// Resolve the request parameters against the carried session values.
    ///
    /// URL arguments override the session; an explicitly empty argument
    /// clears it. A fresh search, or a click on the alphabetical index
    /// without a verb argument, leaves verb-selection mode.
    pub fn resolve(params: &ParamMap, script: Script, session: &SessionCarry) -> ResolvedRequest {
        if FilterState::is_reset(params) {
            return ResolvedRequest {
                filter: FilterState::empty(script),
                session: SessionCarry::default(),
            };
        }

        let mut carry = session.clone();

        if let Some(initial_arg) = params.get("initial") {
            carry.initial = non_empty(initial_arg);
        }

        let script_search = params.get_non_empty(script.search_key()).map(str::to_string);
        let gloss_search = params
            .get_non_empty("english_search_query")
            .map(str::to_string);

        let verb_arg = params.get("selected_verb");
        let gloss_arg = params.get("selected_verb_gloss");
        let has_search = script_search.is_some() || gloss_search.is_some();

        let search_submitted = params.get("search_submit") == Some("1") && has_search;
        let fresh_search = has_search && verb_arg.is_none();

        if search_submitted || fresh_search {
            carry.selected_verb = None;
            carry.selected_gloss = None;
            carry.initial = None;
        } else if verb_arg.is_none() && params.contains_key("initial") {
            // Jumping via the alphabetical index leaves the sentence view.
            carry.selected_verb = None;
            carry.selected_gloss = None;
        } else {
            if let Some(v) = verb_arg {
                carry.selected_verb = non_empty(v);
            }
            if let Some(g) = gloss_arg {
                carry.selected_gloss = non_empty(g);
            }
        }

        let rows = (0..MAX_DEPENDENCY_ROWS)
            .map(|idx| DependencyRow {
                relation: params
                    .get_non_empty(&script.row_relation_key(idx))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
                encoding: params
                    .get_non_empty(&script.row_encoding_key(idx))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
                lemma: params
                    .get_non_empty(&script.row_lemma_key(idx))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
                visible: idx == 0
                    || params.get(&format!("dependency{}_visible", idx + 1)) == Some("true"),
            })
            .collect();

        let sources = if params.contains_key("source_checkbox_submitted") {
            SourceFilter::Submitted(
                params
                    .get_all("selected_source")
                    .into_iter()
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        } else {
            SourceFilter::NotSubmitted
        };

        let sort = match params.get("sort") {
            Some("frequency") => SortKey::Frequency,
            _ => SortKey::Lemma,
        };
        let direction = match params.get("order") {
            Some("desc") => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };

        let page = params
            .get("page")
            .and_then(|p| p.parse::<u32>().ok())
            .map(|p| p.max(1))
            .unwrap_or(1);
        let per_page = params
            .get("per_page")
            .and_then(|p| p.parse::<u32>().ok())
            .map(|p| p.clamp(1, MAX_PER_PAGE))
            .unwrap_or(DEFAULT_PER_PAGE);

        let filter = FilterState {
            script,
            selected_verb: carry.selected_verb.clone(),
            selected_gloss: carry.selected_gloss.clone(),
            rows,
            features: FeatureSelections::from_params(params),
            sources,
            script_search,
            gloss_search,
            initial: carry.initial.clone(),
            sort,
            direction,
            page,
            per_page,
        };

        ResolvedRequest {
            filter,
            session: carry,
        }
    }

    /// Rows with at least one facet chosen, with their indices.
    pub fn active_rows(&self) -> Vec<(usize, &DependencyRow)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_active())
            .collect()
    }

    /// The selected sense: lemma plus optional gloss. A gloss without a
    /// lemma is meaningless and is never exposed here.
    pub fn sense(&self) -> Option<(&str, Option<&str>)> {
        self.selected_verb
            .as_deref()
            .map(|lemma| (lemma, self.selected_gloss.as_deref()))
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
