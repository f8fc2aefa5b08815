//! Result types produced by the engine for the rendering layer.

/// One row of the verb frequency list: a sense (lemma + gloss) and the
/// number of distinct occurrences it has under the active filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerbEntry {
    pub lemma: String,
    pub gloss: Option<String>,
    pub frequency: u64,
}

/// Remaining facet options of one dependency row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowOptions {
    pub relations: Vec<String>,
    pub encodings: Vec<String>,
    pub lemmas: Vec<String>,
}

impl RowOptions {
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty() && self.encodings.is_empty() && self.lemmas.is_empty()
    }
}

/// One unmerged corpus token with its display role flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenNode {
    pub token_id: i64,
    pub form: String,
    pub feat: Option<String>,
    pub gloss: Option<String>,
    pub head_id: Option<i64>,
    pub relation: Option<String>,
    pub pos: Option<String>,
    pub is_selected_verb: bool,
    pub is_argument: bool,
    pub is_case_dependent: bool,
    pub is_fixed_dependent: bool,
}

/// A display token after the orthography-specific merge pass. `token_ids`
/// keeps the underscore-joined ids of the merged pieces so the display form
/// stays traceable to the unmerged graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayToken {
    pub token_ids: String,
    pub form: String,
    pub tooltip: String,
    pub pos: Option<String>,
    pub is_selected_verb: bool,
    pub is_argument: bool,
    pub is_case_dependent: bool,
    pub is_fixed_dependent: bool,
}

/// A directed relation edge between two tokens of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationEdge {
    pub from: i64,
    pub to: i64,
    pub relation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationEntity {
    pub id: String,
    pub kind: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationAttribute {
    pub id: String,
    pub name: String,
    pub entity: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRelation {
    pub id: String,
    pub relation: String,
    pub governor: String,
    pub dependent: String,
}

/// Standoff annotation export of one sentence, computed over the unmerged
/// tokens. Character offsets refer to `text`, the space-joined surface
/// forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationDoc {
    pub text: String,
    pub entities: Vec<AnnotationEntity>,
    pub attributes: Vec<AnnotationAttribute>,
    pub relations: Vec<AnnotationRelation>,
}

/// One fully assembled sentence of the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceView {
    pub sent_id: String,
    pub text: Option<String>,
    pub translated_text: Option<String>,
    pub display: Vec<DisplayToken>,
    pub tokens: Vec<TokenNode>,
    pub relations: Vec<RelationEdge>,
    pub annotation: AnnotationDoc,
}

/// Pagination metadata for the occurrence-window pager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    /// Occurrences matched across all pages.
    pub total_occurrences: u64,
    /// Sentences with at least one matched occurrence.
    pub total_sentences: u64,
    /// 1-based index of the first occurrence on this page, 0 when the page
    /// is empty.
    pub occurrence_start: u64,
    /// 1-based index of the last occurrence on this page, 0 when the page
    /// is empty.
    pub occurrence_end: u64,
    pub has_prev: bool,
    pub has_next: bool,
}
