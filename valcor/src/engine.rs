//! The top-level exploration facade.
//!
//! One [`Explorer`] owns the corpus store and the corpus configuration and
//! is stateless across requests: the session carry-over comes in explicitly
//! and the updated carry-over goes back out with the result. Within one
//! request every sub-query is an independent read-only store access; the
//! reference implementation issues them sequentially.

use crate::config::CorpusConfig;
use crate::db::compose::QueryContext;
use crate::db::facets::FacetResolver;
use crate::db::{assemble, paginate, CorpusStore};
use crate::errors::Result;
use crate::model::filter::{
    FeatureCategory, FilterState, ResolvedRequest, Script, SessionCarry,
};
use crate::model::params::ParamMap;
use crate::translate;
use crate::types::{PageInfo, RowOptions, SentenceView, VerbEntry};

pub struct Explorer<S> {
    store: S,
    config: CorpusConfig,
}

/// Everything the rendering layer needs for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exploration {
    pub filter: FilterState,
    /// Carry-over the request layer should persist for the next request.
    pub session: SessionCarry,
    pub verbs: Vec<VerbEntry>,
    pub total_verb_count: usize,
    pub total_occurrence_count: u64,
    pub total_sentence_count: u64,
    pub row_options: Vec<RowOptions>,
    /// Per row: whether revealing the next dependency row would offer any
    /// facet option at all.
    pub next_row_available: Vec<bool>,
    pub feature_values: Vec<(FeatureCategory, Vec<String>)>,
    pub initials: Vec<String>,
    pub selected_verb_url: Option<String>,
    pub sentences: Vec<SentenceView>,
    pub page: PageInfo,
    /// Query string of the equivalent view in the other script.
    pub switch_query: String,
}

impl<S: CorpusStore> Explorer<S> {
    pub fn new(store: S, config: CorpusConfig) -> Explorer<S> {
        Explorer { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn explore(
        &self,
        params: &ParamMap,
        script: Script,
        session: &SessionCarry,
    ) -> Result<Exploration> {
        let ResolvedRequest { filter, session } = FilterState::resolve(params, script, session);
        debug!(
            "exploring: verb={:?} rows={} page={}",
            filter.selected_verb,
            filter.active_rows().len(),
            filter.page
        );
        let ctx = QueryContext::new(&filter, &self.config);

        let mut verbs = Vec::new();
        for row in self.store.rows(&ctx.verb_list()?)? {
            verbs.push(VerbEntry {
                lemma: row.require_text(0)?.to_string(),
                gloss: row.text(1).map(str::to_string),
                frequency: row.require_integer(2)?.max(0) as u64,
            });
        }
        let total_verb_count = verbs.len();
        let total_occurrence_count = verbs.iter().map(|v| v.frequency).sum();

        let resolver = FacetResolver::new(&ctx, &self.store);
        let (row_options, next_row_available) = resolver.resolve()?;
        let feature_values = resolver.feature_values()?;
        let initials = resolver.initials()?;

        let selected_verb_url = match ctx.verb_url() {
            Some(statement) => self
                .store
                .rows(&statement)?
                .first()
                .and_then(|r| r.text(0))
                .map(str::to_string),
            None => None,
        };

        let (sentences, page, total_sentence_count) = if filter.selected_verb.is_some() {
            let (totals, window) = paginate::paginate(&ctx, &self.store)?;
            let sentences = assemble::assemble_page(&ctx, &self.store, &window.sentence_ids)?;
            let page = PageInfo {
                page: filter.page,
                per_page: filter.per_page,
                total_occurrences: totals.occurrences,
                total_sentences: totals.sentences,
                occurrence_start: if window.covered > 0 {
                    window.start_offset + 1
                } else {
                    0
                },
                occurrence_end: if window.covered > 0 {
                    window.start_offset + window.covered
                } else {
                    0
                },
                has_prev: filter.page > 1,
                has_next: window.start_offset + window.covered < totals.occurrences,
            };
            (sentences, page, totals.sentences)
        } else {
            let total_sentence_count = self
                .store
                .rows(&ctx.sentence_total()?)?
                .first()
                .and_then(|r| r.integer(0))
                .unwrap_or(0)
                .max(0) as u64;
            let page = PageInfo {
                page: filter.page,
                per_page: filter.per_page,
                total_occurrences: total_occurrence_count,
                total_sentences: total_sentence_count,
                occurrence_start: 0,
                occurrence_end: 0,
                has_prev: filter.page > 1,
                has_next: u64::from(filter.page) * u64::from(filter.per_page)
                    < total_sentence_count,
            };
            (Vec::new(), page, total_sentence_count)
        };

        let switch_query = translate::switch_query(&ctx, &self.store, params)?;

        Ok(Exploration {
            session,
            verbs,
            total_verb_count,
            total_occurrence_count,
            total_sentence_count,
            row_options,
            next_row_available,
            feature_values,
            initials,
            selected_verb_url,
            sentences,
            page,
            switch_query,
            filter,
        })
    }
}
