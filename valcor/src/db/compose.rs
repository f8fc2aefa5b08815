//! Composition of the query shapes the engine needs.
//!
//! Four shapes share one predicate vocabulary and must agree on every shared
//! filter's semantics: the verb frequency list, the distinct-sentence total,
//! facet discovery and occurrence windowing. Each active dependency row
//! contributes one join against the arguments table keyed on
//! `(head_id, sent_id)`; when two or more rows are active they must bind to
//! pairwise-distinct argument tokens of the same sentence.

use valcor_core::sql::{Params, Pred, SelectQuery, Statement};

use crate::config::{CorpusConfig, SourcePattern};
use crate::errors::Result;
use crate::model::filter::{FacetColumn, FeatureCategory, FilterState, SortDirection, SortKey};
use crate::model::script::{profile, ScriptProfile};

pub struct QueryContext<'a> {
    pub filter: &'a FilterState,
    pub profile: &'static ScriptProfile,
    pub config: &'a CorpusConfig,
}

/// Shared FROM/JOIN/WHERE scope of the facet-discovery queries for one
/// dependency-row level.
pub struct FacetScope {
    pub joins: Vec<String>,
    pub preds: Vec<Pred>,
    pub params: Params,
    pub alias: String,
}

impl<'a> QueryContext<'a> {
    pub fn new(filter: &'a FilterState, config: &'a CorpusConfig) -> QueryContext<'a> {
        QueryContext {
            filter,
            profile: profile(filter.script),
            config,
        }
    }

    /// Column of the arguments table backing one facet, qualified by alias.
    pub fn facet_column(&self, alias: &str, column: FacetColumn) -> String {
        let col = match column {
            FacetColumn::Relation => "dep_rel",
            FacetColumn::Encoding => self.profile.encoding_col,
            FacetColumn::Lemma => self.profile.arg_lemma_col,
        };
        format!("{}.{}", alias, col)
    }

    fn argument_join(&self, verb_alias: &str, idx: usize, left: bool) -> String {
        format!(
            "{} arguments a{idx} ON {v}.token_id = a{idx}.head_id AND {v}.sent_id = a{idx}.sent_id",
            if left { "LEFT JOIN" } else { "JOIN" },
            idx = idx,
            v = verb_alias,
        )
    }

    /// Equality conditions of one dependency row, optionally skipping one
    /// facet (used by option discovery to leave the probed column open).
    fn row_conditions(
        &self,
        idx: usize,
        skip: Option<FacetColumn>,
        params: &mut Params,
    ) -> Vec<Pred> {
        let row = &self.filter.rows[idx];
        let alias = format!("a{}", idx);
        let mut preds = Vec::new();
        for column in FacetColumn::ALL {
            if Some(column) == skip {
                continue;
            }
            if let Some(value) = row.get(column) {
                preds.push(Pred::eq(&self.facet_column(&alias, column), value, params));
            }
        }
        preds
    }

    /// Pairwise inequality between the argument tokens bound by the given
    /// row indices: no two rows may be satisfied by the same dependent.
    fn pairwise_distinct(&self, indices: &[usize]) -> Vec<Pred> {
        let mut preds = Vec::new();
        for (n, i) in indices.iter().enumerate() {
            for j in &indices[n + 1..] {
                preds.push(Pred::ne_columns(
                    &format!("a{}.token_id", i),
                    &format!("a{}.token_id", j),
                ));
            }
        }
        preds
    }

    /// Sense scoping: lemma always, gloss only together with a lemma.
    fn sense_conditions(&self, verb_alias: &str, params: &mut Params) -> Vec<Pred> {
        let mut preds = Vec::new();
        if let Some((lemma, gloss)) = self.filter.sense() {
            preds.push(Pred::eq(
                &format!("{}.{}", verb_alias, self.profile.verb_lemma_col),
                lemma,
                params,
            ));
            if let Some(gloss) = gloss {
                preds.push(Pred::eq(&format!("{}.gloss", verb_alias), gloss, params));
            }
        }
        preds
    }

    fn search_conditions(&self, verb_alias: &str, params: &mut Params) -> Vec<Pred> {
        let mut preds = Vec::new();
        if let Some(query) = self.filter.script_search.as_deref() {
            let col = format!("{}.{}", verb_alias, self.profile.verb_lemma_col);
            preds.push(if self.profile.fold_search_case {
                Pred::eq_fold(&col, query, params)
            } else {
                Pred::eq(&col, query, params)
            });
        }
        if let Some(query) = self.filter.gloss_search.as_deref() {
            preds.push(Pred::eq_fold(
                &format!("{}.gloss", verb_alias),
                query,
                params,
            ));
        }
        preds
    }

    fn feature_conditions(&self, verb_alias: &str, params: &mut Params) -> Result<Vec<Pred>> {
        let mut preds = Vec::new();
        for (category, values) in self.filter.features.iter() {
            // Quoted: "Case" is a reserved word in most dialects.
            preds.push(Pred::in_set(
                &format!("{}.\"{}\"", verb_alias, category.column()),
                values.iter().map(String::as_str),
                params,
            )?);
        }
        Ok(preds)
    }

    /// The alphabetical-index cursor applies only while no verb is selected.
    /// A multigraph alphabet needs the conflicting longer initials excluded,
    /// otherwise the prefix query for `c` would also swallow `cʻ`.
    fn initial_conditions(&self, verb_alias: &str, params: &mut Params) -> Vec<Pred> {
        let mut preds = Vec::new();
        if self.filter.selected_verb.is_some() {
            return preds;
        }
        if let Some(initial) = self.filter.initial.as_deref() {
            let col = format!("{}.{}", verb_alias, self.profile.verb_lemma_col);
            preds.push(Pred::starts_with(&col, initial, params));
            for conflict in self.profile.initials.conflicting(initial) {
                preds.push(Pred::not_starts_with(&col, conflict, params));
            }
        }
        preds
    }

    /// Source-subset disjunction over sentence-identifier patterns. An
    /// explicitly submitted empty selection forces an empty result.
    fn source_condition(&self, sent_col: &str, params: &mut Params) -> Result<Option<Pred>> {
        if self.filter.sources.is_empty_submission() {
            return Ok(Some(Pred::Never));
        }
        let selected = self.filter.sources.selected();
        if selected.is_empty() {
            return Ok(None);
        }

        let mut branches = Vec::new();
        for name in selected {
            let partition = match self.config.partition(name) {
                Some(p) => p,
                None => {
                    debug!("ignoring unknown source partition '{}'", name);
                    continue;
                }
            };
            if partition.residual {
                let mut negations = Vec::new();
                for pattern in self.config.named_patterns() {
                    negations.push(match pattern {
                        SourcePattern::Contains { text } => {
                            Pred::not_contains(sent_col, text, params)
                        }
                        SourcePattern::Matches { pattern } => {
                            Pred::not_matches(sent_col, pattern, params)?
                        }
                    });
                }
                branches.push(Pred::All(negations));
            } else {
                let mut positives = Vec::new();
                for pattern in &partition.patterns {
                    positives.push(match pattern {
                        SourcePattern::Contains { text } => Pred::contains(sent_col, text, params),
                        SourcePattern::Matches { pattern } => {
                            Pred::matches(sent_col, pattern, params)?
                        }
                    });
                }
                if !positives.is_empty() {
                    branches.push(Pred::any(positives)?);
                }
            }
        }
        if branches.is_empty() {
            return Ok(None);
        }
        Ok(Some(Pred::any(branches)?))
    }

    fn active_indices(&self) -> Vec<usize> {
        self.filter.active_rows().iter().map(|(i, _)| *i).collect()
    }

    /// Verb frequency list: senses grouped by (lemma, gloss), frequency =
    /// distinct (token, sentence) pairs, restricted by every active filter.
    pub fn verb_list(&self) -> Result<Statement> {
        let mut params = Params::new();
        let active = self.active_indices();

        let mut query = SelectQuery::from_table("verbs v")
            .column(&format!("v.{}", self.profile.verb_lemma_col))
            .column("v.gloss")
            .column("COUNT(DISTINCT v.token_id || ':' || v.sent_id) AS frequency")
            .joins(active.iter().map(|i| self.argument_join("v", *i, false)));

        for idx in &active {
            query = query.filters(self.row_conditions(*idx, None, &mut params));
        }
        query = query.filters(self.pairwise_distinct(&active));
        query = query.filters(self.feature_conditions("v", &mut params)?);
        query = query.filters(self.initial_conditions("v", &mut params));
        query = query.filters(self.search_conditions("v", &mut params));
        if let Some(pred) = self.source_condition("v.sent_id", &mut params)? {
            query = query.filter(pred);
        }
        // The list stays in lemma mode here: grouping by gloss shows every
        // sense of the selected lemma, so only the lemma scopes the list.
        if let Some(lemma) = self.filter.selected_verb.as_deref() {
            query = query.filter(Pred::eq(
                &format!("v.{}", self.profile.verb_lemma_col),
                lemma,
                &mut params,
            ));
        }

        let direction = match self.filter.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let order = match self.filter.sort {
            SortKey::Frequency => format!("frequency {}", direction),
            SortKey::Lemma => format!("v.{} {}", self.profile.verb_lemma_col, direction),
        };

        let query = query
            .group_by(&format!("v.{}", self.profile.verb_lemma_col))
            .group_by("v.gloss")
            .order_by(&order);

        let statement = query.render(params);
        debug!("verb list query: {}", statement.sql);
        Ok(statement)
    }

    /// Distinct sentences satisfying the identical predicate set.
    pub fn sentence_total(&self) -> Result<Statement> {
        let mut params = Params::new();
        let active = self.active_indices();

        let mut query = SelectQuery::from_table("verbs v")
            .column("COUNT(DISTINCT v.sent_id) AS total_sentences")
            .joins(active.iter().map(|i| self.argument_join("v", *i, false)));

        for idx in &active {
            query = query.filters(self.row_conditions(*idx, None, &mut params));
        }
        query = query.filters(self.pairwise_distinct(&active));
        query = query.filters(self.initial_conditions("v", &mut params));
        query = query.filters(self.search_conditions("v", &mut params));
        if let Some(pred) = self.source_condition("v.sent_id", &mut params)? {
            query = query.filter(pred);
        }
        query = query.filters(self.sense_conditions("v", &mut params));
        query = query.filters(self.feature_conditions("v", &mut params)?);

        Ok(query.render(params))
    }

    /// Predicate scope shared by the sentence-set queries of the selected
    /// verb: windowing, headers and verb hits must agree exactly.
    fn sentence_scope(&self, params: &mut Params) -> Result<(Vec<String>, Vec<Pred>)> {
        let active = self.active_indices();
        let joins: Vec<String> = active
            .iter()
            .map(|i| self.argument_join("v", *i, true))
            .collect();

        let mut preds = Vec::new();
        if self.filter.selected_verb.is_none() {
            // A sentence page without a selected verb is undefined.
            preds.push(Pred::Never);
            return Ok((joins, preds));
        }
        preds.extend(self.sense_conditions("v", params));
        if let Some(pred) = self.source_condition("s.sent_id", params)? {
            preds.push(pred);
        }
        for idx in &active {
            preds.extend(self.row_conditions(*idx, None, params));
        }
        preds.extend(self.pairwise_distinct(&active));
        preds.extend(self.feature_conditions("v", params)?);
        Ok((joins, preds))
    }

    /// Per-sentence occurrence counts in sentence order, as a CTE over the
    /// shared sentence scope. The paginator walks the resulting stream.
    pub fn occurrence_histogram(&self) -> Result<Statement> {
        let mut params = Params::new();
        let (joins, preds) = self.sentence_scope(&mut params)?;

        let inner = SelectQuery::from_table("sentences s")
            .column("s.sent_id AS sent_id")
            .column("COUNT(DISTINCT v.token_id) AS token_hits")
            .join("JOIN verbs v ON s.sent_id = v.sent_id")
            .joins(joins)
            .filters(preds)
            .group_by("s.sent_id");
        let outer = SelectQuery::from_table("occurrence_hits")
            .column("sent_id")
            .column("token_hits")
            .order_by("sent_id");

        let statement = outer.render_with("occurrence_hits", &inner, params);
        debug!("occurrence histogram query: {}", statement.sql);
        Ok(statement)
    }

    /// Headers of the page's sentences, in sentence order. The text column
    /// follows the script profile.
    pub fn sentence_headers(&self, page_ids: &[String]) -> Result<Statement> {
        let mut params = Params::new();
        let (joins, mut preds) = self.sentence_scope(&mut params)?;
        preds.push(Pred::in_set(
            "s.sent_id",
            page_ids.iter().map(String::as_str),
            &mut params,
        )?);

        let query = SelectQuery::from_table("sentences s")
            .column("s.sent_id")
            .column(&format!("s.{}", self.profile.sentence_text_col))
            .column("s.translated_text")
            .join("JOIN verbs v ON s.sent_id = v.sent_id")
            .joins(joins)
            .filters(preds)
            .group_by("s.sent_id")
            .order_by("s.sent_id");
        Ok(query.render(params))
    }

    /// The matched verb occurrences of the page's sentences.
    pub fn verb_hits(&self, page_ids: &[String]) -> Result<Statement> {
        let mut params = Params::new();
        let (joins, mut preds) = self.sentence_scope(&mut params)?;
        preds.push(Pred::in_set(
            "s.sent_id",
            page_ids.iter().map(String::as_str),
            &mut params,
        )?);

        let query = SelectQuery::from_table("verbs v")
            .column("DISTINCT v.token_id")
            .column("v.sent_id")
            .join("JOIN sentences s ON s.sent_id = v.sent_id")
            .joins(joins)
            .filters(preds);
        Ok(query.render(params))
    }

    /// URL of the selected sense, if any.
    pub fn verb_url(&self) -> Option<Statement> {
        let (lemma, gloss) = self.filter.sense()?;
        let mut params = Params::new();
        let mut query = SelectQuery::from_table("verbs v").column("v.url").filter(Pred::eq(
            &format!("v.{}", self.profile.verb_lemma_col),
            lemma,
            &mut params,
        ));
        if let Some(gloss) = gloss {
            query = query.filter(Pred::eq("v.gloss", gloss, &mut params));
        }
        Some(query.limit(1).render(params))
    }

    /// Shared scope of all facet-discovery queries for one row level: every
    /// constraint except the probed row's own facets applies; the probed
    /// row's join is always present so only reachable values are offered.
    pub fn facet_scope(&self, level: usize) -> Result<FacetScope> {
        let mut params = Params::new();
        let mut involved = self.active_indices();
        if !involved.contains(&level) {
            involved.push(level);
            involved.sort_unstable();
        }

        let joins: Vec<String> = involved
            .iter()
            .map(|i| self.argument_join("v", *i, false))
            .collect();

        let mut preds = Vec::new();
        preds.extend(self.sense_conditions("v", &mut params));
        if self.filter.selected_verb.is_none() {
            preds.extend(self.search_conditions("v", &mut params));
        }
        preds.extend(self.initial_conditions("v", &mut params));
        if let Some(pred) = self.source_condition("v.sent_id", &mut params)? {
            preds.push(pred);
        }
        preds.extend(self.feature_conditions("v", &mut params)?);
        for idx in &involved {
            if *idx != level {
                preds.extend(self.row_conditions(*idx, None, &mut params));
            }
        }
        preds.extend(self.pairwise_distinct(&involved));

        Ok(FacetScope {
            joins,
            preds,
            params,
            alias: format!("a{}", level),
        })
    }

    /// Distinct values of one facet column at one row level. The row's other
    /// two facets, when chosen, still constrain the result.
    pub fn facet_values(&self, scope: &FacetScope, level: usize, column: FacetColumn) -> Statement {
        let mut params = scope.params.clone();
        let mut preds = scope.preds.clone();

        let row = &self.filter.rows[level];
        for other in FacetColumn::ALL {
            if other == column {
                continue;
            }
            if let Some(value) = row.get(other) {
                preds.push(Pred::eq(
                    &self.facet_column(&scope.alias, other),
                    value,
                    &mut params,
                ));
            }
        }

        let col = self.facet_column(&scope.alias, column);
        SelectQuery::from_table("verbs v")
            .column(&format!("DISTINCT {}", col))
            .joins(scope.joins.iter().cloned())
            .filters(preds)
            .order_by(&col)
            .render(params)
    }

    /// Distinct values still reachable per feature category, folded into one
    /// aggregation row.
    pub fn feature_values(&self) -> Result<Statement> {
        let mut params = Params::new();
        let active = self.active_indices();

        let mut query = SelectQuery::from_table("verbs v")
            .joins(active.iter().map(|i| self.argument_join("v", *i, false)));
        for category in FeatureCategory::ALL {
            query = query.column(&format!(
                "GROUP_CONCAT(DISTINCT v.\"{}\") AS all_{}",
                category.column(),
                category.column().to_lowercase()
            ));
        }

        for idx in &active {
            query = query.filters(self.row_conditions(*idx, None, &mut params));
        }
        query = query.filters(self.pairwise_distinct(&active));
        if let Some(pred) = self.source_condition("v.sent_id", &mut params)? {
            query = query.filter(pred);
        }
        query = query.filters(self.initial_conditions("v", &mut params));
        query = query.filters(self.sense_conditions("v", &mut params));
        if self.filter.selected_verb.is_none() {
            query = query.filters(self.search_conditions("v", &mut params));
        }
        query = query.filters(self.feature_conditions("v", &mut params)?);

        Ok(query.limit(1).render(params))
    }

    /// Distinct script-side lemmas for the initials bar. The bar navigates
    /// away from the current verb, so the sense and (in sentence mode) the
    /// search filters stay out of scope.
    pub fn initial_lemmas(&self) -> Result<Statement> {
        let mut params = Params::new();
        let active = self.active_indices();

        let mut query = SelectQuery::from_table("verbs v")
            .column(&format!("DISTINCT v.{}", self.profile.verb_lemma_col))
            .joins(active.iter().map(|i| self.argument_join("v", *i, false)));

        for idx in &active {
            query = query.filters(self.row_conditions(*idx, None, &mut params));
        }
        query = query.filters(self.pairwise_distinct(&active));
        if let Some(pred) = self.source_condition("v.sent_id", &mut params)? {
            query = query.filter(pred);
        }
        query = query.filters(self.initial_conditions("v", &mut params));
        if self.filter.selected_verb.is_none() {
            query = query.filters(self.search_conditions("v", &mut params));
        }
        query = query.filters(self.feature_conditions("v", &mut params)?);

        Ok(query.render(params))
    }
}

/// All tokens of the given sentences, in sentence and token order. One
/// batched query per page, never one per sentence.
pub fn tokens_for(page_ids: &[String]) -> Result<Statement> {
    let mut params = Params::new();
    let query = SelectQuery::from_table("words w")
        .column("w.sent_id")
        .column("w.token_id")
        .column("w.form")
        .column("w.feat")
        .column("w.gloss")
        .column("w.head_id")
        .column("w.dep_rel")
        .column("w.pos")
        .filter(Pred::in_set(
            "w.sent_id",
            page_ids.iter().map(String::as_str),
            &mut params,
        )?)
        .order_by("w.sent_id")
        .order_by("w.token_id");
    Ok(query.render(params))
}

/// All argument edges of the given sentences.
pub fn argument_edges_for(page_ids: &[String]) -> Result<Statement> {
    let mut params = Params::new();
    let query = SelectQuery::from_table("arguments a")
        .column("a.sent_id")
        .column("a.head_id")
        .column("a.token_id")
        .column("a.dep_rel")
        .column("a.cdep_token_id")
        .column("a.second_cdep_token_id")
        .column("a.fdep_token_id")
        .filter(Pred::in_set(
            "a.sent_id",
            page_ids.iter().map(String::as_str),
            &mut params,
        )?);
    Ok(query.render(params))
}
