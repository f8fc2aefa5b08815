//! Cascading facet option discovery for the dependency rows.
//!
//! For each row and each of its three facets, the resolver computes which
//! values remain selectable under every *other* active constraint, then
//! removes values that would exactly reproduce a combination already fixed
//! by an earlier row. Rows are processed in index order; each completed
//! row's triple joins the exclusion accumulator before the next row is
//! resolved. A parallel probe reports whether the row after the last visible
//! one would offer any option at all.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use crate::db::compose::QueryContext;
use crate::db::{text_column, CorpusStore};
use crate::errors::Result;
use crate::model::filter::{DependencyRow, FacetColumn, FeatureCategory, MAX_DEPENDENCY_ROWS};
use crate::types::RowOptions;

pub struct FacetResolver<'a> {
    ctx: &'a QueryContext<'a>,
    store: &'a dyn CorpusStore,
}

impl<'a> FacetResolver<'a> {
    pub fn new(ctx: &'a QueryContext<'a>, store: &'a dyn CorpusStore) -> FacetResolver<'a> {
        FacetResolver { ctx, store }
    }

    /// Options for every row plus, per row, whether the next row would have
    /// any options left.
    pub fn resolve(&self) -> Result<(Vec<RowOptions>, Vec<bool>)> {
        let mut options = Vec::with_capacity(MAX_DEPENDENCY_ROWS);
        let mut fixed: Vec<DependencyRow> = Vec::new();

        for level in 0..MAX_DEPENDENCY_ROWS {
            options.push(self.row_options(level, &fixed)?);
            let row = &self.ctx.filter.rows[level];
            if row.is_active() {
                fixed.push(row.clone());
            }
        }

        let mut has_next = Vec::with_capacity(MAX_DEPENDENCY_ROWS);
        for level in 0..MAX_DEPENDENCY_ROWS {
            if level + 1 < MAX_DEPENDENCY_ROWS {
                let next = self.row_options(level + 1, &fixed)?;
                has_next.push(!next.is_empty());
            } else {
                has_next.push(false);
            }
        }

        Ok((options, has_next))
    }

    fn row_options(&self, level: usize, fixed: &[DependencyRow]) -> Result<RowOptions> {
        let scope = self.ctx.facet_scope(level)?;
        let relations = self.column_values(&scope, level, FacetColumn::Relation, fixed)?;
        let encodings = self.column_values(&scope, level, FacetColumn::Encoding, fixed)?;
        let lemmas = self.column_values(&scope, level, FacetColumn::Lemma, fixed)?;
        Ok(RowOptions {
            relations: order_relations(relations, &self.ctx.config.relation_order),
            encodings,
            lemmas,
        })
    }

    fn column_values(
        &self,
        scope: &crate::db::compose::FacetScope,
        level: usize,
        column: FacetColumn,
        fixed: &[DependencyRow],
    ) -> Result<Vec<String>> {
        let statement = self.ctx.facet_values(scope, level, column);
        let mut values = text_column(&self.store.rows(&statement)?);
        let excluded = excluded_values(&self.ctx.filter.rows[level], fixed, column);
        if !excluded.is_empty() {
            values.retain(|v| !excluded.contains(v.as_str()));
        }
        Ok(values)
    }

    /// Distinct values still reachable per feature category, each list
    /// sorted.
    pub fn feature_values(&self) -> Result<Vec<(FeatureCategory, Vec<String>)>> {
        let statement = self.ctx.feature_values()?;
        let rows = self.store.rows(&statement)?;
        let row = rows.first();
        Ok(FeatureCategory::ALL
            .iter()
            .enumerate()
            .map(|(idx, category)| {
                let values: BTreeSet<String> = row
                    .and_then(|r| r.text(idx))
                    .map(|concat| {
                        concat
                            .split(',')
                            .filter(|v| !v.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                (*category, values.into_iter().collect())
            })
            .collect())
    }

    /// The alphabetical-index initials reachable under the current filters,
    /// in canonical alphabet order.
    pub fn initials(&self) -> Result<Vec<String>> {
        let statement = self.ctx.initial_lemmas()?;
        let lemmas = text_column(&self.store.rows(&statement)?);
        let index = &self.ctx.profile.initials;
        let found: FxHashSet<&str> = lemmas
            .iter()
            .filter_map(|lemma| index.initial_of(lemma))
            .collect();
        let found: Vec<&str> = found.into_iter().collect();
        Ok(index
            .in_order(&found)
            .into_iter()
            .map(str::to_string)
            .collect())
    }
}

/// Values of `column` that would complete the probed row into a triple
/// already fixed by a strictly earlier row. Only applies once the row's
/// other two facets are both chosen; before that, no single value can
/// reproduce a full triple.
fn excluded_values<'f>(
    row: &DependencyRow,
    fixed: &'f [DependencyRow],
    column: FacetColumn,
) -> FxHashSet<&'f str> {
    let (own1, own2) = row.others(column);
    let (own1, own2) = match (own1, own2) {
        (Some(a), Some(b)) => (a, b),
        _ => return FxHashSet::default(),
    };
    fixed
        .iter()
        .filter(|earlier| earlier.others(column) == (Some(own1), Some(own2)))
        .filter_map(|earlier| earlier.get(column))
        .collect()
}

/// Preferred relations first, in configured order; everything else sorted.
fn order_relations(values: Vec<String>, preferred: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = preferred
        .iter()
        .filter(|p| values.contains(p))
        .cloned()
        .collect();
    let mut rest: Vec<String> = values
        .into_iter()
        .filter(|v| !preferred.contains(v))
        .collect();
    rest.sort();
    ordered.extend(rest);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(relation: Option<&str>, encoding: Option<&str>, lemma: Option<&str>) -> DependencyRow {
        DependencyRow {
            relation: relation.map(str::to_string),
            encoding: encoding.map(str::to_string),
            lemma: lemma.map(str::to_string),
            visible: true,
        }
    }

    #[test]
    fn a_fixed_triple_blocks_its_completion() {
        let fixed = vec![row(Some("obj"), Some("Acc + x"), Some("տուն"))];
        let probe = row(Some("obj"), Some("Acc + x"), None);
        let excluded = excluded_values(&probe, &fixed, FacetColumn::Lemma);
        assert!(excluded.contains("տուն"));
    }

    #[test]
    fn a_differing_context_excludes_nothing() {
        let fixed = vec![row(Some("obj"), Some("Acc + x"), Some("տուն"))];
        let probe = row(Some("nsubj"), Some("Acc + x"), None);
        assert!(excluded_values(&probe, &fixed, FacetColumn::Lemma).is_empty());
    }

    #[test]
    fn partial_own_context_excludes_nothing() {
        let fixed = vec![row(Some("obj"), Some("Acc + x"), Some("տուն"))];
        let probe = row(Some("obj"), None, None);
        assert!(excluded_values(&probe, &fixed, FacetColumn::Lemma).is_empty());
    }

    #[test]
    fn exclusion_also_guards_the_relation_facet() {
        let fixed = vec![row(Some("obj"), Some("Acc + x"), Some("տուն"))];
        let probe = row(None, Some("Acc + x"), Some("տուն"));
        let excluded = excluded_values(&probe, &fixed, FacetColumn::Relation);
        assert!(excluded.contains("obj"));
    }

    #[test]
    fn preferred_relations_come_first_then_lexical() {
        let preferred: Vec<String> = ["nsubj", "obj", "obl"].iter().map(|s| s.to_string()).collect();
        let values: Vec<String> = ["advcl", "obl", "nsubj", "acl"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            vec!["nsubj", "obl", "acl", "advcl"],
            order_relations(values, &preferred)
        );
    }
}
