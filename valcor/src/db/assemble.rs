//! Sentence assembly for one result page.
//!
//! Fetching is batched: one query for the page's sentence headers, one for
//! the matched verb occurrences, one for all tokens and one for all argument
//! edges across the whole page. Assembly then happens in memory: role flags,
//! the relation graph with its fallback anchoring, the orthography-specific
//! display merge and the standoff annotation export.

use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::db::compose::{self, QueryContext};
use crate::db::{CorpusStore, Row};
use crate::errors::Result;
use crate::model::script::MergeRules;
use crate::types::{
    AnnotationAttribute, AnnotationDoc, AnnotationEntity, AnnotationRelation, DisplayToken,
    RelationEdge, SentenceView, TokenNode,
};

struct ArgEdge {
    head_id: i64,
    token_id: Option<i64>,
    dep_rel: Option<String>,
    cdep_token_id: Option<i64>,
    second_cdep_token_id: Option<i64>,
    fdep_token_id: Option<i64>,
}

/// Assemble the sentences of one page, in sentence order.
pub fn assemble_page(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
    page_ids: &[String],
) -> Result<Vec<SentenceView>> {
    if page_ids.is_empty() || ctx.filter.selected_verb.is_none() {
        return Ok(Vec::new());
    }

    let headers = store.rows(&ctx.sentence_headers(page_ids)?)?;
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let mut verb_hits: FxHashMap<String, FxHashSet<i64>> = FxHashMap::default();
    for row in store.rows(&ctx.verb_hits(page_ids)?)? {
        let token_id = row.require_integer(0)?;
        let sent_id = row.require_text(1)?.to_string();
        verb_hits.entry(sent_id).or_default().insert(token_id);
    }

    let mut tokens_by_sentence: FxHashMap<String, Vec<TokenNode>> = FxHashMap::default();
    for row in store.rows(&compose::tokens_for(page_ids)?)? {
        let sent_id = row.require_text(0)?.to_string();
        tokens_by_sentence
            .entry(sent_id)
            .or_default()
            .push(token_from_row(&row)?);
    }

    let mut edges_by_sentence: FxHashMap<String, Vec<ArgEdge>> = FxHashMap::default();
    for row in store.rows(&compose::argument_edges_for(page_ids)?)? {
        let sent_id = row.require_text(0)?.to_string();
        edges_by_sentence.entry(sent_id).or_default().push(ArgEdge {
            head_id: row.require_integer(1)?,
            token_id: row.integer(2),
            dep_rel: row.text(3).map(str::to_string),
            cdep_token_id: row.integer(4),
            second_cdep_token_id: row.integer(5),
            fdep_token_id: row.integer(6),
        });
    }

    let mut sentences = Vec::new();
    for header in &headers {
        let sent_id = header.require_text(0)?.to_string();
        let mut tokens = match tokens_by_sentence.remove(&sent_id) {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => continue,
        };
        let selected = match verb_hits.get(&sent_id) {
            Some(selected) if !selected.is_empty() => selected,
            _ => continue,
        };

        let present: FxHashSet<i64> = tokens.iter().map(|t| t.token_id).collect();
        for token in tokens.iter_mut() {
            if selected.contains(&token.token_id) {
                token.is_selected_verb = true;
            }
        }

        let mut relations = Vec::new();
        for edge in edges_by_sentence.get(&sent_id).map(Vec::as_slice).unwrap_or(&[]) {
            if !selected.contains(&edge.head_id) {
                continue;
            }
            apply_edge(edge, &mut tokens, &present, &mut relations);
        }

        let display = merge_tokens(&tokens, &ctx.profile.merge);
        let annotation = annotation_doc(&tokens, &relations);

        sentences.push(SentenceView {
            sent_id,
            text: header.text(1).map(str::to_string),
            translated_text: header.text(2).map(str::to_string),
            display,
            tokens,
            relations,
            annotation,
        });
    }
    Ok(sentences)
}

fn token_from_row(row: &Row) -> Result<TokenNode> {
    Ok(TokenNode {
        token_id: row.require_integer(1)?,
        form: row.text(2).unwrap_or_default().to_string(),
        feat: row.text(3).map(dedupe_feats),
        gloss: row.text(4).map(str::to_string),
        head_id: row.integer(5),
        relation: row.text(6).map(str::to_string),
        pos: row.text(7).map(str::to_string),
        is_selected_verb: false,
        is_argument: false,
        is_case_dependent: false,
        is_fixed_dependent: false,
    })
}

/// Morphological annotations occasionally repeat a `Key=Value` part; keep
/// the first occurrence of each.
fn dedupe_feats(feat: &str) -> String {
    let mut seen = FxHashSet::default();
    let parts: Vec<&str> = feat.split('|').filter(|p| seen.insert(*p)).collect();
    parts.join("|")
}

/// Mark the roles of one argument edge and emit its relation records. The
/// fixed dependent anchors to the deepest available dependent: second
/// case-dependent, then case-dependent, then the argument, then the head.
fn apply_edge(
    edge: &ArgEdge,
    tokens: &mut [TokenNode],
    present: &FxHashSet<i64>,
    relations: &mut Vec<RelationEdge>,
) {
    let mut mark = |id: i64, role: fn(&mut TokenNode)| {
        if let Some(token) = tokens.iter_mut().find(|t| t.token_id == id) {
            role(token);
        }
    };

    let argument_anchor = edge.token_id.filter(|id| present.contains(id));
    if let Some(argument) = argument_anchor {
        mark(argument, |t| t.is_argument = true);
        relations.push(RelationEdge {
            from: edge.head_id,
            to: argument,
            relation: edge
                .dep_rel
                .clone()
                .unwrap_or_else(|| "argument".to_string()),
        });
    }
    let case_anchor = edge.token_id.unwrap_or(edge.head_id);

    for case_dependent in [edge.cdep_token_id, edge.second_cdep_token_id].into_iter().flatten() {
        if present.contains(&case_dependent) {
            mark(case_dependent, |t| t.is_case_dependent = true);
            relations.push(RelationEdge {
                from: case_anchor,
                to: case_dependent,
                relation: "case_dependency".to_string(),
            });
        }
    }

    if let Some(fixed) = edge.fdep_token_id {
        if present.contains(&fixed) {
            mark(fixed, |t| t.is_fixed_dependent = true);
            let from = edge
                .second_cdep_token_id
                .or(edge.cdep_token_id)
                .or(edge.token_id)
                .unwrap_or(edge.head_id);
            relations.push(RelationEdge {
                from,
                to: fixed,
                relation: "fixed_dependency".to_string(),
            });
        }
    }
}

struct MergeAccum {
    form: String,
    ids: Vec<i64>,
    pieces: Vec<(Option<String>, Option<String>)>,
    pos: Option<String>,
    is_selected_verb: bool,
    is_argument: bool,
    is_case_dependent: bool,
    is_fixed_dependent: bool,
}

impl MergeAccum {
    fn from_token(token: &TokenNode) -> MergeAccum {
        MergeAccum {
            form: token.form.clone(),
            ids: vec![token.token_id],
            pieces: vec![(token.gloss.clone(), token.feat.clone())],
            pos: token.pos.clone(),
            is_selected_verb: token.is_selected_verb,
            is_argument: token.is_argument,
            is_case_dependent: token.is_case_dependent,
            is_fixed_dependent: token.is_fixed_dependent,
        }
    }

    fn absorb_flags(&mut self, other: &MergeAccum) {
        self.is_selected_verb |= other.is_selected_verb;
        self.is_argument |= other.is_argument;
        self.is_case_dependent |= other.is_case_dependent;
        self.is_fixed_dependent |= other.is_fixed_dependent;
    }

    fn into_display(self) -> DisplayToken {
        let tooltip = tooltip_from_pieces(&self.pieces);
        DisplayToken {
            token_ids: self.ids.iter().map(|id| id.to_string()).join("_"),
            form: self.form,
            tooltip,
            pos: self.pos,
            is_selected_verb: self.is_selected_verb,
            is_argument: self.is_argument,
            is_case_dependent: self.is_case_dependent,
            is_fixed_dependent: self.is_fixed_dependent,
        }
    }
}

/// Per-piece `gloss.feat` fragments joined by `=` across merged pieces.
fn tooltip_from_pieces(pieces: &[(Option<String>, Option<String>)]) -> String {
    pieces
        .iter()
        .filter_map(|(gloss, feat)| match (gloss.as_deref(), feat.as_deref()) {
            (Some(g), Some(f)) => Some(format!("{}.{}", g, f)),
            (Some(g), None) => Some(g.to_string()),
            (None, Some(f)) => Some(f.to_string()),
            (None, None) => None,
        })
        .join("=")
}

/// The orthography-specific display merge.
pub fn merge_tokens(tokens: &[TokenNode], rules: &MergeRules) -> Vec<DisplayToken> {
    let mut merged: Vec<MergeAccum> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let current = &tokens[i];
        i += 1;

        // Intonation marks nest inside the previous display token, right
        // after its last vowel.
        if rules.inserts_after_vowel(&current.form) {
            if let Some(last) = merged.last_mut() {
                let at = vowel_insert_position(&last.form, rules);
                last.form.insert_str(at, &current.form);
                last.ids.push(current.token_id);
                last.pieces.push((current.gloss.clone(), current.feat.clone()));
                last.is_selected_verb |= current.is_selected_verb;
                last.is_argument |= current.is_argument;
                last.is_case_dependent |= current.is_case_dependent;
                last.is_fixed_dependent |= current.is_fixed_dependent;
                continue;
            }
        }

        let mut accum = MergeAccum::from_token(current);

        while rules.attaches_to_prev(&accum.form) {
            let previous = match merged.pop() {
                Some(previous) => previous,
                None => break,
            };
            accum.form = format!("{}{}", previous.form, accum.form);
            let mut ids = previous.ids.clone();
            ids.extend(accum.ids.iter().copied());
            accum.ids = ids;
            let mut pieces = previous.pieces.clone();
            pieces.extend(accum.pieces.iter().cloned());
            accum.pieces = pieces;
            accum.absorb_flags(&previous);
            accum.pos = accum.pos.or(previous.pos);
        }

        // Onset particles chain onto following tokens until a carrier token
        // (one that is not itself in the set) has been absorbed.
        let mut attach_tail = rules.attaches_to_next(&current.form);
        while attach_tail && i < tokens.len() {
            let next = &tokens[i];
            i += 1;
            accum.form.push_str(&next.form);
            accum.ids.push(next.token_id);
            accum.pieces.push((next.gloss.clone(), next.feat.clone()));
            accum.is_selected_verb |= next.is_selected_verb;
            accum.is_argument |= next.is_argument;
            accum.is_case_dependent |= next.is_case_dependent;
            accum.is_fixed_dependent |= next.is_fixed_dependent;
            accum.pos = accum.pos.or(next.pos.clone());
            attach_tail = rules.attaches_to_next(&next.form);
        }

        merged.push(accum);
    }

    merged.into_iter().map(MergeAccum::into_display).collect()
}

/// Byte position right after the last vowel of `form`, or its end when no
/// vowel occurs.
fn vowel_insert_position(form: &str, rules: &MergeRules) -> usize {
    form.char_indices()
        .filter(|(_, c)| rules.is_vowel(*c))
        .last()
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(form.len())
}

/// Standoff export over the unmerged tokens: linear character offsets into
/// the space-joined surface text, one entity per token, at most one `Case`
/// attribute per token, and one record per relation edge whose endpoints
/// survived token filtering.
pub fn annotation_doc(tokens: &[TokenNode], relations: &[RelationEdge]) -> AnnotationDoc {
    let mut text = String::new();
    let mut offsets = Vec::with_capacity(tokens.len());
    let mut cursor = 0usize;
    for token in tokens {
        let start = cursor;
        cursor += token.form.chars().count();
        offsets.push((start, cursor));
        text.push_str(&token.form);
        text.push(' ');
        cursor += 1;
    }
    if text.ends_with(' ') {
        text.pop();
    }

    let mut entities = Vec::with_capacity(tokens.len());
    let mut attributes = Vec::new();
    let mut entity_ids: FxHashMap<i64, String> = FxHashMap::default();

    for (idx, (token, (start, end))) in tokens.iter().zip(offsets).enumerate() {
        let id = format!("T{}", idx + 1);
        entity_ids.insert(token.token_id, id.clone());

        let pos = token.pos.as_deref().unwrap_or("Token");
        let kind = if token.is_selected_verb {
            format!("SelectedVerb_{}", pos)
        } else {
            pos.to_string()
        };
        entities.push(AnnotationEntity {
            id: id.clone(),
            kind,
            start,
            end,
        });

        if let Some(feat) = token.feat.as_deref() {
            if let Some(value) = feat
                .split('|')
                .find_map(|part| part.strip_prefix("Case="))
            {
                attributes.push(AnnotationAttribute {
                    id: format!("A{}", idx + 1),
                    name: "Case".to_string(),
                    entity: id.clone(),
                    value: value.to_string(),
                });
            }
        }
    }

    let mut exported = Vec::new();
    for (idx, relation) in relations.iter().enumerate() {
        let (governor, dependent) = match (
            entity_ids.get(&relation.from),
            entity_ids.get(&relation.to),
        ) {
            (Some(g), Some(d)) => (g.clone(), d.clone()),
            // Endpoints filtered out of the token map are skipped, not
            // errors.
            _ => continue,
        };
        exported.push(AnnotationRelation {
            id: format!("R{}", idx + 1),
            relation: relation.relation.clone(),
            governor,
            dependent,
        });
    }

    AnnotationDoc {
        text,
        entities,
        attributes,
        relations: exported,
    }
}
