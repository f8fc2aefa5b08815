//! Building the alternate-script entry-point query string.
//!
//! Filter intent is preserved, never guessed: forward translation
//! (native to transliterated) of character-level fields is a pure greedy
//! table walk. The reverse direction is lossy, since several native forms
//! can share one transliteration, and resolves through store lookups
//! scoped to the same sense and dependency-row context. A lookup that does
//! not yield exactly one candidate drops the field. The output always
//! resets pagination, since occurrence windows are not script-invariant.

use valcor_core::sql::{Params, Pred, SelectQuery};

use crate::db::compose::QueryContext;
use crate::db::{text_column, CorpusStore};
use crate::errors::Result;
use crate::model::filter::{Script, MAX_DEPENDENCY_ROWS};
use crate::model::params::ParamMap;
use crate::model::script::{profile, ScriptProfile};

/// Translate the current request into the other script's query string.
pub fn switch_query(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
    params: &ParamMap,
) -> Result<String> {
    let source_script = ctx.filter.script;
    let target_script = source_script.other();
    let source = ctx.profile;
    let target = profile(target_script);

    let mut qs = params.clone();

    // The sense survives the switch even when it only lives in the session.
    if let Some(gloss) = ctx.filter.selected_gloss.as_deref() {
        qs.set("selected_verb_gloss", gloss);
    }
    if !qs.get_all("selected_source").is_empty() {
        qs.set("source_checkbox_submitted", "1");
    }

    // The two entry points name their script-side fields differently.
    qs.rename(source_script.search_key(), target_script.search_key());
    qs.rename(
        &source_script.row_lemma_key(0),
        &target_script.row_lemma_key(0),
    );

    translate_initial(ctx, source, &mut qs);
    translate_row_lemmas(ctx, store, source, target, target_script, &mut qs)?;
    translate_row_encodings(ctx, store, params, source, target, target_script, &mut qs)?;
    translate_selected_verb(ctx, store, source, target, &mut qs)?;

    qs.set("page", "1");
    Ok(qs.encode())
}

/// The alphabetical cursor maps through the static orthography table; an
/// unmapped cursor is dropped, not left blank, so a stale value cannot leak
/// across scripts.
fn translate_initial(ctx: &QueryContext, source: &ScriptProfile, qs: &mut ParamMap) {
    match ctx.filter.initial.as_deref() {
        Some(initial) => match source.initial_to_other_script(initial) {
            Some(mapped) => qs.set("initial", mapped),
            None => qs.remove("initial"),
        },
        None => {
            qs.remove("initial");
            qs.remove("reset");
        }
    }
}

fn translate_row_lemmas(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
    source: &ScriptProfile,
    target: &ScriptProfile,
    target_script: Script,
    qs: &mut ParamMap,
) -> Result<()> {
    for idx in 0..MAX_DEPENDENCY_ROWS {
        let key = target_script.row_lemma_key(idx);
        let value = match qs.get_non_empty(&key) {
            Some(v) => v.to_string(),
            None => continue,
        };
        if ctx.filter.script == Script::Native {
            // Forward direction is a pure function of the orthography.
            qs.set(&key, &source.to_other_script.apply(&value));
        } else {
            let candidates = lemma_candidates(ctx, store, source, target, &value)?;
            match single(candidates) {
                Some(native) => qs.set(&key, &native),
                None => qs.remove(&key),
            }
        }
    }
    Ok(())
}

fn translate_row_encodings(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
    original: &ParamMap,
    source: &ScriptProfile,
    target: &ScriptProfile,
    target_script: Script,
    qs: &mut ParamMap,
) -> Result<()> {
    for idx in 0..MAX_DEPENDENCY_ROWS {
        let key = target_script.row_encoding_key(idx);
        let value = match qs.get_non_empty(&key) {
            Some(v) => v.trim().to_string(),
            None => {
                qs.remove(&key);
                continue;
            }
        };
        // Cleared up front: a stale source-script value must never reach the
        // other entry point.
        qs.remove(&key);
        if value.is_empty() {
            continue;
        }

        if ctx.filter.script == Script::Native {
            // Only the remainder of `label + remainder` is script-bound.
            let remainder = ScriptProfile::encoding_remainder(&value);
            qs.set(&key, &source.to_other_script.apply(remainder));
        } else {
            let row_relation = original.get_non_empty(&ctx.filter.script.row_relation_key(idx));
            let row_lemma = original.get_non_empty(&ctx.filter.script.row_lemma_key(idx));
            let candidates =
                encoding_candidates(ctx, store, source, target, &value, row_relation, row_lemma)?;
            if let Some(native) = single(candidates) {
                qs.set(&key, &native);
            }
        }
    }
    Ok(())
}

fn translate_selected_verb(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
    source: &ScriptProfile,
    target: &ScriptProfile,
    qs: &mut ParamMap,
) -> Result<()> {
    let lemma = match ctx.filter.selected_verb.as_deref() {
        Some(lemma) => lemma,
        None => {
            qs.remove("selected_verb");
            qs.remove("selected_verb_gloss");
            return Ok(());
        }
    };

    let mut params = Params::new();
    let mut query = SelectQuery::from_table("verbs v")
        .column(&format!("v.{}", target.verb_lemma_col))
        .filter(Pred::eq(
            &format!("v.{}", source.verb_lemma_col),
            lemma,
            &mut params,
        ));
    if let Some(gloss) = ctx.filter.selected_gloss.as_deref() {
        query = query.filter(Pred::eq("v.gloss", gloss, &mut params));
    }
    let rows = store.rows(&query.limit(1).render(params))?;

    match rows.first().and_then(|r| r.text(0)) {
        Some(translated) => qs.set("selected_verb", translated),
        None => {
            // An unresolvable verb drops the sense with it.
            qs.remove("selected_verb");
            qs.remove("selected_verb_gloss");
        }
    }
    Ok(())
}

/// Target-script lemmas sharing the given source-script argument lemma,
/// scoped to the selected sense when one is active.
fn lemma_candidates(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
    source: &ScriptProfile,
    target: &ScriptProfile,
    value: &str,
) -> Result<Vec<String>> {
    let mut params = Params::new();
    let mut query = SelectQuery::from_table("arguments a")
        .column(&format!("DISTINCT a.{}", target.arg_lemma_col))
        .filter(Pred::eq(
            &format!("a.{}", source.arg_lemma_col),
            value,
            &mut params,
        ));
    query = sense_scope(ctx, source, query, &mut params);
    Ok(text_column(&store.rows(&query.render(params))?))
}

/// Target-script encodings reachable from one source-script encoding value,
/// scoped by the row's own relation and lemma context plus the sense.
fn encoding_candidates(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
    source: &ScriptProfile,
    target: &ScriptProfile,
    value: &str,
    row_relation: Option<&str>,
    row_lemma: Option<&str>,
) -> Result<Vec<String>> {
    let mut params = Params::new();
    let mut query = SelectQuery::from_table("arguments a")
        .column(&format!("DISTINCT a.{}", target.encoding_col))
        .filter(Pred::eq(
            &format!("a.{}", source.encoding_col),
            value,
            &mut params,
        ));
    if let Some(relation) = row_relation {
        query = query.filter(Pred::eq("a.dep_rel", relation, &mut params));
    }
    if let Some(lemma) = row_lemma {
        query = query.filter(Pred::eq(
            &format!("a.{}", source.arg_lemma_col),
            lemma,
            &mut params,
        ));
    }
    query = sense_scope(ctx, source, query, &mut params);
    Ok(text_column(&store.rows(&query.render(params))?))
}

fn sense_scope(
    ctx: &QueryContext,
    source: &ScriptProfile,
    query: SelectQuery,
    params: &mut Params,
) -> SelectQuery {
    let (lemma, gloss) = match ctx.filter.sense() {
        Some(sense) => sense,
        None => return query,
    };
    let mut query = query
        .join("JOIN verbs vv ON vv.sent_id = a.sent_id AND vv.token_id = a.head_id")
        .filter(Pred::eq(
            &format!("vv.{}", source.verb_lemma_col),
            lemma,
            params,
        ));
    if let Some(gloss) = gloss {
        query = query.filter(Pred::eq("vv.gloss", gloss, params));
    }
    query
}

fn single(mut candidates: Vec<String>) -> Option<String> {
    candidates.sort();
    candidates.dedup();
    if candidates.len() == 1 {
        candidates.pop()
    } else {
        None
    }
}
