//! End-to-end tests of the exploration engine against a small in-memory
//! corpus: two verbs sharing a script, one verb with two senses, sentences
//! spread over several source partitions, and argument homographs that make
//! the reverse script translation ambiguous.

use pretty_assertions::assert_eq;
use valcor::db::sqlite::SqliteStore;
use valcor::model::filter::FeatureCategory;
use valcor::{CorpusConfig, Explorer, ParamMap, Script, SessionCarry};

fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create_schema().unwrap();
    let conn = store.connection();

    let sentences = [
        ("00012", "նա ուտէ հաց", "na owtē hacʻ", "he eats bread"),
        ("GUM_doc_1", "բերէ", "berē", "he brings"),
        ("arm_001", "մարդ ուտէ հաց", "mard owtē hacʻ", "the man eats bread"),
        ("arm_002", "ուտէ հաց կրէ տառ", "owtē hacʻ krē taṙ", "he consumes bread, carries a letter"),
        ("arm_003", "ուտէ հաց հաց ջուր", "owtē hacʻ hacʻ ǰowr", "he eats two breads and water"),
    ];
    for (id, text, translit, translated) in sentences {
        conn.execute(
            "INSERT INTO sentences (sent_id, text, transliterated_text, translated_text)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, text, translit, translated],
        )
        .unwrap();
    }

    // (sent, token, lemma, translit, gloss, tense)
    let verbs = [
        ("00012", 3, "ուտել", "owtel", "eat", "Aor"),
        ("GUM_doc_1", 1, "բերել", "berel", "bring", "Pres"),
        ("arm_001", 2, "ուտել", "owtel", "eat", "Aor"),
        ("arm_002", 1, "ուտել", "owtel", "consume", "Pres"),
        ("arm_002", 5, "կրել", "krel", "carry", "Aor"),
        ("arm_003", 2, "ուտել", "owtel", "eat", "Pres"),
    ];
    for (sent, token, lemma, translit, gloss, tense) in verbs {
        conn.execute(
            "INSERT INTO verbs (sent_id, token_id, lemma, translit_verb, gloss, url, VerbForm, Tense)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'Fin', ?7)",
            rusqlite::params![sent, token, lemma, translit, gloss, format!("https://lexicon.example/{}", translit), tense],
        )
        .unwrap();
    }

    // (sent, head, token, rel, lemma, translit_lemma, case_value, translit_dep)
    let arguments = [
        ("00012", 3, 1, "obj", "հաց", "hacʻ", "Acc + հաց", "hacʻ"),
        ("arm_001", 2, 1, "nsubj", "մարդ", "mard", "Nom + մարդ", "mard"),
        ("arm_001", 2, 3, "obj", "հաց", "hacʻ", "Acc + հաց", "hacʻ"),
        ("arm_002", 1, 3, "obj", "հաց", "hacʻ", "Acc + հաց", "hacʻ"),
        // homographs in transliteration: two native lemmas share "taṙ"
        ("arm_002", 5, 6, "obl", "տառ", "taṙ", "Abl + տառ", "taṙ"),
        ("arm_002", 5, 7, "obl", "տաղ", "taṙ", "Abl + տաղ", "taṙ"),
        ("arm_003", 2, 3, "obj", "հաց", "hacʻ", "Acc + հաց", "hacʻ"),
        ("arm_003", 2, 5, "obj", "հաց", "hacʻ", "Acc + հաց", "hacʻ"),
        ("arm_003", 2, 4, "obj", "ջուր", "ǰowr", "Acc + ջուր", "ǰowr"),
    ];
    for (sent, head, token, rel, lemma, translit, case_value, dep) in arguments {
        conn.execute(
            "INSERT INTO arguments (sent_id, head_id, token_id, dep_rel, lemma, translit_lemma,
                                    case_value, translit_dep_lemma)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![sent, head, token, rel, lemma, translit, case_value, dep],
        )
        .unwrap();
    }

    // (sent, token, form, feat, gloss, head, rel, pos)
    let words: Vec<(&str, i64, &str, Option<&str>, Option<&str>, Option<i64>, &str, &str)> = vec![
        ("00012", 1, "հաց", Some("Case=Acc"), Some("bread"), Some(3), "obj", "NOUN"),
        ("00012", 2, "նա", Some("Case=Nom"), Some("he"), Some(3), "nsubj", "PRON"),
        ("00012", 3, "ուտէ", Some("Tense=Aor"), Some("eat"), None, "root", "VERB"),
        ("GUM_doc_1", 1, "բերէ", Some("Tense=Pres"), Some("bring"), None, "root", "VERB"),
        ("arm_001", 1, "մարդ", Some("Case=Nom"), Some("man"), Some(2), "nsubj", "NOUN"),
        ("arm_001", 2, "ուտէ", Some("Tense=Aor"), Some("eat"), None, "root", "VERB"),
        ("arm_001", 3, "հաց", Some("Case=Acc|Case=Acc"), Some("bread"), Some(2), "obj", "NOUN"),
        ("arm_001", 4, "՞", None, None, Some(3), "punct", "PUNCT"),
        ("arm_002", 1, "ուտէ", Some("Tense=Pres"), Some("consume"), None, "root", "VERB"),
        ("arm_002", 3, "հաց", Some("Case=Acc"), Some("bread"), Some(1), "obj", "NOUN"),
        ("arm_002", 5, "կրէ", Some("Tense=Aor"), Some("carry"), Some(1), "conj", "VERB"),
        ("arm_002", 6, "տառ", Some("Case=Abl"), Some("letter"), Some(5), "obl", "NOUN"),
        ("arm_002", 7, "տաղ", Some("Case=Abl"), Some("ode"), Some(5), "obl", "NOUN"),
        ("arm_003", 2, "ուտէ", Some("Tense=Pres"), Some("eat"), None, "root", "VERB"),
        ("arm_003", 3, "հաց", Some("Case=Acc"), Some("bread"), Some(2), "obj", "NOUN"),
        ("arm_003", 4, "ջուր", Some("Case=Acc"), Some("water"), Some(2), "obj", "NOUN"),
        ("arm_003", 5, "հաց", Some("Case=Acc"), Some("bread"), Some(2), "obj", "NOUN"),
    ];
    for (sent, token, form, feat, gloss, head, rel, pos) in words {
        conn.execute(
            "INSERT INTO words (sent_id, token_id, form, feat, gloss, head_id, dep_rel, pos)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![sent, token, form, feat, gloss, head, rel, pos],
        )
        .unwrap();
    }

    store
}

fn explorer() -> Explorer<SqliteStore> {
    Explorer::new(seeded_store(), CorpusConfig::default())
}

fn explore(explorer: &Explorer<SqliteStore>, script: Script, params: &ParamMap) -> valcor::Exploration {
    explorer
        .explore(params, script, &SessionCarry::default())
        .unwrap()
}

#[test]
fn selecting_a_lemma_unions_its_senses() {
    let explorer = explorer();
    let mut params = ParamMap::new();
    params.set("selected_verb", "ուտել");

    let lemma_only = explore(&explorer, Script::Native, &params);
    let mut senses: Vec<(String, Option<String>, u64)> = lemma_only
        .verbs
        .iter()
        .map(|v| (v.lemma.clone(), v.gloss.clone(), v.frequency))
        .collect();
    // The list orders by lemma; gloss order within a lemma is not defined.
    senses.sort();
    assert_eq!(
        vec![
            ("ուտել".to_string(), Some("consume".to_string()), 1),
            ("ուտել".to_string(), Some("eat".to_string()), 3),
        ],
        senses
    );
    assert_eq!(4, lemma_only.page.total_occurrences);
    assert_eq!(
        Some("https://lexicon.example/owtel".to_string()),
        lemma_only.selected_verb_url
    );

    params.set("selected_verb_gloss", "eat");
    let eat = explore(&explorer, Script::Native, &params);
    params.set("selected_verb_gloss", "consume");
    let consume = explore(&explorer, Script::Native, &params);

    // The two senses are disjoint and partition the lemma-only result.
    assert_eq!(3, eat.page.total_occurrences);
    assert_eq!(1, consume.page.total_occurrences);
    assert_eq!(
        lemma_only.page.total_occurrences,
        eat.page.total_occurrences + consume.page.total_occurrences
    );
}

#[test]
fn multiple_rows_need_pairwise_distinct_arguments() {
    let explorer = explorer();

    let mut one_row = ParamMap::new();
    one_row.set("syntactic_relation", "obj");
    let result = explore(&explorer, Script::Native, &one_row);
    assert_eq!(4, result.total_sentence_count);

    let mut two_rows = ParamMap::new();
    two_rows.set("syntactic_relation", "obj");
    two_rows.set("co_occurring_deprel_2", "obj");
    two_rows.set("dependency2_visible", "true");
    let result = explore(&explorer, Script::Native, &two_rows);
    // Only arm_003 has two distinct object tokens.
    assert_eq!(1, result.total_sentence_count);
}

#[test]
fn facet_options_cascade_and_exclude_fixed_combinations() {
    let explorer = explorer();

    let mut params = ParamMap::new();
    params.set("selected_verb", "ուտել");
    params.set("syntactic_relation", "obj");
    params.set("case_value", "Acc + հաց");
    params.set("case_dependant_lemma", "հաց");
    params.set("co_occurring_deprel_2", "obj");
    params.set("dependency2_visible", "true");

    let open = explore(&explorer, Script::Native, &params);
    // Without the encoding fixed on row 1, the second bread token keeps the
    // duplicate lemma reachable.
    assert!(open.row_options[1].lemmas.contains(&"հաց".to_string()));
    assert!(open.row_options[1].lemmas.contains(&"ջուր".to_string()));

    params.set("co_occurring_case_value_2", "Acc + հաց");
    let fixed = explore(&explorer, Script::Native, &params);
    // Completing (obj, Acc + հաց, հաց) again would repeat row 0 exactly.
    assert!(!fixed.row_options[1].lemmas.contains(&"հաց".to_string()));

    // Idempotence: resolving the same state twice yields the same options.
    let again = explore(&explorer, Script::Native, &params);
    assert_eq!(fixed.row_options, again.row_options);
    assert_eq!(fixed.next_row_available, again.next_row_available);
}

#[test]
fn next_row_probe_reveals_whether_more_options_exist() {
    let explorer = explorer();
    let mut params = ParamMap::new();
    params.set("selected_verb", "ուտել");
    params.set("selected_verb_gloss", "eat");
    let result = explore(&explorer, Script::Native, &params);

    assert!(result.next_row_available[0]);
    // The last row never has a successor.
    assert!(!result.next_row_available[4]);
}

#[test]
fn submitted_empty_sources_mean_zero_not_unfiltered() {
    let explorer = explorer();

    let mut empty = ParamMap::new();
    empty.set("source_checkbox_submitted", "1");
    let result = explore(&explorer, Script::Native, &empty);
    assert_eq!(0, result.total_verb_count);
    assert_eq!(0, result.total_sentence_count);

    let unfiltered = explore(&explorer, Script::Native, &ParamMap::new());
    assert_eq!(4, unfiltered.total_verb_count);
}

#[test]
fn source_partitions_select_by_sentence_identifier() {
    let explorer = explorer();

    let mut greek = ParamMap::new();
    greek.set("source_checkbox_submitted", "1");
    greek.set("selected_source", "Greek");
    let result = explore(&explorer, Script::Native, &greek);
    assert_eq!(1, result.total_verb_count);
    assert_eq!(1, result.verbs[0].frequency);

    let mut residual = ParamMap::new();
    residual.set("source_checkbox_submitted", "1");
    residual.set("selected_source", "Armenian");
    let result = explore(&explorer, Script::Native, &residual);
    // arm_* sentences only: both senses of ուտել plus կրել.
    assert_eq!(3, result.total_verb_count);
    assert_eq!(4, result.total_occurrence_count);

    let mut both = ParamMap::new();
    both.set("source_checkbox_submitted", "1");
    both.append("selected_source", "Greek");
    both.append("selected_source", "English");
    let result = explore(&explorer, Script::Native, &both);
    assert_eq!(2, result.total_verb_count);
}

#[test]
fn occurrence_windows_page_through_sentences() {
    let explorer = Explorer::new(
        seeded_store(),
        CorpusConfig {
            window_size: 2,
            ..CorpusConfig::default()
        },
    );

    let mut params = ParamMap::new();
    params.set("selected_verb", "ուտել");
    params.set("selected_verb_gloss", "eat");

    let page1 = explore(&explorer, Script::Native, &params);
    assert_eq!(3, page1.page.total_occurrences);
    assert_eq!(3, page1.page.total_sentences);
    let ids: Vec<&str> = page1.sentences.iter().map(|s| s.sent_id.as_str()).collect();
    assert_eq!(vec!["00012", "arm_001"], ids);
    assert_eq!(1, page1.page.occurrence_start);
    assert_eq!(2, page1.page.occurrence_end);
    assert!(!page1.page.has_prev);
    assert!(page1.page.has_next);

    params.set("page", "2");
    let page2 = explore(&explorer, Script::Native, &params);
    let ids: Vec<&str> = page2.sentences.iter().map(|s| s.sent_id.as_str()).collect();
    assert_eq!(vec!["arm_003"], ids);
    assert_eq!(3, page2.page.occurrence_start);
    assert_eq!(3, page2.page.occurrence_end);
    assert!(page2.page.has_prev);
    assert!(!page2.page.has_next);

    params.set("page", "40");
    let far = explore(&explorer, Script::Native, &params);
    assert!(far.sentences.is_empty());
    assert_eq!(0, far.page.occurrence_start);
    assert!(!far.page.has_next);
}

#[test]
fn assembled_sentences_carry_roles_merges_and_annotations() {
    let explorer = explorer();
    let mut params = ParamMap::new();
    params.set("selected_verb", "ուտել");
    params.set("selected_verb_gloss", "eat");

    let result = explore(&explorer, Script::Native, &params);
    let sentence = result
        .sentences
        .iter()
        .find(|s| s.sent_id == "arm_001")
        .unwrap();

    assert_eq!(Some("մարդ ուտէ հաց"), sentence.text.as_deref());

    let verb = sentence.tokens.iter().find(|t| t.token_id == 2).unwrap();
    assert!(verb.is_selected_verb);
    let subject = sentence.tokens.iter().find(|t| t.token_id == 1).unwrap();
    assert!(subject.is_argument);
    // The duplicated feature part was deduplicated on the way in.
    let object = sentence.tokens.iter().find(|t| t.token_id == 3).unwrap();
    assert_eq!(Some("Case=Acc"), object.feat.as_deref());

    // The question mark nests after the object's last vowel.
    let forms: Vec<&str> = sentence.display.iter().map(|t| t.form.as_str()).collect();
    assert_eq!(vec!["մարդ", "ուտէ", "հա՞ց"], forms);
    let merged = &sentence.display[2];
    assert_eq!("3_4", merged.token_ids);
    assert!(merged.is_argument);

    assert!(sentence
        .relations
        .iter()
        .any(|r| r.from == 2 && r.to == 3 && r.relation == "obj"));

    // Standoff export over the unmerged tokens.
    assert_eq!("մարդ ուտէ հաց ՞", sentence.annotation.text);
    assert_eq!("SelectedVerb_VERB", sentence.annotation.entities[1].kind);
    assert!(sentence
        .annotation
        .attributes
        .iter()
        .any(|a| a.name == "Case" && a.value == "Nom"));
    assert_eq!(2, sentence.annotation.relations.len());
}

#[test]
fn transliterated_view_mirrors_the_native_one() {
    let explorer = explorer();
    let mut params = ParamMap::new();
    params.set("selected_verb", "owtel");
    params.set("selected_verb_gloss", "eat");

    let result = explore(&explorer, Script::Transliterated, &params);
    assert_eq!(3, result.page.total_occurrences);
    let sentence = result
        .sentences
        .iter()
        .find(|s| s.sent_id == "arm_001")
        .unwrap();
    // The transliterated profile selects the transliterated sentence text.
    assert_eq!(Some("mard owtē hacʻ"), sentence.text.as_deref());
}

#[test]
fn initials_fold_into_canonical_alphabet_order() {
    let explorer = explorer();

    let native = explore(&explorer, Script::Native, &ParamMap::new());
    assert_eq!(vec!["բ", "կ", "ո"], native.initials);

    let translit = explore(&explorer, Script::Transliterated, &ParamMap::new());
    assert_eq!(vec!["b", "k", "o"], translit.initials);
}

#[test]
fn feature_values_shrink_under_constraints() {
    let explorer = explorer();

    let open = explore(&explorer, Script::Native, &ParamMap::new());
    let tenses = &open
        .feature_values
        .iter()
        .find(|(c, _)| *c == FeatureCategory::Tense)
        .unwrap()
        .1;
    assert_eq!(&vec!["Aor".to_string(), "Pres".to_string()], tenses);

    let mut params = ParamMap::new();
    params.set("selected_verb", "կրել");
    let constrained = explore(&explorer, Script::Native, &params);
    let tenses = &constrained
        .feature_values
        .iter()
        .find(|(c, _)| *c == FeatureCategory::Tense)
        .unwrap()
        .1;
    assert_eq!(&vec!["Aor".to_string()], tenses);
}

#[test]
fn switch_query_round_trips_or_drops_fields() {
    let explorer = explorer();

    let mut native = ParamMap::new();
    native.set("selected_verb", "ուտել");
    native.set("selected_verb_gloss", "eat");
    native.set("syntactic_relation", "obj");
    native.set("case_value", "Acc + հաց");
    native.set("case_dependant_lemma", "հաց");
    native.set("page", "3");

    let result = explore(&explorer, Script::Native, &native);
    let forward = ParamMap::parse(&result.switch_query);
    assert_eq!(Some("owtel"), forward.get("selected_verb"));
    assert_eq!(Some("eat"), forward.get("selected_verb_gloss"));
    assert_eq!(Some("obj"), forward.get("syntactic_relation"));
    assert_eq!(Some("hacʻ"), forward.get("translit_lemma"));
    assert_eq!(Some("hacʻ"), forward.get("case_value"));
    assert_eq!(Some("1"), forward.get("page"));
    assert!(!forward.contains_key("case_dependant_lemma"));

    // And back: every field either reproduces the original or is dropped.
    let result = explore(&explorer, Script::Transliterated, &forward);
    let back = ParamMap::parse(&result.switch_query);
    assert_eq!(Some("ուտել"), back.get("selected_verb"));
    assert_eq!(Some("eat"), back.get("selected_verb_gloss"));
    assert_eq!(Some("հաց"), back.get("case_dependant_lemma"));
    assert_eq!(Some("Acc + հաց"), back.get("case_value"));
    assert_eq!(Some("1"), back.get("page"));
}

#[test]
fn ambiguous_reverse_translations_are_dropped_not_guessed() {
    let explorer = explorer();

    let mut params = ParamMap::new();
    params.set("selected_verb", "krel");
    params.set("syntactic_relation", "obl");
    params.set("translit_lemma", "taṙ");
    params.set("case_value", "taṙ");

    let result = explore(&explorer, Script::Transliterated, &params);
    let switched = ParamMap::parse(&result.switch_query);

    // The verb resolves uniquely…
    assert_eq!(Some("կրել"), switched.get("selected_verb"));
    // …but "taṙ" covers two native lemmas and two native encodings.
    assert!(!switched.contains_key("case_dependant_lemma"));
    assert!(!switched.contains_key("case_value"));
    assert_eq!(Some("obl"), switched.get("syntactic_relation"));
}

#[test]
fn unmapped_initial_cursor_is_dropped_on_switch() {
    let explorer = explorer();

    let mut params = ParamMap::new();
    params.set("initial", "բ");
    let result = explore(&explorer, Script::Native, &params);
    let switched = ParamMap::parse(&result.switch_query);
    assert_eq!(Some("b"), switched.get("initial"));

    let mut params = ParamMap::new();
    params.set("initial", "Q");
    let result = explore(&explorer, Script::Native, &params);
    let switched = ParamMap::parse(&result.switch_query);
    assert!(!switched.contains_key("initial"));
}

#[test]
fn alphabetical_cursor_narrows_the_verb_list() {
    let explorer = explorer();
    let mut params = ParamMap::new();
    params.set("initial", "ո");
    let result = explore(&explorer, Script::Native, &params);
    let lemmas: Vec<&str> = result.verbs.iter().map(|v| v.lemma.as_str()).collect();
    assert_eq!(vec!["ուտել", "ուտել"], lemmas);

    // Sorting by frequency descending puts the bigger sense first.
    params.set("sort", "frequency");
    params.set("order", "desc");
    let result = explore(&explorer, Script::Native, &params);
    assert_eq!(3, result.verbs[0].frequency);
}
