//! Script profiles: everything that differs between the native-script and
//! the transliterated view of the corpus.
//!
//! The two views used to be near-duplicate code paths; they are unified here
//! into one engine parameterized by a profile carrying the orthography
//! tables, the column selection, the search collation mode and the
//! display-level token merge rules. The profile data is Classical Armenian;
//! the machinery is script-agnostic.

use valcor_core::script::{InitialIndex, Transcription};

use crate::model::filter::Script;

/// Surface tokens that fuse with a neighbour for display.
#[derive(Debug, Clone, Copy)]
pub struct MergeRules {
    /// Clitics and punctuation that concatenate onto the preceding merged
    /// token.
    pub attach_to_prev: &'static [&'static str],
    /// Onset particles that concatenate onto the following token, chained
    /// while the following token is itself in this set.
    pub attach_to_next: &'static [&'static str],
    /// Intonation marks inserted directly after the last vowel of the
    /// preceding merged token (appended when it has no vowel).
    pub insert_after_vowel: &'static [&'static str],
    pub vowels: &'static [char],
}

impl MergeRules {
    pub fn attaches_to_prev(&self, form: &str) -> bool {
        self.attach_to_prev.contains(&form)
    }

    pub fn attaches_to_next(&self, form: &str) -> bool {
        self.attach_to_next.contains(&form)
    }

    pub fn inserts_after_vowel(&self, form: &str) -> bool {
        self.insert_after_vowel.contains(&form)
    }

    pub fn is_vowel(&self, c: char) -> bool {
        self.vowels.contains(&c)
    }
}

/// All script-dependent behavior of the engine.
pub struct ScriptProfile {
    pub script: Script,
    /// Column of the verbs table holding the lemma in this script.
    pub verb_lemma_col: &'static str,
    /// Column of the arguments table holding the dependent lemma.
    pub arg_lemma_col: &'static str,
    /// Column of the arguments table holding the encoding facet. In the
    /// native script this is the composite `label + remainder` case value;
    /// in the transliteration it is the bare transliterated dependent.
    pub encoding_col: &'static str,
    /// Column of the sentences table holding the display text.
    pub sentence_text_col: &'static str,
    /// Whether the script-side search field compares case-folded.
    pub fold_search_case: bool,
    /// Latin keyboard input normalization for this script's entry fields.
    pub input_normalization: Transcription,
    /// Character-level transcription into the other script.
    pub to_other_script: Transcription,
    pub initials: InitialIndex,
    pub merge: MergeRules,
}

impl ScriptProfile {
    /// Translate an alphabetical-index cursor into the other script, if the
    /// static table maps it.
    pub fn initial_to_other_script(&self, initial: &str) -> Option<&str> {
        self.to_other_script.lookup(initial)
    }

    /// Forward-translate an encoding value: only the remainder after the
    /// last `+` is script-translatable, the label is invariant. A value
    /// without a label translates as a whole.
    pub fn encoding_remainder(value: &str) -> &str {
        match value.rsplit_once('+') {
            Some((_, remainder)) => remainder.trim(),
            None => value.trim(),
        }
    }
}

/// Bidirectional transliteration table. Keys are the transliteration,
/// values the native script; digraphs before their prefixes is handled by
/// the greedy table itself.
const TRANSLIT_TO_NATIVE: &[(&str, &str)] = &[
    ("a", "ա"),
    ("b", "բ"),
    ("g", "գ"),
    ("d", "դ"),
    ("e", "ե"),
    ("z", "զ"),
    ("ē", "է"),
    ("ǝ", "ը"),
    ("tʻ", "թ"),
    ("ž", "ժ"),
    ("i", "ի"),
    ("l", "լ"),
    ("x", "խ"),
    ("c", "ծ"),
    ("k", "կ"),
    ("h", "հ"),
    ("j", "ձ"),
    ("ł", "ղ"),
    ("č", "ճ"),
    ("m", "մ"),
    ("y", "յ"),
    ("n", "ն"),
    ("š", "շ"),
    ("o", "ո"),
    ("čʻ", "չ"),
    ("p", "պ"),
    ("ǰ", "ջ"),
    ("ṙ", "ռ"),
    ("s", "ս"),
    ("v", "վ"),
    ("t", "տ"),
    ("r", "ր"),
    ("cʻ", "ց"),
    ("w", "ւ"),
    ("pʻ", "փ"),
    ("kʻ", "ք"),
    ("f", "ֆ"),
    ("aw", "աւ"),
];

/// ASCII input normalization for the native-script entry fields.
const LATIN_TO_NATIVE: &[(&str, &str)] = &[
    ("e=", "է"),
    ("e'", "ը"),
    ("t'", "թ"),
    ("z=", "ժ"),
    ("l=", "ղ"),
    ("c=", "ճ"),
    ("s=", "շ"),
    ("c='", "չ"),
    ("j=", "ջ"),
    ("r=", "ռ"),
    ("c'", "ց"),
    ("p'", "փ"),
    ("k'", "ք"),
    ("aw", "աւ"),
    ("a", "ա"),
    ("b", "բ"),
    ("g", "գ"),
    ("d", "դ"),
    ("e", "ե"),
    ("z", "զ"),
    ("i", "ի"),
    ("l", "լ"),
    ("x", "խ"),
    ("c", "ծ"),
    ("k", "կ"),
    ("h", "հ"),
    ("j", "ձ"),
    ("m", "մ"),
    ("y", "յ"),
    ("n", "ն"),
    ("o", "ո"),
    ("p", "պ"),
    ("s", "ս"),
    ("v", "վ"),
    ("t", "տ"),
    ("r", "ր"),
    ("w", "ւ"),
    ("f", "ֆ"),
];

/// ASCII input normalization for the transliterated entry fields.
const LATIN_TO_TRANSLIT: &[(&str, &str)] = &[
    ("e=", "ē"),
    ("e'", "ǝ"),
    ("t'", "tʻ"),
    ("z=", "ž"),
    ("l=", "ł"),
    ("c=", "č"),
    ("s=", "š"),
    ("c='", "čʻ"),
    ("j=", "ǰ"),
    ("r=", "ṙ"),
    ("c'", "cʻ"),
    ("p'", "pʻ"),
    ("k'", "kʻ"),
];

/// The canonical transliteration alphabet, in display order.
const TRANSLIT_INITIALS: &[&str] = &[
    "a", "b", "g", "d", "e", "z", "ē", "ǝ", "tʻ", "ž", "i", "l", "x", "c", "k", "h", "j", "ł",
    "č", "m", "y", "n", "š", "o", "čʻ", "p", "ǰ", "ṙ", "s", "v", "t", "r", "cʻ", "w", "pʻ", "kʻ",
    "f",
];

/// The native alphabet in the same canonical order. Initial extraction on
/// the native side is per letter; the `աւ` digraph only exists as a
/// transliteration target.
const NATIVE_INITIALS: &[&str] = &[
    "ա", "բ", "գ", "դ", "ե", "զ", "է", "ը", "թ", "ժ", "ի", "լ", "խ", "ծ", "կ", "հ", "ձ", "ղ",
    "ճ", "մ", "յ", "ն", "շ", "ո", "չ", "պ", "ջ", "ռ", "ս", "վ", "տ", "ր", "ց", "ւ", "փ", "ք",
    "ֆ",
];

const NATIVE_MERGE: MergeRules = MergeRules {
    attach_to_prev: &["ս", "դ", "ն", "՝", ".", ":", ","],
    attach_to_next: &["յ", "զ", "ց", "չ", "Յ", "Զ", "Ց", "Չ"],
    insert_after_vowel: &["՞", "՛"],
    vowels: &['ա', 'ե', 'է', 'ը', 'ի', 'օ', 'ո', 'Է'],
};

const TRANSLIT_MERGE: MergeRules = MergeRules {
    attach_to_prev: &["s", "d", "n", ";", ".", ",", ":"],
    attach_to_next: &["y", "z", "cʻ", "čʻ", "Y", "Z", "Cʻ", "Čʻ"],
    insert_after_vowel: &["?", "!"],
    vowels: &['a', 'e', 'ē', 'ǝ', 'i', 'o', 'u'],
};

lazy_static! {
    static ref NATIVE_PROFILE: ScriptProfile = ScriptProfile {
        script: Script::Native,
        verb_lemma_col: "lemma",
        arg_lemma_col: "lemma",
        encoding_col: "case_value",
        sentence_text_col: "text",
        fold_search_case: false,
        input_normalization: Transcription::new(LATIN_TO_NATIVE),
        to_other_script: Transcription::new(TRANSLIT_TO_NATIVE).inverted(),
        initials: InitialIndex::new(NATIVE_INITIALS),
        merge: NATIVE_MERGE,
    };
    static ref TRANSLIT_PROFILE: ScriptProfile = ScriptProfile {
        script: Script::Transliterated,
        verb_lemma_col: "translit_verb",
        arg_lemma_col: "translit_lemma",
        encoding_col: "translit_dep_lemma",
        sentence_text_col: "transliterated_text",
        fold_search_case: true,
        input_normalization: Transcription::new(LATIN_TO_TRANSLIT),
        to_other_script: Transcription::new(TRANSLIT_TO_NATIVE),
        initials: InitialIndex::new(TRANSLIT_INITIALS),
        merge: TRANSLIT_MERGE,
    };
}

pub fn profile(script: Script) -> &'static ScriptProfile {
    match script {
        Script::Native => &NATIVE_PROFILE,
        Script::Transliterated => &TRANSLIT_PROFILE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn latin_input_normalizes_with_digraph_priority() {
        let native = profile(Script::Native);
        // c=' must win over c= and c'
        assert_eq!("չամ", native.input_normalization.apply("c='am"));
        assert_eq!("ճամ", native.input_normalization.apply("c=am"));
        assert_eq!("ցամ", native.input_normalization.apply("c'am"));

        let translit = profile(Script::Transliterated);
        assert_eq!("čʻam", translit.input_normalization.apply("c='am"));
        // plain letters pass through on the transliteration side
        assert_eq!("berel", translit.input_normalization.apply("berel"));
    }

    #[test]
    fn scripts_transcribe_into_each_other() {
        let native = profile(Script::Native);
        let translit = profile(Script::Transliterated);
        // ու is written as a vowel-glide pair in this transliteration scheme
        assert_eq!("owtel", native.to_other_script.apply("ուտել"));
        assert_eq!("ուտել", translit.to_other_script.apply("owtel"));
        assert_eq!("թագաւոր", translit.to_other_script.apply("tʻagawor"));
    }

    #[test]
    fn initial_cursor_maps_through_static_tables() {
        let native = profile(Script::Native);
        assert_eq!(Some("tʻ"), native.initial_to_other_script("թ"));
        assert_eq!(Some("aw"), native.initial_to_other_script("աւ"));
        assert_eq!(None, native.initial_to_other_script("X"));

        let translit = profile(Script::Transliterated);
        assert_eq!(Some("թ"), translit.initial_to_other_script("tʻ"));
    }

    #[test]
    fn encoding_remainder_strips_the_invariant_label() {
        assert_eq!("զերդ", ScriptProfile::encoding_remainder("Acc + զերդ"));
        assert_eq!("bare", ScriptProfile::encoding_remainder("bare"));
    }

    #[test]
    fn canonical_initial_folding() {
        let translit = profile(Script::Transliterated);
        assert_eq!(Some("tʻ"), translit.initials.initial_of("tʻagawor"));
        assert_eq!(vec!["cʻ"], translit.initials.conflicting("c"));
        assert!(profile(Script::Native).initials.conflicting("ա").is_empty());
    }
}
