//! The flat key-value multi-map exchanged with the request layer.
//!
//! Multi-select widgets submit repeated keys, so insertion order and
//! repetition must survive a decode/encode round trip.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that stay unescaped in an encoded query component.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParamMap {
    entries: Vec<(String, String)>,
}

impl ParamMap {
    pub fn new() -> ParamMap {
        ParamMap::default()
    }

    /// Parse a percent-encoded query string. Keys without `=` get an empty
    /// value; `+` decodes to a space.
    pub fn parse(query: &str) -> ParamMap {
        let mut entries = Vec::new();
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            entries.push((decode_component(key), decode_component(value)));
        }
        ParamMap { entries }
    }

    /// First value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value for `key`.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Replace all values of `key` with a single value, keeping the position
    /// of its first occurrence.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(first) = self.entries.iter().position(|(k, _)| k == key) {
            self.entries.retain(|(k, _)| k != key);
            self.entries
                .insert(first, (key.to_string(), value.to_string()));
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }

    pub fn append(&mut self, key: &str, value: &str) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    /// Rename every occurrence of `from` to `to`, keeping values and order.
    pub fn rename(&mut self, from: &str, to: &str) {
        for (k, _) in self.entries.iter_mut() {
            if k == from {
                *k = to.to_string();
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode back into a query string.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(&utf8_percent_encode(key, QUERY_COMPONENT).to_string());
            out.push('=');
            out.push_str(&utf8_percent_encode(value, QUERY_COMPONENT).to_string());
        }
        out
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_keys_survive_a_round_trip() {
        let map = ParamMap::parse("verbform=Fin&verbform=Part&page=2");
        assert_eq!(vec!["Fin", "Part"], map.get_all("verbform"));
        assert_eq!("verbform=Fin&verbform=Part&page=2", map.encode());
    }

    #[test]
    fn non_ascii_values_are_percent_encoded() {
        let mut map = ParamMap::new();
        map.set("selected_verb", "ուտել");
        let encoded = map.encode();
        assert!(encoded.starts_with("selected_verb=%D5%"));
        assert_eq!(map, ParamMap::parse(&encoded));
    }

    #[test]
    fn set_collapses_repeated_keys_in_place() {
        let mut map = ParamMap::parse("a=1&b=2&a=3");
        map.set("a", "9");
        assert_eq!("a=9&b=2", map.encode());
    }

    #[test]
    fn empty_and_missing_values() {
        let map = ParamMap::parse("flag&x=");
        assert_eq!(Some(""), map.get("flag"));
        assert_eq!(Some(""), map.get("x"));
        assert_eq!(None, map.get_non_empty("x"));
        assert!(!map.contains_key("y"));
    }

    #[test]
    fn plus_decodes_to_space() {
        let map = ParamMap::parse("english_search_query=to+eat");
        assert_eq!(Some("to eat"), map.get("english_search_query"));
    }
}
