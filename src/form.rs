//! Submission payload and its fingerprint.

use serde::Serialize;
use std::fmt;

/// Ordered form body sent with every validation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping any existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every entry named `name` with a single entry.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter().position(|(n, _)| *n == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(n, _)| {
                    let keep = index <= first || *n != name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Order-independent identity of the entries.
    ///
    /// Each entry renders as `name,value`; renderings are sorted and joined
    /// with `,`.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut rendered: Vec<String> = self
            .entries
            .iter()
            .map(|(name, value)| format!("{},{}", name, value))
            .collect();
        rendered.sort();
        Fingerprint(rendered.join(","))
    }
}

/// Identity of a submission, used to skip unchanged resubmissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(token: &str, value: &str) -> FormData {
        let mut body = FormData::new();
        body.append("authenticity_token", token);
        body.append("value", value);
        body
    }

    #[test]
    fn test_fingerprint_format() {
        let body = submission("tok1", "alice");
        assert_eq!(
            body.fingerprint().as_str(),
            "authenticity_token,tok1,value,alice"
        );
    }

    #[test]
    fn test_fingerprint_ignores_entry_order() {
        let mut reversed = FormData::new();
        reversed.append("value", "alice");
        reversed.append("authenticity_token", "tok1");

        assert_eq!(
            submission("tok1", "alice").fingerprint(),
            reversed.fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_tracks_value_and_token() {
        let base = submission("tok1", "alice").fingerprint();
        assert_ne!(base, submission("tok1", "bob").fingerprint());
        assert_ne!(base, submission("tok2", "alice").fingerprint());
    }

    #[test]
    fn test_set_replaces_all_entries_with_name() {
        let mut body = submission("tok1", "alice");
        body.append("value", "second");
        body.set("value", "carol");

        assert_eq!(body.get("value"), Some("carol"));
        assert_eq!(body.entries().len(), 2);
        assert_eq!(body.entries()[1], ("value".to_string(), "carol".to_string()));
    }

    #[test]
    fn test_set_appends_missing_name() {
        let mut body = submission("tok1", "alice");
        body.set("scope", "signup");
        assert_eq!(body.get("scope"), Some("signup"));
        assert_eq!(body.entries().len(), 3);
    }

    #[test]
    fn test_delete() {
        let mut body = submission("tok1", "alice");
        body.delete("authenticity_token");
        assert_eq!(body.get("authenticity_token"), None);
        assert!(!body.is_empty());
    }
}
