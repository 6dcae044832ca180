use super::codec::RequestHead;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};

/// Request headers as echoed back to the client
///
/// Keys are written in canonical title case (`user-agent` becomes
/// `User-Agent`) and keep the order in which headers first arrived. A header
/// sent more than once becomes a single entry whose values are joined with
/// `", "`. Values that are not UTF-8 are decoded lossily.
///
/// # Examples
///
/// ```
/// use headerecho::EchoedHeaders;
///
/// let headers = EchoedHeaders::from_pairs([
///     ("User-Agent", "Googlebot-Test"),
///     ("Accept", "text/html"),
///     ("accept", "application/json"),
///     ("x-forwarded-for", "10.0.0.1"),
/// ]);
///
/// assert_eq!(headers.get("user-agent"), Some("Googlebot-Test"));
/// assert_eq!(headers.iter().last(), Some(("X-Forwarded-For", "10.0.0.1")));
/// assert_eq!(headers.get("Accept"), Some("text/html, application/json"));
/// assert_eq!(headers.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EchoedHeaders(IndexMap<String, String>);

impl EchoedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the echo map from a parsed request head.
    pub fn from_head(head: &RequestHead) -> Self {
        let mut echoed = Self::new();
        for (name, value) in &head.headers {
            echoed.append(name, &String::from_utf8_lossy(value));
        }
        echoed
    }

    pub fn from_pairs<N, V, I>(pairs: I) -> Self
    where
        N: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (N, V)>,
    {
        let mut echoed = Self::new();
        for (name, value) in pairs {
            echoed.append(name.as_ref(), value.as_ref());
        }
        echoed
    }

    /// Adds a header, folding it into an existing entry with the same name.
    pub fn append(&mut self, name: &str, value: &str) {
        match self.0.entry(canonical_name(name)) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.push_str(", ");
                existing.push_str(value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value.to_string());
            }
        }
    }

    /// Looks a header up by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serializes the map as an indented JSON object, one header per line.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Parses a JSON object produced by [`EchoedHeaders::to_json`].
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

/// Title-cases a header name: a letter is upper case when it follows a
/// non-letter and lower case otherwise.
fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut after_letter = false;
    for c in name.chars() {
        if c.is_ascii_alphabetic() {
            out.push(if after_letter {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            });
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Version};

    #[test]
    fn test_from_head_keeps_arrival_order() {
        let head = RequestHead {
            method: Method::GET,
            target: "/".to_string(),
            version: Version::HTTP_11,
            headers: vec![
                ("Host".to_string(), b"127.0.0.1:5000".to_vec()),
                ("User-Agent".to_string(), b"Googlebot-Test".to_vec()),
                ("Accept".to_string(), b"*/*".to_vec()),
            ],
        };

        let echoed = EchoedHeaders::from_head(&head);
        let names: Vec<&str> = echoed.iter().map(|(n, _)| n).collect();

        assert_eq!(names, vec!["Host", "User-Agent", "Accept"]);
        assert_eq!(echoed.get("USER-AGENT"), Some("Googlebot-Test"));
    }

    #[test]
    fn test_non_utf8_value_is_lossy() {
        let head = RequestHead {
            method: Method::GET,
            target: "/".to_string(),
            version: Version::HTTP_11,
            headers: vec![("X-Raw".to_string(), vec![b'a', 0xff, b'b'])],
        };

        let echoed = EchoedHeaders::from_head(&head);
        assert_eq!(echoed.get("x-raw"), Some("a\u{fffd}b"));
    }

    #[test]
    fn test_names_are_title_cased() {
        let echoed = EchoedHeaders::from_pairs([
            ("user-agent", "Googlebot-Test"),
            ("X-TRACE-ID", "abc"),
            ("x-b3-sampled", "1"),
            ("USER-AGENT", "second"),
        ]);
        let names: Vec<&str> = echoed.iter().map(|(n, _)| n).collect();

        assert_eq!(names, vec!["User-Agent", "X-Trace-Id", "X-B3-Sampled"]);
        assert_eq!(echoed.get("User-Agent"), Some("Googlebot-Test, second"));
    }

    #[test]
    fn test_json_is_indented_with_spaced_colons() {
        let echoed = EchoedHeaders::from_pairs([("User-Agent", "Googlebot-Test"), ("Accept", "*/*")]);
        let json = String::from_utf8(echoed.to_json().unwrap()).unwrap();

        assert_eq!(
            json,
            "{\n  \"User-Agent\": \"Googlebot-Test\",\n  \"Accept\": \"*/*\"\n}"
        );
    }

    #[test]
    fn test_json_object_shape() {
        let echoed = EchoedHeaders::from_pairs([("User-Agent", "Googlebot-Test"), ("X-Empty", "")]);
        let json: serde_json::Value = serde_json::from_slice(&echoed.to_json().unwrap()).unwrap();

        assert_eq!(json["User-Agent"], "Googlebot-Test");
        assert_eq!(json["X-Empty"], "");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_map_is_empty_object() {
        let echoed = EchoedHeaders::new();
        assert!(echoed.is_empty());
        assert_eq!(echoed.to_json().unwrap(), b"{}");
    }
}
