//! Sector Name Reconciliation
//!
//! Concept sectors arrive from sources with different taxonomies: the alpha
//! ranking, the limit-up board and the money-flow feed all spell the same
//! theme slightly differently. Names are normalized to a join key and looked
//! up through a pluggable matcher.

use std::collections::HashMap;

/// Tokens that carry no meaning for joins
const NOISE_TOKENS: [&str; 3] = ["概念", "板块", "指数"];

const SEPARATORS: [char; 13] = [
    '-', '_', '·', '.', ',', '/', '－', '＿', '，', '。', '、', '／', '・',
];

fn is_open_bracket(c: char) -> bool {
    matches!(c, '(' | '（' | '[' | '【')
}

fn is_close_bracket(c: char) -> bool {
    matches!(c, ')' | '）' | ']' | '】')
}

/// Normalize a sector display name into a join key.
///
/// Drops bracketed qualifiers (opening bracket to the nearest closing one,
/// unmatched brackets are kept), whitespace (full-width included), separator
/// punctuation and the noise tokens, and lowercases ASCII letters. Pure and
/// deterministic.
pub fn clean_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if is_open_bracket(c) {
            // Drop up to the nearest closing bracket; an unclosed one stays as text
            if let Some(offset) = chars[i + 1..].iter().position(|&n| is_close_bracket(n)) {
                i += offset + 2;
                continue;
            }
        }
        if !(c.is_whitespace() || SEPARATORS.contains(&c)) {
            out.push(c.to_ascii_lowercase());
        }
        i += 1;
    }

    for token in NOISE_TOKENS {
        if out.contains(token) {
            out = out.replace(token, "");
        }
    }
    out
}

/// Strategy for matching a cleaned name against indexed keys
pub trait NameMatcher: Send + Sync {
    fn clean(&self, name: &str) -> String {
        clean_name(name)
    }

    /// Called only after an exact lookup of `key` missed
    fn fallback<'a>(
        &self,
        key: &str,
        candidates: &mut dyn Iterator<Item = &'a str>,
    ) -> Option<&'a str>;
}

/// Exact normalized match, no fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl NameMatcher for ExactMatcher {
    fn fallback<'a>(
        &self,
        _key: &str,
        _candidates: &mut dyn Iterator<Item = &'a str>,
    ) -> Option<&'a str> {
        None
    }
}

/// Exact match first, then the most similar key above a threshold
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity in [0, 1]: containment bonus or bigram Dice, whichever is higher
    pub fn similarity(a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }

        let len_a = a.chars().count();
        let len_b = b.chars().count();
        let (short, long, short_len, long_len) = if len_a <= len_b {
            (a, b, len_a, len_b)
        } else {
            (b, a, len_b, len_a)
        };

        let containment = if short_len >= 2 && long.contains(short) {
            0.5 + 0.5 * short_len as f64 / long_len as f64
        } else {
            0.0
        };

        containment.max(Self::dice(a, b))
    }

    fn dice(a: &str, b: &str) -> f64 {
        let bigrams_a = Self::bigrams(a);
        let bigrams_b = Self::bigrams(b);
        let total = bigrams_a.len() + bigrams_b.len();
        if total == 0 {
            return 0.0;
        }

        let mut counts: HashMap<(char, char), usize> = HashMap::new();
        for bg in &bigrams_a {
            *counts.entry(*bg).or_default() += 1;
        }

        let mut shared = 0usize;
        for bg in &bigrams_b {
            if let Some(n) = counts.get_mut(bg) {
                if *n > 0 {
                    *n -= 1;
                    shared += 1;
                }
            }
        }

        2.0 * shared as f64 / total as f64
    }

    fn bigrams(s: &str) -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    }
}

impl NameMatcher for FuzzyMatcher {
    fn fallback<'a>(
        &self,
        key: &str,
        candidates: &mut dyn Iterator<Item = &'a str>,
    ) -> Option<&'a str> {
        let mut best: Option<(f64, &'a str)> = None;

        for candidate in candidates {
            let score = Self::similarity(key, candidate);
            if score < self.threshold {
                continue;
            }
            best = match best {
                // ties go to the smallest key so results don't depend on map order
                Some((s, c)) if s > score || (s == score && c <= candidate) => Some((s, c)),
                _ => Some((score, candidate)),
            };
        }

        best.map(|(_, c)| c)
    }
}

/// Lookup table keyed by reconciled sector name
#[derive(Debug, Clone)]
pub struct NameIndex<V> {
    entries: HashMap<String, V>,
    collisions: Vec<String>,
}

impl<V> NameIndex<V> {
    /// Build an index with the default normalization
    pub fn build<T, K, F>(records: impl IntoIterator<Item = T>, key_fn: K, value_fn: F) -> Self
    where
        K: Fn(&T) -> &str,
        F: Fn(&T) -> V,
    {
        Self::build_with(&ExactMatcher, records, key_fn, value_fn)
    }

    /// Build an index using the matcher's normalization.
    ///
    /// The first record for a key wins; later ones are reported as collisions.
    pub fn build_with<T, K, F>(
        matcher: &dyn NameMatcher,
        records: impl IntoIterator<Item = T>,
        key_fn: K,
        value_fn: F,
    ) -> Self
    where
        K: Fn(&T) -> &str,
        F: Fn(&T) -> V,
    {
        let mut entries = HashMap::new();
        let mut collisions = Vec::new();

        for record in records {
            let key = matcher.clean(key_fn(&record));
            if key.is_empty() {
                continue;
            }
            if entries.contains_key(&key) {
                tracing::warn!("Sector name collision on key '{}', keeping first entry", key);
                collisions.push(key);
                continue;
            }
            let value = value_fn(&record);
            entries.insert(key, value);
        }

        Self {
            entries,
            collisions,
        }
    }

    /// Exact lookup by an already-cleaned key
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Reconcile a raw name against the index. `None` means the join missed,
    /// which is not the same as a stored zero.
    pub fn lookup(&self, raw_name: &str, matcher: &dyn NameMatcher) -> Option<&V> {
        let key = matcher.clean(raw_name);
        if key.is_empty() {
            return None;
        }
        if let Some(value) = self.entries.get(&key) {
            return Some(value);
        }

        let mut keys = self.entries.keys().map(String::as_str);
        let matched = matcher.fallback(&key, &mut keys)?;
        tracing::debug!("Fuzzy match '{}' -> '{}'", key, matched);
        self.entries.get(matched)
    }

    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
