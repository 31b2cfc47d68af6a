use std::{hash::Hash, sync::Arc};

/// A bus topic: either a concrete routing key (`stasis.app.myapp`) or a
/// subscription binding that may contain wildcards.
///
/// Binding patterns follow topic-exchange semantics: keys are
/// dot-separated words, `*` matches exactly one word, and `#` matches
/// zero or more words. A binding with no wildcards matches only itself.
///
/// `Topic` is cheap to clone and safe to serialize. Equality works
/// correctly across serialization boundaries (string comparison with a
/// fast path for pointer equality when topics share the same
/// allocation).
///
/// # Example
///
/// ```
/// use busspy::Topic;
///
/// let binding = Topic::new("stasis.app.*");
/// assert!(binding.matches(&Topic::new("stasis.app.myapp")));
/// assert!(!binding.matches(&Topic::new("stasis.channel.myapp")));
/// ```
#[derive(Debug, Clone, Ord, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Topic(Arc<str>);

impl Topic {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the string representation of this topic.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this binding pattern matches the given routing key.
    ///
    /// `self` is interpreted as the pattern; wildcards in `key` have no
    /// special meaning.
    pub fn matches(&self, key: &Topic) -> bool {
        let pattern: Vec<&str> = self.0.split('.').collect();
        let words: Vec<&str> = key.0.split('.').collect();
        match_words(&pattern, &words)
    }
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((word, rest)) => match key.split_first() {
            Some((head, tail)) => (*word == "*" || word == head) && match_words(rest, tail),
            None => false,
        },
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}
