use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The users who liked a post or comment. Its size is the like count; no
/// separate counter is ever stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikeSet(BTreeSet<String>);

impl LikeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.0.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the complementary set for `user_id`: removed if present,
    /// added if absent. Toggling twice gives back the original set.
    pub fn toggled(&self, user_id: &str) -> Self {
        let mut next = self.0.clone();
        if !next.remove(user_id) {
            next.insert(user_id.to_string());
        }
        Self(next)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<S: Into<String>> FromIterator<S> for LikeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Response of a like toggle: the canonical set after the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub liked_by: LikeSet,
    #[serde(default)]
    pub likes_count: usize,
}

impl LikeToggle {
    pub fn new(liked_by: LikeSet, user_id: &str) -> Self {
        Self {
            liked: liked_by.contains(user_id),
            likes_count: liked_by.len(),
            liked_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[], "u1")]
    #[case(&["u1"], "u1")]
    #[case(&["u1", "u2", "u3"], "u2")]
    #[case(&["u1", "u2"], "u9")]
    fn toggle_is_an_involution(#[case] members: &[&str], #[case] user: &str) {
        let set: LikeSet = members.iter().copied().collect();
        assert_eq!(set.toggled(user).toggled(user), set);
    }

    #[rstest]
    #[case(&["a", "b"], "c", 3)]
    #[case(&["a", "b"], "a", 1)]
    #[case(&[], "a", 1)]
    fn size_tracks_membership(#[case] members: &[&str], #[case] user: &str, #[case] expected: usize) {
        let set: LikeSet = members.iter().copied().collect();
        let next = set.toggled(user);
        assert_eq!(next.len(), expected);
        assert_eq!(next.contains(user), !set.contains(user));
    }

    #[test]
    fn toggle_leaves_input_untouched() {
        let set: LikeSet = ["a"].into_iter().collect();
        let _ = set.toggled("b");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn json_array_roundtrip_deduplicates() {
        let set = LikeSet::from_json(r#"["b","a","b"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_json().unwrap(), r#"["a","b"]"#);
        assert!(LikeSet::from_json("").unwrap().is_empty());
    }
}
