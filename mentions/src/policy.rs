//! Which collections may reference which.
//!
//! The policy is a directed graph `collection -> collections it may refer
//! to`. It is validated once when built, and the reverse direction ("who may
//! mention me") is indexed at the same time.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use warbook_store::collections;

use crate::error::{MentionError, Result};

/// Validated reference policy.
#[derive(Debug, Clone)]
pub struct MentionPolicy {
    refers_to: BTreeMap<String, Vec<String>>,
    mentioned_by: HashMap<String, Vec<String>>,
}

impl MentionPolicy {
    /// Build a policy from `collection -> allowed targets` edges.
    ///
    /// Rejects empty or unknown collection names and duplicate edges.
    pub fn new(refers_to: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut mentioned_by: HashMap<String, Vec<String>> = HashMap::new();

        for (source, targets) in &refers_to {
            check_name(source)?;
            let mut seen = Vec::with_capacity(targets.len());
            for target in targets {
                check_name(target)?;
                if seen.contains(&target) {
                    return Err(MentionError::InvalidPolicy(format!(
                        "duplicate edge {source} -> {target}"
                    )));
                }
                seen.push(target);
                mentioned_by
                    .entry(target.clone())
                    .or_default()
                    .push(source.clone());
            }
        }

        Ok(Self {
            refers_to,
            mentioned_by,
        })
    }

    /// A policy with no edges.
    pub fn empty() -> Self {
        Self {
            refers_to: BTreeMap::new(),
            mentioned_by: HashMap::new(),
        }
    }

    /// Collections `collection` may hold references to.
    pub fn allowed_to_refer(&self, collection: &str) -> &[String] {
        self.refers_to.get(collection).map_or(&[], Vec::as_slice)
    }

    /// Collections whose documents may mention an entity in `collection`,
    /// in the order they were declared.
    pub fn can_be_mentioned_by(&self, collection: &str) -> &[String] {
        self.mentioned_by.get(collection).map_or(&[], Vec::as_slice)
    }

    /// Whether `source` may refer to an entity in `target`.
    pub fn allows(&self, source: &str, target: &str) -> bool {
        self.allowed_to_refer(source).iter().any(|t| t == target)
    }

    /// The raw edges.
    pub fn edges(&self) -> &BTreeMap<String, Vec<String>> {
        &self.refers_to
    }
}

impl Default for MentionPolicy {
    fn default() -> Self {
        // Built from constants, so validation cannot fail.
        Self::new(PolicyConfig::default().refers_to).unwrap_or_else(|_| Self::empty())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MentionError::InvalidPolicy("empty collection name".to_string()));
    }
    if !collections::is_known(name) {
        return Err(MentionError::InvalidPolicy(format!("unknown collection: {name}")));
    }
    Ok(())
}

/// Serializable form of the policy, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// `collection -> collections it may refer to`.
    pub refers_to: BTreeMap<String, Vec<String>>,
}

impl PolicyConfig {
    /// Validate into a [`MentionPolicy`].
    pub fn build(&self) -> Result<MentionPolicy> {
        MentionPolicy::new(self.refers_to.clone())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        use collections::{ARMORS, KEYWORDS, PROFILES, SOURCES, TRAITS, WEAPONS};

        let edges: [(&str, &[&str]); 5] = [
            (PROFILES, &[SOURCES, KEYWORDS, TRAITS, ARMORS, WEAPONS]),
            (WEAPONS, &[SOURCES, KEYWORDS, TRAITS]),
            (ARMORS, &[SOURCES, KEYWORDS, TRAITS]),
            (TRAITS, &[SOURCES, KEYWORDS]),
            (KEYWORDS, &[SOURCES]),
        ];

        Self {
            refers_to: edges
                .into_iter()
                .map(|(source, targets)| {
                    (
                        source.to_string(),
                        targets.iter().map(|t| (*t).to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edges(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(s, ts)| (s.to_string(), ts.iter().map(|t| t.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_reverse_index() {
        let policy = MentionPolicy::new(edges(&[
            ("profiles", &["sources", "keywords"]),
            ("weapons", &["sources"]),
        ]))
        .unwrap();

        assert_eq!(policy.can_be_mentioned_by("sources"), ["profiles", "weapons"]);
        assert_eq!(policy.can_be_mentioned_by("keywords"), ["profiles"]);
        assert!(policy.can_be_mentioned_by("profiles").is_empty());
        assert!(policy.allows("weapons", "sources"));
        assert!(!policy.allows("sources", "weapons"));
    }

    #[test]
    fn test_rejects_unknown_collection() {
        let err = MentionPolicy::new(edges(&[("profiles", &["spells"])])).unwrap_err();
        assert!(matches!(err, MentionError::InvalidPolicy(_)));
    }

    #[test]
    fn test_rejects_duplicate_edge() {
        let err =
            MentionPolicy::new(edges(&[("profiles", &["sources", "sources"])])).unwrap_err();
        assert!(matches!(err, MentionError::InvalidPolicy(_)));
    }

    #[test]
    fn test_default_policy_is_valid() {
        let policy = PolicyConfig::default().build().unwrap();
        assert_eq!(
            policy.can_be_mentioned_by("sources"),
            ["armors", "keywords", "profiles", "traits", "weapons"]
        );
        assert_eq!(policy.can_be_mentioned_by("weapons"), ["profiles"]);
        assert!(policy.can_be_mentioned_by("systems").is_empty());
    }
}
