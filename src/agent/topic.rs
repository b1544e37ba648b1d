//! In-domain admission check applied before any collaborator work.

use serde_json::Value;

/// Fleet/transportation vocabulary. Intentionally permissive: a single
/// substring hit admits the question, since a wrongly admitted question only
/// costs one unhelpful answer while a wrongly rejected one costs a prospect.
const DEFAULT_KEYWORDS: &[&str] = &[
    "fleet",
    "truck",
    "vehicle",
    "driver",
    "fuel",
    "route",
    "logistics",
    "transport",
    "shipping",
    "deliver",
    "dispatch",
    "maintenance",
    "gps",
    "tracking",
    "eld",
    "compliance",
    "freight",
    "cargo",
    "telematics",
    "trailer",
    "mileage",
    "hours of service",
    "tms",
];

#[derive(Debug, Clone)]
pub struct TopicGate {
    keywords: Vec<String>,
}

impl Default for TopicGate {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl TopicGate {
    /// Builds the gate from `topic.keywords` in config, falling back to the
    /// built-in vocabulary.
    pub fn from_config(config: &Value) -> Self {
        let keywords: Vec<String> = config
            .get("topic")
            .and_then(|v| v.get("keywords"))
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str())
                    .map(|item| item.trim().to_lowercase())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if keywords.is_empty() {
            Self::default()
        } else {
            Self { keywords }
        }
    }

    /// True iff the lowercased question contains at least one keyword as a
    /// substring. Pure and deterministic; empty input is rejected.
    pub fn is_in_domain(&self, question: &str) -> bool {
        let lowered = question.to_lowercase();
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn admits_questions_with_domain_keywords() {
        let gate = TopicGate::default();
        assert!(gate.is_in_domain("How can I reduce FUEL costs?"));
        assert!(gate.is_in_domain("Do you integrate with our TMS?"));
        assert!(gate.is_in_domain("How can Fleetworthy help my drivers?"));
    }

    #[test]
    fn rejects_unrelated_questions() {
        let gate = TopicGate::default();
        assert!(!gate.is_in_domain("What's the weather today?"));
        assert!(!gate.is_in_domain("Tell me a joke"));
        assert!(!gate.is_in_domain(""));
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let gate = TopicGate::default();
        assert!(gate.is_in_domain("GPS TRACKING pricing?"));
        assert!(gate.is_in_domain("thoughts on refueling stops"));
    }

    #[test]
    fn config_keywords_override_defaults() {
        let gate = TopicGate::from_config(&json!({"topic": {"keywords": ["warehouse"]}}));
        assert!(gate.is_in_domain("warehouse automation?"));
        assert!(!gate.is_in_domain("fleet size?"));

        let empty = TopicGate::from_config(&json!({"topic": {"keywords": []}}));
        assert!(empty.is_in_domain("fleet size?"));
    }
}
