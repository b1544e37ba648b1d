//! Deterministic template responder.
//!
//! Produces answers with the same shape and tone contract as the research
//! agent (2-4 sentences, one statistic, one call-to-action) using only string
//! interpolation. This is the path that keeps the system answering when no
//! external collaborator is configured or reachable.

#[derive(Debug, Clone, Default)]
pub struct TemplateResponder;

impl TemplateResponder {
    pub fn new() -> Self {
        Self
    }

    pub fn company_fallback(&self, website: Option<&str>, description: Option<&str>) -> String {
        let company = website
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("your company");
        let operations = description
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("transportation operations");

        format!(
            "I see you're with {company}! Based on your {operations}, our GPS tracking and \
             route optimization could really help cut fuel costs by about 15-25%. Would you \
             like to see a quick demo of how this works for companies like yours?"
        )
    }

    pub fn question_fallback(&self, question: &str, company_website: Option<&str>) -> String {
        let company_info = company_website
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|website| format!(" for {}", website))
            .unwrap_or_default();

        format!(
            "Great question about \"{question}\"! For fleet management{company_info}, our \
             route optimization and fuel tracking typically help companies save 15-25% on \
             fuel costs while improving on-time deliveries by about 20%. Plus our ELD \
             compliance features handle all the DOT requirements automatically. I'd love to \
             show you how this could work specifically for your operation - would you be \
             interested in a quick demo?"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_are_deterministic() {
        let responder = TemplateResponder::new();
        let a = responder.question_fallback("How do I cut fuel costs?", None);
        let b = responder.question_fallback("How do I cut fuel costs?", None);
        assert_eq!(a, b);

        let c = responder.company_fallback(Some("https://acme-trucking.com"), None);
        let d = responder.company_fallback(Some("https://acme-trucking.com"), None);
        assert_eq!(c, d);
    }

    #[test]
    fn question_fallback_carries_a_statistic_and_a_solution() {
        let responder = TemplateResponder::new();
        let answer = responder.question_fallback("fuel costs?", Some("https://example.com"));
        assert!(answer.contains('%'));
        assert!(answer.contains("route optimization"));
        assert!(answer.contains("https://example.com"));
        assert!(answer.contains("demo"));
    }

    #[test]
    fn company_fallback_handles_missing_fields() {
        let responder = TemplateResponder::new();
        let answer = responder.company_fallback(None, Some("  "));
        assert!(answer.contains("your company"));
        assert!(answer.contains("transportation operations"));
        assert!(answer.contains('%'));
    }
}
