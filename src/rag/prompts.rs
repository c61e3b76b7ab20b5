//! Augmented prompt assembly for treatment-insight generation

use crate::models::RankedResultSet;

/// Builds the generation prompt from a symptom and its similar records
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render the fixed template.
    ///
    /// Explanations and user records are listed in result order as JSON
    /// string arrays; a record missing a field contributes `""` so every
    /// retrieved record keeps its slot.
    pub fn build(&self, query_text: &str, results: &RankedResultSet) -> String {
        let explanations: Vec<&str> = results.iter().map(|r| r.record.explanation()).collect();
        let users: Vec<&str> = results.iter().map(|r| r.record.user()).collect();

        format!(
            "A patient reports the following symptoms: {query_text}. \
             Based on the following historical data, the similar patient has the similar following problem: {} \
             and provide insights and treatment suggestions. \
             The full medical records and patterns are: {}.",
            render_list(&explanations),
            render_list(&users)
        )
    }
}

fn render_list(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::models::RetrievalResult;

    fn result(id: &str, user: Option<&str>, explanation: Option<&str>, score: f64) -> RetrievalResult {
        let mut record = Record::new(id, vec![1.0]);
        if let Some(user) = user {
            record = record.with_metadata("user", user);
        }
        if let Some(explanation) = explanation {
            record = record.with_metadata("explanation", explanation);
        }
        RetrievalResult { record, score }
    }

    #[test]
    fn test_fields_in_result_order() {
        let results = RankedResultSet::from_ranked(vec![
            result("1", Some("fever 3 days"), Some("influenza"), 0.9),
            result("2", Some("dry cough"), Some("bronchitis"), 0.8),
        ]);
        let prompt = PromptBuilder::new().build("high fever", &results);

        assert!(prompt.contains("high fever"));
        assert!(prompt.contains(r#"["influenza","bronchitis"]"#));
        assert!(prompt.contains(r#"["fever 3 days","dry cough"]"#));
    }

    #[test]
    fn test_missing_fields_become_empty_strings() {
        let results = RankedResultSet::from_ranked(vec![
            result("1", None, Some("influenza"), 0.9),
            result("2", Some("dry cough"), None, 0.8),
        ]);
        let prompt = PromptBuilder::new().build("cough", &results);

        assert!(prompt.contains(r#"["influenza",""]"#));
        assert!(prompt.contains(r#"["","dry cough"]"#));
    }

    #[test]
    fn test_deterministic() {
        let results = RankedResultSet::from_ranked(vec![result("1", Some("u"), Some("e"), 1.0)]);
        let builder = PromptBuilder::new();
        assert_eq!(builder.build("q", &results), builder.build("q", &results));
    }

    #[test]
    fn test_empty_results_keep_template() {
        let prompt = PromptBuilder::new().build("headache", &RankedResultSet::empty());
        assert!(prompt.contains("problem: []"));
        assert!(prompt.ends_with("patterns are: []."));
    }
}
