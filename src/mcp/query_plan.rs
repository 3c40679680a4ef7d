//! Step-by-step query planning helper.
//!
//! Stateless: every call echoes the caller's reasoning back in a fixed shape.
//! The final step (`next_step_needed = false`) turns the collected concepts
//! into a search configuration.

use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_CONFIDENCE: f64 = 0.5;
const PRIMARY_KEYWORDS: usize = 3;
const ALTERNATIVE_KEYWORDS: usize = 3;

/// Arguments of one planning step
#[derive(Debug, Clone, Deserialize)]
pub struct QueryPlanStep {
    pub analysis_step: String,
    pub step_number: i64,
    pub total_steps: i64,
    pub next_step_needed: bool,
    #[serde(default)]
    pub extracted_concepts: Option<Vec<String>>,
    #[serde(default)]
    pub databases: Option<String>,
    #[serde(default)]
    pub search_strategy: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<f64>,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub clarification_questions: Option<Vec<String>>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub datetime_sort: bool,
}

pub fn plan(step: &QueryPlanStep) -> Value {
    let mut result = json!({
        "step_number": step.step_number,
        "total_steps": step.total_steps,
        "next_step_needed": step.next_step_needed,
        "analysis_step": step.analysis_step,
        "confidence_level": step.confidence_level.unwrap_or(DEFAULT_CONFIDENCE),
    });

    let concepts = step.extracted_concepts.clone().unwrap_or_default();

    let extra = if step.next_step_needed {
        json!({
            "extracted_concepts": concepts,
            "databases": step.databases,
            "search_strategy": step.search_strategy,
            "needs_clarification": step.needs_clarification,
            "clarification_questions": step.clarification_questions.clone().unwrap_or_default(),
        })
    } else {
        let keywords: Vec<&String> = concepts.iter().take(PRIMARY_KEYWORDS).collect();
        let alternatives = if concepts.len() > PRIMARY_KEYWORDS {
            let rest: Vec<&String> = concepts
                .iter()
                .skip(PRIMARY_KEYWORDS)
                .take(ALTERNATIVE_KEYWORDS)
                .collect();
            json!([{ "keywords": rest }])
        } else {
            json!([])
        };

        json!({
            "query_config": {
                "keywords": keywords,
                "databases": step.databases,
                "filters": {
                    "date_range": step.date_range,
                    "sort": if step.datetime_sort { "datetime" } else { "relevance" },
                },
            },
            "alternatives": alternatives,
            "analysis_complete": true,
        })
    };

    if let (Some(target), Value::Object(fields)) = (result.as_object_mut(), extra) {
        target.extend(fields);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(args: Value) -> QueryPlanStep {
        serde_json::from_value(args).unwrap()
    }

    #[test]
    fn test_intermediate_step_echoes_analysis() {
        let out = plan(&step(json!({
            "analysis_step": "Identify the field",
            "step_number": 1,
            "total_steps": 3,
            "next_step_needed": true,
            "extracted_concepts": ["retrieval augmented generation"],
            "databases": "arxiv",
        })));

        assert_eq!(out["confidence_level"], json!(0.5));
        assert_eq!(out["extracted_concepts"], json!(["retrieval augmented generation"]));
        assert_eq!(out["clarification_questions"], json!([]));
        assert_eq!(out["needs_clarification"], json!(false));
        assert!(out.get("query_config").is_none());
    }

    #[test]
    fn test_final_step_builds_query_config() {
        let out = plan(&step(json!({
            "analysis_step": "Done",
            "step_number": 3,
            "total_steps": 3,
            "next_step_needed": false,
            "extracted_concepts": ["a", "b", "c", "d", "e", "f", "g"],
            "databases": "venue",
            "date_range": "recent",
            "datetime_sort": true,
            "confidence_level": 0.9,
        })));

        assert_eq!(out["query_config"]["keywords"], json!(["a", "b", "c"]));
        assert_eq!(out["query_config"]["filters"]["sort"], json!("datetime"));
        assert_eq!(out["query_config"]["filters"]["date_range"], json!("recent"));
        assert_eq!(out["alternatives"], json!([{ "keywords": ["d", "e", "f"] }]));
        assert_eq!(out["analysis_complete"], json!(true));
        assert_eq!(out["confidence_level"], json!(0.9));
    }

    #[test]
    fn test_final_step_without_spare_concepts() {
        let out = plan(&step(json!({
            "analysis_step": "Done",
            "step_number": 2,
            "total_steps": 2,
            "next_step_needed": false,
            "extracted_concepts": ["x"],
        })));

        assert_eq!(out["alternatives"], json!([]));
        assert_eq!(out["query_config"]["filters"]["sort"], json!("relevance"));
    }
}
