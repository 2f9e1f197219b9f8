//! Response schemas sent to the AI boundary.
//!
//! Written in the JSON-Schema subset that every provider understands
//! (`type`, `properties`, `items`, `required`, `enum`, `description`,
//! `minimum`/`maximum`). Providers translate to their own dialect if needed.

use serde_json::{json, Value};

use crate::model::CompetencyCategory;

fn string_array(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": { "type": "string" }
    })
}

/// Schema for a 10-question entry quiz.
pub fn quiz_schema() -> Value {
    let tags: Vec<&str> = CompetencyCategory::ALL.iter().map(|c| c.tag()).collect();
    json!({
        "type": "array",
        "description": "Ten multiple-choice questions about bacterial growth.",
        "items": {
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "question": { "type": "string" },
                "options": {
                    "type": "array",
                    "description": "Exactly four answer options.",
                    "items": { "type": "string" }
                },
                "correctAnswer": {
                    "type": "integer",
                    "description": "Index (0-3) of the correct option."
                },
                "competencyType": {
                    "type": "string",
                    "enum": tags
                }
            },
            "required": ["id", "question", "options", "correctAnswer", "competencyType"]
        }
    })
}

/// Schema for a single-submission competency assessment.
pub fn analysis_schema() -> Value {
    let names: Vec<&str> = CompetencyCategory::ALL.iter().map(|c| c.label()).collect();
    json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "Overview of the student's natural-science competencies in this project."
            },
            "competencies": {
                "type": "array",
                "description": "Assessment of the three core competencies.",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": format!("Competency name ({})", names.join(", "))
                        },
                        "score": {
                            "type": "number",
                            "description": "Score on a 0-100 scale.",
                            "minimum": 0,
                            "maximum": 100
                        },
                        "description": {
                            "type": "string",
                            "description": "Detailed rubric-based feedback."
                        }
                    },
                    "required": ["name", "score", "description"]
                }
            },
            "strengths": string_array("Strengths in the design and execution process."),
            "weaknesses": string_array("Knowledge gaps or procedural mistakes."),
            "learningPath": {
                "type": "array",
                "description": "Chronological plan to improve the competencies.",
                "items": {
                    "type": "object",
                    "properties": {
                        "timeframe": { "type": "string" },
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "actionItems": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["timeframe", "title", "description", "actionItems"]
                }
            }
        },
        "required": ["summary", "competencies", "strengths", "weaknesses", "learningPath"]
    })
}

/// Schema for the class-level summary.
pub fn class_analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "overallAssessment": {
                "type": "string",
                "description": "Overall assessment of the class's competency level."
            },
            "commonMisconceptions": string_array("Misconceptions shared by several students."),
            "recommendedTeachingStrategies": string_array("Concrete teaching strategies for the next lessons.")
        },
        "required": ["overallAssessment", "commonMisconceptions", "recommendedTeachingStrategies"]
    })
}
