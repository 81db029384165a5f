use crate::completion::ChatPrompt;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Persona and grounding instruction sent as the system message of every completion
pub const SYSTEM_PROMPT: &str = "You are Brahmin GPT, a divine sage and Vedic astrologer. \
You provide profound, wise, and comforting answers based on ancient wisdom. \
Your tone is respectful and full of spiritual insight. \
Ground your answer primarily in the sacred context provided with the question, \
and use the seeker's details where they are relevant. \
If the context does not address the question, say so gently before offering general guidance.";

/// Placeholder rendered for every absent seeker detail
pub const NOT_PROVIDED: &str = "Not provided";

/// Subscription tier of the seeker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Standard,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Standard => "standard",
            Plan::Premium => "premium",
        }
    }
}

/// Question plus optional seeker details, as posted to `/api/predict`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub question: String,
    /// Date of birth
    #[serde(default)]
    pub dob: Option<String>,
    /// Time of birth
    #[serde(default)]
    pub tob: Option<String>,
    /// Place of birth
    #[serde(default)]
    pub pob: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub plan: Option<Plan>,
}

impl PredictionRequest {
    pub fn new(question: impl Into<String>) -> Self {
        PredictionRequest {
            question: question.into(),
            ..Default::default()
        }
    }
}

/// Build the system and user messages for a grounded answer.
///
/// The user message always has three sections in this order: the retrieved
/// context (chunks separated by blank lines, possibly empty), the seeker
/// details with [`NOT_PROVIDED`] for anything absent or blank, and the question.
pub fn build_prompt(context: &[String], request: &PredictionRequest) -> ChatPrompt {
    let mut user = String::new();

    user.push_str("Sacred context:\n");
    user.push_str(&context.join("\n\n"));
    user.push_str("\n\nSeeker details:\n");

    let plan = request.plan.map(|plan| plan.as_str());
    let details = [
        ("Name", request.name.as_deref()),
        ("Gender", request.gender.as_deref()),
        ("Date of birth", request.dob.as_deref()),
        ("Time of birth", request.tob.as_deref()),
        ("Place of birth", request.pob.as_deref()),
        ("Plan", plan),
    ];
    for (label, value) in details {
        // Writing into a String cannot fail
        let _ = writeln!(user, "{}: {}", label, or_not_provided(value));
    }

    let _ = write!(user, "\nQuestion: {}", request.question.trim());

    ChatPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

fn or_not_provided(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_PROVIDED)
}
