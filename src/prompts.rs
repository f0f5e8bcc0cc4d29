//! Prompts for LLM-based paraphrasing.
//!
//! The system prompt is assembled from a fixed frame plus one instruction per
//! style knob. Keeping the wording here means prompt regressions are caught
//! by unit tests without a live provider.
//!
//! Callers can override the whole system prompt via
//! [`crate::config::ParaphraseConfig::system_prompt`].

use crate::style::{Formality, StyleConfig, Tone};

/// Build the system prompt for the given style.
pub fn build_system_prompt(style: &StyleConfig) -> String {
    format!(
        "You are an expert document paraphraser. Your task is to rewrite text while:
- Maintaining the original meaning and key information
- {intensity}
- {tone}
- {formality}
- {formatting}
- Using clear, natural language
- Avoiding plagiarism by thoroughly rephrasing
- NOT adding information that wasn't in the original text
- NOT removing important details

Output ONLY the paraphrased text, without any preamble or explanation.",
        intensity = intensity_instructions(style.effective_intensity()),
        tone = tone_instructions(style.tone),
        formality = formality_instructions(style.formality),
        formatting = formatting_instructions(style.preserve_formatting),
    )
}

/// Build the user turn carrying the chunk text.
pub fn build_user_prompt(text: &str) -> String {
    format!("Please paraphrase the following text:\n\n{text}")
}

fn tone_instructions(tone: Tone) -> &'static str {
    match tone {
        Tone::Formal => {
            "Using a formal, professional tone suitable for academic or business contexts"
        }
        Tone::Casual => "Using a casual, conversational tone that is easy to read",
        Tone::Neutral => "Using a neutral, balanced tone",
    }
}

fn formality_instructions(formality: Formality) -> &'static str {
    match formality {
        Formality::High => "Employing sophisticated vocabulary and complex sentence structures",
        Formality::Low => "Using simple, straightforward language accessible to all readers",
        Formality::Medium => "Balancing clarity with appropriate vocabulary",
    }
}

fn formatting_instructions(preserve: bool) -> &'static str {
    if preserve {
        "Preserve the original document structure, including paragraph breaks, lists, and formatting cues."
    } else {
        "You may reorganize the text for better clarity, but maintain the overall meaning."
    }
}

fn intensity_instructions(level: u8) -> &'static str {
    match level {
        1 => "Making MINIMAL changes - keep most of the original wording intact, only changing absolutely necessary words to avoid plagiarism while staying very close to the source",
        2 => "Making LIGHT changes - modify sentence structures slightly and replace some vocabulary, but keep the writing style similar to the original",
        4 => "Making SUBSTANTIAL changes - significantly rephrase all content with different sentence structures, alternative vocabulary, and varied expression while preserving core meaning",
        5 => "Making COMPLETE rewrites - thoroughly transform the text with entirely different wording, creative sentence structures, and fresh expression while ensuring the same information is conveyed",
        _ => "Making MODERATE changes - rewrite sentences with different structures and varied vocabulary while maintaining the same meaning and tone",
    }
}
