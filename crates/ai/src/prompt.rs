//! Prompt assembly.

use composite_core::{ModelConfig, RagDocument};

/// Characters of each document shown in the system prompt.
pub const SNIPPET_CHARS: usize = 200;

/// System prompt describing the model and the retrieved documents.
pub fn build_system_prompt(
    config: &ModelConfig,
    rag_context: &[RagDocument],
    additional_context: Option<&serde_json::Value>,
) -> String {
    let caps = &config.capabilities;
    let mut prompt = format!(
        "You are {}, a composite coding model (version {}).\n\
         Context window: {} tokens. Tool calling: {}. Multimodal input: {}.\n",
        config.name,
        config.version,
        caps.max_context_length,
        yes_no(caps.supports_tool_calling),
        yes_no(caps.supports_multimodal),
    );

    if !caps.optimal_for_tasks.is_empty() {
        prompt.push_str(&format!(
            "You are best at: {}.\n",
            caps.optimal_for_tasks.join(", ")
        ));
    }

    if !rag_context.is_empty() {
        prompt.push_str("\nRelevant project documents:\n");
        for (i, doc) in rag_context.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. {} (relevance {:.2}): {}\n",
                i + 1,
                doc.display_title(),
                doc.relevance(),
                snippet(&doc.content, SNIPPET_CHARS)
            ));
        }
        prompt.push_str("Use these documents when they apply to the request.\n");
    }

    if let Some(extra) = additional_context.filter(|v| !v.is_null()) {
        prompt.push_str("\nAdditional context:\n");
        match extra.as_str() {
            Some(text) => prompt.push_str(text),
            None => prompt.push_str(&extra.to_string()),
        }
        prompt.push('\n');
    }

    prompt
}

/// User prompt: the raw query, or a context block followed by the query
/// when documents were retrieved.
pub fn build_user_prompt(query: &str, rag_context: &[RagDocument]) -> String {
    if rag_context.is_empty() {
        return query.to_string();
    }

    let mut prompt = String::from("Context:\n");
    for doc in rag_context {
        prompt.push_str(&format!("--- {} ---\n{}\n", doc.display_title(), doc.content.trim_end()));
    }
    prompt.push_str("\nRequest:\n");
    prompt.push_str(query);
    prompt
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// First `max` characters of `text` on one line, with an ellipsis when cut.
pub fn snippet(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composite_core::{BaseModel, ModelCapabilities, Provider};

    fn config() -> ModelConfig {
        ModelConfig {
            name: "composite-mid".to_string(),
            version: "1.0.0".to_string(),
            base_model: BaseModel {
                provider: Provider::OpenAi,
                model_id: "gpt-4o".to_string(),
                temperature: 0.7,
                max_tokens: 4096,
            },
            rag_enabled: true,
            post_processing_enabled: true,
            capabilities: ModelCapabilities {
                max_context_length: 128_000,
                supports_tool_calling: true,
                supports_streaming: true,
                supports_multimodal: false,
                optimal_for_tasks: vec!["code generation".to_string(), "debugging".to_string()],
            },
        }
    }

    #[test]
    fn test_user_prompt_unchanged_without_context() {
        assert_eq!(build_user_prompt("make a form", &[]), "make a form");
    }

    #[test]
    fn test_user_prompt_with_context_block() {
        let docs = vec![RagDocument::new("d1", "export const Button = () => null;\n").with_title("Button.tsx")];
        assert_eq!(
            build_user_prompt("make a form", &docs),
            "Context:\n--- Button.tsx ---\nexport const Button = () => null;\n\nRequest:\nmake a form"
        );
    }

    #[test]
    fn test_system_prompt_lists_capabilities_and_documents() {
        let mut doc = RagDocument::new("d1", "line one\nline two").with_title("Notes");
        doc.metadata.relevance_score = Some(0.8);
        let prompt = build_system_prompt(&config(), &[doc], Some(&serde_json::json!("Use Tailwind")));

        assert!(prompt.contains("composite-mid"));
        assert!(prompt.contains("128000 tokens"));
        assert!(prompt.contains("You are best at: code generation, debugging."));
        assert!(prompt.contains("1. Notes (relevance 0.80): line one line two"));
        assert!(prompt.ends_with("Additional context:\nUse Tailwind\n"));
    }

    #[test]
    fn test_snippet_cuts_on_char_boundary() {
        assert_eq!(snippet("héllo wörld", 4), "héll...");
        assert_eq!(snippet("short", 10), "short");
    }
}
