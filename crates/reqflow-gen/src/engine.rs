//! LLM invocation for decomposition requests.

use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use reqflow_core::AiSettings;

/// Decomposition output is a short JSON array; cap the response well below
/// provider defaults so a runaway completion fails fast instead of billing.
const MAX_OUTPUT_TOKENS: u32 = 1024;
/// Low temperature: decomposing the same row twice should give the same
/// children, not creative variations.
const TEMPERATURE: f32 = 0.2;

const SUPPORTED_PROVIDERS: [&str; 7] = [
    "openai", "anthropic", "google", "ollama", "groq", "mistral", "deepseek",
];

fn backend_for(provider: &str) -> Result<LLMBackend, String> {
    let backend = match provider {
        "openai" => LLMBackend::OpenAI,
        "anthropic" => LLMBackend::Anthropic,
        "google" => LLMBackend::Google,
        "ollama" => LLMBackend::Ollama,
        "groq" => LLMBackend::Groq,
        "mistral" => LLMBackend::Mistral,
        "deepseek" => LLMBackend::DeepSeek,
        other => {
            return Err(format!(
                "unsupported provider '{}' (expected one of: {})",
                other,
                SUPPORTED_PROVIDERS.join(", ")
            ))
        }
    };
    Ok(backend)
}

/// One decomposition round trip: system contract plus row summary in, raw
/// (hopefully JSON) text out. Errors name the provider so the surfaced
/// message tells the user which settings entry to fix.
pub async fn generate(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
) -> Result<String, String> {
    let mut builder = LLMBuilder::new()
        .backend(backend_for(&settings.provider)?)
        .model(&settings.model)
        .system(system)
        .max_tokens(MAX_OUTPUT_TOKENS)
        .temperature(TEMPERATURE);

    // Local ollama runs without a key.
    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }

    let llm = builder
        .build()
        .map_err(|e| format!("{} client setup failed: {e}", settings.provider))?;

    let messages = vec![ChatMessage::user().content(user_msg).build()];
    let response = llm
        .chat(&messages)
        .await
        .map_err(|e| format!("{} request failed: {e}", settings.provider))?;

    response
        .text()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| format!("{} returned an empty completion", settings.provider))
}
