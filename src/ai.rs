use serde::{Deserialize, Serialize};
use std::env;
use std::process::{Command, Stdio};

use crate::error::{CampusError, CampusResult};
use crate::models::User;

const MAX_TOKENS: u32 = 2048;

/// A stateless text completion backend.
pub trait AIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> CampusResult<String>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
    ClaudeCode,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

// (aliases, provider, model id); the first alias is the canonical short name
const MODELS: &[(&[&str], ProviderKind, &str)] = &[
    (&["claude-sonnet", "sonnet"], ProviderKind::ClaudeCode, "claude-sonnet-4-5-20250929"),
    (&["claude-opus", "opus"], ProviderKind::ClaudeCode, "claude-opus-4-6"),
    (&["claude-haiku", "haiku"], ProviderKind::ClaudeCode, "claude-haiku-4-5-20251001"),
    (&["api-sonnet"], ProviderKind::Anthropic, "claude-sonnet-4-5-20250929"),
    (&["api-opus"], ProviderKind::Anthropic, "claude-opus-4-6"),
    (&["api-haiku"], ProviderKind::Anthropic, "claude-haiku-4-5-20251001"),
    (&["gpt-5.2", "gpt5"], ProviderKind::OpenAI, "gpt-5.2"),
    (&["gpt-4o"], ProviderKind::OpenAI, "gpt-4o"),
    (&["o3"], ProviderKind::OpenAI, "o3"),
];

pub fn resolve_model(name: &str) -> CampusResult<ModelSpec> {
    let wanted = name.trim().to_lowercase();
    MODELS
        .iter()
        .find(|(aliases, _, _)| aliases.contains(&wanted.as_str()))
        .map(|(aliases, provider, model_id)| ModelSpec {
            provider: *provider,
            model_id: model_id.to_string(),
            short_name: aliases[0].to_string(),
        })
        .ok_or_else(|| {
            let known: Vec<&str> = MODELS.iter().map(|(aliases, _, _)| aliases[0]).collect();
            CampusError::validation(format!(
                "unknown model '{}' (available: {})",
                name,
                known.join(", ")
            ))
        })
}

pub fn create_provider(spec: &ModelSpec) -> CampusResult<Box<dyn AIProvider>> {
    let model_id = spec.model_id.clone();
    let provider: Box<dyn AIProvider> = match spec.provider {
        ProviderKind::ClaudeCode => Box::new(ClaudeCodeProvider::new(model_id)?),
        ProviderKind::Anthropic => {
            Box::new(AnthropicProvider::from_key(model_id, env::var("ANTHROPIC_API_KEY").ok())?)
        }
        ProviderKind::OpenAI => {
            Box::new(OpenAIProvider::from_key(model_id, env::var("OPENAI_API_KEY").ok())?)
        }
    };
    Ok(provider)
}

fn require_key(key: Option<String>, var: &str) -> CampusResult<String> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or_else(|| CampusError::Llm(format!("{} is not set; export it or pick another --model", var)))
}

fn llm_error(provider: &str, detail: impl std::fmt::Display) -> CampusError {
    CampusError::Llm(format!("{}: {}", provider, detail))
}

// --- Anthropic ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatTurn<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn from_key(model_id: String, api_key: Option<String>) -> CampusResult<Self> {
        Ok(Self {
            api_key: require_key(api_key, "ANTHROPIC_API_KEY")?,
            model_id,
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> CampusResult<String> {
        let body = CompletionRequest {
            model: &self.model_id,
            max_tokens,
            messages: vec![ChatTurn {
                role: "user",
                content: prompt,
            }],
        };
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .map_err(|e| llm_error("anthropic", e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(llm_error("anthropic", format!("HTTP {}: {}", status, detail)));
        }
        let parsed: AnthropicResponse = response.json().map_err(|e| llm_error("anthropic", e))?;
        let text: String = parsed.content.into_iter().map(|b| b.text).collect();
        if text.trim().is_empty() {
            return Err(llm_error("anthropic", "empty response"));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn from_key(model_id: String, api_key: Option<String>) -> CampusResult<Self> {
        Ok(Self {
            api_key: require_key(api_key, "OPENAI_API_KEY")?,
            model_id,
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> CampusResult<String> {
        let body = CompletionRequest {
            model: &self.model_id,
            max_tokens,
            messages: vec![ChatTurn {
                role: "user",
                content: prompt,
            }],
        };
        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| llm_error("openai", e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(llm_error("openai", format!("HTTP {}: {}", status, detail)));
        }
        let parsed: OpenAIResponse = response.json().map_err(|e| llm_error("openai", e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| llm_error("openai", "no choices in response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- `claude` CLI ---

pub struct ClaudeCodeProvider {
    model_id: String,
}

impl ClaudeCodeProvider {
    pub fn new(model_id: String) -> CampusResult<Self> {
        Command::new("claude")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|_| {
                CampusError::Llm(
                    "'claude' CLI not found; install it or use --model api-sonnet / gpt-4o".into(),
                )
            })?;
        Ok(Self { model_id })
    }
}

impl AIProvider for ClaudeCodeProvider {
    fn complete(&self, prompt: &str, _max_tokens: u32) -> CampusResult<String> {
        let output = Command::new("claude")
            .args(["-p", prompt, "--model", self.model_id.as_str()])
            .output()
            .map_err(|e| llm_error("claude", e))?;
        if !output.status.success() {
            return Err(llm_error("claude", String::from_utf8_lossy(&output.stderr).trim()));
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(llm_error("claude", "empty response"));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Campus assistant ---

/// Starter questions shown before the first message.
pub const SUGGESTED_PROMPTS: &[(&str, &str)] = &[
    ("Campus Info", "Tell me about hostels and campus facilities"),
    ("Resume Review", "How can I improve my resume for software engineering roles?"),
    ("Interview Prep", "Give me tips for preparing for technical interviews"),
    ("Career Path", "What career paths should I consider as a CSE student?"),
];

fn or_unspecified(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("Not specified")
}

/// Wraps a question with the assistant persona and what we know about the
/// asker.
pub fn assistant_prompt(user: Option<&User>, question: &str) -> String {
    let context = match user {
        Some(u) => {
            let skills = u.skills.join(", ");
            format!(
                "- Name: {}\n- Branch: {}\n- Year: {}\n- Skills: {}",
                u.full_name,
                or_unspecified(u.branch.as_deref()),
                or_unspecified(u.year.as_deref()),
                or_unspecified(Some(skills.as_str())),
            )
        }
        None => "User information not available".to_string(),
    };
    format!(
        "You are an AI assistant for students of our institute. You help with campus life, \
         career guidance, academic advice, and placement preparation.\n\n\
         User context:\n{}\n\n\
         Provide helpful, accurate, and encouraging responses. If you don't know specific \
         campus information, be honest about it.\n\n\
         User question: {}",
        context, question
    )
}

/// One stateless LLM call. `add_context_from_internet` asks the model to
/// lean on current public information; the providers here have no browsing
/// of their own.
pub fn invoke(
    provider: &dyn AIProvider,
    prompt: &str,
    add_context_from_internet: bool,
) -> CampusResult<String> {
    if prompt.trim().is_empty() {
        return Err(CampusError::validation("ask a question first"));
    }
    let prompt = if add_context_from_internet {
        format!(
            "{}\n\nWhere it helps, draw on current, publicly available information.",
            prompt
        )
    } else {
        prompt.to_string()
    };
    tracing::debug!(model = provider.model_name(), chars = prompt.len(), "invoking llm");
    provider.complete(&prompt, MAX_TOKENS)
}

/// Asks the campus assistant a question on behalf of `user`.
pub fn ask(provider: &dyn AIProvider, user: Option<&User>, question: &str) -> CampusResult<String> {
    if question.trim().is_empty() {
        return Err(CampusError::validation("ask a question first"));
    }
    invoke(provider, &assistant_prompt(user, question.trim()), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeProvider {
        prompts: RefCell<Vec<String>>,
        reply: CampusResult<String>,
    }

    impl FakeProvider {
        fn replying(reply: CampusResult<String>) -> Self {
            Self {
                prompts: RefCell::new(Vec::new()),
                reply,
            }
        }
    }

    impl AIProvider for FakeProvider {
        fn complete(&self, prompt: &str, _max_tokens: u32) -> CampusResult<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(CampusError::Llm(e.to_string())),
            }
        }

        fn model_name(&self) -> &str {
            "fake"
        }
    }

    #[test]
    fn test_resolve_model_aliases() {
        let spec = resolve_model("sonnet").unwrap();
        assert_eq!(spec.short_name, "claude-sonnet");
        assert_eq!(spec.provider, ProviderKind::ClaudeCode);

        let spec = resolve_model("API-Opus").unwrap();
        assert_eq!(spec.model_id, "claude-opus-4-6");
        assert_eq!(spec.provider, ProviderKind::Anthropic);

        let spec = resolve_model("gpt5").unwrap();
        assert_eq!(spec.short_name, "gpt-5.2");
        assert_eq!(spec.provider, ProviderKind::OpenAI);
    }

    #[test]
    fn test_resolve_model_unknown() {
        let err = resolve_model("gpt-3").unwrap_err();
        assert!(err.to_string().contains("claude-sonnet"));
    }

    #[test]
    fn test_providers_require_api_key() {
        let err = AnthropicProvider::from_key("m".into(), None).err().unwrap();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
        let err = OpenAIProvider::from_key("m".into(), Some("  ".into())).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        let ok = AnthropicProvider::from_key("claude-x".into(), Some("k".into())).unwrap();
        assert_eq!(ok.model_name(), "claude-x");
    }

    #[test]
    fn test_prompt_embeds_user_context() {
        let user = User {
            full_name: "Asha".into(),
            branch: Some("IT".into()),
            skills: vec!["Rust".into(), "SQL".into()],
            ..Default::default()
        };
        let prompt = assistant_prompt(Some(&user), "Which electives?");
        assert!(prompt.contains("- Name: Asha"));
        assert!(prompt.contains("- Branch: IT"));
        assert!(prompt.contains("- Year: Not specified"));
        assert!(prompt.contains("- Skills: Rust, SQL"));
        assert!(prompt.ends_with("User question: Which electives?"));

        let anonymous = assistant_prompt(None, "Hi");
        assert!(anonymous.contains("User information not available"));
    }

    #[test]
    fn test_ask_goes_through_provider() {
        let provider = FakeProvider::replying(Ok("Try the DSA sheet.".into()));
        let answer = ask(&provider, None, "  How to start DSA? ").unwrap();
        assert_eq!(answer, "Try the DSA sheet.");
        let sent = provider.prompts.borrow();
        assert!(sent[0].contains("User question: How to start DSA?"));
        assert!(sent[0].contains("publicly available information"));
    }

    #[test]
    fn test_ask_rejects_blank_and_surfaces_provider_errors() {
        let provider = FakeProvider::replying(Err(CampusError::Llm("rate limited".into())));
        assert!(matches!(ask(&provider, None, " "), Err(CampusError::Validation(_))));
        assert!(provider.prompts.borrow().is_empty());
        assert!(matches!(ask(&provider, None, "Hi"), Err(CampusError::Llm(_))));
    }

    #[test]
    fn test_invoke_without_internet_context_passes_prompt_through() {
        let provider = FakeProvider::replying(Ok("ok".into()));
        invoke(&provider, "plain", false).unwrap();
        assert_eq!(provider.prompts.borrow()[0], "plain");
    }
}
