use crate::ai_response::summary_prompt;
use crate::context::ConversationContext;
use crate::error::AIError;
use crate::message::{ChatMessage, Role};
use crate::settings::Settings;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use std::future::Future;
use tokio::time::{Duration, timeout};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// The text-generation backend narrating the game.
///
/// Implementations must answer [`AIError::NotConfigured`] straight away when
/// they have no credentials, so callers can tell it apart from a flaky
/// network.
pub trait GenerationService: Send + Sync {
    fn generate(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> impl Future<Output = Result<String, AIError>> + Send;

    fn summarize(
        &self,
        history: &[ChatMessage],
    ) -> impl Future<Output = Result<String, AIError>> + Send;
}

// Sampling parameters for one kind of request.
#[derive(Debug, Clone, Copy)]
struct Sampling {
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

const NARRATION: Sampling = Sampling {
    temperature: 0.7,
    top_p: 0.95,
    max_tokens: 1500,
};

const SUMMARY: Sampling = Sampling {
    temperature: 0.2,
    top_p: 0.95,
    max_tokens: 500,
};

#[derive(Clone)]
pub struct GameMasterAI {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    timeout: Duration,
}

impl GameMasterAI {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let client = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| Client::with_config(OpenAIConfig::new().with_api_key(key)));
        if client.is_none() {
            log::warn!("No OpenAI API key configured, the Game Master will stay silent");
        }
        Self {
            client,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.api_key(), settings.model.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        sampling: Sampling,
    ) -> Result<String, AIError> {
        let client = self.client.as_ref().ok_or(AIError::NotConfigured)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(sampling.temperature)
            .top_p(sampling.top_p)
            .max_completion_tokens(sampling.max_tokens)
            .build()?;

        log::debug!("Sending request to OpenAI with model {}", self.model);
        let response = timeout(self.timeout, client.chat().create(request))
            .await
            .map_err(|_| AIError::Timeout)??;
        log::debug!("Received response from OpenAI");

        response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AIError::EmptyResponse)
    }
}

impl GenerationService for GameMasterAI {
    async fn generate(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<String, AIError> {
        let messages = build_messages(message, context)?;
        self.complete(messages, NARRATION).await
    }

    async fn summarize(&self, history: &[ChatMessage]) -> Result<String, AIError> {
        let prompt = summary_prompt(&transcript(history));
        let messages = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into(),
        ];
        self.complete(messages, SUMMARY).await
    }
}

// System prompt, windowed player lines, windowed GM lines, then the new line.
fn build_messages(
    message: &str,
    context: &ConversationContext,
) -> Result<Vec<ChatCompletionRequestMessage>, AIError> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt(context)?)
            .build()?
            .into(),
    ];

    for past in context
        .last_user_messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
    {
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(past.content.clone())
                .build()?
                .into(),
        );
    }
    for past in context
        .last_gm_messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
    {
        messages.push(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(past.content.clone())
                .build()?
                .into(),
        );
    }
    if !message.trim().is_empty() {
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(message)
                .build()?
                .into(),
        );
    }
    Ok(messages)
}

pub fn system_prompt(context: &ConversationContext) -> Result<String, AIError> {
    let character = serde_json::to_string_pretty(&context.character_state)?;
    let game = &context.game_state;
    let latest_roll = game
        .current_roll
        .as_ref()
        .map(|roll| format!("Latest Dice Roll: {} rolled {}\n", roll.die, roll.outcome))
        .unwrap_or_default();
    let summary = context
        .conversation_summary
        .as_ref()
        .map(|summary| format!("CONVERSATION SUMMARY: {summary}\n\n"))
        .unwrap_or_default();

    Ok(format!(
        "You are the Game Master (GM) for a Dungeons & Dragons 5th Edition game. You will provide immersive, engaging narration and handle game mechanics according to D&D 5e rules.

CONTEXT (Only use this information, do not repeat it back to the player):
Character: {character}
Campaign: {}
Location: {}
Current Quest: {}
{latest_roll}
CRITICAL RULES:
1. NEVER make actions or decisions for the player. The player controls ALL character actions.
2. If the player tries to roll a dice at an inappropriate time, explain why a roll isn't needed right now.
3. Track the player's inventory, health, and resources based on their actions.

GAMEPLAY GUIDELINES:
1. Narrate the game world vividly, describing scenes, NPCs, and consequences of player actions.
2. When a check, save, or attack roll is needed, tell the player to roll the appropriate die and explain why.
3. For dice rolls, specify exactly which die should be rolled (d4, d6, d8, d10, d12, d20) and what type of check it is.

{summary}Now, continue the game based on the player's latest input.",
        game.campaign_name, game.current_location, game.current_quest
    ))
}

// "Player: …" / "GM: …" lines separated by blank lines.
pub fn transcript(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| {
            let speaker = match message.role {
                Role::User => "Player",
                Role::Assistant | Role::System => "GM",
            };
            format!("{speaker}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
