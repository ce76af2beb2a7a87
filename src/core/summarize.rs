use crate::config::{Provider, Settings, Strategy};
use crate::core::chunking::{TextSplitter, TokenCounter, Tokenizer, context_window_for};
use crate::error::{Error, Result};
use async_openai::{
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, OutputItem,
        OutputMessageContent, Role,
    },
};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::Future;

const OPENAI_OPT_IN_ENV: &str = "PLOTLINE_ALLOW_OPENAI";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub num_ctx: usize,
    pub num_predict: u32,
}

/// A single prompt-in, text-out model call.
pub trait Completion {
    fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Turns a full transcript into the model's final bullet output.
pub trait Summarizer {
    fn summarize(&self, text: &str) -> impl Future<Output = Result<String>> + Send;
}

// region:    --- Ollama

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_ctx: usize,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

impl Completion for OllamaClient {
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: options.temperature,
                num_ctx: options.num_ctx,
                num_predict: options.num_predict,
            },
        };

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to reach Ollama"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::custom(format!("Ollama error: {status} - {message}")));
        }

        let response = resp.json::<ChatResponse>().await?;
        Ok(response.message.content)
    }
}

// endregion: --- Ollama

// region:    --- OpenAI

#[derive(Clone)]
pub struct OpenAiClient {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_base: Option<&str>, model: impl Into<String>) -> Self {
        let mut config = OpenAIConfig::new();
        if let Some(api_base) = api_base {
            config = config.with_api_base(api_base);
        }

        Self {
            client: async_openai::Client::with_config(config),
            model: model.into(),
        }
    }
}

impl Completion for OpenAiClient {
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        enforce_openai_opt_in()?;

        let request = CreateResponseArgs::default()
            .model(self.model.as_str())
            .max_output_tokens(options.num_predict)
            .temperature(options.temperature)
            .input(InputParam::Items(vec![InputItem::EasyMessage(
                EasyInputMessageArgs::default()
                    .role(Role::User)
                    .content(prompt)
                    .build()?,
            )]))
            .build()?;

        let response = self.client.responses().create(request).await?;

        let mut content = String::new();
        for output in response.output {
            if let OutputItem::Message(out) = output {
                for c in out.content {
                    match c {
                        OutputMessageContent::OutputText(text) => content.push_str(&text.text),
                        _ => tracing::warn!(content = ?c, "Unexpected content type"),
                    }
                }
            }
        }

        Ok(content)
    }
}

fn enforce_openai_opt_in() -> Result<()> {
    match env::var(OPENAI_OPT_IN_ENV) {
        Ok(val)
            if matches!(
                val.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ) =>
        {
            Ok(())
        }
        _ => Err(Error::custom(format!(
            "Summarizing with OpenAI requires explicit opt-in. Set {OPENAI_OPT_IN_ENV}=1 to enable uploads to OpenAI."
        ))),
    }
}

// endregion: --- OpenAI

/// Provider picked at runtime from [`Settings::provider`].
#[derive(Clone)]
pub enum CompletionBackend {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
}

impl CompletionBackend {
    pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Self {
        match settings.provider {
            Provider::Ollama => {
                Self::Ollama(OllamaClient::new(client, &settings.base_url, &settings.model))
            }
            Provider::OpenAi => Self::OpenAi(OpenAiClient::new(
                settings.openai_api_base.as_deref(),
                &settings.model,
            )),
        }
    }
}

impl Completion for CompletionBackend {
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        match self {
            Self::Ollama(client) => client.complete(prompt, options).await,
            Self::OpenAi(client) => client.complete(prompt, options).await,
        }
    }
}

/// Chunked summarization: map-reduce (map each chunk, then combine) or
/// refine (fold chunks into a running answer).
pub struct ChainSummarizer<C, K = Tokenizer> {
    completion: C,
    splitter: TextSplitter<K>,
    settings: Settings,
}

impl<C, K> ChainSummarizer<C, K>
where
    C: Completion + Sync,
    K: TokenCounter + Sync,
{
    pub fn new(completion: C, counter: K, settings: Settings) -> Self {
        let splitter = TextSplitter::new(counter, settings.chunk_size, settings.overlap_size);
        Self {
            completion,
            splitter,
            settings,
        }
    }

    #[tracing::instrument(skip_all, fields(chunks = chunks.len()))]
    async fn map_reduce(&self, chunks: Vec<String>) -> Result<String> {
        let options = CompletionOptions {
            temperature: self.settings.temperature,
            num_ctx: context_window_for(
                self.settings.mapreduce_num_predict as usize + self.settings.chunk_size,
            )?,
            num_predict: self.settings.mapreduce_num_predict,
        };

        let mut summaries = Vec::with_capacity(chunks.len());
        for (idx, chunk) in chunks.iter().enumerate() {
            let prompt = self.settings.map_template.render(&[("text", chunk)]);
            let summary = self.completion.complete(&prompt, options).await?;
            tracing::debug!(chunk = idx + 1, "Mapped chunk");
            summaries.push(summary);
        }

        let summaries = self.collapse(summaries, options).await?;
        let prompt = self
            .settings
            .combine_template
            .render(&[("text", &summaries.join("\n\n"))]);
        self.completion.complete(&prompt, options).await
    }

    /// Shrinks the map outputs until they fit `combine_token_max`, by combining
    /// them in batches that each fit.
    async fn collapse(
        &self,
        mut summaries: Vec<String>,
        options: CompletionOptions,
    ) -> Result<Vec<String>> {
        let counter = self.splitter.counter();
        let limit = self.settings.combine_token_max;

        while summaries.len() > 1 && counter.count(&summaries.join("\n\n")) > limit {
            let batches = batch_by_tokens(&summaries, limit, counter);
            if batches.len() == summaries.len() {
                tracing::warn!(
                    summaries = summaries.len(),
                    limit,
                    "Map outputs cannot be collapsed further"
                );
                break;
            }

            tracing::debug!(from = summaries.len(), to = batches.len(), "Collapsing map outputs");
            let mut collapsed = Vec::with_capacity(batches.len());
            for batch in batches {
                let prompt = self
                    .settings
                    .combine_template
                    .render(&[("text", &batch.join("\n\n"))]);
                collapsed.push(self.completion.complete(&prompt, options).await?);
            }
            summaries = collapsed;
        }

        Ok(summaries)
    }

    #[tracing::instrument(skip_all, fields(chunks = chunks.len()))]
    async fn refine(&self, chunks: Vec<String>) -> Result<String> {
        let options = CompletionOptions {
            temperature: self.settings.temperature,
            num_ctx: context_window_for(
                self.settings.refine_num_predict as usize + self.settings.chunk_size,
            )?,
            num_predict: self.settings.refine_num_predict,
        };

        let mut chunks = chunks.into_iter();
        let first = chunks
            .next()
            .ok_or_else(|| Error::custom("Nothing to summarize"))?;

        let prompt = self.settings.question_template.render(&[("text", &first)]);
        let mut answer = self.completion.complete(&prompt, options).await?;

        for chunk in chunks {
            let prompt = self
                .settings
                .refine_template
                .render(&[("existing_answer", &answer), ("text", &chunk)]);
            answer = self.completion.complete(&prompt, options).await?;
        }

        Ok(answer)
    }
}

impl<C, K> Summarizer for ChainSummarizer<C, K>
where
    C: Completion + Sync,
    K: TokenCounter + Sync,
{
    async fn summarize(&self, text: &str) -> Result<String> {
        let chunks = self.splitter.split(text)?;
        if chunks.is_empty() {
            return Err(Error::custom("Nothing to summarize"));
        }
        tracing::info!(chunks = chunks.len(), strategy = ?self.settings.strategy, "Summarizing transcript");

        let output = match self.settings.strategy {
            Strategy::MapReduce => self.map_reduce(chunks).await?,
            Strategy::Refine => self.refine(chunks).await?,
        };
        tracing::debug!(output = %output, "Summary output");

        Ok(output)
    }
}

/// Groups consecutive texts so each group's joined size stays within `limit`;
/// a single oversized text gets a group of its own.
fn batch_by_tokens<K: TokenCounter>(texts: &[String], limit: usize, counter: &K) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut total = 0;

    for text in texts {
        let len = counter.count(text);
        if !current.is_empty() && total + len > limit {
            batches.push(std::mem::take(&mut current));
            total = 0;
        }
        current.push(text.clone());
        total += len;
    }
    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptTemplate;
    use crate::core::chunking::tests::WordCounter;
    use std::sync::{Arc, Mutex};

    /// Replies with "out:<n>" for the n-th call and records every prompt.
    #[derive(Clone, Default)]
    struct RecordingCompletion {
        prompts: Arc<Mutex<Vec<String>>>,
        options: Arc<Mutex<Vec<CompletionOptions>>>,
    }

    impl Completion for RecordingCompletion {
        async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            self.options.lock().unwrap().push(options);
            Ok(format!("out:{}", prompts.len()))
        }
    }

    fn settings(strategy: Strategy) -> Settings {
        Settings {
            chunk_size: 5,
            strategy,
            map_template: PromptTemplate::new("MAP[{text}]"),
            combine_template: PromptTemplate::new("COMBINE[{text}]"),
            question_template: PromptTemplate::new("Q[{text}]"),
            refine_template: PromptTemplate::new("R[{existing_answer}|{text}]"),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn map_reduce_maps_each_chunk_then_combines_once() {
        let completion = RecordingCompletion::default();
        let prompts = completion.prompts.clone();
        let options = completion.options.clone();
        let summarizer =
            ChainSummarizer::new(completion, WordCounter, settings(Strategy::MapReduce));

        let output = summarizer
            .summarize("a b c d e f g h i j k l")
            .await
            .unwrap();

        let prompts = prompts.lock().unwrap();
        assert_eq!(
            *prompts,
            vec![
                "MAP[a b c d e]",
                "MAP[f g h i j]",
                "MAP[k l]",
                "COMBINE[out:1\n\nout:2\n\nout:3]",
            ]
        );
        assert_eq!(output, "out:4");

        let options = options.lock().unwrap();
        assert!(options.iter().all(|o| o.num_predict == 512 && o.num_ctx == 1024));
    }

    #[tokio::test]
    async fn collapses_map_outputs_over_the_token_limit() {
        let completion = RecordingCompletion::default();
        let prompts = completion.prompts.clone();
        let settings = Settings {
            combine_token_max: 2,
            ..settings(Strategy::MapReduce)
        };
        let summarizer = ChainSummarizer::new(completion, WordCounter, settings);

        summarizer.summarize("a b c d e f g h i j k l").await.unwrap();

        let prompts = prompts.lock().unwrap();
        // 3 maps, 2 collapse batches, 1 final combine.
        assert_eq!(prompts.len(), 6);
        assert_eq!(prompts[3], "COMBINE[out:1\n\nout:2]");
        assert_eq!(prompts[4], "COMBINE[out:3]");
        assert_eq!(prompts[5], "COMBINE[out:4\n\nout:5]");
    }

    #[tokio::test]
    async fn refine_folds_chunks_into_running_answer() {
        let completion = RecordingCompletion::default();
        let prompts = completion.prompts.clone();
        let summarizer = ChainSummarizer::new(completion, WordCounter, settings(Strategy::Refine));

        let output = summarizer.summarize("a b c d e f g h").await.unwrap();

        let prompts = prompts.lock().unwrap();
        assert_eq!(*prompts, vec!["Q[a b c d e]", "R[out:1|f g h]"]);
        assert_eq!(output, "out:2");
    }

    #[tokio::test]
    async fn empty_transcript_is_an_error() {
        let summarizer = ChainSummarizer::new(
            RecordingCompletion::default(),
            WordCounter,
            settings(Strategy::MapReduce),
        );
        assert!(summarizer.summarize("   ").await.is_err());
    }

    #[test]
    fn batches_stay_within_limit() {
        let texts: Vec<String> = ["a b", "c", "d e f", "g"].iter().map(|s| s.to_string()).collect();
        let batches = batch_by_tokens(&texts, 3, &WordCounter);
        assert_eq!(
            batches,
            vec![
                vec!["a b".to_string(), "c".to_string()],
                vec!["d e f".to_string()],
                vec!["g".to_string()],
            ]
        );
    }
}
