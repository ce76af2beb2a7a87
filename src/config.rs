use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAP_TEMPLATE: &str = "Write a detail summary of this text section of a Drama in bullet points.
Make Sure its in netflix like plot.
Use '-' for bullet points and answer only the bullet points.
Text:
{text}

SUMMARY:";

pub const COMBINE_TEMPLATE: &str = "Combine these summaries of a Drama into a final summary in bullet points ONLY!
Make Sure its in netflix like plot.
Strictly Follow this pattern: Write '- Title: (Title of Key Point): \nSummary: (Summary of the Key Point)' for bullet points and answer only the bullet points.
Text:
{text}

FINAL SUMMARY:";

pub const QUESTION_TEMPLATE: &str = r#"Write a detailed summary (in bullet points, using "-" for bullets) of the following:
<text>
{text}
</text>

SUMMARY:"#;

pub const REFINE_TEMPLATE: &str = r#"Your job is to produce a final summary in bullet points (using "-" for bullets).
You are provided an existing summary here:
<existing_summary>
{existing_answer}
</existing_summary>

You are provided new text.
<new_text>
{text}
</new_text>

Given the new text, refine the original summary.
If the context isn't useful, return the original summary. Answer your summary only, not other texts.
Final Summary:
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Ollama,
    #[value(name = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    MapReduce,
    Refine,
}

/// A prompt with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.0.contains(&format!("{{{name}}}"))
    }

    /// Single pass, so substituted values are never themselves re-expanded.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let var = vars.iter().find(|(name, _)| {
                tail[1..].starts_with(name) && tail[1 + name.len()..].starts_with('}')
            });
            match var {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &tail[name.len() + 2..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);

        out
    }
}

/// Everything the pipeline needs, passed explicitly to each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: Provider,
    pub model: String,
    /// Ollama server address.
    pub base_url: String,
    /// Overrides the OpenAI API base; `None` uses the public endpoint.
    pub openai_api_base: Option<String>,
    /// Chunk budget, in tokens.
    pub chunk_size: usize,
    /// Chunk overlap, in tokens.
    pub overlap_size: usize,
    pub temperature: f32,
    pub mapreduce_num_predict: u32,
    pub refine_num_predict: u32,
    /// Reduce-phase input above this many tokens is collapsed in batches first.
    pub combine_token_max: usize,
    pub strategy: Strategy,
    /// Preferred transcript languages, in order. Empty accepts any language.
    pub languages: Vec<String>,
    pub map_template: PromptTemplate,
    pub combine_template: PromptTemplate,
    pub question_template: PromptTemplate,
    pub refine_template: PromptTemplate,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: "llama3.2".to_string(),
            base_url: "http://localhost:11434".to_string(),
            openai_api_base: None,
            chunk_size: 2000,
            overlap_size: 0,
            temperature: 0.5,
            mapreduce_num_predict: 512,
            refine_num_predict: 2048,
            combine_token_max: 3000,
            strategy: Strategy::MapReduce,
            languages: Vec::new(),
            map_template: PromptTemplate::new(MAP_TEMPLATE),
            combine_template: PromptTemplate::new(COMBINE_TEMPLATE),
            question_template: PromptTemplate::new(QUESTION_TEMPLATE),
            refine_template: PromptTemplate::new(REFINE_TEMPLATE),
        }
    }
}

impl Settings {
    /// Loads settings from a JSON file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::custom("chunk_size must be greater than zero"));
        }
        if self.overlap_size >= self.chunk_size {
            return Err(Error::custom(format!(
                "overlap_size ({}) must be smaller than chunk_size ({})",
                self.overlap_size, self.chunk_size
            )));
        }

        let templates = [
            ("map_template", &self.map_template),
            ("combine_template", &self.combine_template),
            ("question_template", &self.question_template),
            ("refine_template", &self.refine_template),
        ];
        for (name, template) in templates {
            if !template.has_placeholder("text") {
                return Err(Error::custom(format!("{name} is missing the {{text}} placeholder")));
            }
        }
        if !self.refine_template.has_placeholder("existing_answer") {
            return Err(Error::custom(
                "refine_template is missing the {existing_answer} placeholder",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().expect("defaults validate");
    }

    #[test]
    fn default_accepts_any_transcript_language() {
        assert!(Settings::default().languages.is_empty());
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let template = PromptTemplate::new("A {text} B {existing_answer} C {text}");
        let rendered = template.render(&[("text", "x"), ("existing_answer", "y")]);
        assert_eq!(rendered, "A x B y C x");
    }

    #[test]
    fn render_does_not_expand_inside_values() {
        let template = PromptTemplate::new("{existing_answer} | {text} | {unknown}");
        let rendered = template.render(&[("existing_answer", "has {text} inside"), ("text", "t")]);
        assert_eq!(rendered, "has {text} inside | t | {unknown}");
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let settings = Settings {
            map_template: PromptTemplate::new("no placeholder here"),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let settings = Settings {
            chunk_size: 100,
            overlap_size: 100,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"model": "mistral", "strategy": "refine"}"#).unwrap();
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.strategy, Strategy::Refine);
        assert_eq!(settings.chunk_size, 2000);
        assert_eq!(settings.provider, Provider::Ollama);
    }
}
