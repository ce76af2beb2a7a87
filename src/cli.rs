use crate::config::{Provider, Settings, Strategy};
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plotline")]
#[command(about = "Summarize every video of a YouTube playlist into a spreadsheet")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub overrides: SettingsArgs,
}

/// Flags layered on top of the defaults and the optional config file.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// JSON settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model name passed to the provider
    #[arg(long, global = true, env = "PLOTLINE_MODEL")]
    pub model: Option<String>,

    /// Ollama server address
    #[arg(long, global = true, env = "PLOTLINE_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, global = true, value_enum, env = "PLOTLINE_PROVIDER")]
    pub provider: Option<Provider>,

    #[arg(long, global = true, value_enum)]
    pub strategy: Option<Strategy>,

    /// Chunk budget in tokens
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Preferred transcript languages (comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    pub languages: Option<Vec<String>>,
}

impl SettingsArgs {
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };

        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(provider) = self.provider {
            settings.provider = provider;
        }
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        if let Some(chunk_size) = self.chunk_size {
            settings.chunk_size = chunk_size;
        }
        if let Some(languages) = &self.languages {
            settings.languages = languages
                .iter()
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
                .collect();
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a whole playlist and export it to xlsx
    Run {
        /// YouTube playlist URL or playlist ID
        playlist_url: String,

        /// Output workbook
        #[arg(short, long, default_value = crate::core::DEFAULT_OUTPUT_FILE)]
        output: String,
    },

    /// Summarize a single video and print its key points
    Video {
        /// YouTube video URL
        url: String,
    },

    /// Extract key points from saved model output (`-` reads stdin)
    Parse {
        input: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Open TUI interface
    Tui,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "plotline",
            "--model",
            "mistral",
            "--strategy",
            "refine",
            "--languages",
            "de, en",
            "run",
            "PL123",
        ])
        .unwrap();

        let settings = cli.overrides.resolve().unwrap();
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.strategy, Strategy::Refine);
        assert_eq!(settings.languages, vec!["de", "en"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Run { ref output, .. }) if output == crate::core::DEFAULT_OUTPUT_FILE
        ));
    }

    #[test]
    fn invalid_chunk_size_is_rejected() {
        let args = SettingsArgs {
            chunk_size: Some(0),
            ..SettingsArgs::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["plotline"]).unwrap();
        assert!(cli.command.is_none());
    }
}
