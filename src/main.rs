mod cli;
mod config;
mod core;
mod error;
mod tui;

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::core::{
    DriverEvent, KeyPoint, VideoOutcome, live_driver, normalize_output_path, parse_key_points,
};
use crate::error::{Error, Result};
use crate::tui::{App, EventHandler, Tui, init as tui_init, restore as tui_restore, ui};
use clap::Parser;
use std::io::Read;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "plotline=info";
const TUI_LOG_FILE: &str = "plotline.log";
const WRAP_WIDTH: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            playlist_url,
            output,
        }) => {
            init_tracing(false)?;
            let settings = cli.overrides.resolve()?;
            run_cli_playlist(settings, &playlist_url, &output).await?;
        }
        Some(Commands::Video { url }) => {
            init_tracing(false)?;
            let settings = cli.overrides.resolve()?;
            run_cli_video(settings, &url).await?;
        }
        Some(Commands::Parse { input, json }) => {
            init_tracing(false)?;
            run_cli_parse(&input, json)?;
        }
        Some(Commands::Tui) | None => {
            init_tracing(true)?;
            let settings = cli.overrides.resolve()?;
            run_tui(settings).await?;
        }
    }

    Ok(())
}

/// The TUI owns the terminal, so its logs go to a file instead of stderr.
fn init_tracing(to_file: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    if to_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(TUI_LOG_FILE)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

async fn run_cli_playlist(settings: Settings, playlist_url: &str, output: &str) -> Result<()> {
    let output = normalize_output_path(output);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let driver = live_driver(settings)?.with_events(tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                DriverEvent::Started { total } => println!("Found {total} videos"),
                DriverEvent::VideoStarted {
                    index,
                    total,
                    video_url,
                } => println!("[{index}/{total}] {video_url}"),
                DriverEvent::Log(line) => println!("  {line}"),
                DriverEvent::Exported { path } => {
                    println!("Summary saved to: {}", path.display())
                }
                DriverEvent::Completed {
                    summarized,
                    skipped,
                    failed,
                } => println!("Done: {summarized} summarized, {skipped} skipped, {failed} failed"),
                DriverEvent::Aborted(reason) => eprintln!("Error: {reason}"),
                DriverEvent::VideoFinished { .. } => {}
            }
        }
    });

    let result = driver.run_and_export(playlist_url, &output).await;
    // Dropping the driver closes the channel so the printer can finish.
    drop(driver);
    printer.await.map_err(Error::custom_from_err)?;

    result.map(|_| ())
}

async fn run_cli_video(settings: Settings, video_url: &str) -> Result<()> {
    println!("Processing video: {video_url}");
    let driver = live_driver(settings)?;

    match driver.process_video(video_url).await {
        VideoOutcome::Success(record) => {
            println!("{}", record.title);
            println!();
            print_key_points(&record.key_points);
            Ok(())
        }
        VideoOutcome::Skipped { reason, .. } => {
            println!("Skipped: {reason}");
            Ok(())
        }
        VideoOutcome::Failed { reason, .. } => Err(Error::custom(reason)),
    }
}

fn run_cli_parse(input: &str, json: bool) -> Result<()> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };

    let key_points = parse_key_points(&text);
    if json {
        println!("{}", serde_json::to_string_pretty(&key_points)?);
    } else if key_points.is_empty() {
        println!("No key points found.");
    } else {
        print_key_points(&key_points);
    }

    Ok(())
}

fn print_key_points(key_points: &[KeyPoint]) {
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent("    ")
        .subsequent_indent("    ");

    for (idx, point) in key_points.iter().enumerate() {
        println!("{}. {}", idx + 1, point.title);
        println!("{}", textwrap::fill(&point.summary, &options));
        println!();
    }
}

async fn run_tui(settings: Settings) -> Result<()> {
    let mut terminal = tui_init()?;

    let mut app = App::new(settings);
    let event_handler = EventHandler::new();

    let result = run_event_loop(&mut terminal, &mut app, &event_handler);

    tui_restore()?;
    result
}

fn run_event_loop(terminal: &mut Tui, app: &mut App, event_handler: &EventHandler) -> Result<()> {
    loop {
        let event = event_handler.next_event()?;
        app.handle_event(event)?;

        terminal.draw(|f| {
            ui::draw(f, app);
        })?;

        if app.should_quit {
            return Ok(());
        }
    }
}
