use crate::config::Settings;
use crate::core::{DEFAULT_OUTPUT_FILE, DriverEvent, OutcomeKind, live_driver, normalize_output_path};
use crate::error::Result;
use crate::tui::components::{InputField, ProgressBar};
use crate::tui::events::AppEvent;
use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc::{self, error::TryRecvError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    /// A run is in flight; the form is locked until it reports back.
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Url,
    Output,
    Button,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Url => Focus::Output,
            Focus::Output => Focus::Button,
            Focus::Button => Focus::Url,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Url => Focus::Button,
            Focus::Output => Focus::Url,
            Focus::Button => Focus::Output,
        }
    }
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,

    pub url_input: InputField,
    pub output_input: InputField,
    pub focus: Focus,

    pub progress_bar: ProgressBar,
    total_videos: usize,

    settings: Settings,
    pub events_rx: Option<mpsc::UnboundedReceiver<DriverEvent>>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let mut url_input = InputField::new(
            "YouTube Playlist URL",
            "https://www.youtube.com/playlist?list=...",
        );
        url_input.focused = true;

        let mut output_input = InputField::new("Output File", DEFAULT_OUTPUT_FILE);
        output_input.set_value(DEFAULT_OUTPUT_FILE);

        Self {
            state: AppState::Idle,
            should_quit: false,

            url_input,
            output_input,
            focus: Focus::Url,

            progress_bar: ProgressBar::new(),
            total_videos: 0,

            settings,
            events_rx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == AppState::Running
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Key(key) => {
                self.handle_key(key);
            }
            AppEvent::Tick => {
                self.handle_tick();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // Runs cannot be cancelled; only Ctrl-C gets out while one is in flight.
        if self.is_running() {
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.set_focus(self.focus.next()),
            KeyCode::BackTab | KeyCode::Up => self.set_focus(self.focus.prev()),
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('q') if self.focus == Focus::Button => self.should_quit = true,
            KeyCode::Enter | KeyCode::Char(' ') if self.focus == Focus::Button => {
                self.start_run();
            }
            KeyCode::Enter => self.set_focus(self.focus.next()),
            _ => match self.focus {
                Focus::Url => {
                    self.url_input.handle_key(key);
                }
                Focus::Output => {
                    self.output_input.handle_key(key);
                }
                Focus::Button => {}
            },
        }
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.url_input.focused = focus == Focus::Url;
        self.output_input.focused = focus == Focus::Output;
    }

    fn set_locked(&mut self, locked: bool) {
        self.url_input.locked = locked;
        self.output_input.locked = locked;
    }

    fn start_run(&mut self) {
        if !self.url_input.is_valid() {
            self.progress_bar
                .add_log("⚠️ Please enter a YouTube playlist URL.");
            return;
        }

        let playlist_url = self.url_input.value.trim().to_string();
        let output = normalize_output_path(&self.output_input.value);
        self.output_input.set_value(output.display().to_string());

        self.progress_bar.reset();
        self.progress_bar.set_message("Starting...");
        self.progress_bar.add_log("⏳ Starting summarization...");

        let (tx, rx) = mpsc::unbounded_channel();
        let driver = match live_driver(self.settings.clone()) {
            Ok(driver) => driver.with_events(tx),
            Err(e) => {
                tracing::error!(error = %e, "Failed to set up summarizer");
                self.progress_bar.add_log(format!("❌ Error: {e}"));
                self.progress_bar.set_message("Failed");
                return;
            }
        };

        self.events_rx = Some(rx);
        self.state = AppState::Running;
        self.total_videos = 0;
        self.set_locked(true);

        tokio::spawn(async move {
            if let Err(e) = driver.run_and_export(&playlist_url, &output).await {
                tracing::error!(error = %e, "Playlist run failed");
            }
        });
    }

    fn handle_tick(&mut self) {
        let mut events = Vec::new();
        let mut disconnected = false;
        if let Some(rx) = &mut self.events_rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }

        for event in events {
            self.apply_event(event);
        }

        // The worker stopped without a final event, e.g. it panicked.
        if disconnected && self.is_running() {
            self.progress_bar
                .add_log("❌ Error: summarization stopped unexpectedly");
            self.progress_bar.set_message("Failed");
            self.finish_run();
        }
    }

    fn apply_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Started { total } => {
                self.total_videos = total;
                self.progress_bar.set_message(format!("Found {total} videos"));
                self.progress_bar.add_log(format!("Found {total} videos"));
            }
            DriverEvent::VideoStarted {
                index,
                total,
                video_url,
            } => {
                self.progress_bar.set_fraction(index - 1, total);
                self.progress_bar
                    .set_message(format!("Video {index}/{total}"));
                self.progress_bar
                    .add_log(format!("Processing video {index}/{total}: {video_url}"));
            }
            DriverEvent::Log(line) => self.progress_bar.add_log(line),
            DriverEvent::VideoFinished { index, kind } => {
                self.progress_bar.set_fraction(index, self.total_videos);
                if kind != OutcomeKind::Success {
                    tracing::debug!(index, ?kind, "Video not summarized");
                }
            }
            DriverEvent::Exported { path } => {
                self.progress_bar
                    .add_log(format!("✅ Summary saved to: {}", path.display()));
            }
            DriverEvent::Completed {
                summarized,
                skipped,
                failed,
            } => {
                self.progress_bar.set_progress(1.0);
                self.progress_bar.set_message(format!(
                    "Completed: {summarized} summarized, {skipped} skipped, {failed} failed"
                ));
                self.finish_run();
            }
            DriverEvent::Aborted(reason) => {
                self.progress_bar.add_log(format!("❌ Error: {reason}"));
                self.progress_bar.set_message("Failed");
                self.finish_run();
            }
        }
    }

    fn finish_run(&mut self) {
        self.state = AppState::Idle;
        self.events_rx = None;
        self.set_locked(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::path::PathBuf;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_event(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
    }

    fn running_app() -> (App, mpsc::UnboundedSender<DriverEvent>) {
        let mut app = App::new(Settings::default());
        let (tx, rx) = mpsc::unbounded_channel();
        app.events_rx = Some(rx);
        app.state = AppState::Running;
        app.set_locked(true);
        (app, tx)
    }

    #[test]
    fn starts_with_default_output_and_url_focus() {
        let app = App::new(Settings::default());
        assert_eq!(app.output_input.value, DEFAULT_OUTPUT_FILE);
        assert_eq!(app.focus, Focus::Url);
        assert!(app.url_input.focused);
    }

    #[test]
    fn tab_cycles_focus_through_button() {
        let mut app = App::new(Settings::default());
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Output);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Button);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Url);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.focus, Focus::Button);
    }

    #[test]
    fn typing_q_in_a_field_does_not_quit() {
        let mut app = App::new(Settings::default());
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        assert_eq!(app.url_input.value, "q");
    }

    #[test]
    fn empty_url_logs_a_warning() {
        let mut app = App::new(Settings::default());
        app.set_focus(Focus::Button);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::Idle);
        assert_eq!(app.progress_bar.logs.len(), 1);
        assert!(app.progress_bar.logs[0].contains("Please enter a YouTube playlist URL"));
    }

    #[tokio::test]
    async fn events_are_drained_into_the_log() {
        let (mut app, tx) = running_app();
        tx.send(DriverEvent::Started { total: 2 }).unwrap();
        tx.send(DriverEvent::VideoStarted {
            index: 1,
            total: 2,
            video_url: "u1".into(),
        })
        .unwrap();
        tx.send(DriverEvent::VideoFinished {
            index: 1,
            kind: OutcomeKind::Success,
        })
        .unwrap();

        app.handle_event(AppEvent::Tick).unwrap();

        assert!(app.is_running());
        assert_eq!(app.progress_bar.progress, 0.5);
        assert!(app.progress_bar.logs.iter().any(|l| l.contains("Processing video 1/2: u1")));
    }

    #[tokio::test]
    async fn form_is_locked_while_running() {
        let (mut app, _tx) = running_app();
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Esc);

        assert!(app.url_input.value.is_empty());
        assert!(!app.should_quit);

        app.handle_event(AppEvent::Quit).unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn completion_unlocks_the_form() {
        let (mut app, tx) = running_app();
        tx.send(DriverEvent::Exported {
            path: PathBuf::from("out.xlsx"),
        })
        .unwrap();
        tx.send(DriverEvent::Completed {
            summarized: 1,
            skipped: 0,
            failed: 0,
        })
        .unwrap();

        app.handle_event(AppEvent::Tick).unwrap();

        assert_eq!(app.state, AppState::Idle);
        assert!(!app.url_input.locked);
        assert!(app.progress_bar.logs.iter().any(|l| l.contains("✅ Summary saved to: out.xlsx")));
    }

    #[tokio::test]
    async fn abort_reports_the_error() {
        let (mut app, tx) = running_app();
        tx.send(DriverEvent::Aborted("disk full".into())).unwrap();

        app.handle_event(AppEvent::Tick).unwrap();

        assert_eq!(app.state, AppState::Idle);
        assert!(app.progress_bar.logs.iter().any(|l| l.ends_with("❌ Error: disk full")));
    }

    #[tokio::test]
    async fn dropped_worker_ends_the_run() {
        let (mut app, tx) = running_app();
        drop(tx);

        app.handle_event(AppEvent::Tick).unwrap();

        assert_eq!(app.state, AppState::Idle);
        assert_eq!(app.progress_bar.message, "Failed");
    }
}
