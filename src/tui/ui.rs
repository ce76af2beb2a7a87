use crate::tui::app::{App, Focus};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Playlist URL
            Constraint::Length(3), // Output file
            Constraint::Length(3), // Button
            Constraint::Min(6),    // Progress and log
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    let title = Paragraph::new("YouTube Playlist Summarizer")
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    app.url_input.render(f, chunks[1]);
    app.output_input.render(f, chunks[2]);

    draw_button(f, app, chunks[3]);

    app.progress_bar.render(f, chunks[4]);

    let help_text = if app.is_running() {
        "Summarizing... [Ctrl-C] Quit"
    } else {
        "[Tab] Next  [Enter] Summarize  [q] Exit (on button)  [Esc] Exit"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[5]);
}

fn draw_button(f: &mut Frame, app: &App, area: Rect) {
    let area = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(28),
            Constraint::Min(0),
        ])
        .split(area)[1];

    let (label, style) = if app.is_running() {
        ("Running...", Style::default().fg(Color::DarkGray))
    } else if app.focus == Focus::Button {
        (
            "Summarize Playlist",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("Summarize Playlist", Style::default().fg(Color::White))
    };

    let button = Paragraph::new(label)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(button, area);
}
