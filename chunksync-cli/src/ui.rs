use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, Paragraph},
    Terminal,
};

use crate::controls::StatusSnapshot;

const KEY_HINTS: &str = "space=play/pause  ←/→=seek 5s  -/= volume  l=loop on/off  q=quit";

/// Draw the player screen: title, playback status, chunk progress, logs.
pub fn draw_status(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    title: &str,
    status: &StatusSnapshot,
    log_lines: &[String],
) {
    let _ = terminal.draw(|f| {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(f.size());

        let header = Paragraph::new(format!("{}\n{}", title, KEY_HINTS)).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        f.render_widget(header, rows[0]);

        let playback = Paragraph::new(status.text.as_str())
            .style(Style::default().fg(Color::Green))
            .block(Block::default().borders(Borders::ALL).title("Playback"));
        f.render_widget(playback, rows[1]);

        let chunk = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(status.cache_map.as_str()),
            )
            .gauge_style(Style::default().fg(Color::Yellow).bg(Color::Black))
            .ratio(status.chunk_ratio.clamp(0.0, 1.0))
            .label(status.chunk_label.as_str());
        f.render_widget(chunk, rows[2]);

        let visible = rows[3].height.saturating_sub(2) as usize;
        let start = log_lines.len().saturating_sub(visible);
        let logs = Paragraph::new(log_lines[start..].join("\n"))
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Logs"));
        f.render_widget(logs, rows[3]);
    });
}
