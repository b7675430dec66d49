//! UI rendering for the terminal interface.
//!
//! Pure rendering: everything drawn here comes from the `App` model and
//! the playback snapshot; nothing in this module mutates session state.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::app::{App, Pane, PlaybackState};
use crate::config::Settings;
use crate::library::Artwork;

/// Format a `Duration` as `M:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn base_style(dark: bool) -> Style {
    if dark {
        Style::default().fg(Color::Gray).bg(Color::Black)
    } else {
        Style::default()
    }
}

fn accent_style(dark: bool) -> Style {
    if dark {
        Style::default().fg(Color::Magenta).bg(Color::Black)
    } else {
        Style::default().fg(Color::Magenta)
    }
}

fn pane_block<'a>(title: &'a str, focused: bool, dark: bool) -> Block<'a> {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(base_style(dark))
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        });
    if focused {
        block = block.border_style(accent_style(dark));
    }
    block
}

const CONTROLS: &str = "[j/k] move | [g/G] top/bottom | [enter] play | [space] pause | [n] skip | \
[s] stop | [H/L] scrub | [m] mode | [/] search | [tab] playlists | [a/x] playlist +/- | [c] new | \
[X] delete | [[/]] min length | [R] rescan | [+/-] volume | [d] dark | [q] quit";

/// Render the entire UI from `app` state.
pub fn draw(frame: &mut Frame, app: &App, settings: &Settings) {
    let dark = app.dark_mode;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(settings.ui.header_text.as_str())
        .alignment(Alignment::Center)
        .style(base_style(dark))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(base_style(dark))
                .title(" kiai ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status line
    let status = {
        let mut parts: Vec<String> = Vec::new();
        if app.scanning {
            parts.push("Scanning...".to_string());
        }
        if app.excluded > 0 {
            parts.push(format!(
                "Found {} songs (excluded {} < {}s)",
                app.index.len(),
                app.excluded,
                app.min_duration
            ));
        } else {
            parts.push(format!("Found {} songs", app.index.len()));
        }
        parts.push(format!("Mode: {}", app.mode().label()));
        parts.push(format!("Vol: {}%", (app.volume * 100.0).round() as u32));
        if app.filter_mode || !app.filter_query.trim().is_empty() {
            parts.push(format!("Search: {}", app.filter_query));
        }
        if let Some(input) = &app.name_input {
            parts.push(format!("New playlist: {input}_"));
        }
        if let Some(status) = &app.status {
            parts.push(status.clone());
        }
        parts.push(format!("Dir: {}", app.songs_dir.display()));
        parts.join(" • ")
    };
    let status_par = Paragraph::new(status)
        .style(base_style(dark))
        .block(pane_block(" status ", false, dark))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Middle: song list + playlists
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(34)])
        .split(chunks[2]);

    draw_song_list(frame, app, middle[0]);
    draw_playlists(frame, app, middle[1]);

    draw_now_playing(frame, app, chunks[3]);

    let footer = Paragraph::new(CONTROLS)
        .style(base_style(dark))
        .block(pane_block(" controls ", false, dark))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}

fn draw_song_list(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let dark = app.dark_mode;
    let display = app.display_indices();

    // Only build items for the visible window, keeping the selection
    // centered when the list is long.
    let total = display.len();
    let height = area.height.saturating_sub(2) as usize;
    let sel_pos = display
        .iter()
        .position(|&i| i == app.selected)
        .unwrap_or(0);
    let (start, end, visible_selected) = if total <= height || height == 0 {
        (0, total, sel_pos)
    } else {
        let half = height / 2;
        let mut start = sel_pos.saturating_sub(half);
        if start + height > total {
            start = total - height;
        }
        (start, start + height, sel_pos - start)
    };

    let items: Vec<ListItem> = display[start..end]
        .iter()
        .filter_map(|&i| app.index.get(i))
        .map(|track| {
            let duration = track
                .duration()
                .map(format_mmss)
                .unwrap_or_else(|| "-:--".to_string());
            ListItem::new(format!("{}  [{}]", track.display_title(), duration))
        })
        .collect();

    let title = if app.filter_mode {
        " songs (search) "
    } else {
        " songs "
    };
    let list = List::new(items)
        .style(base_style(dark))
        .block(pane_block(title, app.pane == Pane::Library, dark))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ratatui::widgets::ListState::default();
    if total > 0 {
        state.select(Some(visible_selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_playlists(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let dark = app.dark_mode;
    let items: Vec<ListItem> = app
        .playlist_names
        .iter()
        .map(|name| ListItem::new(name.as_str()))
        .collect();
    let list = List::new(items)
        .style(base_style(dark))
        .block(pane_block(" playlists ", app.pane == Pane::Playlists, dark))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ratatui::widgets::ListState::default();
    if !app.playlist_names.is_empty() {
        state.select(Some(app.playlist_selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_now_playing(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let dark = app.dark_mode;
    let block = pane_block(" now playing ", false, dark);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let snapshot = app
        .playback_handle
        .as_ref()
        .and_then(|h| h.lock().ok().map(|info| info.clone()));

    let (title, elapsed, total) = match &snapshot {
        Some(info) if info.path.is_some() => {
            let path = info.path.as_deref();
            let title = path
                .and_then(|p| app.index.position_of(p))
                .and_then(|i| app.index.get(i))
                .map(|t| t.display_title().to_string())
                .or_else(|| {
                    // Playlist tracks may not be in the index; derive the
                    // title from the folder like the scanner would.
                    path.and_then(|p| p.parent())
                        .and_then(|d| d.file_name())
                        .and_then(|n| n.to_str())
                        .map(|n| crate::library::strip_leading_numbers(n).to_string())
                })
                .unwrap_or_else(|| "Unknown".to_string());
            (Some(title), info.elapsed, info.total)
        }
        _ => (None, Duration::ZERO, None),
    };

    let state_text = match app.playback {
        PlaybackState::Stopped => "Not playing".to_string(),
        PlaybackState::Paused => format!("{} (paused)", title.clone().unwrap_or_default()),
        PlaybackState::Playing => format!("Now: {}", title.clone().unwrap_or_default()),
    };
    frame.render_widget(
        Paragraph::new(state_text).style(base_style(dark)),
        rows[0],
    );

    let ratio = match total {
        Some(total) if !total.is_zero() => {
            (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };
    let time_label = format!(
        "{} / {}",
        format_mmss(elapsed),
        total.map(format_mmss).unwrap_or_else(|| "0:00".to_string())
    );
    let gauge = Gauge::default()
        .style(base_style(dark))
        .gauge_style(accent_style(dark))
        .ratio(ratio)
        .label(time_label);
    frame.render_widget(gauge, rows[1]);

    let art_text = match &app.now_art {
        Artwork::Image(path) => format!("art: {}", path.display()),
        Artwork::Placeholder => "art: (none)".to_string(),
    };
    frame.render_widget(
        Paragraph::new(art_text).style(base_style(dark)),
        rows[2],
    );
}
