//! Individual panes of the launcher screen

use crate::app::{AppState, KeybindingContext};
use crate::catalog::ScriptEntry;
use crate::theme::{Styles, Theme};
use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

/// Human-readable age of a script's last run
pub fn format_last_run(last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(when) = last_run else {
        return "never run".to_string();
    };

    let seconds = (now - when).num_seconds();
    match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s if s < 30 * 86_400 => format!("{}d ago", s / 86_400),
        _ => when.format("%Y-%m-%d").to_string(),
    }
}

pub(super) fn render_search_box(f: &mut Frame, state: &AppState, area: Rect) {
    let focused = state.mode == crate::app::AppMode::Search;
    let line = Line::from(vec![
        Span::styled("> ", Styles::title()),
        Span::styled(state.query.as_str(), Styles::text()),
        Span::styled(if focused { "_" } else { "" }, Styles::text_muted()),
    ]);

    let search = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border(focused))
            .title(Span::styled(" Search ", Styles::title())),
    );
    f.render_widget(search, area);
}

pub(super) fn render_results(f: &mut Frame, state: &AppState, area: Rect, now: DateTime<Utc>) {
    let title = format!(" Suggestions ({}) ", state.results.len());
    render_script_list(f, &state.results, state.selected, &title, area, now);
}

pub(super) fn render_catalog(f: &mut Frame, state: &AppState, area: Rect, now: DateTime<Utc>) {
    let title = format!(" Catalog ({}) ", state.catalog.len());
    render_script_list(f, &state.catalog, state.catalog_selected, &title, area, now);
}

fn render_script_list(
    f: &mut Frame,
    entries: &[ScriptEntry],
    selected: usize,
    title: &str,
    area: Rect,
    now: DateTime<Utc>,
) {
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let mut lines = vec![Line::from(vec![
                Span::styled(entry.name.clone(), Styles::script_name()),
                Span::styled(
                    format!("  {}", format_last_run(entry.last_run_time, now)),
                    Styles::text_muted(),
                ),
            ])];
            if !entry.description.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  {}", entry.description),
                    Styles::script_desc(),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::border_active())
                .title(Span::styled(title.to_string(), Styles::title())),
        )
        .highlight_style(Styles::selected())
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    if !entries.is_empty() {
        list_state.select(Some(selected.min(entries.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

pub(super) fn render_output(f: &mut Frame, state: &AppState, area: Rect) {
    let visible = usize::from(area.height.saturating_sub(2));
    let end = state.output.len().saturating_sub(state.output_scroll);
    let start = end.saturating_sub(visible);

    let lines: Vec<Line> = state
        .output
        .range(start..end)
        .map(|line| Line::from(Span::styled(line.as_str(), Theme::output_style(line))))
        .collect();

    let title = match &state.running {
        Some(running) => format!(" Output: {} (running) ", running.name),
        None if state.output_scroll > 0 => format!(" Output (+{} below) ", state.output_scroll),
        None => " Output ".to_string(),
    };

    let output = Paragraph::new(lines).style(Styles::panel_bg()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border(state.running.is_some()))
            .title(Span::styled(title, Styles::title())),
    );
    f.render_widget(output, area);
}

pub(super) fn render_status(f: &mut Frame, state: &AppState, area: Rect) {
    let style = if state.is_running() {
        Styles::warning()
    } else {
        Styles::text()
    };
    f.render_widget(
        Paragraph::new(Span::styled(format!(" {}", state.status_message), style)),
        area,
    );
}

pub(super) fn render_nav_bar(
    f: &mut Frame,
    state: &AppState,
    keybinding_ctx: &KeybindingContext,
    area: Rect,
) {
    let mut spans = Vec::new();
    for item in keybinding_ctx.get_nav_items(state.mode, state.is_running()) {
        spans.push(Span::styled(format!(" {} ", item.key_display), Styles::title()));
        spans.push(Span::styled(format!("{} ", item.action_label), Styles::nav_hint()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
