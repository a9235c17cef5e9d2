use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::catalog::{ModelId, OVERLAYS, TABLE_CODES, accuracy_rating, model_accuracy};
use crate::chart_draw::ChartView;
use crate::format::{NO_DATA, format_value};
use crate::state::{AppState, Dropdown};

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(60),
            Constraint::Min(6),
        ].as_ref())
        .split(f.area());

    draw_filter_bar(f, rows[0], state);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(60),
            Constraint::Percentage(20),
        ].as_ref())
        .split(rows[1]);

    // Left: open dropdown, or help
    if let Some(open) = state.dropdown.open {
        let items: Vec<ListItem> = state
            .options(open)
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let mark = match (open.is_multi(), state.is_checked(open, i)) {
                    (true, true) => "[x] ",
                    (true, false) => "[ ] ",
                    (false, true) => "● ",
                    (false, false) => "  ",
                };
                ListItem::new(format!("{}{}", mark, label))
            })
            .collect();
        let mut list_state = ListState::default();
        list_state.select(Some(state.dropdown.cursor));
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(open.title()))
            .highlight_symbol(">> ")
            .highlight_style(Style::default().fg(Color::Red));
        f.render_stateful_widget(list, chunks[0], &mut list_state);
    } else {
        let help = Paragraph::new(AppState::HELP_TEXT)
            .block(Block::default().borders(Borders::ALL).title("Keys"))
            .wrap(Wrap { trim: true });
        f.render_widget(help, chunks[0]);
    }

    // Center: chart
    let sel = &state.filters.selection;
    let title = format!(
        "{} - {}{} Over Time",
        state.country_name(),
        sel.metric_mode.label(),
        sel.composition.map(|c| format!(" ({})", c.label())).unwrap_or_default(),
    );
    let view = ChartView::new(&state.view.merged, sel, &state.catalog);
    if view.is_empty() {
        let txt = if state.loading { "Loading data…" } else { "No data available yet for this country." };
        let empty = Paragraph::new(txt)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        f.render_widget(empty, chunks[1]);
    } else {
        view.render(f, chunks[1], &title);
    }

    draw_side_panel(f, chunks[2], state);
    draw_indicator_table(f, rows[2], state);
}

fn draw_filter_bar(f: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = Vec::new();
    for d in Dropdown::ORDER {
        let mut style = Style::default();
        if d == state.dropdown.focused {
            style = style.fg(Color::Red).add_modifier(Modifier::BOLD);
        }
        let arrow = if state.dropdown.open == Some(d) { "▲" } else { "▼" };
        spans.push(Span::styled(format!("{}: {} {}", d.title(), state.summary(d), arrow), style));
        spans.push(Span::raw("  │  "));
    }
    spans.pop();
    let bar = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("GDP Predictor"));
    f.render_widget(bar, area);
}

fn draw_side_panel(f: &mut Frame, area: Rect, state: &AppState) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(area);

    // — Status, or the definition of the overlay under the cursor
    let hovered = match state.dropdown.open {
        Some(Dropdown::Indicators) => OVERLAYS
            .get(state.dropdown.cursor)
            .and_then(|(_, code)| state.catalog.get(code)),
        _ => None,
    };
    let status = if let Some(ind) = hovered {
        Paragraph::new(format!("{}\n{}", ind.header(), ind.short))
    } else if state.loading {
        Paragraph::new("Loading data…").style(Style::default().fg(Color::Yellow))
    } else if let Some(msg) = &state.message {
        Paragraph::new(msg.as_str()).style(Style::default().fg(Color::Red))
    } else {
        Paragraph::new(format!(
            "{}\n{} chart rows\n{} table years",
            state.country_name(),
            state.view.merged.len(),
            state.view.indicator_years.len()
        ))
    };
    f.render_widget(
        status
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true }),
        parts[0],
    );

    // — Model accuracy (R²)
    let iso = state.filters.country.as_str();
    let mut lines = Vec::new();
    for model in ModelId::ALL {
        lines.push(Line::from(Span::styled(
            model.label(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        match model_accuracy(model, iso) {
            Some(r2) => {
                lines.push(Line::from(format!("  R² {:.2}% · {}", r2 * 100.0, accuracy_rating(r2))));
                lines.push(Line::from(Span::styled(
                    format!("  {}", model.description()),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            None => lines.push(Line::from(Span::styled(
                "  Accuracy data coming soon",
                Style::default().fg(Color::DarkGray),
            ))),
        }
    }
    let cards = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Model Accuracy"))
        .wrap(Wrap { trim: true });
    f.render_widget(cards, parts[1]);
}

fn draw_indicator_table(f: &mut Frame, area: Rect, state: &AppState) {
    let title = format!("Indicators per Year – {}", state.country_name());
    if state.view.indicator_years.is_empty() {
        let empty = Paragraph::new("No indicator data available yet for this country.")
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty, area);
        return;
    }

    let columns: Vec<_> = TABLE_CODES.iter().filter_map(|c| state.catalog.get(c)).collect();
    let header = Row::new(
        std::iter::once(Cell::from("Year"))
            .chain(columns.iter().map(|ind| Cell::from(ind.header()))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let body: Vec<Row> = state
        .view
        .indicator_years
        .iter()
        .map(|row| {
            let cells = std::iter::once(Cell::from(row.year.to_string())).chain(columns.iter().map(|ind| {
                let text = format_value(&state.catalog, ind.code, row.value(ind.code));
                let style = if text == NO_DATA { Style::default().fg(Color::DarkGray) } else { Style::default() };
                Cell::from(text).style(style)
            }));
            Row::new(cells)
        })
        .collect();

    let widths = std::iter::once(Constraint::Length(6))
        .chain(columns.iter().map(|_| Constraint::Min(12)));
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));

    // keep the latest year in view
    let mut table_state = TableState::default();
    table_state.select(Some(state.view.indicator_years.len() - 1));
    f.render_stateful_widget(table, area, &mut table_state);
}
