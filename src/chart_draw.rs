use ratatui::layout::{Constraint, Direction, Layout, Rect as TuiRect};
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::canvas::{Canvas, Line, Points};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::catalog::{Catalog, ModelId, overlay_label};
use crate::engine::{FieldKey, MergedRow};
use crate::format::format_axis_tick;
use crate::selection::{FilterSelection, MetricMode};

const PRIMARY_COLOR: Color = Color::Cyan;
const OVERLAY_COLORS: [Color; 4] = [Color::Green, Color::Yellow, Color::Magenta, Color::LightRed];

fn model_color(model: ModelId) -> Color {
    match model {
        ModelId::Linear => Color::White,
        ModelId::RandomForest => Color::Red,
        ModelId::Hybrid => Color::LightGreen,
    }
}

fn composition_color(code: &str) -> Color {
    match code {
        "household_consumption" => Color::Green,
        "govt_consumption" => Color::Yellow,
        "investment" => Color::Magenta,
        _ => Color::LightRed,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Left,
    Right,
}

#[derive(Clone, Debug)]
pub struct Series {
    pub key: FieldKey,
    pub label: String,
    pub color: Color,
    pub axis: Axis,
    pub dashed: bool,
    pub points: Vec<(f64, f64)>,
}

/// Spans the values of one axis; a flat range is widened so it can be drawn
fn bounds<'a>(values: impl Iterator<Item = &'a f64>) -> Option<[f64; 2]> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if lo > hi {
        return None;
    }
    if lo == hi {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        return Some([lo - pad, hi + pad]);
    }
    Some([lo, hi])
}

fn axis_bounds(series: &[Series], axis: Axis) -> Option<[f64; 2]> {
    bounds(
        series
            .iter()
            .filter(|s| s.axis == axis)
            .flat_map(|s| s.points.iter().map(|(_, y)| y)),
    )
}

/// Series and scales of the merged table, ready to draw
pub struct ChartView {
    series: Vec<Series>,
    x_bounds: [f64; 2],
    left: [f64; 2],
    right: Option<[f64; 2]>,
    mode: MetricMode,
}

impl ChartView {
    /// Legend order: primary, models, composition codes, overlays in pick order.
    pub fn new(rows: &[MergedRow], selection: &FilterSelection, catalog: &Catalog) -> Self {
        let metric = selection.metric_mode.label();
        let mut keys: Vec<(FieldKey, String, Color, Axis, bool)> =
            vec![(FieldKey::Primary, metric.to_string(), PRIMARY_COLOR, Axis::Left, false)];

        for model in &selection.models {
            let label = format!("{} ({})", metric, model.label());
            keys.push((FieldKey::Prediction(*model), label, model_color(*model), Axis::Left, true));
        }
        for code in selection.composition.map(|c| c.codes()).unwrap_or_default() {
            let label = catalog.get(code).map(|i| i.label).unwrap_or(*code).to_string();
            keys.push((FieldKey::Indicator(code.to_string()), label, composition_color(code), Axis::Right, false));
        }
        for (idx, code) in selection.overlays.iter().enumerate() {
            let key = FieldKey::Indicator(code.clone());
            if keys.iter().any(|(k, ..)| *k == key) {
                continue;
            }
            let label = overlay_label(code).map(str::to_string).unwrap_or_else(|| code.clone());
            keys.push((key, label, OVERLAY_COLORS[idx % OVERLAY_COLORS.len()], Axis::Right, false));
        }

        let series: Vec<Series> = keys
            .into_iter()
            .map(|(key, label, color, axis, dashed)| {
                let points = rows
                    .iter()
                    .filter_map(|r| r.get(&key).map(|v| (r.year as f64, v)))
                    .collect();
                Series { key, label, color, axis, dashed, points }
            })
            .collect();

        let left = axis_bounds(&series, Axis::Left).unwrap_or([0.0, 1.0]);
        let right = axis_bounds(&series, Axis::Right);
        let x_bounds = match (rows.first(), rows.last()) {
            (Some(a), Some(b)) if a.year == b.year => [a.year as f64 - 1.0, b.year as f64 + 1.0],
            (Some(a), Some(b)) => [a.year as f64, b.year as f64],
            _ => [0.0, 1.0],
        };

        Self { series, x_bounds, left, right, mode: selection.metric_mode }
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Maps a right-axis value into left-axis coordinates
    fn to_left(&self, axis: Axis, y: f64) -> f64 {
        match (axis, self.right) {
            (Axis::Right, Some([r0, r1])) => {
                let [l0, l1] = self.left;
                l0 + (y - r0) / (r1 - r0) * (l1 - l0)
            }
            _ => y,
        }
    }

    /// Draws the series on a canvas with a legend underneath
    pub fn render(&self, f: &mut Frame, area: TuiRect, title: &str) {
        let legend_lines = self.series.len().div_ceil(2) as u16;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(legend_lines + 2)].as_ref())
            .split(area);

        let [x0, x1] = self.x_bounds;
        let [l0, l1] = self.left;
        let canvas = Canvas::default()
            .block(Block::default().title(title.to_string()).borders(Borders::ALL))
            .marker(Marker::Braille)
            .x_bounds(self.x_bounds)
            .y_bounds(self.left)
            .paint(|ctx| {
                // 1) series lines, one segment per consecutive pair of years
                for s in &self.series {
                    let pts: Vec<(f64, f64)> =
                        s.points.iter().map(|(x, y)| (*x, self.to_left(s.axis, *y))).collect();
                    for (i, w) in pts.windows(2).enumerate() {
                        if s.dashed && i % 2 == 1 {
                            continue;
                        }
                        let (a, b) = (w[0], w[1]);
                        ctx.draw(&Line { x1: a.0, y1: a.1, x2: b.0, y2: b.1, color: s.color });
                    }
                    ctx.draw(&Points { coords: &pts, color: s.color });
                }
                ctx.layer();

                // 2) axis labels on top
                ctx.print(x0, l1, format_axis_tick(self.mode, l1));
                ctx.print(x0, l0, format_axis_tick(self.mode, l0));
                if let Some([r0, r1]) = self.right {
                    ctx.print(x1, l1, format!("{:.2}", r1));
                    ctx.print(x1, l0, format!("{:.2}", r0));
                }
                ctx.print(x0 + (x1 - x0) * 0.45, l0, format!("{:.0}–{:.0}", x0, x1));
            });
        f.render_widget(canvas, chunks[0]);

        let spans: Vec<Span> = self
            .series
            .iter()
            .flat_map(|s| {
                let stroke = if s.dashed { "╌╌ " } else { "── " };
                let side = if s.axis == Axis::Right { " (right)" } else { "" };
                [
                    Span::styled(stroke, Style::default().fg(s.color)),
                    Span::styled(format!("{}{}   ", s.label, side), Style::default().fg(s.color)),
                ]
            })
            .collect();
        let legend = Paragraph::new(TextLine::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Legend"))
            .wrap(Wrap { trim: true });
        f.render_widget(legend, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Composition;
    use std::collections::BTreeMap;

    fn row(year: i32, fields: &[(FieldKey, f64)]) -> MergedRow {
        MergedRow { year, fields: fields.iter().cloned().collect::<BTreeMap<_, _>>() }
    }

    #[test]
    fn test_legend_order_is_stable() {
        let mut sel = FilterSelection::default();
        sel.toggle_overlay("tourism_arrivals");
        sel.toggle_overlay("energy_use");
        sel.toggle_model(ModelId::Hybrid);
        sel.toggle_model(ModelId::Linear);
        sel.set_composition(Some(Composition::Investment));

        let view = ChartView::new(&[], &sel, &Catalog::builtin());
        let labels: Vec<_> = view.series().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Overall GDP",
                "Overall GDP (Linear Regression)",
                "Overall GDP (Hybrid Model)",
                "Investment (Gross Capital Formation)",
                "Tourist Arrivals",
                "Energy Consumption",
            ]
        );
        assert!(view.is_empty());
    }

    #[test]
    fn test_right_axis_is_scaled_into_left() {
        let rows = vec![
            row(2020, &[(FieldKey::Primary, 100.0), (FieldKey::Indicator("energy_use".into()), 0.0)]),
            row(2021, &[(FieldKey::Primary, 200.0), (FieldKey::Indicator("energy_use".into()), 10.0)]),
        ];
        let mut sel = FilterSelection::default();
        sel.toggle_overlay("energy_use");
        let view = ChartView::new(&rows, &sel, &Catalog::builtin());

        assert_eq!(view.left, [100.0, 200.0]);
        assert_eq!(view.right, Some([0.0, 10.0]));
        assert_eq!(view.to_left(Axis::Right, 5.0), 150.0);
        assert_eq!(view.to_left(Axis::Left, 5.0), 5.0);
        assert_eq!(view.x_bounds, [2020.0, 2021.0]);
    }

    #[test]
    fn test_single_point_gets_drawable_bounds() {
        let rows = vec![row(2021, &[(FieldKey::Primary, 5.0)])];
        let view = ChartView::new(&rows, &FilterSelection::default(), &Catalog::builtin());
        assert_eq!(view.x_bounds, [2020.0, 2022.0]);
        assert!(view.left[0] < 5.0 && view.left[1] > 5.0);
    }
}
