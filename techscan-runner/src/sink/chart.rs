//! Text chart of an analysis result, drawn off-screen with ratatui.
//!
//! Six stacked panels:
//! 1. Close with MA10/MA20 and the three Bollinger lines
//! 2. Oscillators (RSI, STOCH_K, STOCH_D, WILLIAMS_R, MFI) on a -100..100 scale
//! 3. MACD, its signal line and histogram
//! 4. ATR and ADX
//! 5. CCI with +/-100 guides, and ROC
//! 6. Volume
//!
//! Panels whose indicator columns are all absent are drawn empty with a note.

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph, Widget};

use techscan_core::domain::AnalysisResult;

use super::SinkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSize {
    pub width: u16,
    pub height: u16,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 120,
            height: 60,
        }
    }
}

struct Trace<'a> {
    name: &'a str,
    color: Color,
    points: Vec<(f64, f64)>,
    labelled: bool,
}

impl<'a> Trace<'a> {
    fn new(name: &'a str, color: Color, points: Vec<(f64, f64)>) -> Self {
        Self {
            name,
            color,
            points,
            labelled: true,
        }
    }

    /// Reference line, left out of the panel title.
    fn guide(name: &'a str, points: Vec<(f64, f64)>) -> Self {
        Self {
            labelled: false,
            ..Self::new(name, Color::DarkGray, points)
        }
    }
}

fn points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

fn y_bounds(lines: &[Trace<'_>]) -> [f64; 2] {
    let (lo, hi) = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|p| p.1))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    let pad = ((hi - lo).abs() * 0.05).max(1e-9);
    [lo - pad, hi + pad]
}

fn draw_panel(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    lines: &[Trace<'_>],
    x_max: f64,
    bounds: Option<[f64; 2]>,
) {
    let plotted: Vec<&str> = lines
        .iter()
        .filter(|l| l.labelled && !l.points.is_empty())
        .map(|l| l.name)
        .collect();
    let block = if plotted.is_empty() || plotted == [title] {
        Block::bordered().title(title.to_string())
    } else {
        Block::bordered().title(format!("{title}: {}", plotted.join(" ")))
    };
    if plotted.is_empty() {
        Paragraph::new("not enough history")
            .block(block)
            .render(area, buf);
        return;
    }

    let [y_min, y_max] = bounds.unwrap_or_else(|| y_bounds(lines));
    let datasets: Vec<Dataset<'_>> = lines
        .iter()
        .filter(|l| !l.points.is_empty())
        .map(|l| {
            Dataset::default()
                .name(l.name)
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(l.color))
                .graph_type(GraphType::Line)
                .data(&l.points)
        })
        .collect();

    Chart::new(datasets)
        .block(block)
        .legend_position(None)
        .x_axis(Axis::default().bounds([0.0, x_max.max(1.0)]))
        .y_axis(
            Axis::default()
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.1}")),
                    Span::raw(format!("{y_max:.1}")),
                ]),
        )
        .render(area, buf);
}

fn buffer_text(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut row = String::new();
        for x in area.left()..area.right() {
            row.push_str(buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "));
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

/// Render the chart and return it as lines of text.
pub fn render_chart(result: &AnalysisResult, size: ChartSize) -> Result<String, SinkError> {
    if size.width < 20 || size.height < 16 {
        return Err(SinkError::Render(format!(
            "chart area {}x{} is too small",
            size.width, size.height
        )));
    }
    if result.rows() == 0 {
        return Err(SinkError::Render("empty series".into()));
    }

    let series = &result.series;
    let ind = &result.indicators;
    let column = |name: &str| ind.get(name).map(points).unwrap_or_default();
    let x_max = result.rows().saturating_sub(1) as f64;

    let area = Rect::new(0, 0, size.width, size.height);
    let mut buf = Buffer::empty(area);
    let [title, price, osc, macd, trend, cycle, volume] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Percentage(28),
        Constraint::Percentage(16),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
    ])
    .areas(area);

    let heading = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => format!(
            "{} ({}) {first} .. {last}, {} rows",
            result.ticker(),
            result.category,
            result.rows()
        ),
        _ => result.ticker().to_string(),
    };
    Paragraph::new(heading).render(title, &mut buf);

    draw_panel(
        price,
        &mut buf,
        "Price",
        &[
            Trace::new("Close", Color::White, points(series.close())),
            Trace::new("MA10", Color::Yellow, column("MA10")),
            Trace::new("MA20", Color::Cyan, column("MA20")),
            Trace::new("Upper_BB", Color::DarkGray, column("Upper_BB")),
            Trace::new("Middle_BB", Color::Gray, column("Middle_BB")),
            Trace::new("Lower_BB", Color::DarkGray, column("Lower_BB")),
        ],
        x_max,
        None,
    );

    draw_panel(
        osc,
        &mut buf,
        "Oscillators",
        &[
            Trace::new("RSI", Color::Magenta, column("RSI")),
            Trace::new("STOCH_K", Color::Green, column("STOCH_K")),
            Trace::new("STOCH_D", Color::LightGreen, column("STOCH_D")),
            Trace::new("WILLIAMS_R", Color::Red, column("WILLIAMS_R")),
            Trace::new("MFI", Color::Blue, column("MFI")),
        ],
        x_max,
        Some([-100.0, 100.0]),
    );

    draw_panel(
        macd,
        &mut buf,
        "MACD",
        &[
            Trace::new("MACD", Color::Cyan, column("MACD")),
            Trace::new("Signal", Color::Yellow, column("MACD_signal")),
            Trace::new("Hist", Color::Gray, column("MACD_hist")),
        ],
        x_max,
        None,
    );

    draw_panel(
        trend,
        &mut buf,
        "ATR and ADX",
        &[
            Trace::new("ATR", Color::LightRed, column("ATR")),
            Trace::new("ADX", Color::LightBlue, column("ADX")),
        ],
        x_max,
        None,
    );

    let cci = column("CCI");
    let guides = if cci.is_empty() {
        [Vec::new(), Vec::new()]
    } else {
        [vec![(0.0, 100.0), (x_max, 100.0)], vec![(0.0, -100.0), (x_max, -100.0)]]
    };
    let [upper_guide, lower_guide] = guides;
    draw_panel(
        cycle,
        &mut buf,
        "CCI and ROC",
        &[
            Trace::new("CCI", Color::LightMagenta, cci),
            Trace::new("ROC", Color::LightYellow, column("ROC")),
            Trace::guide("+100", upper_guide),
            Trace::guide("-100", lower_guide),
        ],
        x_max,
        None,
    );

    draw_panel(
        volume,
        &mut buf,
        "Volume",
        &[Trace::new("Volume", Color::Gray, points(series.volume()))],
        x_max,
        None,
    );

    Ok(buffer_text(&buf))
}
