//! SVG chart rendering for backtest results.
//!
//! Two stacked panels: the reference price with both moving averages and
//! buy/sell markers, then the equity curve with the same markers.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MactraderError;
use crate::ports::report_port::ReportPort;

const WIDTH: f64 = 800.0;
const PANEL_HEIGHT: f64 = 260.0;
const PADDING: f64 = 40.0;

struct Panel {
    top: f64,
    min: f64,
    max: f64,
    len: usize,
}

impl Panel {
    fn new(top: f64, series: &[&[f64]], len: usize) -> Self {
        let finite = || series.iter().flat_map(|s| s.iter()).filter(|v| v.is_finite());
        let min = finite().copied().fold(f64::INFINITY, f64::min);
        let max = finite().copied().fold(f64::NEG_INFINITY, f64::max);
        Panel { top, min, max, len }
    }

    fn x(&self, i: usize) -> f64 {
        let plot_width = WIDTH - 2.0 * PADDING;
        if self.len > 1 {
            PADDING + i as f64 * plot_width / (self.len - 1) as f64
        } else {
            PADDING
        }
    }

    fn y(&self, value: f64) -> f64 {
        let plot_height = PANEL_HEIGHT - 2.0 * PADDING;
        let range = self.max - self.min;
        let scaled = if range > 0.0 {
            (value - self.min) * plot_height / range
        } else {
            plot_height / 2.0
        };
        self.top + PANEL_HEIGHT - PADDING - scaled
    }

    fn polyline(&self, values: &[f64], color: &str) -> String {
        let points: Vec<String> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, &v)| format!("{:.1},{:.1}", self.x(i), self.y(v)))
            .collect();
        format!(
            r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
            color,
            points.join(" ")
        )
    }

    fn markers(&self, values: &[f64], orders: &[i8]) -> Vec<String> {
        orders
            .iter()
            .zip(values)
            .enumerate()
            .filter(|(_, (o, v))| **o != 0 && v.is_finite())
            .map(|(i, (&o, &v))| {
                let (x, y) = (self.x(i), self.y(v));
                if o > 0 {
                    format!(
                        r#"<path class="buy" d="M{:.1},{:.1} l-5,9 l10,0 z" fill="green"/>"#,
                        x, y
                    )
                } else {
                    format!(
                        r#"<path class="sell" d="M{:.1},{:.1} l-5,-9 l10,0 z" fill="red"/>"#,
                        x, y
                    )
                }
            })
            .collect()
    }

    fn frame(&self, title: &str) -> String {
        format!(
            r##"<rect x="{:.0}" y="{:.0}" width="{:.0}" height="{:.0}" fill="none" stroke="#ccc"/><text x="{:.0}" y="{:.0}" font-size="12">{}</text><text x="4" y="{:.0}" font-size="10">{:.2}</text><text x="4" y="{:.0}" font-size="10">{:.2}</text>"##,
            PADDING,
            self.top + PADDING,
            WIDTH - 2.0 * PADDING,
            PANEL_HEIGHT - 2.0 * PADDING,
            PADDING,
            self.top + PADDING - 8.0,
            title,
            self.top + PADDING,
            self.max,
            self.top + PANEL_HEIGHT - PADDING,
            self.min,
        )
    }
}

pub fn render(result: &BacktestResult) -> String {
    let entries = result.ledger.entries();
    if entries.is_empty() {
        return format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="40"><text x="10" y="25">No ledger data available.</text></svg>"#,
            WIDTH
        );
    }

    let prices: Vec<f64> = entries.iter().map(|e| e.reference_price).collect();
    let totals = result.ledger.totals();
    let orders = result.signals.orders();
    let short = result.signals.short_mavg().unwrap_or(&[]);
    let long = result.signals.long_mavg().unwrap_or(&[]);

    let price_panel = Panel::new(0.0, &[prices.as_slice(), short, long], entries.len());
    let equity_panel = Panel::new(PANEL_HEIGHT, &[totals.as_slice()], entries.len());

    let mut body = vec![
        price_panel.frame(&format!("{} price, {}", result.symbol, result.strategy_name)),
        price_panel.polyline(&prices, "#1f77b4"),
    ];
    if !short.is_empty() {
        body.push(price_panel.polyline(short, "#2ca02c"));
        body.push(price_panel.polyline(long, "#d62728"));
    }
    body.extend(price_panel.markers(&prices, &orders));

    body.push(equity_panel.frame("Total value"));
    body.push(equity_panel.polyline(&totals, "#1f77b4"));
    body.extend(equity_panel.markers(&totals, &orders));

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.0}\" height=\"{:.0}\">\n{}\n</svg>\n",
        WIDTH,
        2.0 * PANEL_HEIGHT,
        body.join("\n")
    )
}

pub struct SvgChartAdapter;

impl ReportPort for SvgChartAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), MactraderError> {
        fs::write(output_path, render(result))?;
        Ok(())
    }

    fn file_name(&self, result: &BacktestResult) -> String {
        format!("{}_chart.svg", result.symbol)
    }
}
