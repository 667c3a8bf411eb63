//! Force plot rendering
//!
//! Lays out an [`Explanation`] on a single horizontal axis of model output.
//! Features that raise the prediction are stacked right-to-left so the last
//! one ends at `f(x)`; features that lower it start at `f(x)` and extend
//! to the right. Both stacks meet the base value at their far ends.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::model::Explanation;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 300;

const PUSH_UP: RGBColor = RGBColor(255, 0, 81);
const PUSH_DOWN: RGBColor = RGBColor(0, 139, 251);
const MARKER: RGBColor = RGBColor(90, 90, 90);

const BAR_BOTTOM: f64 = 0.45;
const BAR_TOP: f64 = 0.65;

#[derive(Debug, thiserror::Error)]
#[error("Failed to render force plot: {0}")]
pub struct RenderError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Higher,
    Lower,
}

/// One feature's span on the output axis
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub direction: Direction,
}

/// Axis positions for every element of the plot
#[derive(Debug, Clone)]
pub struct ForceLayout {
    pub base_value: f64,
    pub output: f64,
    pub segments: Vec<Segment>,
    pub x_min: f64,
    pub x_max: f64,
}

impl ForceLayout {
    pub fn new(explanation: &Explanation) -> Self {
        let output = explanation.prediction;
        let base_value = explanation.base_value;

        let mut higher: Vec<_> = explanation
            .contributions
            .iter()
            .filter(|c| c.shap_value > 0.0)
            .collect();
        let mut lower: Vec<_> = explanation
            .contributions
            .iter()
            .filter(|c| c.shap_value < 0.0)
            .collect();
        // Largest effects sit next to f(x)
        higher.sort_by(|a, b| b.shap_value.total_cmp(&a.shap_value));
        lower.sort_by(|a, b| a.shap_value.total_cmp(&b.shap_value));

        let mut segments = Vec::with_capacity(higher.len() + lower.len());

        let mut cursor = output;
        for c in higher {
            segments.push(Segment {
                label: format!("{} = {}", c.feature, format_value(c.value)),
                start: cursor - c.shap_value,
                end: cursor,
                direction: Direction::Higher,
            });
            cursor -= c.shap_value;
        }
        let left = cursor;

        let mut cursor = output;
        for c in lower {
            segments.push(Segment {
                label: format!("{} = {}", c.feature, format_value(c.value)),
                start: cursor,
                end: cursor - c.shap_value,
                direction: Direction::Lower,
            });
            cursor -= c.shap_value;
        }
        let right = cursor;

        let lo = left.min(base_value).min(output);
        let hi = right.max(base_value).max(output);
        let pad = (hi - lo).max(0.05) * 0.1;

        Self {
            base_value,
            output,
            segments,
            x_min: lo - pad,
            x_max: hi + pad,
        }
    }
}

/// Render the explanation as a standalone SVG document
pub fn render_force_plot(explanation: &Explanation) -> Result<String, RenderError> {
    let layout = ForceLayout::new(explanation);
    let mut svg = String::new();
    draw(&layout, &mut svg).map_err(|e| RenderError(e.to_string()))?;
    Ok(svg)
}

fn draw(layout: &ForceLayout, svg: &mut String) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .build_cartesian_2d(layout.x_min..layout.x_max, 0f64..1f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_labels(8)
        .x_label_formatter(&|v| format!("{:.2}", v))
        .x_desc("Predicted PB risk")
        .draw()?;

    chart.draw_series(layout.segments.iter().map(|s| {
        let color = match s.direction {
            Direction::Higher => PUSH_UP,
            Direction::Lower => PUSH_DOWN,
        };
        Rectangle::new([(s.start, BAR_BOTTOM), (s.end, BAR_TOP)], color.mix(0.85).filled())
    }))?;

    // Thin separators between adjacent segments
    chart.draw_series(layout.segments.iter().map(|s| {
        PathElement::new(
            vec![(s.start, BAR_BOTTOM), (s.start, BAR_TOP)],
            WHITE.stroke_width(2),
        )
    }))?;

    let label_font = ("sans-serif", 12).into_font();
    chart.draw_series(layout.segments.iter().enumerate().map(|(i, s)| {
        let color = match s.direction {
            Direction::Higher => PUSH_UP,
            Direction::Lower => PUSH_DOWN,
        };
        let y = if i % 2 == 0 { 0.38 } else { 0.26 };
        Text::new(
            s.label.clone(),
            ((s.start + s.end) / 2.0, y),
            label_font
                .clone()
                .color(&color)
                .pos(Pos::new(HPos::Center, VPos::Top)),
        )
    }))?;

    let markers = [
        (layout.base_value, format!("base value {:.4}", layout.base_value), 0.78),
        (layout.output, format!("f(x) = {:.4}", layout.output), 0.92),
    ];
    chart.draw_series(markers.iter().map(|(x, _, top)| {
        PathElement::new(vec![(*x, BAR_BOTTOM - 0.05), (*x, *top - 0.04)], MARKER.stroke_width(1))
    }))?;
    chart.draw_series(markers.iter().map(|(x, text, top)| {
        Text::new(
            text.clone(),
            (*x, *top),
            ("sans-serif", 14)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Bottom)),
        )
    }))?;

    chart.draw_series([
        Text::new(
            "higher".to_string(),
            (layout.x_min, 0.98),
            ("sans-serif", 13)
                .into_font()
                .color(&PUSH_UP)
                .pos(Pos::new(HPos::Left, VPos::Top)),
        ),
        Text::new(
            "lower".to_string(),
            (layout.x_max, 0.98),
            ("sans-serif", 13)
                .into_font()
                .color(&PUSH_DOWN)
                .pos(Pos::new(HPos::Right, VPos::Top)),
        ),
    ])?;

    root.present()?;
    Ok(())
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}
