// src/plot/waterfall.rs
use super::canvas::{Canvas, Scale, BLACK, BLUE, GREY, RED};
use super::feature_order;
use super::font::text_width;
use crate::core::{Result, ShapError};
use ndarray::ArrayView1;
use std::path::Path;

/// Per-sample plot of signed feature contributions, from the base value
/// E[f(X)] at the bottom up to the prediction f(x) at the top.
///
/// The `max_display - 1` largest contributions get their own bar; when there
/// are more features the rest are folded into one "N OTHER FEATURES" bar.
pub fn render_waterfall_plot(
    shap_values: ArrayView1<f64>,
    base_value: f64,
    data: ArrayView1<f64>,
    feature_names: &[String],
    max_display: usize,
    size: (u32, u32),
    path: &Path,
) -> Result<()> {
    if shap_values.len() != data.len() || shap_values.len() != feature_names.len() {
        return Err(ShapError::DataShape(format!(
            "waterfall needs matching lengths: {} values, {} data, {} names",
            shap_values.len(),
            data.len(),
            feature_names.len()
        )));
    }

    let bars = waterfall_bars(shap_values, data, feature_names, max_display);
    let prediction = base_value + shap_values.sum();

    let (width, height) = size;
    let mut canvas = Canvas::new(width, height);
    let label_scale = 2;

    let label_width = bars
        .iter()
        .map(|bar| text_width(&bar.label, label_scale))
        .max()
        .unwrap_or(0)
        .min(width * 2 / 5) as i64;
    let left = label_width + 40;
    let right = width as i64 - 140;
    let top = 70_i64;
    let bottom = height as i64 - 80;
    let row_height = ((bottom - top) / bars.len().max(1) as i64).max(4);

    // cumulative endpoints, bottom bar first
    let mut start = base_value;
    let mut spans = Vec::with_capacity(bars.len());
    for bar in &bars {
        spans.push((start, start + bar.value));
        start += bar.value;
    }
    let scale = Scale::covering(
        spans.iter().flat_map(|&(a, b)| [a, b]).chain([base_value, prediction]),
        left,
        right,
    );

    for (i, (bar, &(from, to))) in bars.iter().zip(spans.iter()).enumerate() {
        // bottom-up: the first bar sits on the lowest row
        let row_top = bottom - (i as i64 + 1) * row_height;
        let cy = row_top + row_height / 2;
        let half = (row_height * 3 / 10).max(1);
        let color = if bar.value >= 0.0 { RED } else { BLUE };

        canvas.fill_rect(scale.map(from), cy - half, scale.map(to), cy + half, color);
        canvas.text_right(left - 12, cy, &bar.label, label_scale, BLACK);
        let annotation = format!("{:+.3}", bar.value);
        let x_end = scale.map(from.max(to));
        canvas.text(x_end + 8, cy - 7, &annotation, 2, color);
    }

    let x_base = scale.map(base_value);
    let x_pred = scale.map(prediction);
    canvas.dashed_vline(x_base, top, bottom + 10, GREY);
    canvas.dashed_vline(x_pred, top - 10, bottom, GREY);
    canvas.hline(left, right, bottom + 10, BLACK);
    canvas.text_centered(x_base, bottom + 40, &format!("E[F(X)] = {:.3}", base_value), 2, BLACK);
    canvas.text_centered(x_pred, top - 35, &format!("F(X) = {:.3}", prediction), 2, BLACK);

    canvas.save(path)
}

/// One bar of a waterfall plot.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallBar {
    pub label: String,
    pub value: f64,
}

/// Bars in drawing order (bottom first): the folded remainder, if any, then
/// the displayed features from smallest to largest |SHAP|.
pub fn waterfall_bars(
    shap_values: ArrayView1<f64>,
    data: ArrayView1<f64>,
    feature_names: &[String],
    max_display: usize,
) -> Vec<WaterfallBar> {
    let order = feature_order(shap_values.mapv(f64::abs).view());
    let max_display = max_display.max(1);
    let shown = if order.len() > max_display {
        max_display - 1
    } else {
        order.len()
    };

    let mut bars = Vec::with_capacity(shown + 1);
    let rest = &order[shown..];
    if !rest.is_empty() {
        bars.push(WaterfallBar {
            label: format!("{} OTHER FEATURES", rest.len()),
            value: rest.iter().map(|&j| shap_values[j]).sum(),
        });
    }
    for &j in order[..shown].iter().rev() {
        bars.push(WaterfallBar {
            label: format!("{} = {:.3}", feature_names[j], data[j]),
            value: shap_values[j],
        });
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn largest_contribution_is_drawn_last() {
        let values = array![0.1, -0.5, 0.3];
        let data = array![1.0, 2.0, 3.0];
        let bars = waterfall_bars(values.view(), data.view(), &names(3), 10);
        let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["f0 = 1.000", "f2 = 3.000", "f1 = 2.000"]);
    }

    #[test]
    fn remainder_is_folded_into_one_bar() {
        let values = array![0.5, 0.1, -0.2, 0.05, 1.0];
        let data = array![0.0, 0.0, 0.0, 0.0, 0.0];
        let bars = waterfall_bars(values.view(), data.view(), &names(5), 3);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].label, "3 OTHER FEATURES");
        assert_abs_diff_eq!(bars[0].value, 0.1 - 0.2 + 0.05, epsilon = 1e-12);
        let total: f64 = bars.iter().map(|b| b.value).sum();
        assert_abs_diff_eq!(total, values.sum(), epsilon = 1e-12);
    }

    #[test]
    fn renders_on_requested_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0_waterfall_plot.png");
        let values = array![0.2, -0.1, 0.05, 0.3];
        let data = array![1.5, -0.5, 0.0, 2.0];
        render_waterfall_plot(values.view(), 0.4, data.view(), &names(4), 10, (1800, 1000), &path)
            .unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (1800, 1000));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let values = array![0.2, -0.1];
        let data = array![1.0];
        let err = render_waterfall_plot(
            values.view(),
            0.0,
            data.view(),
            &names(2),
            10,
            (1800, 1000),
            &dir.path().join("w.png"),
        )
        .unwrap_err();
        assert!(matches!(err, ShapError::DataShape(_)));
    }
}
