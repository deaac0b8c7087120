// src/plot/summary.rs
use super::canvas::{blue_to_red, Canvas, Scale, BLACK, GREY, LIGHT_GREY};
use super::font::text_width;
use super::feature_order;
use crate::core::{Result, ShapError};
use ndarray::{ArrayView2, Axis};
use std::path::Path;

const WIDTH: u32 = 800;
const ROW_HEIGHT: u32 = 40;
const LABEL_SCALE: u32 = 2;

/// Global importance plot for one model output.
///
/// One row per feature, most important (mean |SHAP|) on top, at most
/// `max_display` rows. Each explained sample is a dot at its SHAP value,
/// colored by the sample's value of that feature (blue low, red high).
pub fn render_summary_plot(
    shap_values: ArrayView2<f64>,
    data: ArrayView2<f64>,
    feature_names: &[String],
    max_display: usize,
    path: &Path,
) -> Result<()> {
    check_shapes(shap_values, data, feature_names)?;

    let importance = shap_values
        .mapv(f64::abs)
        .mean_axis(Axis(0))
        .ok_or_else(|| ShapError::EmptyInput("no samples to summarize".to_string()))?;
    let order: Vec<usize> = feature_order(importance.view())
        .into_iter()
        .take(max_display.max(1))
        .collect();

    let rows = order.len() as u32;
    let height = ROW_HEIGHT * rows + 150;
    let mut canvas = Canvas::new(WIDTH, height);

    let label_width = order
        .iter()
        .map(|&j| text_width(&feature_names[j], LABEL_SCALE))
        .max()
        .unwrap_or(0)
        .min(WIDTH / 3) as i64;
    let left = label_width + 30;
    let right = WIDTH as i64 - 30;
    let top = 40_i64;
    let bottom = top + (rows * ROW_HEIGHT) as i64;

    let scale = Scale::covering(
        order.iter().flat_map(|&j| shap_values.column(j).to_vec()),
        left,
        right,
    );

    canvas.vline(scale.map(0.0), top - 10, bottom, GREY);

    for (row, &feature) in order.iter().enumerate() {
        let cy = top + row as i64 * ROW_HEIGHT as i64 + ROW_HEIGHT as i64 / 2;
        canvas.dashed_hline(left, right, cy, LIGHT_GREY);
        canvas.text_right(left - 10, cy, &feature_names[feature], LABEL_SCALE, BLACK);

        let column = data.column(feature);
        let (lo, hi) = column
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let span = hi - lo;

        for (sample, &value) in shap_values.column(feature).iter().enumerate() {
            let t = if span > 0.0 { (column[sample] - lo) / span } else { 0.5 };
            // spread overlapping dots vertically
            let jitter = (sample % 7) as i64 * 3 - 9;
            canvas.dot(scale.map(value), cy + jitter, 3, blue_to_red(t));
        }
    }

    // x axis
    canvas.hline(left, right, bottom, BLACK);
    for tick in [scale.lo(), 0.0, scale.hi()] {
        let x = scale.map(tick);
        canvas.vline(x, bottom, bottom + 6, BLACK);
        canvas.text_centered(x, bottom + 20, &format!("{:.3}", tick), 1, BLACK);
    }
    canvas.text_centered(
        (left + right) / 2,
        bottom + 50,
        "SHAP VALUE (IMPACT ON MODEL OUTPUT)",
        2,
        BLACK,
    );
    canvas.text(left, bottom + 80, "FEATURE VALUE: LOW", 1, blue_to_red(0.0));
    canvas.text_right(right, bottom + 83, "HIGH", 1, blue_to_red(1.0));

    canvas.save(path)
}

fn check_shapes(shap_values: ArrayView2<f64>, data: ArrayView2<f64>, feature_names: &[String]) -> Result<()> {
    if shap_values.dim() != data.dim() {
        return Err(ShapError::DataShape(format!(
            "SHAP values {:?} and data {:?} differ in shape",
            shap_values.dim(),
            data.dim()
        )));
    }
    if feature_names.len() != shap_values.ncols() {
        return Err(ShapError::DataShape(format!(
            "{} feature names for {} features",
            feature_names.len(),
            shap_values.ncols()
        )));
    }
    if shap_values.nrows() == 0 {
        return Err(ShapError::EmptyInput("no samples to summarize".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("z{}", i)).collect()
    }

    #[test]
    fn canvas_height_follows_displayed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.png");
        let values = array![[0.1, -0.4, 0.0], [0.3, 0.2, 0.05]];
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        render_summary_plot(values.view(), data.view(), &names(3), 2, &path).unwrap();

        let (width, height) = image::image_dimensions(&path).unwrap();
        assert_eq!(width, 800);
        assert_eq!(height, 2 * 40 + 150);
    }

    #[test]
    fn mismatched_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let values = array![[0.1, 0.2]];
        let err = render_summary_plot(
            values.view(),
            values.view(),
            &names(3),
            20,
            &dir.path().join("x.png"),
        )
        .unwrap_err();
        assert!(matches!(err, ShapError::DataShape(_)));
        assert!(!dir.path().join("x.png").exists());
    }
}
