// src/plot/mod.rs

//! PNG rendering of SHAP summary and waterfall plots.

pub mod canvas;
pub mod font;
pub mod summary;
pub mod waterfall;

pub use summary::render_summary_plot;
pub use waterfall::{render_waterfall_plot, waterfall_bars, WaterfallBar};

use ndarray::ArrayView1;

/// Feature indices by descending score; ties keep index order.
pub fn feature_order(scores: ArrayView1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}
