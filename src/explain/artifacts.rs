// src/explain/artifacts.rs
use crate::core::{Result, ShapError};
use ndarray::ArrayView2;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SHAP_DIR: &str = "shap";
pub const WATERFALL_DIR: &str = "waterfall";
pub const TEST_PROBS_FILE: &str = "shap_test_probs.json";

/// `sample_<i>` -> `class_<j>` -> probability, keys in lexical order.
pub type ProbabilityTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Creates `path`, failing with `Precondition` if it is already there.
/// Missing parents are created.
pub fn create_fresh_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(already_exists(path));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::create_dir(path) {
        Ok(()) => {
            debug!(path = %path.display(), "created artifact directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(already_exists(path)),
        Err(e) => Err(e.into()),
    }
}

fn already_exists(path: &Path) -> ShapError {
    ShapError::Precondition(format!(
        "{} already exists; clear it before re-running",
        path.display()
    ))
}

pub fn probabilities_table(probabilities: ArrayView2<f64>) -> ProbabilityTable {
    probabilities
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let classes = row
                .iter()
                .enumerate()
                .map(|(j, &p)| (format!("class_{}", j), p))
                .collect();
            (format!("sample_{}", i), classes)
        })
        .collect()
}

/// Writes the probability table as 4-space indented JSON.
pub fn write_test_probs(path: &Path, probabilities: ArrayView2<f64>) -> Result<()> {
    let table = probabilities_table(probabilities);
    let mut writer = BufWriter::new(fs::File::create(path)?);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    table.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}

pub fn summary_plot_path(shap_dir: &Path, class: usize) -> PathBuf {
    shap_dir.join(format!("class_{}_summary.png", class))
}

pub fn waterfall_class_dir(shap_dir: &Path, class: usize) -> PathBuf {
    shap_dir.join(WATERFALL_DIR).join(format!("class_{}", class))
}

pub fn waterfall_plot_path(class_dir: &Path, sample: usize) -> PathBuf {
    class_dir.join(format!("{}_waterfall_plot.png", sample))
}
