// src/utils/features.rs

/// Separator between index coordinates in a feature name.
pub const FEATURE_NAME_SEPARATOR: &str = "x";

/// Names every position of a sample of shape `sample_shape`, in row-major order.
///
/// A (1, 2, 2) sample yields `0x0x0, 0x0x1, 0x1x0, 0x1x1`. This order is the
/// column order of flattened samples. A scalar sample (empty shape) has exactly
/// one feature, named by the empty string.
pub fn generate_feature_names(sample_shape: &[usize]) -> Vec<String> {
    let total: usize = sample_shape.iter().product();
    let mut names = Vec::with_capacity(total);
    let mut index = vec![0_usize; sample_shape.len()];

    for _ in 0..total {
        let name = index
            .iter()
            .map(|coord| coord.to_string())
            .collect::<Vec<_>>()
            .join(FEATURE_NAME_SEPARATOR);
        names.push(name);

        // odometer increment, last axis fastest
        for axis in (0..index.len()).rev() {
            index[axis] += 1;
            if index[axis] < sample_shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    names
}
