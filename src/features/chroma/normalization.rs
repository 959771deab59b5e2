//! Chroma normalization

/// Scale a chroma vector so its largest element is 1.0
///
/// All-zero (or non-positive) vectors are left untouched.
pub fn normalize_max(chroma: &mut [f32; 12]) {
    let max = chroma.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in chroma.iter_mut() {
            *v /= max;
        }
    }
}
