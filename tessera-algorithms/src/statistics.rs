use anyhow::{bail, Result};
use tessera_core::containers::Cloud;

/// Computes the mean and the (population) variance of the scalar field of `cloud`. NaN values are ignored.
/// Returns `None` if there is no valid value.
///
/// The accumulation uses `f64` and Welford's online algorithm, so the result is stable even for large clouds
/// whose values have a large offset.
///
/// # Errors
///
/// If the scalar field of `cloud` is not enabled
pub fn compute_mean_and_variance<C: Cloud + ?Sized>(cloud: &C) -> Result<Option<(f64, f64)>> {
    if !cloud.is_scalar_field_enabled() {
        bail!("Cloud has no scalar field");
    }

    let mut count = 0_usize;
    let mut mean = 0.0_f64;
    let mut m2 = 0.0_f64;
    for index in 0..cloud.size() {
        let value = cloud.scalar_value(index)?;
        if value.is_nan() {
            continue;
        }
        let value = value as f64;
        count += 1;
        let delta = value - mean;
        mean += delta / count as f64;
        m2 += delta * (value - mean);
    }

    if count == 0 {
        return Ok(None);
    }
    Ok(Some((mean, m2 / count as f64)))
}
