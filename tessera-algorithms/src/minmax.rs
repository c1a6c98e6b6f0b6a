use anyhow::{bail, Result};
use float_ord::FloatOrd;
use itertools::{Itertools, MinMaxResult};
use tessera_core::{containers::Cloud, ScalarType};

/// Returns the minimum and maximum value of the scalar field of `cloud`. Values that are NaN (e.g.
/// [`NAN_VALUE`](tessera_core::NAN_VALUE)) are ignored. Returns `None` if `cloud` contains no points or only NaN
/// values.
///
/// # Errors
///
/// If the scalar field of `cloud` is not enabled
pub fn scalar_minmax<C: Cloud + ?Sized>(cloud: &C) -> Result<Option<(ScalarType, ScalarType)>> {
    if !cloud.is_scalar_field_enabled() {
        bail!("Cloud has no scalar field");
    }

    let values = (0..cloud.size())
        .map(|index| cloud.scalar_value(index))
        .collect::<Result<Vec<_>, _>>()?;

    let minmax = match values
        .into_iter()
        .filter(|value| !value.is_nan())
        .minmax_by_key(|value| FloatOrd(*value))
    {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(value) => Some((value, value)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    };
    Ok(minmax)
}
