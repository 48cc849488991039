// Range helpers shared by the drive encoder and the joint sequencer

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("Invalid range: low {low} is greater than high {high}")]
    InvertedBounds { low: i32, high: i32 },
}

/// Clamp `value` into `[low, high]`
pub fn clamp(value: i32, low: i32, high: i32) -> Result<i32, RangeError> {
    if low > high {
        return Err(RangeError::InvertedBounds { low, high });
    }
    Ok(value.max(low).min(high))
}

/// Linearly map `value` from `domain` onto `range`
///
/// Values outside the domain are held at the nearest endpoint.
pub fn interpolate(value: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let (x0, x1) = domain;
    let (y0, y1) = range;
    if value <= x0 {
        return y0;
    }
    if value >= x1 {
        return y1;
    }
    y0 + (value - x0) * (y1 - y0) / (x1 - x0)
}
