//! Clamping of aperture values into the admissible range.

/// Clip one value: raise it to `minimum` first, then cap it at `maximum`.
#[inline]
pub fn clip_aperture(value: f64, minimum: f64, maximum: f64) -> f64 {
    let value = if value < minimum { minimum } else { value };
    if value > maximum {
        maximum
    } else {
        value
    }
}

/// Clip every aperture in place.
pub fn clip_apertures(values: &mut [f64], minimum: f64, maximum: f64) {
    for v in values.iter_mut() {
        *v = clip_aperture(*v, minimum, maximum);
    }
}
