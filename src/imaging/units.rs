//! Physical length → pixel conversion.

/// Length unit accepted in a resize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Px,
    Cm,
    In,
}

impl Unit {
    /// Parse a unit name. Anything unrecognized is read as pixels rather than
    /// rejected, so `"pt"` behaves like `"px"`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "cm" => Self::Cm,
            "in" => Self::In,
            _ => Self::Px,
        }
    }
}

const CM_PER_INCH: f64 = 2.54;

/// Convert a length to whole pixels at the given DPI.
///
/// An absent value stays absent: it means "derive this axis", not zero.
///
/// ```
/// # use imgtool::imaging::{Unit, to_pixels};
/// assert_eq!(to_pixels(Some(2.54), Unit::Cm, 72.0), Some(72));
/// assert_eq!(to_pixels(Some(2.0), Unit::In, 96.0), Some(192));
/// assert_eq!(to_pixels(Some(799.6), Unit::Px, 72.0), Some(800));
/// assert_eq!(to_pixels(None, Unit::Cm, 300.0), None);
/// ```
pub fn to_pixels(value: Option<f64>, unit: Unit, dpi: f64) -> Option<u32> {
    let value = value?;
    let pixels = match unit {
        Unit::Cm => value / CM_PER_INCH * dpi,
        Unit::In => value * dpi,
        Unit::Px => value,
    };
    Some(pixels.round() as u32)
}
