use thiserror::Error;

/// Errors that may occur when evaluating fluid properties.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    /// The input lies outside the correlation's valid domain.
    #[error("`{property}` is undefined at {input} (valid range {min}..={max})")]
    OutOfRange {
        property: &'static str,
        input: f64,
        min: f64,
        max: f64,
    },

    /// The input values are physically invalid.
    #[error("invalid input to `{property}`: {context}")]
    InvalidInput {
        property: &'static str,
        context: String,
    },
}

impl PropertyError {
    pub(crate) fn check_range(
        property: &'static str,
        input: f64,
        min: f64,
        max: f64,
    ) -> Result<(), Self> {
        if input.is_finite() && (min..=max).contains(&input) {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                property,
                input,
                min,
                max,
            })
        }
    }
}
