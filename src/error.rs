use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for the dynamics kernel.
///
/// Numerical degeneracies (NaN roots, negative discriminants, non-approaching
/// pairs) are deliberately *not* errors: they encode as "no event"
/// (`f64::INFINITY` / `false`) and are the common-case control flow of
/// rejected candidate collisions. This enum covers the cases that genuinely
/// abort an operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Configuration-phase violation: adding plugin objects after
    /// initialisation, species/particle partition mismatches, duplicate
    /// named objects.
    #[error("configuration error: {0}")]
    Config(String),

    /// A by-name or by-membership registry lookup found nothing.
    #[error("no {kind} found matching \"{name}\"")]
    NotFound {
        /// Plugin family searched ("species", "interaction", ...).
        kind: &'static str,
        /// The name or id that was requested.
        name: String,
    },

    /// Numerical or geometric issue (e.g., degenerate contact normal).
    #[error("numerical error: {0}")]
    MathError(String),

    /// A particle was found outside the simulation domain or penetrating a
    /// boundary beyond tolerance.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
}
