use thiserror::Error;

/// Failure modes of the force model and integrator.
#[derive(Debug, Error)]
pub enum Error {
    #[error("perturber index {0} out of range")]
    BodyIndexOutOfRange(usize),

    #[error("ephemeris unavailable: {0}")]
    EphemerisUnavailable(String),

    #[error("step starting at t={t} did not converge within {iterations} corrector sweeps")]
    NonConvergingStep { t: f64, iterations: usize },

    #[error("non-finite acceleration from {term} on particle {particle}")]
    NumericalFailure {
        term: &'static str,
        particle: usize,
    },

    #[error("output buffer exhausted after {steps} steps")]
    BufferFull { steps: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<ephem_spk::SpkError> for Error {
    fn from(err: ephem_spk::SpkError) -> Self {
        Error::EphemerisUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal state of an integration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegratorStatus {
    /// Reached the target time.
    Ok,
    /// The output buffer filled; the run stopped cleanly at a step boundary
    /// and can be resumed from the last emitted state with fresh buffers.
    BufferFull,
    /// Stopped by an embedding host between steps.
    UserStop,
    /// A force term produced a non-finite acceleration, or a step failed to
    /// converge within the retry budget.
    NumericalFailure,
    /// An ephemeris kernel could not be opened or does not cover the
    /// requested epoch.
    EphemerisError,
}

impl std::fmt::Display for IntegratorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IntegratorStatus::Ok => "ok",
            IntegratorStatus::BufferFull => "buffer full",
            IntegratorStatus::UserStop => "user stop",
            IntegratorStatus::NumericalFailure => "numerical failure",
            IntegratorStatus::EphemerisError => "ephemeris error",
        };
        f.write_str(name)
    }
}
