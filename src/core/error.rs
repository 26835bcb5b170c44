use thiserror::Error;

/// Recoverable pipeline errors. Venue and per-subject failures are recorded
/// and carried alongside partial results; only configuration errors abort a
/// run, and those stay on the anyhow path at startup.
#[derive(Clone, Debug, Error)]
pub enum PipelineError {
    /// A venue catalog fetch failed. The venue is degraded to an empty
    /// catalog and processing continues with partial data.
    #[error("{venue} catalog fetch failed: {reason}")]
    UpstreamFetch { venue: String, reason: String },

    /// The oracle call for one subject failed in transport, before any
    /// reply text was available.
    #[error("oracle request for {subject_id} failed: {reason}")]
    OracleRequest { subject_id: String, reason: String },

    /// The oracle reply for one subject contained no valid embedded JSON,
    /// or the JSON failed schema validation.
    #[error("oracle reply for {subject_id} unusable: {reason}")]
    OracleParse { subject_id: String, reason: String },
}

impl PipelineError {
    pub fn upstream(venue: impl Into<String>, reason: impl ToString) -> Self {
        Self::UpstreamFetch {
            venue: venue.into(),
            reason: reason.to_string(),
        }
    }
}
