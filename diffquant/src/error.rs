/// Failures raised while running the pipeline.
///
/// [`Error::Configuration`] aborts a run before any protein is processed.
/// The per-protein variants never abort a run: the protein is dropped and
/// the error is kept as the reason it is missing from the results.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{accession}: {reason}")]
    Data { accession: String, reason: String },
    #[error("{accession}: statistical test failed, {reason}")]
    Numerical { accession: String, reason: String },
}

impl Error {
    pub(crate) fn data<S: Into<String>>(accession: &str, reason: S) -> Error {
        Error::Data {
            accession: accession.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn numerical<S: Into<String>>(accession: &str, reason: S) -> Error {
        Error::Numerical {
            accession: accession.into(),
            reason: reason.into(),
        }
    }

    /// Protein the error refers to, if it is a per-protein error
    pub fn accession(&self) -> Option<&str> {
        match self {
            Error::Configuration(_) => None,
            Error::Data { accession, .. } | Error::Numerical { accession, .. } => Some(accession),
        }
    }
}
