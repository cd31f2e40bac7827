//! Extraction session state.
//!
//! The original threads its handful of flags and its `errors` accumulator
//! through file-scope `static`s (spec.md §9 Design Notes); this crate
//! threads the same state explicitly through a `Session` value instead, so
//! nothing here depends on being run once per process.

use crate::cluster::VerifyErrors;
use crate::config::ExtractConfig;

/// Carries the extraction configuration and the running verification-error
/// total across an entire disc (or single-partition) extraction.
pub struct Session {
    pub config: ExtractConfig,
    errors: VerifyErrors,
}

impl Session {
    pub fn new(config: ExtractConfig) -> Self {
        Session {
            config,
            errors: VerifyErrors::empty(),
        }
    }

    pub fn record(&mut self, errors: VerifyErrors) {
        self.errors |= errors;
    }

    pub fn errors(&self) -> VerifyErrors {
        self.errors
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accumulates_errors_across_records() {
        let mut session = Session::new(ExtractConfig::default());
        session.record(VerifyErrors::H0);
        session.record(VerifyErrors::H2);
        assert_eq!(session.errors(), VerifyErrors::H0 | VerifyErrors::H2);
    }
}
