//! Configuration for Transaction Admission Subsystem

use serde::{Deserialize, Serialize};
use shared_types::ClusterLayout;
use std::time::Duration;

use crate::domain::AdmissionError;

/// Admission configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Cluster shape shared by every participant
    pub layout: ClusterLayout,
    /// Abort admitted transactions whose acknowledgements take longer (seconds)
    pub ack_timeout_secs: u64,
    /// Upper bound on updates per transaction (anti-DoS)
    pub max_updates_per_tx: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            layout: ClusterLayout::default(),
            ack_timeout_secs: 30,
            max_updates_per_tx: 4096,
        }
    }
}

impl AdmissionConfig {
    /// Create config for testing.
    pub fn for_testing() -> Self {
        Self {
            layout: ClusterLayout::for_testing(),
            ack_timeout_secs: 5,
            max_updates_per_tx: 16,
        }
    }

    /// Acknowledgement timeout as a [`Duration`].
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    /// Reject configurations the tracker cannot run with.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        self.layout.validate()?;
        if self.ack_timeout_secs == 0 {
            return Err(AdmissionError::InvalidConfig(
                "ack_timeout_secs must be > 0".into(),
            ));
        }
        if self.max_updates_per_tx == 0 {
            return Err(AdmissionError::InvalidConfig(
                "max_updates_per_tx must be > 0".into(),
            ));
        }
        Ok(())
    }
}
