//! Pending-issues collaborators.
//!
//! The orchestrator attaches a [`PendingIssues`] summary to every resolved
//! profile. Where the counts come from is pluggable: [`SimulatedIssues`] draws
//! bounded random counts, [`NoIssues`] reports a clean record and
//! [`FixedIssues`] returns the same summary every time.

use std::sync::Mutex;

use crate::{PendingIssues, RegistryId};

pub trait IssueSource: Send + Sync {
    fn assess(&self, registry_id: &RegistryId) -> PendingIssues;
}

/// Synthetic issue generator.
///
/// Financial 0..=3, fiscal 0..=2, labor 0..=2, baseline score 300..=900.
#[derive(Debug)]
pub struct SimulatedIssues {
    rng: Mutex<fastrand::Rng>,
}

impl SimulatedIssues {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for SimulatedIssues {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueSource for SimulatedIssues {
    fn assess(&self, _registry_id: &RegistryId) -> PendingIssues {
        let mut rng = self
            .rng
            .lock()
            .expect("issue generator lock should not be poisoned");
        PendingIssues {
            financial: rng.u32(0..=3),
            fiscal: rng.u32(0..=2),
            labor: rng.u32(0..=2),
            baseline_score: rng.u16(300..=900),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoIssues;

impl IssueSource for NoIssues {
    fn assess(&self, _registry_id: &RegistryId) -> PendingIssues {
        PendingIssues::default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedIssues(pub PendingIssues);

impl IssueSource for FixedIssues {
    fn assess(&self, _registry_id: &RegistryId) -> PendingIssues {
        self.0
    }
}
