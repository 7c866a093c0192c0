//! Lead board with optimistic status updates.
//!
//! A change is applied locally first, the previous value is held in a
//! `PendingChange`, and the change is then committed with the server's copy or
//! reverted if the service rejects it.

use crate::api::LeadService;
use crate::model::{Lead, LeadUpdate};
use thiserror::Error;

const UPDATE_FAILED: &str = "Failed to update lead";

#[derive(Debug, Error)]
pub(crate) enum LeadError {
    #[error("lead {0} not found")]
    NotFound(String),
    #[error("nothing to update")]
    EmptyUpdate,
    #[error("{0}")]
    Rejected(String),
}

/// A tentative change awaiting confirmation. Must be committed or reverted.
#[must_use]
#[derive(Debug)]
pub(crate) struct PendingChange {
    lead_id: String,
    previous: Lead,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LeadBoard {
    leads: Vec<Lead>,
}

impl LeadBoard {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self { leads }
    }

    pub fn get(&self, lead_id: &str) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == lead_id)
    }

    fn slot(&mut self, lead_id: &str) -> Option<&mut Lead> {
        self.leads.iter_mut().find(|l| l.id == lead_id)
    }

    /// Apply `update` tentatively and remember the previous value.
    pub fn begin(&mut self, lead_id: &str, update: &LeadUpdate) -> Result<PendingChange, LeadError> {
        if update.is_empty() {
            return Err(LeadError::EmptyUpdate);
        }
        let lead = self
            .slot(lead_id)
            .ok_or_else(|| LeadError::NotFound(lead_id.to_string()))?;
        let previous = lead.clone();
        update.apply_to(lead);
        Ok(PendingChange {
            lead_id: lead_id.to_string(),
            previous,
        })
    }

    /// Replace the tentative value with the server's confirmed copy.
    pub fn commit(&mut self, change: PendingChange, confirmed: Lead) {
        if let Some(lead) = self.slot(&change.lead_id) {
            *lead = confirmed;
        }
    }

    /// Restore the value held before the change.
    pub fn revert(&mut self, change: PendingChange) {
        if let Some(lead) = self.slot(&change.lead_id) {
            *lead = change.previous;
        }
    }

    /// Optimistically update a lead, rolling back if the service rejects the change.
    pub async fn update_lead(
        &mut self,
        service: &dyn LeadService,
        lead_id: &str,
        update: &LeadUpdate,
    ) -> Result<Lead, LeadError> {
        let change = self.begin(lead_id, update)?;
        tracing::info!(lead_id, status = ?update.status, "updating lead");

        match service.update_lead(lead_id, update).await {
            Ok(confirmed) => {
                tracing::info!(lead_id, "lead updated");
                self.commit(change, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                tracing::error!(lead_id, error = %e, "lead update failed, reverting");
                self.revert(change);
                Err(LeadError::Rejected(e.user_message(UPDATE_FAILED)))
            }
        }
    }
}
