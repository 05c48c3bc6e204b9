//! Read-only projection of campaigns awaiting review.

use std::sync::Arc;

use adflow_core::{Action, Campaign, CampaignStatus, Result, User};

use super::decide;
use crate::store::CampaignStore;

pub struct ApprovalQueueView {
    store: Arc<dyn CampaignStore>,
}

impl ApprovalQueueView {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }

    /// Campaigns in `pending_approval`, longest waiting first.
    pub async fn list(&self, actor: &User) -> Result<Vec<Campaign>> {
        decide(actor, Action::ViewApprovalQueue, None)
            .check_forbidden(Action::ViewApprovalQueue)?;
        Ok(self
            .store
            .list_campaigns_by_status(CampaignStatus::PendingApproval)
            .await?)
    }
}
