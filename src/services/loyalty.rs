use async_trait::async_trait;

/// External loyalty collaborator. Awards are best-effort: callers log
/// failures and never propagate them.
#[async_trait]
pub trait LoyaltyAwarder: Send + Sync {
    async fn award(&self, appointment_id: &str) -> anyhow::Result<()>;
}

/// Default provider: records the award in the log only. A real deployment
/// points this at the loyalty system's API.
pub struct ConsoleLoyalty;

#[async_trait]
impl LoyaltyAwarder for ConsoleLoyalty {
    async fn award(&self, appointment_id: &str) -> anyhow::Result<()> {
        tracing::info!(appointment_id, "loyalty stamp awarded");
        Ok(())
    }
}
