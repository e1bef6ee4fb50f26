//! Payment gateway stand-in used until a real bank integration exists.

use async_trait::async_trait;

use crate::domain::Challan;
use crate::ports::{Bank, GatewayOutcome, PaymentGateway};

/// Approves every debit once the bank credentials have been checked.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway;

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn debit(&self, bank: &Bank, challan: &Challan) -> GatewayOutcome {
        tracing::info!(
            bank = %bank.name,
            challan_id = %challan.id,
            amount = %challan.total_amount,
            "simulated debit approved"
        );
        GatewayOutcome::Approved
    }
}

/// Declines every debit with a fixed reason.
#[derive(Debug, Clone)]
pub struct DecliningGateway {
    pub reason: String,
}

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn debit(&self, bank: &Bank, challan: &Challan) -> GatewayOutcome {
        tracing::warn!(bank = %bank.name, challan_id = %challan.id, "debit declined");
        GatewayOutcome::Declined {
            reason: self.reason.clone(),
        }
    }
}
