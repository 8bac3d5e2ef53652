use rust_decimal::Decimal;
use serde::Serialize;

use crate::workflows::settlement::catalog::MANAGEMENT_FEE_ID;
use crate::workflows::settlement::{
    DeductionId, DeductionItem, EstimationScenario, ProjectContext, ProjectFinancials,
    RegistrationInfo, SettlementBreakdown, SettlementWorksheet, SubcontractInfo,
};

/// Settlement figures as submitted for narration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementSnapshot {
    pub settlement_no: String,
    pub settlement_amount: Decimal,
    pub deductions: Vec<DeductionItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_fee: Option<Decimal>,
    pub scenario: EstimationScenario,
    pub tax_rate: Decimal,
    #[serde(flatten)]
    pub breakdown: SettlementBreakdown,
}

impl SettlementSnapshot {
    pub fn from_worksheet(worksheet: &SettlementWorksheet) -> Self {
        let settlement = worksheet.settlement();
        let management_fee = settlement
            .find(&DeductionId::new(MANAGEMENT_FEE_ID))
            .filter(|item| item.active)
            .map(|item| item.amount_against(settlement.settlement_amount));

        Self {
            settlement_no: settlement.settlement_no.clone(),
            settlement_amount: settlement.settlement_amount,
            deductions: settlement.active_deductions().cloned().collect(),
            management_fee,
            scenario: worksheet.scenario(),
            tax_rate: worksheet.params().tax_rate.as_decimal(),
            breakdown: worksheet.breakdown(),
        }
    }
}

/// Everything the risk audit sees: `{ registration, project, subcontract, settlement }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditSnapshot {
    pub registration: RegistrationInfo,
    pub project: ProjectFinancials,
    pub subcontract: SubcontractInfo,
    pub settlement: SettlementSnapshot,
}

impl AuditSnapshot {
    pub fn capture(context: &ProjectContext, worksheet: &SettlementWorksheet) -> Self {
        Self {
            registration: context.registration.clone(),
            project: context.project.clone(),
            subcontract: context.subcontract.clone(),
            settlement: SettlementSnapshot::from_worksheet(worksheet),
        }
    }
}
