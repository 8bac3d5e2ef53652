use std::cell::OnceCell;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::calculator::{calculate_settlement, mixed_ratio_for_invoice_amount, SettlementBreakdown};
use super::catalog::{custom_deduction, standard_deductions};
use super::domain::{
    CurrentSettlement, DeductionId, DeductionItem, DeductionKind, DeductionPatch,
    EstimationParams, EstimationScenario, InvoiceKind, SettlementError, TaxRate,
};
use super::input::{clamp_ratio, normalize_amount, normalize_deduction_value};

/// The single editable settlement record plus its estimation settings.
///
/// Every mutator normalizes its input and drops the memoized breakdown, so
/// [`SettlementWorksheet::breakdown`] recomputes at most once per edit.
#[derive(Debug, Clone)]
pub struct SettlementWorksheet {
    settlement: CurrentSettlement,
    scenario: EstimationScenario,
    params: EstimationParams,
    custom_sequence: u64,
    cached: OnceCell<SettlementBreakdown>,
}

impl SettlementWorksheet {
    /// Start a worksheet with the standard deduction list and a zero amount.
    pub fn new(settlement_no: impl Into<String>, project_settlable_amount: Decimal) -> Self {
        Self::from_settlement(CurrentSettlement {
            settlement_no: settlement_no.into(),
            project_settlable_amount: normalize_amount(project_settlable_amount),
            settlement_amount: Decimal::ZERO,
            deductions: standard_deductions(),
        })
    }

    pub fn from_settlement(settlement: CurrentSettlement) -> Self {
        Self {
            settlement,
            scenario: EstimationScenario::default(),
            params: EstimationParams::default(),
            custom_sequence: 0,
            cached: OnceCell::new(),
        }
    }

    pub fn settlement(&self) -> &CurrentSettlement {
        &self.settlement
    }

    pub fn scenario(&self) -> EstimationScenario {
        self.scenario
    }

    pub fn params(&self) -> &EstimationParams {
        &self.params
    }

    pub fn breakdown(&self) -> SettlementBreakdown {
        *self.cached.get_or_init(|| {
            let breakdown = calculate_settlement(&self.settlement, self.scenario, &self.params);
            debug!(
                settlement_no = %self.settlement.settlement_no,
                scenario = ?self.scenario,
                net_payable = %breakdown.net_payable,
                "settlement breakdown recomputed"
            );
            breakdown
        })
    }

    pub fn set_settlement_amount(&mut self, amount: Decimal) {
        self.settlement.settlement_amount = normalize_amount(amount);
        self.invalidate();
    }

    pub fn update_deduction(
        &mut self,
        id: &DeductionId,
        mut patch: DeductionPatch,
    ) -> Result<&DeductionItem, SettlementError> {
        let item = self
            .settlement
            .deductions
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| SettlementError::UnknownDeduction(id.clone()))?;

        let kind = patch.kind.unwrap_or(item.kind);
        patch.value = patch
            .value
            .map(|value| normalize_deduction_value(kind, value));
        item.apply(patch);
        // A kind switch without a new value can leave a fixed amount sitting in a rate slot.
        item.value = normalize_deduction_value(item.kind, item.value);

        self.cached = OnceCell::new();
        Ok(item)
    }

    /// Append a blank custom row and return its id.
    pub fn add_custom_deduction(&mut self) -> DeductionId {
        let item = loop {
            self.custom_sequence += 1;
            let candidate = custom_deduction(self.custom_sequence);
            if self.settlement.find(&candidate.id).is_none() {
                break candidate;
            }
        };

        let id = item.id.clone();
        self.settlement.deductions.push(item);
        self.invalidate();
        id
    }

    pub fn set_scenario(&mut self, scenario: EstimationScenario) {
        self.scenario = scenario;
        self.invalidate();
    }

    pub fn set_tax_rate(&mut self, tax_rate: TaxRate) {
        self.params.tax_rate = tax_rate;
        self.invalidate();
    }

    pub fn set_mixed_ratio(&mut self, ratio: Decimal) {
        self.params.mixed_special_ratio = clamp_ratio(ratio);
        self.invalidate();
    }

    /// Set the mixed split from a typed invoice amount.
    ///
    /// Leaves the ratio untouched and returns `None` while nothing is payable.
    pub fn set_mixed_invoice_amount(
        &mut self,
        invoice: InvoiceKind,
        amount: Decimal,
    ) -> Option<Decimal> {
        let base_payable = self.breakdown().base_payable;
        let ratio = mixed_ratio_for_invoice_amount(
            invoice,
            normalize_amount(amount),
            base_payable,
            self.params.tax_rate.as_decimal(),
        )?;

        self.set_mixed_ratio(ratio);
        Some(ratio)
    }

    pub fn view(&self) -> WorksheetView {
        let amount = self.settlement.settlement_amount;
        WorksheetView {
            settlement_no: self.settlement.settlement_no.clone(),
            project_settlable_amount: self.settlement.project_settlable_amount,
            settlement_amount: amount,
            scenario: self.scenario,
            params: self.params,
            deductions: self
                .settlement
                .deductions
                .iter()
                .map(|item| DeductionLineView {
                    id: item.id.clone(),
                    label: item.label.clone(),
                    kind: item.kind,
                    value: item.value,
                    active: item.active,
                    custom: item.custom,
                    amount: item.amount_against(amount),
                })
                .collect(),
            breakdown: self.breakdown(),
        }
    }

    fn invalidate(&mut self) {
        self.cached = OnceCell::new();
    }
}

/// Deduction row together with its current contribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionLineView {
    pub id: DeductionId,
    pub label: String,
    pub kind: DeductionKind,
    pub value: Decimal,
    pub active: bool,
    pub custom: bool,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorksheetView {
    pub settlement_no: String,
    pub project_settlable_amount: Decimal,
    pub settlement_amount: Decimal,
    pub scenario: EstimationScenario,
    pub params: EstimationParams,
    pub deductions: Vec<DeductionLineView>,
    pub breakdown: SettlementBreakdown,
}
