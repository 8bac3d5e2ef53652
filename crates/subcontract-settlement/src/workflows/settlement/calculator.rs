use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    CurrentSettlement, DeductionItem, EstimationParams, EstimationScenario, InvoiceKind,
};
use super::input::clamp_ratio;

/// Derived figures for one settlement; recomputed from inputs, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementBreakdown {
    pub total_deductions: Decimal,
    pub base_payable: Decimal,
    /// Tax-inclusive amount billed on special invoices.
    pub special_amount: Decimal,
    /// Amount billed on general invoices.
    pub general_amount: Decimal,
    pub total_input_tax_credit: Decimal,
    pub net_payable: Decimal,
}

impl SettlementBreakdown {
    pub fn invoice_total(&self) -> Decimal {
        self.special_amount + self.general_amount
    }
}

pub fn total_deductions(settlement_amount: Decimal, deductions: &[DeductionItem]) -> Decimal {
    deductions
        .iter()
        .map(|item| item.amount_against(settlement_amount))
        .sum()
}

/// Settlement amount after deductions, floored at zero.
pub fn base_payable(settlement_amount: Decimal, total_deductions: Decimal) -> Decimal {
    (settlement_amount - total_deductions).max(Decimal::ZERO)
}

struct InvoiceSplit {
    special_amount: Decimal,
    general_amount: Decimal,
    input_tax_credit: Decimal,
}

fn split_invoices(
    base_payable: Decimal,
    scenario: EstimationScenario,
    params: &EstimationParams,
) -> InvoiceSplit {
    let tax_rate = params.tax_rate.as_decimal();

    let special_ratio = match scenario {
        EstimationScenario::Special => Decimal::ONE,
        EstimationScenario::General => Decimal::ZERO,
        EstimationScenario::Mixed => clamp_ratio(params.mixed_special_ratio),
    };

    let special_base = base_payable * special_ratio;
    let general_base = base_payable - special_base;

    // special_amount / (1 + t) * t collapses to special_base * t, which stays exact.
    InvoiceSplit {
        special_amount: special_base * (Decimal::ONE + tax_rate),
        general_amount: general_base,
        input_tax_credit: special_base * tax_rate,
    }
}

pub fn calculate(
    settlement_amount: Decimal,
    deductions: &[DeductionItem],
    scenario: EstimationScenario,
    params: &EstimationParams,
) -> SettlementBreakdown {
    let total_deductions = total_deductions(settlement_amount, deductions);
    let base_payable = base_payable(settlement_amount, total_deductions);
    let split = split_invoices(base_payable, scenario, params);

    SettlementBreakdown {
        total_deductions,
        base_payable,
        special_amount: split.special_amount,
        general_amount: split.general_amount,
        total_input_tax_credit: split.input_tax_credit,
        net_payable: base_payable + split.input_tax_credit,
    }
}

pub fn calculate_settlement(
    settlement: &CurrentSettlement,
    scenario: EstimationScenario,
    params: &EstimationParams,
) -> SettlementBreakdown {
    calculate(
        settlement.settlement_amount,
        &settlement.deductions,
        scenario,
        params,
    )
}

/// Back-solve the mixed special ratio from an invoice amount typed directly.
///
/// Returns `None` when there is nothing payable to split. A quotient too large
/// for `Decimal` saturates to the matching end of `[0, 1]`.
pub fn mixed_ratio_for_invoice_amount(
    invoice: InvoiceKind,
    amount: Decimal,
    base_payable: Decimal,
    tax_rate: Decimal,
) -> Option<Decimal> {
    if base_payable <= Decimal::ZERO {
        return None;
    }

    let special_base = match invoice {
        InvoiceKind::Special => amount / (Decimal::ONE + tax_rate),
        InvoiceKind::General => base_payable - amount,
    };

    let ratio = special_base
        .checked_div(base_payable)
        .unwrap_or(if special_base.is_sign_negative() {
            Decimal::ZERO
        } else {
            Decimal::ONE
        });

    Some(clamp_ratio(ratio))
}
