use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::calculator::SettlementBreakdown;
use super::domain::{DeductionItem, DeductionKind, EstimationScenario};
use super::worksheet::SettlementWorksheet;

/// Currency text with thousands separators and exactly two decimals, e.g. `218,000.00`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}

/// Fraction rendered as a one-decimal percentage, e.g. `0.06` -> `6.0%`.
pub fn format_percent(rate: Decimal) -> String {
    let percent = (rate * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{percent:.1}%")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDeductionLine {
    pub label: String,
    pub mode: &'static str,
    pub basis: String,
    pub amount: Decimal,
    pub amount_display: String,
}

impl ReportDeductionLine {
    fn from_item(item: &DeductionItem, settlement_amount: Decimal) -> Self {
        let basis = match item.kind {
            DeductionKind::Rate => format_percent(item.value),
            DeductionKind::Fixed => format!("¥{}", format_currency(item.value)),
        };
        let amount = item.amount_against(settlement_amount);

        Self {
            label: item.label.clone(),
            mode: item.kind.label(),
            basis,
            amount,
            amount_display: format!("¥ {}", format_currency(amount)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceEstimateSection {
    pub scenario: EstimationScenario,
    pub scenario_label: &'static str,
    pub tax_rate: String,
    pub special_amount: String,
    pub general_amount: String,
    pub invoice_total: String,
    pub input_tax_credit: String,
}

/// Final settlement report: raw figures plus their display strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementReport {
    pub settlement_no: String,
    pub settlement_amount: String,
    pub deductions: Vec<ReportDeductionLine>,
    pub total_deductions: String,
    pub invoice_estimate: InvoiceEstimateSection,
    pub net_payable: String,
    pub breakdown: SettlementBreakdown,
    pub generated_at: String,
}

impl SettlementReport {
    pub fn from_worksheet(worksheet: &SettlementWorksheet, generated_at: NaiveDateTime) -> Self {
        let settlement = worksheet.settlement();
        let breakdown = worksheet.breakdown();
        let scenario = worksheet.scenario();

        let deductions = settlement
            .active_deductions()
            .map(|item| ReportDeductionLine::from_item(item, settlement.settlement_amount))
            .collect();

        Self {
            settlement_no: settlement.settlement_no.clone(),
            settlement_amount: format_currency(settlement.settlement_amount),
            deductions,
            total_deductions: format_currency(breakdown.total_deductions),
            invoice_estimate: InvoiceEstimateSection {
                scenario,
                scenario_label: scenario.label(),
                tax_rate: format_percent(worksheet.params().tax_rate.as_decimal()),
                special_amount: format_currency(breakdown.special_amount),
                general_amount: format_currency(breakdown.general_amount),
                invoice_total: format_currency(breakdown.invoice_total()),
                input_tax_credit: format_currency(breakdown.total_input_tax_credit),
            },
            net_payable: format_currency(breakdown.net_payable),
            breakdown,
            generated_at: generated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}
