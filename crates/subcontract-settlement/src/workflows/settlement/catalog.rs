use rust_decimal::Decimal;

use super::domain::{DeductionId, DeductionItem, DeductionKind};

pub const CUSTOM_DEDUCTION_LABEL: &str = "新增扣除项";
pub const MANAGEMENT_FEE_ID: &str = "mgmt";

/// Deduction list every new settlement starts from.
pub fn standard_deductions() -> Vec<DeductionItem> {
    vec![
        DeductionItem::rate("vat", "增值税率(6%)", Decimal::new(6, 2), true),
        DeductionItem::rate("additional", "附加税率(2%)", Decimal::new(2, 2), true),
        DeductionItem::rate("signing", "签字费率(2%)", Decimal::new(2, 2), true),
        DeductionItem::rate("other_rate", "其他费率", Decimal::ZERO, false),
        DeductionItem::fixed(MANAGEMENT_FEE_ID, "加盟管理费(年费)", Decimal::new(5000, 0), false),
        DeductionItem::fixed("bid_svc", "投标服务费", Decimal::ZERO, false),
        DeductionItem::fixed("bid_bond", "投标保证金", Decimal::ZERO, false),
        DeductionItem::fixed("perf_bond", "履约保证金", Decimal::new(2000, 0), false),
        DeductionItem::fixed("guarantee", "保函费用", Decimal::ZERO, false),
        DeductionItem::fixed("penalty", "罚款", Decimal::ZERO, false),
    ]
}

/// Blank user-added row: a zero fixed amount, active by default.
pub fn custom_deduction(sequence: u64) -> DeductionItem {
    DeductionItem {
        id: DeductionId(format!("custom_{sequence}")),
        label: CUSTOM_DEDUCTION_LABEL.to_string(),
        kind: DeductionKind::Fixed,
        value: Decimal::ZERO,
        active: true,
        custom: true,
    }
}
