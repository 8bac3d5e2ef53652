use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key for a deduction row within a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeductionId(pub String);

impl DeductionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeductionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionKind {
    /// Fraction of the settlement amount, e.g. `0.06`.
    Rate,
    /// Currency amount subtracted as-is.
    Fixed,
}

impl DeductionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rate => "比例",
            Self::Fixed => "金额",
        }
    }
}

/// One configurable line in the deduction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionItem {
    pub id: DeductionId,
    pub label: String,
    pub kind: DeductionKind,
    pub value: Decimal,
    pub active: bool,
    #[serde(default)]
    pub custom: bool,
}

impl DeductionItem {
    pub fn rate(id: &str, label: &str, value: Decimal, active: bool) -> Self {
        Self {
            id: DeductionId::new(id),
            label: label.to_string(),
            kind: DeductionKind::Rate,
            value,
            active,
            custom: false,
        }
    }

    pub fn fixed(id: &str, label: &str, value: Decimal, active: bool) -> Self {
        Self {
            id: DeductionId::new(id),
            label: label.to_string(),
            kind: DeductionKind::Fixed,
            value,
            active,
            custom: false,
        }
    }

    /// Contribution of this item to the total deductions for `settlement_amount`.
    ///
    /// Rates always apply to the raw settlement amount, never to a running remainder.
    pub fn amount_against(&self, settlement_amount: Decimal) -> Decimal {
        if !self.active {
            return Decimal::ZERO;
        }

        match self.kind {
            DeductionKind::Rate => settlement_amount * self.value,
            DeductionKind::Fixed => self.value,
        }
    }

    pub(crate) fn apply(&mut self, patch: DeductionPatch) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
    }
}

/// Partial update for a deduction row; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionPatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: Option<DeductionKind>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl DeductionPatch {
    pub fn active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }

    pub fn value(value: Decimal) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }
}

/// The settlement being edited: amount plus its deduction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSettlement {
    pub settlement_no: String,
    pub project_settlable_amount: Decimal,
    pub settlement_amount: Decimal,
    pub deductions: Vec<DeductionItem>,
}

impl CurrentSettlement {
    pub fn find(&self, id: &DeductionId) -> Option<&DeductionItem> {
        self.deductions.iter().find(|item| &item.id == id)
    }

    pub fn active_deductions(&self) -> impl Iterator<Item = &DeductionItem> {
        self.deductions.iter().filter(|item| item.active)
    }
}

/// Invoicing mix assumed when estimating the VAT input credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationScenario {
    /// Entire base payable billed on special (credit-bearing) invoices.
    #[default]
    Special,
    /// Entire base payable billed on general invoices, no credit.
    General,
    /// Base payable split by the mixed special ratio.
    Mixed,
}

impl EstimationScenario {
    pub const fn ordered() -> [Self; 3] {
        [Self::Special, Self::General, Self::Mixed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Special => "全专票",
            Self::General => "全普票",
            Self::Mixed => "混合票据",
        }
    }
}

/// VAT rates offered by the estimation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub enum TaxRate {
    OnePercent,
    ThreePercent,
    #[default]
    SixPercent,
    NinePercent,
    ThirteenPercent,
}

impl TaxRate {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::OnePercent,
            Self::ThreePercent,
            Self::SixPercent,
            Self::NinePercent,
            Self::ThirteenPercent,
        ]
    }

    pub const fn percent(self) -> u32 {
        match self {
            Self::OnePercent => 1,
            Self::ThreePercent => 3,
            Self::SixPercent => 6,
            Self::NinePercent => 9,
            Self::ThirteenPercent => 13,
        }
    }

    pub fn as_decimal(self) -> Decimal {
        Decimal::new(i64::from(self.percent()), 2)
    }
}

impl From<TaxRate> for Decimal {
    fn from(value: TaxRate) -> Self {
        value.as_decimal()
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = SettlementError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::ordered()
            .into_iter()
            .find(|rate| rate.as_decimal() == value)
            .ok_or(SettlementError::UnsupportedTaxRate(value))
    }
}

/// Tax rate and mixed split used by the estimation scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationParams {
    pub tax_rate: TaxRate,
    /// Share of base payable billed on special invoices, in `[0, 1]`.
    pub mixed_special_ratio: Decimal,
}

impl Default for EstimationParams {
    fn default() -> Self {
        Self {
            tax_rate: TaxRate::SixPercent,
            mixed_special_ratio: Decimal::new(5, 1),
        }
    }
}

/// Invoice side addressed by the mixed-mode inverse mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Special,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("{field} exceeds the supported maximum (got {value})")]
    AmountTooLarge { field: &'static str, value: Decimal },
    #[error("mixed special ratio must be within [0, 1] (got {0})")]
    RatioOutOfRange(Decimal),
    #[error("unsupported tax rate {0}; expected one of 0.01, 0.03, 0.06, 0.09, 0.13")]
    UnsupportedTaxRate(Decimal),
    #[error("deduction '{0}' not found")]
    UnknownDeduction(DeductionId),
    #[error("deduction id '{0}' appears more than once")]
    DuplicateDeduction(DeductionId),
}
