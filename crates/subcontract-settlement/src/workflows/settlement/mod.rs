//! Settlement calculation for subcontract billing.
//!
//! A settlement amount is reduced by the active deduction items, floored at
//! zero, and the remaining base payable is split across special and general
//! invoices to estimate the VAT input credit. [`calculate`] is the pure entry
//! point; [`SettlementWorksheet`] wraps it with the editing operations and
//! memoization used by the interactive surface.

pub mod calculator;
pub mod catalog;
pub mod domain;
pub mod input;
pub mod project;
pub mod report;
pub mod worksheet;

pub use calculator::{
    base_payable, calculate, calculate_settlement, mixed_ratio_for_invoice_amount,
    total_deductions, SettlementBreakdown,
};
pub use catalog::{custom_deduction, standard_deductions};
pub use domain::{
    CurrentSettlement, DeductionId, DeductionItem, DeductionKind, DeductionPatch,
    EstimationParams, EstimationScenario, InvoiceKind, SettlementError, TaxRate,
};
pub use project::{
    CooperationMode, ProjectContext, ProjectFinancials, RegistrationInfo, SubcontractInfo,
};
pub use report::{format_currency, format_percent, SettlementReport};
pub use worksheet::{DeductionLineView, SettlementWorksheet, WorksheetView};
