use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Who registered the settlement and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInfo {
    pub department: String,
    pub user: String,
    pub date: String,
}

/// Head-contract financial position of the project the subcontract belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFinancials {
    pub project_name: String,
    pub project_no: String,
    pub project_belonging: String,
    pub total_amount: Decimal,
    pub invoiced_amount: Decimal,
    pub received_amount: Decimal,
    pub accumulated_sub_settlement: Decimal,
    pub available_funds: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooperationMode {
    /// 加盟
    Franchise,
    /// 自营
    SelfOperated,
    /// 单项目合作
    SingleProject,
}

impl CooperationMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Franchise => "加盟",
            Self::SelfOperated => "自营",
            Self::SingleProject => "单项目合作",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcontractInfo {
    pub contract_name: String,
    pub contract_no: String,
    pub vendor_name: String,
    pub cooperation_mode: CooperationMode,
    pub contract_amount: Decimal,
    pub accumulated_invoicing: Decimal,
    pub accumulated_settlement: Decimal,
    pub paid_amount: Decimal,
    pub unsettled_amount: Decimal,
}

/// Read-only context shown alongside a settlement and handed to the risk audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub registration: RegistrationInfo,
    pub project: ProjectFinancials,
    pub subcontract: SubcontractInfo,
}
