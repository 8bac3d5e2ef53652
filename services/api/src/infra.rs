use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use subcontract_settlement::workflows::risk_audit::{AuditSnapshot, RiskAuditService};
use subcontract_settlement::workflows::settlement::{
    CooperationMode, ProjectContext, ProjectFinancials, RegistrationInfo, SettlementWorksheet,
    SubcontractInfo,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Session state behind the worksheet routes: one record, one writer at a time.
#[derive(Clone)]
pub(crate) struct SettlementDesk {
    worksheet: Arc<Mutex<SettlementWorksheet>>,
    context: Arc<ProjectContext>,
    audit: Arc<RiskAuditService>,
}

impl SettlementDesk {
    pub(crate) fn new(
        context: ProjectContext,
        worksheet: SettlementWorksheet,
        audit: RiskAuditService,
    ) -> Self {
        Self {
            worksheet: Arc::new(Mutex::new(worksheet)),
            context: Arc::new(context),
            audit: Arc::new(audit),
        }
    }

    /// Run `f` against the worksheet, recovering the guard if a previous holder panicked.
    pub(crate) fn with_worksheet<R>(&self, f: impl FnOnce(&mut SettlementWorksheet) -> R) -> R {
        let mut guard = self
            .worksheet
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub(crate) fn audit_snapshot(&self) -> AuditSnapshot {
        self.with_worksheet(|worksheet| AuditSnapshot::capture(&self.context, worksheet))
    }

    pub(crate) fn audit(&self) -> &RiskAuditService {
        &self.audit
    }
}

pub(crate) fn sample_worksheet() -> SettlementWorksheet {
    SettlementWorksheet::new("FBJS-2024-1025-001", Decimal::new(400_000, 0))
}

pub(crate) fn sample_project_context() -> ProjectContext {
    ProjectContext {
        registration: RegistrationInfo {
            department: "第一事业部".to_string(),
            user: "结算专员".to_string(),
            date: "2024-10-25".to_string(),
        },
        project: ProjectFinancials {
            project_name:
                "广东深圳大远村设计项目 - 二期旧城改造与环境综合整治提升工程设计项目标段一"
                    .to_string(),
            project_no: "PRJ-SZ-2024-001".to_string(),
            project_belonging: "中国房建设计集团有限公司 - 第一事业部".to_string(),
            total_amount: Decimal::new(3_000_000, 0),
            invoiced_amount: Decimal::new(1_850_000, 0),
            received_amount: Decimal::new(1_200_000, 0),
            accumulated_sub_settlement: Decimal::new(800_000, 0),
            available_funds: Decimal::new(400_000, 0),
        },
        subcontract: SubcontractInfo {
            contract_name: "二期环境整治专项设计分包合同".to_string(),
            contract_no: "FB-SZ-2024-017".to_string(),
            vendor_name: "深圳市城境景观设计有限公司".to_string(),
            cooperation_mode: CooperationMode::Franchise,
            contract_amount: Decimal::new(1_200_000, 0),
            accumulated_invoicing: Decimal::new(650_000, 0),
            accumulated_settlement: Decimal::new(600_000, 0),
            paid_amount: Decimal::new(520_000, 0),
            unsettled_amount: Decimal::new(600_000, 0),
        },
    }
}
