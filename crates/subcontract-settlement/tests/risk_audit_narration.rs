use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;
use subcontract_settlement::workflows::risk_audit::{
    build_prompt, AuditSnapshot, DisabledNarration, GenerativeTextClient, NarrationSource,
    RiskAuditService, FALLBACK_NARRATION,
};
use subcontract_settlement::workflows::settlement::{
    CooperationMode, DeductionId, DeductionPatch, ProjectContext, ProjectFinancials,
    RegistrationInfo, SettlementWorksheet, SubcontractInfo,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn project_context() -> ProjectContext {
    ProjectContext {
        registration: RegistrationInfo {
            department: "第一事业部".to_string(),
            user: "王工".to_string(),
            date: "2024-10-25".to_string(),
        },
        project: ProjectFinancials {
            project_name: "大远村旧城改造设计项目".to_string(),
            project_no: "PRJ-SZ-2024-001".to_string(),
            project_belonging: "第一事业部".to_string(),
            total_amount: dec!(3000000),
            invoiced_amount: dec!(1850000),
            received_amount: dec!(1200000),
            accumulated_sub_settlement: dec!(800000),
            available_funds: dec!(400000),
        },
        subcontract: SubcontractInfo {
            contract_name: "景观设计分包合同".to_string(),
            contract_no: "FB-2024-017".to_string(),
            vendor_name: "深圳某设计工作室".to_string(),
            cooperation_mode: CooperationMode::Franchise,
            contract_amount: dec!(900000),
            accumulated_invoicing: dec!(500000),
            accumulated_settlement: dec!(450000),
            paid_amount: dec!(400000),
            unsettled_amount: dec!(450000),
        },
    }
}

fn snapshot() -> AuditSnapshot {
    let mut sheet = SettlementWorksheet::new("FBJS-2024-1025-001", dec!(400000));
    sheet.set_settlement_amount(dec!(250000));
    sheet
        .update_deduction(&DeductionId::new("mgmt"), DeductionPatch::active(true))
        .expect("standard deduction present");
    AuditSnapshot::capture(&project_context(), &sheet)
}

fn client_for(server: &MockServer) -> GenerativeTextClient {
    GenerativeTextClient::new(server.uri(), "audit-model", "test-key", Duration::from_secs(5))
        .expect("client builds")
}

#[test]
fn snapshot_carries_management_fee_and_active_rows() {
    let snapshot = snapshot();

    assert_eq!(snapshot.settlement.management_fee, Some(dec!(5000)));
    assert_eq!(snapshot.settlement.deductions.len(), 4);
    assert_eq!(snapshot.settlement.breakdown.net_payable, dec!(233200));

    let prompt = build_prompt(&snapshot).expect("prompt renders");
    assert!(prompt.contains("233,200.00"));
    assert!(prompt.contains("400,000.00"));
    assert!(prompt.contains("加盟管理费（5,000.00）"));
    assert!(prompt.contains("450,000.00"));

    let lines: Vec<&str> = prompt.lines().collect();
    assert_eq!(lines.len(), 16);
    assert!(lines[2].starts_with("【登记与项目信息】{"));
    assert_eq!(lines[13], "4. 结合分包未结算余额（450,000.00）评估本次结算后的支付进度风险。");
    assert_eq!(lines[15], "请用中文给出专业、简洁、可供管理层决策参考的审计结论。");
}

#[tokio::test]
async fn generated_text_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/audit-model:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_string_contains("FBJS-2024-1025-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "结算金额处于安全边际内。" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = RiskAuditService::new(Arc::new(client_for(&server)));
    let narration = service.narrate(&snapshot()).await;

    assert_eq!(narration.source, NarrationSource::Generated);
    assert_eq!(narration.text, "结算金额处于安全边际内。");
}

#[tokio::test]
async fn quota_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let service = RiskAuditService::new(Arc::new(client_for(&server)));
    let narration = service.narrate(&snapshot()).await;

    assert_eq!(narration.source, NarrationSource::Fallback);
    assert_eq!(narration.text, FALLBACK_NARRATION);
}

#[tokio::test]
async fn malformed_body_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let service = RiskAuditService::new(Arc::new(client_for(&server)));
    let narration = service.narrate(&snapshot()).await;

    assert_eq!(narration.source, NarrationSource::Fallback);
}

#[tokio::test]
async fn unreachable_endpoint_falls_back() {
    let client = GenerativeTextClient::new(
        "http://127.0.0.1:9",
        "audit-model",
        "test-key",
        Duration::from_secs(2),
    )
    .expect("client builds");

    let narration = RiskAuditService::new(Arc::new(client))
        .narrate(&snapshot())
        .await;

    assert_eq!(narration.text, FALLBACK_NARRATION);
}

#[tokio::test]
async fn disabled_gateway_falls_back() {
    let narration = RiskAuditService::new(Arc::new(DisabledNarration))
        .narrate(&snapshot())
        .await;

    assert_eq!(narration.source, NarrationSource::Fallback);
}
