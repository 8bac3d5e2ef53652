use crate::infra::{AppState, SettlementDesk};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post, put};
use axum::{Extension, Json, Router};
use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use subcontract_settlement::error::AppError;
use subcontract_settlement::workflows::risk_audit::RiskNarration;
use subcontract_settlement::workflows::settlement::input::{
    validate_amount, validate_deduction_value, validate_deductions, validate_ratio,
};
use subcontract_settlement::workflows::settlement::{
    calculate, mixed_ratio_for_invoice_amount, standard_deductions, DeductionId, DeductionItem,
    DeductionPatch, EstimationParams, EstimationScenario, InvoiceKind,
    SettlementBreakdown, SettlementError, SettlementReport, TaxRate, WorksheetView,
};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub(crate) struct CalculateRequest {
    pub(crate) settlement_amount: Decimal,
    /// Omitted means the standard deduction list.
    #[serde(default)]
    pub(crate) deductions: Option<Vec<DeductionItem>>,
    #[serde(default)]
    pub(crate) scenario: EstimationScenario,
    #[serde(default)]
    pub(crate) tax_rate: TaxRate,
    #[serde(default)]
    pub(crate) mixed_special_ratio: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CalculateResponse {
    pub(crate) scenario: EstimationScenario,
    pub(crate) tax_rate: TaxRate,
    #[serde(flatten)]
    pub(crate) breakdown: SettlementBreakdown,
    pub(crate) invoice_total: Decimal,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MixedRatioRequest {
    pub(crate) base_payable: Decimal,
    pub(crate) tax_rate: TaxRate,
    pub(crate) invoice: InvoiceKind,
    pub(crate) amount: Decimal,
}

#[derive(Debug, Serialize)]
pub(crate) struct MixedRatioResponse {
    pub(crate) ratio: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AmountUpdate {
    pub(crate) settlement_amount: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EstimationUpdate {
    #[serde(default)]
    pub(crate) scenario: Option<EstimationScenario>,
    #[serde(default)]
    pub(crate) tax_rate: Option<TaxRate>,
    #[serde(default)]
    pub(crate) mixed_special_ratio: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MixedAmountUpdate {
    pub(crate) invoice: InvoiceKind,
    pub(crate) amount: Decimal,
}

#[derive(Debug, Serialize)]
pub(crate) struct MixedAmountResponse {
    pub(crate) ratio: Option<Decimal>,
    pub(crate) worksheet: WorksheetView,
}

pub(crate) fn with_settlement_routes(desk: SettlementDesk) -> Router {
    settlement_router(desk)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) fn settlement_router(desk: SettlementDesk) -> Router {
    Router::new()
        .route("/api/v1/settlement/calculate", post(calculate_endpoint))
        .route("/api/v1/settlement/mixed-ratio", post(mixed_ratio_endpoint))
        .route("/api/v1/worksheet", get(worksheet_endpoint))
        .route("/api/v1/worksheet/amount", put(update_amount_endpoint))
        .route("/api/v1/worksheet/deductions", post(add_deduction_endpoint))
        .route(
            "/api/v1/worksheet/deductions/:deduction_id",
            patch(update_deduction_endpoint),
        )
        .route("/api/v1/worksheet/estimation", put(update_estimation_endpoint))
        .route("/api/v1/worksheet/mixed-amount", put(mixed_amount_endpoint))
        .route("/api/v1/worksheet/report", get(report_endpoint))
        .route("/api/v1/worksheet/risk-audit", post(risk_audit_endpoint))
        .with_state(desk)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn calculate_endpoint(
    Json(payload): Json<CalculateRequest>,
) -> Result<Json<CalculateResponse>, AppError> {
    let CalculateRequest {
        settlement_amount,
        deductions,
        scenario,
        tax_rate,
        mixed_special_ratio,
    } = payload;

    let settlement_amount = validate_amount("settlement_amount", settlement_amount)?;
    let deductions = deductions.unwrap_or_else(standard_deductions);
    validate_deductions(&deductions)?;

    let mut params = EstimationParams {
        tax_rate,
        ..EstimationParams::default()
    };
    if let Some(ratio) = mixed_special_ratio {
        params.mixed_special_ratio = validate_ratio(ratio)?;
    }

    let breakdown = calculate(settlement_amount, &deductions, scenario, &params);
    debug!(%settlement_amount, ?scenario, net_payable = %breakdown.net_payable, "calculated settlement");

    Ok(Json(CalculateResponse {
        scenario,
        tax_rate,
        breakdown,
        invoice_total: breakdown.invoice_total(),
    }))
}

pub(crate) async fn mixed_ratio_endpoint(
    Json(payload): Json<MixedRatioRequest>,
) -> Result<Json<MixedRatioResponse>, AppError> {
    let base_payable = validate_amount("base_payable", payload.base_payable)?;
    let amount = validate_amount("amount", payload.amount)?;

    let ratio = mixed_ratio_for_invoice_amount(
        payload.invoice,
        amount,
        base_payable,
        payload.tax_rate.as_decimal(),
    );

    Ok(Json(MixedRatioResponse { ratio }))
}

pub(crate) async fn worksheet_endpoint(State(desk): State<SettlementDesk>) -> Json<WorksheetView> {
    Json(desk.with_worksheet(|worksheet| worksheet.view()))
}

pub(crate) async fn update_amount_endpoint(
    State(desk): State<SettlementDesk>,
    Json(payload): Json<AmountUpdate>,
) -> Result<Json<WorksheetView>, AppError> {
    let amount = validate_amount("settlement_amount", payload.settlement_amount)?;
    Ok(Json(desk.with_worksheet(|worksheet| {
        worksheet.set_settlement_amount(amount);
        worksheet.view()
    })))
}

pub(crate) async fn add_deduction_endpoint(
    State(desk): State<SettlementDesk>,
) -> (StatusCode, Json<WorksheetView>) {
    let view = desk.with_worksheet(|worksheet| {
        worksheet.add_custom_deduction();
        worksheet.view()
    });
    (StatusCode::CREATED, Json(view))
}

pub(crate) async fn update_deduction_endpoint(
    State(desk): State<SettlementDesk>,
    Path(deduction_id): Path<String>,
    Json(patch): Json<DeductionPatch>,
) -> Result<Json<WorksheetView>, AppError> {
    let id = DeductionId(deduction_id);
    let view = desk.with_worksheet(|worksheet| -> Result<WorksheetView, SettlementError> {
        let current = worksheet
            .settlement()
            .find(&id)
            .ok_or_else(|| SettlementError::UnknownDeduction(id.clone()))?;
        let kind = patch.kind.unwrap_or(current.kind);
        validate_deduction_value(kind, patch.value.unwrap_or(current.value))?;

        worksheet.update_deduction(&id, patch)?;
        Ok(worksheet.view())
    })?;
    Ok(Json(view))
}

pub(crate) async fn update_estimation_endpoint(
    State(desk): State<SettlementDesk>,
    Json(payload): Json<EstimationUpdate>,
) -> Result<Json<WorksheetView>, AppError> {
    let ratio = payload.mixed_special_ratio.map(validate_ratio).transpose()?;

    Ok(Json(desk.with_worksheet(|worksheet| {
        if let Some(scenario) = payload.scenario {
            worksheet.set_scenario(scenario);
        }
        if let Some(tax_rate) = payload.tax_rate {
            worksheet.set_tax_rate(tax_rate);
        }
        if let Some(ratio) = ratio {
            worksheet.set_mixed_ratio(ratio);
        }
        worksheet.view()
    })))
}

pub(crate) async fn mixed_amount_endpoint(
    State(desk): State<SettlementDesk>,
    Json(payload): Json<MixedAmountUpdate>,
) -> Result<Json<MixedAmountResponse>, AppError> {
    let amount = validate_amount("amount", payload.amount)?;

    let (ratio, worksheet) = desk.with_worksheet(|worksheet| {
        let ratio = worksheet.set_mixed_invoice_amount(payload.invoice, amount);
        (ratio, worksheet.view())
    });
    Ok(Json(MixedAmountResponse { ratio, worksheet }))
}

pub(crate) async fn report_endpoint(State(desk): State<SettlementDesk>) -> Json<SettlementReport> {
    let generated_at = Local::now().naive_local();
    Json(desk.with_worksheet(|worksheet| SettlementReport::from_worksheet(worksheet, generated_at)))
}

pub(crate) async fn risk_audit_endpoint(State(desk): State<SettlementDesk>) -> Json<RiskNarration> {
    let snapshot = desk.audit_snapshot();
    Json(desk.audit().narrate(&snapshot).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{sample_project_context, sample_worksheet};
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use std::str::FromStr;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use subcontract_settlement::workflows::risk_audit::{
        DisabledNarration, RiskAuditService, FALLBACK_NARRATION,
    };
    use tower::ServiceExt;

    fn desk() -> SettlementDesk {
        SettlementDesk::new(
            sample_project_context(),
            sample_worksheet(),
            RiskAuditService::new(Arc::new(DisabledNarration)),
        )
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("valid request")
    }

    async fn read_json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn decimal(value: &Value) -> Decimal {
        Decimal::from_str(value.as_str().expect("decimal serialized as string"))
            .expect("decimal parses")
    }

    #[tokio::test]
    async fn calculate_endpoint_reproduces_worked_example() {
        let request = CalculateRequest {
            settlement_amount: dec!(250000),
            deductions: Some(vec![
                DeductionItem::rate("vat", "增值税率(6%)", dec!(0.06), true),
                DeductionItem::rate("additional", "附加税率(2%)", dec!(0.02), true),
                DeductionItem::rate("signing", "签字费率(2%)", dec!(0.02), true),
                DeductionItem::fixed("mgmt", "加盟管理费(年费)", dec!(5000), true),
                DeductionItem::fixed("perf_bond", "履约保证金", dec!(2000), true),
            ]),
            scenario: EstimationScenario::Special,
            tax_rate: TaxRate::SixPercent,
            mixed_special_ratio: None,
        };

        let Json(body) = calculate_endpoint(Json(request))
            .await
            .expect("calculation succeeds");

        assert_eq!(body.breakdown.total_deductions, dec!(32000));
        assert_eq!(body.breakdown.base_payable, dec!(218000));
        assert_eq!(body.breakdown.total_input_tax_credit, dec!(13080));
        assert_eq!(body.breakdown.net_payable, dec!(231080));
        assert_eq!(body.invoice_total, dec!(231080));
    }

    #[tokio::test]
    async fn calculate_route_defaults_to_standard_deductions() {
        let router = settlement_router(desk());
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/v1/settlement/calculate",
                json!({ "settlement_amount": 100000, "scenario": "general" }),
            ))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(decimal(&body["total_deductions"]), dec!(10000));
        assert_eq!(decimal(&body["general_amount"]), dec!(90000));
        assert_eq!(decimal(&body["total_input_tax_credit"]), Decimal::ZERO);
    }

    #[tokio::test]
    async fn calculate_route_rejects_negative_amount_and_bad_ratio() {
        let router = settlement_router(desk());
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/settlement/calculate",
                json!({ "settlement_amount": -1 }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/v1/settlement/calculate",
                json!({ "settlement_amount": 10, "scenario": "mixed", "mixed_special_ratio": 1.5 }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json_body(response).await;
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("ratio"));
    }

    #[tokio::test]
    async fn mixed_ratio_route_back_solves_and_handles_zero_base() {
        let router = settlement_router(desk());
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/settlement/mixed-ratio",
                json!({ "base_payable": 218000, "tax_rate": 0.06, "invoice": "special", "amount": 115540 }),
            ))
            .await
            .expect("route responds");
        let body = read_json_body(response).await;
        assert_eq!(decimal(&body["ratio"]), dec!(0.5));

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/v1/settlement/mixed-ratio",
                json!({ "base_payable": 0, "tax_rate": 0.06, "invoice": "general", "amount": 10 }),
            ))
            .await
            .expect("route responds");
        let body = read_json_body(response).await;
        assert!(body["ratio"].is_null());
    }

    #[tokio::test]
    async fn worksheet_edits_flow_into_view_and_report() {
        let desk = desk();
        let router = settlement_router(desk.clone());

        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/v1/worksheet/amount",
                json!({ "settlement_amount": "250000" }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        for id in ["mgmt", "perf_bond"] {
            let response = router
                .clone()
                .oneshot(json_request(
                    "PATCH",
                    &format!("/api/v1/worksheet/deductions/{id}"),
                    json!({ "active": true }),
                ))
                .await
                .expect("route responds");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/v1/worksheet/report")
                    .body(Body::empty())
                    .expect("valid request"),
            )
            .await
            .expect("route responds");
        let report = read_json_body(response).await;
        assert_eq!(report["total_deductions"], "32,000.00");
        assert_eq!(report["net_payable"], "231,080.00");
        assert_eq!(report["invoice_estimate"]["scenario_label"], "全专票");
        assert_eq!(report["deductions"].as_array().map(Vec::len), Some(5));

        let breakdown = desk.with_worksheet(|worksheet| worksheet.breakdown());
        assert_eq!(breakdown.base_payable, dec!(218000));
    }

    #[tokio::test]
    async fn deduction_values_are_checked_against_the_row_kind() {
        let router = settlement_router(desk());
        let response = router
            .clone()
            .oneshot(json_request(
                "PATCH",
                "/api/v1/worksheet/deductions/vat",
                json!({ "value": 500 }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = router
            .clone()
            .oneshot(json_request(
                "PATCH",
                "/api/v1/worksheet/deductions/mgmt",
                json!({ "kind": "rate" }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = router
            .oneshot(json_request(
                "PATCH",
                "/api/v1/worksheet/deductions/vat",
                json!({ "kind": "fixed", "value": 500 }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["deductions"][0]["kind"], "fixed");
        assert_eq!(decimal(&body["deductions"][0]["value"]), dec!(500));
    }

    #[tokio::test]
    async fn mixed_ratio_route_saturates_on_tiny_base() {
        let router = settlement_router(desk());
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/v1/settlement/mixed-ratio",
                json!({
                    "base_payable": "0.0000000000000000000000000001",
                    "tax_rate": 0.06,
                    "invoice": "special",
                    "amount": 1000
                }),
            ))
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(decimal(&body["ratio"]), Decimal::ONE);
    }

    #[tokio::test]
    async fn unknown_deduction_returns_not_found() {
        let router = settlement_router(desk());
        let response = router
            .oneshot(json_request(
                "PATCH",
                "/api/v1/worksheet/deductions/missing",
                json!({ "active": true }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn add_deduction_appends_custom_row() {
        let router = settlement_router(desk());
        let response = router
            .oneshot(
                Request::post("/api/v1/worksheet/deductions")
                    .body(Body::empty())
                    .expect("valid request"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = read_json_body(response).await;
        let rows = body["deductions"].as_array().expect("deduction rows");
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[10]["custom"], true);
        assert_eq!(rows[10]["label"], "新增扣除项");
    }

    #[tokio::test]
    async fn estimation_and_mixed_amount_updates() {
        let desk = desk();
        desk.with_worksheet(|worksheet| worksheet.set_settlement_amount(dec!(250000)));
        let router = settlement_router(desk.clone());

        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/v1/worksheet/estimation",
                json!({ "scenario": "mixed", "tax_rate": 0.09 }),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/v1/worksheet/estimation",
                json!({ "tax_rate": 0.07 }),
            ))
            .await
            .expect("route responds");
        assert!(response.status().is_client_error());

        let response = router
            .oneshot(json_request(
                "PUT",
                "/api/v1/worksheet/mixed-amount",
                json!({ "invoice": "general", "amount": 56250 }),
            ))
            .await
            .expect("route responds");
        let body = read_json_body(response).await;
        assert_eq!(decimal(&body["ratio"]), dec!(0.75));
        assert_eq!(body["worksheet"]["scenario"], "mixed");
        assert_eq!(decimal(&body["worksheet"]["breakdown"]["general_amount"]), dec!(56250));
    }

    #[tokio::test]
    async fn risk_audit_returns_fallback_when_disabled() {
        let router = settlement_router(desk());
        let response = router
            .oneshot(
                Request::post("/api/v1/worksheet/risk-audit")
                    .body(Body::empty())
                    .expect("valid request"),
            )
            .await
            .expect("route responds");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json_body(response).await;
        assert_eq!(body["source"], "fallback");
        assert_eq!(body["text"], FALLBACK_NARRATION);
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };

        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state
            .readiness
            .store(true, std::sync::atomic::Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
