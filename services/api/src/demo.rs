use crate::infra::{sample_project_context, sample_worksheet};
use chrono::Local;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::sync::Arc;
use subcontract_settlement::config::AppConfig;
use subcontract_settlement::error::AppError;
use subcontract_settlement::workflows::risk_audit::{
    gateway_from_config, AuditSnapshot, NarrationSource, RiskAuditService,
};
use subcontract_settlement::workflows::settlement::input::{parse_amount, percent_to_rate};
use subcontract_settlement::workflows::settlement::{
    format_currency, DeductionId, DeductionPatch, EstimationScenario, SettlementError,
    SettlementReport, SettlementWorksheet, TaxRate,
};

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub(crate) enum ScenarioArg {
    #[default]
    Special,
    General,
    Mixed,
}

impl From<ScenarioArg> for EstimationScenario {
    fn from(value: ScenarioArg) -> Self {
        match value {
            ScenarioArg::Special => EstimationScenario::Special,
            ScenarioArg::General => EstimationScenario::General,
            ScenarioArg::Mixed => EstimationScenario::Mixed,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Settlement amount; thousands separators and a currency sign are accepted.
    #[arg(long, value_parser = parse_amount_arg)]
    pub(crate) amount: Option<Decimal>,
    /// Invoice scenario used for the VAT estimate.
    #[arg(long, value_enum, default_value_t = ScenarioArg::Special)]
    pub(crate) scenario: ScenarioArg,
    /// VAT rate in percent (1, 3, 6, 9 or 13).
    #[arg(long, value_parser = parse_tax_rate)]
    pub(crate) tax_rate: Option<TaxRate>,
    /// Special-invoice share for the mixed scenario, in percent.
    #[arg(long)]
    pub(crate) special_share: Option<Decimal>,
    /// Activate the franchise management fee and performance bond rows.
    #[arg(long)]
    pub(crate) with_fees: bool,
    /// Request a risk audit narration after the report.
    #[arg(long)]
    pub(crate) narrate: bool,
}

fn parse_amount_arg(raw: &str) -> Result<Decimal, String> {
    Ok(parse_amount(raw))
}

fn parse_tax_rate(raw: &str) -> Result<TaxRate, String> {
    let percent: Decimal = raw
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|err| format!("invalid tax rate '{raw}': {err}"))?;
    TaxRate::try_from(percent_to_rate(percent)).map_err(|err| err.to_string())
}

fn build_worksheet(args: &DemoArgs) -> Result<SettlementWorksheet, SettlementError> {
    let mut worksheet = sample_worksheet();
    worksheet.set_settlement_amount(
        args.amount
            .unwrap_or(worksheet.settlement().project_settlable_amount),
    );

    if args.with_fees {
        for id in ["mgmt", "perf_bond"] {
            worksheet.update_deduction(&DeductionId::new(id), DeductionPatch::active(true))?;
        }
    }

    worksheet.set_scenario(args.scenario.into());
    if let Some(tax_rate) = args.tax_rate {
        worksheet.set_tax_rate(tax_rate);
    }
    if let Some(share) = args.special_share {
        worksheet.set_mixed_ratio(percent_to_rate(share));
    }
    Ok(worksheet)
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let worksheet = build_worksheet(&args)?;
    let report = SettlementReport::from_worksheet(&worksheet, Local::now().naive_local());
    render_report(&report);

    if !args.narrate {
        return Ok(());
    }

    let config = AppConfig::load()?;
    let gateway = gateway_from_config(&config.narration)?;
    let audit = RiskAuditService::new(Arc::from(gateway));
    let snapshot = AuditSnapshot::capture(&sample_project_context(), &worksheet);
    let narration = audit.narrate(&snapshot).await;

    println!("\nAI 风险评估");
    if narration.source == NarrationSource::Fallback {
        println!("(fallback)");
    }
    println!("{}", narration.text);

    Ok(())
}

pub(crate) fn render_report(report: &SettlementReport) {
    println!("分包结算单 {}", report.settlement_no);
    println!("生成时间: {}", report.generated_at);
    println!("本次结算金额: ¥ {}", report.settlement_amount);

    if report.deductions.is_empty() {
        println!("\n扣除项: 无");
    } else {
        println!("\n扣除项");
        for line in &report.deductions {
            println!(
                "- {} [{} {}] {}",
                line.label, line.mode, line.basis, line.amount_display
            );
        }
    }
    println!("扣除合计: ¥ {}", report.total_deductions);
    println!(
        "应付基数: ¥ {}",
        format_currency(report.breakdown.base_payable)
    );

    let estimate = &report.invoice_estimate;
    println!(
        "\n发票测算 ({}, 税率 {})",
        estimate.scenario_label, estimate.tax_rate
    );
    println!("- 专票金额: ¥ {}", estimate.special_amount);
    println!("- 普票金额: ¥ {}", estimate.general_amount);
    println!("- 发票合计: ¥ {}", estimate.invoice_total);
    println!("- 进项抵扣: ¥ {}", estimate.input_tax_credit);

    println!("\n实际应付: ¥ {}", report.net_payable);
}
