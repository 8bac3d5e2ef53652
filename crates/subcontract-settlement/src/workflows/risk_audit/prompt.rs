use serde_json::json;

use super::gateway::NarrationError;
use super::snapshot::AuditSnapshot;
use crate::workflows::settlement::format_currency;

/// Render the auditor prompt for a snapshot.
pub fn build_prompt(snapshot: &AuditSnapshot) -> Result<String, NarrationError> {
    let project = serde_json::to_string(&json!({
        "registration": snapshot.registration,
        "project": snapshot.project,
    }))?;
    let subcontract = serde_json::to_string(&snapshot.subcontract)?;
    let settlement = serde_json::to_string(&snapshot.settlement)?;

    let figures = &snapshot.settlement;
    let management_fee = figures
        .management_fee
        .map(format_currency)
        .unwrap_or_else(|| "未计提".to_string());

    Ok(format!(
        "你是资深建筑工程项目财务审计师，请对下面的项目分包结算测算进行风险与逻辑审计。\n\
         \n\
         【登记与项目信息】{project}\n\
         【分包合同状态】{subcontract}\n\
         【本次测算明细】{settlement}\n\
         \n\
         测算口径：本次应付金额 = 本期结算金额 - 扣除项合计（增值税、附加税、签字费及固定扣除项）+ 进项抵扣额。\n\
         当前测算结果：{net_payable} 元。\n\
         \n\
         请重点分析：\n\
         1. 结算金额（{settlement_amount}）是否处于项目可用资金（{available_funds}）的安全边际之内；\n\
         2. 各扣除项比例是否合理，尤其是加盟管理费（{management_fee}）；\n\
         3. 进项抵扣及关联发票的税务合规建议；\n\
         4. 结合分包未结算余额（{unsettled}）评估本次结算后的支付进度风险。\n\
         \n\
         请用中文给出专业、简洁、可供管理层决策参考的审计结论。",
        net_payable = format_currency(figures.breakdown.net_payable),
        settlement_amount = format_currency(figures.settlement_amount),
        available_funds = format_currency(snapshot.project.available_funds),
        unsettled = format_currency(snapshot.subcontract.unsettled_amount),
    ))
}
