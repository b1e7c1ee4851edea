//! 提成计算工具
//!
//! 基本工资 3500，按利润分段累进提成，税前总收入扣 30% 个税和 1550 固定成本。

use serde::Deserialize;
use serde_json::Value;

use crate::mcp::tool::{parse_args, ToolCallError, ToolDescriptor};
use crate::mcp::types::ToolResponse;

pub const NAME: &str = "commission-calculator";

const BASE_SALARY: f64 = 3500.0;
const TAX_RATE: f64 = 0.3;
const FIXED_COSTS: f64 = 1550.0;

/// (下限, 上限, 费率)，最后一档无上限
const TIERS: [(f64, f64, f64); 4] = [
    (0.0, 10_000.0, 0.05),
    (10_000.0, 25_000.0, 0.073),
    (25_000.0, 40_000.0, 0.138),
    (40_000.0, f64::INFINITY, 0.21),
];

#[derive(Debug, Deserialize)]
pub struct CommissionArgs {
    pub profit: f64,
}

/// 计算明细
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionBreakdown {
    pub profit: f64,
    pub base_salary: f64,
    /// 各档提成
    pub tiers: [f64; 4],
    pub total_commission: f64,
    pub total_before_tax: f64,
    pub income_tax: f64,
    pub fixed_costs: f64,
    pub net_income: f64,
}

/// 计算提成，`profit` 需非负
pub fn calculate(profit: f64) -> CommissionBreakdown {
    let mut tiers = [0.0; 4];
    for (i, (lower, upper, rate)) in TIERS.iter().enumerate() {
        if profit > *lower {
            tiers[i] = (profit.min(*upper) - lower) * rate;
        }
    }

    let total_commission: f64 = tiers.iter().sum();
    let total_before_tax = BASE_SALARY + total_commission;
    let income_tax = total_before_tax * TAX_RATE;
    let net_income = total_before_tax - income_tax - FIXED_COSTS;

    CommissionBreakdown {
        profit,
        base_salary: BASE_SALARY,
        tiers,
        total_commission,
        total_before_tax,
        income_tax,
        fixed_costs: FIXED_COSTS,
        net_income,
    }
}

impl CommissionBreakdown {
    pub fn render(&self) -> String {
        format!(
            "利润{}元的收入计算结果:\n\
             基本工资: {}元\n\
             提成明细:\n\
             \x20 0-10000元: {:.2}元\n\
             \x20 10000-25000元: {:.2}元\n\
             \x20 25000-40000元: {:.2}元\n\
             \x20 40000元以上: {:.2}元\n\
             总提成: {:.2}元\n\
             税前总收入: {:.2}元\n\
             个人所得税(30%): {:.2}元\n\
             社保+固定成本: {:.2}元\n\
             最终净收入: {:.2}元",
            self.profit,
            self.base_salary,
            self.tiers[0],
            self.tiers[1],
            self.tiers[2],
            self.tiers[3],
            self.total_commission,
            self.total_before_tax,
            self.income_tax,
            self.fixed_costs,
            self.net_income,
        )
    }
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Calculate commission, tax and net income for a given profit",
        serde_json::json!({
            "type": "object",
            "properties": {
                "profit": {"type": "number", "minimum": 0, "description": "利润（元）"}
            },
            "required": ["profit"]
        }),
        |arguments: Value| async move { call(arguments) },
    )
}

fn call(arguments: Value) -> Result<ToolResponse, ToolCallError> {
    let args: CommissionArgs = parse_args(arguments)?;
    if !args.profit.is_finite() || args.profit < 0.0 {
        return Err(ToolCallError::InvalidParams("利润必须是非负数".to_string()));
    }
    Ok(ToolResponse::text(calculate(args.profit).render()))
}
