//! keywords-research 工具（KeywordsEverywhere）
//!
//! 把 API 返回的数据整理成 Markdown 报告。趋势数组字段类型不固定，
//! 先归一化为 `TrendPoint` 再输出，最多保留最近 12 个月。

use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::{debug, error, warn};

use crate::auth::Credential;
use crate::clients::keywords::{KeywordItem, TrendEntry};
use crate::clients::{KeywordsClient, KeywordsQuery, KeywordsResponse};
use crate::mcp::tool::{parse_args, ToolCallError, ToolDescriptor};
use crate::mcp::types::ToolResponse;

pub const NAME: &str = "keywords-research";

pub const MISSING_KEY_MESSAGE: &str = "错误: KeywordsEverywhere API密钥 (keKey) 缺失或无效";

/// 单次最多查询的关键词数
pub const MAX_KEYWORDS: usize = 100;

/// 趋势最多保留的月份数
const TREND_MONTHS: usize = 12;

/// 数据源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Google Keyword Planner
    #[default]
    Gkp,
    /// Clickstream
    Cli,
    /// Trend data
    Tpm,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gkp => "gkp",
            Self::Cli => "cli",
            Self::Tpm => "tpm",
        }
    }
}

fn default_country() -> String {
    "us".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize)]
pub struct KeywordsArgs {
    pub keywords: Vec<String>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, rename = "dataSource")]
    pub data_source: DataSource,
}

impl KeywordsArgs {
    pub fn validate(&self) -> Result<(), ToolCallError> {
        if self.keywords.is_empty() || self.keywords.len() > MAX_KEYWORDS {
            return Err(ToolCallError::InvalidParams(format!(
                "keywords: 需要 1 到 {} 个关键词，实际 {} 个",
                MAX_KEYWORDS,
                self.keywords.len()
            )));
        }
        Ok(())
    }

    pub fn into_query(self) -> KeywordsQuery {
        KeywordsQuery {
            keywords: self.keywords,
            country: self.country,
            currency: self.currency,
            data_source: self.data_source.as_str().to_string(),
        }
    }
}

/// 归一化后的趋势点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendPoint {
    /// 形如 `Jan'24`
    pub label: String,
    /// 数字原样输出，其余取开头的整数（失败为 0）
    pub value: String,
}

/// 解析字符串开头的整数，失败返回 0
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// 数字的文本形式；整数值的浮点数不带小数部分（`1200.0` -> `1200`）
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => f.to_string(),
        _ => n.to_string(),
    }
}

fn trend_value(value: &Value) -> String {
    match value {
        Value::Number(n) => number_text(n),
        Value::String(s) => leading_int(s).to_string(),
        _ => "0".to_string(),
    }
}

fn month_label(month: &Value) -> String {
    match month {
        Value::Null => "Unk".to_string(),
        Value::String(s) => s.chars().take(3).collect(),
        other => other.to_string().chars().take(3).collect(),
    }
}

/// 只有 JSON 数字才按年份处理（去掉前两位），字符串一律取前两个字符
fn year_label(year: &Value) -> String {
    match year {
        Value::Number(n) => number_text(n).chars().skip(2).collect(),
        Value::Null => "XX".to_string(),
        Value::String(s) => s.chars().take(2).collect(),
        other => other.to_string().chars().take(2).collect(),
    }
}

/// 取最近 12 条趋势并归一化
pub fn normalize_trend(entries: &[TrendEntry]) -> Vec<TrendPoint> {
    let start = entries.len().saturating_sub(TREND_MONTHS);
    debug!("趋势数据 {} 条，保留 {} 条", entries.len(), entries.len() - start);
    entries[start..]
        .iter()
        .map(|t| TrendPoint {
            label: format!("{}'{}", month_label(&t.month), year_label(&t.year)),
            value: trend_value(&t.value),
        })
        .collect()
}

fn format_cpc(item: &KeywordItem) -> String {
    match &item.cpc {
        Some(cpc) => {
            let value = match &cpc.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}{}", cpc.currency, value)
        }
        None => "N/A".to_string(),
    }
}

fn format_trend(item: &KeywordItem) -> String {
    match &item.trend {
        Some(trend) if !trend.is_empty() => {
            let lines: Vec<String> = normalize_trend(trend)
                .iter()
                .map(|p| format!("- {}: {}", p.label, p.value))
                .collect();
            format!("**近一年趋势数据:**\n{}", lines.join("\n"))
        }
        _ => "N/A".to_string(),
    }
}

fn format_entry(keyword: &str, item: Option<&KeywordItem>) -> String {
    let (name, volume, cpc, competition, trend) = match item {
        Some(item) => (
            item.keyword.as_str(),
            item.vol
                .filter(|v| *v != 0)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            format_cpc(item),
            item.competition
                .map(|c| format!("{:.1}%", c * 100.0))
                .unwrap_or_else(|| "N/A".to_string()),
            format_trend(item),
        ),
        None => (
            keyword,
            "N/A".to_string(),
            "N/A".to_string(),
            "N/A".to_string(),
            "N/A".to_string(),
        ),
    };

    format!(
        "### {}\n- **搜索量：** {}\n- **CPC：** {}\n- **竞争度：** {}\n{}\n",
        name, volume, cpc, competition, trend
    )
}

/// 生成关键词研究报告
pub fn render_report(requested: &[String], response: &KeywordsResponse) -> String {
    let entries: Vec<String> = requested
        .iter()
        .map(|keyword| format_entry(keyword, response.find(keyword)))
        .collect();

    format!(
        "## 关键词研究结果\n\n{}\n\n**API使用情况:** 消耗积分 {}, 剩余积分 {}, 处理时间 {:.3}秒",
        entries.join("\n"),
        response.credits_consumed,
        response.credits,
        response.time
    )
}

pub fn descriptor(client: KeywordsClient, credential: Credential) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Research keywords using KeywordsEverywhere API",
        serde_json::json!({
            "type": "object",
            "properties": {
                "keywords": {
                    "type": "array",
                    "items": {"type": "string"},
                    "minItems": 1,
                    "maxItems": MAX_KEYWORDS,
                    "description": "要查询的关键词数组，最多100个"
                },
                "country": {
                    "type": "string",
                    "default": "us",
                    "description": "目标国家代码，例如'us', 'gb', 'cn'等，默认为'us'"
                },
                "currency": {
                    "type": "string",
                    "default": "USD",
                    "description": "货币代码，例如'USD', 'GBP', 'CNY'等，默认为'USD'"
                },
                "dataSource": {
                    "type": "string",
                    "enum": ["gkp", "cli", "tpm"],
                    "default": "gkp",
                    "description": "数据源: gkp-Google Keyword Planner, cli-Clickstream data, tpm-Trend data"
                }
            },
            "required": ["keywords"]
        }),
        move |arguments: Value| {
            let client = client.clone();
            let credential = credential.clone();
            async move { call(&client, &credential, arguments).await }
        },
    )
}

async fn call(
    client: &KeywordsClient,
    credential: &Credential,
    arguments: Value,
) -> Result<ToolResponse, ToolCallError> {
    let args: KeywordsArgs = parse_args(arguments)?;
    args.validate()?;

    if !credential.is_valid() {
        warn!("keywords-research tool called without valid keKey: {}", credential.masked());
        return Ok(ToolResponse::error(MISSING_KEY_MESSAGE));
    }

    let query = args.into_query();
    let response = match client.keyword_data(credential.expose(), &query).await {
        Ok(data) => ToolResponse::text(render_report(&query.keywords, &data)),
        Err(e) => {
            error!("KeywordsEverywhere API调用失败: {}", e);
            ToolResponse::error(format!("获取关键词数据时出错: {}", e))
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialKind;
    use crate::clients::KeywordsConfig;

    fn entry(month: Value, year: Value, value: Value) -> TrendEntry {
        TrendEntry { month, year, value }
    }

    #[test]
    fn test_normalize_trend_keeps_last_twelve() {
        let entries: Vec<TrendEntry> = (1..=14)
            .map(|i| entry(Value::from("January"), Value::from(2024), Value::from(i)))
            .collect();
        let points = normalize_trend(&entries);
        assert_eq!(points.len(), 12);
        assert_eq!(points[0].value, "3");
        assert_eq!(points[11].value, "14");
        assert_eq!(points[0].label, "Jan'24");
    }

    #[test]
    fn test_normalize_trend_coerces_values() {
        let entries = vec![
            entry(Value::from("March"), Value::from(2023), Value::from("1200")),
            entry(Value::from("April"), Value::from(2023), Value::from("abc")),
            entry(Value::from("May"), Value::from(2023), serde_json::json!({"v": 1})),
            entry(Value::from("June"), Value::from(2023), Value::from(15.9)),
            entry(Value::from("July"), Value::from(2023), Value::from(1200.0)),
            entry(Value::from("August"), Value::from(2023), Value::from("12.7k")),
        ];
        let values: Vec<String> = normalize_trend(&entries).into_iter().map(|p| p.value).collect();
        assert_eq!(values, vec!["1200", "0", "0", "15.9", "1200", "12"]);
    }

    #[test]
    fn test_string_year_keeps_first_two_chars() {
        let entries = vec![entry(Value::from("January"), Value::from("2024"), Value::from(15.9))];
        let points = normalize_trend(&entries);
        assert_eq!(points[0].label, "Jan'20");
        assert_eq!(points[0].value, "15.9");
    }

    #[test]
    fn test_normalize_trend_labels_for_odd_fields() {
        let entries = vec![
            entry(Value::Null, Value::Null, Value::from(1)),
            entry(Value::from(7), Value::from("2022"), Value::from(1)),
            entry(Value::from("Aug"), Value::from("FY2022"), Value::from(1)),
        ];
        let labels: Vec<String> = normalize_trend(&entries).into_iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["Unk'XX", "7'20", "Aug'FY"]);
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("42abc"), 42);
        assert_eq!(leading_int("-7"), -7);
        assert_eq!(leading_int(""), 0);
    }

    #[test]
    fn test_args_defaults() {
        let args: KeywordsArgs = parse_args(serde_json::json!({"keywords": ["rust"]})).unwrap();
        assert_eq!(args.country, "us");
        assert_eq!(args.currency, "USD");
        assert_eq!(args.data_source, DataSource::Gkp);
    }

    #[test]
    fn test_args_validation() {
        let empty: KeywordsArgs = parse_args(serde_json::json!({"keywords": []})).unwrap();
        assert!(empty.validate().is_err());

        let too_many: Vec<String> = (0..101).map(|i| format!("k{}", i)).collect();
        let args: KeywordsArgs = parse_args(serde_json::json!({"keywords": too_many})).unwrap();
        assert!(args.validate().is_err());

        let bad_source = parse_args::<KeywordsArgs>(serde_json::json!({"keywords": ["a"], "dataSource": "xyz"}));
        assert!(bad_source.is_err());
    }

    #[test]
    fn test_render_report() {
        let response: KeywordsResponse = serde_json::from_value(serde_json::json!({
            "data": [{
                "keyword": "Rust",
                "vol": 5400,
                "cpc": {"currency": "$", "value": "1.25"},
                "competition": 0.123,
                "trend": [{"month": "January", "year": 2024, "value": 4400}]
            }],
            "credits": 9990,
            "credits_consumed": 2,
            "time": 0.5
        }))
        .unwrap();

        let report = render_report(&["rust".to_string(), "missing".to_string()], &response);
        assert!(report.starts_with("## 关键词研究结果\n\n### Rust\n"));
        assert!(report.contains("- **搜索量：** 5400\n"));
        assert!(report.contains("- **CPC：** $1.25\n"));
        assert!(report.contains("- **竞争度：** 12.3%\n"));
        assert!(report.contains("**近一年趋势数据:**\n- Jan'24: 4400\n"));
        assert!(report.contains("### missing\n- **搜索量：** N/A\n- **CPC：** N/A\n- **竞争度：** N/A\nN/A\n"));
        assert!(report.ends_with("**API使用情况:** 消耗积分 2, 剩余积分 9990, 处理时间 0.500秒"));
    }

    #[test]
    fn test_zero_volume_and_empty_trend_render_na() {
        let response: KeywordsResponse = serde_json::from_value(serde_json::json!({
            "data": [{"keyword": "x", "vol": 0, "competition": null, "trend": []}],
            "credits": 1, "credits_consumed": 1, "time": 0.1
        }))
        .unwrap();
        let report = render_report(&["x".to_string()], &response);
        assert!(report.contains("### x\n- **搜索量：** N/A\n- **CPC：** N/A\n- **竞争度：** N/A\nN/A\n"));
    }

    #[tokio::test]
    async fn test_short_key_returns_tool_error() {
        let client = KeywordsClient::new(KeywordsConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        let tool = descriptor(client, Credential::new(CredentialKind::Keywords, "short"));
        let result = tool.invoke(serde_json::json!({"keywords": ["rust"]})).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some(MISSING_KEY_MESSAGE));
    }
}
