//! 宽松的反序列化辅助函数。模型输出的JSON在数字与字符串之间经常摇摆，
//! 这里只做结构层面的兼容，不做语义校验。

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::LazyLock;

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number pattern"));

/// 接受字符串或数字，统一转为字符串（如 `"id": 1`）
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// 接受数字或带单位的数字字符串（如 `"95%"`），无法解析时返回NaN
pub fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => Ok(parse_leading_number(&s)),
        _ => Ok(f64::NAN),
    }
}

/// 将0-100的评分统一为整数，允许小数和数字字符串
pub fn score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_leading_number(&s),
        Value::Null => 0.0,
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected numeric score, got {}",
                other
            )));
        }
    };
    if value.is_finite() {
        Ok(value.round().clamp(0.0, u32::MAX as f64) as u32)
    } else {
        Ok(0)
    }
}

/// 可缺省的整数（如年份），接受数字或数字字符串
pub fn optional_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(parse_leading_number(&s)),
        _ => None,
    };
    Ok(value.filter(|v| v.is_finite()).map(|v| v.round() as i64))
}

fn parse_leading_number(raw: &str) -> f64 {
    let without_separators = raw.replace(',', "");
    NUMBER_PATTERN
        .find(&without_separators)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
