//! AI 回复解析
//!
//! 纯函数：清理思考标签，从自由文本中提取选项编号、数字和 JSON 对象。
//! 选项编号对外一律是 1 起始，解析结果转换为 0 起始下标。

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"))
}

fn think_tail() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*").expect("valid regex"))
}

fn blank_lines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid regex"))
}

fn integer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

fn number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"))
}

/// 去掉 `<think>` 思考内容，只保留实际回答
///
/// 只有未闭合的 `<think>` 时视为没有回答，返回空串。
pub fn clean_response(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("<think>") && !trimmed.contains("</think>") {
        return String::new();
    }
    let cleaned = think_block().replace_all(trimmed, "");
    let cleaned = think_tail().replace_all(&cleaned, "");
    let cleaned = cleaned.replace("</think>", "");
    let cleaned = blank_lines().replace_all(cleaned.trim(), "\n");
    cleaned.trim().to_string()
}

/// 解析单个选项编号
///
/// 优先取回复中的第一个整数；没有数字时尝试与选项原文完全匹配。
pub fn parse_index(response: &str, options: &[String]) -> Result<usize, String> {
    let count = options.len();
    if let Some(m) = integer().find(response) {
        let value: usize = m
            .as_str()
            .parse()
            .map_err(|_| format!("无法解析数字 {}", m.as_str()))?;
        return if (1..=count).contains(&value) {
            Ok(value - 1)
        } else {
            Err(format!("编号 {} 超出范围 1-{}", value, count))
        };
    }

    let answer = strip_quotes(response);
    options
        .iter()
        .position(|option| option.trim() == answer)
        .ok_or_else(|| "回答中没有选项编号".to_string())
}

/// 解析多个选项编号，保留首次出现的顺序，丢弃越界和重复编号
pub fn parse_indices(response: &str, count: usize) -> Vec<usize> {
    let mut seen = vec![false; count];
    let mut indices = Vec::new();
    for m in integer().find_iter(response) {
        if let Ok(value) = m.as_str().parse::<usize>() {
            if (1..=count).contains(&value) && !seen[value - 1] {
                seen[value - 1] = true;
                indices.push(value - 1);
            }
        }
    }
    indices
}

/// 提取回复中所有数字（可带负号和小数）
pub fn parse_numbers(response: &str) -> Vec<f64> {
    number()
        .find_iter(response)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// 提取回复中第一个 JSON 对象，值统一转为字符串
pub fn parse_json_object(response: &str) -> Option<BTreeMap<String, String>> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&response[start..=end]).ok()?;
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("、"),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect(),
    )
}

/// 去掉首尾引号和空白
pub fn strip_quotes(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '「' | '」'))
        .trim()
}

/// 按字符数截断
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("选项{}", i)).collect()
    }

    #[test]
    fn test_clean_response_strips_think() {
        assert_eq!(clean_response("<think>想一想</think>\n\n2"), "2");
        assert_eq!(clean_response("答案\n\n\n是 3<think>尾巴"), "答案\n是 3");
        assert_eq!(clean_response("<think>只有思考"), "");
        assert_eq!(clean_response("  1  "), "1");
    }

    #[test]
    fn test_parse_index_number_and_text() {
        let opts = options(3);
        assert_eq!(parse_index("2", &opts), Ok(1));
        assert_eq!(parse_index("我选 3 号", &opts), Ok(2));
        assert!(parse_index("4", &opts).is_err());
        assert!(parse_index("0", &opts).is_err());
        assert_eq!(parse_index("“选项2”", &opts), Ok(1));
        assert!(parse_index("都不选", &opts).is_err());
    }

    #[test]
    fn test_parse_indices_keeps_order_and_dedupes() {
        assert_eq!(parse_indices("3,1,3,9,2", 4), vec![2, 0, 1]);
        assert!(parse_indices("无", 4).is_empty());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_numbers("3, 4.5, -2 和 10"), vec![3.0, 4.5, -2.0, 10.0]);
    }

    #[test]
    fn test_parse_json_object_in_prose() {
        let text = "好的：\n{\"年龄\": 21, \"兴趣爱好\": [\"篮球\", \"摄影\"], \"职业\": \"学生\"}\n以上";
        let map = parse_json_object(text).unwrap();
        assert_eq!(map["年龄"], "21");
        assert_eq!(map["兴趣爱好"], "篮球、摄影");
        assert_eq!(map["职业"], "学生");
        assert!(parse_json_object("没有对象").is_none());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("一二三四", 2), "一二");
    }
}
