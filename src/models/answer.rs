//! 答案模型与约束校验

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::question::{Question, QuestionKind};

/// 答案取值，与题型一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerValue {
    /// 单选 / 下拉：选项下标（从 0 开始）
    Choice(usize),
    /// 多选：选项下标集合，保持选择顺序
    Choices(Vec<usize>),
    /// 填空
    Text(String),
    /// 量表 / 数字
    Number(f64),
    /// 矩阵：每行一个选项下标
    RowChoices(Vec<usize>),
    /// 数字矩阵：每行一个数值
    RowNumbers(Vec<f64>),
    /// 排序：选项下标的全排列
    Ranking(Vec<usize>),
}

/// 单题答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: u32,
    pub value: AnswerValue,
}

/// 答案违反题目约束
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintViolation {
    #[error("答案类型与题型 {kind} 不匹配")]
    KindMismatch { kind: &'static str },
    #[error("选项下标 {index} 超出范围 [0, {count})")]
    OptionOutOfRange { index: usize, count: usize },
    #[error("选择数量 {count} 不在 [{min}, {max}] 范围内")]
    SelectionCount { count: usize, min: usize, max: usize },
    #[error("选项 {index} 重复")]
    DuplicateOption { index: usize },
    #[error("行数 {actual} 与题目行数 {expected} 不一致")]
    RowCount { actual: usize, expected: usize },
    #[error("数值 {value} 超出范围 [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("数值 {value} 不是整数")]
    NotInteger { value: f64 },
    #[error("必填文本为空")]
    EmptyText,
    #[error("文本长度 {len} 超过上限 {max}")]
    TextTooLong { len: usize, max: usize },
    #[error("各行之和 {actual} 不等于 {expected}")]
    TotalMismatch { actual: f64, expected: f64 },
    #[error("排序不是完整排列 (长度 {actual}, 选项数 {expected})")]
    IncompleteRanking { actual: usize, expected: usize },
}

impl Answer {
    pub fn new(question_id: u32, value: AnswerValue) -> Self {
        Self { question_id, value }
    }

    /// 校验答案是否满足题目约束
    pub fn validate(&self, question: &Question) -> Result<(), ConstraintViolation> {
        let c = &question.constraints;
        let option_count = question.options.len();

        match (&question.kind, &self.value) {
            (QuestionKind::SingleChoice | QuestionKind::Dropdown, AnswerValue::Choice(index)) => {
                check_index(*index, option_count)
            }
            (QuestionKind::MultiChoice, AnswerValue::Choices(indices)) => {
                check_distinct(indices, option_count)?;
                if indices.len() < c.min_selections || indices.len() > c.max_selections {
                    return Err(ConstraintViolation::SelectionCount {
                        count: indices.len(),
                        min: c.min_selections,
                        max: c.max_selections,
                    });
                }
                Ok(())
            }
            (QuestionKind::FreeText(_), AnswerValue::Text(text)) => {
                if c.required && text.trim().is_empty() {
                    return Err(ConstraintViolation::EmptyText);
                }
                if let Some(max) = c.max_length {
                    let len = text.chars().count();
                    if len > max {
                        return Err(ConstraintViolation::TextTooLong { len, max });
                    }
                }
                Ok(())
            }
            (QuestionKind::Scale, AnswerValue::Number(value)) => {
                let range = question.scale_range();
                check_number(*value, range.min, range.max, true)
            }
            (QuestionKind::Numeric, AnswerValue::Number(value)) => match c.range {
                Some(range) => check_number(*value, range.min, range.max, c.integer),
                None => check_number(*value, f64::MIN, f64::MAX, c.integer),
            },
            (QuestionKind::Matrix, AnswerValue::RowChoices(choices)) => {
                if choices.len() != question.rows.len() {
                    return Err(ConstraintViolation::RowCount {
                        actual: choices.len(),
                        expected: question.rows.len(),
                    });
                }
                choices
                    .iter()
                    .try_for_each(|index| check_index(*index, option_count))
            }
            (QuestionKind::NumericMatrix, AnswerValue::RowNumbers(values)) => {
                if values.len() != question.rows.len() {
                    return Err(ConstraintViolation::RowCount {
                        actual: values.len(),
                        expected: question.rows.len(),
                    });
                }
                let (min, max) = c
                    .range
                    .map(|r| (r.min, r.max))
                    .unwrap_or((f64::MIN, f64::MAX));
                values
                    .iter()
                    .try_for_each(|value| check_number(*value, min, max, c.integer))?;
                if let Some(expected) = c.total {
                    let actual: f64 = values.iter().sum();
                    if (actual - expected).abs() > 1e-6 {
                        return Err(ConstraintViolation::TotalMismatch { actual, expected });
                    }
                }
                Ok(())
            }
            (QuestionKind::Ranking, AnswerValue::Ranking(order)) => {
                check_distinct(order, option_count)?;
                if order.len() != option_count {
                    return Err(ConstraintViolation::IncompleteRanking {
                        actual: order.len(),
                        expected: option_count,
                    });
                }
                Ok(())
            }
            (kind, _) => Err(ConstraintViolation::KindMismatch { kind: kind.name() }),
        }
    }

    /// 简短描述（日志用）
    pub fn summary(&self) -> String {
        match &self.value {
            AnswerValue::Choice(i) => format!("选项 {}", i + 1),
            AnswerValue::Choices(v) | AnswerValue::RowChoices(v) | AnswerValue::Ranking(v) => {
                let items: Vec<String> = v.iter().map(|i| (i + 1).to_string()).collect();
                items.join(",")
            }
            AnswerValue::Text(text) => crate::utils::logging::truncate_text(text, 30),
            AnswerValue::Number(n) => n.to_string(),
            AnswerValue::RowNumbers(v) => {
                let items: Vec<String> = v.iter().map(|n| n.to_string()).collect();
                items.join(",")
            }
        }
    }
}

fn check_index(index: usize, count: usize) -> Result<(), ConstraintViolation> {
    if index < count {
        Ok(())
    } else {
        Err(ConstraintViolation::OptionOutOfRange { index, count })
    }
}

fn check_distinct(indices: &[usize], count: usize) -> Result<(), ConstraintViolation> {
    let mut seen = vec![false; count];
    for &index in indices {
        check_index(index, count)?;
        if seen[index] {
            return Err(ConstraintViolation::DuplicateOption { index });
        }
        seen[index] = true;
    }
    Ok(())
}

fn check_number(value: f64, min: f64, max: f64, integer: bool) -> Result<(), ConstraintViolation> {
    if !(value >= min && value <= max) {
        return Err(ConstraintViolation::OutOfRange { value, min, max });
    }
    if integer && value.fract() != 0.0 {
        return Err(ConstraintViolation::NotInteger { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Constraints, NumericRange, TextLength};

    fn question(kind: QuestionKind, options: usize, rows: usize) -> Question {
        Question {
            id: 1,
            kind,
            prompt: "题目".to_string(),
            options: (1..=options).map(|i| format!("选项{}", i)).collect(),
            rows: (1..=rows).map(|i| format!("行{}", i)).collect(),
            constraints: Constraints::default(),
            page: 0,
        }
    }

    #[test]
    fn test_single_choice_range() {
        let q = question(QuestionKind::SingleChoice, 3, 0);
        assert!(Answer::new(1, AnswerValue::Choice(2)).validate(&q).is_ok());
        assert_eq!(
            Answer::new(1, AnswerValue::Choice(3)).validate(&q),
            Err(ConstraintViolation::OptionOutOfRange { index: 3, count: 3 })
        );
    }

    #[test]
    fn test_multi_choice_bounds_and_duplicates() {
        let mut q = question(QuestionKind::MultiChoice, 5, 0);
        q.constraints.min_selections = 2;
        q.constraints.max_selections = 3;
        assert!(Answer::new(1, AnswerValue::Choices(vec![0, 4])).validate(&q).is_ok());
        assert!(Answer::new(1, AnswerValue::Choices(vec![0])).validate(&q).is_err());
        assert!(Answer::new(1, AnswerValue::Choices(vec![0, 1, 2, 3])).validate(&q).is_err());
        assert_eq!(
            Answer::new(1, AnswerValue::Choices(vec![1, 1])).validate(&q),
            Err(ConstraintViolation::DuplicateOption { index: 1 })
        );
    }

    #[test]
    fn test_matrix_row_count() {
        let q = question(QuestionKind::Matrix, 5, 3);
        assert!(Answer::new(1, AnswerValue::RowChoices(vec![0, 4, 2])).validate(&q).is_ok());
        assert!(Answer::new(1, AnswerValue::RowChoices(vec![0, 4])).validate(&q).is_err());
    }

    #[test]
    fn test_numeric_matrix_integer_range() {
        let mut q = question(QuestionKind::NumericMatrix, 0, 2);
        q.constraints.range = Some(NumericRange::new(0.0, 10.0));
        q.constraints.integer = true;
        assert!(Answer::new(1, AnswerValue::RowNumbers(vec![3.0, 7.0])).validate(&q).is_ok());
        assert!(Answer::new(1, AnswerValue::RowNumbers(vec![3.5, 7.0])).validate(&q).is_err());
        assert!(Answer::new(1, AnswerValue::RowNumbers(vec![11.0, 7.0])).validate(&q).is_err());
    }

    #[test]
    fn test_numeric_matrix_total() {
        let mut q = question(QuestionKind::NumericMatrix, 0, 3);
        q.constraints.range = Some(NumericRange::new(0.0, 10.0));
        q.constraints.integer = true;
        q.constraints.total = Some(10.0);
        assert!(Answer::new(1, AnswerValue::RowNumbers(vec![5.0, 3.0, 2.0])).validate(&q).is_ok());
        assert_eq!(
            Answer::new(1, AnswerValue::RowNumbers(vec![5.0, 3.0, 3.0])).validate(&q),
            Err(ConstraintViolation::TotalMismatch {
                actual: 11.0,
                expected: 10.0
            })
        );
    }

    #[test]
    fn test_ranking_must_be_permutation() {
        let q = question(QuestionKind::Ranking, 3, 0);
        assert!(Answer::new(1, AnswerValue::Ranking(vec![2, 0, 1])).validate(&q).is_ok());
        assert!(Answer::new(1, AnswerValue::Ranking(vec![2, 0])).validate(&q).is_err());
    }

    #[test]
    fn test_text_length_and_kind_mismatch() {
        let mut q = question(QuestionKind::FreeText(TextLength::Short), 0, 0);
        q.constraints.max_length = Some(4);
        assert!(Answer::new(1, AnswerValue::Text("你好".to_string())).validate(&q).is_ok());
        assert!(Answer::new(1, AnswerValue::Text("你好你好你".to_string())).validate(&q).is_err());
        assert!(Answer::new(1, AnswerValue::Text("  ".to_string())).validate(&q).is_err());
        assert!(matches!(
            Answer::new(1, AnswerValue::Choice(0)).validate(&q),
            Err(ConstraintViolation::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_scale_uses_option_count() {
        let q = question(QuestionKind::Scale, 5, 0);
        assert!(Answer::new(1, AnswerValue::Number(5.0)).validate(&q).is_ok());
        assert!(Answer::new(1, AnswerValue::Number(0.0)).validate(&q).is_err());
        assert!(Answer::new(1, AnswerValue::Number(2.5)).validate(&q).is_err());
    }
}
