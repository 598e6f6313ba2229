//! 问卷结构模型
//!
//! 纯数据，由浏览器层解析页面后构建，之后只读。

use serde::{Deserialize, Serialize};

/// 填空题长度档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextLength {
    /// 题型 1：单行填空
    Short,
    /// 题型 2：多行简答
    Long,
}

/// 题型
///
/// 封闭枚举，新增题型只能扩展这里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    FreeText(TextLength),
    SingleChoice,
    MultiChoice,
    Scale,
    Matrix,
    Dropdown,
    Numeric,
    NumericMatrix,
    Ranking,
}

/// 页面上的题型代码 → 题型
static TYPE_CODES: phf::Map<&'static str, QuestionKind> = phf::phf_map! {
    "1" => QuestionKind::FreeText(TextLength::Short),
    "2" => QuestionKind::FreeText(TextLength::Long),
    "3" => QuestionKind::SingleChoice,
    "4" => QuestionKind::MultiChoice,
    "5" => QuestionKind::Scale,
    "6" => QuestionKind::Matrix,
    "7" => QuestionKind::Dropdown,
    "8" => QuestionKind::Numeric,
    "10" => QuestionKind::NumericMatrix,
    "11" => QuestionKind::Ranking,
};

impl QuestionKind {
    /// 从题型代码解析，未知代码返回 None
    pub fn from_code(code: &str) -> Option<Self> {
        TYPE_CODES.get(code.trim()).copied()
    }

    /// 题型代码
    pub fn code(self) -> &'static str {
        match self {
            QuestionKind::FreeText(TextLength::Short) => "1",
            QuestionKind::FreeText(TextLength::Long) => "2",
            QuestionKind::SingleChoice => "3",
            QuestionKind::MultiChoice => "4",
            QuestionKind::Scale => "5",
            QuestionKind::Matrix => "6",
            QuestionKind::Dropdown => "7",
            QuestionKind::Numeric => "8",
            QuestionKind::NumericMatrix => "10",
            QuestionKind::Ranking => "11",
        }
    }

    /// 中文名称（用于日志和提示词）
    pub fn name(self) -> &'static str {
        match self {
            QuestionKind::FreeText(TextLength::Short) => "填空题",
            QuestionKind::FreeText(TextLength::Long) => "简答题",
            QuestionKind::SingleChoice => "单选题",
            QuestionKind::MultiChoice => "多选题",
            QuestionKind::Scale => "量表题",
            QuestionKind::Matrix => "矩阵题",
            QuestionKind::Dropdown => "下拉框题",
            QuestionKind::Numeric => "数字题",
            QuestionKind::NumericMatrix => "数字矩阵题",
            QuestionKind::Ranking => "排序题",
        }
    }

    /// 是否需要选项列表
    pub fn needs_options(self) -> bool {
        matches!(
            self,
            QuestionKind::SingleChoice
                | QuestionKind::MultiChoice
                | QuestionKind::Scale
                | QuestionKind::Matrix
                | QuestionKind::Dropdown
                | QuestionKind::Ranking
        )
    }

    /// 是否需要子行
    pub fn needs_rows(self) -> bool {
        matches!(self, QuestionKind::Matrix | QuestionKind::NumericMatrix)
    }

    /// 页面未声明范围时的缺省取值范围
    pub fn default_range(self) -> Option<NumericRange> {
        match self {
            QuestionKind::Numeric => Some(NumericRange { min: 1.0, max: 100.0 }),
            QuestionKind::NumericMatrix => Some(NumericRange { min: 0.0, max: 10.0 }),
            _ => None,
        }
    }

    /// 页面未声明总和时数字矩阵各行之和
    pub fn default_total(self) -> Option<f64> {
        match self {
            QuestionKind::NumericMatrix => Some(10.0),
            _ => None,
        }
    }
}

/// 闭区间数值范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// 越界取最近边界
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// 题目约束
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub required: bool,
    pub min_selections: usize,
    pub max_selections: usize,
    pub range: Option<NumericRange>,
    /// 填空题最大字符数
    pub max_length: Option<usize>,
    /// 数值是否必须为整数
    pub integer: bool,
    /// 数字矩阵各行之和（比重题）
    #[serde(default)]
    pub total: Option<f64>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            required: true,
            min_selections: 1,
            max_selections: 1,
            range: None,
            max_length: None,
            integer: false,
            total: None,
        }
    }
}

/// 单道题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// 题号（页面上的 topic 编号）
    pub id: u32,
    pub kind: QuestionKind,
    /// 题干
    pub prompt: String,
    /// 选项（矩阵题为列）
    pub options: Vec<String>,
    /// 子行（矩阵题、数字矩阵题）
    pub rows: Vec<String>,
    pub constraints: Constraints,
    /// 所在分页（从 0 开始）
    pub page: usize,
}

impl Question {
    /// 量表题取值范围：1..=选项数
    pub fn scale_range(&self) -> NumericRange {
        self.constraints
            .range
            .unwrap_or_else(|| NumericRange::new(1.0, self.options.len().max(1) as f64))
    }

    /// 选项列表格式化为 "1. xxx | 2. yyy"
    pub fn numbered_options(&self) -> String {
        self.options
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {}", i + 1, text))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// 页面上存在但不支持的题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedQuestion {
    pub id: u32,
    pub code: String,
}

/// 解析后的整份问卷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormModel {
    pub url: String,
    pub questions: Vec<Question>,
    pub page_count: usize,
    #[serde(default)]
    pub unsupported: Vec<UnsupportedQuestion>,
}

impl FormModel {
    pub fn new(url: impl Into<String>, questions: Vec<Question>) -> Self {
        let page_count = questions.iter().map(|q| q.page + 1).max().unwrap_or(0);
        Self {
            url: url.into(),
            questions,
            page_count,
            unsupported: Vec::new(),
        }
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes_cover_all_kinds() {
        let codes = ["1", "2", "3", "4", "5", "6", "7", "8", "10", "11"];
        for code in codes {
            let kind = QuestionKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(QuestionKind::from_code("9"), None);
        assert_eq!(QuestionKind::from_code(" 4 "), Some(QuestionKind::MultiChoice));
    }

    #[test]
    fn test_range_clamp() {
        let range = NumericRange::new(10.0, 0.0);
        assert_eq!(range.min, 0.0);
        assert_eq!(range.clamp(-3.0), 0.0);
        assert_eq!(range.clamp(42.0), 10.0);
        assert_eq!(range.clamp(f64::NAN), 0.0);
        assert_eq!(range.clamp(7.5), 7.5);
    }

    #[test]
    fn test_page_count_from_questions() {
        let q = |id, page| Question {
            id,
            kind: QuestionKind::SingleChoice,
            prompt: String::new(),
            options: vec!["a".to_string()],
            rows: Vec::new(),
            constraints: Constraints::default(),
            page,
        };
        let form = FormModel::new("https://example.com", vec![q(1, 0), q(2, 2)]);
        assert_eq!(form.page_count, 3);
        assert!(form.question(2).is_some());
        assert!(FormModel::new("u", Vec::new()).is_empty());
    }
}
