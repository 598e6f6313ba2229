//! 答案生成服务 - 业务能力层
//!
//! 按题型分派：构造提示词 → 调用 LLM → 解析并修复回复 → 校验约束。
//! 返回的每个 [`Answer`] 都已通过 [`Answer::validate`]。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SynthesisError;
use crate::models::answer::{Answer, AnswerValue};
use crate::models::persona::Persona;
use crate::models::question::{FormModel, NumericRange, Question, QuestionKind, TextLength};
use crate::services::llm_service::LlmService;
use crate::services::response_parser::{
    parse_index, parse_indices, parse_numbers, strip_quotes, truncate_chars,
};

/// 单行填空缺省字数上限
pub const SHORT_TEXT_LIMIT: usize = 100;
/// 多行简答缺省字数上限
pub const LONG_TEXT_LIMIT: usize = 300;

/// 答案生成服务
pub struct AnswerSynthesizer {
    llm: Arc<LlmService>,
    max_retries: u32,
    temperature: f32,
}

impl AnswerSynthesizer {
    /// # 参数
    /// - `max_retries`: 回复无效时的最多提问次数（至少 1 次）
    /// - `temperature`: 配置中的 answer_temperature
    pub fn new(llm: Arc<LlmService>, max_retries: u32, temperature: f32) -> Self {
        Self {
            llm,
            max_retries,
            temperature,
        }
    }

    /// 为整份问卷生成答案，顺序与题目一致
    pub async fn answer_form(
        &self,
        persona: &Persona,
        form: &FormModel,
    ) -> Result<Vec<Answer>, SynthesisError> {
        let mut answers = Vec::with_capacity(form.questions.len());
        for question in &form.questions {
            let answer = self.answer(persona, question).await?;
            answers.push(answer);
        }
        Ok(answers)
    }

    /// 为单题生成满足约束的答案
    pub async fn answer(&self, persona: &Persona, question: &Question) -> Result<Answer, SynthesisError> {
        info!(
            "📝 第 {} 题 [{}] {}",
            question.id,
            question.kind.name(),
            crate::utils::logging::truncate_text(&question.prompt, 40)
        );

        let value = match question.kind {
            QuestionKind::SingleChoice | QuestionKind::Dropdown => {
                AnswerValue::Choice(self.single_choice(persona, question).await?)
            }
            QuestionKind::MultiChoice => AnswerValue::Choices(self.multi_choice(persona, question).await?),
            QuestionKind::FreeText(length) => AnswerValue::Text(self.free_text(persona, question, length).await?),
            QuestionKind::Scale => AnswerValue::Number(self.scale(persona, question).await?),
            QuestionKind::Matrix => AnswerValue::RowChoices(self.matrix(persona, question).await?),
            QuestionKind::Numeric => AnswerValue::Number(self.numeric(persona, question).await?),
            QuestionKind::NumericMatrix => {
                AnswerValue::RowNumbers(self.numeric_matrix(persona, question).await?)
            }
            QuestionKind::Ranking => AnswerValue::Ranking(self.ranking(persona, question).await?),
        };

        let answer = Answer::new(question.id, value);
        answer
            .validate(question)
            .map_err(|violation| SynthesisError::Unsatisfiable {
                question_id: question.id,
                reason: violation.to_string(),
            })?;
        info!("✓ 第 {} 题答案: {}", question.id, answer.summary());
        Ok(answer)
    }

    async fn single_choice(&self, persona: &Persona, question: &Question) -> Result<usize, SynthesisError> {
        require_options(question)?;
        if question.options.len() == 1 {
            return Ok(0);
        }
        let prompt = format!(
            "请回答这道单选题：{}\n选项：{}\n只回复一个选项编号（1-{}），不要解释。",
            question.prompt,
            question.numbered_options(),
            question.options.len()
        );
        self.ask_until_valid(persona, question, &prompt, true, |response| {
            parse_index(response, &question.options)
        })
        .await
    }

    async fn multi_choice(&self, persona: &Persona, question: &Question) -> Result<Vec<usize>, SynthesisError> {
        require_options(question)?;
        let count = question.options.len();
        let max = question.constraints.max_selections.min(count);
        let min = question.constraints.min_selections;
        if min > max {
            return Err(SynthesisError::Unsatisfiable {
                question_id: question.id,
                reason: format!("至少选 {} 项，但最多只能选 {} 项", min, max),
            });
        }
        if min == count {
            return Ok((0..count).collect());
        }

        let prompt = format!(
            "请回答这道多选题：{}\n选项：{}\n请选择 {} 到 {} 个选项，只回复选项编号，用逗号分隔，不要解释。",
            question.prompt,
            question.numbered_options(),
            min.max(1),
            max
        );
        self.ask_until_valid(persona, question, &prompt, false, |response| {
            let picked = parse_indices(response, count);
            if picked.is_empty() {
                return Err("回答中没有合法的选项编号".to_string());
            }
            Ok(fit_selection(picked, count, min, max))
        })
        .await
    }

    async fn free_text(
        &self,
        persona: &Persona,
        question: &Question,
        length: TextLength,
    ) -> Result<String, SynthesisError> {
        let limit = question.constraints.max_length.unwrap_or(match length {
            TextLength::Short => SHORT_TEXT_LIMIT,
            TextLength::Long => LONG_TEXT_LIMIT,
        });
        let prompt = format!(
            "请以你的身份回答这道{}：{}\n用符合你写作风格的口吻直接给出答案，不超过 {} 个字，不要加引号或解释。",
            question.kind.name(),
            question.prompt,
            limit
        );
        self.ask_until_valid(persona, question, &prompt, false, |response| {
            let text = strip_quotes(response);
            if text.is_empty() {
                return Err("回答为空".to_string());
            }
            Ok(truncate_chars(text, limit))
        })
        .await
    }

    async fn scale(&self, persona: &Persona, question: &Question) -> Result<f64, SynthesisError> {
        require_options(question)?;
        let range = question.scale_range();
        let prompt = format!(
            "请回答这道量表题：{}\n刻度：{}\n只回复一个 {} 到 {} 之间的整数，不要解释。",
            question.prompt,
            question.numbered_options(),
            range.min,
            range.max
        );
        self.ask_until_valid(persona, question, &prompt, false, |response| {
            first_number(response).map(|value| fit_number(value, range, true))
        })
        .await
    }

    async fn matrix(&self, persona: &Persona, question: &Question) -> Result<Vec<usize>, SynthesisError> {
        require_options(question)?;
        if question.rows.is_empty() {
            return Err(SynthesisError::Unsatisfiable {
                question_id: question.id,
                reason: "矩阵题没有子行".to_string(),
            });
        }

        let mut choices = Vec::with_capacity(question.rows.len());
        for (row_index, row) in question.rows.iter().enumerate() {
            if question.options.len() == 1 {
                choices.push(0);
                continue;
            }
            debug!("第 {} 题第 {} 行: {}", question.id, row_index + 1, row);
            let prompt = format!(
                "这是矩阵题「{}」中的一行：{}\n选项：{}\n只回复一个选项编号（1-{}），不要解释。",
                question.prompt,
                row,
                question.numbered_options(),
                question.options.len()
            );
            let choice = self
                .ask_until_valid(persona, question, &prompt, true, |response| {
                    parse_index(response, &question.options)
                })
                .await?;
            choices.push(choice);
        }
        Ok(choices)
    }

    async fn numeric(&self, persona: &Persona, question: &Question) -> Result<f64, SynthesisError> {
        let range = question
            .constraints
            .range
            .or_else(|| question.kind.default_range())
            .unwrap_or(NumericRange { min: 1.0, max: 100.0 });
        let integer = question.constraints.integer;
        let prompt = format!(
            "请回答这道数字题：{}\n只回复一个 {} 到 {} 之间的数字，不要解释。",
            question.prompt, range.min, range.max
        );
        self.ask_until_valid(persona, question, &prompt, false, |response| {
            first_number(response).map(|value| fit_number(value, range, integer))
        })
        .await
    }

    async fn numeric_matrix(&self, persona: &Persona, question: &Question) -> Result<Vec<f64>, SynthesisError> {
        if question.rows.is_empty() {
            return Err(SynthesisError::Unsatisfiable {
                question_id: question.id,
                reason: "数字矩阵题没有子行".to_string(),
            });
        }
        let range = question
            .constraints
            .range
            .or_else(|| question.kind.default_range())
            .unwrap_or(NumericRange { min: 0.0, max: 10.0 });
        let integer = question.constraints.integer;
        let row_count = question.rows.len();
        let total = question.constraints.total;
        if let Some(total) = total {
            let n = row_count as f64;
            if total < n * range.min || total > n * range.max || (integer && total.fract() != 0.0) {
                return Err(SynthesisError::Unsatisfiable {
                    question_id: question.id,
                    reason: format!("{} 行取值 [{}, {}] 无法凑成总和 {}", row_count, range.min, range.max, total),
                });
            }
        }
        let rows = question
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| format!("{}. {}", i + 1, row))
            .collect::<Vec<_>>()
            .join(" | ");
        let mut prompt = format!(
            "请回答这道数字矩阵题：{}\n子项：{}\n为每个子项给出一个 {} 到 {} 之间的{}，按顺序用逗号分隔，共 {} 个，不要解释。",
            question.prompt,
            rows,
            range.min,
            range.max,
            if integer { "整数" } else { "数字" },
            row_count
        );
        if let Some(total) = total {
            prompt.push_str(&format!("\n这些数字表示比重，加起来必须正好等于 {}。", total));
        }
        self.ask_until_valid(persona, question, &prompt, false, |response| {
            let values = parse_numbers(response);
            if values.is_empty() {
                return Err("回答中没有数字".to_string());
            }
            let fitted = fit_row_numbers(values, row_count, range, integer);
            Ok(match total {
                Some(total) => fit_row_total(fitted, range, total),
                None => fitted,
            })
        })
        .await
    }

    async fn ranking(&self, persona: &Persona, question: &Question) -> Result<Vec<usize>, SynthesisError> {
        require_options(question)?;
        let count = question.options.len();
        if count == 1 {
            return Ok(vec![0]);
        }
        let prompt = format!(
            "请对以下选项按你的偏好从高到低排序：{}\n选项：{}\n只回复全部 {} 个选项编号，按顺序用逗号分隔，不要解释。",
            question.prompt,
            question.numbered_options(),
            count
        );
        self.ask_until_valid(persona, question, &prompt, false, |response| {
            let order = parse_indices(response, count);
            if order.is_empty() {
                return Err("回答中没有合法的选项编号".to_string());
            }
            Ok(complete_ranking(order, count))
        })
        .await
    }

    /// 反复提问直到回复可解析
    ///
    /// 每次重新提问都会附上上一次的错误原因。LLM 调用本身的失败直接返回。
    async fn ask_until_valid<T>(
        &self,
        persona: &Persona,
        question: &Question,
        prompt: &str,
        selection: bool,
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> Result<T, SynthesisError> {
        let system = persona_system_prompt(persona);
        let attempts = self.max_retries.max(1);
        let mut last_reason = String::new();
        let mut last_response = String::new();

        for attempt in 1..=attempts {
            let full_prompt = if attempt == 1 {
                prompt.to_string()
            } else {
                format!("{}\n（上一次的回答「{}」无效：{}，请严格按要求重新回答。）", prompt, last_response, last_reason)
            };

            let response = self
                .llm
                .ask(Some(&system), &full_prompt, self.temperature)
                .await
                .map_err(|source| SynthesisError::Llm {
                    question_id: question.id,
                    source,
                })?;

            match parse(&response) {
                Ok(value) => return Ok(value),
                Err(reason) => {
                    warn!(
                        "第 {} 题回答无效 (尝试 {}/{}): {}",
                        question.id, attempt, attempts, reason
                    );
                    last_reason = reason;
                    last_response = crate::utils::logging::truncate_text(&response, 60);
                }
            }
        }

        if selection {
            Err(SynthesisError::InvalidSelection {
                question_id: question.id,
                response: last_response,
            })
        } else {
            Err(SynthesisError::Exhausted {
                question_id: question.id,
                attempts,
                last_reason,
            })
        }
    }
}

fn persona_system_prompt(persona: &Persona) -> String {
    format!(
        "你正在以下面这个人的身份填写一份问卷，所有回答都要符合这个人设：\n{}\n\
         严格按题目要求的格式回答，不要使用<think>标签。",
        persona.describe()
    )
}

fn require_options(question: &Question) -> Result<(), SynthesisError> {
    if question.options.is_empty() {
        return Err(SynthesisError::Unsatisfiable {
            question_id: question.id,
            reason: format!("{}没有选项", question.kind.name()),
        });
    }
    Ok(())
}

fn first_number(response: &str) -> Result<f64, String> {
    parse_numbers(response)
        .into_iter()
        .next()
        .ok_or_else(|| "回答中没有数字".to_string())
}

/// 把 AI 的多选结果修正到 `[min, max]`
///
/// 超出时保留前 `max` 个；不足时按下标从小到大补齐未选选项。
pub(crate) fn fit_selection(mut picked: Vec<usize>, count: usize, min: usize, max: usize) -> Vec<usize> {
    picked.truncate(max);
    let mut next = 0;
    while picked.len() < min && next < count {
        if !picked.contains(&next) {
            picked.push(next);
        }
        next += 1;
    }
    picked
}

/// 越界取边界，整数题四舍五入
pub(crate) fn fit_number(value: f64, range: NumericRange, integer: bool) -> f64 {
    let clamped = range.clamp(value);
    if !integer {
        return clamped;
    }
    let rounded = clamped.round();
    if range.contains(rounded) {
        rounded
    } else if rounded > range.max {
        clamped.floor()
    } else {
        clamped.ceil()
    }
}

/// 按行数补齐或截断，缺失行取区间中点
pub(crate) fn fit_row_numbers(values: Vec<f64>, rows: usize, range: NumericRange, integer: bool) -> Vec<f64> {
    let filler = fit_number(range.midpoint(), range, integer);
    let mut fitted: Vec<f64> = values
        .into_iter()
        .take(rows)
        .map(|value| fit_number(value, range, integer))
        .collect();
    fitted.resize(rows, filler);
    fitted
}

/// 把各行之和调整为 `total`
///
/// 差额按行顺序分摊，每行只在自身区间内移动。调用前需保证总和可达。
pub(crate) fn fit_row_total(mut values: Vec<f64>, range: NumericRange, total: f64) -> Vec<f64> {
    let mut residual = total - values.iter().sum::<f64>();
    for value in values.iter_mut() {
        if residual.abs() < 1e-9 {
            break;
        }
        let shift = if residual > 0.0 {
            residual.min(range.max - *value)
        } else {
            residual.max(range.min - *value)
        };
        *value += shift;
        residual -= shift;
    }
    values
}

/// 把部分排序补成全排列：缺失的选项按原顺序追加到末尾
pub(crate) fn complete_ranking(mut order: Vec<usize>, count: usize) -> Vec<usize> {
    order.retain(|&index| index < count);
    let mut seen = vec![false; count];
    order.retain(|&index| !std::mem::replace(&mut seen[index], true));
    order.extend((0..count).filter(|index| !seen[*index]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{CompletionBackend, CompletionRequest};
    use crate::error::LlmError;
    use crate::models::persona::REQUIRED_TRAITS;
    use crate::models::question::Constraints;
    use crate::services::llm_service::LlmSettings;
    use crate::services::rate_limiter::RateLimiter;
    use crate::services::retry::RetryPolicy;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// 依次返回预设回复，用完后重复最后一条
    struct Script {
        replies: Mutex<Vec<String>>,
        calls: AtomicU32,
    }

    impl Script {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for Script {
        fn model(&self) -> &str {
            "script"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                Ok(replies.remove(0))
            } else {
                Ok(replies[0].clone())
            }
        }
    }

    /// 回复完全由提示词决定
    struct Echo;

    #[async_trait]
    impl CompletionBackend for Echo {
        fn model(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            let digits = request.prompt.chars().filter(|c| c.is_ascii_digit()).count();
            Ok(format!("{}", digits % 3 + 1))
        }
    }

    struct Fatal;

    #[async_trait]
    impl CompletionBackend for Fatal {
        fn model(&self) -> &str {
            "fatal"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::Authentication {
                model: "fatal".to_string(),
                message: "bad key".to_string(),
            })
        }
    }

    fn synthesizer(backend: Arc<dyn CompletionBackend>, max_retries: u32) -> AnswerSynthesizer {
        let llm = LlmService::new(
            backend,
            LlmSettings {
                timeout: Duration::from_secs(5),
                max_tokens: 128,
                retry: RetryPolicy::immediate(0),
            },
            RateLimiter::unlimited(),
        );
        AnswerSynthesizer::new(Arc::new(llm), max_retries, 0.0)
    }

    fn persona() -> Persona {
        let traits: BTreeMap<String, String> = REQUIRED_TRAITS
            .iter()
            .map(|k| (k.to_string(), format!("{}值", k)))
            .collect();
        Persona::from_traits(traits).unwrap()
    }

    fn question(kind: QuestionKind, options: usize, rows: usize) -> Question {
        Question {
            id: 7,
            kind,
            prompt: "你平时多久运动一次".to_string(),
            options: (1..=options).map(|i| format!("选项{}", i)).collect(),
            rows: (1..=rows).map(|i| format!("行{}", i)).collect(),
            constraints: Constraints::default(),
            page: 0,
        }
    }

    #[tokio::test]
    async fn test_single_choice_in_range_after_reprompt() {
        let backend = Arc::new(Script::new(&["9", "我选 2"]));
        let answer = synthesizer(backend.clone(), 3)
            .answer(&persona(), &question(QuestionKind::SingleChoice, 3, 0))
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::Choice(1));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_choice_invalid_selection_after_budget() {
        let backend = Arc::new(Script::new(&["都不想选"]));
        let err = synthesizer(backend, 2)
            .answer(&persona(), &question(QuestionKind::Dropdown, 4, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidSelection { question_id: 7, .. }));
        assert!(!err.is_run_fatal());
    }

    #[tokio::test]
    async fn test_single_option_needs_no_call() {
        let backend = Arc::new(Script::new(&["1"]));
        let answer = synthesizer(backend.clone(), 3)
            .answer(&persona(), &question(QuestionKind::SingleChoice, 1, 0))
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::Choice(0));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_multi_choice_truncates_and_pads() {
        let mut q = question(QuestionKind::MultiChoice, 5, 0);
        q.constraints.min_selections = 2;
        q.constraints.max_selections = 3;

        let over = synthesizer(Arc::new(Script::new(&["5,4,3,2,1"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap();
        assert_eq!(over.value, AnswerValue::Choices(vec![4, 3, 2]));

        let under = synthesizer(Arc::new(Script::new(&["3"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap();
        assert_eq!(under.value, AnswerValue::Choices(vec![2, 0]));
    }

    #[tokio::test]
    async fn test_multi_choice_unsatisfiable() {
        let mut q = question(QuestionKind::MultiChoice, 2, 0);
        q.constraints.min_selections = 3;
        q.constraints.max_selections = 3;
        let err = synthesizer(Arc::new(Script::new(&["1"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Unsatisfiable { .. }));
    }

    #[tokio::test]
    async fn test_matrix_one_answer_per_row() {
        let backend = Arc::new(Script::new(&["1", "5", "3"]));
        let answer = synthesizer(backend.clone(), 3)
            .answer(&persona(), &question(QuestionKind::Matrix, 5, 3))
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::RowChoices(vec![0, 4, 2]));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_numeric_values_are_clamped() {
        let mut q = question(QuestionKind::Numeric, 0, 0);
        q.constraints.range = Some(NumericRange::new(1.0, 100.0));
        q.constraints.integer = true;
        let answer = synthesizer(Arc::new(Script::new(&["我大概 250 岁"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::Number(100.0));

        let scale = synthesizer(Arc::new(Script::new(&["0"])), 3)
            .answer(&persona(), &question(QuestionKind::Scale, 5, 0))
            .await
            .unwrap();
        assert_eq!(scale.value, AnswerValue::Number(1.0));
    }

    #[tokio::test]
    async fn test_numeric_matrix_fills_missing_rows() {
        let mut q = question(QuestionKind::NumericMatrix, 0, 3);
        q.constraints.integer = true;
        let answer = synthesizer(Arc::new(Script::new(&["12, 3.6"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::RowNumbers(vec![10.0, 4.0, 5.0]));
    }

    #[tokio::test]
    async fn test_numeric_matrix_shares_sum_to_total() {
        let mut q = question(QuestionKind::NumericMatrix, 0, 3);
        q.constraints.range = Some(NumericRange::new(0.0, 10.0));
        q.constraints.integer = true;
        q.constraints.total = Some(10.0);

        let backend = Arc::new(Script::new(&["6, 5, 4"]));
        let answer = synthesizer(backend, 3).answer(&persona(), &q).await.unwrap();
        assert_eq!(answer.value, AnswerValue::RowNumbers(vec![1.0, 5.0, 4.0]));

        let answer = synthesizer(Arc::new(Script::new(&["1, 2"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::RowNumbers(vec![3.0, 2.0, 5.0]));
    }

    #[tokio::test]
    async fn test_numeric_matrix_unreachable_total() {
        let mut q = question(QuestionKind::NumericMatrix, 0, 2);
        q.constraints.range = Some(NumericRange::new(0.0, 3.0));
        q.constraints.total = Some(10.0);
        let err = synthesizer(Arc::new(Script::new(&["3, 3"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Unsatisfiable { .. }));
    }

    #[test]
    fn test_fit_row_total_stays_in_range() {
        let range = NumericRange::new(0.0, 10.0);
        assert_eq!(fit_row_total(vec![10.0, 10.0, 10.0], range, 10.0), vec![0.0, 0.0, 10.0]);
        assert_eq!(fit_row_total(vec![0.0, 0.0], range, 15.0), vec![10.0, 5.0]);
        assert_eq!(fit_row_total(vec![4.0, 6.0], range, 10.0), vec![4.0, 6.0]);
    }

    #[tokio::test]
    async fn test_ranking_is_repaired() {
        let answer = synthesizer(Arc::new(Script::new(&["3, 3, 1"])), 3)
            .answer(&persona(), &question(QuestionKind::Ranking, 4, 0))
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::Ranking(vec![2, 0, 1, 3]));
    }

    #[tokio::test]
    async fn test_free_text_truncated() {
        let mut q = question(QuestionKind::FreeText(TextLength::Short), 0, 0);
        q.constraints.max_length = Some(5);
        let answer = synthesizer(Arc::new(Script::new(&["“我觉得还挺不错的”"])), 3)
            .answer(&persona(), &q)
            .await
            .unwrap();
        assert_eq!(answer.value, AnswerValue::Text("我觉得还挺".to_string()));
    }

    #[tokio::test]
    async fn test_empty_options_unsatisfiable() {
        let err = synthesizer(Arc::new(Script::new(&["1"])), 3)
            .answer(&persona(), &question(QuestionKind::SingleChoice, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Unsatisfiable { .. }));
    }

    #[tokio::test]
    async fn test_fatal_llm_error_propagates() {
        let err = synthesizer(Arc::new(Fatal), 3)
            .answer(&persona(), &question(QuestionKind::SingleChoice, 3, 0))
            .await
            .unwrap_err();
        assert!(err.is_run_fatal());
    }

    #[tokio::test]
    async fn test_repeated_answers_identical_at_zero_temperature() {
        let synth = synthesizer(Arc::new(Echo), 3);
        let form = FormModel::new(
            "https://example.com/vm/abc.aspx",
            vec![
                question(QuestionKind::SingleChoice, 3, 0),
                question(QuestionKind::Matrix, 3, 2),
                question(QuestionKind::Scale, 3, 0),
            ],
        );
        let first = synth.answer_form(&persona(), &form).await.unwrap();
        let second = synth.answer_form(&persona(), &form).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_fit_number_rounds_inside_range() {
        let range = NumericRange::new(0.5, 3.4);
        assert_eq!(fit_number(3.45, range, true), 3.0);
        assert_eq!(fit_number(0.2, range, true), 1.0);
        assert_eq!(fit_number(2.25, range, false), 2.25);
    }

    #[test]
    fn test_complete_ranking_appends_missing() {
        assert_eq!(complete_ranking(vec![1], 3), vec![1, 0, 2]);
        assert_eq!(complete_ranking(vec![2, 1, 0], 3), vec![2, 1, 0]);
    }
}
