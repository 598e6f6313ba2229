//! 浏览器会话 - 基础设施层
//!
//! [`BrowserSession`] 是流程层看到的全部浏览器能力：打开问卷、写入答案、翻页、提交、
//! 探测验证与完成信号。[`ChromiumSession`] 是基于 chromiumoxide 的实现，
//! 选择器按问卷星页面结构编写。

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::browser::launcher::{acquire_browser, LaunchedBrowser};
use crate::config::BrowserParams;
use crate::error::BrowserError;
use crate::infrastructure::js_executor::{js_string, JsExecutor};
use crate::models::answer::{Answer, AnswerValue};
use crate::models::question::{
    Constraints, FormModel, NumericRange, Question, QuestionKind, UnsupportedQuestion,
};

/// 同一题内连续点击的间隔
const ACTION_GAP: Duration = Duration::from_millis(300);
/// 等待问卷题目出现的上限
const FORM_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// 提交后的页面状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionSignal {
    /// 还没有结论
    Pending,
    /// 提交成功
    Completed,
    /// 页面明确拒绝（例如必填项提示）
    Rejected(String),
}

/// 单个窗口独占的浏览器会话
#[async_trait]
pub trait BrowserSession: Send {
    /// 打开问卷并解析结构，每次尝试调用一次
    async fn open_form(&mut self, url: &str) -> Result<FormModel, BrowserError>;

    /// 把一道题的答案写入页面
    async fn fill(&mut self, question: &Question, answer: &Answer) -> Result<(), BrowserError>;

    /// 进入下一页
    async fn advance_page(&mut self) -> Result<(), BrowserError>;

    /// 点击提交
    async fn submit(&mut self) -> Result<(), BrowserError>;

    /// 页面上是否有待完成的人机验证
    async fn verification_pending(&mut self) -> Result<bool, BrowserError>;

    /// 探测提交结果
    async fn completion_signal(&mut self) -> Result<CompletionSignal, BrowserError>;

    /// 关闭当前问卷页面
    async fn close_form(&mut self) -> Result<(), BrowserError>;

    /// 释放会话持有的全部资源，之后不可再用
    async fn release(&mut self) -> Result<(), BrowserError>;
}

/// 为窗口创建会话
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn acquire(&self, worker_id: usize) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// 基于 chromiumoxide 的会话工厂
pub struct ChromiumSessionFactory {
    params: BrowserParams,
}

impl ChromiumSessionFactory {
    pub fn new(params: BrowserParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn acquire(&self, worker_id: usize) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let browser = acquire_browser(&self.params, worker_id).await?;
        Ok(Box::new(ChromiumSession {
            worker_id,
            browser: Some(browser),
            executor: None,
            original_url: String::new(),
        }))
    }
}

/// 基于 chromiumoxide 的会话
pub struct ChromiumSession {
    worker_id: usize,
    browser: Option<LaunchedBrowser>,
    executor: Option<JsExecutor>,
    original_url: String,
}

impl ChromiumSession {
    fn executor(&self) -> Result<&JsExecutor, BrowserError> {
        self.executor.as_ref().ok_or_else(|| BrowserError::ScriptFailed {
            message: "当前没有打开的问卷页面".to_string(),
        })
    }

    async fn wait_for_questions(&self) -> Result<(), BrowserError> {
        let executor = self.executor()?;
        let deadline = Instant::now() + FORM_READY_TIMEOUT;
        loop {
            let ready: bool = executor
                .eval_as("document.querySelectorAll('div[topic]').length > 0")
                .await?;
            if ready || Instant::now() >= deadline {
                return Ok(());
            }
            sleep(Duration::from_millis(200)).await;
        }
    }

    async fn run_action(&self, question_id: u32, action: &FillAction) -> Result<(), BrowserError> {
        let executor = self.executor()?;
        let interaction = |message: String| BrowserError::FormInteraction { question_id, message };

        match action {
            FillAction::Click(selector) => executor
                .click(selector)
                .await
                .map_err(|e| interaction(format!("点击 {} 失败: {}", selector, e))),
            FillAction::Type { selector, text } => executor
                .type_into(selector, text)
                .await
                .map_err(|e| interaction(format!("输入 {} 失败: {}", selector, e))),
            FillAction::Script(js) => {
                let done: bool = executor.eval_as(js.as_str()).await?;
                if done {
                    Ok(())
                } else {
                    Err(interaction("页面上找不到对应的控件".to_string()))
                }
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_form(&mut self, url: &str) -> Result<FormModel, BrowserError> {
        self.close_form().await?;

        let browser = self.browser.as_ref().ok_or_else(|| BrowserError::LaunchFailed {
            message: "会话已释放".to_string(),
        })?;
        let page = browser
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let executor = JsExecutor::new(page);
        executor.goto(url).await?;
        self.executor = Some(executor);

        self.wait_for_questions().await?;
        let original_url = self.executor()?.current_url().await?;
        self.original_url = original_url;

        let raw: RawForm = self.executor()?.eval_as(PARSE_FORM_JS).await?;
        let form = raw.into_form(url);
        for skipped in &form.unsupported {
            warn!(
                "[窗口 {}] 第 {} 题为不支持题型！题型代码：{}",
                self.worker_id, skipped.id, skipped.code
            );
        }
        if form.is_empty() {
            return Err(BrowserError::MalformedForm {
                message: format!("页面上没有可识别的题目 ({})", url),
            });
        }

        info!(
            "[窗口 {}] 📄 已解析问卷: {} 题, {} 页",
            self.worker_id,
            form.questions.len(),
            form.page_count
        );
        Ok(form)
    }

    async fn fill(&mut self, question: &Question, answer: &Answer) -> Result<(), BrowserError> {
        let actions = fill_actions(question, answer).map_err(|message| BrowserError::FormInteraction {
            question_id: question.id,
            message,
        })?;
        for (i, action) in actions.iter().enumerate() {
            if i > 0 {
                sleep(ACTION_GAP).await;
            }
            debug!("第 {} 题: {:?}", question.id, action);
            self.run_action(question.id, action).await?;
        }
        Ok(())
    }

    async fn advance_page(&mut self) -> Result<(), BrowserError> {
        let executor = self.executor()?;
        executor.click("#divNext").await?;
        sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), BrowserError> {
        let executor = self.executor()?;
        executor.click("#ctlNext").await?;
        sleep(Duration::from_millis(500)).await;

        // 部分问卷提交前会弹出确认框
        if executor.is_visible(CONFIRM_BUTTON).await.unwrap_or(false) {
            debug!("点击提交确认框");
            executor.click(CONFIRM_BUTTON).await?;
        }
        Ok(())
    }

    async fn verification_pending(&mut self) -> Result<bool, BrowserError> {
        self.executor()?.eval_as(VERIFICATION_JS).await
    }

    async fn completion_signal(&mut self) -> Result<CompletionSignal, BrowserError> {
        let probe: CompletionProbe = self.executor()?.eval_as(COMPLETION_PROBE_JS).await?;
        Ok(classify_completion(&probe, &self.original_url))
    }

    async fn close_form(&mut self) -> Result<(), BrowserError> {
        if let Some(executor) = self.executor.take() {
            executor.close().await?;
        }
        Ok(())
    }

    async fn release(&mut self) -> Result<(), BrowserError> {
        let closed = self.close_form().await;
        if let Some(browser) = self.browser.take() {
            browser.shutdown().await?;
            info!("[窗口 {}] 浏览器已关闭", self.worker_id);
        }
        closed
    }
}

// ---------------------------------------------------------------------------
// 页面脚本
// ---------------------------------------------------------------------------

const CONFIRM_BUTTON: &str = "#layui-layer1 .layui-layer-btn a";

const PARSE_FORM_JS: &str = r#"(() => {
    const text = el => (el ? (el.innerText || el.textContent || '').trim() : '');
    const num = v => { const n = parseFloat(v); return Number.isFinite(n) ? n : null; };
    const fieldsets = Array.from(document.querySelectorAll('#divQuestion fieldset'));
    const pages = fieldsets.length ? fieldsets : [document];
    const questions = [];
    pages.forEach((root, page) => {
        root.querySelectorAll('div[topic]').forEach(div => {
            const topic = div.getAttribute('topic') || '';
            if (!/^\d+$/.test(topic)) return;
            const id = parseInt(topic, 10);
            const code = div.getAttribute('type') || '';
            const q = {
                id, code, page,
                prompt: text(div.querySelector('.topichtml')) || ('第' + id + '题'),
                options: [], rows: [],
                required: div.getAttribute('req') === '1',
                min_select: null, max_select: null,
                min_value: null, max_value: null, max_length: null, total: null,
            };
            const input = document.getElementById('q' + id);
            switch (code) {
                case '1': case '2': {
                    const len = input ? parseInt(input.getAttribute('maxlength') || '', 10) : NaN;
                    q.max_length = len > 0 ? len : null;
                    break;
                }
                case '3': case '4':
                    q.options = Array.from(div.querySelectorAll('.ui-controlgroup > div'))
                        .map(o => text(o.querySelector('.label')) || text(o));
                    q.min_select = num(div.getAttribute('minvalue'));
                    q.max_select = num(div.getAttribute('maxvalue'));
                    break;
                case '5':
                    q.options = Array.from(div.querySelectorAll('.scale-div ul > li'))
                        .map((li, i) => li.getAttribute('title') || text(li) || String(i + 1));
                    break;
                case '6': {
                    const first = Array.from(document.querySelectorAll('#drv' + id + '_1 > td')).slice(1);
                    const heads = Array.from(div.querySelectorAll('.trlabel th, thead th')).map(text).filter(t => t);
                    q.options = first.map((td, i) => {
                        const titled = td.getAttribute('title') ? td : td.querySelector('[title]');
                        return (titled && titled.getAttribute('title')) || heads[i] || String(i + 1);
                    });
                    q.rows = Array.from(document.querySelectorAll('#divRefTab' + id + ' tr[rowindex]'))
                        .map((tr, i) => text(tr.querySelector('td')) || ('第' + (i + 1) + '小题'));
                    break;
                }
                case '7':
                    if (input && input.options) {
                        q.options = Array.from(input.options)
                            .filter(o => o.value !== '' && o.value !== '-2')
                            .map(o => text(o));
                    }
                    break;
                case '8':
                    if (input) {
                        q.min_value = num(input.getAttribute('min'));
                        q.max_value = num(input.getAttribute('max'));
                    }
                    break;
                case '10': {
                    const inputs = Array.from(div.querySelectorAll("input[type='tel']"));
                    const titles = Array.from(div.querySelectorAll('.ui-table-column-title')).map(text);
                    q.rows = inputs.map((_, i) => titles[i] || ('第' + (i + 1) + '项'));
                    if (inputs.length) {
                        q.min_value = num(inputs[0].getAttribute('min'));
                        q.max_value = num(inputs[0].getAttribute('max'));
                    }
                    q.total = num(div.getAttribute('total'));
                    break;
                }
                case '11':
                    q.options = Array.from(div.querySelectorAll(':scope > ul > li')).map(text);
                    break;
            }
            questions.push(q);
        });
    });
    return { page_count: pages.length, questions };
})()"#;

const VERIFICATION_JS: &str = r#"(() => {
    const visible = el => {
        if (!el) return false;
        const style = window.getComputedStyle(el);
        return style.display !== 'none' && style.visibility !== 'hidden' && el.offsetParent !== null;
    };
    return ['#SM_BTN_1', '#nc_1_n1z', '#nc_1__scale_text'].some(s => visible(document.querySelector(s)));
})()"#;

const COMPLETION_PROBE_JS: &str = r#"(() => {
    const visible = el => {
        const style = window.getComputedStyle(el);
        return style.display !== 'none' && style.visibility !== 'hidden' && el.offsetParent !== null;
    };
    const markers = Array.from(document.querySelectorAll(
        "[class*='success'], [class*='complete'], [class*='finish'], [id*='success'], [id*='complete'], [id*='finish']"
    ));
    const errors = Array.from(document.querySelectorAll('.errorMessage'))
        .filter(visible)
        .map(el => (el.innerText || '').trim())
        .filter(t => t);
    return {
        url: window.location.href,
        title: document.title || '',
        body: ((document.body && document.body.innerText) || '').slice(0, 4000),
        success_marker: markers.some(visible),
        error_message: errors.length ? errors.join('；') : null,
    };
})()"#;

// ---------------------------------------------------------------------------
// 页面结构 → 问卷模型
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawForm {
    page_count: usize,
    questions: Vec<RawQuestion>,
}

impl RawForm {
    fn into_form(self, url: &str) -> FormModel {
        let mut questions = Vec::new();
        let mut unsupported = Vec::new();
        for raw in self.questions {
            match raw.into_question() {
                Ok(question) => questions.push(question),
                Err(skipped) => unsupported.push(skipped),
            }
        }
        let mut form = FormModel::new(url, questions);
        form.page_count = form.page_count.max(self.page_count);
        form.unsupported = unsupported;
        form
    }
}

/// 页面脚本解析出的原始题目
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawQuestion {
    pub id: u32,
    pub code: String,
    pub page: usize,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub rows: Vec<String>,
    #[serde(default)]
    pub required: bool,
    pub min_select: Option<f64>,
    pub max_select: Option<f64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub max_length: Option<usize>,
    pub total: Option<f64>,
}

impl RawQuestion {
    pub(crate) fn into_question(self) -> Result<Question, UnsupportedQuestion> {
        let Some(kind) = QuestionKind::from_code(&self.code) else {
            return Err(UnsupportedQuestion {
                id: self.id,
                code: self.code,
            });
        };

        let option_count = self.options.len();
        let mut constraints = Constraints {
            required: self.required,
            ..Constraints::default()
        };

        match kind {
            QuestionKind::MultiChoice => {
                let max = self
                    .max_select
                    .filter(|v| *v >= 1.0)
                    .map(|v| v as usize)
                    .unwrap_or(option_count)
                    .min(option_count);
                let min = self
                    .min_select
                    .filter(|v| *v >= 1.0)
                    .map(|v| v as usize)
                    .unwrap_or(1);
                constraints.min_selections = min;
                constraints.max_selections = max;
            }
            QuestionKind::Ranking => {
                constraints.min_selections = option_count;
                constraints.max_selections = option_count;
            }
            QuestionKind::Numeric | QuestionKind::NumericMatrix => {
                let default = kind.default_range().unwrap_or(NumericRange { min: 0.0, max: 10.0 });
                constraints.range = Some(NumericRange::new(
                    self.min_value.unwrap_or(default.min),
                    self.max_value.unwrap_or(default.max),
                ));
                constraints.integer = true;
                constraints.total = self.total.or(kind.default_total());
            }
            QuestionKind::FreeText(_) => {
                constraints.max_length = self.max_length;
            }
            _ => {}
        }

        Ok(Question {
            id: self.id,
            kind,
            prompt: self.prompt,
            options: self.options,
            rows: self.rows,
            constraints,
            page: self.page,
        })
    }
}

// ---------------------------------------------------------------------------
// 答案 → 页面操作
// ---------------------------------------------------------------------------

/// 写入一道题所需的单个页面操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FillAction {
    Click(String),
    Type { selector: String, text: String },
    /// 返回 bool 的脚本，false 表示控件不存在
    Script(String),
}

/// 把答案翻译成页面操作序列
pub(crate) fn fill_actions(question: &Question, answer: &Answer) -> Result<Vec<FillAction>, String> {
    let id = question.id;
    let option = |index: usize| {
        FillAction::Click(format!("#div{} > div.ui-controlgroup > div:nth-child({})", id, index + 1))
    };

    let actions = match (question.kind, &answer.value) {
        (QuestionKind::SingleChoice, AnswerValue::Choice(index)) => vec![option(*index)],
        (QuestionKind::MultiChoice, AnswerValue::Choices(indices)) => {
            indices.iter().map(|index| option(*index)).collect()
        }
        (QuestionKind::Dropdown, AnswerValue::Choice(index)) => vec![FillAction::Script(format!(
            r#"(() => {{
                const sel = document.getElementById('q{id}');
                if (!sel) return false;
                const opts = Array.from(sel.options).filter(o => o.value !== '' && o.value !== '-2');
                const opt = opts[{index}];
                if (!opt) return false;
                sel.value = opt.value;
                sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#
        ))],
        (QuestionKind::FreeText(_), AnswerValue::Text(text)) => vec![FillAction::Type {
            selector: format!("#q{}", id),
            text: text.clone(),
        }],
        (QuestionKind::Numeric, AnswerValue::Number(value)) => vec![FillAction::Type {
            selector: format!("#q{}", id),
            text: value.to_string(),
        }],
        (QuestionKind::Scale, AnswerValue::Number(value)) => {
            let range = question.scale_range();
            let position = (value - range.min).round().max(0.0) as usize + 1;
            vec![FillAction::Click(format!(
                "#div{} .scale-div ul > li:nth-child({})",
                id, position
            ))]
        }
        (QuestionKind::Matrix, AnswerValue::RowChoices(choices)) => choices
            .iter()
            .enumerate()
            .map(|(row, column)| {
                FillAction::Click(format!("#drv{}_{} > td:nth-child({})", id, row + 1, column + 2))
            })
            .collect(),
        (QuestionKind::NumericMatrix, AnswerValue::RowNumbers(values)) => values
            .iter()
            .enumerate()
            .map(|(row, value)| {
                let text = js_string(&value.to_string());
                FillAction::Script(format!(
                    r#"(() => {{
                        const el = document.querySelectorAll('#div{id} input[type=tel]')[{row}];
                        if (!el) return false;
                        el.value = {text};
                        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }})()"#
                ))
            })
            .collect(),
        (QuestionKind::Ranking, AnswerValue::Ranking(order)) => {
            ranking_click_positions(order, question.options.len())
                .into_iter()
                .map(|position| FillAction::Click(format!("#div{} > ul > li:nth-child({})", id, position)))
                .collect()
        }
        (kind, _) => return Err(format!("答案类型与题型 {} 不匹配", kind.name())),
    };
    Ok(actions)
}

/// 计算排序题的点击位置（1 起始）
///
/// 页面上被点击的选项会移到已排序区的末尾，所以每一步都要点目标选项的当前位置。
pub(crate) fn ranking_click_positions(order: &[usize], count: usize) -> Vec<usize> {
    let mut current: Vec<usize> = (0..count).collect();
    let mut positions = Vec::with_capacity(order.len());
    for (step, target) in order.iter().enumerate() {
        let Some(pos) = current.iter().position(|item| item == target) else {
            continue;
        };
        positions.push(pos + 1);
        let item = current.remove(pos);
        current.insert(step.min(current.len()), item);
    }
    positions
}

// ---------------------------------------------------------------------------
// 完成信号判定
// ---------------------------------------------------------------------------

const URL_KEYWORDS: &[&str] = &["complete", "finish", "success", "thank", "完成"];
const TITLE_KEYWORDS: &[&str] = &["完成", "成功", "感谢", "complete", "success", "thank"];
const BODY_KEYWORDS: &[&str] = &["提交成功", "感谢您的参与", "问卷已提交", "thank you", "complete", "success"];

/// 页面状态快照
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CompletionProbe {
    pub url: String,
    pub title: String,
    pub body: String,
    pub success_marker: bool,
    pub error_message: Option<String>,
}

/// 根据页面快照判断提交结果
pub(crate) fn classify_completion(probe: &CompletionProbe, original_url: &str) -> CompletionSignal {
    let url = probe.url.trim();
    if !url.is_empty() && !original_url.is_empty() && url != original_url && url != "about:blank" {
        return CompletionSignal::Completed;
    }

    if let Some(message) = probe.error_message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        return CompletionSignal::Rejected(message.to_string());
    }

    let url = url.to_lowercase();
    let title = probe.title.to_lowercase();
    let body = probe.body.to_lowercase();
    if URL_KEYWORDS.iter().any(|k| url.contains(k))
        || probe.success_marker
        || BODY_KEYWORDS.iter().any(|k| body.contains(k))
        || TITLE_KEYWORDS.iter().any(|k| title.contains(k))
    {
        return CompletionSignal::Completed;
    }

    CompletionSignal::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::TextLength;

    fn raw(code: &str, options: usize) -> RawQuestion {
        RawQuestion {
            id: 3,
            code: code.to_string(),
            page: 1,
            prompt: "题干".to_string(),
            options: (1..=options).map(|i| format!("选项{}", i)).collect(),
            required: true,
            ..RawQuestion::default()
        }
    }

    #[test]
    fn test_raw_multi_choice_bounds() {
        let mut r = raw("4", 5);
        r.min_select = Some(2.0);
        r.max_select = Some(9.0);
        let q = r.into_question().unwrap();
        assert_eq!(q.kind, QuestionKind::MultiChoice);
        assert_eq!(q.constraints.min_selections, 2);
        assert_eq!(q.constraints.max_selections, 5);
        assert_eq!(q.page, 1);
    }

    #[test]
    fn test_raw_numeric_defaults() {
        let q = raw("8", 0).into_question().unwrap();
        assert_eq!(q.constraints.range, Some(NumericRange::new(1.0, 100.0)));
        assert!(q.constraints.integer);

        let mut r = raw("10", 0);
        r.rows = vec!["食品".to_string(), "交通".to_string()];
        let q = r.into_question().unwrap();
        assert_eq!(q.constraints.range, Some(NumericRange::new(0.0, 10.0)));
        assert_eq!(q.constraints.total, Some(10.0));

        let mut r = raw("10", 0);
        r.rows = vec!["食品".to_string(), "交通".to_string()];
        r.max_value = Some(100.0);
        r.total = Some(100.0);
        let q = r.into_question().unwrap();
        assert_eq!(q.constraints.total, Some(100.0));
        assert_eq!(raw("8", 0).into_question().unwrap().constraints.total, None);
    }

    #[test]
    fn test_numeric_matrix_fill_scripts() {
        let mut r = raw("10", 0);
        r.rows = vec!["食品".to_string(), "交通".to_string()];
        let q = r.into_question().unwrap();
        let actions = fill_actions(&q, &Answer::new(3, AnswerValue::RowNumbers(vec![4.0, 6.0]))).unwrap();
        assert_eq!(actions.len(), 2);
        for (row, (action, value)) in actions.iter().zip(["\"4\"", "\"6\""]).enumerate() {
            let FillAction::Script(js) = action else {
                panic!("数字矩阵应使用脚本填写: {:?}", action);
            };
            assert!(js.contains("querySelectorAll('#div3 input[type=tel]')"));
            assert!(js.contains(&format!("[{}];", row)));
            assert!(js.contains(&format!("el.value = {};", value)));
        }
    }

    #[test]
    fn test_raw_unknown_code_is_unsupported() {
        let err = raw("9", 0).into_question().unwrap_err();
        assert_eq!(err, UnsupportedQuestion { id: 3, code: "9".to_string() });
    }

    #[test]
    fn test_raw_form_collects_unsupported() {
        let form = RawForm {
            page_count: 2,
            questions: vec![raw("3", 2), raw("21", 0)],
        }
        .into_form("https://www.wjx.cn/vm/x.aspx");
        assert_eq!(form.questions.len(), 1);
        assert_eq!(form.unsupported.len(), 1);
        assert_eq!(form.page_count, 2);
    }

    #[test]
    fn test_fill_actions_selectors() {
        let q = raw("3", 4).into_question().unwrap();
        let actions = fill_actions(&q, &Answer::new(3, AnswerValue::Choice(2))).unwrap();
        assert_eq!(
            actions,
            vec![FillAction::Click("#div3 > div.ui-controlgroup > div:nth-child(3)".to_string())]
        );

        let mut r = raw("6", 5);
        r.rows = vec!["a".to_string(), "b".to_string()];
        let q = r.into_question().unwrap();
        let actions = fill_actions(&q, &Answer::new(3, AnswerValue::RowChoices(vec![0, 4]))).unwrap();
        assert_eq!(
            actions,
            vec![
                FillAction::Click("#drv3_1 > td:nth-child(2)".to_string()),
                FillAction::Click("#drv3_2 > td:nth-child(6)".to_string()),
            ]
        );

        let q = raw("1", 0).into_question().unwrap();
        assert_eq!(q.kind, QuestionKind::FreeText(TextLength::Short));
        let actions = fill_actions(&q, &Answer::new(3, AnswerValue::Text("你好".to_string()))).unwrap();
        assert_eq!(
            actions,
            vec![FillAction::Type {
                selector: "#q3".to_string(),
                text: "你好".to_string()
            }]
        );

        assert!(fill_actions(&q, &Answer::new(3, AnswerValue::Choice(0))).is_err());
    }

    #[test]
    fn test_scale_click_position() {
        let q = raw("5", 5).into_question().unwrap();
        let actions = fill_actions(&q, &Answer::new(3, AnswerValue::Number(4.0))).unwrap();
        assert_eq!(
            actions,
            vec![FillAction::Click("#div3 .scale-div ul > li:nth-child(4)".to_string())]
        );
    }

    #[test]
    fn test_ranking_click_positions_track_moves() {
        assert_eq!(ranking_click_positions(&[0, 1, 2], 3), vec![1, 2, 3]);
        assert_eq!(ranking_click_positions(&[2, 0, 1], 3), vec![3, 2, 3]);
        assert_eq!(ranking_click_positions(&[3, 2, 1, 0], 4), vec![4, 4, 4, 4]);
    }

    #[test]
    fn test_classify_completion() {
        let original = "https://www.wjx.cn/vm/abc.aspx";
        let mut probe = CompletionProbe {
            url: original.to_string(),
            ..CompletionProbe::default()
        };
        assert_eq!(classify_completion(&probe, original), CompletionSignal::Pending);

        probe.error_message = Some("请选择选项".to_string());
        assert_eq!(
            classify_completion(&probe, original),
            CompletionSignal::Rejected("请选择选项".to_string())
        );

        probe.error_message = None;
        probe.body = "答卷已经提交，感谢您的参与！".to_string();
        assert_eq!(classify_completion(&probe, original), CompletionSignal::Completed);

        let moved = CompletionProbe {
            url: "https://www.wjx.cn/wjx/join/completemobile2.aspx".to_string(),
            ..CompletionProbe::default()
        };
        assert_eq!(classify_completion(&moved, original), CompletionSignal::Completed);
    }
}
