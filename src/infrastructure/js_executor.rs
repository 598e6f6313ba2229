//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 点击 / 输入"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::BrowserError;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / click() / type_into() 能力
/// - 不认识 Question / Answer
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 导航到指定 URL 并等待加载
    pub async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, BrowserError> {
        let result = self.page.evaluate(js_code.into()).await?;
        result
            .into_value::<JsonValue>()
            .map_err(|e| BrowserError::ScriptFailed {
                message: e.to_string(),
            })
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T, BrowserError> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| BrowserError::ScriptFailed {
            message: format!("脚本返回值格式不符: {}", e),
        })
    }

    /// 点击选择器匹配的第一个元素
    pub async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self.page.find_element(selector).await?;
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    /// 选择器是否存在且可见
    pub async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                return style.display !== 'none' && style.visibility !== 'hidden' && el.offsetParent !== null;
            }})()"#,
            js_string(selector)
        );
        self.eval_as(js).await
    }

    /// 清空输入框后逐字输入
    pub async fn type_into(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let clear = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.value = ''; return true; }})()",
            js_string(selector)
        );
        let found: bool = self.eval_as(clear).await?;
        if !found {
            return Err(BrowserError::ScriptFailed {
                message: format!("未找到输入框 {}", selector),
            });
        }
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    /// 当前页面 URL
    pub async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    /// 关闭页面
    pub async fn close(self) -> Result<(), BrowserError> {
        self.page.close().await?;
        Ok(())
    }
}

/// 把任意文本编码为 JS 字符串字面量
pub fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
