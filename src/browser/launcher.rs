//! 浏览器启动与连接
//!
//! 每个窗口独占一个浏览器；配置了调试端口时改为连接已运行的浏览器。

use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::config::BrowserParams;
use crate::error::BrowserError;

/// 已启动（或已连接）的浏览器及其 CDP 事件处理任务
pub struct LaunchedBrowser {
    pub browser: Browser,
    pub handler: JoinHandle<()>,
    /// 是否由本进程启动（连接来的浏览器退出时不关闭）
    pub owned: bool,
}

/// 按配置为指定窗口获取浏览器
pub async fn acquire_browser(params: &BrowserParams, worker_id: usize) -> Result<LaunchedBrowser, BrowserError> {
    match params.debug_port {
        Some(port) => connect_browser(port).await,
        None => launch_browser(params, worker_id).await,
    }
}

/// 启动新的浏览器实例
pub async fn launch_browser(params: &BrowserParams, worker_id: usize) -> Result<LaunchedBrowser, BrowserError> {
    info!("🚀 [窗口 {}] 启动浏览器...", worker_id);

    let mut builder = BrowserConfig::builder();
    builder = if params.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    builder = builder
        .no_sandbox()
        .arg("disable-gpu")
        .arg("disable-dev-shm-usage")
        .window_size(params.window_width, params.window_height)
        .viewport(Viewport {
            width: params.window_width,
            height: params.window_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        })
        // 多个浏览器不能共用同一个用户目录
        .user_data_dir(
            std::env::temp_dir().join(format!("survey_autofill-{}-{}", std::process::id(), worker_id)),
        );

    if let Some(path) = &params.chrome_executable {
        builder = builder.chrome_executable(path);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::LaunchFailed { message: e }
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed {
            message: e.to_string(),
        }
    })?;
    debug!("[窗口 {}] 浏览器启动成功", worker_id);

    // 在后台处理浏览器事件
    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    Ok(LaunchedBrowser {
        browser,
        handler,
        owned: true,
    })
}

/// 连接到已开启远程调试的浏览器
pub async fn connect_browser(port: u16) -> Result<LaunchedBrowser, BrowserError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            message: e.to_string(),
        }
    })?;
    debug!("浏览器连接成功");

    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(Duration::from_millis(300)).await;

    Ok(LaunchedBrowser {
        browser,
        handler,
        owned: false,
    })
}

impl LaunchedBrowser {
    /// 关闭浏览器并结束事件处理任务
    pub async fn shutdown(mut self) -> Result<(), BrowserError> {
        if self.owned {
            let closed = self.browser.close().await;
            if let Err(e) = self.browser.wait().await {
                debug!("等待浏览器进程退出失败: {}", e);
            }
            self.handler.abort();
            closed?;
        } else {
            self.handler.abort();
        }
        Ok(())
    }
}
