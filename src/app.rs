//! 应用入口 - 负责把配置、LLM 服务、浏览器工厂和协调器组装起来

use std::sync::Arc;

use tracing::{error, info};

use crate::browser::{ChromiumSessionFactory, SessionFactory};
use crate::cli::RunInput;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::orchestrator::{Coordinator, RunPlan, RunSummary};
use crate::services::LlmService;
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    llm: Arc<LlmService>,
    factory: Arc<dyn SessionFactory>,
}

impl App {
    /// 初始化应用：写日志头、测试 API 连接
    ///
    /// API 不可用时直接返回错误，不会启动任何浏览器。
    pub async fn initialize(config: Config, input: &RunInput) -> AppResult<Self> {
        init_log_file(&config.run.output_log_file).map_err(|e| AppError::Other(e.to_string()))?;
        log_startup(&input.url, input.target, input.windows, &config.openai.model);

        let llm = Arc::new(LlmService::from_config(&config));
        if let Err(e) = llm.probe().await {
            error!("❌ API连接测试失败: {}", e);
            return Err(e.into());
        }

        let factory: Arc<dyn SessionFactory> = Arc::new(ChromiumSessionFactory::new(config.browser.clone()));
        Ok(Self::with_parts(config, llm, factory))
    }

    /// 使用现成的组件创建（测试中替换浏览器和 LLM 后端）
    pub fn with_parts(config: Config, llm: Arc<LlmService>, factory: Arc<dyn SessionFactory>) -> Self {
        Self { config, llm, factory }
    }

    /// 运行直到达到目标或停止，输出统计
    pub async fn run(&self, input: &RunInput) -> RunSummary {
        let coordinator = Coordinator::new(&self.config, self.llm.clone(), self.factory.clone());
        let summary = coordinator
            .run(RunPlan {
                survey_url: input.url.clone(),
                target: input.target,
                windows: input.windows,
                max_failures: self.config.run.max_failures,
            })
            .await;

        print_final_stats(&summary, &self.config.run.output_log_file);
        if summary.reached_target() {
            info!("🎉 已完成全部 {} 份", summary.target);
        }
        summary
    }
}
