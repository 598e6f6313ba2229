/// 日志工具模块
///
/// 提供日志初始化、运行日志文件和统计输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::orchestrator::RunSummary;

/// 初始化 tracing 日志，默认 info 级别，可通过 RUST_LOG 覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n问卷填写日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 追加一行到运行日志文件
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(url: &str, target: usize, windows: usize, model: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 问卷自动填写启动 - 每份都会生成新的人设");
    info!("🔗 问卷链接: {}", url);
    info!("🎯 目标份数: {}", target);
    info!("🪟 窗口数量: {}", windows);
    info!("🤖 使用模型: {}", model);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息，并写入运行日志文件
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.completed, summary.target);
    info!("❌ 失败: {}", summary.failed);
    info!("⏱️ 超时: {}", summary.timed_out);
    info!("🕒 总耗时: {:.1} 秒", summary.elapsed.as_secs_f64());
    info!(
        "🤖 LLM 调用: {} 次 (重试 {} 次, 失败 {} 次)",
        summary.llm.calls, summary.llm.retries, summary.llm.failures
    );
    if let Some(reason) = &summary.stop_reason {
        info!("🛑 停止原因: {}", reason);
    }
    info!("{}", "=".repeat(60));

    let line = format!(
        "完成 {}/{} | 失败 {} | 超时 {} | 耗时 {:.1}s | 停止原因: {}",
        summary.completed,
        summary.target,
        summary.failed,
        summary.timed_out,
        summary.elapsed.as_secs_f64(),
        summary
            .stop_reason
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    if let Err(e) = append_log_line(log_file_path, &line) {
        tracing::warn!("写入运行日志失败: {}", e);
    } else {
        info!("\n日志已保存至: {}", log_file_path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
