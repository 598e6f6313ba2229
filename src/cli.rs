//! 命令行输入
//!
//! 参数由 clap 解析，缺少的值在终端里交互询问。

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::config::{scan_config_dir, Config};

/// 配置目录
pub const CONFIG_DIR: &str = "config";

/// 问卷星问卷自动填写
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "survey_autofill", version, about, long_about = None)]
pub struct CliArgs {
    /// 问卷链接
    #[arg(short, long)]
    pub url: Option<String>,

    /// 目标份数
    #[arg(short = 'n', long, value_parser = parse_count_arg)]
    pub target: Option<usize>,

    /// 同时打开的窗口数量
    #[arg(short, long, value_parser = parse_count_arg)]
    pub windows: Option<usize>,

    /// 配置文件路径，未指定时扫描 config/ 目录
    #[arg(short, long, env = "SURVEY_CONFIG")]
    pub config: Option<PathBuf>,
}

fn parse_count_arg(text: &str) -> Result<usize, String> {
    parse_count(text, "取值").map_err(|e| e.to_string())
}

fn parse_count(text: &str, what: &str) -> Result<usize> {
    let value: usize = text
        .trim()
        .parse()
        .with_context(|| format!("{}必须是正整数: {}", what, text))?;
    if value == 0 {
        bail!("{}必须大于 0", what);
    }
    Ok(value)
}

/// 运行输入（全部确定后的值）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInput {
    pub url: String,
    pub target: usize,
    pub windows: usize,
}

/// 没有协议头时补上 https://
pub fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        bail!("问卷链接不能为空");
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Ok(format!("https://{}", url))
    }
}

/// 补齐缺失的运行输入
pub fn resolve_input(args: &CliArgs) -> Result<RunInput> {
    let url = match &args.url {
        Some(url) => normalize_url(url)?,
        None => normalize_url(&prompt("请输入问卷链接: ")?)?,
    };
    let target = match args.target {
        Some(target) => target,
        None => parse_count(&prompt("请输入目标份数: ")?, "目标份数")?,
    };
    let windows = match args.windows {
        Some(windows) => windows,
        None => {
            let answer = prompt("请输入窗口数量 (默认 1): ")?;
            if answer.trim().is_empty() {
                1
            } else {
                parse_count(&answer, "窗口数量")?
            }
        }
    };
    if windows > 5 {
        warn!("⚠️ 窗口数量 {} 较多，可能触发 API 频率限制", windows);
    }
    Ok(RunInput { url, target, windows })
}

/// 加载配置：命令行 / SURVEY_CONFIG 指定的文件，否则扫描配置目录
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => {
            info!("📋 使用配置文件: {}", path.display());
            Config::load(&path)?
        }
        None => {
            let mut candidates = scan_config_dir(Path::new(CONFIG_DIR))?;
            if candidates.len() == 1 {
                let candidate = candidates.remove(0);
                info!(
                    "📋 使用配置文件: {} (模型: {})",
                    candidate.path.display(),
                    candidate.model
                );
                candidate.config
            } else {
                println!("发现多个配置文件：");
                for (i, candidate) in candidates.iter().enumerate() {
                    println!("  {}. {} (模型: {})", i + 1, candidate.path.display(), candidate.model);
                }
                let choice = parse_count(&prompt("请选择配置编号: ")?, "配置编号")?;
                if choice > candidates.len() {
                    bail!("配置编号 {} 超出范围 1-{}", choice, candidates.len());
                }
                candidates.swap_remove(choice - 1).config
            }
        }
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        bail!("输入已结束");
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(list: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("survey_autofill").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_all_flags() {
        let parsed = parse(&[
            "--url",
            "www.wjx.cn/vm/abc.aspx",
            "--target=10",
            "-w",
            "3",
            "--config",
            "config/deepseek.toml",
        ])
        .unwrap();
        assert_eq!(parsed.url.as_deref(), Some("www.wjx.cn/vm/abc.aspx"));
        assert_eq!(parsed.target, Some(10));
        assert_eq!(parsed.windows, Some(3));
        assert_eq!(parsed.config, Some(PathBuf::from("config/deepseek.toml")));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(parse(&["--target", "0"]).is_err());
        assert!(parse(&["--windows", "abc"]).is_err());
        assert!(parse(&["--url"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url(" www.wjx.cn/vm/a.aspx ").unwrap(), "https://www.wjx.cn/vm/a.aspx");
        assert_eq!(normalize_url("http://x.cn").unwrap(), "http://x.cn");
        assert!(normalize_url("  ").is_err());
    }

    #[test]
    fn test_resolve_input_without_prompt() {
        let input = resolve_input(&CliArgs {
            url: Some("wjx.cn/vm/x.aspx".to_string()),
            target: Some(2),
            windows: Some(1),
            config: None,
        })
        .unwrap();
        assert_eq!(input.url, "https://wjx.cn/vm/x.aspx");
        assert_eq!(input.target, 2);
    }
}
