use anyhow::Result;
use clap::Parser;
use survey_autofill::cli::{resolve_config, resolve_input, CliArgs};
use survey_autofill::utils::logging;
use survey_autofill::App;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 解析参数并加载配置
    let args = CliArgs::parse();
    let config = resolve_config(args.config.as_deref())?;
    let input = resolve_input(&args)?;

    // 初始化并运行应用
    let app = App::initialize(config, &input).await?;
    let summary = app.run(&input).await;

    if !summary.reached_target() {
        std::process::exit(1);
    }
    Ok(())
}
