use anyhow::Result;
use exam_coach::utils::logging;
use exam_coach::{App, CliArgs, Config};
use std::path::Path;

const CONFIG_FILE: &str = "exam_coach.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load(Some(Path::new(CONFIG_FILE)))?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let args = CliArgs::parse(std::env::args().skip(1))?;

    // 初始化并运行应用
    App::initialize(config).await?.run(&args).await?;

    Ok(())
}
