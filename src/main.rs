use anyhow::Result;
use question_recog::utils::logging;
use question_recog::{App, RecogConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置：指定了 RECOG_CONFIG 则读 TOML 文件，否则取环境变量覆盖的默认值
    let config = match std::env::var("RECOG_CONFIG") {
        Ok(path) => RecogConfig::from_toml_file(&path)?,
        Err(_) => RecogConfig::from_env(),
    };

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
