use anyhow::Result;
use html_edit::config::Config;
use html_edit::server::run;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    run(config).await
}
