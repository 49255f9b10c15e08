use anyhow::Result;
use course_vault::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load()?;
    course_vault::run(config).await
}
