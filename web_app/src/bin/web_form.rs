use web_app::{config, start_web_form, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::get_configuration()?;
    telemetry::init_subscriber(&config.log_level);

    start_web_form(config).await?;

    Ok(())
}
