use atayal_webui::{config::Config, handlers::AppState, services::OperationKind};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Starting Atayal WebUI...");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load_or_create_default(&config_path)?;
    config.validate()?;

    println!("Loaded configuration from {}", config_path);
    println!("WebUI address: {}", config.server_address());
    println!("Translation API: {}", config.services.translation_base_url);
    println!("Speech recognition API: {}", config.services.asr_base_url);
    println!("Speech synthesis API: {}", config.services.tts_base_url);
    for kind in OperationKind::ALL {
        let names = config.candidates.names_for(kind).join(" -> ");
        println!("  {} candidates: {}", kind.label(), names);
    }

    let app_state = AppState::new(config.clone())
        .map_err(|e| anyhow::anyhow!("failed to prepare service client: {}", e))?;
    let app = atayal_webui::create_app(app_state);

    let addr: SocketAddr = config
        .server_address()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server address: {}", e))?;

    println!("WebUI listening on http://{}", addr);
    println!("API endpoints:");
    println!("  GET  /                      - main page");
    println!("  GET  /api/sentences         - practice sentences");
    println!("  POST /api/translate         - text translation");
    println!("  POST /api/transcribe        - speech recognition upload");
    println!("  POST /api/score             - pronunciation scoring upload");
    println!("  POST /api/speech            - speech synthesis and playback");
    println!("  POST /api/recording/{{start,chunk,stop,cancel}} - microphone capture");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("WebUI server failed: {}", e))?;

    Ok(())
}
