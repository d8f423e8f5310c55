use quickbite::{app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    quickbite::init_tracing("quickbite=debug,axum=info,tower_http=info");

    let app_state = AppState::init().await?;
    app::serve(app::build_app(app_state)).await
}
