use gamelink_http::{resolve_endpoint, GameSession, RequestOrchestrator, RetryPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gamelink_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let discovered = std::env::var("GAMELINK_SERVER_ADDRESS").unwrap_or_default();
    let master = std::env::var("GAMELINK_ENDPOINT").unwrap_or_default();
    let endpoint = resolve_endpoint(&discovered, 7000, &master)
        .ok_or_else(|| anyhow::anyhow!("no usable server endpoint"))?;

    let policy = RetryPolicy::from_env().map_err(anyhow::Error::msg)?;
    let mut orchestrator = RequestOrchestrator::http().with_policy(policy);
    orchestrator.initialize(endpoint);
    let mut session = GameSession::new(orchestrator);

    if !session.connect().await {
        anyhow::bail!("server did not answer");
    }

    let id = session.generate_id().await;
    println!("user id: {id}");
    println!("set name: {}", session.set_name(&id, "Kit").await);
    println!("set score: {}", session.set_score(&id, 120).await);
    println!("score: {}", session.get_score(&id).await);
    println!("closed: {}", session.close(&id, false).await);

    Ok(())
}
