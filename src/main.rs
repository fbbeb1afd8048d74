/// Writing Registry - lookup service binary
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use writing_registry::{config::ServerConfig, server, AppContext, RegistryResult};

#[tokio::main]
async fn main() -> RegistryResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| "writing_registry=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Print banner
    print_banner();

    // Create application context
    let ctx = AppContext::new(config)?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
 _       __     _ __  _                ____             _      __
| |     / /____(_) /_(_)___  ____ _   / __ \___  ____ _(_)____/ /________  __
| | /| / / ___/ / __/ / __ \/ __ `/  / /_/ / _ \/ __ `/ / ___/ __/ ___/ / / /
| |/ |/ / /  / / /_/ / / / / /_/ /  / _, _/  __/ /_/ / (__  ) /_/ /  / /_/ /
|__/|__/_/  /_/\__/_/_/ /_/\__, /  /_/ |_|\___/\__, /_/____/\__/_/   \__, /
                          /____/              /____/                /____/

        Content lookup service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
