use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden_app::bootstrap;
use warden_app::cli::{self, AuthorizerMode};
use warden_infra::RequestGate;
use warden_runtime::{load_config, WardenConfig, WorkflowResponse};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args(std::env::args().skip(1))?;

    let config = match cli::config_path(&args) {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            info!("No config file, using defaults");
            let mut config = WardenConfig::default();
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
    };

    let services = bootstrap::build(&config, args.authorizer)?;

    if args.authorizer == AuthorizerMode::Pdp {
        let gate = RequestGate {
            user: json!({"role": args.user_role}),
            intent: args.question.clone(),
            contains_sensitive: false,
        };
        if let warden_tools::AuthDecision::Deny { reason, detail } =
            services.pdp.evaluate_request(&gate).await
        {
            warn!("Request gate denied ({}): {}", reason, detail);
            let response = json!({
                "status": "blocked",
                "blocked": true,
                "reason": reason.as_str(),
                "error": detail,
                "scenario": args.scenario.as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }
    }

    let result = services
        .orchestrator
        .orchestrate(&args.question, args.scenario, &args.user_role)
        .await;
    let response = WorkflowResponse::from_result(&result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
