//! Promptbench HTTP server entrypoint.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use promptbench::config::Config;
use promptbench::gateway::{HandlerState, create_router_with_state};
use promptbench::model::NewTestCase;
use promptbench::orchestrator::Orchestrator;
use promptbench::processor::RetrySettings;
use promptbench::provider::{HuggingFaceEmbeddingProvider, OpenAiCompletionProvider};
use promptbench::store::{
    MemoryPromptStore, MemoryResultStore, MemoryTestCaseStore, PromptStore, TestCaseStore,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!(
        r#"
██████╗ ██████╗  ██████╗ ███╗   ███╗██████╗ ████████╗██████╗ ███████╗███╗   ██╗ ██████╗██╗  ██╗
██╔══██╗██╔══██╗██╔═══██╗████╗ ████║██╔══██╗╚══██╔══╝██╔══██╗██╔════╝████╗  ██║██╔════╝██║  ██║
██████╔╝██████╔╝██║   ██║██╔████╔██║██████╔╝   ██║   ██████╔╝█████╗  ██╔██╗ ██║██║     ███████║
██╔═══╝ ██╔══██╗██║   ██║██║╚██╔╝██║██╔═══╝    ██║   ██╔══██╗██╔══╝  ██║╚██╗██║██║     ██╔══██║
██║     ██║  ██║╚██████╔╝██║ ╚═╝ ██║██║        ██║   ██████╔╝███████╗██║ ╚████║╚██████╗██║  ██║
╚═╝     ╚═╝  ╚═╝ ╚═════╝ ╚═╝     ╚═╝╚═╝        ╚═╝   ╚═════╝ ╚══════╝╚═╝  ╚═══╝ ╚═════╝╚═╝  ╚═╝

        DISPATCH. SCORE. COMPARE.
"#
    );

    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        llm_model = %config.llm_model,
        embeddings_model = %config.embeddings_model,
        "Promptbench starting"
    );

    // validate() guarantees both credentials are present.
    let openai_api_key = config.openai_api_key.clone().unwrap_or_default();
    let hf_api_token = config.huggingface_api_token.clone().unwrap_or_default();

    let completion = Arc::new(OpenAiCompletionProvider::new(&openai_api_key));
    let embedding = Arc::new(HuggingFaceEmbeddingProvider::with_base_url(
        &hf_api_token,
        &config.hf_base_url,
    ));

    let prompts = Arc::new(MemoryPromptStore::new());
    let test_cases = Arc::new(MemoryTestCaseStore::new());
    let results = Arc::new(MemoryResultStore::new());

    if let Some(path) = &config.seed_path {
        seed_stores(path, prompts.as_ref(), test_cases.as_ref()).await?;
    }

    let orchestrator = Arc::new(
        Orchestrator::new(
            prompts,
            test_cases,
            results.clone(),
            completion,
            embedding,
            config.batch_config(),
        )
        .with_retry_settings(RetrySettings {
            max_attempts: config.retry_max_attempts,
            wait: Duration::from_secs(config.retry_wait_secs),
        }),
    );

    let state = HandlerState::new(orchestrator, results);
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Promptbench shutdown complete");
    Ok(())
}

/// Startup seed data: prompt templates and the test case suite.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedFile {
    #[serde(default)]
    prompts: Vec<String>,
    #[serde(default)]
    test_cases: Vec<NewTestCase>,
}

async fn seed_stores(
    path: &Path,
    prompts: &MemoryPromptStore,
    test_cases: &MemoryTestCaseStore,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_json::from_str(&raw)?;

    let prompt_count = seed.prompts.len();
    let case_count = seed.test_cases.len();
    for prompt in seed.prompts {
        prompts.add(&prompt).await?;
    }
    for case in seed.test_cases {
        test_cases.add(case).await?;
    }

    tracing::info!(
        path = %path.display(),
        prompts = prompt_count,
        test_cases = case_count,
        "Seeded stores"
    );
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("PROMPTBENCH_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
