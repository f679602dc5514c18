//! cpp-model - command line entry point
//!
//! Analyzes the C++ files named on the command line and prints their
//! models as a JSON array.

use anyhow::{bail, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cpp_model::{AnalyzerConfig, CppAnalyzer, ProjectAnalyzer, TreeSitterFrontEnd};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cpp_model=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AnalyzerConfig::load()?;

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: cpp-model <paths...>");
    }

    info!("Starting cpp-model v{}", env!("CARGO_PKG_VERSION"));
    info!("Language standard: {}", config.cpp_standard);

    let front_end = TreeSitterFrontEnd::new().with_parse_timeout(config.parse_timeout());
    let project = ProjectAnalyzer::new(CppAnalyzer::new(front_end, config));
    let analysis = project.analyze_project(&paths, &[]).await;

    for failure in &analysis.failures {
        error!(path = %failure.path, "{}", failure.error);
    }
    println!("{}", serde_json::to_string_pretty(&analysis.results)?);

    std::process::exit(analysis.exit_code());
}
