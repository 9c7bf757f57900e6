use std::process::ExitCode;

use chat_probe_core::{
    ConsoleObserver, DiagnosticPlan, ProbeConfig, ProbeError, ReqwestTransport, SingleExchangeClient,
    StreamingEngine,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            tracing::warn!(failures, "diagnostic run finished with failures");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "diagnostic run could not start");
            eprintln!("chat-probe: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<usize, ProbeError> {
    let config = ProbeConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "starting diagnostic run");

    let transport = ReqwestTransport::new()?;
    let single = SingleExchangeClient::new(transport.clone())
        .with_encoding(config.encoding)
        .with_timeout(config.request_timeout);
    let mut engine = StreamingEngine::new(transport, config.policy()?).with_encoding(config.encoding);
    let plan = DiagnosticPlan::from_config(&config)?;

    let summary = plan.run(&single, &mut engine, &mut ConsoleObserver).await;
    Ok(summary.failures())
}
