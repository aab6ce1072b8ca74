use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veritas_rs::config::Settings;
use veritas_rs::server::{run_server, AppState};
use veritas_rs::types::{AnalysisRequest, InputType};

#[derive(Parser)]
#[command(name="veritas", version, about="Fact-check text, web pages and images")]
struct Cli {
  #[command(subcommand)]
  cmd: Cmd,
  #[command(flatten)]
  settings: Settings,
}

#[derive(Subcommand)]
enum Cmd {
  /// Serve the HTTP API
  Serve { #[arg(long, env="HOST", default_value="0.0.0.0")] host: String, #[arg(long, env="PORT", default_value_t=8001)] port: u16 },
  /// Analyze one input and print the report as JSON
  Analyze {
    #[arg(long)] text: Option<String>,
    #[arg(long)] url: Option<String>,
    #[arg(long)] image_file: Option<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let _ = dotenvy::dotenv();
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();
  let engine = cli.settings.engine()?;

  match cli.cmd {
    Cmd::Serve { host, port } => {
      let state = AppState::new(engine, cli.settings.ledger(), cli.settings.rate_limit_max);
      run_server(state, &format!("{host}:{port}")).await?;
    }
    Cmd::Analyze { text, url, image_file } => {
      let request = match (text, url, image_file) {
        (Some(t), _, _) => AnalysisRequest { input_type: InputType::Text, data: t },
        (_, Some(u), _) => AnalysisRequest { input_type: InputType::Url, data: u },
        (_, _, Some(path)) => {
          let bytes = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
          AnalysisRequest { input_type: InputType::Image, data: BASE64.encode(bytes) }
        }
        _ => anyhow::bail!("one of --text, --url or --image-file is required"),
      };
      let report = engine.analyze(&request).await?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
  }
  Ok(())
}
