use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parley_config::{GatewayDef, GatewayMode};
use parley_engine::{ActivityBehavior, Execution, ExecutionStatus, InMemoryProcessEngine, Variables};
use parley_gateway::{Asynchronous, GatewayBuilder, Synchronous};
use parley_message::{
  HandlerError, Message, MessageBuilder, MessageChannel, QueueChannel, ServiceActivator,
};

/// Parley - message gateway for wait-state workflow activities
#[derive(Parser)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one suspend/resume cycle against an echo service
  ///
  /// Process variables are read as a JSON object from stdin. The final
  /// variables of the execution are printed as JSON.
  Run {
    /// Path to the gateway definition (JSON)
    gateway_file: PathBuf,

    /// Activity the execution waits in
    #[arg(long, default_value = "gateway")]
    activity: String,

    /// How long to wait for an asynchronous reply, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
  },

  /// Validate a gateway definition
  Check {
    /// Path to the gateway definition (JSON)
    gateway_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      gateway_file,
      activity,
      timeout_ms,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_cycle(
        gateway_file,
        activity,
        Duration::from_millis(timeout_ms),
      ))?;
    }
    Some(Commands::Check { gateway_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      let def = rt.block_on(load_gateway_def(&gateway_file))?;
      eprintln!(
        "{}: ok ({:?}, {} -> {})",
        gateway_file.display(),
        def.mode,
        def.request_channel,
        def.reply_channel
      );
    }
    None => {
      println!("parley - use --help to see available commands");
    }
  }

  Ok(())
}

async fn load_gateway_def(gateway_file: &Path) -> Result<GatewayDef> {
  let content = tokio::fs::read_to_string(gateway_file)
    .await
    .with_context(|| format!("failed to read gateway file: {}", gateway_file.display()))?;

  GatewayDef::from_json(&content)
    .with_context(|| format!("invalid gateway file: {}", gateway_file.display()))
}

async fn run_cycle(gateway_file: PathBuf, activity: String, wait: Duration) -> Result<()> {
  let def = load_gateway_def(&gateway_file).await?;
  let variables = read_variables_from_stdin()?;

  // Every channel the definition names is an in-process queue.
  let mut channels: HashMap<String, Arc<QueueChannel>> = HashMap::new();
  let names = [Some(&def.request_channel), Some(&def.reply_channel), def.error_channel.as_ref()];
  for name in names.into_iter().flatten() {
    channels
      .entry(name.clone())
      .or_insert_with(|| Arc::new(QueueChannel::new(name.clone())));
  }

  let cancel = CancellationToken::new();
  let service = ServiceActivator::new(channels[&def.request_channel].clone(), echo)
    .spawn(cancel.clone());

  let engine = Arc::new(InMemoryProcessEngine::new());
  let builder = GatewayBuilder::from_def(&def, |name| {
    channels
      .get(name)
      .map(|channel| channel.clone() as Arc<dyn MessageChannel>)
  })
  .context("failed to wire gateway")?
  .engine(engine.clone())
  .cancellation_token(cancel.clone());

  let gateway: Arc<dyn ActivityBehavior> = match def.mode {
    GatewayMode::Synchronous => Arc::new(builder.build::<Synchronous>()?),
    GatewayMode::Asynchronous => Arc::new(builder.build::<Asynchronous>()?),
  };

  let execution_id = uuid::Uuid::new_v4().to_string();
  let execution = Execution::new(
    execution_id.clone(),
    uuid::Uuid::new_v4().to_string(),
    gateway_file.display().to_string(),
    activity,
  )
  .with_variables(variables);

  let outcome = engine
    .run_activity(execution, gateway)
    .await
    .context("gateway activity failed")?;
  info!(execution_id = %execution_id, outcome = ?outcome, "activity_returned");

  let finished = tokio::time::timeout(wait, async {
    loop {
      match engine.status(&execution_id).await {
        Some(ExecutionStatus::Completed | ExecutionStatus::Failed) | None => break,
        _ => tokio::time::sleep(Duration::from_millis(10)).await,
      }
    }
  })
  .await;

  cancel.cancel();
  let _ = service.await;

  if finished.is_err() {
    bail!("no reply for execution {execution_id} within {}ms", wait.as_millis());
  }
  let completed = engine
    .completed(&execution_id)
    .await
    .with_context(|| format!("execution {execution_id} did not complete"))?;

  println!("{}", serde_json::to_string_pretty(completed.variables())?);

  Ok(())
}

/// Stand-in external service: replies with the request's headers and
/// a `handled` marker.
fn echo(request: Message) -> Result<Message, HandlerError> {
  Ok(
    MessageBuilder::from_message(&request)
      .header("parley_handled", true)
      .build(),
  )
}

fn read_variables_from_stdin() -> Result<Variables> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(Variables::new());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read variables from stdin")?;

  if input.trim().is_empty() {
    return Ok(Variables::new());
  }
  match serde_json::from_str(&input).context("failed to parse variables JSON from stdin")? {
    serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
    other => bail!("variables must be a JSON object, got {other}"),
  }
}
