mod settings;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use runview_channel::{MemoryRunChannel, RunChannel, WsRunChannel};
use runview_config::FlowVersion;
use runview_panel::{PanelConfig, PanelRenderer, PanelView, RunDetailsPanel};
use runview_run::{FlowRun, RunStatus};
use runview_state::RunStateStore;
use runview_store::{
  FetchError, FlagSource, HttpFlagSource, HttpRunSource, MemoryRunSource, RunSource,
  StaticFlagSource,
};

use crate::settings::Settings;

/// Runview - follow a flow run and show what each step produced
#[derive(Parser)]
#[command(name = "runview")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.runview)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Watch a run and print every panel view as JSON
  Watch {
    /// Run id to fetch from the API, or path to a run JSON file
    #[arg(long)]
    run: String,

    /// Path to the flow version JSON file
    #[arg(long)]
    flow_version: PathBuf,

    /// Step whose output to show
    #[arg(long)]
    step: Option<String>,

    /// Iteration to show for a loop step, as `name=index`
    #[arg(long = "loop", value_parser = parse_loop_index)]
    loops: Vec<(String, usize)>,

    /// Days execution logs are retained, overriding settings and flags
    #[arg(long)]
    retention_days: Option<u32>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  let data_dir = match cli.data_dir {
    Some(data_dir) => data_dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".runview"),
  };
  let settings = Settings::load(&data_dir).context("failed to load settings")?;

  match cli.command {
    Some(Commands::Watch {
      run,
      flow_version,
      step,
      loops,
      retention_days,
    }) => {
      let request = WatchRequest {
        run,
        flow_version,
        step,
        loops,
        retention_days,
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { watch(request, settings).await })?;
    }
    None => {
      println!("runview - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  // Views go to stdout, logs to stderr.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .with_writer(std::io::stderr)
    .init();
}

fn parse_loop_index(value: &str) -> Result<(String, usize), String> {
  let (name, index) = value
    .split_once('=')
    .ok_or_else(|| format!("expected name=index, got '{value}'"))?;
  if name.is_empty() {
    return Err(format!("missing loop step name in '{value}'"));
  }
  let index = index
    .parse()
    .map_err(|_| format!("invalid iteration index '{index}'"))?;
  Ok((name.to_string(), index))
}

struct WatchRequest {
  run: String,
  flow_version: PathBuf,
  step: Option<String>,
  loops: Vec<(String, usize)>,
  retention_days: Option<u32>,
}

/// Prints each view as one JSON line.
struct JsonRenderer<W> {
  out: W,
}

impl<W: Write + Send> PanelRenderer for JsonRenderer<W> {
  fn render(&mut self, view: &PanelView) {
    let written = serde_json::to_writer(&mut self.out, view)
      .map_err(std::io::Error::from)
      .and_then(|_| writeln!(self.out))
      .and_then(|_| self.out.flush());
    if let Err(e) = written {
      warn!(error = %e, "failed to write view");
    }
  }
}

async fn watch(request: WatchRequest, settings: Settings) -> Result<()> {
  let flow_version: FlowVersion = read_json(&request.flow_version).await?;
  flow_version
    .validate()
    .with_context(|| format!("invalid flow version: {}", request.flow_version.display()))?;

  let (run, source) = load_run(&request.run, &settings).await?;
  info!(run_id = %run.id, flow_version_id = %flow_version.flow_version_id, "watching run");

  let channel: Arc<dyn RunChannel> = match &settings.socket_url {
    Some(url) => Arc::new(WsRunChannel::new(url.clone())),
    None => Arc::new(MemoryRunChannel::new()),
  };

  let retention_days = match request.retention_days.or(settings.retention_days) {
    Some(days) => Some(days),
    None => {
      let flags: Box<dyn FlagSource> = match settings.http_config() {
        Some(config) => Box::new(HttpFlagSource::new(&config)?),
        None => Box::new(StaticFlagSource::default()),
      };
      flags.retention_days().await.unwrap_or_else(|e| {
        warn!(error = %e, "failed to read retention days");
        None
      })
    }
  };

  let panel = mount_panel(
    flow_version,
    run,
    source,
    channel,
    &request,
    PanelConfig { retention_days },
  )?;
  let mut views = panel.views();
  let mut renderer = JsonRenderer {
    out: std::io::stdout(),
  };

  loop {
    let view = tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      view = views.next() => view,
    };
    let Some(view) = view else {
      break;
    };
    renderer.render(&view);

    if is_final_view(&view) {
      break;
    }
  }

  panel.unmount();
  Ok(())
}

/// Build the store for `run` and mount the panel on it.
fn mount_panel(
  flow_version: FlowVersion,
  run: FlowRun,
  source: Arc<dyn RunSource>,
  channel: Arc<dyn RunChannel>,
  request: &WatchRequest,
  config: PanelConfig,
) -> Result<RunDetailsPanel> {
  let store = Arc::new(RunStateStore::with_run(flow_version, run));
  if let Some(step) = &request.step {
    store.select_step(Some(step.clone()));
  }
  for (loop_name, index) in &request.loops {
    store.set_loop_index(loop_name, *index)?;
  }
  Ok(RunDetailsPanel::mount(store, source, channel, config))
}

/// Whether `view` shows a run that will not change anymore.
fn is_final_view(view: &PanelView) -> bool {
  view.status().is_some_and(RunStatus::is_terminal)
}

/// Load the run to watch: a JSON file when `run` is a path, otherwise a run
/// id fetched from the API.
async fn load_run(run: &str, settings: &Settings) -> Result<(FlowRun, Arc<dyn RunSource>)> {
  let path = Path::new(run);
  if path.is_file() {
    let run: FlowRun = read_json(path).await?;
    let source = MemoryRunSource::new();
    source.insert(run.clone()).await;
    return Ok((run, Arc::new(source)));
  }

  let Some(config) = settings.http_config() else {
    bail!("'{run}' is not a file and no api_url is configured");
  };
  let source = HttpRunSource::new(&config).context("failed to create run source")?;
  let run = fetch_initial_run(run, &source).await?;
  Ok((run, Arc::new(source)))
}

async fn fetch_initial_run(run_id: &str, source: &dyn RunSource) -> Result<FlowRun> {
  match source.fetch_populated_run(run_id).await {
    Ok(run) => Ok(run),
    Err(FetchError::NotFound(_)) => bail!("run '{run_id}' does not exist"),
    Err(e) => Err(e).with_context(|| format!("failed to fetch run '{run_id}'")),
  }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read file: {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("failed to parse file: {}", path.display()))
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use runview_run::{RunEnvironment, StepExecution, StepStatus};
  use serde_json::json;

  use super::*;

  fn flow() -> FlowVersion {
    serde_json::from_value(json!({
      "flow_version_id": "fv-1",
      "flow_id": "flow-1",
      "display_name": "Flow",
      "trigger": {"name": "trigger", "display_name": "Trigger", "kind": "empty"},
      "steps": [{"name": "step_1", "display_name": "Step 1", "type": "code"}]
    }))
    .unwrap()
  }

  fn watch_request() -> WatchRequest {
    WatchRequest {
      run: "run-9".to_string(),
      flow_version: PathBuf::from("flow.json"),
      step: Some("step_1".to_string()),
      loops: Vec::new(),
      retention_days: None,
    }
  }

  fn stored_run(status: RunStatus) -> FlowRun {
    let mut run = FlowRun::new("run-9", "flow-1", "fv-1", RunEnvironment::Testing);
    run.status = status;
    run.steps.insert(
      "step_1".to_string(),
      StepExecution::new(runview_config::StepType::Code, StepStatus::Succeeded)
        .with_output(json!("done")),
    );
    run
  }

  #[tokio::test]
  async fn test_fetched_run_is_sent_for_continuation() {
    let source = Arc::new(MemoryRunSource::new());
    source.insert(stored_run(RunStatus::Running)).await;
    let channel = Arc::new(MemoryRunChannel::new());

    let run = fetch_initial_run("run-9", source.as_ref()).await.unwrap();
    let panel = mount_panel(
      flow(),
      run,
      source.clone(),
      channel.clone(),
      &watch_request(),
      PanelConfig::default(),
    )
    .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
      while channel.requests().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
      }
    })
    .await
    .expect("channel was not opened");

    let requests = channel.requests();
    assert_eq!(requests[0].0.flow_version_id, "fv-1");
    assert_eq!(requests[0].1, Some(stored_run(RunStatus::Running)));

    let view = panel.view();
    let details = view.details().unwrap();
    assert!(!details.can_return_to_runs);
    assert_eq!(
      details.selected_output.as_ref().unwrap().output,
      Some(json!("done"))
    );

    panel.unmount();
  }

  #[tokio::test]
  async fn test_missing_run_ends_command() {
    let source = MemoryRunSource::new();
    let err = fetch_initial_run("run-9", &source).await.unwrap_err();
    assert!(err.to_string().contains("does not exist"));
  }

  #[test]
  fn test_final_view_follows_rendered_status() {
    let mut state = runview_state::BuilderState::new(flow());
    state.run = Some(stored_run(RunStatus::Running));
    assert!(!is_final_view(&PanelView::compute(&state, Some(30))));

    state.run = Some(stored_run(RunStatus::Succeeded));
    assert!(is_final_view(&PanelView::compute(&state, Some(30))));

    // Paused without logs shows a message but is not finished.
    state.run = Some(stored_run(RunStatus::Paused));
    let view = PanelView::compute(&state, Some(30));
    assert!(view.message().is_some());
    assert!(!is_final_view(&view));

    state.run = None;
    assert!(!is_final_view(&PanelView::compute(&state, None)));
  }

  #[test]
  fn test_parse_loop_index() {
    assert_eq!(parse_loop_index("each=2"), Ok(("each".to_string(), 2)));
    assert!(parse_loop_index("each").is_err());
    assert!(parse_loop_index("=1").is_err());
    assert!(parse_loop_index("each=-1").is_err());
  }

  #[test]
  fn test_cli_parses_watch() {
    let cli = Cli::try_parse_from([
      "runview",
      "watch",
      "--run",
      "run-1",
      "--flow-version",
      "flow.json",
      "--loop",
      "each=1",
      "--loop",
      "inner=0",
    ])
    .unwrap();

    let Some(Commands::Watch { run, loops, .. }) = cli.command else {
      panic!("expected watch command");
    };
    assert_eq!(run, "run-1");
    assert_eq!(
      loops,
      vec![("each".to_string(), 1), ("inner".to_string(), 0)]
    );
  }

  #[test]
  fn test_json_renderer_writes_lines() {
    let store = RunStateStore::new(serde_json::from_value(serde_json::json!({
      "flow_version_id": "fv-1",
      "flow_id": "flow-1",
      "display_name": "Flow",
      "trigger": {"name": "trigger", "display_name": "Trigger", "kind": "empty"},
      "steps": []
    }))
    .unwrap());
    let view = store.read(|state| PanelView::compute(state, None));

    let mut renderer = JsonRenderer { out: Vec::new() };
    renderer.render(&view);
    renderer.render(&view);

    let out = String::from_utf8(renderer.out).unwrap();
    assert_eq!(out.lines().count(), 2);
    assert!(out.starts_with(r#"{"view":"details""#));
  }
}
