//! `edupilot run` — Run the orchestration loop against the configured model.

use std::path::PathBuf;
use std::sync::Arc;

use edupilot_agent::{OrchestrationRequest, TaskKind, TeachingService};
use edupilot_config::AppConfig;
use edupilot_core::{Attachment, CancelFlag, Provider, RunContext};
use edupilot_memory::{InMemoryStore, LearnerFixture};
use edupilot_providers::OpenAiCompatProvider;
use tracing::info;

use super::parse_date;

pub struct RunArgs {
    pub fixture: PathBuf,
    pub task: String,
    pub message: Option<String>,
    pub attachments: Vec<PathBuf>,
    pub material: Option<String>,
    pub date: Option<String>,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    if !config.has_api_key() {
        return Err("No API key configured. Add api_key to config.toml or set EDUPILOT_API_KEY.".into());
    }

    let task: TaskKind = args.task.parse()?;
    let today = parse_date(args.date.as_deref())?;

    let fixture = LearnerFixture::load(&args.fixture)?;
    let child_id = fixture.child_id().to_string();
    let store = Arc::new(InMemoryStore::new().with_fixture(fixture));

    let mut attachments = Vec::with_capacity(args.attachments.len());
    for path in &args.attachments {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read attachment {}: {e}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        attachments.push(Attachment::text(name, content));
    }

    let mut context = RunContext::new(child_id, today).with_attachments(attachments);
    if let Some(material) = args.material {
        context = context.with_material_type(material);
    }
    let mut request = OrchestrationRequest::new(task, context);
    if let Some(message) = args.message {
        request = request.with_message(message);
    }

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config)?);
    let service = TeachingService::from_config(&config, provider, store);

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let outcome = service.run_orchestration(request, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.is_success() {
        Ok(())
    } else {
        Err(format!("run {}: {}", outcome.status, outcome.error.unwrap_or_default()).into())
    }
}
