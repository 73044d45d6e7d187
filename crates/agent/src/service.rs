//! The teaching-decision service: one object wiring the aggregator, the
//! schedule resolver, the tool catalog and the orchestrator.

use std::sync::Arc;

use chrono::NaiveDate;
use edupilot_config::AppConfig;
use edupilot_core::{
    CancelFlag, CaregiverSignal, ContentGenerator, EventBus, LearnerStore, LearningPeriod, Provider,
    TeachingIntent,
};
use edupilot_memory::ContextAggregator;
use edupilot_pedagogy::{ScheduleResolution, ScheduleResolver, decide_intent};
use edupilot_providers::{LlmContentGenerator, RetryingProvider};
use edupilot_tools::{ToolDeps, default_registry};
use tracing::{debug, info};

use crate::orchestrator::Orchestrator;
use crate::run::{OrchestrationOutcome, OrchestrationRequest};

pub struct TeachingService {
    aggregator: Arc<ContextAggregator>,
    resolver: Arc<ScheduleResolver>,
    orchestrator: Orchestrator,
    events: Arc<EventBus>,
}

impl TeachingService {
    /// Build the service from configuration. Model calls from the loop and
    /// from content generation both go through a retrying wrapper.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>, store: Arc<dyn LearnerStore>) -> Self {
        let provider: Arc<dyn Provider> =
            Arc::new(RetryingProvider::from_config(provider, &config.orchestration));
        let generator = Arc::new(LlmContentGenerator::from_config(provider.clone(), config));
        Self::with_generator(config, provider, store, generator)
    }

    /// Build the service with a custom content generator.
    pub fn with_generator(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        store: Arc<dyn LearnerStore>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        let events = Arc::new(EventBus::default());
        let aggregator = Arc::new(ContextAggregator::from_config(store, &config.emotion));
        let resolver = Arc::new(ScheduleResolver::from_config(&config.schedule));

        let deps = ToolDeps::new(aggregator.clone(), resolver.clone(), generator)
            .configured(config)
            .with_events(events.clone());
        let tools = Arc::new(default_registry(deps));
        debug!(tools = tools.len(), provider = provider.name(), "Tool catalog ready");

        let orchestrator = Orchestrator::new(
            provider,
            tools,
            aggregator.clone(),
            resolver.clone(),
            config.default_model.clone(),
        )
        .configured(config)
        .with_events(events.clone());

        Self {
            aggregator,
            resolver,
            orchestrator,
            events,
        }
    }

    /// Decide today's teaching intent without running the model.
    pub async fn decide_intent(
        &self,
        child_id: &str,
        today: NaiveDate,
        caregiver: Option<CaregiverSignal>,
    ) -> TeachingIntent {
        let context = self.aggregator.get_context(child_id, today).await;
        let intent = decide_intent(&context, caregiver.as_ref());
        info!(
            child_id,
            intent = %intent.intent_type,
            emotion = %context.emotion_signal,
            "Teaching intent decided"
        );
        intent
    }

    pub async fn run_orchestration(
        &self,
        request: OrchestrationRequest,
        cancel: &CancelFlag,
    ) -> OrchestrationOutcome {
        self.orchestrator.run(request, cancel).await
    }

    pub fn resolve_schedule(
        &self,
        period: LearningPeriod,
        date: NaiveDate,
        material: Option<&str>,
    ) -> ScheduleResolution {
        self.resolver.resolve_schedule(period, date, material)
    }

    pub fn aggregator(&self) -> &Arc<ContextAggregator> {
        &self.aggregator
    }

    /// Subscribe to model, tool, memory and run events.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}
