//! `edupilot intent` — Decide today's teaching intent without the model.

use std::path::Path;
use std::sync::Arc;

use edupilot_config::AppConfig;
use edupilot_memory::{ContextAggregator, InMemoryStore, LearnerFixture};
use edupilot_pedagogy::decide_intent;

use super::{caregiver_signal, parse_date};

pub async fn run(
    fixture: &Path,
    date: Option<&str>,
    caregiver_kind: Option<String>,
    caregiver_note: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let today = parse_date(date)?;
    let caregiver = caregiver_signal(caregiver_kind, caregiver_note)?;

    let fixture = LearnerFixture::load(fixture)?;
    let child_id = fixture.child_id().to_string();
    let store = Arc::new(InMemoryStore::new().with_fixture(fixture));
    let aggregator = ContextAggregator::from_config(store, &config.emotion);

    let context = aggregator.get_context(&child_id, today).await;
    let intent = decide_intent(&context, caregiver.as_ref());

    println!("🧒 {} (grade {}), {today}", context.profile.display_name, context.profile.grade_level);
    println!(
        "   Mastery {:.2} · emotion {} · {} days since new material",
        context.mastery_stats.avg_mastery,
        context.emotion_signal,
        context.days_since_last_introduce()
    );
    println!("{}", serde_json::to_string_pretty(&intent)?);
    Ok(())
}
