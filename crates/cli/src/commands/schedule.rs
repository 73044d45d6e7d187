//! `edupilot schedule` — Resolve the effective mode for a date.

use edupilot_config::AppConfig;
use edupilot_core::LearningPeriod;
use edupilot_pedagogy::ScheduleResolver;

use super::parse_date;

pub async fn run(
    period: &str,
    date: Option<&str>,
    material: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let period: LearningPeriod = period.parse()?;
    let date = parse_date(date)?;

    let resolver = ScheduleResolver::from_config(&config.schedule);
    let resolution = resolver.resolve_schedule(period, date, material);

    println!("📅 {date} ({period}) → {}", resolution.effective_mode);
    let (low, high) = resolution.effective_mode.question_range();
    println!("   Question range: {low}–{high}");
    match &resolution.learning_decision {
        Some(decision) => println!("{}", serde_json::to_string_pretty(decision)?),
        None if material.is_some() => println!("   Unknown material type; no decision"),
        None => {}
    }
    Ok(())
}
