use crate::cli::Context;
use crate::commands::render_report;
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Args;
use hpi_engine::error::AppError;
use hpi_engine::scoring::{
    AuxiliaryMetric, MetricRegistry, MetricsHistory, RawAnswerSet, Recommendation, RecommendationError,
    RecommendationRequest, Recommender, ScoreBand, TrendDelta,
};
use std::io::Write;

const DEFAULT_WEEKS: usize = 4;
const FOCUS_LIMIT: usize = 3;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of weekly assessments to simulate (defaults to 4)
    #[arg(long)]
    pub(crate) weeks: Option<usize>,
    /// Time of the first assessment (RFC 3339 or YYYY-MM-DD). Defaults to 2024-01-07.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) start: Option<DateTime<Utc>>,
    /// Skip the recommendation portion of the demo
    #[arg(long)]
    pub(crate) skip_recommendation: bool,
}

pub(crate) fn run_demo(context: &Context, args: DemoArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let DemoArgs {
        weeks,
        start,
        skip_recommendation,
    } = args;
    let weeks = weeks.unwrap_or(DEFAULT_WEEKS).max(1);
    let start = start.unwrap_or_else(default_start);
    let engine = &context.engine;

    writeln!(out, "=== HPI demo: {weeks} weekly assessments ===")?;

    let mut history = MetricsHistory::new();
    for week in 0..weeks - 1 {
        let taken_at = start + Duration::weeks(week as i64);
        let scorecard = engine.score(&synthetic_answers(engine.registry(), week))?;
        writeln!(
            out,
            "Week {} ({}): HPI {:.1} {}",
            week + 1,
            taken_at.format("%Y-%m-%d"),
            scorecard.composite.value,
            scorecard.composite.band().marker()
        )?;
        history.push(scorecard.snapshot(taken_at))?;
    }

    let last_week = weeks - 1;
    let taken_at = start + Duration::weeks(last_week as i64);
    let report = engine.report(
        &synthetic_answers(engine.registry(), last_week),
        &synthetic_metrics(last_week),
        taken_at,
        &history,
    )?;

    writeln!(out)?;
    writeln!(out, "--- Week {weeks} report ---")?;
    render_report(out, &report)?;

    if skip_recommendation {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "--- Recommendations ---")?;
    let request = RecommendationRequest::from_report(&report, &history, FOCUS_LIMIT);
    match request.send(&PlaybookRecommender) {
        Ok(recommendation) => writeln!(out, "{}", recommendation.text)?,
        Err(RecommendationError::EmptyRequest) => writeln!(out, "No focus domains to recommend on.")?,
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn default_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 7, 19, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Deterministic answers that drift a little each week so every trend direction shows up.
fn synthetic_answers(registry: &MetricRegistry, week: usize) -> RawAnswerSet {
    let min = i64::from(registry.scale.min);
    let span = i64::from(registry.scale.max) - min + 1;
    let week = week as i64;

    registry
        .domains()
        .iter()
        .enumerate()
        .map(|(index, domain)| {
            let index = index as i64;
            let drift = match index % 3 {
                0 => week,
                1 => -week,
                _ => 0,
            };
            let answers = (0..domain.question_count as i64)
                .map(|question| min + (index * 5 + question * 3 + drift).rem_euclid(span))
                .collect();
            (domain.key.clone(), answers)
        })
        .collect()
}

fn synthetic_metrics(week: usize) -> Vec<AuxiliaryMetric> {
    let workouts = (2 + week % 3) as f64;
    let mut workouts = AuxiliaryMetric::new("Workouts per week").with_values(workouts, 4.0);
    workouts.previous = Some(2.0);

    vec![
        workouts,
        AuxiliaryMetric::new("friend_meetups_per_month").with_values(1.0, 4.0),
        AuxiliaryMetric::new("Books finished").in_domain("hobbies"),
    ]
}

/// Offline recommender that maps each focus domain's band and trend onto a fixed playbook.
pub(crate) struct PlaybookRecommender;

impl Recommender for PlaybookRecommender {
    fn recommend(&self, request: &RecommendationRequest) -> Result<Recommendation, RecommendationError> {
        if request.focus.is_empty() {
            return Err(RecommendationError::EmptyRequest);
        }

        let mut lines = Vec::with_capacity(request.focus.len() + 1);
        if let TrendDelta::Available { delta, direction, .. } = request.composite_delta {
            lines.push(format!(
                "Overall HPI {} {} by {:.1} points.",
                direction.arrow(),
                direction.label(),
                delta.abs()
            ));
        }

        for focus in &request.focus {
            let action = match focus.band {
                ScoreBand::NeedsAttention => "pick one small habit and put it in the calendar this week",
                ScoreBand::Satisfactory => "protect a fixed weekly slot for it",
                ScoreBand::Good => "keep the current routine and review it monthly",
                ScoreBand::Excellent => "maintain it and share what works",
            };
            let mut line = format!("{} ({:.1}): {}.", focus.label, focus.current, action);
            if let Some(percent) = focus.change_percent.filter(|percent| *percent < 0.0) {
                line.push_str(&format!(" Down {:.0}% since last time.", percent.abs()));
            }
            if let Some((metric, gap)) = focus
                .metrics
                .iter()
                .find_map(|metric| metric.gap_to_target().filter(|gap| *gap > 0.0).map(|gap| (metric, gap)))
            {
                line.push_str(&format!(
                    " Close the {:.1} gap on {}.",
                    gap,
                    metric.label.as_deref().unwrap_or(&metric.name)
                ));
            }
            lines.push(line);
        }

        Ok(Recommendation {
            text: lines.join("\n"),
            domains: request.focus.iter().map(|focus| focus.domain.clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpi_engine::scoring::{HpiEngine, TrendConfig};

    fn context() -> Context {
        Context {
            engine: HpiEngine::new(MetricRegistry::standard(), TrendConfig::default()).expect("valid registry"),
        }
    }

    #[test]
    fn synthetic_answers_stay_on_the_scale() {
        let registry = MetricRegistry::standard();
        for week in 0..6 {
            let raw = synthetic_answers(&registry, week);
            assert_eq!(raw.len(), registry.domains().len());
            for (_, answers) in raw.iter() {
                assert_eq!(answers.len(), registry.question_count());
                assert!(answers
                    .iter()
                    .all(|answer| answer.map_or(false, |value| registry.scale.contains(value))));
            }
        }
    }

    #[test]
    fn demo_prints_history_report_and_recommendations() {
        let mut buffer = Vec::new();
        run_demo(
            &context(),
            DemoArgs {
                weeks: Some(3),
                ..DemoArgs::default()
            },
            &mut buffer,
        )
        .expect("demo runs");
        let text = String::from_utf8(buffer).expect("utf8");

        assert!(text.contains("=== HPI demo: 3 weekly assessments ==="));
        assert!(text.contains("Week 1 (2024-01-07)"));
        assert!(text.contains("Week 2 (2024-01-14)"));
        assert!(text.contains("--- Week 3 report ---"));
        assert!(text.contains("--- Recommendations ---"));
        assert!(text.contains("Overall HPI"));
    }

    #[test]
    fn playbook_covers_each_focus_domain() {
        let engine = HpiEngine::default();
        let report = engine
            .report(
                &synthetic_answers(engine.registry(), 0),
                &synthetic_metrics(0),
                default_start(),
                &MetricsHistory::new(),
            )
            .expect("report");
        let request = RecommendationRequest::from_report(&report, &MetricsHistory::new(), 2);

        let recommendation = request.send(&PlaybookRecommender).expect("recommendation");

        assert_eq!(recommendation.domains.len(), 2);
        assert_eq!(recommendation.text.lines().count(), 2);
        for focus in &request.focus {
            assert!(recommendation.text.contains(&focus.label));
        }
    }
}
