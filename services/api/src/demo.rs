use crate::infra::{build_service, parse_date, AppService};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use gbu_planner::config::CatalogConfig;
use gbu_planner::error::AppError;
use gbu_planner::workflows::assessment::{
    selection, season_for_date, BriefingOptions, CriterionDefinition, CriterionValue,
    EventSchedule, ProjectAttributes, ProjectStatus, ProjectSubmission, RuleVerdict,
    SelectionRule, DEFAULT_COUNTRY,
};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file holding the selection rule (`null` for a template without one)
    #[arg(long)]
    pub(crate) rule: PathBuf,
    /// JSON file holding the project attributes
    #[arg(long)]
    pub(crate) project: PathBuf,
    /// Event start date (YYYY-MM-DD) that decides the season
    #[arg(long, value_parser = parse_date)]
    pub(crate) event_date: NaiveDate,
    /// Optional JSON file with the custom criterion definitions
    #[arg(long)]
    pub(crate) criteria: Option<PathBuf>,
    /// Print the verdict as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Event start date (YYYY-MM-DD). Defaults to two weeks from today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) event_date: Option<NaiveDate>,
    /// Country used for the emergency numbers in the briefing.
    #[arg(long)]
    pub(crate) country: Option<String>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|err| AppError::Input(format!("{}: {}", path.display(), err)))
}

pub(crate) fn evaluate_files(args: &EvaluateArgs) -> Result<RuleVerdict, AppError> {
    let rule: Option<SelectionRule> = read_json(&args.rule)?;
    let attributes: ProjectAttributes = read_json(&args.project)?;
    let criteria: Vec<CriterionDefinition> = match &args.criteria {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let mismatch =
        selection::evaluate(rule.as_ref(), &attributes, args.event_date, &criteria).err();
    Ok(RuleVerdict {
        matches: mismatch.is_none(),
        season: season_for_date(args.event_date),
        mismatch,
    })
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let verdict = evaluate_files(&args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!(
        "Event date {} falls in {}",
        args.event_date.format("%d.%m.%Y"),
        verdict.season.label()
    );
    match &verdict.mismatch {
        None => println!("Rule matches: the hazard would be auto-selected"),
        Some(mismatch) => println!("Rule does not match: {}", mismatch.summary()),
    }
    Ok(())
}

fn demo_attributes(service: &AppService) -> Result<ProjectAttributes, AppError> {
    let mut attributes = ProjectAttributes {
        is_outdoor: true,
        has_electricity: true,
        has_generator: true,
        has_public_access: true,
        has_night_work: true,
        ..ProjectAttributes::default()
    };

    for criterion in service.list_criteria()? {
        let value = match criterion.name.as_str() {
            "Veranstaltungsart" => CriterionValue::Single("Stadtfest".to_string()),
            "Bühnenelemente" => CriterionValue::Multiple(
                ["Podest".to_string(), "Truss".to_string()]
                    .into_iter()
                    .collect(),
            ),
            _ => continue,
        };
        attributes.custom_criteria.insert(criterion.id, value);
    }
    Ok(attributes)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        event_date,
        country,
    } = args;

    let event_start =
        event_date.unwrap_or_else(|| Local::now().date_naive() + Duration::days(14));
    let catalog = CatalogConfig {
        seed_defaults: true,
        briefing_country: DEFAULT_COUNTRY.to_string(),
    };
    let service = build_service(&catalog)?;

    let criteria = service.list_criteria()?;
    println!("GBU planner demo");
    println!(
        "- Catalog: {} hazard templates | {} custom criteria",
        service.list_templates()?.len(),
        criteria.len()
    );
    for criterion in &criteria {
        println!(
            "  * {} ({}, {})",
            criterion.name,
            criterion.category.label(),
            criterion.kind.label()
        );
    }
    let groups = service.list_groups()?;
    println!(
        "- Hazard groups: {}",
        groups
            .iter()
            .map(|group| format!("{} ({})", group.name, group.templates))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let submission = ProjectSubmission {
        title: "Stadtfest am Hafen".to_string(),
        location: "Hafenpromenade".to_string(),
        description: "Zweitägiges Stadtfest mit Bühne und Marktständen".to_string(),
        schedule: EventSchedule {
            build_up_start: event_start - Duration::days(2),
            build_up_end: event_start - Duration::days(1),
            event_start,
            event_end: event_start + Duration::days(1),
        },
        attributes: demo_attributes(&service)?,
    };

    let created = match service.create_project(submission) {
        Ok(created) => created,
        Err(err) => {
            println!("  Project rejected: {}", err);
            return Ok(());
        }
    };
    let project = &created.project;
    println!(
        "- Created project {} ({}) for {} ({})",
        project.id,
        project.title,
        event_start.format("%d.%m.%Y"),
        season_for_date(event_start).label()
    );

    println!("\nAuto-selected hazards ({}):", created.selection.selected.len());
    for id in &created.selection.selected {
        let template = service.get_template(id)?;
        println!("  + {} | {}", template.activity, template.hazard);
    }
    println!("Skipped ({}):", created.selection.skipped.len());
    for skipped in &created.selection.skipped {
        let activity = service
            .get_template(&skipped.template_id)
            .map(|template| template.activity)
            .unwrap_or_else(|_| skipped.template_id.to_string());
        println!("  - {}: {}", activity, skipped.reason.summary());
    }

    service.set_status(&project.id, ProjectStatus::Active)?;
    let dashboard = service.dashboard_summary()?;
    println!(
        "\nDashboard: {} projects | {} active | {} assigned assessments",
        dashboard.total_projects, dashboard.active_projects, dashboard.assigned_assessments
    );

    let summary = service.risk_summary(&project.id)?;
    println!("\nRisk summary");
    println!(
        "- {} assessments | total risk {} -> residual {} ({}% reduction)",
        summary.assessment_count,
        summary.total_risk,
        summary.total_residual_risk,
        summary.reduction_percent()
    );
    if let Some(level) = summary.highest_residual_level {
        println!("- Highest residual level: {}", level.label());
    }

    let options = BriefingOptions {
        country,
        project_manager: Some("Projektleitung Demo".to_string()),
        date: Some(event_start - Duration::days(2)),
        ..BriefingOptions::default()
    };
    let briefing = service.briefing(&project.id, &options)?;
    println!("\n{briefing}");
    Ok(())
}
