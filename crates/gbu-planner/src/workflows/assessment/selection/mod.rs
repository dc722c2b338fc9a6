mod outcome;
mod rules;
mod season;

pub use outcome::{AutoSelection, RuleMismatch, SkippedTemplate};
pub use season::{season_for_date, season_of};

use chrono::NaiveDate;
use tracing::debug;

use super::domain::{CriterionDefinition, HazardTemplate, ProjectAttributes, SelectionRule};

/// Decide whether a template carrying `rule` should be pre-selected for a project.
pub fn matches(
    rule: Option<&SelectionRule>,
    project: &ProjectAttributes,
    event_date: NaiveDate,
    criteria: &[CriterionDefinition],
) -> bool {
    evaluate(rule, project, event_date, criteria).is_ok()
}

/// Same decision as [`matches`], naming the first rule component that failed.
///
/// Components are checked in the order location, site flags, season, custom
/// criteria. Nothing here panics or errors on malformed input; every doubtful
/// branch ends in a mismatch.
pub fn evaluate(
    rule: Option<&SelectionRule>,
    project: &ProjectAttributes,
    event_date: NaiveDate,
    criteria: &[CriterionDefinition],
) -> Result<(), RuleMismatch> {
    let rule = rule.ok_or(RuleMismatch::NoRule)?;
    if rule.is_empty() {
        return Err(RuleMismatch::EmptyRule);
    }

    rules::check_location(rule, project)?;
    rules::check_flags(rule, project)?;
    rules::check_season(rule, event_date)?;
    rules::check_custom_criteria(rule, project, criteria)?;
    Ok(())
}

/// Stateless engine running the matcher across a template library.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoSelectionEngine;

impl AutoSelectionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn select<'a, I>(
        &self,
        templates: I,
        project: &ProjectAttributes,
        event_date: NaiveDate,
        criteria: &[CriterionDefinition],
    ) -> AutoSelection
    where
        I: IntoIterator<Item = &'a HazardTemplate>,
    {
        let mut selection = AutoSelection::default();

        for template in templates {
            match evaluate(
                template.selection_rule.as_ref(),
                project,
                event_date,
                criteria,
            ) {
                Ok(()) => {
                    debug!(
                        template = %template.id,
                        activity = %template.activity,
                        "template auto-selected"
                    );
                    selection.selected.push(template.id.clone());
                }
                Err(reason) => {
                    debug!(
                        template = %template.id,
                        reason = %reason.summary(),
                        "template not selected"
                    );
                    selection.skipped.push(SkippedTemplate {
                        template_id: template.id.clone(),
                        reason,
                    });
                }
            }
        }

        selection
    }
}
