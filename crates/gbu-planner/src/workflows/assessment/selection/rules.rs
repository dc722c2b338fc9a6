use chrono::NaiveDate;

use super::super::domain::{
    CriterionDefinition, CriterionId, CriterionKind, CriterionValue, ProjectAttributes,
    SelectionRule,
};
use super::outcome::RuleMismatch;
use super::season::season_for_date;

pub(crate) fn check_location(
    rule: &SelectionRule,
    project: &ProjectAttributes,
) -> Result<(), RuleMismatch> {
    match rule.is_outdoor {
        Some(required) if required != project.is_outdoor => Err(RuleMismatch::Location {
            required_outdoor: required,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn check_flags(
    rule: &SelectionRule,
    project: &ProjectAttributes,
) -> Result<(), RuleMismatch> {
    match rule
        .required_flags
        .iter()
        .find(|flag| !project.flag(**flag))
    {
        Some(flag) => Err(RuleMismatch::MissingFlag { flag: *flag }),
        None => Ok(()),
    }
}

pub(crate) fn check_season(rule: &SelectionRule, event_date: NaiveDate) -> Result<(), RuleMismatch> {
    if rule.seasons.is_empty() {
        return Ok(());
    }

    let actual = season_for_date(event_date);
    if rule.seasons.contains(&actual) {
        Ok(())
    } else {
        Err(RuleMismatch::Season { actual })
    }
}

pub(crate) fn check_custom_criteria(
    rule: &SelectionRule,
    project: &ProjectAttributes,
    criteria: &[CriterionDefinition],
) -> Result<(), RuleMismatch> {
    if rule.custom_criteria.is_empty() {
        return Ok(());
    }

    if project.custom_criteria.is_empty() {
        return Err(RuleMismatch::NoCustomCriteria);
    }

    for criterion_id in &rule.custom_criteria {
        let definition = criteria
            .iter()
            .find(|definition| &definition.id == criterion_id)
            .ok_or_else(|| RuleMismatch::UnknownCriterion {
                criterion: criterion_id.clone(),
            })?;

        let value = project.custom_criteria.get(criterion_id);
        check_criterion_value(rule, criterion_id, definition.kind, value)?;
    }

    Ok(())
}

fn check_criterion_value(
    rule: &SelectionRule,
    criterion: &CriterionId,
    kind: CriterionKind,
    value: Option<&CriterionValue>,
) -> Result<(), RuleMismatch> {
    let unset = || RuleMismatch::CriterionUnset {
        criterion: criterion.clone(),
    };
    let value = value.ok_or_else(unset)?;

    if !value.fits(kind) {
        return Err(RuleMismatch::CriterionShape {
            criterion: criterion.clone(),
        });
    }

    match value {
        CriterionValue::Boolean(true) => Ok(()),
        CriterionValue::Boolean(false) => Err(unset()),
        // presence only; the selected option is not compared against the rule
        CriterionValue::Single(option) if !option.is_empty() => Ok(()),
        CriterionValue::Single(_) => Err(unset()),
        CriterionValue::Multiple(options) if options.is_empty() => Err(unset()),
        CriterionValue::Multiple(options) => match rule.custom_criteria_values.get(criterion) {
            None => Ok(()),
            Some(accepted) if options.iter().any(|option| accepted.contains(option)) => Ok(()),
            Some(_) => Err(RuleMismatch::NoAcceptedOption {
                criterion: criterion.clone(),
            }),
        },
    }
}
