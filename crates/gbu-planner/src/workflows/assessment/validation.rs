use super::domain::{
    CriterionDefinition, CriterionDraft, CriterionId, CriterionValue, HazardTemplateDraft,
    ParticipantDraft, ProjectAttributes, ProjectSubmission,
};

/// Validation errors raised by the catalog guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogViolation {
    #[error("required field '{0}' is empty")]
    MissingField(&'static str),
    #[error("schedule is inconsistent: {0}")]
    InvalidSchedule(&'static str),
    #[error("criterion {0} is not defined")]
    UnknownCriterion(CriterionId),
    #[error("value for criterion {0} does not match its type")]
    CriterionValueShape(CriterionId),
    #[error("option '{option}' is not offered by criterion {criterion}")]
    UnknownOption {
        criterion: CriterionId,
        option: String,
    },
    #[error("select criteria need at least one option")]
    MissingOptions,
    #[error("yes/no criteria cannot carry options")]
    UnexpectedOptions,
    #[error("a criterion named '{0}' already exists")]
    DuplicateCriterionName(String),
    #[error("hazard group {0} already exists")]
    DuplicateGroupName(String),
    #[error("participants need a first and last name")]
    MissingParticipantName,
    #[error("selection rule sets no conditions; omit it for manual-only templates")]
    EmptySelectionRule,
}

/// Guard checking catalog entries and intake submissions before they are stored.
#[derive(Debug, Clone, Default)]
pub struct CatalogGuard;

impl CatalogGuard {
    pub fn new() -> Self {
        Self
    }

    /// Normalise a criterion draft and check it against the existing catalog.
    ///
    /// `editing` names the definition being replaced so its own name does not
    /// count as a duplicate.
    pub fn criterion_from_draft(
        &self,
        draft: CriterionDraft,
        existing: &[CriterionDefinition],
        editing: Option<&CriterionId>,
    ) -> Result<CriterionDraft, CatalogViolation> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(CatalogViolation::MissingField("name"));
        }

        let duplicate = existing.iter().any(|definition| {
            Some(&definition.id) != editing && definition.name.trim().eq_ignore_ascii_case(&name)
        });
        if duplicate {
            return Err(CatalogViolation::DuplicateCriterionName(name));
        }

        let options: Vec<String> = draft
            .options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();

        if draft.kind.takes_options() && options.is_empty() {
            return Err(CatalogViolation::MissingOptions);
        }
        if !draft.kind.takes_options() && !options.is_empty() {
            return Err(CatalogViolation::UnexpectedOptions);
        }

        let description = draft
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        Ok(CriterionDraft {
            name,
            kind: draft.kind,
            category: draft.category,
            options,
            description,
        })
    }

    pub fn check_template(&self, draft: &HazardTemplateDraft) -> Result<(), CatalogViolation> {
        if draft.activity.trim().is_empty() {
            return Err(CatalogViolation::MissingField("activity"));
        }
        if draft.hazard.trim().is_empty() {
            return Err(CatalogViolation::MissingField("hazard"));
        }
        if draft.selection_rule.as_ref().is_some_and(|rule| rule.is_empty()) {
            return Err(CatalogViolation::EmptySelectionRule);
        }
        Ok(())
    }

    pub fn check_submission(
        &self,
        submission: &ProjectSubmission,
        criteria: &[CriterionDefinition],
    ) -> Result<(), CatalogViolation> {
        if submission.title.trim().is_empty() {
            return Err(CatalogViolation::MissingField("title"));
        }
        if submission.location.trim().is_empty() {
            return Err(CatalogViolation::MissingField("location"));
        }

        let schedule = &submission.schedule;
        if schedule.build_up_start > schedule.build_up_end {
            return Err(CatalogViolation::InvalidSchedule(
                "build-up ends before it starts",
            ));
        }
        if schedule.event_start > schedule.event_end {
            return Err(CatalogViolation::InvalidSchedule(
                "event ends before it starts",
            ));
        }

        self.check_attributes(&submission.attributes, criteria)
    }

    /// Every custom value must reference a defined criterion and fit its type and options.
    pub fn check_attributes(
        &self,
        attributes: &ProjectAttributes,
        criteria: &[CriterionDefinition],
    ) -> Result<(), CatalogViolation> {
        for (criterion_id, value) in &attributes.custom_criteria {
            let definition = criteria
                .iter()
                .find(|definition| &definition.id == criterion_id)
                .ok_or_else(|| CatalogViolation::UnknownCriterion(criterion_id.clone()))?;

            if !value.fits(definition.kind) {
                return Err(CatalogViolation::CriterionValueShape(criterion_id.clone()));
            }

            let offered =
                |option: &String| definition.options.iter().any(|known| known == option);
            let unknown = match value {
                CriterionValue::Boolean(_) => None,
                CriterionValue::Single(option) if option.is_empty() => None,
                CriterionValue::Single(option) => Some(option).filter(|option| !offered(*option)),
                CriterionValue::Multiple(options) => options.iter().find(|option| !offered(*option)),
            };

            if let Some(option) = unknown {
                return Err(CatalogViolation::UnknownOption {
                    criterion: criterion_id.clone(),
                    option: option.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn check_participant(&self, draft: &ParticipantDraft) -> Result<(), CatalogViolation> {
        if draft.first_name.trim().is_empty() || draft.last_name.trim().is_empty() {
            return Err(CatalogViolation::MissingParticipantName);
        }
        Ok(())
    }
}
