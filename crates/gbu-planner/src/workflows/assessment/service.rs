use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::briefing::{render_briefing, BriefingOptions, DEFAULT_COUNTRY};
use super::domain::{
    CriterionDefinition, CriterionDraft, CriterionId, HazardTemplate, HazardTemplateDraft,
    Participant, ParticipantDraft, ParticipantId, ParticipantSignature, ProjectAttributes,
    ProjectId, ProjectStatus, ProjectSubmission, Season, SelectionRule, TemplateId,
};
use super::repository::{
    AuditEntry, AuditTrail, CriterionDefinitionStore, HazardTemplateStore, ProjectRecord,
    ProjectStore, ProjectView, RepositoryError,
};
use super::risk::ProjectRiskSummary;
use super::selection::{self, season_for_date, AutoSelection, AutoSelectionEngine, RuleMismatch};
use super::validation::{CatalogGuard, CatalogViolation};

static CRITERION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static TEMPLATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PROJECT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PARTICIPANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(sequence: &AtomicU64, prefix: &str) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// How a re-evaluation combines the fresh auto-selection with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReevaluationMode {
    /// Replace the selection with the matcher result.
    Replace,
    /// Keep the current selection and add newly matching templates.
    #[default]
    Merge,
}

/// Project together with the auto-selection run that shaped it.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSelection {
    pub project: ProjectRecord,
    pub selection: AutoSelection,
}

/// Verdict of a stand-alone rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleVerdict {
    pub matches: bool,
    pub season: Season,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<RuleMismatch>,
}

/// Group of the hazard library with the number of templates filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HazardGroup {
    pub name: String,
    pub templates: usize,
}

/// Headline counts for the planner dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_projects: usize,
    pub active_projects: usize,
    pub assigned_assessments: usize,
    pub hazard_templates: usize,
}

fn group_of(template: &HazardTemplate) -> Option<&str> {
    template
        .group
        .as_deref()
        .map(str::trim)
        .filter(|group| !group.is_empty())
}

/// Service composing the catalog guard, selection engine, stores and audit trail.
pub struct RiskAssessmentService<T, C, P, A> {
    guard: CatalogGuard,
    engine: AutoSelectionEngine,
    templates: Arc<T>,
    criteria: Arc<C>,
    projects: Arc<P>,
    audit: Arc<A>,
    briefing_country: String,
}

impl<T, C, P, A> RiskAssessmentService<T, C, P, A>
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    pub fn new(templates: Arc<T>, criteria: Arc<C>, projects: Arc<P>, audit: Arc<A>) -> Self {
        Self {
            guard: CatalogGuard::new(),
            engine: AutoSelectionEngine::new(),
            templates,
            criteria,
            projects,
            audit,
            briefing_country: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Country whose emergency numbers briefings use when none is requested.
    pub fn with_briefing_country(mut self, country: impl Into<String>) -> Self {
        self.briefing_country = country.into();
        self
    }

    fn audit(&self, entry: AuditEntry) {
        let action = entry.action.clone();
        if let Err(err) = self.audit.record(entry) {
            warn!(%action, error = %err, "failed to record audit entry");
        }
    }

    pub fn list_criteria(&self) -> Result<Vec<CriterionDefinition>, AssessmentServiceError> {
        Ok(self.criteria.all()?)
    }

    pub fn define_criterion(
        &self,
        draft: CriterionDraft,
    ) -> Result<CriterionDefinition, AssessmentServiceError> {
        let existing = self.criteria.all()?;
        let draft = self.guard.criterion_from_draft(draft, &existing, None)?;
        let definition = CriterionDefinition {
            id: CriterionId(next_id(&CRITERION_SEQUENCE, "crit")),
            name: draft.name,
            kind: draft.kind,
            category: draft.category,
            options: draft.options,
            description: draft.description,
        };

        let stored = self.criteria.insert(definition)?;
        self.audit(
            AuditEntry::new("criterion.created", "criterion", stored.id.0.clone())
                .detail("name", &stored.name),
        );
        Ok(stored)
    }

    pub fn update_criterion(
        &self,
        id: &CriterionId,
        draft: CriterionDraft,
    ) -> Result<CriterionDefinition, AssessmentServiceError> {
        let existing = self.criteria.all()?;
        if !existing.iter().any(|definition| &definition.id == id) {
            return Err(RepositoryError::NotFound.into());
        }

        let draft = self.guard.criterion_from_draft(draft, &existing, Some(id))?;
        let definition = CriterionDefinition {
            id: id.clone(),
            name: draft.name,
            kind: draft.kind,
            category: draft.category,
            options: draft.options,
            description: draft.description,
        };

        self.criteria.update(definition.clone())?;
        self.audit(AuditEntry::new("criterion.updated", "criterion", id.0.clone()));
        Ok(definition)
    }

    /// Remove a definition. Rules still naming it stay untouched and stop matching.
    pub fn delete_criterion(&self, id: &CriterionId) -> Result<(), AssessmentServiceError> {
        self.criteria.remove(id)?;

        let dangling = self
            .templates
            .all()?
            .iter()
            .filter(|template| {
                template
                    .selection_rule
                    .as_ref()
                    .is_some_and(|rule| rule.references(id))
            })
            .count();
        if dangling > 0 {
            warn!(
                criterion = %id,
                rules = dangling,
                "deleted criterion is still referenced by selection rules"
            );
        }

        self.audit(
            AuditEntry::new("criterion.deleted", "criterion", id.0.clone())
                .detail("dangling_rules", dangling),
        );
        Ok(())
    }

    pub fn list_templates(&self) -> Result<Vec<HazardTemplate>, AssessmentServiceError> {
        Ok(self.templates.all()?)
    }

    /// Templates filed under `group`. An absent or blank filter lists the whole library.
    pub fn list_templates_in(
        &self,
        group: Option<&str>,
    ) -> Result<Vec<HazardTemplate>, AssessmentServiceError> {
        let templates = self.templates.all()?;
        match group.map(str::trim).filter(|group| !group.is_empty()) {
            None => Ok(templates),
            Some(group) => Ok(templates
                .into_iter()
                .filter(|template| group_of(template) == Some(group))
                .collect()),
        }
    }

    pub fn list_groups(&self) -> Result<Vec<HazardGroup>, AssessmentServiceError> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for template in self.templates.all()? {
            if let Some(group) = group_of(&template) {
                *counts.entry(group.to_string()).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(name, templates)| HazardGroup { name, templates })
            .collect())
    }

    /// Move every template of group `from` to `to`.
    pub fn rename_group(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<HazardTemplate>, AssessmentServiceError> {
        let from = from.trim();
        let to = to.trim();
        if to.is_empty() {
            return Err(CatalogViolation::MissingField("group").into());
        }

        let templates = self.templates.all()?;
        if to != from && templates.iter().any(|template| group_of(template) == Some(to)) {
            return Err(CatalogViolation::DuplicateGroupName(to.to_string()).into());
        }
        let members: Vec<HazardTemplate> = templates
            .into_iter()
            .filter(|template| group_of(template) == Some(from))
            .collect();
        if members.is_empty() {
            return Err(RepositoryError::NotFound.into());
        }

        let mut renamed = Vec::with_capacity(members.len());
        for mut template in members {
            template.group = Some(to.to_string());
            self.templates.update(template.clone())?;
            renamed.push(template);
        }

        info!(from, to, templates = renamed.len(), "hazard group renamed");
        self.audit(
            AuditEntry::new("hazard_group.renamed", "hazard_group", to)
                .detail("from", from)
                .detail("templates", renamed.len()),
        );
        Ok(renamed)
    }

    /// Remove a group. Its templates stay in the library without a group.
    pub fn delete_group(&self, name: &str) -> Result<usize, AssessmentServiceError> {
        let name = name.trim();
        let members: Vec<HazardTemplate> = self
            .templates
            .all()?
            .into_iter()
            .filter(|template| group_of(template) == Some(name))
            .collect();
        if members.is_empty() {
            return Err(RepositoryError::NotFound.into());
        }

        let count = members.len();
        for mut template in members {
            template.group = None;
            self.templates.update(template)?;
        }

        self.audit(
            AuditEntry::new("hazard_group.deleted", "hazard_group", name)
                .detail("templates", count),
        );
        Ok(count)
    }

    pub fn get_template(&self, id: &TemplateId) -> Result<HazardTemplate, AssessmentServiceError> {
        let template = self
            .templates
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(template)
    }

    pub fn create_template(
        &self,
        draft: HazardTemplateDraft,
    ) -> Result<HazardTemplate, AssessmentServiceError> {
        self.guard.check_template(&draft)?;
        let template = draft.into_template(TemplateId(next_id(&TEMPLATE_SEQUENCE, "hzd")));
        let stored = self.templates.insert(template)?;

        self.audit(
            AuditEntry::new("hazard.created", "hazard", stored.id.0.clone())
                .detail("activity", &stored.activity)
                .detail("auto_select", stored.selection_rule.is_some()),
        );
        Ok(stored)
    }

    pub fn update_template(
        &self,
        id: &TemplateId,
        draft: HazardTemplateDraft,
    ) -> Result<HazardTemplate, AssessmentServiceError> {
        self.guard.check_template(&draft)?;
        let template = draft.into_template(id.clone());
        self.templates.update(template.clone())?;
        self.audit(AuditEntry::new("hazard.updated", "hazard", id.0.clone()));
        Ok(template)
    }

    /// Delete a template. Projects referencing it keep the dangling id.
    pub fn delete_template(&self, id: &TemplateId) -> Result<(), AssessmentServiceError> {
        self.templates.remove(id)?;
        self.audit(AuditEntry::new("hazard.deleted", "hazard", id.0.clone()));
        Ok(())
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectView>, AssessmentServiceError> {
        Ok(self
            .projects
            .all()?
            .iter()
            .map(ProjectRecord::view)
            .collect())
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<ProjectRecord, AssessmentServiceError> {
        let project = self
            .projects
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(project)
    }

    fn run_selection(
        &self,
        attributes: &ProjectAttributes,
        event_date: NaiveDate,
    ) -> Result<AutoSelection, AssessmentServiceError> {
        let templates = self.templates.all()?;
        let criteria = self.criteria.all()?;
        Ok(self
            .engine
            .select(&templates, attributes, event_date, &criteria))
    }

    /// Validate an intake submission, auto-select hazards and store the new project.
    pub fn create_project(
        &self,
        submission: ProjectSubmission,
    ) -> Result<ProjectSelection, AssessmentServiceError> {
        let criteria = self.criteria.all()?;
        self.guard.check_submission(&submission, &criteria)?;

        let templates = self.templates.all()?;
        let selection = self.engine.select(
            &templates,
            &submission.attributes,
            submission.schedule.event_start,
            &criteria,
        );

        let now = Utc::now();
        let record = ProjectRecord {
            id: ProjectId(next_id(&PROJECT_SEQUENCE, "prj")),
            title: submission.title.trim().to_string(),
            location: submission.location.trim().to_string(),
            description: submission.description,
            schedule: submission.schedule,
            attributes: submission.attributes,
            status: ProjectStatus::Draft,
            selected_templates: selection.selected.clone(),
            auto_selected: selection.selected.clone(),
            participants: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let project = self.projects.insert(record)?;
        info!(
            project = %project.id,
            selected = selection.selected.len(),
            library = templates.len(),
            "project created with auto-selected hazards"
        );
        self.audit(
            AuditEntry::new("project.created", "project", project.id.0.clone())
                .detail("auto_selected", selection.selected.len()),
        );

        Ok(ProjectSelection { project, selection })
    }

    /// Store new intake answers. The hazard selection is left as is.
    pub fn update_attributes(
        &self,
        id: &ProjectId,
        attributes: ProjectAttributes,
    ) -> Result<ProjectRecord, AssessmentServiceError> {
        let criteria = self.criteria.all()?;
        self.guard.check_attributes(&attributes, &criteria)?;

        let mut project = self.get_project(id)?;
        project.attributes = attributes;
        project.updated_at = Utc::now();
        self.projects.update(project.clone())?;
        self.audit(AuditEntry::new("project.attributes_updated", "project", id.0.clone()));
        Ok(project)
    }

    /// Run the matcher against the current library without touching the project.
    pub fn preview_selection(
        &self,
        id: &ProjectId,
    ) -> Result<AutoSelection, AssessmentServiceError> {
        let project = self.get_project(id)?;
        self.run_selection(&project.attributes, project.schedule.event_start)
    }

    pub fn reevaluate(
        &self,
        id: &ProjectId,
        mode: ReevaluationMode,
    ) -> Result<ProjectSelection, AssessmentServiceError> {
        let mut project = self.get_project(id)?;
        let selection = self.run_selection(&project.attributes, project.schedule.event_start)?;

        project.selected_templates = match mode {
            ReevaluationMode::Replace => selection.selected.clone(),
            ReevaluationMode::Merge => {
                let mut merged = project.selected_templates.clone();
                for template_id in &selection.selected {
                    if !merged.contains(template_id) {
                        merged.push(template_id.clone());
                    }
                }
                merged
            }
        };
        project.auto_selected = selection.selected.clone();
        project.updated_at = Utc::now();
        self.projects.update(project.clone())?;

        self.audit(
            AuditEntry::new("project.reevaluated", "project", id.0.clone())
                .detail("mode", format!("{mode:?}"))
                .detail("auto_selected", selection.selected.len()),
        );
        Ok(ProjectSelection { project, selection })
    }

    /// Replace the selection by hand. Every id must exist in the library.
    pub fn set_selection(
        &self,
        id: &ProjectId,
        template_ids: Vec<TemplateId>,
    ) -> Result<ProjectRecord, AssessmentServiceError> {
        let mut project = self.get_project(id)?;

        let mut selected: Vec<TemplateId> = Vec::with_capacity(template_ids.len());
        for template_id in template_ids {
            if self.templates.fetch(&template_id)?.is_none() {
                return Err(AssessmentServiceError::UnknownTemplate(template_id));
            }
            if !selected.contains(&template_id) {
                selected.push(template_id);
            }
        }

        project.selected_templates = selected;
        project.updated_at = Utc::now();
        self.projects.update(project.clone())?;
        self.audit(
            AuditEntry::new("project.selection_updated", "project", id.0.clone())
                .detail("selected", project.selected_templates.len()),
        );
        Ok(project)
    }

    pub fn set_status(
        &self,
        id: &ProjectId,
        status: ProjectStatus,
    ) -> Result<ProjectRecord, AssessmentServiceError> {
        let mut project = self.get_project(id)?;
        project.status = status;
        project.updated_at = Utc::now();
        self.projects.update(project.clone())?;
        self.audit(
            AuditEntry::new("project.status_changed", "project", id.0.clone())
                .detail("status", status.label()),
        );
        Ok(project)
    }

    pub fn dashboard_summary(&self) -> Result<DashboardSummary, AssessmentServiceError> {
        let projects = self.projects.all()?;
        Ok(DashboardSummary {
            total_projects: projects.len(),
            active_projects: projects
                .iter()
                .filter(|project| project.status == ProjectStatus::Active)
                .count(),
            assigned_assessments: projects
                .iter()
                .map(|project| project.selected_templates.len())
                .sum(),
            hazard_templates: self.templates.all()?.len(),
        })
    }

    fn selected_hazards(
        &self,
        project: &ProjectRecord,
    ) -> Result<Vec<HazardTemplate>, AssessmentServiceError> {
        let templates = self.templates.all()?;
        Ok(project
            .selected_templates
            .iter()
            .filter_map(|id| templates.iter().find(|template| &template.id == id))
            .cloned()
            .collect())
    }

    pub fn risk_summary(
        &self,
        id: &ProjectId,
    ) -> Result<ProjectRiskSummary, AssessmentServiceError> {
        let project = self.get_project(id)?;
        let templates = self.templates.all()?;
        let summary = ProjectRiskSummary::build(&project.selected_templates, |template_id| {
            templates
                .iter()
                .find(|template| &template.id == template_id)
        });

        if !summary.missing_templates.is_empty() {
            warn!(
                project = %id,
                missing = summary.missing_templates.len(),
                "project references deleted hazard templates"
            );
        }
        Ok(summary)
    }

    pub fn briefing(
        &self,
        id: &ProjectId,
        options: &BriefingOptions,
    ) -> Result<String, AssessmentServiceError> {
        let project = self.get_project(id)?;
        let hazards = self.selected_hazards(&project)?;
        let today = Utc::now().date_naive();
        Ok(render_briefing(
            &project,
            &hazards,
            options,
            today,
            &self.briefing_country,
        ))
    }

    pub fn add_participant(
        &self,
        id: &ProjectId,
        draft: ParticipantDraft,
    ) -> Result<Participant, AssessmentServiceError> {
        self.guard.check_participant(&draft)?;
        let mut project = self.get_project(id)?;

        let participant = Participant {
            id: ParticipantId(next_id(&PARTICIPANT_SEQUENCE, "ptc")),
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            email: draft.email,
            company: draft.company,
            role: draft.role,
            signature: None,
        };
        project.participants.push(participant.clone());
        project.updated_at = Utc::now();
        self.projects.update(project)?;
        Ok(participant)
    }

    pub fn record_signature(
        &self,
        id: &ProjectId,
        participant_id: &ParticipantId,
        data: String,
    ) -> Result<Participant, AssessmentServiceError> {
        if data.trim().is_empty() {
            return Err(CatalogViolation::MissingField("signature").into());
        }

        let mut project = self.get_project(id)?;
        let participant = project
            .participant_mut(participant_id)
            .ok_or(RepositoryError::NotFound)?;
        participant.signature = Some(ParticipantSignature {
            data,
            signed_at: Utc::now(),
        });
        let signed = participant.clone();

        project.updated_at = Utc::now();
        self.projects.update(project)?;
        self.audit(
            AuditEntry::new("participant.signed", "project", id.0.clone())
                .detail("participant", &participant_id.0),
        );
        Ok(signed)
    }

    pub fn remove_participant(
        &self,
        id: &ProjectId,
        participant_id: &ParticipantId,
    ) -> Result<(), AssessmentServiceError> {
        let mut project = self.get_project(id)?;
        let before = project.participants.len();
        project
            .participants
            .retain(|participant| &participant.id != participant_id);
        if project.participants.len() == before {
            return Err(RepositoryError::NotFound.into());
        }

        project.updated_at = Utc::now();
        self.projects.update(project)?;
        Ok(())
    }

    /// Check a rule against ad hoc attributes using the stored criteria.
    pub fn evaluate_rule(
        &self,
        rule: Option<&SelectionRule>,
        attributes: &ProjectAttributes,
        event_date: NaiveDate,
    ) -> Result<RuleVerdict, AssessmentServiceError> {
        let criteria = self.criteria.all()?;
        let mismatch = selection::evaluate(rule, attributes, event_date, &criteria).err();
        Ok(RuleVerdict {
            matches: mismatch.is_none(),
            season: season_for_date(event_date),
            mismatch,
        })
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("hazard template {0} does not exist")]
    UnknownTemplate(TemplateId),
}
