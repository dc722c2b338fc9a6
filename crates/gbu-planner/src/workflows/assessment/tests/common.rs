use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::assessment::domain::{
    CriterionCategory, CriterionDefinition, CriterionId, CriterionKind, CriterionValue,
    EventSchedule, HazardTemplate, HazardTemplateDraft, ProjectAttributes, ProjectId,
    ProjectSubmission, ProtectiveMeasures, RiskFactor, RiskRating, Season, SelectionRule,
    SiteFlag, TemplateId,
};
use crate::workflows::assessment::repository::{
    AuditEntry, AuditError, AuditTrail, CriterionDefinitionStore, HazardTemplateStore,
    ProjectRecord, ProjectStore, RepositoryError,
};
use crate::workflows::assessment::selection::AutoSelectionEngine;
use crate::workflows::assessment::validation::CatalogGuard;
use crate::workflows::assessment::{assessment_router, RiskAssessmentService};

pub(super) type MemoryService =
    RiskAssessmentService<MemoryTemplates, MemoryCriteria, MemoryProjects, MemoryAudit>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn winter_date() -> NaiveDate {
    date(2024, 1, 15)
}

pub(super) fn summer_date() -> NaiveDate {
    date(2024, 7, 15)
}

pub(super) fn rating(severity: u8, probability: u8) -> RiskRating {
    RiskRating {
        severity: RiskFactor::new(severity).expect("valid severity"),
        probability: RiskFactor::new(probability).expect("valid probability"),
    }
}

pub(super) fn engine() -> AutoSelectionEngine {
    AutoSelectionEngine::new()
}

pub(super) fn guard() -> CatalogGuard {
    CatalogGuard::default()
}

pub(super) fn criterion(
    id: &str,
    name: &str,
    kind: CriterionKind,
    options: &[&str],
) -> CriterionDefinition {
    CriterionDefinition {
        id: CriterionId(id.to_string()),
        name: name.to_string(),
        kind,
        category: CriterionCategory::Custom,
        options: options.iter().map(|option| option.to_string()).collect(),
        description: None,
    }
}

pub(super) fn zone_criterion() -> CriterionDefinition {
    criterion(
        "crit-zone",
        "Bereiche",
        CriterionKind::Multiselect,
        &["A", "B", "C", "D"],
    )
}

pub(super) fn catalog() -> Vec<CriterionDefinition> {
    vec![
        criterion("crit-water", "Wasser in der Nähe", CriterionKind::Boolean, &[]),
        criterion(
            "crit-venue",
            "Veranstaltungsart",
            CriterionKind::Select,
            &["Konzert", "Messe", "Festival"],
        ),
        zone_criterion(),
    ]
}

pub(super) fn options(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn with_custom(
    mut attributes: ProjectAttributes,
    id: &str,
    value: CriterionValue,
) -> ProjectAttributes {
    attributes
        .custom_criteria
        .insert(CriterionId(id.to_string()), value);
    attributes
}

pub(super) fn flags(set: &[SiteFlag]) -> ProjectAttributes {
    let mut attributes = ProjectAttributes::default();
    for flag in set {
        attributes.set_flag(*flag, true);
    }
    attributes
}

pub(super) fn electricity_in_winter() -> SelectionRule {
    SelectionRule {
        required_flags: BTreeSet::from([SiteFlag::HasElectricity]),
        seasons: BTreeSet::from([Season::Winter]),
        ..SelectionRule::default()
    }
}

pub(super) fn custom_rule(id: &str, accepted: Option<&[&str]>) -> SelectionRule {
    let criterion = CriterionId(id.to_string());
    let mut custom_criteria_values = BTreeMap::new();
    if let Some(accepted) = accepted {
        custom_criteria_values.insert(criterion.clone(), options(accepted));
    }
    SelectionRule {
        custom_criteria: vec![criterion],
        custom_criteria_values,
        ..SelectionRule::default()
    }
}

pub(super) fn hazard_draft(activity: &str, rule: Option<SelectionRule>) -> HazardTemplateDraft {
    HazardTemplateDraft {
        activity: activity.to_string(),
        process: "Aufbau".to_string(),
        hazard: format!("Gefährdung durch {activity}"),
        hazard_factors: String::new(),
        group: None,
        before: rating(3, 2),
        after: rating(2, 1),
        measures: ProtectiveMeasures {
            technical: true,
            organizational: true,
            notes: "Einweisung vor Arbeitsbeginn".to_string(),
            ..ProtectiveMeasures::default()
        },
        selection_rule: rule,
    }
}

pub(super) fn template(id: &str, rule: Option<SelectionRule>) -> HazardTemplate {
    hazard_draft(id, rule).into_template(TemplateId(id.to_string()))
}

pub(super) fn schedule(event_start: NaiveDate) -> EventSchedule {
    EventSchedule {
        build_up_start: event_start - chrono::Duration::days(2),
        build_up_end: event_start - chrono::Duration::days(1),
        event_start,
        event_end: event_start + chrono::Duration::days(1),
    }
}

pub(super) fn submission(
    attributes: ProjectAttributes,
    event_start: NaiveDate,
) -> ProjectSubmission {
    ProjectSubmission {
        title: "Winterzauber Marktplatz".to_string(),
        location: "Marktplatz Kassel".to_string(),
        description: "Weihnachtsmarkt mit Bühne".to_string(),
        schedule: schedule(event_start),
        attributes,
    }
}

pub(super) struct Harness {
    pub(super) service: MemoryService,
    pub(super) templates: Arc<MemoryTemplates>,
    pub(super) criteria: Arc<MemoryCriteria>,
    pub(super) projects: Arc<MemoryProjects>,
    pub(super) audit: Arc<MemoryAudit>,
}

pub(super) fn build_harness() -> Harness {
    let templates = Arc::new(MemoryTemplates::default());
    let criteria = Arc::new(MemoryCriteria::default());
    let projects = Arc::new(MemoryProjects::default());
    let audit = Arc::new(MemoryAudit::default());
    let service = RiskAssessmentService::new(
        templates.clone(),
        criteria.clone(),
        projects.clone(),
        audit.clone(),
    );
    Harness {
        service,
        templates,
        criteria,
        projects,
        audit,
    }
}

pub(super) fn build_service() -> MemoryService {
    build_harness().service
}

#[derive(Default, Clone)]
pub(super) struct MemoryTemplates {
    pub(super) records: Arc<Mutex<Vec<HazardTemplate>>>,
}

impl HazardTemplateStore for MemoryTemplates {
    fn insert(&self, template: HazardTemplate) -> Result<HazardTemplate, RepositoryError> {
        let mut guard = self.records.lock().expect("template mutex poisoned");
        if guard.iter().any(|existing| existing.id == template.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(template.clone());
        Ok(template)
    }

    fn update(&self, template: HazardTemplate) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("template mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == template.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = template;
        Ok(())
    }

    fn remove(&self, id: &TemplateId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("template mutex poisoned");
        let before = guard.len();
        guard.retain(|existing| &existing.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn fetch(&self, id: &TemplateId) -> Result<Option<HazardTemplate>, RepositoryError> {
        let guard = self.records.lock().expect("template mutex poisoned");
        Ok(guard.iter().find(|existing| &existing.id == id).cloned())
    }

    fn all(&self) -> Result<Vec<HazardTemplate>, RepositoryError> {
        Ok(self.records.lock().expect("template mutex poisoned").clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryCriteria {
    pub(super) records: Arc<Mutex<Vec<CriterionDefinition>>>,
}

impl MemoryCriteria {
    pub(super) fn seeded(definitions: Vec<CriterionDefinition>) -> Self {
        Self {
            records: Arc::new(Mutex::new(definitions)),
        }
    }
}

impl CriterionDefinitionStore for MemoryCriteria {
    fn insert(
        &self,
        definition: CriterionDefinition,
    ) -> Result<CriterionDefinition, RepositoryError> {
        let mut guard = self.records.lock().expect("criteria mutex poisoned");
        if guard.iter().any(|existing| existing.id == definition.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(definition.clone());
        Ok(definition)
    }

    fn update(&self, definition: CriterionDefinition) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("criteria mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == definition.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = definition;
        Ok(())
    }

    fn remove(&self, id: &CriterionId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("criteria mutex poisoned");
        let before = guard.len();
        guard.retain(|existing| &existing.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn all(&self) -> Result<Vec<CriterionDefinition>, RepositoryError> {
        Ok(self.records.lock().expect("criteria mutex poisoned").clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryProjects {
    pub(super) records: Arc<Mutex<HashMap<ProjectId, ProjectRecord>>>,
}

impl ProjectStore for MemoryProjects {
    fn insert(&self, project: ProjectRecord) -> Result<ProjectRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("project mutex poisoned");
        if guard.contains_key(&project.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    fn update(&self, project: ProjectRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("project mutex poisoned");
        guard.insert(project.id.clone(), project);
        Ok(())
    }

    fn fetch(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError> {
        let guard = self.records.lock().expect("project mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let guard = self.records.lock().expect("project mutex poisoned");
        let mut projects: Vec<_> = guard.values().cloned().collect();
        projects.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(projects)
    }
}

pub(super) struct UnavailableProjects;

impl ProjectStore for UnavailableProjects {
    fn insert(&self, _project: ProjectRecord) -> Result<ProjectRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _project: ProjectRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<ProjectRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAudit {
    pub(super) fn actions(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .iter()
            .map(|entry| entry.action.clone())
            .collect()
    }
}

impl AuditTrail for MemoryAudit {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }
}

pub(super) struct BrokenAudit;

impl AuditTrail for BrokenAudit {
    fn record(&self, _entry: AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Transport("audit sink down".to_string()))
    }
}

pub(super) fn router_for(service: MemoryService) -> axum::Router {
    assessment_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
