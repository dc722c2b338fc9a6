use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CriterionDefinition, CriterionId, EventSchedule, HazardTemplate, Participant,
    ParticipantId, ProjectAttributes, ProjectId, ProjectStatus, TemplateId,
};

/// Stored project including its hazard selection and briefed participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub title: String,
    pub location: String,
    pub description: String,
    pub schedule: EventSchedule,
    pub attributes: ProjectAttributes,
    pub status: ProjectStatus,
    /// Template references; edits to a template propagate, deleted ones are tolerated.
    pub selected_templates: Vec<TemplateId>,
    /// Subset of the selection proposed by the last auto-selection run.
    pub auto_selected: Vec<TemplateId>,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|participant| &participant.id == id)
    }

    pub fn view(&self) -> ProjectView {
        ProjectView {
            project_id: self.id.clone(),
            title: self.title.clone(),
            location: self.location.clone(),
            status: self.status,
            status_label: self.status.label(),
            event_start: self.schedule.event_start,
            hazard_count: self.selected_templates.len(),
            auto_selected_count: self.auto_selected.len(),
            participant_count: self.participants.len(),
            signed_count: self
                .participants
                .iter()
                .filter(|participant| participant.has_signed())
                .count(),
        }
    }
}

/// Compact listing representation of a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub project_id: ProjectId,
    pub title: String,
    pub location: String,
    pub status: ProjectStatus,
    pub status_label: &'static str,
    pub event_start: chrono::NaiveDate,
    pub hazard_count: usize,
    pub auto_selected_count: usize,
    pub participant_count: usize,
    pub signed_count: usize,
}

/// Storage for the global hazard library.
pub trait HazardTemplateStore: Send + Sync {
    fn insert(&self, template: HazardTemplate) -> Result<HazardTemplate, RepositoryError>;
    fn update(&self, template: HazardTemplate) -> Result<(), RepositoryError>;
    fn remove(&self, id: &TemplateId) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &TemplateId) -> Result<Option<HazardTemplate>, RepositoryError>;
    fn all(&self) -> Result<Vec<HazardTemplate>, RepositoryError>;
}

/// Storage for criterion definitions.
pub trait CriterionDefinitionStore: Send + Sync {
    fn insert(
        &self,
        definition: CriterionDefinition,
    ) -> Result<CriterionDefinition, RepositoryError>;
    fn update(&self, definition: CriterionDefinition) -> Result<(), RepositoryError>;
    fn remove(&self, id: &CriterionId) -> Result<(), RepositoryError>;
    fn all(&self) -> Result<Vec<CriterionDefinition>, RepositoryError>;
}

/// Storage for event projects.
pub trait ProjectStore: Send + Sync {
    fn insert(&self, project: ProjectRecord) -> Result<ProjectRecord, RepositoryError>;
    fn update(&self, project: ProjectRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError>;
    fn all(&self) -> Result<Vec<ProjectRecord>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook recording who changed what in the catalog and projects.
pub trait AuditTrail: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub details: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: &str, entity: &str, entity_id: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id: entity_id.into(),
            details: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Transport(String),
}
