//! Risk assessment planning for event projects.
//!
//! Administrators maintain a library of hazard templates and a catalog of custom
//! criteria. Each template may carry a selection rule; when a project is created
//! from the intake form the [`selection`] engine proposes every template whose rule
//! matches the project's attributes and event date. Selected hazards feed the risk
//! summary and the participant briefing.

pub mod briefing;
pub mod domain;
pub mod repository;
pub mod risk;
pub mod router;
pub mod selection;
pub mod service;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use briefing::{
    emergency_numbers, render_briefing, BriefingOptions, EmergencyNumbers, DEFAULT_COUNTRY,
};
pub use domain::{
    CriterionCategory, CriterionDefinition, CriterionDraft, CriterionId, CriterionKind,
    CriterionValue, EventSchedule, HazardTemplate, HazardTemplateDraft, Participant,
    ParticipantDraft, ParticipantId, ParticipantSignature, ProjectAttributes, ProjectId,
    ProjectStatus, ProjectSubmission, ProtectiveMeasures, RiskFactor, RiskFactorError,
    RiskRating, Season, SelectionRule, SiteFlag, TemplateId,
};
pub use repository::{
    AuditEntry, AuditError, AuditTrail, CriterionDefinitionStore, HazardTemplateStore,
    ProjectRecord, ProjectStore, ProjectView, RepositoryError,
};
pub use risk::{risk_value, AssessmentRiskLine, ProjectRiskSummary, RiskLevel};
pub use router::assessment_router;
pub use selection::{
    evaluate, matches, season_for_date, season_of, AutoSelection, AutoSelectionEngine,
    RuleMismatch, SkippedTemplate,
};
pub use service::{
    AssessmentServiceError, DashboardSummary, HazardGroup, ProjectSelection, ReevaluationMode,
    RiskAssessmentService, RuleVerdict,
};
pub use validation::CatalogViolation;
