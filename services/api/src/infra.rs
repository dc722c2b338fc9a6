use chrono::NaiveDate;
use gbu_planner::config::CatalogConfig;
use gbu_planner::error::AppError;
use gbu_planner::workflows::assessment::{
    AssessmentServiceError, AuditEntry, AuditError, AuditTrail, CriterionCategory,
    CriterionDefinition, CriterionDefinitionStore, CriterionDraft, CriterionId, CriterionKind,
    HazardTemplate, HazardTemplateDraft, HazardTemplateStore, ProjectId, ProjectRecord,
    ProjectStore, ProtectiveMeasures, RepositoryError, RiskAssessmentService, RiskFactor,
    RiskRating, Season, SelectionRule, SiteFlag, TemplateId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type AppService = RiskAssessmentService<
    InMemoryHazardTemplates,
    InMemoryCriteria,
    InMemoryProjects,
    InMemoryAuditTrail,
>;

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryHazardTemplates {
    records: Arc<Mutex<Vec<HazardTemplate>>>,
}

impl HazardTemplateStore for InMemoryHazardTemplates {
    fn insert(&self, template: HazardTemplate) -> Result<HazardTemplate, RepositoryError> {
        let mut guard = lock(&self.records, "template store")?;
        if guard.iter().any(|existing| existing.id == template.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(template.clone());
        Ok(template)
    }

    fn update(&self, template: HazardTemplate) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "template store")?;
        match guard.iter_mut().find(|existing| existing.id == template.id) {
            Some(slot) => {
                *slot = template;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn remove(&self, id: &TemplateId) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "template store")?;
        let before = guard.len();
        guard.retain(|existing| &existing.id != id);
        if guard.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    fn fetch(&self, id: &TemplateId) -> Result<Option<HazardTemplate>, RepositoryError> {
        let guard = lock(&self.records, "template store")?;
        Ok(guard.iter().find(|existing| &existing.id == id).cloned())
    }

    fn all(&self) -> Result<Vec<HazardTemplate>, RepositoryError> {
        Ok(lock(&self.records, "template store")?.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCriteria {
    records: Arc<Mutex<Vec<CriterionDefinition>>>,
}

impl CriterionDefinitionStore for InMemoryCriteria {
    fn insert(
        &self,
        definition: CriterionDefinition,
    ) -> Result<CriterionDefinition, RepositoryError> {
        let mut guard = lock(&self.records, "criteria store")?;
        if guard.iter().any(|existing| existing.id == definition.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(definition.clone());
        Ok(definition)
    }

    fn update(&self, definition: CriterionDefinition) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "criteria store")?;
        match guard.iter_mut().find(|existing| existing.id == definition.id) {
            Some(slot) => {
                *slot = definition;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn remove(&self, id: &CriterionId) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "criteria store")?;
        let before = guard.len();
        guard.retain(|existing| &existing.id != id);
        if guard.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    fn all(&self) -> Result<Vec<CriterionDefinition>, RepositoryError> {
        Ok(lock(&self.records, "criteria store")?.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProjects {
    records: Arc<Mutex<HashMap<ProjectId, ProjectRecord>>>,
}

impl ProjectStore for InMemoryProjects {
    fn insert(&self, project: ProjectRecord) -> Result<ProjectRecord, RepositoryError> {
        let mut guard = lock(&self.records, "project store")?;
        if guard.contains_key(&project.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    fn update(&self, project: ProjectRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "project store")?;
        if guard.contains_key(&project.id) {
            guard.insert(project.id.clone(), project);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError> {
        let guard = lock(&self.records, "project store")?;
        Ok(guard.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let guard = lock(&self.records, "project store")?;
        let mut projects: Vec<ProjectRecord> = guard.values().cloned().collect();
        projects.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(projects)
    }
}

/// Audit trail that emits each entry as a structured log line and keeps it in memory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditTrail {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl AuditTrail for InMemoryAuditTrail {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        info!(
            action = %entry.action,
            entity = %entry.entity,
            entity_id = %entry.entity_id,
            details = ?entry.details,
            "audit"
        );
        self.entries
            .lock()
            .map_err(|_| AuditError::Transport("audit lock poisoned".to_string()))?
            .push(entry);
        Ok(())
    }
}

impl InMemoryAuditTrail {
    #[cfg(test)]
    pub(crate) fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub(crate) fn build_service(catalog: &CatalogConfig) -> Result<Arc<AppService>, AppError> {
    let service = RiskAssessmentService::new(
        Arc::new(InMemoryHazardTemplates::default()),
        Arc::new(InMemoryCriteria::default()),
        Arc::new(InMemoryProjects::default()),
        Arc::new(InMemoryAuditTrail::default()),
    )
    .with_briefing_country(catalog.briefing_country.clone());

    if catalog.seed_defaults {
        let seeded = seed_catalog(&service)?;
        info!(
            criteria = seeded.criteria,
            templates = seeded.templates,
            "default catalog seeded"
        );
    }

    Ok(Arc::new(service))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub(crate) criteria: usize,
    pub(crate) templates: usize,
}

fn factor(value: u8) -> Result<RiskFactor, AppError> {
    RiskFactor::new(value).map_err(|err| AppError::Input(err.to_string()))
}

fn rating(severity: u8, probability: u8) -> Result<RiskRating, AppError> {
    Ok(RiskRating {
        severity: factor(severity)?,
        probability: factor(probability)?,
    })
}

fn flag_rule(flags: &[SiteFlag]) -> SelectionRule {
    SelectionRule {
        required_flags: flags.iter().copied().collect(),
        ..SelectionRule::default()
    }
}

fn outdoor_rule(seasons: &[Season]) -> SelectionRule {
    SelectionRule {
        is_outdoor: Some(true),
        seasons: seasons.iter().copied().collect(),
        ..SelectionRule::default()
    }
}

fn criterion_rule(criterion: &CriterionId, accepted: &[&str]) -> SelectionRule {
    let mut custom_criteria_values = BTreeMap::new();
    if !accepted.is_empty() {
        let values: BTreeSet<String> = accepted.iter().map(|value| value.to_string()).collect();
        custom_criteria_values.insert(criterion.clone(), values);
    }
    SelectionRule {
        custom_criteria: vec![criterion.clone()],
        custom_criteria_values,
        ..SelectionRule::default()
    }
}

struct SeedHazard {
    activity: &'static str,
    process: &'static str,
    hazard: &'static str,
    factors: &'static str,
    group: &'static str,
    before: (u8, u8),
    after: (u8, u8),
    measures: [bool; 4],
    notes: &'static str,
    rule: Option<SelectionRule>,
}

impl SeedHazard {
    fn into_draft(self) -> Result<HazardTemplateDraft, AppError> {
        let [substitution, technical, organizational, personal] = self.measures;
        Ok(HazardTemplateDraft {
            activity: self.activity.to_string(),
            process: self.process.to_string(),
            hazard: self.hazard.to_string(),
            hazard_factors: self.factors.to_string(),
            group: Some(self.group.to_string()),
            before: rating(self.before.0, self.before.1)?,
            after: rating(self.after.0, self.after.1)?,
            measures: ProtectiveMeasures {
                substitution,
                technical,
                organizational,
                personal,
                notes: self.notes.to_string(),
            },
            selection_rule: self.rule,
        })
    }
}

fn seed_criteria() -> Vec<CriterionDraft> {
    vec![
        CriterionDraft {
            name: "Gewässer in der Nähe".to_string(),
            kind: CriterionKind::Boolean,
            category: CriterionCategory::Location,
            options: Vec::new(),
            description: Some("See, Fluss oder Hafenbecken im Veranstaltungsbereich".to_string()),
        },
        CriterionDraft {
            name: "Veranstaltungsart".to_string(),
            kind: CriterionKind::Select,
            category: CriterionCategory::Project,
            options: ["Konzert", "Messe", "Stadtfest", "Sportveranstaltung"]
                .iter()
                .map(|option| option.to_string())
                .collect(),
            description: None,
        },
        CriterionDraft {
            name: "Bühnenelemente".to_string(),
            kind: CriterionKind::Multiselect,
            category: CriterionCategory::Project,
            options: ["Podest", "Truss", "Rigging", "Tribüne"]
                .iter()
                .map(|option| option.to_string())
                .collect(),
            description: Some("Aufbauten, die am Veranstaltungsort errichtet werden".to_string()),
        },
    ]
}

fn seed_hazards(
    water: &CriterionId,
    event_kind: &CriterionId,
    stage: &CriterionId,
) -> Vec<SeedHazard> {
    vec![
        SeedHazard {
            activity: "Elektroinstallation",
            process: "Auf- und Abbau",
            hazard: "Stromschlag durch defekte oder unsachgemäß verwendete Elektrogeräte",
            factors: "Elektrische Gefährdung",
            group: "Elektrik",
            before: (3, 2),
            after: (3, 1),
            measures: [false, true, true, false],
            notes: "Prüfung durch Elektrofachkraft, FI-Schutzschalter (DGUV Vorschrift 3)",
            rule: Some(flag_rule(&[SiteFlag::HasElectricity])),
        },
        SeedHazard {
            activity: "Arbeiten in der Höhe",
            process: "Bühnen- und Traversenbau",
            hazard: "Sturz von erhöhten Arbeitsplätzen oder Bühnen",
            factors: "Absturz",
            group: "Höhe",
            before: (3, 3),
            after: (3, 1),
            measures: [false, true, true, true],
            notes: "Geländer und Netze, PSA gegen Absturz (DGUV Regel 112-198)",
            rule: Some(flag_rule(&[SiteFlag::HasWorkAbove2m])),
        },
        SeedHazard {
            activity: "Aufbau im Freien",
            process: "Auf- und Abbau",
            hazard: "Gefährdung durch Wind, Regen und Blitz",
            factors: "Wetter und Unwetter",
            group: "Wetter",
            before: (3, 2),
            after: (2, 1),
            measures: [false, true, true, false],
            notes: "Wetterüberwachung, Windlastberechnung (DIN EN 13782)",
            rule: Some(outdoor_rule(&[])),
        },
        SeedHazard {
            activity: "Generatorbetrieb",
            process: "Energieversorgung",
            hazard: "CO-Vergiftung durch Generatoren oder Heizgeräte",
            factors: "Kohlenmonoxid",
            group: "Chemisch",
            before: (3, 2),
            after: (3, 1),
            measures: [false, true, true, false],
            notes: "Aufstellung im Freien, CO-Warnmelder (TRGS 900)",
            rule: Some(flag_rule(&[SiteFlag::HasGenerator])),
        },
        SeedHazard {
            activity: "Fahrzeugverkehr",
            process: "Anlieferung",
            hazard: "Gefährdung durch rangierende oder fahrende Fahrzeuge",
            factors: "Verkehr",
            group: "Verkehr",
            before: (3, 2),
            after: (2, 1),
            measures: [false, false, true, true],
            notes: "Verkehrswege absperren, Einweiser, Warnwesten",
            rule: Some(flag_rule(&[SiteFlag::HasTrafficArea])),
        },
        SeedHazard {
            activity: "Beschallung",
            process: "Veranstaltungsbetrieb",
            hazard: "Gehörschädigung durch hohe Schallpegel",
            factors: "Lärm",
            group: "Lärm",
            before: (2, 3),
            after: (2, 1),
            measures: [false, false, true, true],
            notes: "Gehörschutz, Schallpegelmessung (LärmVibrationsArbSchV)",
            rule: Some(criterion_rule(event_kind, &[])),
        },
        SeedHazard {
            activity: "Brandschutz",
            process: "Veranstaltungsbetrieb",
            hazard: "Brand durch elektrische Geräte, Pyrotechnik oder offenes Feuer",
            factors: "Brand",
            group: "Brand",
            before: (3, 2),
            after: (3, 1),
            measures: [false, true, true, false],
            notes: "Feuerlöscher, Brandschutzordnung",
            rule: None,
        },
        SeedHazard {
            activity: "Nachtarbeit",
            process: "Abbau",
            hazard: "Unfallgefahr durch schlechte Sichtverhältnisse",
            factors: "Sichtminderung",
            group: "Sonstige",
            before: (2, 2),
            after: (2, 1),
            measures: [false, true, false, true],
            notes: "Beleuchtung (ASR A3.4), reflektierende Kleidung",
            rule: Some(flag_rule(&[SiteFlag::HasNightWork])),
        },
        SeedHazard {
            activity: "Lange Arbeitszeiten",
            process: "Auf- und Abbau",
            hazard: "Unfälle durch Müdigkeit und Überlastung",
            factors: "Ermüdung",
            group: "Sonstige",
            before: (2, 2),
            after: (2, 1),
            measures: [false, false, true, false],
            notes: "Pausen und Schichtpläne (ArbZG)",
            rule: Some(flag_rule(&[SiteFlag::HasNightWork])),
        },
        SeedHazard {
            activity: "Kabelverlegung",
            process: "Auf- und Abbau",
            hazard: "Stolpern über Kabel und unebenen Untergrund",
            factors: "Stolper- und Sturzgefahr",
            group: "Mechanisch",
            before: (2, 3),
            after: (1, 2),
            measures: [false, true, false, true],
            notes: "Kabelbrücken, Sicherheitsschuhe",
            rule: Some(flag_rule(&[SiteFlag::HasElectricity, SiteFlag::HasPublicAccess])),
        },
        SeedHazard {
            activity: "Außenarbeiten im Winter",
            process: "Auf- und Abbau",
            hazard: "Ausrutschen auf Eis und Schnee, Unterkühlung",
            factors: "Glätte und Kälte",
            group: "Wetter",
            before: (2, 3),
            after: (2, 1),
            measures: [false, false, true, true],
            notes: "Räum- und Streudienst, Kälteschutzkleidung",
            rule: Some(outdoor_rule(&[Season::Winter])),
        },
        SeedHazard {
            activity: "Außenarbeiten im Sommer",
            process: "Auf- und Abbau",
            hazard: "Hitzeerschöpfung und Sonnenbrand",
            factors: "Hitze und UV-Strahlung",
            group: "Wetter",
            before: (2, 2),
            after: (1, 2),
            measures: [false, false, true, true],
            notes: "Trinkwasser, Schattenplätze, Sonnenschutz",
            rule: Some(outdoor_rule(&[Season::Summer])),
        },
        SeedHazard {
            activity: "Hängende Lasten",
            process: "Rigging",
            hazard: "Herabfallende Lasten und Traversenteile",
            factors: "Mechanisch",
            group: "Mechanisch",
            before: (3, 2),
            after: (3, 1),
            measures: [false, true, true, true],
            notes: "Sachkundige Rigger, Sicherungsseile (DGUV Vorschrift 17)",
            rule: Some(criterion_rule(stage, &["Truss", "Rigging"])),
        },
        SeedHazard {
            activity: "Arbeiten am Wasser",
            process: "Veranstaltungsbetrieb",
            hazard: "Ertrinken nach Sturz ins Wasser",
            factors: "Gewässer",
            group: "Sonstige",
            before: (3, 1),
            after: (3, 1),
            measures: [false, true, true, true],
            notes: "Absperrungen, Rettungsringe, Rettungsschwimmer",
            rule: Some(criterion_rule(water, &[])),
        },
    ]
}

/// Load the default criteria and hazard library through the service.
pub(crate) fn seed_catalog(service: &AppService) -> Result<SeedSummary, AppError> {
    let mut ids = Vec::new();
    for draft in seed_criteria() {
        ids.push(service.define_criterion(draft)?.id);
    }
    let [water, event_kind, stage] = <[CriterionId; 3]>::try_from(ids).map_err(|_| {
        AppError::Workflow(AssessmentServiceError::Repository(RepositoryError::Unavailable(
            "criteria seeding incomplete".to_string(),
        )))
    })?;

    let hazards = seed_hazards(&water, &event_kind, &stage);
    let templates = hazards.len();
    for hazard in hazards {
        service.create_template(hazard.into_draft()?)?;
    }

    Ok(SeedSummary {
        criteria: 3,
        templates,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
