use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for criterion definitions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CriterionId(pub String);

/// Identifier wrapper for hazard templates in the global library.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

/// Identifier wrapper for event projects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl fmt::Display for CriterionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value shape a criterion accepts on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Boolean,
    Select,
    Multiselect,
}

impl CriterionKind {
    pub const fn label(self) -> &'static str {
        match self {
            CriterionKind::Boolean => "Ja/Nein",
            CriterionKind::Select => "Einzelauswahl",
            CriterionKind::Multiselect => "Mehrfachauswahl",
        }
    }

    pub const fn takes_options(self) -> bool {
        matches!(self, CriterionKind::Select | CriterionKind::Multiselect)
    }
}

/// Grouping used when the intake form lists criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionCategory {
    Location,
    #[default]
    Project,
    Season,
    Custom,
}

impl CriterionCategory {
    pub const fn label(self) -> &'static str {
        match self {
            CriterionCategory::Location => "Veranstaltungsort",
            CriterionCategory::Project => "Projektmerkmale",
            CriterionCategory::Season => "Jahreszeiten",
            CriterionCategory::Custom => "Benutzerdefiniert",
        }
    }
}

/// Administrator-maintained project attribute beyond the fixed site flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub id: CriterionId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CriterionKind,
    #[serde(default)]
    pub category: CriterionCategory,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload used to create or edit a criterion definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CriterionKind,
    #[serde(default)]
    pub category: CriterionCategory,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Project value for a custom criterion. The variant must fit the definition's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionValue {
    Boolean(bool),
    Single(String),
    Multiple(BTreeSet<String>),
}

impl CriterionValue {
    pub fn fits(&self, kind: CriterionKind) -> bool {
        matches!(
            (self, kind),
            (CriterionValue::Boolean(_), CriterionKind::Boolean)
                | (CriterionValue::Single(_), CriterionKind::Select)
                | (CriterionValue::Multiple(_), CriterionKind::Multiselect)
        )
    }
}

/// The seven built-in yes/no characteristics captured for every project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteFlag {
    HasElectricity,
    HasGenerator,
    HasWorkAbove2m,
    HasPublicAccess,
    HasNightWork,
    HasTrafficArea,
    HasHazardousMaterials,
}

impl SiteFlag {
    pub const ALL: [SiteFlag; 7] = [
        SiteFlag::HasElectricity,
        SiteFlag::HasGenerator,
        SiteFlag::HasWorkAbove2m,
        SiteFlag::HasPublicAccess,
        SiteFlag::HasNightWork,
        SiteFlag::HasTrafficArea,
        SiteFlag::HasHazardousMaterials,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SiteFlag::HasElectricity => "Elektrische Anlagen vorhanden",
            SiteFlag::HasGenerator => "Generatoren/Notstromaggregate",
            SiteFlag::HasWorkAbove2m => "Arbeiten über 2m Höhe",
            SiteFlag::HasPublicAccess => "Publikumsverkehr",
            SiteFlag::HasNightWork => "Nachtarbeit",
            SiteFlag::HasTrafficArea => "Verkehrsflächen betroffen",
            SiteFlag::HasHazardousMaterials => "Gefahrstoffe",
        }
    }
}

/// Descriptive answers from the project intake form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectAttributes {
    pub is_outdoor: bool,
    pub has_electricity: bool,
    pub has_generator: bool,
    pub has_work_above_2m: bool,
    pub has_public_access: bool,
    pub has_night_work: bool,
    pub has_traffic_area: bool,
    pub has_hazardous_materials: bool,
    pub custom_criteria: BTreeMap<CriterionId, CriterionValue>,
}

impl ProjectAttributes {
    pub fn flag(&self, flag: SiteFlag) -> bool {
        match flag {
            SiteFlag::HasElectricity => self.has_electricity,
            SiteFlag::HasGenerator => self.has_generator,
            SiteFlag::HasWorkAbove2m => self.has_work_above_2m,
            SiteFlag::HasPublicAccess => self.has_public_access,
            SiteFlag::HasNightWork => self.has_night_work,
            SiteFlag::HasTrafficArea => self.has_traffic_area,
            SiteFlag::HasHazardousMaterials => self.has_hazardous_materials,
        }
    }

    pub fn set_flag(&mut self, flag: SiteFlag, value: bool) {
        let slot = match flag {
            SiteFlag::HasElectricity => &mut self.has_electricity,
            SiteFlag::HasGenerator => &mut self.has_generator,
            SiteFlag::HasWorkAbove2m => &mut self.has_work_above_2m,
            SiteFlag::HasPublicAccess => &mut self.has_public_access,
            SiteFlag::HasNightWork => &mut self.has_night_work,
            SiteFlag::HasTrafficArea => &mut self.has_traffic_area,
            SiteFlag::HasHazardousMaterials => &mut self.has_hazardous_materials,
        };
        *slot = value;
    }
}

/// Meteorological season derived from the event month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const fn label(self) -> &'static str {
        match self {
            Season::Spring => "Frühling",
            Season::Summer => "Sommer",
            Season::Autumn => "Herbst",
            Season::Winter => "Winter",
        }
    }
}

/// Auto-selection predicate attached to a hazard template.
///
/// `is_outdoor` is tri-state. Site flags can only be required, never forbidden.
/// An empty rule never matches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_outdoor: Option<bool>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub required_flags: BTreeSet<SiteFlag>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub seasons: BTreeSet<Season>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_criteria: Vec<CriterionId>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_criteria_values: BTreeMap<CriterionId, BTreeSet<String>>,
}

impl SelectionRule {
    pub fn is_empty(&self) -> bool {
        self.is_outdoor.is_none()
            && self.required_flags.is_empty()
            && self.seasons.is_empty()
            && self.custom_criteria.is_empty()
    }

    pub fn references(&self, criterion: &CriterionId) -> bool {
        self.custom_criteria.contains(criterion)
    }
}

/// Severity or probability on the 1 to 3 scale used by the assessment sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskFactor(u8);

impl RiskFactor {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn new(value: u8) -> Result<Self, RiskFactorError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RiskFactorError { value })
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RiskFactor {
    type Error = RiskFactorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RiskFactor> for u8 {
    fn from(value: RiskFactor) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("risk factor {value} outside 1..=3")]
pub struct RiskFactorError {
    pub value: u8,
}

/// Severity/probability pair for one side of the mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRating {
    pub severity: RiskFactor,
    pub probability: RiskFactor,
}

/// STOP hierarchy of protective measures with free-text notes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectiveMeasures {
    pub substitution: bool,
    pub technical: bool,
    pub organizational: bool,
    pub personal: bool,
    pub notes: String,
}

/// Reusable hazard assessment maintained in the global library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardTemplate {
    pub id: TemplateId,
    pub activity: String,
    #[serde(default)]
    pub process: String,
    pub hazard: String,
    #[serde(default)]
    pub hazard_factors: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub before: RiskRating,
    pub after: RiskRating,
    #[serde(default)]
    pub measures: ProtectiveMeasures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_rule: Option<SelectionRule>,
}

/// Payload used to create or edit a hazard template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardTemplateDraft {
    pub activity: String,
    #[serde(default)]
    pub process: String,
    pub hazard: String,
    #[serde(default)]
    pub hazard_factors: String,
    #[serde(default)]
    pub group: Option<String>,
    pub before: RiskRating,
    pub after: RiskRating,
    #[serde(default)]
    pub measures: ProtectiveMeasures,
    #[serde(default)]
    pub selection_rule: Option<SelectionRule>,
}

impl HazardTemplateDraft {
    pub fn into_template(self, id: TemplateId) -> HazardTemplate {
        HazardTemplate {
            id,
            activity: self.activity,
            process: self.process,
            hazard: self.hazard,
            hazard_factors: self.hazard_factors,
            group: self.group,
            before: self.before,
            after: self.after,
            measures: self.measures,
            selection_rule: self.selection_rule,
        }
    }
}

/// Build-up and event dates entered on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchedule {
    pub build_up_start: NaiveDate,
    pub build_up_end: NaiveDate,
    pub event_start: NaiveDate,
    pub event_end: NaiveDate,
}

/// Intake form submission for a new event project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSubmission {
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub schedule: EventSchedule,
    #[serde(default)]
    pub attributes: ProjectAttributes,
}

/// Lifecycle stage of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Active,
    Archived,
}

impl ProjectStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "Entwurf",
            ProjectStatus::Active => "Aktiv",
            ProjectStatus::Archived => "Archiviert",
        }
    }
}

/// Person briefed on site, optionally confirmed by signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ParticipantSignature>,
}

impl Participant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_signed(&self) -> bool {
        self.signature.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSignature {
    /// Encoded signature image as captured by the client.
    pub data: String,
    pub signed_at: DateTime<Utc>,
}

/// Participant details entered by the project manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDraft {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
