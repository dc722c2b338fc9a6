use serde::{Deserialize, Serialize};

use super::super::domain::{CriterionId, Season, SiteFlag, TemplateId};

/// First rule component that prevented an auto-selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleMismatch {
    NoRule,
    EmptyRule,
    Location { required_outdoor: bool },
    MissingFlag { flag: SiteFlag },
    Season { actual: Season },
    NoCustomCriteria,
    UnknownCriterion { criterion: CriterionId },
    CriterionUnset { criterion: CriterionId },
    CriterionShape { criterion: CriterionId },
    NoAcceptedOption { criterion: CriterionId },
}

impl RuleMismatch {
    pub fn summary(&self) -> String {
        match self {
            RuleMismatch::NoRule => "template has no selection rule".to_string(),
            RuleMismatch::EmptyRule => "selection rule sets no conditions".to_string(),
            RuleMismatch::Location { required_outdoor } => {
                if *required_outdoor {
                    "rule requires an outdoor venue".to_string()
                } else {
                    "rule requires an indoor venue".to_string()
                }
            }
            RuleMismatch::MissingFlag { flag } => format!("project lacks {:?}", flag),
            RuleMismatch::Season { actual } => {
                format!("event season {:?} not covered by rule", actual)
            }
            RuleMismatch::NoCustomCriteria => {
                "rule requires custom criteria but project has none".to_string()
            }
            RuleMismatch::UnknownCriterion { criterion } => {
                format!("criterion {criterion} is not defined")
            }
            RuleMismatch::CriterionUnset { criterion } => {
                format!("criterion {criterion} not set on project")
            }
            RuleMismatch::CriterionShape { criterion } => {
                format!("value for criterion {criterion} does not fit its type")
            }
            RuleMismatch::NoAcceptedOption { criterion } => {
                format!("no selected option of criterion {criterion} is accepted by the rule")
            }
        }
    }
}

/// Template left out of an auto-selection run together with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTemplate {
    pub template_id: TemplateId,
    pub reason: RuleMismatch,
}

/// Result of running the matcher over a template library.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutoSelection {
    pub selected: Vec<TemplateId>,
    pub skipped: Vec<SkippedTemplate>,
}

impl AutoSelection {
    pub fn is_selected(&self, id: &TemplateId) -> bool {
        self.selected.contains(id)
    }
}
