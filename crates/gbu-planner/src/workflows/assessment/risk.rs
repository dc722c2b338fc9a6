use serde::{Deserialize, Serialize};

use super::domain::{HazardTemplate, RiskRating, TemplateId};

/// Risk value on the S²×W scale (1 to 27).
pub fn risk_value(rating: &RiskRating) -> u16 {
    let severity = u16::from(rating.severity.get());
    let probability = u16::from(rating.probability.get());
    severity * severity * probability
}

impl HazardTemplate {
    pub fn risk_value(&self) -> u16 {
        risk_value(&self.before)
    }

    pub fn residual_risk(&self) -> u16 {
        risk_value(&self.after)
    }
}

/// Traffic-light band of a risk value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn from_value(value: u16) -> Self {
        match value {
            0..=4 => RiskLevel::Low,
            5..=8 => RiskLevel::Medium,
            9..=16 => RiskLevel::High,
            _ => RiskLevel::VeryHigh,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Niedrig",
            RiskLevel::Medium => "Mittel",
            RiskLevel::High => "Hoch",
            RiskLevel::VeryHigh => "Sehr hoch",
        }
    }
}

/// Per-assessment line of a project risk summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentRiskLine {
    pub template_id: TemplateId,
    pub activity: String,
    pub risk_value: u16,
    pub risk_level: RiskLevel,
    pub residual_risk: u16,
    pub residual_level: RiskLevel,
}

/// Totals over the assessments selected for a project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectRiskSummary {
    pub assessment_count: usize,
    pub total_risk: u32,
    pub total_residual_risk: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_residual_level: Option<RiskLevel>,
    pub lines: Vec<AssessmentRiskLine>,
    /// Selected ids whose template no longer exists in the library.
    pub missing_templates: Vec<TemplateId>,
}

impl ProjectRiskSummary {
    /// Build totals for `selected`, resolving each id through `lookup`.
    pub fn build<'a, F>(selected: &[TemplateId], mut lookup: F) -> Self
    where
        F: FnMut(&TemplateId) -> Option<&'a HazardTemplate>,
    {
        let mut summary = ProjectRiskSummary::default();

        for id in selected {
            let Some(template) = lookup(id) else {
                summary.missing_templates.push(id.clone());
                continue;
            };

            let risk = template.risk_value();
            let residual = template.residual_risk();
            let residual_level = RiskLevel::from_value(residual);

            summary.total_risk += u32::from(risk);
            summary.total_residual_risk += u32::from(residual);
            summary.highest_residual_level =
                summary.highest_residual_level.max(Some(residual_level));
            summary.lines.push(AssessmentRiskLine {
                template_id: template.id.clone(),
                activity: template.activity.clone(),
                risk_value: risk,
                risk_level: RiskLevel::from_value(risk),
                residual_risk: residual,
                residual_level,
            });
        }

        summary.assessment_count = summary.lines.len();
        summary
    }

    /// Share of the initial risk removed by the protective measures, in percent.
    pub fn reduction_percent(&self) -> u8 {
        if self.total_risk == 0 {
            return 0;
        }
        let removed = self.total_risk.saturating_sub(self.total_residual_risk);
        ((removed as f64 / self.total_risk as f64) * 100.0).round() as u8
    }
}
