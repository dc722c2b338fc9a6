//! Safety briefing ("Sicherheitsunterweisung") rendered as Markdown.

use std::fmt::Write;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::HazardTemplate;
use super::repository::ProjectRecord;

pub const DEFAULT_COUNTRY: &str = "Deutschland";

/// Emergency numbers for one country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmergencyNumbers {
    pub country: &'static str,
    pub fire: &'static str,
    pub first_aid: &'static str,
    pub police: &'static str,
    pub is_eu: bool,
}

const fn numbers(
    country: &'static str,
    fire: &'static str,
    first_aid: &'static str,
    police: &'static str,
    is_eu: bool,
) -> EmergencyNumbers {
    EmergencyNumbers {
        country,
        fire,
        first_aid,
        police,
        is_eu,
    }
}

pub const EMERGENCY_NUMBERS: [EmergencyNumbers; 18] = [
    numbers("Deutschland", "112", "112", "110", true),
    numbers("Österreich", "122", "144", "133", true),
    numbers("Schweiz", "118", "144", "117", false),
    numbers("Frankreich", "18", "15", "17", true),
    numbers("Italien", "115", "118", "113", true),
    numbers("Spanien", "080", "061", "091", true),
    numbers("Griechenland", "199", "166", "100", true),
    numbers("Niederlande", "112", "112", "112", true),
    numbers("Belgien", "112", "112", "101", true),
    numbers("Polen", "998", "999", "997", true),
    numbers("Tschechien", "150", "155", "158", true),
    numbers("Dänemark", "112", "112", "114", true),
    numbers("Schweden", "112", "112", "112", true),
    numbers("Norwegen", "110", "113", "112", false),
    numbers("Finnland", "112", "112", "112", true),
    numbers("Großbritannien", "999", "999", "999", false),
    numbers("USA", "911", "911", "911", false),
    numbers("Kanada", "911", "911", "911", false),
];

/// Look up the numbers for `country`, falling back to Germany.
pub fn emergency_numbers(country: &str) -> EmergencyNumbers {
    EMERGENCY_NUMBERS
        .iter()
        .find(|entry| entry.country.eq_ignore_ascii_case(country.trim()))
        .copied()
        .unwrap_or(EMERGENCY_NUMBERS[0])
}

/// Organisation details filled in by the project manager before the briefing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefingOptions {
    pub country: Option<String>,
    pub project_manager: Option<String>,
    pub safety_officer: Option<String>,
    pub emergency_contact: Option<String>,
    pub additional_notes: Option<String>,
    pub date: Option<NaiveDate>,
}

fn or_placeholder<'a>(value: &'a Option<String>, placeholder: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(placeholder)
}

fn date_de(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Render the briefing for `project` covering the resolved `hazards`.
pub fn render_briefing(
    project: &ProjectRecord,
    hazards: &[HazardTemplate],
    options: &BriefingOptions,
    today: NaiveDate,
    default_country: &str,
) -> String {
    let country = options.country.as_deref().unwrap_or(default_country);
    let emergency = emergency_numbers(country);
    let date = options.date.unwrap_or(today);
    let mut out = String::new();

    writeln!(&mut out, "# SICHERHEITSUNTERWEISUNG").expect("write title");
    writeln!(&mut out, "## {}\n", project.title).expect("write project title");
    writeln!(&mut out, "**Datum:** {}", date_de(date)).expect("write date");
    writeln!(&mut out, "**Ort:** {}", project.location).expect("write location");
    writeln!(
        &mut out,
        "**Veranstaltungszeitraum:** {} - {}\n",
        date_de(project.schedule.event_start),
        date_de(project.schedule.event_end)
    )
    .expect("write event period");

    writeln!(&mut out, "---\n\n## ORGANISATION\n").expect("write organisation heading");
    writeln!(
        &mut out,
        "**Projektleitung:** {}",
        or_placeholder(&options.project_manager, "[Name eintragen]")
    )
    .expect("write project manager");
    writeln!(
        &mut out,
        "**Sicherheitsbeauftragte/r:** {}",
        or_placeholder(&options.safety_officer, "[Name eintragen]")
    )
    .expect("write safety officer");
    writeln!(
        &mut out,
        "**Notfallkontakt:** {}\n",
        or_placeholder(&options.emergency_contact, "[Telefonnummer eintragen]")
    )
    .expect("write emergency contact");

    out.push_str("---\n\n## IDENTIFIZIERTE GEFÄHRDUNGEN UND SCHUTZMAßNAHMEN\n\n");
    if hazards.is_empty() {
        out.push_str("_Keine Gefährdungen ausgewählt._\n\n");
    }
    for (index, hazard) in hazards.iter().enumerate() {
        writeln!(&mut out, "### {}. {}\n", index + 1, hazard.activity).expect("write hazard");
        writeln!(&mut out, "**Gefährdung:** {}\n", hazard.hazard).expect("write hazard text");
        out.push_str("**Schutzmaßnahmen:**\n");
        let measures = &hazard.measures;
        if measures.substitution {
            out.push_str("- **Substitution:** Gefährliche Stoffe/Verfahren durch weniger ");
            out.push_str("gefährliche ersetzen\n");
        }
        if measures.technical {
            out.push_str("- **Technische Maßnahmen:** Technische Schutzeinrichtungen verwenden\n");
        }
        if measures.organizational {
            out.push_str(
                "- **Organisatorische Maßnahmen:** Arbeitsabläufe und -anweisungen beachten\n",
            );
        }
        if measures.personal {
            out.push_str("- **Persönliche Schutzausrüstung:** Vorgeschriebene PSA tragen\n");
        }
        if !measures.notes.trim().is_empty() {
            writeln!(&mut out, "- **Zusätzliche Maßnahmen:** {}", measures.notes.trim())
                .expect("write measure notes");
        }
        writeln!(
            &mut out,
            "\n**Risikobewertung:** {} → **Restrisiko:** {}\n",
            hazard.risk_value(),
            hazard.residual_risk()
        )
        .expect("write risk values");
    }

    out.push_str("---\n\n## NOTFALL UND RÄUMUNG\n\n");
    writeln!(&mut out, "### Notfallnummern ({})", emergency.country).expect("write country");
    writeln!(&mut out, "- **Feuerwehr:** {}", emergency.fire).expect("write fire number");
    writeln!(&mut out, "- **Rettungsdienst/Notarzt:** {}", emergency.first_aid)
        .expect("write first aid number");
    writeln!(&mut out, "- **Polizei:** {}", emergency.police).expect("write police number");
    if emergency.is_eu {
        out.push_str("\n**EU-weite Notrufnummer:** 112 (Feuerwehr und Rettungsdienst)\n");
    }
    out.push('\n');

    if let Some(notes) = options
        .additional_notes
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
    {
        writeln!(&mut out, "---\n\n## ZUSÄTZLICHE HINWEISE\n\n{notes}\n").expect("write notes");
    }

    out.push_str("---\n\n## TEILNEHMER\n\n");
    out.push_str("| Name | Firma | Unterschrift |\n");
    out.push_str("| --- | --- | --- |\n");
    for participant in &project.participants {
        let signed = participant
            .signature
            .as_ref()
            .map(|signature| {
                format!(
                    "unterschrieben {}",
                    signature.signed_at.format("%d.%m.%Y %H:%M")
                )
            })
            .unwrap_or_else(|| "offen".to_string());
        writeln!(
            &mut out,
            "| {} | {} | {} |",
            participant.full_name(),
            participant.company.as_deref().unwrap_or("-"),
            signed
        )
        .expect("write participant row");
    }

    out
}
