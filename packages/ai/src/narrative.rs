//! Ward narrative prompt construction and response extraction.
//!
//! Models are asked for strict JSON but routinely wrap it in prose or
//! markdown fences, so extraction scans for the first balanced-brace
//! span rather than parsing the whole response body.

use std::fmt::Write as _;

use aqi_monitor_air_models::{NarrativeAnalysis, PollutantReading, WardIdentity};

use crate::AiError;

/// Maximum length of the response preview included in parse errors.
const PREVIEW_LEN: usize = 200;

/// The JSON shape the generator is asked to produce for one ward.
const ANALYSIS_SCHEMA: &str = r#"{
  "source_breakdown": [
    {
      "source": "<emission source>",
      "contribution_percent": <number, all entries summing to 100>,
      "major_pollutant": "<pollutant>",
      "impact_if_removed": "<expected AQI change>",
      "citizen_mitigation": "<what citizens can do>",
      "govt_mitigation": "<what the administration can do>"
    }
  ],
  "impact_summary": "<2-3 sentence health and livability summary>",
  "active_policies": "<policies currently in force for this area>",
  "policy_recommendations": [
    {
      "policy_name": "<short name>",
      "description": "<what the policy entails>",
      "estimated_effects": {
        "pollution": "<effect on pollution>",
        "socio_economic": "<socio-economic effect>",
        "workforce_productivity": "<productivity effect>"
      }
    }
  ]
}"#;

fn format_reading(reading: &PollutantReading) -> String {
    let mut parts = Vec::new();
    let mut push = |name: &str, value: Option<f64>, unit: &str| {
        if let Some(v) = value {
            parts.push(format!("{name}: {v:.1} {unit}"));
        }
    };
    push("PM2.5", reading.pm2_5, "µg/m³");
    push("PM10", reading.pm10, "µg/m³");
    push("NO2", reading.no2, "µg/m³");
    push("SO2", reading.so2, "µg/m³");
    push("CO", reading.co, "mg/m³");
    push("O3", reading.o3, "µg/m³");

    if parts.is_empty() {
        "no pollutant readings available".to_string()
    } else {
        parts.join(", ")
    }
}

/// Builds the single-ward generation prompt.
#[must_use]
pub fn build_ward_prompt(ward_name: &str, aqi: i64, reading: &PollutantReading) -> String {
    format!(
        "You are an air-quality policy analyst for the Delhi municipal region.\n\
         Analyze the pollution situation for the ward \"{ward_name}\".\n\
         Current AQI: {aqi}. Measured concentrations: {concentrations}.\n\n\
         Respond with ONLY a single JSON object, no markdown fences and no \
         commentary, matching exactly this shape:\n{ANALYSIS_SCHEMA}\n\n\
         Ground every figure in the measurements above. Include 3-4 entries \
         in source_breakdown and 2-3 policy_recommendations.",
        concentrations = format_reading(reading),
    )
}

/// Builds the batched generation prompt for the bulk refresh job.
///
/// Wards without a stored pollutant snapshot are listed without
/// concentrations; the model is asked to skip any ward it cannot
/// analyze rather than invent data.
#[must_use]
pub fn build_batch_prompt(wards: &[(WardIdentity, Option<PollutantReading>)]) -> String {
    let mut listing = String::new();
    for (ward, reading) in wards {
        let concentrations = reading
            .as_ref()
            .map_or_else(|| "no recent readings".to_string(), format_reading);
        let _ = writeln!(
            listing,
            "- ward_id \"{}\" ({}): {concentrations}",
            ward.ward_id, ward.ward_name
        );
    }

    format!(
        "You are an air-quality policy analyst for the Delhi municipal region.\n\
         Produce a pollution analysis for EACH of the following wards:\n\
         {listing}\n\
         Respond with ONLY a JSON array, no markdown fences and no commentary. \
         Each element must be an object of the form \
         {{\"ward_id\": \"<id>\", \"analysis\": <analysis object>}} where the \
         analysis object matches exactly this shape:\n{ANALYSIS_SCHEMA}\n\n\
         Skip any ward you cannot analyze instead of inventing data."
    )
}

/// Returns the first balanced-brace JSON object span in `text`.
///
/// Scans character-by-character, tracking string literals and escapes so
/// braces inside strings don't unbalance the span.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_balanced(text, '{', '}')
}

/// Returns the first balanced-bracket JSON array span in `text`.
#[must_use]
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_balanced(text, '[', ']')
}

fn extract_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=start + offset]);
            }
        }
    }

    None
}

/// Parses a generation response into a [`NarrativeAnalysis`].
///
/// Extracts the first balanced JSON object from the response and
/// rejects error-flagged objects, so callers can treat any `Err` as a
/// generation failure and fall back.
///
/// # Errors
///
/// Returns [`AiError::Unparsable`] when no balanced JSON object exists
/// or it doesn't deserialize; [`AiError::Provider`] when the object
/// carries an `error` field.
pub fn parse_analysis(response: &str) -> Result<NarrativeAnalysis, AiError> {
    let preview = || {
        let trimmed = response.trim();
        let end = trimmed
            .char_indices()
            .nth(PREVIEW_LEN)
            .map_or(trimmed.len(), |(idx, _)| idx);
        trimmed[..end].to_string()
    };

    let span = extract_json_object(response).ok_or_else(|| AiError::Unparsable {
        preview: preview(),
    })?;

    let analysis: NarrativeAnalysis =
        serde_json::from_str(span).map_err(|_| AiError::Unparsable {
            preview: preview(),
        })?;

    if let Some(message) = &analysis.error {
        return Err(AiError::Provider {
            message: message.clone(),
        });
    }

    Ok(analysis)
}

/// A fixed analysis served when generation fails and nothing is cached.
///
/// Every text field carries "pending" copy — downstream renderers
/// assume these fields always exist and are non-empty.
#[must_use]
pub fn placeholder_analysis() -> NarrativeAnalysis {
    NarrativeAnalysis {
        source_breakdown: Vec::new(),
        impact_summary: "Detailed analysis is pending for this ward. Please check back shortly."
            .to_string(),
        active_policies: "Policy data is being compiled for this ward.".to_string(),
        policy_recommendations: Vec::new(),
        is_offline_data: None,
        error: Some("analysis_pending".to_string()),
    }
}

/// Builds a copy of a cached analysis tagged as offline data.
///
/// Constructs a new value instead of mutating the cached one, so the
/// stored record is never altered by serving it.
#[must_use]
pub fn mark_offline(analysis: &NarrativeAnalysis) -> NarrativeAnalysis {
    NarrativeAnalysis {
        is_offline_data: Some(true),
        ..analysis.clone()
    }
}
