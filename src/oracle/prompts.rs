//! Prompt texts and response schemas sent to the Oracle

use serde_json::{Value, json};

/// Admission page validation; answers `{"is_valid", "reason", "evidence_snippet"}`
pub const VALIDATE_ADMISSION_PROMPT: &str = r#"You validate pages about new-student ADMISSION TRACKS of an Indonesian university.

Decide whether the content really describes admission tracks for new students.

VALID when it contains at least one of:
- a named admission track (e.g. SNBP, SNBT, Mandiri, Prestasi, Afirmasi, Kerja Sama),
- selection or admission information (requirements, flow, stages, registration mechanism),
- a clear registration period, year or intake wave.

INVALID when it only contains:
- general news or announcements,
- a campus or faculty profile,
- vision and mission,
- articles without admission-track information,
- tuition or fee information,
- capacity or quota information.

Answer strict JSON, no markdown:
{"is_valid": true/false, "reason": "...", "evidence_snippet": "...(<=200 chars)"}"#;

/// Admission schedule extraction; answers a JSON array
pub const EXTRACT_SCHEDULE_PROMPT: &str = r#"You extract NEW-STUDENT REGISTRATION SCHEDULES and ADMISSION TRACKS of an Indonesian university.

Read the schedule / admission content and output EVERY distinct schedule as a SEPARATE object.

RULES
- One schedule = one object.
- When the content lists several tracks, levels or waves, output ALL of them separately.
- Do not merge them. Do not pick only one.
- Do not invent anything that is not in the content.

OUTPUT
- A JSON array only. No schedules -> [].

OBJECT
Required:
- name: full schedule name, may be long,
  e.g. "SNBT Undergraduate Registration Schedule Wave 2 Universitas Airlangga 2026"
Optional:
- registration_start (YYYY-MM-DD)
- registration_end (YYYY-MM-DD)
- academic_year
- wave
- admission_type
- selection_method
- target_level
- description

NOT A SCHEDULE (do not extract): fees, capacity, quota, graduation announcements, news,
tuition, campus profile, vision and mission.
"#;

/// Institution contact sheet rules
pub const CONTACT_RULES: &str = r#"STRICT RULES:
- Do not invent. When the evidence does not show a value, answer "-".
- type: one of ["university","institute","polytechnic","academy","-"]
- status: one of ["state","private","-"]
- accreditation: one of ["A","B","C","U","BA","BS","-"]
- address: short address (street/city/province), else "-"
- postal_code: digits if present, else "-"
- email, phone, whatsapp and social links: URL or handle exactly as written in the evidence, else "-"
- province_name and city_name: the most likely PROVINCE and CITY/REGENCY from the address, else "-"
- No long sentences.

TASK:
From the official campus website evidence, extract the fields below."#;

/// Vision, mission and history rules
pub const NARRATIVE_RULES: &str = r#"STRICT RULES:
- Do not invent. When not found, answer "-".
- vision: concise, one paragraph at most.
- mission: when it is a list, join the points with "; " (no bullets).
- history: one to three concise paragraphs, no navigation noise.

TASK:
Take the campus VISION, MISSION and HISTORY/DESCRIPTION from the evidence text."#;

/// Response schema of the validation prompts
#[must_use]
pub fn verdict_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "is_valid": { "type": "boolean" },
            "reason": { "type": "string" },
            "evidence_snippet": { "type": "string" }
        },
        "required": ["is_valid", "reason", "evidence_snippet"]
    })
}

/// Page text appended to a prompt
#[must_use]
pub fn with_content(prompt: &str, content: &str) -> String {
    format!("{prompt}\n\nCONTENT:\n{content}")
}

/// Field extraction over gathered page text
#[must_use]
pub fn evidence_prompt(rules: &str, text: &str) -> String {
    format!("{rules}\n\n=== EVIDENCE TEXT ===\n{text}")
}

/// Fallback asking the Oracle to open the official site itself
#[must_use]
pub fn browse_prompt(rules: &str, schema: &Value, campus_name: &str, url: &str) -> String {
    format!(
        "You are given the URL of a university website.\n\
         TASK: open the URL and extract the information described by the schema below, accurately.\n\n\
         OUTPUT must be JSON matching the schema, with no other text.\n\n\
         SCHEMA:\n{schema}\n\n\
         RULES:\n{rules}\n\n\
         Context:\n\
         - campus name (from the database): {campus_name}\n\
         - official_url: {url}\n\n\
         URL:\n{url}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_prompt_names_the_site() {
        let prompt = browse_prompt(CONTACT_RULES, &json!({"type": "object"}), "Universitas X", "https://x.ac.id");
        assert!(prompt.contains("official_url: https://x.ac.id"));
        assert!(prompt.contains("Universitas X"));
        assert!(prompt.contains("\"type\":\"object\""));
    }
}
