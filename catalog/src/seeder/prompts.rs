//! Prompt builders for the seeding phases.

use serde_json::json;

/// How many already-used names an application prompt lists.
pub const AVOID_LIST_LIMIT: usize = 200;

pub fn applications_prompt(n: usize, existing_names: &[String]) -> String {
    let schema = json!({
        "applications": [{
            "name": "string (unique)",
            "domain": "string (Payments|Sales|Risk|CRM|Data|Compliance|Security|CoreBanking)",
            "criticality": "Low|Medium|High",
            "lifecycle": "Active|Legacy|Decommissioning",
            "environment": "DEV|UAT|PROD",
            "region": "string (EU|CZ|DACH|Global)",
            "hosting": "on-prem|cloud|hybrid",
            "tech_stack": "string (comma separated technologies)",
            "runtime": "string (Java|.NET|Python|Node.js|Go)",
            "vendor": "string (Internal|Oracle|Microsoft|SAP|IBM|Temenos)",
            "data_sensitivity": "Low|Medium|High",
            "tech_debt_score": "integer 0-100",
        }]
    });

    let avoid = if existing_names.is_empty() {
        String::new()
    } else {
        let listed = &existing_names[..existing_names.len().min(AVOID_LIST_LIMIT)];
        format!(
            "\n\nDo NOT reuse these names (they already exist):\n{}",
            json!(listed)
        )
    };

    format!(
        "Generate a mock dataset of banking applications.\n\
         Generate EXACTLY {n} applications.\n\
         The OUTPUT MUST BE ONLY valid JSON (no ```).\n\
         Every application must have a unique name.\n\
         Do not write any comments or text outside the JSON.{avoid}\n\n\
         SCHEMA:\n{schema}"
    )
}

pub fn integrations_prompt(n: usize, app_names: &[String]) -> String {
    let schema = json!({
        "integrations": [{
            "source_app_name": "string (must be in provided list)",
            "target_app_name": "string (must be in provided list and different from source)",
            "integration_type": "API|file|message",
            "direction": "sync|async",
            "daily_volume": "integer",
        }]
    });

    format!(
        "Generate integrations between banking applications.\n\
         Generate EXACTLY {n} integrations.\n\
         The OUTPUT MUST BE ONLY valid JSON (no ```).\n\
         - source_app_name and target_app_name MUST be taken verbatim from this list of names.\n\
         - source != target.\n\
         - Do not return any text outside the JSON.\n\n\
         APPLICATIONS:\n{}\n\n\
         SCHEMA:\n{schema}",
        json!(app_names)
    )
}
