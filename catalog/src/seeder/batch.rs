//! Batched generation loop over an unreliable text generator.
//!
//! Items are requested in small batches until the target is reached or the
//! attempt ceiling is hit. A failed attempt (completion error, unparseable
//! reply) yields zero items and the loop moves on; it never aborts.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::fields;
use super::prompts;
use super::sanitize::{parse_robust, ResponseError};
use crate::llm::TextGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub target: usize,
    pub batch_size: usize,
    pub max_attempts: usize,
}

/// What to do with one generated item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Keep unless an item with the same key was already collected.
    Key(String),
    /// Keep unconditionally.
    Always,
    Drop,
}

pub trait BatchSource {
    /// Phase label used in logs and metrics.
    fn phase(&self) -> &'static str;
    fn prompt(&self, n: usize, collected: &[Value]) -> String;
    /// The generated records inside a parsed reply.
    fn items(&self, document: Map<String, Value>) -> Vec<Value>;
    fn admit(&self, item: &Value) -> Admission;
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub items: Vec<Value>,
    pub attempts: usize,
}

pub async fn run_batches<S: BatchSource + ?Sized>(
    plan: BatchPlan,
    source: &S,
    generator: &dyn TextGenerator,
) -> BatchOutcome {
    let phase = source.phase();
    let mut collected: Vec<Value> = Vec::with_capacity(plan.target);
    let mut seen: HashSet<String> = HashSet::new();
    let mut attempts = 0;

    while collected.len() < plan.target && attempts < plan.max_attempts {
        attempts += 1;
        let n = plan.batch_size.min(plan.target - collected.len());
        let prompt = source.prompt(n, &collected);

        let batch = match request_batch(&prompt, source, generator).await {
            Ok(batch) => batch,
            Err(ResponseError::Completion(e)) => {
                crate::metrics::seed_attempt(phase, "completion_error");
                tracing::error!(phase, attempt = attempts, "LLM {phase} attempt {attempts} failed: {e}");
                continue;
            }
            Err(e) => {
                crate::metrics::seed_attempt(phase, "parse_error");
                tracing::error!(phase, attempt = attempts, "{phase} attempt {attempts} parse error: {e}");
                continue;
            }
        };

        let before = collected.len();
        for item in batch {
            if collected.len() >= plan.target {
                break;
            }
            match source.admit(&item) {
                Admission::Key(key) => {
                    if seen.insert(key) {
                        collected.push(item);
                    }
                }
                Admission::Always => collected.push(item),
                Admission::Drop => {}
            }
        }

        let gained = collected.len() - before;
        crate::metrics::seed_attempt(phase, "ok");
        crate::metrics::seed_items(phase, gained);
        tracing::info!(
            phase,
            attempt = attempts,
            max_attempts = plan.max_attempts,
            requested = n,
            gained,
            total = collected.len(),
            target_count = plan.target,
            "{phase} attempt {attempts}/{}: requested {n}, gained {gained}, total {}/{}",
            plan.max_attempts,
            collected.len(),
            plan.target
        );
    }

    BatchOutcome {
        items: collected,
        attempts,
    }
}

async fn request_batch<S: BatchSource + ?Sized>(
    prompt: &str,
    source: &S,
    generator: &dyn TextGenerator,
) -> Result<Vec<Value>, ResponseError> {
    let raw = generator.generate(prompt).await?;
    let document = parse_robust(raw.trim(), generator).await?;
    Ok(source.items(document))
}

fn take_array(document: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    match document.remove(key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Applications, de-duplicated by case-folded name.
pub struct ApplicationSource;

impl BatchSource for ApplicationSource {
    fn phase(&self) -> &'static str {
        "applications"
    }

    fn prompt(&self, n: usize, collected: &[Value]) -> String {
        let names: Vec<String> = collected.iter().filter_map(fields::application_name).collect();
        prompts::applications_prompt(n, &names)
    }

    fn items(&self, mut document: Map<String, Value>) -> Vec<Value> {
        take_array(&mut document, "applications").unwrap_or_default()
    }

    fn admit(&self, item: &Value) -> Admission {
        match fields::application_key(item) {
            Some(key) => Admission::Key(key),
            None => Admission::Drop,
        }
    }
}

/// Integrations between the given applications. Repeated edges are kept;
/// the upsert key absorbs exact repeats later.
pub struct IntegrationSource {
    pub app_names: Vec<String>,
}

impl BatchSource for IntegrationSource {
    fn phase(&self) -> &'static str {
        "integrations"
    }

    fn prompt(&self, n: usize, _collected: &[Value]) -> String {
        prompts::integrations_prompt(n, &self.app_names)
    }

    fn items(&self, mut document: Map<String, Value>) -> Vec<Value> {
        // A bare top-level array arrives wrapped under "applications".
        take_array(&mut document, "integrations")
            .or_else(|| take_array(&mut document, "applications"))
            .unwrap_or_default()
    }

    fn admit(&self, _item: &Value) -> Admission {
        Admission::Always
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::ScriptedGenerator;
    use crate::llm::CompletionError;

    fn plan(target: usize, batch_size: usize, max_attempts: usize) -> BatchPlan {
        BatchPlan {
            target,
            batch_size,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn case_and_space_variants_collapse_to_one() {
        let generator = ScriptedGenerator::replies(vec![
            r#"{"applications": [{"name": "X"}, {"name": " x "}, {"name": ""}, {"domain": "Risk"}]}"#,
        ]);
        let outcome = run_batches(plan(2, 4, 1), &ApplicationSource, &generator).await;
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0]["name"], "X");
    }

    #[tokio::test]
    async fn duplicates_across_batches_are_rejected() {
        let generator = ScriptedGenerator::replies(vec![
            r#"{"applications": [{"name": "Core Ledger"}]}"#,
            r#"{"applications": [{"name": "core  ledger"}, {"name": "Fraud Hub"}]}"#,
        ]);
        let outcome = run_batches(plan(2, 1, 5), &ApplicationSource, &generator).await;
        let names: Vec<&str> = outcome.items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Core Ledger", "Fraud Hub"]);
        assert_eq!(outcome.attempts, 2);
        assert!(generator.prompts()[1].contains("\"Core Ledger\""));
    }

    #[tokio::test]
    async fn attempts_never_exceed_ceiling() {
        let generator = ScriptedGenerator::failing();
        let outcome = run_batches(plan(10, 4, 5), &ApplicationSource, &generator).await;
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.attempts, 5);
        assert_eq!(generator.calls(), 5);
    }

    #[tokio::test]
    async fn over_delivery_is_truncated_to_target() {
        let generator = ScriptedGenerator::replies(vec![
            r#"{"applications": [{"name": "A"}, {"name": "B"}, {"name": "C"}, {"name": "D"}, {"name": "E"}]}"#,
        ]);
        let outcome = run_batches(plan(3, 8, 4), &ApplicationSource, &generator).await;
        let names: Vec<&str> = outcome.items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn broken_reply_is_recovered_by_repair() {
        // A bare array of objects slices to an invalid object span.
        let generator = ScriptedGenerator::replies(vec![
            r#"[{"name": "A"}, {"name": "B"}]"#,
            r#"{"applications": [{"name": "A"}, {"name": "B"}]}"#,
        ]);
        let outcome = run_batches(plan(2, 2, 1), &ApplicationSource, &generator).await;
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(generator.calls(), 2);
        assert!(generator.prompts()[1].contains("VALID JSON"));
    }

    #[tokio::test]
    async fn failed_attempt_does_not_abort_loop() {
        let generator = ScriptedGenerator::new(|call, _| match call {
            0 => Err(CompletionError::Timeout { secs: 60 }),
            1 => Ok("I cannot help with that".to_string()),
            _ => Ok(r#"{"applications": [{"name": "A"}, {"name": "B"}]}"#.to_string()),
        });
        let outcome = run_batches(plan(2, 2, 5), &ApplicationSource, &generator).await;
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn integrations_keep_repeated_edges() {
        let reply = r#"{"integrations": [
            {"source_app_name": "A", "target_app_name": "B"},
            {"source_app_name": "A", "target_app_name": "B"}
        ]}"#;
        let generator = ScriptedGenerator::new(move |_, _| Ok(reply.to_string()));
        let source = IntegrationSource {
            app_names: vec!["A".to_string(), "B".to_string()],
        };
        let outcome = run_batches(plan(3, 2, 2), &source, &generator).await;
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.attempts, 2);
        assert!(generator.prompts()[1].contains("Generate EXACTLY 1 integrations."));
    }
}
