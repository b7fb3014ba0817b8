//! Mermaid integration diagrams for one application's neighbourhood.
//!
//! The LLM path generates a flowchart, asks for a check, and adopts at most
//! one correction. `local_diagram` renders the same shape without the LLM.

use anyhow::Context;
use serde::Serialize;
use serde_json::json;

use super::context::{Neighbourhood, NodeRef};
use super::{finish, Assistant, AssistantError};
use crate::seeder::sanitize::strip_code_fences;

const UNVERIFIED_MESSAGE: &str = "Diagram could not be verified even after one correction. Try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagramOutcome {
    Verified { code: String },
    Unverified { code: String, message: String },
}

impl DiagramOutcome {
    pub fn code(&self) -> &str {
        match self {
            DiagramOutcome::Verified { code } | DiagramOutcome::Unverified { code, .. } => code,
        }
    }
}

fn node_id(node: &NodeRef) -> String {
    format!("app_{}", node.id)
}

fn label(text: &str) -> String {
    text.replace('"', "#quot;")
}

fn push_node(node: &NodeRef, lines: &mut Vec<String>) {
    lines.push(format!("  {}[\"{}\"]", node_id(node), label(&node.name)));
    lines.push(format!("  class {} app", node_id(node)));
}

/// Deterministic flowchart of the application and its direct partners.
pub fn local_diagram(hood: &Neighbourhood) -> String {
    let mut lines = vec![
        "flowchart LR".to_string(),
        "  classDef app fill:#f3f0ff,stroke:#7c3aed,stroke-width:2px;".to_string(),
    ];
    let main = node_id(&hood.app);
    push_node(&hood.app, &mut lines);
    for link in &hood.inbound {
        push_node(&link.app, &mut lines);
        lines.push(format!(
            "  {} -->|\"{}\"| {main}",
            node_id(&link.app),
            label(&link.integration_type)
        ));
    }
    for link in &hood.outbound {
        push_node(&link.app, &mut lines);
        lines.push(format!(
            "  {main} -->|\"{}\"| {}",
            label(&link.integration_type),
            node_id(&link.app)
        ));
    }
    lines.join("\n")
}

fn generation_prompt(hood: &Neighbourhood) -> anyhow::Result<String> {
    let data = json!({
        "app": hood.app,
        "inbound": hood.inbound.iter().map(|l| json!({
            "source_app": l.app,
            "integration_type": l.integration_type,
        })).collect::<Vec<_>>(),
        "outbound": hood.outbound.iter().map(|l| json!({
            "target_app": l.app,
            "integration_type": l.integration_type,
        })).collect::<Vec<_>>(),
        "rules": {
            "direction": "flowchart LR",
            "node_id_format": "app_<id>",
            "edges": {
                "inbound": "source -->|integration_type| main",
                "outbound": "main -->|integration_type| target",
            },
        },
    });
    let data = serde_json::to_string(&data).context("serialize diagram context")?;
    Ok(format!(
        "Generate a Mermaid diagram of the integration neighbourhood of a bank application.\n\
         THE OUTPUT MUST BE Mermaid code ONLY (no Markdown ``` fence).\n\n\
         REQUIREMENTS:\n\
         - Start with exactly the line: flowchart LR\n\
         - Use node ids: app_<id>\n\
         - Give node labels as [\"Application name\"]\n\
         - Inbound edges: app_source -->|\"integration_type\"| app_main\n\
         - Outbound edges: app_main -->|\"integration_type\"| app_target\n\n\
         DATA:\n{data}"
    ))
}

fn check_prompt(code: &str) -> String {
    format!(
        "Check the following Mermaid code.\n\
         If it is valid and makes sense as a flowchart, return exactly: OK\n\
         If it is not valid, return the corrected Mermaid code (code only, no ```).\n\n\
         CODE:\n{code}"
    )
}

impl Assistant {
    pub async fn generate_diagram(
        &self,
        client: &str,
        app_id: i64,
    ) -> Result<DiagramOutcome, AssistantError> {
        finish("diagram", self.diagram(client, app_id).await)
    }

    async fn diagram(&self, client: &str, app_id: i64) -> Result<DiagramOutcome, AssistantError> {
        self.acquire("diagram", client)?;

        let hood = self
            .context
            .neighbourhood(app_id)
            .await?
            .ok_or_else(|| AssistantError::NotFound(format!("Application {app_id}")))?;

        let mut code = strip_code_fences(&self.generator.generate(&generation_prompt(&hood)?).await?);
        let check = self.generator.generate(&check_prompt(&code)).await?;
        if check.trim() == "OK" {
            return Ok(DiagramOutcome::Verified { code });
        }

        code = strip_code_fences(&check);
        tracing::info!(app_id, "Diagram check returned a correction");
        let verify = self.generator.generate(&check_prompt(&code)).await?;
        if verify.trim() == "OK" {
            Ok(DiagramOutcome::Verified { code })
        } else {
            tracing::warn!(app_id, "Corrected diagram failed verification");
            Ok(DiagramOutcome::Unverified {
                code,
                message: UNVERIFIED_MESSAGE.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assistant::context::Link;
    use crate::assistant::fixture;
    use crate::llm::stub::ScriptedGenerator;

    const GENERATED: &str = "flowchart LR\n  app_1[\"Core Ledger\"]";

    #[test]
    fn local_diagram_draws_both_directions() {
        let hood = Neighbourhood {
            app: NodeRef { id: 1, name: "Core \"Ledger\"".into() },
            inbound: vec![Link {
                app: NodeRef { id: 3, name: "CRM Suite".into() },
                integration_type: "message".into(),
            }],
            outbound: vec![Link {
                app: NodeRef { id: 2, name: "Fraud Hub".into() },
                integration_type: "API".into(),
            }],
        };
        let code = local_diagram(&hood);
        let lines: Vec<&str> = code.lines().collect();

        assert_eq!(lines[0], "flowchart LR");
        assert!(lines.contains(&"  app_1[\"Core #quot;Ledger#quot;\"]"));
        assert!(lines.contains(&"  app_3 -->|\"message\"| app_1"));
        assert!(lines.contains(&"  app_1 -->|\"API\"| app_2"));
        assert!(lines.contains(&"  class app_2 app"));
    }

    #[tokio::test]
    async fn ok_check_keeps_generated_code() {
        let generator = Arc::new(ScriptedGenerator::replies(vec![GENERATED, "OK"]));
        let assistant = fixture::assistant(generator.clone());

        let outcome = assistant.generate_diagram("10.0.0.1", 1).await.unwrap();
        assert_eq!(outcome, DiagramOutcome::Verified { code: GENERATED.to_string() });
        assert_eq!(generator.calls(), 2);

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("\"name\":\"Fraud Hub\""));
        assert!(prompt.contains("\"name\":\"CRM Suite\""));
    }

    #[tokio::test]
    async fn one_correction_is_adopted() {
        let generator = Arc::new(ScriptedGenerator::replies(vec![
            "graph bad",
            "```\nflowchart LR\n  app_1\n```",
            "OK",
        ]));
        let assistant = fixture::assistant(generator.clone());

        let outcome = assistant.generate_diagram("10.0.0.1", 1).await.unwrap();
        assert_eq!(
            outcome,
            DiagramOutcome::Verified { code: "flowchart LR\n  app_1".to_string() }
        );
        assert!(generator.prompts()[2].ends_with("flowchart LR\n  app_1"));
    }

    #[tokio::test]
    async fn failed_verification_reports_last_correction() {
        let generator = Arc::new(ScriptedGenerator::replies(vec!["graph bad", "flowchart LR\n  x", "still wrong"]));
        let assistant = fixture::assistant(generator.clone());

        let outcome = assistant.generate_diagram("10.0.0.1", 2).await.unwrap();
        match outcome {
            DiagramOutcome::Unverified { code, message } => {
                assert_eq!(code, "flowchart LR\n  x");
                assert_eq!(message, UNVERIFIED_MESSAGE);
            }
            other => panic!("expected unverified, got {other:?}"),
        }
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let generator = Arc::new(ScriptedGenerator::replies(vec![GENERATED]));
        let assistant = fixture::assistant(generator.clone());

        let err = assistant.generate_diagram("10.0.0.1", 42).await.unwrap_err();
        assert_eq!(err.user_message(), "Application 42 not found.");
        assert_eq!(generator.calls(), 0);
    }
}
