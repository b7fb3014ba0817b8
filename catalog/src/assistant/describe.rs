use super::{finish, Assistant, AssistantError};

impl Assistant {
    /// Short generated description of one application.
    pub async fn describe_application(
        &self,
        client: &str,
        app_id: i64,
    ) -> Result<String, AssistantError> {
        finish("describe", self.describe(client, app_id).await)
    }

    async fn describe(&self, client: &str, app_id: i64) -> Result<String, AssistantError> {
        self.acquire("describe", client)?;

        let app = self
            .context
            .applications(&[app_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::NotFound(format!("Application {app_id}")))?;

        let prompt = format!(
            "Write a short professional description of the banking application '{}'. \
             Max 5 sentences. Focus on purpose, functions and integrations.",
            app.name
        );
        Ok(self.generator.generate(&prompt).await?.trim().to_string())
    }
}
