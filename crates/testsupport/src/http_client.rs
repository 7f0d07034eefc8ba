use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

pub struct HanaClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HanaClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Logs in and keeps the token for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let body = expect_json(response, "Login").await?;

        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Login response has no access_token: {body}"))?
            .to_string();
        self.token = Some(token.clone());
        Ok(token)
    }

    pub async fn verify(&self) -> Result<Value> {
        let response = self.authed(self.client.get(self.url("/verify"))).send().await?;
        expect_json(response, "Verify").await
    }

    pub async fn create_user(&self, name: &str, password: &str) -> Result<Value> {
        let url = self.url(&format!("/admin/create/{name}/{password}"));
        let response = self.authed(self.client.post(url)).send().await?;
        expect_json(response, "Create user").await
    }

    pub async fn promote(&self, name: &str) -> Result<Value> {
        let url = self.url(&format!("/admin/promote/{name}"));
        let response = self.authed(self.client.post(url)).send().await?;
        expect_json(response, "Promote user").await
    }

    pub async fn delete_user(&self, name: &str) -> Result<Value> {
        let url = self.url(&format!("/admin/delete/{name}"));
        let response = self.authed(self.client.delete(url)).send().await?;
        expect_json(response, "Delete user").await
    }

    pub async fn list_users(&self) -> Result<Value> {
        let response = self
            .authed(self.client.get(self.url("/admin/users")))
            .send()
            .await?;
        expect_json(response, "List users").await
    }

    pub async fn upload_csv(&self, tool: &str, file_name: &str, contents: &[u8]) -> Result<Value> {
        let part = Part::bytes(contents.to_vec())
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let response = self
            .authed(self.client.post(self.url(&format!("/upload/{tool}"))))
            .multipart(form)
            .send()
            .await?;
        expect_json(response, "Upload").await
    }

    pub async fn download_latest(&self, tool: &str) -> Result<Vec<u8>> {
        let response = self
            .authed(self.client.get(self.url(&format!("/download/{tool}/latest"))))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Download failed: {}", error_text);
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn version(&self) -> Result<Value> {
        let response = self.client.get(self.url("/version")).send().await?;
        expect_json(response, "Version").await
    }

    pub async fn health(&self) -> Result<bool> {
        let response = self.client.get(self.url("/healthz")).send().await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// Raw GET for status-code assertions.
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.authed(self.client.get(self.url(path))).send().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn expect_json(response: Response, action: &str) -> Result<Value> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await?;
        anyhow::bail!("{} failed ({}): {}", action, status, error_text);
    }
    Ok(response.json().await?)
}
