use super::EmailMessage;
use crate::config::GraphCredentials;
use crate::error::{BillingError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const GRAPH_API_URL: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Sends mail through Microsoft Graph using the client-credentials flow
pub struct GraphMailer {
    credentials: GraphCredentials,
    client: Client,
    authority_url: String,
    graph_url: String,
}

impl GraphMailer {
    /// Create a new Graph mailer
    pub fn new(credentials: GraphCredentials, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            credentials,
            client,
            authority_url: AUTHORITY_URL.to_string(),
            graph_url: GRAPH_API_URL.to_string(),
        })
    }

    /// Point the mailer at different token and Graph hosts
    pub fn with_endpoints(mut self, authority_url: String, graph_url: String) -> Self {
        self.authority_url = authority_url;
        self.graph_url = graph_url;
        self
    }

    /// Acquire a token and send the message from the configured mailbox
    pub async fn send(&self, message: &EmailMessage) -> Result<()> {
        let token = self.acquire_token().await?;
        self.send_mail(&token, message).await
    }

    /// Exchange client credentials for an access token
    pub async fn acquire_token(&self) -> Result<String> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.credentials.tenant_id
        );

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BillingError::graph(format!(
                "Failed to get Graph token: status {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(access_token),
            _ => Err(BillingError::graph(format!(
                "Failed to get Graph token: {}",
                token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| "response contained no access_token".to_string())
            ))),
        }
    }

    /// POST the message to `/users/{from}/sendMail`
    pub async fn send_mail(&self, token: &str, message: &EmailMessage) -> Result<()> {
        let url = format!(
            "{}/users/{}/sendMail",
            self.graph_url.trim_end_matches('/'),
            self.credentials.from
        );

        let request = SendMailRequest {
            message: GraphMessage {
                subject: message.subject.clone(),
                body: ItemBody {
                    content_type: "HTML".to_string(),
                    content: message.html_body.clone(),
                },
                to_recipients: vec![Recipient::new(&self.credentials.to)],
                from: Recipient::new(&self.credentials.from),
            },
            save_to_sent_items: true,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BillingError::graph(format!(
                "Graph send failed: {} {}",
                status, error_text
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest {
    message: GraphMessage,
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    subject: String,
    body: ItemBody,
    to_recipients: Vec<Recipient>,
    from: Recipient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody {
    content_type: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    email_address: EmailAddress,
}

impl Recipient {
    fn new(address: &str) -> Self {
        Self {
            email_address: EmailAddress {
                address: address.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    address: String,
}
