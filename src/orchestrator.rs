use crate::billing::{build_report, BillingReport, CompletionFilter, Pricing};
use crate::config::Config;
use crate::epics::client::EpicsClient;
use crate::epics::{StatusTable, Story};
use crate::error::Result;
use crate::mail::graph::GraphMailer;
use crate::mail::EmailMessage;

/// Orchestrator for coordinating the billing workflow
pub struct Orchestrator {
    config: Config,
    epics: EpicsClient,
    filter: CompletionFilter,
    pricing: Pricing,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(config: Config) -> Result<Self> {
        let epics = EpicsClient::new(&config)?;
        let filter = CompletionFilter::from_config(&config);
        let pricing = Pricing::from_config(&config);

        Ok(Self {
            config,
            epics,
            filter,
            pricing,
        })
    }

    /// Fetch the status table and log which statuses count as completed
    pub async fn fetch_statuses(&self) -> Result<StatusTable> {
        tracing::info!("Fetching statuses...");
        let statuses = self.epics.fetch_statuses().await?;

        let completed: Vec<&str> = statuses
            .iter()
            .filter(|s| self.filter.is_completed(Some(s.name.as_str())))
            .map(|s| s.name.as_str())
            .collect();

        for status in statuses.iter() {
            tracing::debug!(
                id = %status.id,
                name = %status.name,
                category = status.category.as_deref().unwrap_or("-"),
                "Status"
            );
        }

        if !statuses.is_empty() && completed.is_empty() {
            tracing::warn!(
                labels = ?self.config.completed_labels(),
                "No completed statuses identified with current configuration; \
                 set COMPLETED_STATUS_NAMES, e.g. 'Done,Completed,Accepted'"
            );
        } else {
            tracing::info!(
                total = statuses.len(),
                completed = ?completed,
                "Determined completed statuses"
            );
        }

        Ok(statuses)
    }

    /// Fetch every story of the project
    pub async fn fetch_stories(&self) -> Result<Vec<Story>> {
        tracing::info!("Fetching stories...");
        let stories = self.epics.fetch_stories().await?;
        tracing::info!(count = stories.len(), "Total stories fetched");
        Ok(stories)
    }

    /// Price the completed stories
    pub fn build_report(&self, stories: &[Story], statuses: &StatusTable) -> BillingReport {
        let report = build_report(stories, statuses, &self.filter, &self.pricing);
        tracing::info!(
            count = report.lines.len(),
            total = report.total,
            formatted = %report.total_display,
            "Completed stories found"
        );
        report
    }

    /// Fetch, filter and price in one pass
    pub async fn run(&self) -> Result<BillingReport> {
        let statuses = self.fetch_statuses().await?;
        let stories = self.fetch_stories().await?;
        Ok(self.build_report(&stories, &statuses))
    }

    /// Email built from the report with the configured subject
    pub fn email_for(&self, report: &BillingReport) -> EmailMessage {
        EmailMessage::from_report(&self.config.email.subject, report)
    }

    /// Send the report through Microsoft Graph
    pub async fn send_report(&self, report: &BillingReport) -> Result<()> {
        let credentials = self.config.email.graph_credentials()?;
        let mailer = GraphMailer::new(credentials, self.config.request_timeout_secs)?
            .with_endpoints(
                self.config.email.authority_url.clone(),
                self.config.email.graph_url.clone(),
            );

        tracing::info!("Sending email via Microsoft Graph...");
        mailer.send(&self.email_for(report)).await?;
        tracing::info!("Email sent");
        Ok(())
    }

    /// Get a reference to the config
    pub fn config(&self) -> &Config {
        &self.config
    }
}
