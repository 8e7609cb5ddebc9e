pub mod currency;
pub mod render;

use crate::config::Config;
use crate::epics::{StatusTable, Story};
use chrono::{DateTime, Utc};
use self::currency::format_currency;

/// One billed story
#[derive(Debug, Clone, PartialEq)]
pub struct BillingLine {
    pub title: String,
    pub description: String,
    pub points: f64,
    pub price: f64,
    /// `price` formatted with the configured currency symbol
    pub price_display: String,
}

/// Billed stories and their total for one run
#[derive(Debug, Clone)]
pub struct BillingReport {
    /// Lines in the order stories were fetched
    pub lines: Vec<BillingLine>,
    pub total: f64,
    pub total_display: String,
    /// Number of stories considered, billed or not
    pub stories_fetched: usize,
    pub generated_at: DateTime<Utc>,
}

impl BillingReport {
    /// Plain-text email body
    pub fn to_text(&self) -> String {
        render::render_text(self)
    }

    /// HTML email body
    pub fn to_html(&self) -> String {
        render::render_html(self)
    }
}

/// Decides whether a status label means the work is done
#[derive(Debug, Clone)]
pub struct CompletionFilter {
    labels: Vec<String>,
}

impl CompletionFilter {
    /// Labels are compared trimmed and case-insensitively
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { labels }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.completed_labels())
    }

    pub fn is_completed(&self, label: Option<&str>) -> bool {
        match label {
            Some(label) => {
                let label = label.trim().to_lowercase();
                self.labels.iter().any(|l| *l == label)
            }
            None => false,
        }
    }
}

/// Rate and currency used to price stories
#[derive(Debug, Clone)]
pub struct Pricing {
    pub price_per_point: f64,
    pub currency_symbol: String,
}

impl Pricing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            price_per_point: config.price_per_point,
            currency_symbol: config.currency_symbol.clone(),
        }
    }

    pub fn price(&self, points: f64) -> f64 {
        points * self.price_per_point
    }

    pub fn format(&self, amount: f64) -> String {
        format_currency(amount, &self.currency_symbol)
    }
}

/// Filter completed stories, price each one and accumulate the total
pub fn build_report(
    stories: &[Story],
    statuses: &StatusTable,
    filter: &CompletionFilter,
    pricing: &Pricing,
) -> BillingReport {
    let mut lines = Vec::new();

    for story in stories {
        let label = statuses.resolve_label(&story.status);
        if !filter.is_completed(label) {
            tracing::trace!(id = ?story.id, title = %story.title, status = ?label, "Not billed");
            continue;
        }

        let price = pricing.price(story.points);
        lines.push(BillingLine {
            title: story.title.clone(),
            description: story.description.clone(),
            points: story.points,
            price,
            price_display: pricing.format(price),
        });
    }

    let total: f64 = lines.iter().map(|l| l.price).sum();

    BillingReport {
        lines,
        total,
        total_display: pricing.format(total),
        stories_fetched: stories.len(),
        generated_at: Utc::now(),
    }
}
