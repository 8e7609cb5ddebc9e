pub mod graph;

use crate::billing::BillingReport;

/// A rendered billing email ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    pub fn from_report(subject: &str, report: &BillingReport) -> Self {
        Self {
            subject: subject.to_string(),
            html_body: report.to_html(),
        }
    }
}
