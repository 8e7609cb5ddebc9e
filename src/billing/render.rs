use super::currency::format_points;
use super::{BillingLine, BillingReport};

/// Render the plain-text email body
pub fn render_text(report: &BillingReport) -> String {
    let mut output = String::new();

    for line in &report.lines {
        output.push_str(&format!(
            "- {} ({}) - {}\n",
            line.title,
            points_label(line),
            line.price_display
        ));
        if !line.description.is_empty() {
            for desc_line in line.description.lines() {
                output.push_str(&format!("  {}\n", desc_line));
            }
        }
    }

    if !report.lines.is_empty() {
        output.push('\n');
    }
    output.push_str(&format!("Total - {}", report.total_display));

    output
}

/// Render the HTML email body. All story text is escaped.
pub fn render_html(report: &BillingReport) -> String {
    let mut items = String::new();

    for line in &report.lines {
        items.push_str(&format!(
            "    <li><span>{}</span> ({}) - <strong>{}</strong>",
            html_escape(&line.title),
            points_label(line),
            html_escape(&line.price_display)
        ));
        if !line.description.is_empty() {
            items.push_str(&format!(
                "<br><small>{}</small>",
                html_escape(&line.description)
            ));
        }
        items.push_str("</li>\n");
    }

    format!(
        "<div>\n  <ul>\n{}  </ul>\n  <p><strong>Total - {}</strong></p>\n</div>",
        items,
        html_escape(&report.total_display)
    )
}

fn points_label(line: &BillingLine) -> String {
    let unit = if line.points == 1.0 { "pt" } else { "pts" };
    format!("{} {}", format_points(line.points), unit)
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
