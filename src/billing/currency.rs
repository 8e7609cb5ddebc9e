/// Format an amount as `{symbol}1.234,56`.
///
/// Output does not depend on the host locale: `.` groups thousands and `,`
/// separates the two decimals. Rounds half away from zero at the cent.
pub fn format_currency(amount: f64, symbol: &str) -> String {
    let cents = (amount * 100.0).round();
    let negative = cents < 0.0;
    let cents = cents.abs() as u64;

    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!(
        "{}{}{},{:02}",
        if negative { "-" } else { "" },
        symbol,
        grouped,
        fraction
    )
}

/// Format a point count: integral values without decimals, others with up to two.
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{}", points as i64)
    } else {
        let s = format!("{:.2}", points);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
