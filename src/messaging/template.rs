//! Placeholder substitution for notification templates.

use chrono::{Datelike, Utc};

use crate::domain::customers::Debtor;

/// Render a billing template for one debtor.
///
/// Supported placeholders: {name}, {amount}, {category}, {date}, {period},
/// {pppoe_username}, {pppoe_password}. Unknown placeholders are left as-is.
pub fn render_template(template: &str, debtor: &Debtor) -> String {
    let now = Utc::now();
    let period = format!("{:02}/{}", now.month(), now.year());

    template
        .replace("{name}", &debtor.name)
        .replace("{amount}", &format_amount(debtor.pending_total))
        .replace("{category}", debtor.category.as_str())
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{period}", &period)
        .replace(
            "{pppoe_username}",
            debtor.pppoe_username.as_deref().unwrap_or("-"),
        )
        .replace(
            "{pppoe_password}",
            debtor.pppoe_password.as_deref().unwrap_or("-"),
        )
}

/// Group digits with dots, the local convention for rupiah amounts.
fn format_amount(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
