//! Display helpers for the dashboard.

/// Format a number with `.` thousands separators and `,` as decimal mark.
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// CSS class for a state word: green when up, red when down.
pub fn state_class(state: &str) -> &'static str {
    match state {
        "online" | "on-line" => "state-up",
        "disconnected" | "connecting" | "re-connecting" => "state-down",
        _ => "state-other",
    }
}

/// A state word wrapped in its colored span.
pub fn state_span(state: &str) -> String {
    format!(
        r#"<span class="{}">{}</span>"#,
        state_class(state),
        html_escape(state)
    )
}

/// Display text for an optional field.
pub fn or_dash(value: Option<&str>) -> String {
    value.map(html_escape).unwrap_or_else(|| "-".to_string())
}
