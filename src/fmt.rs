/// Format a float with thousands separators and two decimals: 1,234.56
pub fn amount(val: f64) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && fixed != "0.00" {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Format a float as a naira amount: ₦1,234.56
pub fn naira(val: f64) -> String {
    let formatted = amount(val);
    match formatted.strip_prefix('-') {
        Some(rest) => format!("-₦{rest}"),
        None => format!("₦{formatted}"),
    }
}

pub fn percent(val: f64) -> String {
    format!("{val:.2}%")
}
