fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float as money with thousands separators: R$1,234.56
pub fn money(val: f64, symbol: &str) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let with_commas = group_thousands(int_part);

    if negative {
        format!("-{symbol}{with_commas}.{dec_part}")
    } else {
        format!("{symbol}{with_commas}.{dec_part}")
    }
}

/// Whole quantities print without decimals.
pub fn quantity(val: f64) -> String {
    if val.fract() != 0.0 {
        return format!("{val:.2}");
    }
    let grouped = group_thousands(&format!("{:.0}", val.abs()));
    if val < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn percent(val: f64) -> String {
    format!("{val:.1}%")
}
