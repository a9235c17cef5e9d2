use crate::catalog::{Catalog, Category, categorize};
use crate::selection::MetricMode;

/// Shown for any cell without a value
pub const NO_DATA: &str = "—";

/// Display string for one table cell, driven by the indicator's category.
/// Codes missing from the catalog are categorized by their name.
pub fn format_value(catalog: &Catalog, code: &str, value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return NO_DATA.to_string();
    };
    let category = catalog.get(code).map(|i| i.category).unwrap_or_else(|| categorize(code));
    match category {
        Category::Monetary => format_money(value),
        Category::Population => group_digits(value.round() as i64),
        Category::LargeCount => format_count(value),
        Category::Percentage => format!("{:.2}%", value),
        Category::Plain => format!("{:.2}", value),
    }
}

pub fn format_money(value: f64) -> String {
    if value >= 1e15 {
        format!("${:.2}Q", value / 1e15)
    } else if value >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else {
        format!("${:.2}B", value / 1e9)
    }
}

fn format_count(value: f64) -> String {
    if value >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

fn group_digits(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Left-axis tick label for the primary metric
pub fn format_axis_tick(mode: MetricMode, value: f64) -> String {
    match mode {
        MetricMode::GrowthRate => format!("{:.1}%", value),
        MetricMode::Level if value >= 1e15 => format!("${:.1}Q", value / 1e15),
        MetricMode::Level if value >= 1e12 => format!("${:.1}T", value / 1e12),
        MetricMode::Level => format!("${:.0}B", value / 1e9),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(code: &str, value: Option<f64>) -> String {
        format_value(&Catalog::builtin(), code, value)
    }

    #[test]
    fn test_monetary_scales() {
        assert_eq!(fmt("gdp", Some(2.1e13)), "$21.00T");
        assert_eq!(fmt("gdp", Some(1.5e15)), "$1.50Q");
        assert_eq!(fmt("gdp", Some(4.2e11)), "$420.00B");
        assert_eq!(fmt("fdi", Some(1e12)), "$1.00T");
    }

    #[test]
    fn test_population_grouping() {
        assert_eq!(fmt("population", Some(331_002_651.0)), "331,002,651");
        assert_eq!(fmt("population", Some(999.4)), "999");
        assert_eq!(fmt("population", Some(1000.0)), "1,000");
        assert_eq!(group_digits(-1_234_567), "-1,234,567");
    }

    #[test]
    fn test_large_counts() {
        assert_eq!(fmt("tourism_arrivals", Some(79_400_000.0)), "79.4M");
        assert_eq!(fmt("tourism_departures", Some(2_500.0)), "2.5K");
        assert_eq!(fmt("tourism_arrivals", Some(999.0)), "999");
    }

    #[test]
    fn test_percentages() {
        assert_eq!(fmt("gdp_growth", Some(5.0)), "5.00%");
        assert_eq!(fmt("exports_pct_gdp", Some(11.456)), "11.46%");
        assert_eq!(fmt("unemployment", Some(3.7)), "3.70%");
        assert_eq!(fmt("net_exports", Some(-2.5)), "-2.50%");
    }

    #[test]
    fn test_plain_and_missing() {
        assert_eq!(fmt("birth_rate", Some(11.0)), "11.00");
        assert_eq!(fmt("political_stability", Some(-0.123)), "-0.12");
        assert_eq!(fmt("birth_rate", None), NO_DATA);
        assert_eq!(fmt("gdp", Some(f64::NAN)), NO_DATA);
        assert_eq!(fmt("hdi", Some(0.9)), "0.90");
    }

    #[test]
    fn test_uncatalogued_codes_use_name_rules() {
        assert_eq!(fmt("gdp_per_capita_growth", Some(1.5)), "1.50%");
        assert_eq!(fmt("debt_pct_gdp", Some(20.0)), "20.00%");
        assert_eq!(fmt("life_expectancy", Some(78.25)), "78.25");
    }

    #[test]
    fn test_axis_ticks() {
        assert_eq!(format_axis_tick(MetricMode::Level, 2.15e13), "$21.5T");
        assert_eq!(format_axis_tick(MetricMode::Level, 5e11), "$500B");
        assert_eq!(format_axis_tick(MetricMode::GrowthRate, -3.42), "-3.4%");
    }
}
