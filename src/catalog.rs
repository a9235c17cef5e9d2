use serde::Serialize;
use std::collections::BTreeMap;

/// How a value of an indicator is displayed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Category {
    Monetary,
    Population,
    LargeCount,
    Percentage,
    Plain,
}

#[derive(Clone, Debug, Serialize)]
pub struct Indicator {
    pub id: u32,
    pub code: &'static str,
    pub label: &'static str,
    pub unit: Option<&'static str>,
    pub short: &'static str,
    pub category: Category,
}

impl Indicator {
    /// Column header: `label (unit)`
    pub fn header(&self) -> String {
        match self.unit {
            Some(unit) => format!("{} ({})", self.label, unit),
            None => self.label.to_string(),
        }
    }
}

pub const GDP: &str = "gdp";
pub const GDP_GROWTH: &str = "gdp_growth";

const PERCENT_CODES: [&str; 7] = [
    "inflation",
    "unemployment",
    "literacy_rate",
    "household_consumption",
    "govt_consumption",
    "investment",
    "net_exports",
];

/// Codes shown in the raw indicator table, in column order.
pub const TABLE_CODES: [&str; 8] = [
    "gdp",
    "birth_rate",
    "literacy_rate",
    "population",
    "tourism_arrivals",
    "tourism_departures",
    "political_stability",
    "energy_use",
];

pub(crate) fn categorize(code: &str) -> Category {
    match code {
        "gdp" | "fdi" => Category::Monetary,
        "population" => Category::Population,
        "tourism_arrivals" | "tourism_departures" => Category::LargeCount,
        c if PERCENT_CODES.contains(&c) || c.contains("pct") || c.contains("growth") => {
            Category::Percentage
        }
        _ => Category::Plain,
    }
}

macro_rules! indicator {
    ($id:expr, $code:expr, $label:expr, $unit:expr, $short:expr) => {
        Indicator {
            id: $id,
            code: $code,
            label: $label,
            unit: $unit,
            short: $short,
            category: categorize($code),
        }
    };
}

/// Read-only registry of every known indicator, keyed by code.
#[derive(Clone, Debug)]
pub struct Catalog {
    by_code: BTreeMap<&'static str, Indicator>,
    order: Vec<&'static str>,
}

impl Catalog {
    pub fn from_indicators(list: Vec<Indicator>) -> Self {
        let order = list.iter().map(|i| i.code).collect();
        let by_code = list.into_iter().map(|i| (i.code, i)).collect();
        Self { by_code, order }
    }

    pub fn builtin() -> Self {
        Self::from_indicators(vec![
            indicator!(1, "gdp", "GDP", Some("USD (billions)"),
                "The total monetary value of all goods and services produced within a country."),
            indicator!(2, "gdp_growth", "GDP Growth Rate", Some("%"),
                "The annual percentage increase or decrease in GDP."),
            indicator!(3, "population", "Population", None,
                "Total number of people living in the country."),
            indicator!(4, "energy_use", "Energy Use", Some("kg oil equivalent per capita"),
                "Primary energy use per person before transformation to other end-use fuels."),
            indicator!(5, "political_stability", "Political Stability Index", None,
                "Perceived likelihood of political instability or politically-motivated violence."),
            indicator!(6, "exports_pct_gdp", "Exports (% of GDP)", Some("%"),
                "Value of goods and services sold abroad relative to GDP."),
            indicator!(7, "imports_pct_gdp", "Imports (% of GDP)", Some("%"),
                "Value of goods and services bought from abroad relative to GDP."),
            indicator!(8, "inflation", "Inflation Rate", Some("%"),
                "Annual change in consumer prices."),
            indicator!(9, "unemployment", "Unemployment Rate", Some("%"),
                "Share of the labor force without work but available for and seeking employment."),
            indicator!(10, "birth_rate", "Birth Rate", Some("per 1,000 people"),
                "Live births during the year per 1,000 people."),
            indicator!(11, "fdi", "Foreign Direct Investment", Some("USD"),
                "Net inflows of investment to acquire lasting management interest."),
            indicator!(12, "literacy_rate", "Literacy Rate", Some("%"),
                "Share of adults who can read and write a short simple statement."),
            indicator!(13, "tourism_arrivals", "Tourism Arrivals", None,
                "Number of international inbound tourists."),
            indicator!(14, "tourism_departures", "Tourism Departures", None,
                "Number of residents departing for other countries."),
            indicator!(15, "household_consumption", "Household Consumption", Some("%"),
                "Household final consumption expenditure as a share of GDP."),
            indicator!(16, "govt_consumption", "Government Consumption", Some("%"),
                "General government final consumption expenditure as a share of GDP."),
            indicator!(17, "investment", "Investment (Gross Capital Formation)", Some("%"),
                "Gross capital formation as a share of GDP."),
            indicator!(18, "net_exports", "Net Exports", Some("%"),
                "Exports minus imports as a share of GDP."),
        ])
    }

    pub fn get(&self, code: &str) -> Option<&Indicator> {
        self.by_code.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    /// Indicators in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.order.iter().filter_map(|c| self.by_code.get(c))
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}

/// GDP breakdown groups offered by the composition filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Composition {
    All,
    ConsumerSpending,
    Investment,
    GovernmentSpending,
    NetExports,
}

impl Composition {
    pub const ALL: [Composition; 5] = [
        Composition::All,
        Composition::ConsumerSpending,
        Composition::Investment,
        Composition::GovernmentSpending,
        Composition::NetExports,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Composition::All => "All",
            Composition::ConsumerSpending => "Consumer Spending",
            Composition::Investment => "Investment",
            Composition::GovernmentSpending => "Government Spending",
            Composition::NetExports => "Net Exports",
        }
    }

    pub fn codes(self) -> &'static [&'static str] {
        match self {
            Composition::All => &["household_consumption", "govt_consumption", "investment"],
            Composition::ConsumerSpending => &["household_consumption"],
            Composition::Investment => &["investment"],
            Composition::GovernmentSpending => &["govt_consumption"],
            Composition::NetExports => &["net_exports"],
        }
    }
}

/// Auxiliary indicators the user can plot next to the primary metric: (label, code)
pub const OVERLAYS: [(&str, &str); 4] = [
    ("Political Instability", "political_stability"),
    ("Energy Consumption", "energy_use"),
    ("Tourist Arrivals", "tourism_arrivals"),
    ("Tourist Departures", "tourism_departures"),
];

pub fn overlay_label(code: &str) -> Option<&'static str> {
    OVERLAYS.iter().find(|(_, c)| *c == code).map(|(l, _)| *l)
}

/// Precomputed forecasting methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    Linear,
    RandomForest,
    Hybrid,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [ModelId::Linear, ModelId::RandomForest, ModelId::Hybrid];

    pub fn key(self) -> &'static str {
        match self {
            ModelId::Linear => "linear",
            ModelId::RandomForest => "random_forest",
            ModelId::Hybrid => "hybrid",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelId::Linear => "Linear Regression",
            ModelId::RandomForest => "Random Forest",
            ModelId::Hybrid => "Hybrid Model",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModelId::Linear => "Fits a straight-line trend through historical GDP.",
            ModelId::RandomForest => {
                "Uses multiple decision trees to capture non-linear relationships in economic data."
            }
            ModelId::Hybrid => "Combines several modeling approaches into a balanced forecast.",
        }
    }

    /// Accepts the storage key (`random_forest`) and the hyphenated form (`random-forest`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "linear" | "linear_regression" => Some(ModelId::Linear),
            "random_forest" => Some(ModelId::RandomForest),
            "hybrid" | "hybrid_model" => Some(ModelId::Hybrid),
            _ => None,
        }
    }
}

const RF_ACCURACY: [(&str, f64); 5] = [
    ("ARE", 0.967343649933759),
    ("CHN", 0.9554461185372651),
    ("DEU", 0.979967184446301),
    ("IND", 0.9630735896828855),
    ("USA", 0.9731906377679994),
];

const HYBRID_ACCURACY: [(&str, f64); 5] = [
    ("ARE", 0.9916400784411488),
    ("CHN", 0.6925342935435479),
    ("DEU", 0.9422555862878881),
    ("IND", 0.9124693477535333),
    ("USA", 0.9435587262747313),
];

/// R² of a model's test-period predictions for a country.
/// Unknown countries fall back to USA; `None` means no score has been published.
pub fn model_accuracy(model: ModelId, iso: &str) -> Option<f64> {
    let table: &[(&str, f64)] = match model {
        ModelId::Linear => return None,
        ModelId::RandomForest => &RF_ACCURACY,
        ModelId::Hybrid => &HYBRID_ACCURACY,
    };
    let lookup = |k: &str| table.iter().find(|(c, _)| *c == k).map(|(_, v)| *v);
    // the store spells the Emirates "UAE"; scores are keyed by ISO-3
    let key = if iso == "UAE" { "ARE" } else { iso };
    lookup(key).or_else(|| lookup("USA"))
}

pub fn accuracy_rating(r2: f64) -> &'static str {
    if r2 >= 0.98 {
        "Excellent"
    } else if r2 >= 0.95 {
        "Very Good"
    } else if r2 >= 0.90 {
        "Good"
    } else if r2 >= 0.85 {
        "Moderate"
    } else {
        "Fair"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_categories() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.iter().count(), 18);
        assert_eq!(catalog.get("gdp").map(|i| i.category), Some(Category::Monetary));
        assert_eq!(catalog.get("fdi").map(|i| i.category), Some(Category::Monetary));
        assert_eq!(catalog.get("population").map(|i| i.category), Some(Category::Population));
        assert_eq!(catalog.get("tourism_arrivals").map(|i| i.category), Some(Category::LargeCount));
        assert_eq!(catalog.get("exports_pct_gdp").map(|i| i.category), Some(Category::Percentage));
        assert_eq!(catalog.get("gdp_growth").map(|i| i.category), Some(Category::Percentage));
        assert_eq!(catalog.get("investment").map(|i| i.category), Some(Category::Percentage));
        assert_eq!(catalog.get("birth_rate").map(|i| i.category), Some(Category::Plain));
        assert!(catalog.get("hdi").is_none());
    }

    #[test]
    fn test_catalog_keeps_registration_order() {
        let catalog = Catalog::builtin();
        let codes: Vec<_> = catalog.codes().take(3).collect();
        assert_eq!(codes, vec!["gdp", "gdp_growth", "population"]);
    }

    #[test]
    fn test_composition_codes_exist_in_catalog() {
        let catalog = Catalog::builtin();
        for comp in Composition::ALL {
            for code in comp.codes() {
                assert!(catalog.contains(code), "{} missing", code);
            }
        }
        assert_eq!(Composition::All.codes().len(), 3);
    }

    #[test]
    fn test_model_parse_and_keys() {
        assert_eq!(ModelId::parse("random-forest"), Some(ModelId::RandomForest));
        assert_eq!(ModelId::parse("Linear"), Some(ModelId::Linear));
        assert_eq!(ModelId::parse("arima"), None);
        assert_eq!(ModelId::Hybrid.key(), "hybrid");
    }

    #[test]
    fn test_model_accuracy_lookup() {
        assert_eq!(model_accuracy(ModelId::Linear, "USA"), None);
        assert_eq!(model_accuracy(ModelId::Hybrid, "UAE"), Some(0.9916400784411488));
        assert_eq!(
            model_accuracy(ModelId::RandomForest, "FRA"),
            model_accuracy(ModelId::RandomForest, "USA")
        );
        assert_eq!(accuracy_rating(0.99), "Excellent");
        assert_eq!(accuracy_rating(0.9731), "Very Good");
        assert_eq!(accuracy_rating(0.6925), "Fair");
    }
}
