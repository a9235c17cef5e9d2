use serde::Serialize;
use std::collections::BTreeSet;

use crate::catalog::{Composition, GDP, GDP_GROWTH, ModelId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum MetricMode {
    #[default]
    Level,
    GrowthRate,
}

impl MetricMode {
    pub const ALL: [MetricMode; 2] = [MetricMode::Level, MetricMode::GrowthRate];

    /// Indicator code the primary field is read from
    pub fn code(self) -> &'static str {
        match self {
            MetricMode::Level => GDP,
            MetricMode::GrowthRate => GDP_GROWTH,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricMode::Level => "Overall GDP",
            MetricMode::GrowthRate => "GDP Growth Rate",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum TimeWindow {
    #[default]
    All,
    LastYears(u32),
}

impl TimeWindow {
    pub const CHOICES: [TimeWindow; 4] = [
        TimeWindow::All,
        TimeWindow::LastYears(5),
        TimeWindow::LastYears(10),
        TimeWindow::LastYears(15),
    ];

    pub fn label(self) -> String {
        match self {
            TimeWindow::All => "All Time".to_string(),
            TimeWindow::LastYears(1) => "Last 1 Year".to_string(),
            TimeWindow::LastYears(n) => format!("Last {} Years", n),
        }
    }
}

/// What the user asked to see. Pure data; dropdown open/closed state lives in the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub metric_mode: MetricMode,
    pub composition: Option<Composition>,
    /// Overlay indicator codes in the order they were picked
    pub overlays: Vec<String>,
    pub models: BTreeSet<ModelId>,
    pub time_window: TimeWindow,
}

impl FilterSelection {
    pub fn set_metric_mode(&mut self, mode: MetricMode) {
        self.metric_mode = mode;
    }

    pub fn set_composition(&mut self, composition: Option<Composition>) {
        self.composition = composition;
    }

    pub fn set_time_window(&mut self, window: TimeWindow) {
        self.time_window = window;
    }

    /// Adds the overlay if absent, removes it otherwise. Returns whether it is now selected.
    pub fn toggle_overlay(&mut self, code: &str) -> bool {
        if let Some(pos) = self.overlays.iter().position(|c| c == code) {
            self.overlays.remove(pos);
            false
        } else {
            self.overlays.push(code.to_string());
            true
        }
    }

    pub fn toggle_model(&mut self, model: ModelId) -> bool {
        if !self.models.remove(&model) {
            self.models.insert(model);
            true
        } else {
            false
        }
    }

    pub fn has_overlay(&self, code: &str) -> bool {
        self.overlays.iter().any(|c| c == code)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Selected country plus filters. Reset always re-anchors to the default country.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filters {
    pub country: String,
    pub selection: FilterSelection,
    default_country: String,
}

impl Filters {
    pub fn new(default_country: &str) -> Self {
        Self {
            country: default_country.to_string(),
            selection: FilterSelection::default(),
            default_country: default_country.to_string(),
        }
    }

    /// Switches country; returns true if it changed
    pub fn select_country(&mut self, iso: &str) -> bool {
        if self.country == iso {
            return false;
        }
        self.country = iso.to_string();
        true
    }

    /// Returns true if the country changed as part of the reset
    pub fn reset(&mut self) -> bool {
        self.selection = FilterSelection::default();
        let iso = self.default_country.clone();
        self.select_country(&iso)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let sel = FilterSelection::default();
        assert_eq!(sel.metric_mode, MetricMode::Level);
        assert_eq!(sel.composition, None);
        assert!(sel.overlays.is_empty());
        assert!(sel.models.is_empty());
        assert_eq!(sel.time_window, TimeWindow::All);
        assert!(sel.is_default());
    }

    #[test]
    fn test_toggle_overlay_keeps_pick_order() {
        let mut sel = FilterSelection::default();
        assert!(sel.toggle_overlay("energy_use"));
        assert!(sel.toggle_overlay("political_stability"));
        assert!(sel.toggle_overlay("tourism_arrivals"));
        assert!(!sel.toggle_overlay("political_stability"));
        assert_eq!(sel.overlays, vec!["energy_use", "tourism_arrivals"]);
        assert!(!sel.has_overlay("political_stability"));
    }

    #[test]
    fn test_toggle_model() {
        let mut sel = FilterSelection::default();
        assert!(sel.toggle_model(ModelId::Hybrid));
        assert!(sel.toggle_model(ModelId::Linear));
        assert!(!sel.toggle_model(ModelId::Hybrid));
        assert_eq!(sel.models.iter().copied().collect::<Vec<_>>(), vec![ModelId::Linear]);
    }

    #[test]
    fn test_reset_restores_default_country() {
        let mut filters = Filters::new("USA");
        filters.select_country("DEU");
        filters.selection.set_metric_mode(MetricMode::GrowthRate);
        filters.selection.set_composition(Some(Composition::Investment));
        filters.selection.toggle_overlay("energy_use");
        filters.selection.toggle_model(ModelId::RandomForest);
        filters.selection.set_time_window(TimeWindow::LastYears(10));

        assert!(filters.reset());
        assert_eq!(filters.country, "USA");
        assert!(filters.selection.is_default());

        // already at default: nothing to refetch
        assert!(!filters.reset());
    }

    #[test]
    fn test_labels() {
        assert_eq!(TimeWindow::LastYears(5).label(), "Last 5 Years");
        assert_eq!(TimeWindow::All.label(), "All Time");
        assert_eq!(MetricMode::GrowthRate.code(), "gdp_growth");
    }
}
