use crossterm::event::KeyCode;
use log::{info, warn};

use crate::{
    catalog::{Catalog, Composition, ModelId, OVERLAYS},
    data::{Country, CountryId},
    engine::{Aggregation, aggregate},
    selection::{Filters, MetricMode, TimeWindow},
    store::{Applied, CountrySeries, FetchOutcome, FetchTicket, Lookup, SeriesStore},
};

/// Filter dropdowns, left to right. At most one is open at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dropdown {
    Metric,
    Country,
    Composition,
    Indicators,
    TimeFrame,
    Models,
}

impl Dropdown {
    pub const ORDER: [Dropdown; 6] = [
        Dropdown::Metric,
        Dropdown::Country,
        Dropdown::Composition,
        Dropdown::Indicators,
        Dropdown::TimeFrame,
        Dropdown::Models,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Dropdown::Metric => "GDP",
            Dropdown::Country => "Country",
            Dropdown::Composition => "Composition",
            Dropdown::Indicators => "Indicators",
            Dropdown::TimeFrame => "Time Frame",
            Dropdown::Models => "Models",
        }
    }

    pub fn is_multi(self) -> bool {
        matches!(self, Dropdown::Indicators | Dropdown::Models)
    }

    fn step(self, forward: bool) -> Self {
        let idx = Self::ORDER.iter().position(|d| *d == self).unwrap_or(0);
        let n = Self::ORDER.len();
        Self::ORDER[if forward { (idx + 1) % n } else { (idx + n - 1) % n }]
    }
}

/// Dropdown interaction; kept apart from the filter data it edits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropdownState {
    pub focused: Dropdown,
    pub open: Option<Dropdown>,
    pub cursor: usize,
}

pub struct AppState {
    pub catalog: Catalog,
    pub countries: Vec<Country>,
    pub filters: Filters,
    pub dropdown: DropdownState,
    pub store: SeriesStore,
    pub series: Option<CountrySeries>,
    pub view: Aggregation,
    pub loading: bool,
    pub message: Option<String>,
    pending: Vec<FetchTicket>,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
Tab / ←→: choose filter
Enter: open / pick
Space: toggle (multi-select)
↑/↓: move in list
Esc: close list
r: reset filters
q: quit";

    pub fn new(store: SeriesStore, countries: Vec<Country>, default_country: &str) -> Self {
        let mut state = Self {
            catalog: Catalog::builtin(),
            countries,
            filters: Filters::new(default_country),
            dropdown: DropdownState { focused: Dropdown::Metric, open: None, cursor: 0 },
            store,
            series: None,
            view: Aggregation::default(),
            loading: false,
            message: None,
            pending: Vec::new(),
        };
        state.load_country();
        state
    }

    pub fn country_name(&self) -> &str {
        self.countries
            .iter()
            .find(|c| c.iso_code == self.filters.country)
            .map(|c| c.name.as_str())
            .unwrap_or(&self.filters.country)
    }

    fn country_id(&self, iso: &str) -> Option<CountryId> {
        self.countries.iter().find(|c| c.iso_code == iso).map(|c| c.id)
    }

    /// True when the selected country is known but not fully cached
    fn needs_reload(&self) -> bool {
        self.country_id(&self.filters.country)
            .is_some_and(|id| !self.store.is_cached(id))
    }

    /// Fetches the main loop has to start
    pub fn take_pending(&mut self) -> Vec<FetchTicket> {
        std::mem::take(&mut self.pending)
    }

    fn load_country(&mut self) {
        let iso = self.filters.country.clone();
        let Some(id) = self.country_id(&iso) else {
            warn!("no country with ISO code {}", iso);
            self.message = Some(format!("Unknown country {}", iso));
            self.show(None);
            return;
        };
        info!("country selected: {} ({})", iso, id);
        match self.store.request(id) {
            Lookup::Ready(series) => {
                self.loading = false;
                self.message = None;
                self.show(Some(series));
            }
            Lookup::Fetch(ticket) => {
                self.loading = true;
                self.pending.push(ticket);
                self.show(None);
            }
            Lookup::InFlight => {
                self.loading = true;
                self.show(None);
            }
        }
    }

    /// Hands a finished fetch to the store and refreshes the view if it is current.
    pub fn apply(&mut self, outcome: FetchOutcome) {
        match self.store.apply(outcome) {
            Applied::Stale => {}
            Applied::Ready(fetched) => {
                self.loading = false;
                self.message = (!fetched.warnings.is_empty()).then(|| {
                    fetched.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>().join("; ")
                });
                self.show(Some(fetched.series));
            }
            Applied::Failed(errors) => {
                self.loading = false;
                self.message = errors.first().map(|e| e.to_string());
                self.show(None);
            }
        }
    }

    fn show(&mut self, series: Option<CountrySeries>) {
        self.series = series;
        self.recompute();
    }

    /// Rebuilds both tables from the current snapshot and selection
    pub fn recompute(&mut self) {
        self.view = match &self.series {
            Some(series) => aggregate(series, &self.filters.selection, &self.catalog),
            None => Aggregation::default(),
        };
    }

    pub fn options(&self, dropdown: Dropdown) -> Vec<String> {
        match dropdown {
            Dropdown::Metric => MetricMode::ALL.iter().map(|m| m.label().to_string()).collect(),
            Dropdown::Country => self.countries.iter().map(|c| c.name.clone()).collect(),
            Dropdown::Composition => std::iter::once("None".to_string())
                .chain(Composition::ALL.iter().map(|c| c.label().to_string()))
                .collect(),
            Dropdown::Indicators => OVERLAYS.iter().map(|(label, _)| label.to_string()).collect(),
            Dropdown::TimeFrame => TimeWindow::CHOICES.iter().map(|w| w.label()).collect(),
            Dropdown::Models => ModelId::ALL.iter().map(|m| m.label().to_string()).collect(),
        }
    }

    pub fn is_checked(&self, dropdown: Dropdown, idx: usize) -> bool {
        let sel = &self.filters.selection;
        match dropdown {
            Dropdown::Metric => MetricMode::ALL.get(idx) == Some(&sel.metric_mode),
            Dropdown::Country => {
                self.countries.get(idx).is_some_and(|c| c.iso_code == self.filters.country)
            }
            Dropdown::Composition => match idx {
                0 => sel.composition.is_none(),
                i => Composition::ALL.get(i - 1).copied() == sel.composition,
            },
            Dropdown::Indicators => OVERLAYS.get(idx).is_some_and(|(_, code)| sel.has_overlay(code)),
            Dropdown::TimeFrame => TimeWindow::CHOICES.get(idx) == Some(&sel.time_window),
            Dropdown::Models => ModelId::ALL.get(idx).is_some_and(|m| sel.models.contains(m)),
        }
    }

    /// Short summary of the current value, for the filter bar
    pub fn summary(&self, dropdown: Dropdown) -> String {
        let sel = &self.filters.selection;
        match dropdown {
            Dropdown::Metric => sel.metric_mode.label().to_string(),
            Dropdown::Country => self.country_name().to_string(),
            Dropdown::Composition => sel.composition.map(|c| c.label()).unwrap_or("None").to_string(),
            Dropdown::Indicators => format!("{} selected", sel.overlays.len()),
            Dropdown::TimeFrame => sel.time_window.label(),
            Dropdown::Models => format!("{} selected", sel.models.len()),
        }
    }

    fn pick(&mut self, dropdown: Dropdown, idx: usize) {
        let sel = &mut self.filters.selection;
        match dropdown {
            Dropdown::Metric => {
                if let Some(mode) = MetricMode::ALL.get(idx) {
                    sel.set_metric_mode(*mode);
                }
            }
            Dropdown::Country => {
                let Some(iso) = self.countries.get(idx).map(|c| c.iso_code.clone()) else { return };
                if self.filters.select_country(&iso) || self.needs_reload() {
                    self.load_country();
                }
                return;
            }
            Dropdown::Composition => {
                sel.set_composition(idx.checked_sub(1).and_then(|i| Composition::ALL.get(i).copied()));
            }
            Dropdown::Indicators => {
                if let Some((_, code)) = OVERLAYS.get(idx) {
                    sel.toggle_overlay(code);
                }
            }
            Dropdown::TimeFrame => {
                if let Some(window) = TimeWindow::CHOICES.get(idx) {
                    sel.set_time_window(*window);
                }
            }
            Dropdown::Models => {
                if let Some(model) = ModelId::ALL.get(idx) {
                    sel.toggle_model(*model);
                }
            }
        }
        self.recompute();
    }

    /// Resets every filter and returns to the default country.
    /// Also retries a failed or partial fetch of that country.
    pub fn reset(&mut self) {
        self.dropdown.open = None;
        if self.filters.reset() || self.needs_reload() {
            self.load_country();
        } else {
            self.recompute();
        }
    }

    /// Returns true when the user asked to quit
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        use KeyCode::*;
        match key {
            Char('q') => return true,
            Char('r') => self.reset(),
            Tab | Right => self.focus(self.dropdown.focused.step(true)),
            BackTab | Left => self.focus(self.dropdown.focused.step(false)),
            Esc => self.dropdown.open = None,
            Up => {
                if self.dropdown.open.is_some() && self.dropdown.cursor > 0 {
                    self.dropdown.cursor -= 1;
                }
            }
            Down => {
                if let Some(open) = self.dropdown.open {
                    if self.dropdown.cursor + 1 < self.options(open).len() {
                        self.dropdown.cursor += 1;
                    }
                }
            }
            Enter | Char(' ') => match self.dropdown.open {
                None if key == Enter => self.open(self.dropdown.focused),
                None => {}
                Some(open) => {
                    self.pick(open, self.dropdown.cursor);
                    if !open.is_multi() {
                        self.dropdown.open = None;
                    }
                }
            },
            _ => {}
        }
        false
    }

    fn focus(&mut self, dropdown: Dropdown) {
        self.dropdown.focused = dropdown;
        self.dropdown.open = None;
    }

    fn open(&mut self, dropdown: Dropdown) {
        let options = self.options(dropdown).len();
        self.dropdown.cursor = (0..options).find(|i| self.is_checked(dropdown, *i)).unwrap_or(0);
        self.dropdown.open = Some(dropdown);
    }
}
