//! The shared selection state and its named transitions. Every view
//! reads this struct; every interaction handler goes through one of
//! the transition methods, never ad-hoc field writes.

use paperscope_rs::{ViewMode, END_YEAR, START_YEAR};
use serde::{Deserialize, Serialize};

pub const MAX_COMPARED: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_year: u16,
    pub year_range: (u16, u16),
    pub selected_country: Option<String>,
    /// Ordered, oldest first, never more than [`MAX_COMPARED`].
    pub compared_countries: Vec<String>,
    pub selected_subfield: Option<String>,
    pub hovered_country: Option<String>,
    pub view_mode: ViewMode,
    /// Scoped to the current country; cleared on country change only.
    pub expanded_fields: Vec<String>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_year: START_YEAR,
            year_range: (START_YEAR, END_YEAR),
            selected_country: None,
            compared_countries: Vec::new(),
            selected_subfield: None,
            hovered_country: None,
            view_mode: ViewMode::Absolute,
            expanded_fields: Vec::new(),
        }
    }
}

impl SelectionState {
    /// Click on a country: toggles selection. Selecting a new country
    /// also enrolls it in the comparison list, evicting the oldest
    /// entry beyond the cap; deselecting leaves comparisons alone.
    pub fn select_country(&mut self, code: &str) {
        if self.selected_country.as_deref() == Some(code) {
            self.set_selected(None);
            return;
        }
        self.set_selected(Some(code.to_string()));
        if !self.compared_countries.iter().any(|c| c == code) {
            while self.compared_countries.len() >= MAX_COMPARED {
                self.compared_countries.remove(0);
            }
            self.compared_countries.push(code.to_string());
        }
    }

    /// Background click: everything selection-related goes.
    pub fn clear_selection(&mut self) {
        self.set_selected(None);
        self.compared_countries.clear();
        self.selected_subfield = None;
    }

    /// Removes one comparison entry; if it was also the selected
    /// country, both are cleared together.
    pub fn remove_comparison(&mut self, code: &str) {
        self.compared_countries.retain(|c| c != code);
        if self.selected_country.as_deref() == Some(code) {
            self.set_selected(None);
        }
    }

    pub fn clear_comparisons(&mut self) {
        self.compared_countries.clear();
        self.set_selected(None);
    }

    pub fn hover_country(&mut self, code: Option<&str>) {
        self.hovered_country = code.map(str::to_string);
    }

    pub fn set_year(&mut self, year: u16) {
        self.selected_year = year.clamp(START_YEAR, END_YEAR);
    }

    pub fn set_year_range(&mut self, lo: u16, hi: u16) {
        let lo = lo.clamp(START_YEAR, END_YEAR);
        let hi = hi.clamp(START_YEAR, END_YEAR);
        self.year_range = (lo.min(hi), lo.max(hi));
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    /// Subfield click: toggle the cross-filter.
    pub fn select_subfield(&mut self, subfield: &str) {
        if self.selected_subfield.as_deref() == Some(subfield) {
            self.selected_subfield = None;
        } else {
            self.selected_subfield = Some(subfield.to_string());
        }
    }

    /// Field-node click: independent per-field expand toggle.
    pub fn toggle_field(&mut self, field: &str) {
        if let Some(pos) = self.expanded_fields.iter().position(|f| f == field) {
            self.expanded_fields.remove(pos);
        } else {
            self.expanded_fields.push(field.to_string());
        }
    }

    pub fn is_expanded(&self, field: &str) -> bool {
        self.expanded_fields.iter().any(|f| f == field)
    }

    pub fn is_compared(&self, code: &str) -> bool {
        self.compared_countries.iter().any(|c| c == code)
    }

    // Single funnel for selected-country changes so the drill-down
    // reset rule cannot be bypassed: expanded fields survive year
    // scrubbing but not a country switch.
    fn set_selected(&mut self, code: Option<String>) {
        if self.selected_country != code {
            self.expanded_fields.clear();
        }
        self.selected_country = code;
    }
}
