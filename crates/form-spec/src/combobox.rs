use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::{FieldDescriptor, FieldOption};

/// Options whose label contains `query`, ignoring case. The query is
/// matched as typed, whitespace included; an empty query matches everything.
pub fn filter_options<'a>(options: &'a [FieldOption], query: &str) -> Vec<&'a FieldOption> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return options.iter().collect();
    }
    options
        .iter()
        .filter(|option| option.label.to_lowercase().contains(&needle))
        .collect()
}

/// Keys the searchable select reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComboKey {
    Down,
    Up,
    Home,
    End,
    Enter,
    Escape,
}

/// Transient menu state; only one combobox is open at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ComboboxState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_field: Option<String>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub active_index: usize,
}

impl ComboboxState {
    /// Opens the menu for `field` with an empty query.
    pub fn focus(&mut self, field: &str) {
        self.open_field = Some(field.to_string());
        self.query.clear();
        self.active_index = 0;
    }

    pub fn set_query(&mut self, field: &str, query: &str) {
        if !self.is_open_for(field) {
            self.focus(field);
        }
        self.query = query.to_string();
        self.active_index = 0;
    }

    pub fn close(&mut self) {
        self.open_field = None;
        self.query.clear();
        self.active_index = 0;
    }

    pub fn is_open_for(&self, field: &str) -> bool {
        self.open_field.as_deref() == Some(field)
    }

    pub fn filtered<'a>(&self, field: &'a FieldDescriptor) -> Vec<&'a FieldOption> {
        filter_options(&field.options, &self.query)
    }

    /// Applies a key press for the open `field`. Returns the option value to
    /// commit when the key selects one.
    pub fn handle_key(&mut self, field: &FieldDescriptor, key: ComboKey) -> Option<String> {
        let filtered = self.filtered(field);
        let last = filtered.len().saturating_sub(1);
        match key {
            ComboKey::Down => {
                self.active_index = (self.active_index + 1).min(last);
                None
            }
            ComboKey::Up => {
                self.active_index = self.active_index.saturating_sub(1).min(last);
                None
            }
            ComboKey::Home => {
                self.active_index = 0;
                None
            }
            ComboKey::End => {
                self.active_index = last;
                None
            }
            ComboKey::Enter => {
                let chosen = filtered
                    .get(self.active_index)
                    .or_else(|| filtered.first())
                    .map(|option| option.value.clone());
                self.close();
                chosen
            }
            ComboKey::Escape => {
                self.close();
                None
            }
        }
    }

    /// Commits the `index`-th filtered option, as a click would.
    pub fn select(&mut self, field: &FieldDescriptor, index: usize) -> Option<String> {
        let chosen = self
            .filtered(field)
            .get(index)
            .map(|option| option.value.clone());
        if chosen.is_some() {
            self.close();
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::FieldType;

    fn makes() -> FieldDescriptor {
        let mut field = FieldDescriptor::new("make", FieldType::Combobox);
        field.options = vec![
            FieldOption::new("Toyota", "toyota"),
            FieldOption::new("Nissan", "nissan"),
            FieldOption::new("Subaru", "subaru"),
        ];
        field
    }

    #[test]
    fn filters_by_label_substring() {
        let field = makes();
        let labels = |query: &str| {
            filter_options(&field.options, query)
                .into_iter()
                .map(|option| option.label.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(labels("to"), vec!["Toyota"]);
        assert_eq!(labels("SAN"), vec!["Nissan"]);
        assert_eq!(labels("").len(), 3);
        assert!(labels("zzz").is_empty());
    }

    #[test]
    fn whitespace_in_the_query_is_matched_literally() {
        let mut field = makes();
        field.options.push(FieldOption::new("Land Rover", "land_rover"));
        let labels = |query: &str| {
            filter_options(&field.options, query)
                .into_iter()
                .map(|option| option.label.clone())
                .collect::<Vec<_>>()
        };
        assert!(labels("d ").is_empty());
        assert_eq!(labels("d r"), vec!["Land Rover"]);
        assert_eq!(labels(" "), vec!["Land Rover"]);
    }

    #[test]
    fn cursor_is_clamped() {
        let field = makes();
        let mut state = ComboboxState::default();
        state.focus("make");
        state.handle_key(&field, ComboKey::Up);
        assert_eq!(state.active_index, 0);
        for _ in 0..5 {
            state.handle_key(&field, ComboKey::Down);
        }
        assert_eq!(state.active_index, 2);
        state.handle_key(&field, ComboKey::Home);
        assert_eq!(state.active_index, 0);
        state.handle_key(&field, ComboKey::End);
        assert_eq!(state.active_index, 2);
    }

    #[test]
    fn enter_commits_and_escape_does_not() {
        let field = makes();
        let mut state = ComboboxState::default();
        state.set_query("make", "u");
        state.handle_key(&field, ComboKey::Down);
        assert_eq!(state.handle_key(&field, ComboKey::Enter).as_deref(), Some("subaru"));
        assert!(state.open_field.is_none());

        state.focus("make");
        assert_eq!(state.handle_key(&field, ComboKey::Escape), None);
        assert!(state.open_field.is_none());

        state.set_query("make", "nothing matches");
        assert_eq!(state.handle_key(&field, ComboKey::Enter), None);
    }
}
