//! Session state: turn serialization and the display model

use crate::dispatch::EffectSink;
use crate::protocol::{HealthHistory, Medication, Recipe, UserProfile};
use tracing::debug;

/// Serializes user turns: submissions are accepted from Idle only, and Sending
/// always returns to Idle whether the turn succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Sending,
    Recording,
}

/// Everything the surface renders: profile, recipe card, dashboard collections
/// and the medication list. Implements [`EffectSink`] so the dispatcher can
/// apply function results directly; reloads are latched as a flag the session
/// controller drains after each turn.
#[derive(Default)]
pub struct DisplayState {
    pub profile: Option<UserProfile>,
    pub recipe: Option<Recipe>,
    pub health: HealthHistory,
    pub medications: Vec<Medication>,
    pub dashboard_visible: bool,
    reload_requested: bool,
}

impl DisplayState {
    /// Agent display name from the profile, if configured
    pub fn agent_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.agent_config())
            .map(|c| c.agent_name.as_str())
    }

    /// Consume a pending reload request, if one was latched this turn
    pub fn take_reload_request(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }
}

impl EffectSink for DisplayState {
    fn replace_recipe(&mut self, recipe: Recipe) {
        debug!(recipe = %recipe.name, "recipe replaced");
        self.recipe = Some(recipe);
        self.dashboard_visible = false;
    }

    fn show_dashboard(&mut self, history: HealthHistory) {
        self.health = history;
        self.dashboard_visible = true;
        self.recipe = None;
    }

    fn replace_medications(&mut self, medications: Vec<Medication>) {
        self.medications = medications;
    }

    fn request_reload(&mut self) {
        self.reload_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AgentConfig;

    fn recipe(name: &str) -> Recipe {
        Recipe {
            name: name.to_string(),
            image_url: None,
            ingredients: Vec::new(),
            prep_time_min: None,
            servings: None,
            calories_per_serving: None,
            carbs_per_serving: None,
            protein_per_serving: None,
            glycemic_index: None,
            prep_instructions: None,
        }
    }

    #[test]
    fn test_recipe_hides_dashboard_and_dashboard_clears_recipe() {
        let mut state = DisplayState::default();

        state.show_dashboard(HealthHistory::default());
        assert!(state.dashboard_visible);

        state.replace_recipe(recipe("Sopa"));
        assert!(!state.dashboard_visible);
        assert!(state.recipe.is_some());

        state.show_dashboard(HealthHistory::default());
        assert!(state.dashboard_visible);
        assert!(state.recipe.is_none());
    }

    #[test]
    fn test_reload_request_is_latched_once() {
        let mut state = DisplayState::default();
        assert!(!state.take_reload_request());

        state.request_reload();
        state.request_reload();
        assert!(state.take_reload_request());
        assert!(!state.take_reload_request());
    }

    #[test]
    fn test_agent_name_from_profile() {
        let mut state = DisplayState::default();
        assert!(state.agent_name().is_none());

        state.profile = Some(UserProfile {
            agent_configs: vec![AgentConfig {
                agent_name: "Ana".to_string(),
            }],
            ..Default::default()
        });
        assert_eq!(state.agent_name(), Some("Ana"));
    }
}
