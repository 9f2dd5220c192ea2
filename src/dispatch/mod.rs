//! Function-result dispatcher
//!
//! Maps each executed function reported by the backend to exactly one state
//! update effect. Results are applied in order, so later results for the same
//! logical slot overwrite earlier ones within the same turn. Unknown function
//! names are ignored for forward compatibility, and failed results are skipped
//! without surfacing an error — the backend communicates failure through the
//! reply text.

use crate::protocol::{FunctionName, FunctionResult, HealthHistory, Medication, Recipe};
use tracing::{debug, warn};

/// State-update effects the dispatcher can request. Implemented by the session
/// display state; reloads are an explicit capability so the dispatcher stays
/// decoupled from how profile, health and medication data is fetched.
pub trait EffectSink {
    /// Replace the current recipe and hide the dashboard
    fn replace_recipe(&mut self, recipe: Recipe);

    /// Replace the health collections, show the dashboard, clear the recipe
    fn show_dashboard(&mut self, history: HealthHistory);

    /// Replace the medication list
    fn replace_medications(&mut self, medications: Vec<Medication>);

    /// Request a full reload of profile, health and medication state
    fn request_reload(&mut self);
}

/// Apply every executed function result, in order, to the given sink
pub fn apply_results(results: &[FunctionResult], effects: &mut dyn EffectSink) {
    for result in results {
        if !result.result.success {
            debug!(name = ?result.name, "skipping failed function result");
            continue;
        }

        match result.name {
            FunctionName::GenerateRecipe => {
                if let Some(recipe) = result.result.recipe.clone() {
                    debug!(recipe = %recipe.name, "applying generated recipe");
                    effects.replace_recipe(recipe);
                } else {
                    warn!("gerar_receita succeeded without a recipe payload");
                }
            }
            FunctionName::LogHealthData | FunctionName::AddMedication => {
                debug!(name = ?result.name, "requesting full state reload");
                effects.request_reload();
            }
            FunctionName::FetchHealthData => {
                let history = result.result.health_data.clone().unwrap_or_default();
                effects.show_dashboard(history);
            }
            FunctionName::FetchMedications => {
                if let Some(medications) = result.result.medications.clone() {
                    effects.replace_medications(medications);
                }
            }
            FunctionName::Unknown => {
                debug!("ignoring unrecognized function result");
            }
        }
    }
}
