//! Wire types for the agent backend protocol
//!
//! One user-initiated exchange is a [`Turn`]; the backend answers with a
//! [`ResponseEnvelope`] that may carry a direct reply, a legacy recipe field
//! and an ordered list of executed function results. Field names follow the
//! backend's Portuguese JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form interaction label echoed to the backend with every turn
pub const INTERACTION_GENERAL: &str = "conversa_geral";
/// Interaction label for recipe-oriented turns (image submissions)
pub const INTERACTION_RECIPE: &str = "receita";
/// Interaction label for the distinguished meal-completed turn
pub const INTERACTION_MEAL_COMPLETED: &str = "meal_completed";

/// Payload of one user turn
#[derive(Debug, Clone)]
pub enum TurnKind {
    /// Plain text message
    Text(String),

    /// Captured voice clip
    Audio {
        data: Vec<u8>,
        file_name: String,
    },

    /// Photo of ingredients, with an optional accompanying message
    Image {
        data: Vec<u8>,
        mime: String,
        message: Option<String>,
    },
}

/// One user-initiated exchange, immutable once sent
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: Uuid,
    pub kind: TurnKind,
    pub interaction_type: String,
}

impl Turn {
    pub fn text(message: impl Into<String>, interaction_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TurnKind::Text(message.into()),
            interaction_type: interaction_type.into(),
        }
    }

    pub fn audio(data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TurnKind::Audio {
                data,
                file_name: "audio.wav".to_string(),
            },
            interaction_type: INTERACTION_GENERAL.to_string(),
        }
    }

    pub fn image(data: Vec<u8>, mime: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TurnKind::Image {
                data,
                mime: mime.into(),
                message: Some(message.into()),
            },
            interaction_type: INTERACTION_RECIPE.to_string(),
        }
    }
}

/// Recipe generated by the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    #[serde(rename = "nome_receita")]
    pub name: String,

    #[serde(rename = "imagem_url", default)]
    pub image_url: Option<String>,

    #[serde(rename = "ingredientes", default)]
    pub ingredients: Vec<String>,

    #[serde(rename = "tempo_preparo", default)]
    pub prep_time_min: Option<u32>,

    #[serde(rename = "porcoes", default)]
    pub servings: Option<u32>,

    #[serde(rename = "calorias_por_porcao", default)]
    pub calories_per_serving: Option<f64>,

    #[serde(rename = "carboidratos_por_porcao", default)]
    pub carbs_per_serving: Option<f64>,

    #[serde(rename = "proteinas_por_porcao", default)]
    pub protein_per_serving: Option<f64>,

    #[serde(rename = "indice_glicemico", default)]
    pub glycemic_index: Option<f64>,

    #[serde(rename = "modo_preparo", default)]
    pub prep_instructions: Option<String>,
}

impl Recipe {
    /// Text read aloud when the user asks for the recipe to be narrated
    pub fn narration(&self) -> String {
        format!(
            "{}. Ingredientes: {}. Modo de preparo: {}",
            self.name,
            self.ingredients.join(", "),
            self.prep_instructions.as_deref().unwrap_or_default()
        )
    }
}

/// One raw health measurement, most-recent-first per backend contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSample {
    #[serde(rename = "data_medicao")]
    pub measured_at: DateTime<Utc>,

    #[serde(rename = "peso", default)]
    pub weight_kg: Option<f64>,

    #[serde(rename = "pressao_sistolica", default)]
    pub systolic: Option<u32>,

    #[serde(rename = "pressao_diastolica", default)]
    pub diastolic: Option<u32>,

    #[serde(rename = "glicemia_jejum", default)]
    pub fasting_glucose: Option<f64>,
}

/// One self-reported wellbeing entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WellbeingSample {
    #[serde(rename = "nivel_estresse", default)]
    pub stress_level: Option<u8>,

    #[serde(rename = "nivel_energia", default)]
    pub energy_level: Option<u8>,

    #[serde(rename = "qualidade_humor", default)]
    pub mood: Option<String>,

    #[serde(rename = "estado_emocional", default)]
    pub emotional_state: Option<String>,

    #[serde(rename = "sintomas_fisicos", default)]
    pub physical_symptoms: Vec<String>,

    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
}

/// Health and wellbeing collections backing the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HealthHistory {
    #[serde(rename = "saude", default)]
    pub samples: Vec<HealthSample>,

    #[serde(rename = "bem_estar", default)]
    pub wellbeing: Vec<WellbeingSample>,
}

impl HealthHistory {
    /// Normalize the shapes the backend is known to produce: the history object
    /// itself, the same object wrapped in `{dados: ...}`, or a bare sample array.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        let inner = match value {
            serde_json::Value::Object(ref map) if map.contains_key("dados") => {
                map.get("dados").cloned()?
            }
            other => other,
        };

        match inner {
            serde_json::Value::Array(_) => {
                let samples: Vec<HealthSample> = serde_json::from_value(inner).ok()?;
                Some(Self {
                    samples,
                    wellbeing: Vec::new(),
                })
            }
            serde_json::Value::Object(_) => serde_json::from_value(inner).ok(),
            _ => None,
        }
    }

    /// Most recent measurement, if any
    pub fn latest(&self) -> Option<&HealthSample> {
        self.samples.first()
    }
}

/// One prescribed medication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "dosagem", default)]
    pub dosage: Option<String>,

    #[serde(rename = "frequencia", default)]
    pub frequency: Option<String>,
}

/// Display-only agent configuration, fetched once per session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(rename = "nome_agente")]
    pub agent_name: String,
}

/// User profile, the bootstrap source for agent config and body measurements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserProfile {
    #[serde(rename = "configuracoes_agente", default)]
    pub agent_configs: Vec<AgentConfig>,

    #[serde(rename = "altura", default)]
    pub height_m: Option<f64>,

    #[serde(rename = "sexo", default)]
    pub sex: Option<String>,

    #[serde(rename = "peso_inicial", default)]
    pub initial_weight_kg: Option<f64>,
}

impl UserProfile {
    pub fn agent_config(&self) -> Option<&AgentConfig> {
        self.agent_configs.first()
    }
}

/// Closed enumeration of backend-executed functions; unknown names map to
/// [`FunctionName::Unknown`] and are ignored by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionName {
    #[serde(rename = "gerar_receita")]
    GenerateRecipe,

    #[serde(rename = "registrar_dados_saude")]
    LogHealthData,

    #[serde(rename = "buscar_dados_saude")]
    FetchHealthData,

    #[serde(rename = "buscar_medicamentos")]
    FetchMedications,

    #[serde(rename = "adicionar_medicamento")]
    AddMedication,

    #[serde(other)]
    Unknown,
}

/// Name-dependent payload of one executed function
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FunctionOutcome {
    #[serde(default)]
    pub success: bool,

    #[serde(rename = "receita", default)]
    pub recipe: Option<Recipe>,

    #[serde(rename = "dados", default)]
    pub health_data: Option<HealthHistory>,

    #[serde(rename = "medicamentos", default)]
    pub medications: Option<Vec<Medication>>,
}

/// One backend-executed side effect reported back for state synchronization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResult {
    #[serde(rename = "function")]
    pub name: FunctionName,

    pub result: FunctionOutcome,
}

/// Backend reply to a turn, consumed synchronously by the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseEnvelope {
    #[serde(rename = "resposta", default)]
    pub reply_text: Option<String>,

    /// Legacy direct recipe field, applied after the function results
    #[serde(rename = "receita", default)]
    pub recipe: Option<Recipe>,

    #[serde(rename = "funcoes_executadas", default)]
    pub executed_functions: Vec<FunctionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_with_executed_functions() {
        let value = json!({
            "resposta": "Aqui está sua receita",
            "funcoes_executadas": [
                {
                    "function": "gerar_receita",
                    "result": {
                        "success": true,
                        "receita": {
                            "nome_receita": "Panqueca de aveia",
                            "ingredientes": ["2 ovos", "1 xícara de aveia"],
                            "tempo_preparo": 15,
                            "porcoes": 2,
                            "calorias_por_porcao": 180.0,
                            "indice_glicemico": 40.0,
                            "modo_preparo": "Misture tudo e frite."
                        }
                    }
                }
            ]
        });

        let envelope: ResponseEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(envelope.reply_text.as_deref(), Some("Aqui está sua receita"));
        assert!(envelope.recipe.is_none());
        assert_eq!(envelope.executed_functions.len(), 1);

        let result = &envelope.executed_functions[0];
        assert_eq!(result.name, FunctionName::GenerateRecipe);
        assert!(result.result.success);
        let recipe = result.result.recipe.as_ref().unwrap();
        assert_eq!(recipe.name, "Panqueca de aveia");
        assert_eq!(recipe.ingredients.len(), 2);
    }

    #[test]
    fn test_unknown_function_name_is_tolerated() {
        let value = json!({
            "funcoes_executadas": [
                { "function": "funcao_nova_do_backend", "result": { "success": true } }
            ]
        });

        let envelope: ResponseEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(envelope.executed_functions[0].name, FunctionName::Unknown);
    }

    #[test]
    fn test_empty_envelope() {
        let envelope: ResponseEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.reply_text.is_none());
        assert!(envelope.recipe.is_none());
        assert!(envelope.executed_functions.is_empty());
    }

    #[test]
    fn test_health_history_wrapped_shape() {
        let value = json!({
            "dados": {
                "saude": [
                    {
                        "data_medicao": "2026-08-01T08:00:00Z",
                        "peso": 82.5,
                        "pressao_sistolica": 125,
                        "pressao_diastolica": 82,
                        "glicemia_jejum": 98.0
                    }
                ],
                "bem_estar": [
                    { "nivel_estresse": 3, "nivel_energia": 8, "sintomas_fisicos": [] }
                ]
            }
        });

        let history = HealthHistory::from_value(value).unwrap();
        assert_eq!(history.samples.len(), 1);
        assert_eq!(history.wellbeing.len(), 1);
        assert_eq!(history.latest().unwrap().weight_kg, Some(82.5));
    }

    #[test]
    fn test_health_history_bare_array_shape() {
        let value = json!([
            { "data_medicao": "2026-08-01T08:00:00Z", "peso": 80.0 },
            { "data_medicao": "2026-07-31T08:00:00Z", "peso": 80.4 }
        ]);

        let history = HealthHistory::from_value(value).unwrap();
        assert_eq!(history.samples.len(), 2);
        assert!(history.wellbeing.is_empty());
    }

    #[test]
    fn test_health_history_bare_object_shape() {
        let value = json!({
            "saude": [],
            "bem_estar": []
        });

        let history = HealthHistory::from_value(value).unwrap();
        assert!(history.samples.is_empty());
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_profile_agent_config() {
        let value = json!({
            "configuracoes_agente": [ { "nome_agente": "Ana" } ],
            "altura": 1.70,
            "sexo": "F",
            "peso_inicial": 90.0
        });

        let profile: UserProfile = serde_json::from_value(value).unwrap();
        assert_eq!(profile.agent_config().unwrap().agent_name, "Ana");
        assert_eq!(profile.height_m, Some(1.70));
    }

    #[test]
    fn test_recipe_narration() {
        let recipe = Recipe {
            name: "Salada".to_string(),
            image_url: None,
            ingredients: vec!["alface".to_string(), "tomate".to_string()],
            prep_time_min: Some(5),
            servings: Some(1),
            calories_per_serving: None,
            carbs_per_serving: None,
            protein_per_serving: None,
            glycemic_index: None,
            prep_instructions: Some("Misture tudo.".to_string()),
        };

        let narration = recipe.narration();
        assert!(narration.starts_with("Salada. Ingredientes: alface, tomate."));
        assert!(narration.ends_with("Modo de preparo: Misture tudo."));
    }
}
