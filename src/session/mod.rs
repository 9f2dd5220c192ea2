//! Conversation session: turn lifecycle, display state and fixed utterances

pub mod controller;
pub mod state;

pub use controller::SessionController;
pub use state::{DisplayState, TurnState};

/// Spoken when an image submission carries an unsupported MIME type
pub const MSG_UNSUPPORTED_FILE_TYPE: &str =
    "Tipo de arquivo não suportado. Use JPEG, PNG ou WebP.";

/// Spoken when an image submission exceeds the size limit
pub const MSG_FILE_TOO_LARGE: &str = "Arquivo muito grande. O tamanho máximo é 10MB.";

/// Message accompanying every ingredient photo
pub const MSG_IMAGE_PROMPT: &str =
    "Analise esta imagem dos meus ingredientes e me sugira uma receita saudável para diabéticos";

/// Message sent by the meal-completed shortcut
pub const MSG_MEAL_COMPLETED: &str = "Refeição concluída!";

/// Message sent when the user asks for another recipe
pub const MSG_NEW_RECIPE: &str = "Gere uma nova receita para mim";

/// Spoken when the new-recipe turn fails
pub const MSG_NEW_RECIPE_ERROR: &str = "Desculpe, ocorreu um erro ao gerar nova receita.";

/// Image submissions above this size are rejected client-side
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted for image submissions
pub const SUPPORTED_IMAGE_MIME: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
