use std::sync::Arc;

use livetrans_translation::TranslationEngine;

use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub engine: Arc<TranslationEngine>,
}
