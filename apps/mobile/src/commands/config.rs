//! # Config Commands
//!
//! Store settings and the look of the module actif.

use caisse_core::{ConditionnementKind, ModuleActif, Theme, Vocabulary};
use serde::Serialize;
use tracing::debug;

use crate::state::{ConfigState, SessionState};

/// A packaging the module sells in, for the quantity picker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionnementOption {
    pub kind: ConditionnementKind,
    pub label: &'static str,
    pub plural_label: &'static str,
    pub emoji: &'static str,
}

impl From<ConditionnementKind> for ConditionnementOption {
    fn from(kind: ConditionnementKind) -> Self {
        ConditionnementOption {
            kind,
            label: kind.label(),
            plural_label: kind.plural_label(),
            emoji: kind.emoji(),
        }
    }
}

/// Everything the screens need to dress up for a module.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeResponse {
    pub module: ModuleActif,
    pub theme: Theme,
    pub vocabulary: Vocabulary,
    pub conditionnements: Vec<ConditionnementOption>,
    pub tracks_stock: bool,
}

impl From<ModuleActif> for ThemeResponse {
    fn from(module: ModuleActif) -> Self {
        ThemeResponse {
            module,
            theme: module.theme(),
            vocabulary: module.vocabulary(),
            conditionnements: module
                .allowed_conditionnements()
                .iter()
                .copied()
                .map(ConditionnementOption::from)
                .collect(),
            tracks_stock: module.tracks_stock(),
        }
    }
}

pub fn get_config(config: &ConfigState) -> ConfigState {
    debug!("get_config command");
    config.clone()
}

/// Theme of the module actif, or of the default module before login.
pub fn get_theme(session: &SessionState, config: &ConfigState) -> ThemeResponse {
    let module = session.module().unwrap_or(config.default_module);
    debug!(module = %module, "get_theme command");
    ThemeResponse::from(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_before_login_uses_default_module() {
        let session = SessionState::new();
        let config = ConfigState {
            default_module: ModuleActif::Depot,
            ..ConfigState::default()
        };

        let theme = get_theme(&session, &config);
        assert_eq!(theme.module, ModuleActif::Depot);
        assert_eq!(theme.theme.emoji, "🏭");
        assert_eq!(theme.vocabulary.sale_label, "Bon de sortie");
        assert_eq!(theme.conditionnements[0].kind, ConditionnementKind::Casier);
        assert!(theme.tracks_stock);
    }

    #[test]
    fn test_restaurant_does_not_track_stock() {
        let theme = ThemeResponse::from(ModuleActif::Restaurant);
        assert!(!theme.tracks_stock);
        assert_eq!(theme.conditionnements[0].label, ConditionnementKind::Portion.label());
    }

    #[test]
    fn test_theme_serializes_camel_case() {
        let json = serde_json::to_value(ThemeResponse::from(ModuleActif::Pharmacie)).unwrap();
        assert_eq!(json["module"], "pharmacie");
        assert!(json["vocabulary"]["cartTitle"].is_string());
        assert!(json["conditionnements"][0]["pluralLabel"].is_string());
    }
}
