//! # Module Actif
//!
//! The business vertical the terminal is running as. It drives the colours
//! of the screens, the words shown to the cashier, and which packagings make
//! sense for the products being sold.
//!
//! ## Lookup Tables
//! ```text
//! ┌──────────────┬──────┬───────────────┬─────────────────┬──────────────┐
//! │ Module       │ Emoji│ Product noun  │ Packagings      │ Stock        │
//! ├──────────────┼──────┼───────────────┼─────────────────┼──────────────┤
//! │ Pharmacie    │  💊  │ Médicament    │ Unité, Plaquette│ tracked      │
//! │              │      │               │ Boîte, Flacon   │              │
//! │ Restaurant   │  🍽️  │ Plat          │ Portion, Unité, │ not tracked  │
//! │              │      │               │ Bouteille       │              │
//! │ Depot        │  🏭  │ Article       │ Bouteille→Palette│ tracked     │
//! │ Boutique     │  🛍️  │ Produit       │ Unité, Pack,    │ tracked      │
//! │              │      │               │ Carton, Sac     │              │
//! └──────────────┴──────┴───────────────┴─────────────────┴──────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::conditionnement::ConditionnementKind;
use crate::error::ValidationError;

// =============================================================================
// Module Actif
// =============================================================================

/// The active business vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ModuleActif {
    Pharmacie,
    Restaurant,
    Depot,
    #[default]
    Boutique,
}

impl ModuleActif {
    /// Every module, in menu order.
    pub const ALL: [ModuleActif; 4] = [
        ModuleActif::Pharmacie,
        ModuleActif::Restaurant,
        ModuleActif::Depot,
        ModuleActif::Boutique,
    ];

    /// Stable identifier, also used in backend query strings.
    pub const fn code(&self) -> &'static str {
        match self {
            ModuleActif::Pharmacie => "pharmacie",
            ModuleActif::Restaurant => "restaurant",
            ModuleActif::Depot => "depot",
            ModuleActif::Boutique => "boutique",
        }
    }

    /// Visual theme of the screens.
    pub const fn theme(&self) -> Theme {
        match self {
            ModuleActif::Pharmacie => Theme {
                title: "Pharmacie",
                emoji: "💊",
                primary: "#0F9D58",
                secondary: "#E6F4EA",
                accent: "#D93025",
                background: "#FFFFFF",
            },
            ModuleActif::Restaurant => Theme {
                title: "Restaurant",
                emoji: "🍽️",
                primary: "#E8710A",
                secondary: "#FEEFE3",
                accent: "#5F6368",
                background: "#FFFBF7",
            },
            ModuleActif::Depot => Theme {
                title: "Dépôt",
                emoji: "🏭",
                primary: "#1A73E8",
                secondary: "#E8F0FE",
                accent: "#F9AB00",
                background: "#F8F9FA",
            },
            ModuleActif::Boutique => Theme {
                title: "Boutique",
                emoji: "🛍️",
                primary: "#9334E6",
                secondary: "#F3E8FD",
                accent: "#188038",
                background: "#FFFFFF",
            },
        }
    }

    /// Words shown to the cashier.
    pub const fn vocabulary(&self) -> Vocabulary {
        match self {
            ModuleActif::Pharmacie => Vocabulary {
                product_singular: "Médicament",
                product_plural: "Médicaments",
                customer_label: "Patient",
                sale_label: "Délivrance",
                catalog_title: "Officine",
                cart_title: "Ordonnance",
                checkout_label: "Délivrer",
            },
            ModuleActif::Restaurant => Vocabulary {
                product_singular: "Plat",
                product_plural: "Plats",
                customer_label: "Table",
                sale_label: "Commande",
                catalog_title: "Menu",
                cart_title: "Commande en cours",
                checkout_label: "Encaisser",
            },
            ModuleActif::Depot => Vocabulary {
                product_singular: "Article",
                product_plural: "Articles",
                customer_label: "Client",
                sale_label: "Bon de sortie",
                catalog_title: "Stock",
                cart_title: "Bon en cours",
                checkout_label: "Valider",
            },
            ModuleActif::Boutique => Vocabulary {
                product_singular: "Produit",
                product_plural: "Produits",
                customer_label: "Client",
                sale_label: "Vente",
                catalog_title: "Rayons",
                cart_title: "Panier",
                checkout_label: "Payer",
            },
        }
    }

    /// Packagings offered by this module, most common first.
    pub const fn allowed_conditionnements(&self) -> &'static [ConditionnementKind] {
        use ConditionnementKind::*;
        match self {
            ModuleActif::Pharmacie => &[Unite, Plaquette, Boite, Flacon],
            ModuleActif::Restaurant => &[Portion, Unite, Bouteille],
            ModuleActif::Depot => &[Casier, Carton, Pack, Bouteille, Sac, Palette, Unite],
            ModuleActif::Boutique => &[Unite, Pack, Carton, Sac],
        }
    }

    /// Packaging preselected when the cashier taps a product.
    pub const fn default_conditionnement(&self) -> ConditionnementKind {
        self.allowed_conditionnements()[0]
    }

    /// Whether this module sells against stock counts.
    ///
    /// Restaurant dishes are cooked to order and never run out in the system.
    pub const fn tracks_stock(&self) -> bool {
        !matches!(self, ModuleActif::Restaurant)
    }

    /// Whether `kind` is one of this module's packagings.
    pub fn allows(&self, kind: ConditionnementKind) -> bool {
        self.allowed_conditionnements().contains(&kind)
    }
}

impl fmt::Display for ModuleActif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ModuleActif {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pharmacie" | "pharmacy" | "pharma" => Ok(ModuleActif::Pharmacie),
            "restaurant" | "resto" | "restauration" => Ok(ModuleActif::Restaurant),
            "depot" | "dépôt" | "dépot" | "wholesale" => Ok(ModuleActif::Depot),
            "boutique" | "shop" | "magasin" => Ok(ModuleActif::Boutique),
            _ => Err(ValidationError::NotAllowed {
                field: "module".to_string(),
                allowed: ModuleActif::ALL.iter().map(|m| m.code().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Theme & Vocabulary
// =============================================================================

/// Colours and title of a module's screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Theme {
    pub title: &'static str,
    pub emoji: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
}

/// Module-specific words for the same screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Vocabulary {
    pub product_singular: &'static str,
    pub product_plural: &'static str,
    pub customer_label: &'static str,
    pub sale_label: &'static str,
    pub catalog_title: &'static str,
    pub cart_title: &'static str,
    pub checkout_label: &'static str,
}

impl Vocabulary {
    /// "1 Médicament", "3 Médicaments".
    pub fn count_products(&self, n: usize) -> String {
        if n > 1 {
            format!("{} {}", n, self.product_plural)
        } else {
            format!("{} {}", n, self.product_singular)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_parsing_aliases() {
        assert_eq!("pharmacy".parse::<ModuleActif>().unwrap(), ModuleActif::Pharmacie);
        assert_eq!("Resto".parse::<ModuleActif>().unwrap(), ModuleActif::Restaurant);
        assert_eq!("dépôt".parse::<ModuleActif>().unwrap(), ModuleActif::Depot);
        assert_eq!(" shop ".parse::<ModuleActif>().unwrap(), ModuleActif::Boutique);
        assert!("garage".parse::<ModuleActif>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for module in ModuleActif::ALL {
            assert_eq!(module.to_string().parse::<ModuleActif>().unwrap(), module);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ModuleActif::Depot).unwrap();
        assert_eq!(json, "\"depot\"");
    }

    #[test]
    fn test_default_conditionnement_is_allowed() {
        for module in ModuleActif::ALL {
            assert!(module.allows(module.default_conditionnement()));
        }
        assert_eq!(
            ModuleActif::Depot.default_conditionnement(),
            ConditionnementKind::Casier
        );
    }

    #[test]
    fn test_restaurant_does_not_track_stock() {
        assert!(!ModuleActif::Restaurant.tracks_stock());
        assert!(ModuleActif::Pharmacie.tracks_stock());
    }

    #[test]
    fn test_vocabulary_counts() {
        let vocab = ModuleActif::Pharmacie.vocabulary();
        assert_eq!(vocab.count_products(1), "1 Médicament");
        assert_eq!(vocab.count_products(3), "3 Médicaments");
        assert_eq!(ModuleActif::Restaurant.vocabulary().cart_title, "Commande en cours");
    }

    #[test]
    fn test_every_module_has_distinct_theme() {
        let primaries: std::collections::HashSet<_> =
            ModuleActif::ALL.iter().map(|m| m.theme().primary).collect();
        assert_eq!(primaries.len(), ModuleActif::ALL.len());
    }
}
