//! # Text Receipts
//!
//! Renders a vente for a thermal printer or a share sheet, in the
//! vocabulary of the vente's module.
//!
//! ```text
//! ┌────────────────────────────────┐
//! │       Pharmacie du Plateau     │
//! │        Av. Léopold Senghor     │
//! │--------------------------------│
//! │Délivrance 260314-090507-0042   │
//! │14/03/2026 09:05                │
//! │Caissier : Awa Diop             │
//! │--------------------------------│
//! │Doliprane 500mg                 │
//! │  2 Plaquettes x 800 1 600 FCFA │
//! │--------------------------------│
//! │TOTAL                1 600 FCFA │
//! │Espèces              2 000 FCFA │
//! │Monnaie                400 FCFA │
//! └────────────────────────────────┘
//! ```

use caisse_core::{Vente, VenteStatus};
use chrono::Local;

use crate::state::ConfigState;

/// Renders `vente` as fixed-width text, `config.receipt_width` columns wide.
pub fn render_receipt(vente: &Vente, cashier: &str, config: &ConfigState) -> String {
    let width = config.receipt_width;
    let vocabulary = vente.module.vocabulary();
    let rule = "-".repeat(width);
    let mut out: Vec<String> = Vec::new();

    out.push(center(&config.store_name, width));
    for line in &config.store_address {
        out.push(center(line, width));
    }
    out.push(rule.clone());

    out.push(truncate(
        &format!("{} {}", vocabulary.sale_label, vente.receipt_number),
        width,
    ));
    out.push(
        vente
            .created_at
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M")
            .to_string(),
    );
    out.push(truncate(&format!("Caissier : {}", cashier), width));
    if let Some(customer) = &vente.customer_name {
        out.push(truncate(
            &format!("{} : {}", vocabulary.customer_label, customer),
            width,
        ));
    }
    out.push(rule.clone());

    for line in &vente.lines {
        out.push(truncate(&line.name, width));
        let detail = format!(
            "  {} x {}",
            line.conditionnement_kind.describe(line.quantity),
            config.format_money(line.unit_price)
        );
        out.extend(columns(&detail, &config.format_money(line.line_total), width));
    }
    out.push(rule.clone());

    if !vente.discount.is_zero() {
        out.extend(columns("Sous-total", &config.format_money(vente.subtotal), width));
        out.extend(columns(
            &format!("Remise {} %", vente.discount_bps as f64 / 100.0),
            &format!("-{}", config.format_money(vente.discount)),
            width,
        ));
    }
    out.extend(columns("TOTAL", &config.format_money(vente.total), width));
    out.extend(columns(
        vente.payment.method.label(),
        &config.format_money(vente.payment.tendered),
        width,
    ));
    if vente.payment.change.is_positive() {
        out.extend(columns("Monnaie", &config.format_money(vente.payment.change), width));
    }
    if let Some(reference) = &vente.payment.reference {
        out.push(truncate(&format!("Réf. {}", reference), width));
    }
    out.push(rule);

    if vente.status == VenteStatus::Pending {
        out.push(center("** EN ATTENTE D'ENVOI **", width));
    }
    out.push(center("Merci de votre visite", width));

    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

fn center(s: &str, width: usize) -> String {
    let s = truncate(s, width);
    let pad = (width - char_len(&s)) / 2;
    format!("{}{}", " ".repeat(pad), s)
}

/// `left` and `right` on one line, or `right` alone on the next when both
/// don't fit.
fn columns(left: &str, right: &str, width: usize) -> Vec<String> {
    let (l, r) = (char_len(left), char_len(right));
    if l + r < width {
        return vec![format!("{}{}{}", left, " ".repeat(width - l - r), right)];
    }
    let right = truncate(right, width);
    vec![
        truncate(left, width),
        format!("{:>width$}", right, width = width),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_api::testing::sample_vente;
    use caisse_core::{ModuleActif, Money};

    fn config() -> ConfigState {
        ConfigState {
            store_name: "Pharmacie du Plateau".to_string(),
            store_address: vec!["Av. Léopold Senghor".to_string()],
            ..ConfigState::default()
        }
    }

    #[test]
    fn test_receipt_uses_module_vocabulary() {
        let vente = sample_vente("test-device");
        assert_eq!(vente.module, ModuleActif::Pharmacie);

        let text = render_receipt(&vente, "Awa Diop", &config());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0].trim(), "Pharmacie du Plateau");
        assert!(lines[3].starts_with("Délivrance "));
        assert!(text.contains("Caissier : Awa Diop"));
        assert!(text.contains("  2 Plaquettes x 800 FCFA"));
        assert!(text.contains("Monnaie"));
        assert!(lines.iter().all(|l| l.chars().count() <= 32));
    }

    #[test]
    fn test_receipt_shows_discount_and_pending_marker() {
        let mut vente = sample_vente("test-device");
        vente.status = VenteStatus::Pending;
        vente.discount_bps = 1_000;
        vente.subtotal = Money::from_minor(1_600);
        vente.discount = Money::from_minor(160);
        vente.total = Money::from_minor(1_440);

        let text = render_receipt(&vente, "Awa Diop", &config());
        assert!(text.contains("Remise 10 %"));
        assert!(text.contains("-160 FCFA"));
        assert!(text.contains("EN ATTENTE D'ENVOI"));
    }

    #[test]
    fn test_columns_wrap_when_too_long() {
        let lines = columns("Un libellé beaucoup trop long", "12 500 FCFA", 32);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("12 500 FCFA"));
        assert_eq!(lines[1].chars().count(), 32);

        let lines = columns("TOTAL", "1 600 FCFA", 32);
        assert_eq!(lines, vec![format!("TOTAL{}1 600 FCFA", " ".repeat(17))]);
    }
}
