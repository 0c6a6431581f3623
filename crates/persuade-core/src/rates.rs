//! Published rate table mapping purchase amounts to credits.
//!
//! The reconciler only credits amounts that match a known package exactly;
//! anything else is flagged for manual review instead of silently credited.

use serde::{Deserialize, Serialize};

/// One purchasable credit package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPackage {
    /// Stable package id (e.g. "growth").
    pub id: String,

    /// Display name.
    pub name: String,

    /// Credits granted on completion.
    pub credits: i64,

    /// Charge amount in minor units (cents for USD).
    pub amount_minor: i64,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Short description for display.
    pub description: String,
}

/// The published rate table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    /// Available packages.
    pub packages: Vec<CreditPackage>,
}

impl Default for RateTable {
    fn default() -> Self {
        let usd = |id: &str, name: &str, credits: i64, amount_minor: i64, description: &str| {
            CreditPackage {
                id: id.into(),
                name: name.into(),
                credits,
                amount_minor,
                currency: "USD".into(),
                description: description.into(),
            }
        };

        Self {
            packages: vec![
                usd("starter", "Starter Package", 10, 1500, "10 credits for new users and small projects"),
                usd("growth", "Growth Package", 1000, 2999, "1000 credits for active campaigns"),
                usd("professional", "Professional Package", 50, 6500, "50 credits for regular users and growing businesses"),
                usd("enterprise", "Enterprise Package", 200, 24000, "200 credits for high-volume users and agencies"),
                usd("bulk", "Bulk Package", 500, 55000, "500 credits for enterprise clients and resellers"),
            ],
        }
    }
}

impl RateTable {
    /// Look up a package by id.
    #[must_use]
    pub fn package(&self, id: &str) -> Option<&CreditPackage> {
        self.packages.iter().find(|p| p.id == id)
    }

    /// Find the package matching a charged amount and currency exactly.
    ///
    /// Returns `None` when no package matches — the caller must treat that
    /// as a misconfiguration, never credit an arbitrary amount.
    #[must_use]
    pub fn match_amount(&self, amount_minor: i64, currency: &str) -> Option<&CreditPackage> {
        self.packages
            .iter()
            .find(|p| p.amount_minor == amount_minor && p.currency.eq_ignore_ascii_case(currency))
    }

    /// Gross up a package price to cover processor fees (2.9% + 30 minor
    /// units), so the listed price is what the buyer actually pays.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn price_with_fees(amount_minor: i64) -> i64 {
        let gross = (amount_minor as f64 + 30.0) / (1.0 - 0.029);
        gross.round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_growth_package() {
        let table = RateTable::default();
        let pkg = table.package("growth").unwrap();
        assert_eq!(pkg.credits, 1000);
        assert_eq!(pkg.amount_minor, 2999);
        assert_eq!(pkg.currency, "USD");
    }

    #[test]
    fn match_amount_exact() {
        let table = RateTable::default();
        let pkg = table.match_amount(2999, "usd").unwrap();
        assert_eq!(pkg.id, "growth");
    }

    #[test]
    fn match_amount_rejects_unknown() {
        let table = RateTable::default();
        assert!(table.match_amount(2999, "EUR").is_none());
        assert!(table.match_amount(1234, "USD").is_none());
    }

    #[test]
    fn fee_gross_up_covers_processor_cut() {
        let gross = RateTable::price_with_fees(1500);
        // (1500 + 30) / 0.971 ≈ 1576
        assert_eq!(gross, 1576);
        // Net after the processor takes 2.9% + 30 is at least the base.
        let net = (f64::from(u32::try_from(gross).unwrap()) * 0.971 - 30.0).round() as i64;
        assert!(net >= 1500);
    }
}
