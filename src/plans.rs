//! Subscription plans and their monthly prices.
//!
//! Three tiers are sold. Prices are configurable under `[plans]` in
//! `config.toml`:
//!
//! ```toml
//! [plans]
//! starter = 15000
//! professionnel = 29000
//! entreprise = 55000
//! ```
//!
//! A plan name that matches none of the tiers is priced as Professionnel.

use serde::Deserialize;
use std::fmt;

/// Thousands separator used by the fr-FR price format.
pub const GROUP_SEPARATOR: char = ' ';

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Starter,
    Professionnel,
    Entreprise,
}

impl Plan {
    /// Plan charged when an account names a tier that doesn't exist.
    pub const DEFAULT: Plan = Plan::Professionnel;

    /// Parse a stored plan name. Matching is exact, as stored by the app.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Starter" => Some(Plan::Starter),
            "Professionnel" => Some(Plan::Professionnel),
            "Entreprise" => Some(Plan::Entreprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "Starter",
            Plan::Professionnel => "Professionnel",
            Plan::Entreprise => "Entreprise",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monthly price per plan, in FCFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlanPricing {
    pub starter: u64,
    pub professionnel: u64,
    pub entreprise: u64,
}

impl Default for PlanPricing {
    fn default() -> Self {
        Self {
            starter: 15_000,
            professionnel: 29_000,
            entreprise: 55_000,
        }
    }
}

impl PlanPricing {
    /// Price of a known tier.
    pub fn price(&self, plan: Plan) -> u64 {
        match plan {
            Plan::Starter => self.starter,
            Plan::Professionnel => self.professionnel,
            Plan::Entreprise => self.entreprise,
        }
    }

    /// Price for a stored plan name, falling back to [`Plan::DEFAULT`].
    pub fn monthly_price(&self, plan_name: &str) -> u64 {
        self.price(Plan::parse(plan_name).unwrap_or(Plan::DEFAULT))
    }
}

/// Format an amount the way fr-FR does: digits grouped by three.
///
/// `55000` becomes `"55 000"`, `1250000` becomes `"1 250 000"`.
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(ch);
    }

    out
}
