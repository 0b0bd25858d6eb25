//! Renewal and expiration email content.
//!
//! [`build_notification`] is a pure function of the account, the kind of
//! notice and the product settings. Only the template differs between kinds.

use crate::account::Account;
use crate::config::SweepConfig;
use crate::mailer::OutgoingEmail;
use crate::plans::{format_price, PlanPricing};

/// Which notice to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Trial ends in `days` days.
    TrialReminder { days: i64 },
    /// Trial has ended and the account was just expired.
    Expired,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TrialReminder { .. } => "trial-reminder",
            NotificationKind::Expired => "expired",
        }
    }

    /// Header background, title colour.
    fn palette(&self) -> (&'static str, &'static str) {
        match self {
            NotificationKind::TrialReminder { .. } => {
                ("linear-gradient(135deg,#C9A84C,#E8C56A)", "#0B3D2E")
            }
            NotificationKind::Expired => ("linear-gradient(135deg,#C0392B,#E74C3C)", "#fff"),
        }
    }
}

/// Product details shared by every notification.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub product_name: String,
    /// Sender, as `Name <address>`
    pub from: String,
    pub app_url: String,
    /// WhatsApp number, digits only
    pub support_phone: String,
    pub pricing: PlanPricing,
}

impl NotificationSettings {
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            product_name: config.app.product_name.clone(),
            from: config.email.from.clone(),
            app_url: config.app.url.clone(),
            support_phone: config.app.support_phone.clone(),
            pricing: config.plans,
        }
    }

    fn support_url(&self) -> String {
        format!("https://wa.me/{}", self.support_phone)
    }

    /// WhatsApp link that opens a renewal request naming the account.
    ///
    /// The message is percent-encoded; spaces become `%20`, never `+`.
    pub fn renewal_link(&self, account: &Account) -> String {
        let text = format!("Renouvellement {} - {}", account.name, account.id);
        format!("{}?text={}", self.support_url(), urlencoding::encode(&text))
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self::from_config(&SweepConfig::default())
    }
}

/// Rendered notification, ready to hand to a mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Notification {
    pub fn into_email(self, from: &str) -> OutgoingEmail {
        OutgoingEmail {
            from: from.to_string(),
            to: self.to,
            subject: self.subject,
            html: self.html,
        }
    }
}

fn days_label(days: i64) -> String {
    format!("{days} jour{}", if days > 1 { "s" } else { "" })
}

/// Subject line for a notice.
pub fn subject(kind: NotificationKind, product_name: &str) -> String {
    match kind {
        NotificationKind::TrialReminder { days } => {
            format!("⏳ Votre essai {product_name} expire dans {}", days_label(days))
        }
        NotificationKind::Expired => {
            format!("❌ Votre essai {product_name} a expiré — Renouvelez maintenant")
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn message_paragraph(account: &Account, kind: NotificationKind, settings: &NotificationSettings) -> String {
    let name = escape_html(&account.name);
    let plan = escape_html(&account.plan);
    let price = format_price(settings.pricing.monthly_price(&account.plan));
    let plan_line = format!("<strong>Plan {plan} : {price} FCFA/mois</strong>");

    match kind {
        NotificationKind::TrialReminder { days } => format!(
            "Votre essai gratuit de <strong>{name}</strong> expire dans <strong>{}</strong>.<br><br>\
             Renouvelez maintenant pour continuer sans interruption.<br><br>\
             {plan_line}",
            days_label(days)
        ),
        NotificationKind::Expired => format!(
            "Votre essai gratuit de <strong>{name}</strong> a expiré.<br><br>\
             Réactivez votre compte dès maintenant pour retrouver toutes vos données.<br><br>\
             {plan_line}"
        ),
    }
}

/// Render the notification for `account`.
pub fn build_notification(
    account: &Account,
    kind: NotificationKind,
    settings: &NotificationSettings,
) -> Notification {
    let subject = subject(kind, &settings.product_name);
    let (header_bg, title_color) = kind.palette();
    let greeting = escape_html(account.display_name());
    let paragraph = message_paragraph(account, kind, settings);
    let renewal = escape_html(&settings.renewal_link(account));
    let support = escape_html(&settings.support_url());
    let app_url = escape_html(&settings.app_url);
    let product = escape_html(&settings.product_name);
    let title = escape_html(&subject);

    let html = format!(
        r#"<!DOCTYPE html><html><body style="font-family:sans-serif;background:#FAF7F2;padding:20px">
<div style="max-width:520px;margin:0 auto;background:#fff;border-radius:14px;overflow:hidden">
<div style="background:{header_bg};padding:24px;text-align:center">
<h1 style="color:{title_color};font-size:1.2rem;margin:0">{title}</h1>
</div>
<div style="padding:24px">
<p>Bonjour <strong>{greeting}</strong>,</p>
<p>{paragraph}</p>
<a href="{renewal}" style="display:block;background:#0B3D2E;color:#fff;padding:13px;border-radius:9px;text-align:center;text-decoration:none;font-weight:700;margin:18px 0">💳 Renouveler mon abonnement</a>
<p style="font-size:.8rem;color:#6B8C7E">Paiement Wave ou Orange Money · Support : <a href="{support}">WhatsApp</a></p>
</div>
<div style="background:#0B3D2E;color:#fff;padding:14px;text-align:center;font-size:.75rem;opacity:.8">
© 2026 {product} 🇸🇳 · <a href="{app_url}" style="color:#fff">{app_url}</a>
</div>
</div>
</body></html>"#
    );

    Notification {
        to: account.email.clone(),
        subject,
        html,
    }
}
