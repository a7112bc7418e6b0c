//! Handlebars templates for the messages the platform sends.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::error::DomainError;
use crate::mail::MailContent;

const PURCHASE_HTML: &str = r#"<h2>Thank you for your purchase</h2>
<p>Card: <strong>{{card_name}}</strong></p>
<p>Price: {{sale_price}}</p>
<p>Your activation code:</p>
<p style="font-size:18px;font-family:monospace"><strong>{{activation_code}}</strong></p>
<p>Purchased at {{purchased_at}}. Keep this code safe; it can only be redeemed once.</p>"#;

const PURCHASE_TEXT: &str = "Thank you for your purchase.\n\
Card: {{{card_name}}}\n\
Price: {{{sale_price}}}\n\
Activation code: {{{activation_code}}}\n\
Purchased at {{{purchased_at}}}. The code can only be redeemed once.\n";

const VERIFICATION_HTML: &str = r#"<h2>Your verification code</h2>
<p style="font-size:24px;letter-spacing:4px"><strong>{{code}}</strong></p>
<p>The code expires in {{ttl_minutes}} minutes. If you did not request it, ignore this message.</p>"#;

const VERIFICATION_TEXT: &str = "Your verification code: {{{code}}}\n\
It expires in {{{ttl_minutes}}} minutes.\n";

const NEW_ORDER_HTML: &str = r#"<h2>New order in {{channel_name}}</h2>
<ul>
<li>Order: {{order_id}}</li>
<li>Card: {{card_name}}</li>
<li>Activation code: {{activation_code}}</li>
<li>Created at: {{created_at}}</li>
</ul>
<p>Please process it in the staff console.</p>"#;

const NEW_ORDER_TEXT: &str = "New order in {{{channel_name}}}\n\
Order: {{{order_id}}}\n\
Card: {{{card_name}}}\n\
Activation code: {{{activation_code}}}\n\
Created at: {{{created_at}}}\n";

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseConfirmation {
    pub card_name: String,
    pub activation_code: String,
    pub sale_price: f64,
    pub purchased_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrderNotification {
    pub order_id: String,
    pub card_name: String,
    pub activation_code: String,
    pub created_at: String,
    pub channel_name: String,
}

pub struct MailTemplates {
    registry: Handlebars<'static>,
}

impl MailTemplates {
    pub fn new() -> Result<Self, DomainError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        for (name, source) in [
            ("purchase_html", PURCHASE_HTML),
            ("purchase_text", PURCHASE_TEXT),
            ("verification_html", VERIFICATION_HTML),
            ("verification_text", VERIFICATION_TEXT),
            ("new_order_html", NEW_ORDER_HTML),
            ("new_order_text", NEW_ORDER_TEXT),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(|e| DomainError::InternalError(format!("template {name}: {e}")))?;
        }
        Ok(Self { registry })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, DomainError> {
        self.registry
            .render(name, data)
            .map_err(|e| DomainError::MailError(format!("render {name}: {e}")))
    }

    pub fn purchase_confirmation(
        &self,
        to: &str,
        data: &PurchaseConfirmation,
    ) -> Result<MailContent, DomainError> {
        Ok(MailContent {
            to: vec![to.to_string()],
            subject: format!("Your activation code for {}", data.card_name),
            html_body: self.render("purchase_html", data)?,
            text_body: self.render("purchase_text", data)?,
        })
    }

    pub fn verification_code(
        &self,
        to: &str,
        code: &str,
        ttl_minutes: u64,
    ) -> Result<MailContent, DomainError> {
        let data = json!({ "code": code, "ttl_minutes": ttl_minutes });
        Ok(MailContent {
            to: vec![to.to_string()],
            subject: "Your verification code".to_string(),
            html_body: self.render("verification_html", &data)?,
            text_body: self.render("verification_text", &data)?,
        })
    }

    pub fn new_order_notification(
        &self,
        to: Vec<String>,
        data: &NewOrderNotification,
    ) -> Result<MailContent, DomainError> {
        Ok(MailContent {
            to,
            subject: format!("New order: {}", data.card_name),
            html_body: self.render("new_order_html", data)?,
            text_body: self.render("new_order_text", data)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_confirmation_contains_code() {
        let templates = MailTemplates::new().unwrap();
        let mail = templates
            .purchase_confirmation(
                "buyer@example.com",
                &PurchaseConfirmation {
                    card_name: "Card A".into(),
                    activation_code: "ABCD-EFGH-JKLM-NPQR".into(),
                    sale_price: 10.0,
                    purchased_at: "2024-01-01 00:00:00".into(),
                },
            )
            .unwrap();
        assert_eq!(mail.to, vec!["buyer@example.com".to_string()]);
        assert!(mail.html_body.contains("ABCD-EFGH-JKLM-NPQR"));
        assert!(mail.text_body.contains("Card A"));
    }

    #[test]
    fn test_values_are_html_escaped() {
        let templates = MailTemplates::new().unwrap();
        let mail = templates
            .new_order_notification(
                vec!["staff@example.com".into()],
                &NewOrderNotification {
                    order_id: "1".into(),
                    card_name: "<b>x</b>".into(),
                    activation_code: "CODE".into(),
                    created_at: "now".into(),
                    channel_name: "Steam".into(),
                },
            )
            .unwrap();
        assert!(!mail.html_body.contains("<b>x</b>"));
        assert!(mail.html_body.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_verification_code_mail() {
        let templates = MailTemplates::new().unwrap();
        let mail = templates.verification_code("u@example.com", "123456", 5).unwrap();
        assert!(mail.text_body.contains("123456"));
        assert!(mail.text_body.contains("5 minutes"));
    }
}
