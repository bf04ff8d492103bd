use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;

/// User record in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String, // hash key
    #[serde(skip_serializing)]
    pub password: String, // Argon2 PHC string, never exposed
    pub nickname: String,
    pub f_code: String,
    pub confirmed: bool,
}

impl User {
    pub fn new_unconfirmed(email: &str, password_hash: &str, nickname: &str, f_code: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password_hash.to_string(),
            nickname: nickname.to_string(),
            f_code: f_code.to_string(),
            confirmed: false,
        }
    }

    pub(crate) fn to_item(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("email".to_string(), AttributeValue::S(self.email.clone())),
            ("password".to_string(), AttributeValue::S(self.password.clone())),
            ("nickname".to_string(), AttributeValue::S(self.nickname.clone())),
            ("f_code".to_string(), AttributeValue::S(self.f_code.clone())),
            ("confirmed".to_string(), AttributeValue::Bool(self.confirmed)),
        ])
    }

    /// Missing optional attributes default; missing key or hash yields `None`.
    pub(crate) fn from_item(item: &HashMap<String, AttributeValue>) -> Option<Self> {
        let text = |name: &str| item.get(name).and_then(|v| v.as_s().ok()).cloned();
        Some(Self {
            email: text("email")?,
            password: text("password")?,
            nickname: text("nickname").unwrap_or_default(),
            f_code: text("f_code").unwrap_or_default(),
            confirmed: item
                .get("confirmed")
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(false),
        })
    }
}
