use serde::{Deserialize, Serialize};

/// Recipients the remote accepts in a single send
pub const MAX_RECIPIENTS: usize = 10;

const DEFAULT_ATTRIBUTE_TYPE: &str = "String";

// ==================================================================================================
// Request Models
// ==================================================================================================

/// Real-time message send request
///
/// `id` names the message template and becomes part of the endpoint path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub id: String,
    pub recipients: Vec<Recipient>,
    /// Used for recipients that carry no attributes of their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_attributes: Option<Vec<Attribute>>,
}

impl OutboundMessage {
    pub fn new(id: impl Into<String>, recipients: Vec<Recipient>) -> Self {
        Self {
            id: id.into(),
            recipients,
            default_attributes: None,
        }
    }

    pub fn with_default_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.default_attributes = Some(attributes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RecipientFields")]
pub struct Recipient {
    pub email_address: String,
    pub customer_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
}

impl Recipient {
    /// Recipient keyed by its own email address
    pub fn new(email_address: impl Into<String>) -> Self {
        let email_address = email_address.into();
        Self {
            customer_key: email_address.clone(),
            email_address,
            attributes: None,
        }
    }

    pub fn with_customer_key(mut self, customer_key: impl Into<String>) -> Self {
        self.customer_key = customer_key.into();
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

/// Wire shape accepted on input, where `customerKey` is optional
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipientFields {
    email_address: String,
    #[serde(default)]
    customer_key: Option<String>,
    #[serde(default)]
    attributes: Option<Vec<Attribute>>,
}

impl From<RecipientFields> for Recipient {
    fn from(fields: RecipientFields) -> Self {
        Self {
            customer_key: fields
                .customer_key
                .unwrap_or_else(|| fields.email_address.clone()),
            email_address: fields.email_address,
            attributes: fields.attributes,
        }
    }
}

/// Personalization attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub attribute_name: String,
    pub attribute_value: String,
    #[serde(default = "default_attribute_type")]
    pub attribute_type: String,
}

impl Attribute {
    /// String-typed attribute
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::typed(name, value, DEFAULT_ATTRIBUTE_TYPE)
    }

    pub fn typed(
        name: impl Into<String>,
        value: impl Into<String>,
        attribute_type: impl Into<String>,
    ) -> Self {
        Self {
            attribute_name: name.into(),
            attribute_value: value.into(),
            attribute_type: attribute_type.into(),
        }
    }
}

fn default_attribute_type() -> String {
    DEFAULT_ATTRIBUTE_TYPE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_key_defaults_to_email() {
        let message = OutboundMessage::new(
            "message_id",
            vec![Recipient::new("user@email.io")
                .with_attributes(vec![Attribute::new("!att_name!", "att_value")])],
        );

        let body = serde_json::to_value(&message).unwrap();
        assert_eq!(body["id"], "message_id");
        assert_eq!(body["recipients"][0]["emailAddress"], "user@email.io");
        assert_eq!(body["recipients"][0]["customerKey"], "user@email.io");
        assert_eq!(
            body["recipients"][0]["attributes"][0],
            json!({
                "attributeName": "!att_name!",
                "attributeValue": "att_value",
                "attributeType": "String"
            })
        );
    }

    #[test]
    fn test_absent_optionals_are_omitted() {
        let message = OutboundMessage::new("m", vec![Recipient::new("a@b.io")]);
        let body = serde_json::to_value(&message).unwrap();

        let obj = body.as_object().unwrap();
        assert!(!obj.contains_key("defaultAttributes"));
        let recipient = body["recipients"][0].as_object().unwrap();
        assert!(!recipient.contains_key("attributes"));
        assert!(!serde_json::to_string(&message).unwrap().contains("null"));
    }

    #[test]
    fn test_default_attributes_serialized_when_present() {
        let message = OutboundMessage::new("m", vec![Recipient::new("a@b.io")])
            .with_default_attributes(vec![Attribute::typed("age", "42", "Number")]);
        let body = serde_json::to_value(&message).unwrap();
        assert_eq!(body["defaultAttributes"][0]["attributeType"], "Number");
    }

    #[test]
    fn test_explicit_customer_key() {
        let recipient = Recipient::new("a@b.io").with_customer_key("cust-1");
        let body = serde_json::to_value(&recipient).unwrap();
        assert_eq!(body["customerKey"], "cust-1");
        assert_eq!(body["emailAddress"], "a@b.io");
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let message: OutboundMessage = serde_json::from_value(json!({
            "id": "welcome",
            "recipients": [
                {"emailAddress": "user@email.io", "attributes": [
                    {"attributeName": "first", "attributeValue": "Ann"}
                ]},
                {"emailAddress": "other@email.io", "customerKey": "42"}
            ]
        }))
        .unwrap();

        assert_eq!(message.recipients[0].customer_key, "user@email.io");
        assert_eq!(
            message.recipients[0].attributes.as_ref().unwrap()[0].attribute_type,
            "String"
        );
        assert_eq!(message.recipients[1].customer_key, "42");
        assert!(message.default_attributes.is_none());
    }
}
