//! Zoho contact → wallet record mapping

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// A Zoho CRM contact as returned by the search API (field name → value).
pub type Contact = Map<String, Value>;

/// Fields requested from the search API; everything else lands in `content.properties`.
pub const CONTACT_FIELDS: &[&str] = &[
    "Email",
    "First_Name",
    "Last_Name",
    "company",
    "Phone",
    "Title",
    "Mailing_Country",
    "Mailing_City",
    "Mailing_Street",
    "address2",
    "Mailing_Zip",
    "registration_number",
    "tax_file_number",
    "sales_service_tax_number",
    "kyb_verified",
    "kyb_verified_at",
    "id",
    "Created_Time",
    "Modified_Time",
];

pub const SEARCH_ENDPOINT: &str = "/crm/v8/Contacts/search";
pub const CONNECTOR_VERSION: &str = "1.0.0";
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize)]
pub struct WalletRecord {
    pub namespace: String,
    pub endpoint: String,
    pub data: Value,
}

fn field(contact: &Contact, name: &str) -> Value {
    contact.get(name).cloned().unwrap_or(Value::Null)
}

pub fn to_wallet_record(contact: &Contact) -> WalletRecord {
    let properties: Map<String, Value> = contact
        .iter()
        .filter(|(key, _)| !CONTACT_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let data = json!({
        "id": field(contact, "id"),
        "created_at": field(contact, "Created_Time"),
        "updated_at": field(contact, "Modified_Time"),
        "source": {
            "provider": "zoho_crm",
            "version": "v8",
            "endpoint": SEARCH_ENDPOINT,
            "module": "Contacts"
        },
        "content": {
            "email": field(contact, "Email"),
            "firstname": field(contact, "First_Name"),
            "lastname": field(contact, "Last_Name"),
            "company": field(contact, "company"),
            "phone": field(contact, "Phone"),
            "jobtitle": field(contact, "Title"),
            "country": field(contact, "Mailing_Country"),
            "city": field(contact, "Mailing_City"),
            "registration_number": field(contact, "registration_number"),
            "address": field(contact, "Mailing_Street"),
            "address2": field(contact, "address2"),
            "zip": field(contact, "Mailing_Zip"),
            "tax_file_number": field(contact, "tax_file_number"),
            "sales_service_tax_number": field(contact, "sales_service_tax_number"),
            "kyb_verified": field(contact, "kyb_verified"),
            "kyb_verified_at": field(contact, "kyb_verified_at"),
            "zoho_object_id": field(contact, "id"),
            "properties": properties
        },
        "metadata": {
            "sync_timestamp": Utc::now().to_rfc3339(),
            "connector_version": CONNECTOR_VERSION,
            "schema_version": SCHEMA_VERSION,
            "import_trigger": "badge_authentication"
        }
    });

    WalletRecord {
        namespace: "zoho_crm".to_string(),
        endpoint: SEARCH_ENDPOINT.to_string(),
        data,
    }
}
