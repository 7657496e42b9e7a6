//! RDAP document normalization into WHOIS-style keys.
//!
//! RDAP responses are deeply structured JSON (RFC 9083); WHOIS records are
//! flat `KEY: value` pairs. This module maps the interesting parts of a
//! merged RDAP document — events, status, nameservers, and the recursive
//! `entities`/`vcardArray` substructure — onto the flat uppercased keys the
//! rest of the library (and forty years of WHOIS consumers) expect.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Static vCard-property -> field-name table (RFC 6350 property names),
/// embedded as a read-only resource.
static VCARD_MAP_JSON: &str = include_str!("../resources/vcard-map.json");

lazy_static::lazy_static! {
    static ref VCARD_MAP: HashMap<String, String> =
        serde_json::from_str(VCARD_MAP_JSON).expect("embedded vcard-map.json is valid");
}

/// Look up the output field name for a vCard property.
///
/// Unmapped properties other than `version` fall back to their own
/// uppercased name; `version` yields None (dropped).
pub fn vcard_field_name(property: &str) -> Option<String> {
    if let Some(mapped) = VCARD_MAP.get(property) {
        return Some(mapped.clone());
    }
    if property == "version" {
        return None;
    }
    Some(property.to_uppercase())
}

/// Build the WHOIS-style view of a merged RDAP document.
///
/// Seeds the flat record from the document's top-level fields, then flattens
/// every entity (recursively) into role-prefixed keys.
pub fn whois_view(rdap: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();

    if let Some(Value::String(port43)) = rdap.get("port43") {
        if !port43.is_empty() {
            out.insert(
                "REGISTRAR WHOIS SERVER".to_string(),
                Value::String(port43.clone()),
            );
        }
    }
    if let Some(Value::String(handle)) = rdap.get("handle") {
        if !handle.is_empty() {
            out.insert("REGISTRY DOMAIN ID".to_string(), Value::String(handle.clone()));
        }
    }

    if let Some(Value::Array(events)) = rdap.get("events") {
        for event in events {
            let action = event.get("eventAction").and_then(Value::as_str);
            let date = event.get("eventDate").and_then(Value::as_str);
            if let (Some(action), Some(date)) = (action, date) {
                let key = match action {
                    "transfer" => Some("TRANSFER DATE"),
                    "expiration" => Some("REGISTRY EXPIRY DATE"),
                    "registration" => Some("CREATION DATE"),
                    "last changed" => Some("UPDATED DATE"),
                    _ => None,
                };
                if let Some(key) = key {
                    out.insert(key.to_string(), Value::String(date.to_string()));
                }
            }
        }
    }

    let status = rdap
        .get("status")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    out.insert("DOMAIN STATUS".to_string(), Value::Array(status));

    let mut name_servers = Vec::new();
    if let Some(Value::Array(nameservers)) = rdap.get("nameservers") {
        for nameserver in nameservers {
            if let Some(ldh) = nameserver.get("ldhName").and_then(Value::as_str) {
                if !ldh.is_empty() {
                    name_servers.push(Value::String(ldh.to_string()));
                }
            }
        }
    }
    out.insert("NAME SERVER".to_string(), Value::Array(name_servers));

    if let Some(Value::Array(entities)) = rdap.get("entities") {
        for entity in entities {
            flatten_entity("", entity, &mut out);
        }
    }

    out
}

/// Flatten one RDAP entity (and its sub-entities) into the output record.
///
/// The key prefix is the inherited prefix plus the entity's first role,
/// uppercased; `publicIds` pairs become `TYPE -> identifier` fields; each
/// `vcardArray` property is stored under `"{prefix} {field}"`.
pub fn flatten_entity(prefix: &str, entity: &Value, out: &mut Map<String, Value>) {
    let role = entity
        .get("roles")
        .and_then(Value::as_array)
        .and_then(|roles| roles.first())
        .and_then(Value::as_str)
        .unwrap_or("");
    let prefix = format!("{}{}", prefix, role).trim().to_uppercase();

    if let Some(Value::Array(public_ids)) = entity.get("publicIds") {
        for public_id in public_ids {
            let id_type = public_id.get("type").and_then(Value::as_str);
            let identifier = public_id.get("identifier").and_then(Value::as_str);
            if let (Some(id_type), Some(identifier)) = (id_type, identifier) {
                out.insert(
                    id_type.to_uppercase(),
                    Value::String(identifier.to_string()),
                );
            }
        }
    }

    // vcardArray shape per RFC 7095: ["vcard", [[name, params, type, value...], ...]]
    if let Some(properties) = entity
        .get("vcardArray")
        .and_then(Value::as_array)
        .and_then(|outer| outer.get(1))
        .and_then(Value::as_array)
    {
        for property in properties {
            let Some(items) = property.as_array() else {
                continue;
            };
            if items.len() < 4 {
                continue;
            }
            let Some(name) = items[0].as_str() else {
                continue;
            };
            let Some(field) = vcard_field_name(name) else {
                continue;
            };
            let key = format!("{} {}", prefix, field).trim().to_string();
            out.insert(key, Value::String(vcard_value_text(&items[3])));
        }
    }

    if let Some(Value::Array(entities)) = entity.get("entities") {
        for sub_entity in entities {
            flatten_entity(&prefix, sub_entity, out);
        }
    }
}

/// Space-joined stringification of a vCard value's components.
fn vcard_value_text(value: &Value) -> String {
    match value {
        Value::Array(parts) => {
            let mut pieces = Vec::new();
            for part in parts {
                let text = vcard_value_text(part);
                if !text.is_empty() {
                    pieces.push(text);
                }
            }
            pieces.join(" ")
        }
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(_) => value.to_string(),
    }
}
