//! Flat `key=value;key=value` records sent in `SPEC` and `MATSPEC` replies.

use crate::intent::{MaterialIntent, ProductIntent};

/// Field order of a product record.
pub const PRODUCT_KEYS: [&str; 10] = [
    "suggest",
    "category",
    "style",
    "budget_min",
    "budget_max",
    "max_len",
    "max_w",
    "max_h",
    "choice_id",
    "choice_name",
];

/// Field order of a material record.
pub const MATERIAL_KEYS: [&str; 5] = ["apply", "slot", "color", "finish", "style"];

/// Replaces the record separators so a value can never split a record.
pub fn escape_value(value: &str) -> String {
    value.replace([';', '|'], "/")
}

/// Renders integral values without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value.is_finite() {
        format!("{value}")
    } else {
        "0".to_string()
    }
}

fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| escape_value(tag))
        .collect::<Vec<_>>()
        .join("|")
}

fn join_fields(keys: &[&str], values: Vec<String>) -> String {
    keys.iter()
        .zip(values)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Encodes a product intent. `choice_id` and `choice_name` are always empty.
pub fn encode_product(intent: &ProductIntent) -> String {
    join_fields(
        &PRODUCT_KEYS,
        vec![
            intent.suggest.to_string(),
            escape_value(&intent.category),
            join_tags(&intent.style_tags),
            format_number(intent.budget_min),
            format_number(intent.budget_max),
            format_number(intent.max_length_cm),
            format_number(intent.max_width_cm),
            format_number(intent.max_height_cm),
            String::new(),
            String::new(),
        ],
    )
}

/// Encodes a material intent.
pub fn encode_material(intent: &MaterialIntent) -> String {
    join_fields(
        &MATERIAL_KEYS,
        vec![
            intent.apply.to_string(),
            escape_value(&intent.slot),
            escape_value(&intent.color),
            escape_value(&intent.finish),
            join_tags(&intent.style_tags),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{normalize_material_intent, normalize_product_intent};
    use serde_json::{Map, Value, json};

    fn decode(record: &str) -> Value {
        let mut object = Map::new();
        for pair in record.split(';') {
            let (key, value) = pair.split_once('=').unwrap();
            object.insert(key.to_string(), Value::String(value.to_string()));
        }
        Value::Object(object)
    }

    fn keys_of(record: &str) -> Vec<&str> {
        record
            .split(';')
            .map(|pair| pair.split_once('=').unwrap().0)
            .collect()
    }

    #[test]
    fn test_default_product_record() {
        assert_eq!(
            encode_product(&ProductIntent::default()),
            "suggest=false;category=;style=;budget_min=0;budget_max=0;max_len=0;max_w=0;max_h=0;choice_id=;choice_name="
        );
    }

    #[test]
    fn test_product_record_fields() {
        let intent = ProductIntent {
            suggest: true,
            category: "coffee_table".into(),
            style_tags: vec!["modern".into(), "cozy".into()],
            budget_min: 200.0,
            budget_max: 449.99,
            max_length_cm: 60.0,
            max_width_cm: 0.0,
            max_height_cm: 45.5,
        };
        let record = encode_product(&intent);
        assert_eq!(
            record,
            "suggest=true;category=coffee_table;style=modern|cozy;budget_min=200;budget_max=449.99;max_len=60;max_w=0;max_h=45.5;choice_id=;choice_name="
        );
        assert_eq!(keys_of(&record), PRODUCT_KEYS.to_vec());
    }

    #[test]
    fn test_separators_inside_values_are_escaped() {
        let intent = MaterialIntent {
            apply: true,
            slot: "wood;oak".into(),
            color: "red|blue".into(),
            finish: "matte".into(),
            style_tags: vec!["a|b".into(), "c;d".into()],
        };
        let record = encode_material(&intent);
        assert_eq!(
            record,
            "apply=true;slot=wood/oak;color=red/blue;finish=matte;style=a/b|c/d"
        );
        assert_eq!(keys_of(&record), MATERIAL_KEYS.to_vec());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(900.0), "900");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(99.5), "99.5");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn test_product_record_decodes_to_same_intent() {
        let first = normalize_product_intent(
            "looking for a scandi sectional between 800 and 1.5k",
            &json!({"max_depth_cm": 95, "max_width_cm": 240}),
        );
        assert!(first.suggest);
        let again = normalize_product_intent("", &decode(&encode_product(&first)));
        assert_eq!(first, again);
    }

    #[test]
    fn test_material_record_decodes_to_same_intent() {
        let first = normalize_material_intent("[ITEM_SELECTED] brushed brass, industrial", &json!({}));
        assert_eq!(first.slot, "metal");
        assert_eq!(first.finish, "brushed");
        let again = normalize_material_intent("", &decode(&encode_material(&first)));
        assert_eq!(first, again);
    }
}
