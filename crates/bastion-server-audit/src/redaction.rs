// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sensitive-data redaction for audit entries.
//!
//! Every free-text field of an entry goes through the content policy rules
//! before it reaches a sink. Matches become `[REDACTED:<rule-id>]`.

use bastion_server_policy::redact;
use serde_json::Value;
use std::borrow::Cow;

use crate::event::AuditLogEntry;

const MAX_DEPTH: usize = 128;

/// Redacts string values and object keys, recursively. Nesting deeper than
/// 128 levels is left untouched.
pub fn redact_json_value(value: &mut Value) {
	redact_json_value_with_depth(value, 0);
}

fn redact_json_value_with_depth(value: &mut Value, depth: usize) {
	if depth > MAX_DEPTH {
		return;
	}

	match value {
		Value::String(s) => {
			if let Cow::Owned(new_s) = redact(s) {
				*s = new_s;
			}
		}
		Value::Array(arr) => {
			for item in arr {
				redact_json_value_with_depth(item, depth + 1);
			}
		}
		Value::Object(obj) => {
			let renames: Vec<(String, String)> = obj
				.keys()
				.filter_map(|key| match redact(key) {
					Cow::Owned(new_key) => Some((key.clone(), new_key)),
					Cow::Borrowed(_) => None,
				})
				.collect();

			for (old_key, new_key) in renames {
				if let Some(val) = obj.remove(&old_key) {
					obj.insert(new_key, val);
				}
			}

			for (_, v) in obj.iter_mut() {
				redact_json_value_with_depth(v, depth + 1);
			}
		}
		_ => {}
	}
}

pub fn redact_optional_string(s: &mut Option<String>) {
	if let Some(ref mut val) = s {
		if let Cow::Owned(new_val) = redact(val) {
			*val = new_val;
		}
	}
}

/// Redacts every free-text field of an entry.
pub fn redact_entry(entry: &mut AuditLogEntry) {
	redact_json_value(&mut entry.details);

	if let Cow::Owned(redacted) = redact(&entry.action) {
		entry.action = redacted;
	}

	redact_optional_string(&mut entry.resource_id);
	redact_optional_string(&mut entry.user_agent);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::AuditEventType;
	use serde_json::json;

	fn aws_key() -> String {
		format!("AKIA{}", "Z7VRSQ5TJN2XMPLQ")
	}

	#[test]
	fn plain_values_are_untouched() {
		let mut value = json!({ "count": 42, "enabled": true, "note": "nothing here" });
		let original = value.clone();
		redact_json_value(&mut value);
		assert_eq!(value, original);
	}

	#[test]
	fn nested_strings_and_arrays_are_redacted() {
		let mut value = json!({
			"request": {
				"prompt": format!("key {}", aws_key()),
				"history": ["ok", "ssn 123-45-6789"]
			}
		});
		redact_json_value(&mut value);

		let prompt = value["request"]["prompt"].as_str().unwrap();
		assert_eq!(prompt, "key [REDACTED:aws-access-key-id]");
		assert_eq!(value["request"]["history"][0], "ok");
		assert_eq!(value["request"]["history"][1], "ssn [REDACTED:us-ssn]");
	}

	#[test]
	fn secret_in_object_key_is_redacted() {
		let mut value = json!({});
		value
			.as_object_mut()
			.unwrap()
			.insert(aws_key(), json!("value"));
		redact_json_value(&mut value);

		let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
		assert_eq!(keys, ["[REDACTED:aws-access-key-id]"]);
	}

	#[test]
	fn deep_nesting_does_not_overflow() {
		let mut value = json!("leaf 123-45-6789");
		for _ in 0..500 {
			value = json!([value]);
		}
		redact_json_value(&mut value);
	}

	#[test]
	fn redact_entry_covers_free_text_fields() {
		let mut entry = AuditLogEntry::builder(AuditEventType::SuggestionRequested)
			.action(format!("prompt mentioned {}", aws_key()))
			.resource("document", "123-45-6789")
			.user_agent("agent")
			.details(json!({ "prompt": "password=hunter22" }))
			.build();

		redact_entry(&mut entry);

		assert!(!entry.action.contains(&aws_key()));
		assert_eq!(entry.resource_id.as_deref(), Some("[REDACTED:us-ssn]"));
		assert_eq!(entry.user_agent.as_deref(), Some("agent"));
		assert_eq!(entry.details["prompt"], "[REDACTED:password-assignment]");
	}
}
