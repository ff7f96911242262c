use std::collections::HashSet;

use serde_json::Value;

use crate::command::model::{
    ALLOWED_FIELDS, REQUIRED_FIELDS, VALID_ACTION_PREFIXES, VALID_FIXED_ACTIONS, VALID_QUANTITIES,
};

fn is_valid_action(value: &Value) -> bool {
    let Some(action) = value.as_str() else {
        return false;
    };

    if VALID_FIXED_ACTIONS.contains(&action) {
        return true;
    }

    for prefix in VALID_ACTION_PREFIXES {
        if let Some(rest) = action.strip_prefix(prefix) {
            // 裸前缀（如单独的 "设置"）不算有效动作。
            return !rest.is_empty();
        }
    }

    false
}

fn is_valid_nonempty_str(value: &Value) -> bool {
    matches!(value.as_str(), Some(text) if !text.is_empty())
}

fn is_valid_category(value: &Value, allowed_categories: &HashSet<&str>) -> bool {
    matches!(value.as_str(), Some(category) if allowed_categories.contains(category))
}

fn is_valid_quantity(value: &Value) -> bool {
    matches!(value.as_str(), Some(quantity) if VALID_QUANTITIES.contains(&quantity))
}

fn is_valid_count(value: &Value) -> bool {
    // JSON 的 true/false 必须显式排除，不能当成整数接受。
    if value.is_boolean() {
        return false;
    }
    value.as_i64().is_some()
}

pub fn validate_command(command: &Value, allowed_categories: &HashSet<&str>) -> bool {
    let Some(fields) = command.as_object() else {
        return false;
    };

    if fields.keys().any(|key| !ALLOWED_FIELDS.contains(&key.as_str())) {
        return false;
    }

    if REQUIRED_FIELDS.iter().any(|field| !fields.contains_key(*field)) {
        return false;
    }

    if !is_valid_action(&fields["a"]) {
        return false;
    }

    if !is_valid_nonempty_str(&fields["s"]) {
        return false;
    }

    if !is_valid_nonempty_str(&fields["n"]) {
        return false;
    }

    if !is_valid_category(&fields["t"], allowed_categories) {
        return false;
    }

    if !is_valid_quantity(&fields["q"]) {
        return false;
    }

    if let Some(count) = fields.get("c") {
        if !is_valid_count(count) {
            return false;
        }
    }

    true
}

/// 列表级校验：必须非空，且所有元素都通过单条校验；不接受部分有效。
pub fn validate_commands(commands: &[Value], allowed_categories: &HashSet<&str>) -> bool {
    if commands.is_empty() {
        return false;
    }

    commands.iter().all(|command| validate_command(command, allowed_categories))
}
