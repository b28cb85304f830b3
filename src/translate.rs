//! Human-readable messages for `validator` failures.
//!
//! Every failure is rendered from a template in which `{0}` is the field's
//! display name (`user_name` → `UserName`) and `{1}` is the rule's primary
//! parameter:
//!
//! ```text
//! range(exclusive_min = 0)   → "Age must be greater than 0"
//! custom(function = required) → "Name is a required field"
//! length(min = 3)            → "Name must be at least 3 characters in length"
//! ```
//!
//! Templates can be overridden per rule code (`"range"`) or per rule variant
//! (`"range.exclusive_min"`); the variant wins. A `message` given on the
//! validator attribute itself wins over both.

use std::collections::HashMap;

use serde_json::Value;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::FieldFailure;
use crate::error_tree::{STRUCT_ERRORS, pascal_case};

/// Root segment of every failure path.
const ROOT: &str = "Payload";

/// Message templates for validation failures.
#[derive(Clone, Debug, Default)]
pub struct Translations {
    overrides: HashMap<String, String>,
}

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the template for a rule code or rule variant.
    pub fn set(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.overrides.insert(key.into(), template.into());
    }

    /// Renders the message for one failure on the field displayed as `field`.
    pub fn message(&self, field: &str, error: &ValidationError) -> String {
        if let Some(message) = &error.message {
            return message.to_string();
        }

        let rule = Rule::of(error);
        let template = self
            .overrides
            .get(&format!("{}.{}", error.code, rule.variant))
            .or_else(|| self.overrides.get(&*error.code))
            .map(String::as_str)
            .unwrap_or(rule.template);

        template
            .replace("{0}", field)
            .replace("{1}", rule.param.as_deref().unwrap_or_default())
    }

    /// Renders a struct-level (`schema`) failure, which has no field to name.
    ///
    /// An explicit `message` wins, then an override keyed by the error code
    /// (with `{0}` left empty), then `"Invalid payload"`.
    pub fn struct_message(&self, error: &ValidationError) -> String {
        if let Some(message) = &error.message {
            return message.to_string();
        }
        match self.overrides.get(&*error.code) {
            Some(template) => template.replace("{0}", "").trim().to_owned(),
            None => "Invalid payload".to_owned(),
        }
    }

    /// Flattens nested `validator` errors into failures rooted at `Payload`.
    ///
    /// Each field reports a single failure: its `required` one if present,
    /// otherwise the first.
    pub fn failures(&self, errors: &ValidationErrors) -> Vec<FieldFailure> {
        let mut out = Vec::new();
        self.walk(errors, ROOT, &mut out);
        out
    }

    fn walk(&self, errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldFailure>) {
        for (field, kind) in errors.errors() {
            let field = field.to_string();
            let path = format!("{prefix}.{field}");
            match kind {
                ValidationErrorsKind::Field(list) => {
                    let picked = list.iter().find(|e| e.code == "required").or(list.first());
                    if let Some(error) = picked {
                        let message = if field == STRUCT_ERRORS {
                            self.struct_message(error)
                        } else {
                            self.message(&pascal_case(&field), error)
                        };
                        out.push(FieldFailure::new(path, message));
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.walk(inner, &path, out),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.walk(inner, &format!("{path}[{index}]"), out);
                    }
                }
            }
        }
    }
}

// ── Default templates ─────────────────────────────────────────────────────────

struct Rule {
    variant: &'static str,
    template: &'static str,
    param: Option<String>,
}

impl Rule {
    fn new(variant: &'static str, template: &'static str, param: Option<String>) -> Self {
        Self { variant, template, param }
    }

    fn of(error: &ValidationError) -> Self {
        let param = |name: &str| error.params.get(name).map(display);
        let value = error.params.get("value");

        match &*error.code {
            "required" => Self::new("required", "{0} is a required field", None),
            "range" => {
                let number = value.and_then(Value::as_f64);
                let below = |bound: &str, inclusive: bool| {
                    let bound = error.params.get(bound).and_then(Value::as_f64);
                    match (number, bound) {
                        (Some(n), Some(b)) => if inclusive { n < b } else { n <= b },
                        _ => false,
                    }
                };
                if below("min", true) {
                    Self::new("min", "{0} must be {1} or greater", param("min"))
                } else if below("exclusive_min", false) {
                    Self::new("exclusive_min", "{0} must be greater than {1}", param("exclusive_min"))
                } else if error.params.contains_key("max") {
                    Self::new("max", "{0} must be {1} or less", param("max"))
                } else if error.params.contains_key("exclusive_max") {
                    Self::new("exclusive_max", "{0} must be less than {1}", param("exclusive_max"))
                } else if error.params.contains_key("exclusive_min") {
                    Self::new("exclusive_min", "{0} must be greater than {1}", param("exclusive_min"))
                } else {
                    Self::new("min", "{0} must be {1} or greater", param("min"))
                }
            }
            "length" => {
                let items = value.is_some_and(Value::is_array);
                let len = value.and_then(|v| match v {
                    Value::String(s) => Some(s.chars().count() as f64),
                    Value::Array(a) => Some(a.len() as f64),
                    _ => None,
                });
                let min = error.params.get("min").and_then(Value::as_f64);
                let too_short = matches!((len, min), (Some(l), Some(m)) if l < m);

                match (error.params.contains_key("equal"), too_short, items) {
                    (true, _, false) => Self::new("equal", "{0} must be {1} characters in length", param("equal")),
                    (true, _, true) => Self::new("equal", "{0} must contain {1} items", param("equal")),
                    (false, true, false) => {
                        Self::new("min", "{0} must be at least {1} characters in length", param("min"))
                    }
                    (false, true, true) => Self::new("min", "{0} must contain at least {1} items", param("min")),
                    (false, false, false) if error.params.contains_key("max") => {
                        Self::new("max", "{0} must be a maximum of {1} characters in length", param("max"))
                    }
                    (false, false, true) if error.params.contains_key("max") => {
                        Self::new("max", "{0} must contain at maximum {1} items", param("max"))
                    }
                    _ => Self::new("min", "{0} must be at least {1} characters in length", param("min")),
                }
            }
            "email" => Self::new("email", "{0} must be a valid email address", None),
            "url" => Self::new("url", "{0} must be a valid URL", None),
            "must_match" => Self::new("must_match", "{0} must be equal to {1}", param("other").map(|o| pascal_case(&o))),
            "contains" => Self::new("contains", "{0} must contain the text '{1}'", param("needle")),
            "does_not_contain" => Self::new("does_not_contain", "{0} cannot contain the text '{1}'", param("needle")),
            "credit_card" => Self::new("credit_card", "{0} must be a valid credit card number", None),
            "regex" => Self::new("regex", "{0} does not match the required format", None),
            "ip" => Self::new("ip", "{0} must be a valid IP address", None),
            _ => Self::new("invalid", "{0} is invalid", None),
        }
    }
}

/// Renders a rule parameter: whole floats print without a fraction and
/// strings without quotes.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Fails on empty strings with code `required`.
///
/// For use with `validator`'s `custom` rule:
///
/// ```rust
/// use routekit::required;
/// use validator::Validate;
///
/// #[derive(Validate)]
/// struct Signup {
///     #[validate(custom(function = "required"))]
///     name: String,
/// }
/// ```
pub fn required(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use serde_json::json;

    use super::*;

    fn error(code: &'static str, params: &[(&'static str, Value)]) -> ValidationError {
        let mut error = ValidationError::new(code);
        for (name, value) in params {
            error.add_param(Cow::Borrowed(*name), value);
        }
        error
    }

    #[test]
    fn range_messages_pick_the_failed_bound() {
        let tr = Translations::new();

        let gt = error("range", &[("exclusive_min", json!(0.0)), ("value", json!(0.0))]);
        assert_eq!(tr.message("Age", &gt), "Age must be greater than 0");

        let bounded = error("range", &[("min", json!(18)), ("max", json!(99)), ("value", json!(120))]);
        assert_eq!(tr.message("Age", &bounded), "Age must be 99 or less");

        let low = error("range", &[("min", json!(18)), ("max", json!(99)), ("value", json!(3))]);
        assert_eq!(tr.message("Age", &low), "Age must be 18 or greater");
    }

    #[test]
    fn length_messages_for_strings_and_lists() {
        let tr = Translations::new();

        let short = error("length", &[("min", json!(3)), ("value", json!("ab"))]);
        assert_eq!(tr.message("Name", &short), "Name must be at least 3 characters in length");

        let long = error("length", &[("max", json!(2)), ("value", json!(["a", "b", "c"]))]);
        assert_eq!(tr.message("Tags", &long), "Tags must contain at maximum 2 items");
    }

    #[test]
    fn overrides_and_explicit_messages() {
        let mut tr = Translations::new();
        tr.set("required", "{0} cannot be blank");
        tr.set("range.exclusive_min", "{0} must exceed {1}");

        assert_eq!(tr.message("Name", &error("required", &[])), "Name cannot be blank");

        let gt = error("range", &[("exclusive_min", json!(1.5)), ("value", json!(1))]);
        assert_eq!(tr.message("Ratio", &gt), "Ratio must exceed 1.5");

        let mut explicit = error("email", &[]);
        explicit.message = Some(Cow::Borrowed("bad address"));
        assert_eq!(tr.message("Email", &explicit), "bad address");
    }

    #[test]
    fn struct_level_messages_name_no_field() {
        let mut tr = Translations::new();
        assert_eq!(tr.struct_message(&error("check", &[])), "Invalid payload");

        tr.set("passwords", "Passwords must match");
        assert_eq!(tr.struct_message(&error("passwords", &[])), "Passwords must match");

        let mut explicit = error("check", &[]);
        explicit.message = Some(Cow::Borrowed("dates are out of order"));
        assert_eq!(tr.struct_message(&explicit), "dates are out of order");
    }

    #[test]
    fn unknown_codes_fall_back() {
        assert_eq!(Translations::new().message("Slug", &error("slug", &[])), "Slug is invalid");
    }

    #[test]
    fn required_rule() {
        assert!(required("").is_err());
        assert!(required(" ").is_ok());
    }
}
