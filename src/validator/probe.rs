use serde_json::{Map, Value};
use crate::snapshot::is_valid_timestamp;
use super::codes;
use super::finding::Finding;

pub(super) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// One JSON object under inspection, with the coordinates used to label
/// anything found wrong with it.
pub(super) struct Record<'a> {
    pub section: &'a str,
    pub index: Option<usize>,
    pub fields: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    pub fn new(section: &'a str, index: Option<usize>, fields: &'a Map<String, Value>) -> Self {
        Self { section, index, fields }
    }

    pub fn error(&self, code: &'static str, message: impl Into<String>) -> Finding {
        self.place(Finding::error(code, self.section, message))
    }

    pub fn warning(&self, code: &'static str, message: impl Into<String>) -> Finding {
        self.place(Finding::warning(code, self.section, message))
    }

    fn place(&self, finding: Finding) -> Finding {
        match self.index {
            Some(i) => finding.at(i),
            None => finding,
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.fields.get(name)
    }

    /// Present and not `null`.
    pub fn has_value(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn require(&self, names: &[&str], out: &mut Vec<Finding>) {
        for name in names {
            if !self.fields.contains_key(*name) {
                out.push(self.error(codes::MISSING_FIELD, format!("missing required field: {}", name)));
            }
        }
    }

    /// Returns the string when present and well-typed. `null` is only
    /// accepted for optional fields.
    pub fn string(&self, name: &str, optional: bool, out: &mut Vec<Finding>) -> Option<&'a str> {
        match self.fields.get(name)? {
            Value::String(s) => Some(s.as_str()),
            Value::Null if optional => None,
            other => {
                out.push(self.error(
                    codes::INVALID_VALUE,
                    format!("field {} must be a string, found {}", name, type_name(other)),
                ));
                None
            }
        }
    }

    /// Non-negative integer no larger than `max`.
    pub fn uint(&self, name: &str, max: u64, out: &mut Vec<Finding>) -> Option<u64> {
        let value = self.fields.get(name)?;
        match value.as_u64() {
            Some(n) if n <= max => Some(n),
            _ => {
                out.push(self.error(codes::INVALID_VALUE, format!("invalid {}: {}", name, value)));
                None
            }
        }
    }

    /// Process identifier; zero only passes when `allow_zero` is set.
    pub fn pid(&self, name: &str, allow_zero: bool, out: &mut Vec<Finding>) -> Option<u32> {
        let value = self.fields.get(name)?;
        match value.as_u64() {
            Some(0) if !allow_zero => {
                out.push(self.error(codes::INVALID_PID, format!("invalid {}: 0 (must be positive)", name)));
                None
            }
            Some(n) if n <= u64::from(u32::MAX) => Some(n as u32),
            _ => {
                out.push(self.error(codes::INVALID_PID, format!("invalid {}: {}", name, value)));
                None
            }
        }
    }

    pub fn timestamp(&self, name: &str, out: &mut Vec<Finding>) {
        let Some(value) = self.fields.get(name) else {
            return;
        };
        let valid = value.as_str().is_some_and(is_valid_timestamp);
        if !valid {
            out.push(self.error(
                codes::INVALID_TIMESTAMP,
                format!("invalid timestamp for {}: {}", name, value),
            ));
        }
    }

    /// Checks membership of a string field in a closed set.
    pub fn one_of(&self, name: &str, allowed: impl Fn(&str) -> bool, out: &mut Vec<Finding>) -> Option<&'a str> {
        let value = self.fields.get(name)?;
        match value.as_str() {
            Some(s) if allowed(s) => Some(s),
            _ => {
                out.push(self.error(codes::INVALID_ENUM, format!("invalid {}: {}", name, value)));
                None
            }
        }
    }

    pub fn boolean(&self, name: &str, out: &mut Vec<Finding>) {
        if let Some(value) = self.fields.get(name) {
            if !value.is_boolean() {
                out.push(self.error(
                    codes::INVALID_VALUE,
                    format!("field {} must be a boolean, found {}", name, type_name(value)),
                ));
            }
        }
    }

    pub fn string_list(&self, name: &str, out: &mut Vec<Finding>) {
        let Some(value) = self.fields.get(name) else {
            return;
        };
        let valid = value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string));
        if !valid {
            out.push(self.error(
                codes::INVALID_VALUE,
                format!("field {} must be a list of strings", name),
            ));
        }
    }
}

/// Iterate a list section, reporting non-object elements.
pub(super) fn records<'a>(
    section: &'a str,
    items: &'a [Value],
    out: &mut Vec<Finding>,
) -> Vec<Record<'a>> {
    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item.as_object() {
            Some(fields) => records.push(Record::new(section, Some(i), fields)),
            None => out.push(
                Finding::error(
                    codes::NOT_AN_OBJECT,
                    section,
                    format!("entry must be an object, found {}", type_name(item)),
                )
                .at(i),
            ),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_require_reports_each_missing_field() {
        let fields = object(json!({"pid": 1}));
        let record = Record::new("running_processes", Some(2), &fields);
        let mut out = Vec::new();
        record.require(&["pid", "name", "command_line"], &mut out);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|f| f.index == Some(2)));
        assert!(out[0].message.contains("name"));
    }

    #[test]
    fn test_uint_rejects_negative_and_float() {
        let fields = object(json!({"a": -1, "b": 1.5, "c": "7", "d": 7}));
        let record = Record::new("x", None, &fields);
        let mut out = Vec::new();
        assert_eq!(record.uint("a", u64::MAX, &mut out), None);
        assert_eq!(record.uint("b", u64::MAX, &mut out), None);
        assert_eq!(record.uint("c", u64::MAX, &mut out), None);
        assert_eq!(record.uint("d", u64::MAX, &mut out), Some(7));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_uint_missing_is_silent() {
        let fields = object(json!({}));
        let record = Record::new("x", None, &fields);
        let mut out = Vec::new();
        assert_eq!(record.uint("absent", 10, &mut out), None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_pid_strictness() {
        let fields = object(json!({"pid": 0}));
        let record = Record::new("running_processes", Some(0), &fields);

        let mut strict = Vec::new();
        assert_eq!(record.pid("pid", false, &mut strict), None);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].code, codes::INVALID_PID);

        let mut lenient = Vec::new();
        assert_eq!(record.pid("pid", true, &mut lenient), Some(0));
        assert!(lenient.is_empty());
    }

    #[test]
    fn test_pid_out_of_range() {
        let fields = object(json!({"pid": 4_294_967_296u64}));
        let record = Record::new("running_processes", Some(0), &fields);
        let mut out = Vec::new();
        assert_eq!(record.pid("pid", true, &mut out), None);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_optional_string_accepts_null() {
        let fields = object(json!({"user": null, "name": null}));
        let record = Record::new("running_processes", Some(0), &fields);
        let mut out = Vec::new();
        assert_eq!(record.string("user", true, &mut out), None);
        assert!(out.is_empty());
        assert_eq!(record.string("name", false, &mut out), None);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_records_flags_non_objects() {
        let items = vec![json!({"a": 1}), json!(5), json!({"b": 2})];
        let mut out = Vec::new();
        let recs = records("collection_log", &items, &mut out);
        assert_eq!(recs.len(), 2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].index, Some(1));
        assert_eq!(out[0].code, codes::NOT_AN_OBJECT);
    }
}
