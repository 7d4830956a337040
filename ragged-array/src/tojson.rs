//! The JSON emitter sink consumed by each node's `tojson_part`.

use serde_json::{Map, Number, Value};

/// A sink receiving the structure of an array as begin/end events plus
/// scalar emissions.
pub trait JsonSink {
    /// Open a JSON array.
    fn begin_list(&mut self);
    /// Close the innermost open array.
    fn end_list(&mut self);
    /// Open a JSON object.
    fn begin_record(&mut self);
    /// Close the innermost open object.
    fn end_record(&mut self);
    /// Name the next value emitted into the innermost open object.
    fn field(&mut self, key: &str);
    /// Emit a null.
    fn null(&mut self);
    /// Emit a boolean.
    fn boolean(&mut self, value: bool);
    /// Emit an integer.
    fn integer(&mut self, value: i64);
    /// Emit a floating point number.
    fn real(&mut self, value: f64);
    /// Emit a string.
    fn string(&mut self, value: &str);
}

/// A [`JsonSink`] building a `serde_json::Value`.
#[derive(Default)]
pub struct JsonBuilder {
    stack: Vec<Frame>,
    root: Option<Value>,
}

enum Frame {
    List(Vec<Value>),
    Record(Map<String, Value>, Option<String>),
}

impl JsonBuilder {
    /// A fresh builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished value. Empty input produces `null`.
    pub fn into_value(self) -> Value {
        self.root.unwrap_or(Value::Null)
    }

    fn emit(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::List(items)) => items.push(value),
            Some(Frame::Record(fields, key)) => {
                if let Some(key) = key.take() {
                    fields.insert(key, value);
                }
            }
        }
    }
}

impl JsonSink for JsonBuilder {
    fn begin_list(&mut self) {
        self.stack.push(Frame::List(Vec::new()));
    }

    fn end_list(&mut self) {
        if let Some(Frame::List(items)) = self.stack.pop() {
            self.emit(Value::Array(items));
        }
    }

    fn begin_record(&mut self) {
        self.stack.push(Frame::Record(Map::new(), None));
    }

    fn end_record(&mut self) {
        if let Some(Frame::Record(fields, _)) = self.stack.pop() {
            self.emit(Value::Object(fields));
        }
    }

    fn field(&mut self, key: &str) {
        if let Some(Frame::Record(_, pending)) = self.stack.last_mut() {
            *pending = Some(key.to_string());
        }
    }

    fn null(&mut self) {
        self.emit(Value::Null);
    }

    fn boolean(&mut self, value: bool) {
        self.emit(Value::Bool(value));
    }

    fn integer(&mut self, value: i64) {
        self.emit(Value::Number(value.into()));
    }

    fn real(&mut self, value: f64) {
        self.emit(
            Number::from_f64(value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );
    }

    fn string(&mut self, value: &str) {
        self.emit(Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{JsonBuilder, JsonSink};

    #[test]
    fn builds_nested_values() {
        let mut builder = JsonBuilder::new();
        builder.begin_list();
        builder.begin_record();
        builder.field("x");
        builder.integer(1);
        builder.field("y");
        builder.real(1.5);
        builder.end_record();
        builder.null();
        builder.boolean(true);
        builder.end_list();
        assert_eq!(
            builder.into_value(),
            json!([{"x": 1, "y": 1.5}, null, true])
        );
    }
}
