//! Render-time data context.
//!
//! One `Data` is shared by the whole render pass. Loop expansion shadows
//! variables through overlay frames instead of overwriting globals, so popping
//! the frame restores whatever the names meant before the loop.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    globals: Map<String, Value>,
    frames: Vec<Map<String, Value>>,
}

impl Data {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object. Any other JSON shape yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(globals) => Some(Self {
                globals,
                frames: Vec::new(),
            }),
            Value::Null => Some(Self::new()),
            _ => None,
        }
    }

    /// Look up a name, innermost frame first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Assign a global variable. Survives frame pops.
    pub fn set(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    /// Bind a name in the innermost frame (globals when no frame is open).
    pub fn bind(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.to_string(), value);
            }
            None => self.set(name, value),
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Map::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    /// JSON of the global map, as injected into the page body.
    pub fn to_json(&self) -> Value {
        Value::Object(self.globals.clone())
    }
}

impl From<Map<String, Value>> for Data {
    fn from(globals: Map<String, Value>) -> Self {
        Self {
            globals,
            frames: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_shadows_and_restores() {
        let mut data = Data::from_value(json!({"item": "outer"})).unwrap();
        data.push_frame();
        data.bind("item", json!("inner"));
        data.bind("index", json!(0));
        assert_eq!(data.get("item"), Some(&json!("inner")));

        data.pop_frame();
        assert_eq!(data.get("item"), Some(&json!("outer")));
        assert!(!data.contains("index"));
    }

    #[test]
    fn test_set_inside_frame_is_global() {
        let mut data = Data::new();
        data.push_frame();
        data.set("title", json!("Hello"));
        data.pop_frame();
        assert_eq!(data.get("title"), Some(&json!("Hello")));
    }

    #[test]
    fn test_bind_without_frame_writes_globals() {
        let mut data = Data::new();
        data.bind("x", json!(1));
        assert_eq!(data.globals().get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_from_value_rejects_scalars() {
        assert!(Data::from_value(json!(3)).is_none());
        assert_eq!(Data::from_value(Value::Null), Some(Data::new()));
    }
}
