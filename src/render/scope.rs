use serde_json::Value;
use std::collections::HashMap;

/// A single level of variables.
#[derive(Debug, Default)]
struct Frame {
    data: HashMap<String, Value>,
    /// Writes made with `set` pass through a transparent frame to its parent.
    transparent: bool,
}

/// Chain of frames that holds the variables of a single render.
///
/// The first frame is never removed, and is never transparent.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Scope {
    /// Create a new [`Scope`] with an empty root frame.
    #[inline]
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Push a new frame onto the [`Scope`].
    #[inline]
    pub fn push(&mut self, transparent: bool) {
        self.frames.push(Frame {
            data: HashMap::new(),
            transparent,
        });
    }

    /// Remove the top frame from the [`Scope`].
    ///
    /// The root frame is kept.
    #[inline]
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Get the [`Value`] of the given name, searching from the innermost
    /// frame outward.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.data.get(name))
    }

    /// Write the value to the innermost frame that is not transparent.
    pub fn set<T>(&mut self, name: T, value: Value)
    where
        T: Into<String>,
    {
        let position = self
            .frames
            .iter()
            .rposition(|frame| !frame.transparent)
            .unwrap_or_default();

        if let Some(frame) = self.frames.get_mut(position) {
            frame.data.insert(name.into(), value);
        }
    }

    /// Write the value to the innermost frame.
    pub fn declare<T>(&mut self, name: T, value: Value)
    where
        T: Into<String>,
    {
        if let Some(frame) = self.frames.last_mut() {
            frame.data.insert(name.into(), value);
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scope_shadow_and_get() {
        let mut scope = Scope::new();
        scope.set("one", json!("one"));
        scope.set("two", json!("two"));
        scope.push(false);
        scope.declare("one", json!("shadowed one"));

        assert_eq!(scope.get("one"), Some(&json!("shadowed one")));
        assert_eq!(scope.get("two"), Some(&json!("two")));
        scope.pop();

        assert_eq!(scope.get("one"), Some(&json!("one")));
        assert_eq!(scope.get("two"), Some(&json!("two")));
    }

    #[test]
    fn test_scope_set_through_transparent() {
        let mut scope = Scope::new();
        scope.push(true);
        scope.declare("item", json!(1));
        scope.set("total", json!(2));
        scope.pop();

        assert_eq!(scope.get("item"), None);
        assert_eq!(scope.get("total"), Some(&json!(2)));
    }

    #[test]
    fn test_scope_set_stops_at_opaque() {
        let mut scope = Scope::new();
        scope.push(false);
        scope.push(true);
        scope.set("inner", json!(true));
        scope.pop();

        assert_eq!(scope.get("inner"), Some(&json!(true)));
        scope.pop();

        assert_eq!(scope.get("inner"), None);
    }

    #[test]
    fn test_scope_pop_keeps_root() {
        let mut scope = Scope::new();
        scope.set("root", json!(1));
        scope.pop();
        scope.pop();

        assert_eq!(scope.get("root"), Some(&json!(1)));
    }
}
