//! Namespace scope tracking while building the tree.

use crate::tree::XML_NAMESPACE;

/// Stack of namespace binding frames mirroring element nesting.
///
/// Each frame holds the `xmlns` declarations of one open element; a `None`
/// prefix is the default namespace. Resolution walks from the innermost
/// frame outwards.
pub(crate) struct NamespaceScopes {
    stack: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScopes {
    /// Creates the scope stack with `xml` pre-bound.
    pub fn new() -> Self {
        Self {
            stack: vec![vec![(Some("xml".to_string()), XML_NAMESPACE.to_string())]],
        }
    }

    pub fn push_scope(&mut self) {
        self.stack.push(Vec::new());
    }

    /// Pops the innermost frame. The `xml` frame is never popped.
    pub fn pop_scope(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn bind(&mut self, prefix: Option<&str>, uri: &str) {
        if let Some(frame) = self.stack.last_mut() {
            frame.push((prefix.map(str::to_string), uri.to_string()));
        }
    }

    /// Resolves `prefix` to its URI. `xmlns=""` undeclares the default
    /// namespace.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}
