//! Scoped CSS for host elements.
//!
//! An element's `css` descriptor is hashed into a stable class selector
//! (`css-<hash>`). The compiled rule is handed to a [`StyleManager`] the first
//! time any element uses it and withdrawn when the last user goes away, so the
//! manager sees exactly one insert and one remove per distinct rule.
//!
//! Inside the descriptor `&` stands for the element's own selector:
//!
//! ```ignore
//! VNode::element("button").css("color: red; &:hover { color: blue; }")
//! // .css-1f2e3d { color: red; } .css-1f2e3d:hover { color: blue; }
//! ```

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHasher};

// =============================================================================
// StyleManager
// =============================================================================

/// External owner of the document's style rules.
pub trait StyleManager {
    fn insert(&self, selector: &str, rule: &str);
    fn remove(&self, selector: &str);
}

/// In-memory [`StyleManager`]: an ordered list of installed rules.
#[derive(Default)]
pub struct StyleSheet {
    rules: RefCell<Vec<(String, String)>>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.rules.borrow().iter().any(|(s, _)| s == selector)
    }

    pub fn rule(&self, selector: &str) -> Option<String> {
        self.rules
            .borrow()
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, r)| r.clone())
    }

    pub fn len(&self) -> usize {
        self.rules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.borrow().is_empty()
    }

    /// All rules joined as one stylesheet text.
    pub fn text(&self) -> String {
        self.rules
            .borrow()
            .iter()
            .map(|(_, r)| r.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl StyleManager for StyleSheet {
    fn insert(&self, selector: &str, rule: &str) {
        let mut rules = self.rules.borrow_mut();
        match rules.iter_mut().find(|(s, _)| s == selector) {
            Some(slot) => slot.1 = rule.to_string(),
            None => rules.push((selector.to_string(), rule.to_string())),
        }
    }

    fn remove(&self, selector: &str) {
        self.rules.borrow_mut().retain(|(s, _)| s != selector);
    }
}

// =============================================================================
// Css descriptor
// =============================================================================

/// A scoped style descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct Css(Rc<str>);

impl Css {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(Rc::from(text.as_ref().trim()))
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// Class name derived from the descriptor's content.
    pub fn class_name(&self) -> String {
        let mut hasher = FxHasher::default();
        self.0.hash(&mut hasher);
        format!("css-{:x}", hasher.finish())
    }

    /// Compile into rule text for `class_name`.
    ///
    /// Declarations outside nested `&` blocks apply to the element itself.
    pub fn compile(&self, class_name: &str) -> String {
        let selector = format!(".{class_name}");
        let mut own = String::new();
        let mut nested = Vec::new();

        let text = self.text();
        let mut rest = text;
        while let Some(start) = rest.find('&') {
            own.push_str(&rest[..start]);
            let after = &rest[start..];
            let Some(open) = after.find('{') else {
                own.push_str(after);
                rest = "";
                break;
            };
            let Some(close) = matching_brace(after, open) else {
                own.push_str(after);
                rest = "";
                break;
            };
            let head = after[..open].trim().replace('&', &selector);
            let body = after[open + 1..close].trim();
            nested.push(format!("{head} {{ {body} }}"));
            rest = &after[close + 1..];
        }
        own.push_str(rest);

        let own = own.trim();
        let mut rules = Vec::with_capacity(nested.len() + 1);
        if !own.is_empty() {
            rules.push(format!("{selector} {{ {own} }}"));
        }
        rules.extend(nested);
        rules.join(" ")
    }
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

impl fmt::Debug for Css {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Css({:?})", &*self.0)
    }
}

impl From<&str> for Css {
    fn from(text: &str) -> Self {
        Css::new(text)
    }
}

impl From<String> for Css {
    fn from(text: String) -> Self {
        Css::new(text)
    }
}

// =============================================================================
// StyleCache
// =============================================================================

/// Ref-counted selector cache in front of a [`StyleManager`].
pub(crate) struct StyleCache {
    manager: Rc<dyn StyleManager>,
    users: FxHashMap<String, usize>,
}

impl StyleCache {
    pub fn new(manager: Rc<dyn StyleManager>) -> Self {
        Self {
            manager,
            users: FxHashMap::default(),
        }
    }

    /// Register one user of `css` and return its class name.
    pub fn acquire(&mut self, css: &Css) -> String {
        let class_name = css.class_name();
        let users = self.users.entry(class_name.clone()).or_insert(0);
        *users += 1;
        if *users == 1 {
            self.manager.insert(&class_name, &css.compile(&class_name));
        }
        class_name
    }

    /// Drop one user of `class_name`; the rule goes away with the last one.
    pub fn release(&mut self, class_name: &str) {
        let Some(users) = self.users.get_mut(class_name) else {
            return;
        };
        *users -= 1;
        if *users == 0 {
            self.users.remove(class_name);
            self.manager.remove(class_name);
        }
    }

    pub fn manager(&self) -> Rc<dyn StyleManager> {
        self.manager.clone()
    }

    #[cfg(test)]
    pub fn users(&self, class_name: &str) -> usize {
        self.users.get(class_name).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_is_stable() {
        let a = Css::new("color: red;");
        let b = Css::new("  color: red;  ");
        assert_eq!(a.class_name(), b.class_name());
        assert!(a.class_name().starts_with("css-"));
        assert_ne!(a.class_name(), Css::new("color: blue;").class_name());
    }

    #[test]
    fn test_compile_nested_blocks() {
        let css = Css::new("color: red; &:hover { color: blue; }");
        assert_eq!(
            css.compile("css-x"),
            ".css-x { color: red; } .css-x:hover { color: blue; }"
        );
    }

    #[test]
    fn test_cache_inserts_once_and_removes_with_last_user() {
        let sheet = Rc::new(StyleSheet::new());
        let mut cache = StyleCache::new(sheet.clone());
        let css = Css::new("margin: 0;");

        let first = cache.acquire(&css);
        let second = cache.acquire(&css);
        assert_eq!(first, second);
        assert_eq!(sheet.len(), 1);
        assert_eq!(cache.users(&first), 2);

        cache.release(&first);
        assert!(sheet.contains(&first));
        cache.release(&first);
        assert!(!sheet.contains(&first));
        assert!(sheet.is_empty());
    }
}
