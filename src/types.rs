//! Core types for spark-vdom.
//!
//! These are the small value types shared by the document, the render input
//! and the reconciler. Nothing here owns any state.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// Namespaces
// =============================================================================

/// SVG element namespace.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// XLink attribute namespace (`xlink:href` and friends).
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// XML attribute namespace (`xml:lang`, `xml:space`).
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Resolve the namespace of a prefixed attribute name, if it has one.
pub fn attribute_namespace(name: &str) -> Option<&'static str> {
    if name.starts_with("xlink:") {
        Some(XLINK_NS)
    } else if name.starts_with("xml:") {
        Some(XML_NS)
    } else {
        None
    }
}

// =============================================================================
// Key
// =============================================================================

/// Identity of a node among its siblings.
///
/// Keys only matter for reconciliation: two siblings with the same key and
/// type across renders are the same node.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key(Rc<str>);

impl Key {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Rc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", &*self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Self::new(value.to_string())
    }
}

// =============================================================================
// PropValue
// =============================================================================

/// One value in a property bag.
///
/// Host elements understand `Str`, `Bool` and `Num`. `Any` is only meaningful
/// to components, which downcast it themselves.
#[derive(Clone)]
pub enum PropValue {
    Str(String),
    Bool(bool),
    Num(f64),
    Any(Rc<dyn Any>),
}

impl PropValue {
    /// String form used when the value is written as an attribute.
    ///
    /// `None` means "no attribute" (`false` and opaque values).
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Str(s) => Some(s.clone()),
            PropValue::Bool(true) => Some(String::new()),
            PropValue::Bool(false) => None,
            PropValue::Num(n) => Some(format_number(*n)),
            PropValue::Any(_) => None,
        }
    }

    /// The "cleared" value of the same kind, used to reset a live property.
    pub fn cleared(&self) -> PropValue {
        match self {
            PropValue::Bool(_) => PropValue::Bool(false),
            PropValue::Num(_) => PropValue::Num(0.0),
            _ => PropValue::Str(String::new()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            PropValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        match self {
            PropValue::Any(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Num(a), PropValue::Num(b)) => a == b,
            (PropValue::Any(a), PropValue::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Num(n) => write!(f, "{n}"),
            PropValue::Any(_) => f.write_str("<any>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Num(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Num(value as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Bounding box of a live element, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

// =============================================================================
// Keyframes
// =============================================================================

/// One keyframe: an ordered list of `(css property, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Keyframe(pub Vec<(String, String)>);

impl Keyframe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, property: &str, value: impl Into<String>) -> Self {
        self.0.push((property.to_string(), value.into()));
        self
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }
}

/// Timing for a keyframe animation.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeOptions {
    /// Duration in milliseconds.
    pub duration: f64,
    pub easing: String,
}

impl Default for KeyframeOptions {
    fn default() -> Self {
        Self {
            duration: 200.0,
            easing: "ease".to_string(),
        }
    }
}
