//! Runtime configuration.

use std::fmt;
use std::rc::Rc;

use crate::dom::DEFAULT_LINE_HEIGHT;
use crate::style::StyleManager;

/// Runtime options, fixed at [`Runtime`](super::Runtime) creation.
///
/// The default fade animates `opacity` from 0 to 1 on enter and from 1 to 0
/// on exit, over 200 ms each. Layout (FLIP) animations run for 250 ms.
#[derive(Clone)]
pub struct Options {
    /// Default enter duration in milliseconds.
    pub enter_duration: f64,
    /// Default exit duration in milliseconds.
    pub exit_duration: f64,
    /// FLIP animation duration in milliseconds.
    pub layout_duration: f64,
    /// Easing used by default and FLIP animations.
    pub easing: String,
    /// Line height of the document's flow layout.
    pub line_height: f64,
    /// Receives compiled `css` rules. A private [`StyleSheet`](crate::StyleSheet)
    /// is used when unset.
    pub style_manager: Option<Rc<dyn StyleManager>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enter_duration: 200.0,
            exit_duration: 200.0,
            layout_duration: 250.0,
            easing: "ease".to_string(),
            line_height: DEFAULT_LINE_HEIGHT,
            style_manager: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("enter_duration", &self.enter_duration)
            .field("exit_duration", &self.exit_duration)
            .field("layout_duration", &self.layout_duration)
            .field("easing", &self.easing)
            .field("line_height", &self.line_height)
            .field("style_manager", &self.style_manager.is_some())
            .finish()
    }
}
