//! View adapter seam. The flow only says which panels to toggle; styling,
//! fades and the one-visible-panel rule belong to the implementation.

use crate::pay::state::Panel;
use std::fmt;
use tracing::{error, info};
use url::Url;

/// Input affordance applied to a named form field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Number,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Number => "number",
        };
        f.write_str(name)
    }
}

pub trait View {
    fn show(&mut self, panel: Panel);
    fn hide(&mut self, panel: Panel);
    /// Hides every message panel at once.
    fn hide_messages(&mut self);
    fn set_field_type(&mut self, name: &str, field_type: FieldType, placeholder: &str);
    fn focus(&mut self, field: &str);
    fn show_error(&mut self, message: &str);
    /// Overwrites the page's primary heading.
    fn set_heading(&mut self, text: &str);
    /// Full-page navigation. Nothing on the page runs afterwards.
    fn navigate(&mut self, url: &Url);
}

/// Renders view operations as log lines; used by the command-line harness.
#[derive(Debug, Default)]
pub struct TracingView {
    visible: Option<Panel>,
}

impl TracingView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The panel shown most recently and not hidden since.
    #[must_use]
    pub const fn visible(&self) -> Option<Panel> {
        self.visible
    }
}

impl View for TracingView {
    fn show(&mut self, panel: Panel) {
        info!(?panel, "show");
        self.visible = Some(panel);
    }

    fn hide(&mut self, panel: Panel) {
        info!(?panel, "hide");
        if self.visible == Some(panel) {
            self.visible = None;
        }
    }

    fn hide_messages(&mut self) {
        info!("hide messages");
        self.visible = None;
    }

    fn set_field_type(&mut self, name: &str, field_type: FieldType, placeholder: &str) {
        info!(name, %field_type, placeholder, "field type");
    }

    fn focus(&mut self, field: &str) {
        info!(field, "focus");
    }

    fn show_error(&mut self, message: &str) {
        error!(message, "error banner");
    }

    fn set_heading(&mut self, text: &str) {
        error!(text, "heading");
    }

    fn navigate(&mut self, url: &Url) {
        info!(%url, "navigate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_renders_input_type() {
        assert_eq!(FieldType::Number.to_string(), "number");
    }

    #[test]
    fn tracing_view_tracks_visible_panel() {
        let mut view = TracingView::new();
        view.show(Panel::LoginWait);
        assert_eq!(view.visible(), Some(Panel::LoginWait));

        view.hide(Panel::Begin);
        assert_eq!(view.visible(), Some(Panel::LoginWait));

        view.hide_messages();
        view.show(Panel::EnterPin);
        view.hide(Panel::EnterPin);
        assert_eq!(view.visible(), None);
    }
}
