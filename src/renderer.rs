//! Rendering collaborator
//!
//! The controller never touches a UI toolkit directly. It drives a
//! [`Renderer`] with side-effecting calls; hosts implement the trait for
//! whatever surface they draw on (DOM, terminal, test recorder).

use crate::{config::Config, conversation::Message, lifecycle::VisualState};

/// Surface a widget instance draws on
pub trait Renderer: Send {
    /// Build the widget chrome for a configuration
    fn mount(&mut self, config: &Config);

    /// Whether the viewport counts as mobile (600px or narrower)
    fn is_mobile_viewport(&self) -> bool {
        false
    }

    /// Show the given visual state; `sheet` requests full-viewport
    /// presentation on small screens
    fn show_state(&mut self, state: VisualState, sheet: bool);

    /// A message was appended at `index`
    fn append_message(&mut self, index: usize, message: &Message);

    /// The message at `index` changed in place
    fn update_message(&mut self, index: usize, message: &Message);

    /// The message at `index` was removed
    fn remove_message(&mut self, index: usize);

    /// Enable or disable the input control
    fn set_input_enabled(&mut self, enabled: bool);

    /// Move keyboard focus to the input control
    fn focus_input(&mut self) {}

    /// Show a dismissible error to the visitor
    fn show_error(&mut self, message: &str);

    /// Remove everything the renderer created
    fn teardown(&mut self);
}
