//! Native dialog records and one-shot acknowledgment.
//!
//! Adding a product to the cart makes the storefront raise a native `alert`.
//! The page object arms a [`DialogSlot`] before clicking, the driver routes
//! the opened dialog through it, and the page object then waits until the
//! slot holds an acknowledged record. Arming is one-shot: a second dialog is
//! left to the driver's default handling.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogType {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl std::fmt::Display for DialogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

impl DialogType {
    /// Parse the CDP dialog type name
    #[must_use]
    pub fn from_cdp(name: &str) -> Self {
        match name {
            "confirm" => Self::Confirm,
            "prompt" => Self::Prompt,
            "beforeunload" => Self::BeforeUnload,
            _ => Self::Alert,
        }
    }
}

/// Action taken on a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    /// Dialog was accepted (OK/Yes/Leave)
    Accept,
    /// Dialog was dismissed (Cancel/No/Stay)
    Dismiss,
    /// Dialog is pending (not yet handled)
    Pending,
}

/// Represents a browser dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    dialog_type: DialogType,
    message: String,
    action: DialogAction,
}

impl Dialog {
    /// Create a new dialog
    #[must_use]
    pub fn new(dialog_type: DialogType, message: impl Into<String>) -> Self {
        Self {
            dialog_type,
            message: message.into(),
            action: DialogAction::Pending,
        }
    }

    /// Create an alert dialog
    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(DialogType::Alert, message)
    }

    /// Get dialog type
    #[must_use]
    pub const fn dialog_type(&self) -> DialogType {
        self.dialog_type
    }

    /// Get dialog message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get action taken
    #[must_use]
    pub const fn action(&self) -> DialogAction {
        self.action
    }

    /// Check if dialog was handled
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self.action, DialogAction::Pending)
    }

    /// Accept the dialog
    pub fn accept(&mut self) {
        self.action = DialogAction::Accept;
    }

    /// Dismiss the dialog
    pub fn dismiss(&mut self) {
        self.action = DialogAction::Dismiss;
    }
}

#[derive(Debug, Default)]
struct SlotState {
    armed: bool,
    acknowledged: Option<Dialog>,
}

/// One-shot dialog acceptance shared between a driver and its event loop
#[derive(Debug, Clone, Default)]
pub struct DialogSlot {
    state: Arc<Mutex<SlotState>>,
}

impl DialogSlot {
    /// Create an unarmed slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept the next dialog. Clears any record left by a previous arming.
    pub fn arm(&self) {
        let mut state = self.state();
        state.armed = true;
        state.acknowledged = None;
    }

    /// Withdraw an acceptance that no dialog has used yet
    pub fn disarm(&self) {
        self.state().armed = false;
    }

    /// Whether the slot waits for a dialog
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state().armed
    }

    /// Route an opened dialog through the slot.
    ///
    /// Returns the action the driver must apply. An unarmed slot leaves the
    /// dialog pending.
    pub fn on_opened(&self, mut dialog: Dialog) -> DialogAction {
        let mut state = self.state();
        if !state.armed {
            return DialogAction::Pending;
        }
        dialog.accept();
        state.armed = false;
        state.acknowledged = Some(dialog);
        DialogAction::Accept
    }

    /// Take the acknowledged dialog, if one arrived since arming
    #[must_use]
    pub fn take(&self) -> Option<Dialog> {
        self.state().acknowledged.take()
    }
}
