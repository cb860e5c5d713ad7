//! System tray icon management.
//!
//! Renders the [`MenuEntry`] model with `tray-icon` and translates menu
//! clicks back into [`Action`]s.

use super::menu::MenuEntry;
use crate::app::Action;
use crate::platform::icons;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use tray_icon::{
    menu::{CheckMenuItem, IsMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu},
    MouseButton, TrayIcon, TrayIconBuilder, TrayIconEvent,
};

/// Tray service error types.
#[derive(Debug, Error)]
pub enum TrayError {
    #[error("Failed to create tray icon: {0}")]
    CreateFailed(String),

    #[error("Failed to load icon: {0}")]
    IconLoadFailed(String),

    #[error("Tray icon not initialized")]
    NotInitialized,

    #[error("Failed to create menu: {0}")]
    MenuFailed(String),
}

/// System tray manager.
pub struct TrayManager {
    tray_icon: Option<TrayIcon>,
    actions: HashMap<MenuId, Action>,
    current_menu: Vec<MenuEntry>,
    current_tooltip: String,
}

impl TrayManager {
    pub fn new() -> Self {
        Self {
            tray_icon: None,
            actions: HashMap::new(),
            current_menu: Vec::new(),
            current_tooltip: String::new(),
        }
    }

    /// Create and show the tray icon.
    pub fn create(&mut self, tooltip: &str, entries: Vec<MenuEntry>) -> Result<(), TrayError> {
        let icon = icons::create_tray_icon().map_err(TrayError::IconLoadFailed)?;
        let menu = self.build_menu(&entries)?;

        let tray_icon = TrayIconBuilder::new()
            .with_icon(icon)
            .with_tooltip(tooltip)
            .with_menu(Box::new(menu))
            .build()
            .map_err(|e| TrayError::CreateFailed(e.to_string()))?;

        self.tray_icon = Some(tray_icon);
        self.current_menu = entries;
        self.current_tooltip = tooltip.to_string();
        Ok(())
    }

    /// Drain menu clicks and icon events. Call this from the event loop.
    ///
    /// Both channels are global and unbounded, so they are emptied on
    /// every call even when nothing maps to an action.
    pub fn process_events(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(event) = TrayIconEvent::receiver().try_recv() {
            actions.extend(icon_action(&event));
        }
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            match self.actions.get(&event.id) {
                Some(action) => actions.push(action.clone()),
                None => debug!(id = ?event.id, "Click on stale or inert menu item"),
            }
        }
        actions
    }

    /// Bring tooltip and menu in line with the application state.
    /// Only touches the shell when something changed.
    pub fn sync(&mut self, tooltip: &str, entries: Vec<MenuEntry>) -> Result<(), TrayError> {
        if tooltip != self.current_tooltip {
            self.set_tooltip(tooltip)?;
        }
        if entries != self.current_menu {
            let menu = self.build_menu(&entries)?;
            let tray = self.tray_icon.as_ref().ok_or(TrayError::NotInitialized)?;
            tray.set_menu(Some(Box::new(menu)));
            self.current_menu = entries;
        }
        Ok(())
    }

    /// Update the tooltip text.
    pub fn set_tooltip(&mut self, text: &str) -> Result<(), TrayError> {
        let tray = self.tray_icon.as_mut().ok_or(TrayError::NotInitialized)?;
        tray.set_tooltip(Some(text))
            .map_err(|e| TrayError::CreateFailed(e.to_string()))?;
        self.current_tooltip = text.to_string();
        Ok(())
    }

    fn build_menu(&mut self, entries: &[MenuEntry]) -> Result<Menu, TrayError> {
        self.actions.clear();
        let items = self.build_items(entries)?;
        let refs: Vec<&dyn IsMenuItem> = items.iter().map(|i| &**i).collect();
        Menu::with_items(&refs).map_err(|e| TrayError::MenuFailed(e.to_string()))
    }

    fn build_items(&mut self, entries: &[MenuEntry]) -> Result<Vec<Box<dyn IsMenuItem>>, TrayError> {
        let mut items: Vec<Box<dyn IsMenuItem>> = Vec::with_capacity(entries.len());

        for entry in entries {
            match entry {
                MenuEntry::Label(text) => {
                    items.push(Box::new(MenuItem::new(escape(text), false, None)));
                }
                MenuEntry::Item {
                    label,
                    action,
                    checked,
                    enabled,
                } => {
                    let id = match checked {
                        Some(checked) => {
                            let item = CheckMenuItem::new(escape(label), *enabled, *checked, None);
                            let id = item.id().clone();
                            items.push(Box::new(item));
                            id
                        }
                        None => {
                            let item = MenuItem::new(escape(label), *enabled, None);
                            let id = item.id().clone();
                            items.push(Box::new(item));
                            id
                        }
                    };
                    self.actions.insert(id, action.clone());
                }
                MenuEntry::Submenu { label, entries } => {
                    let children = self.build_items(entries)?;
                    let refs: Vec<&dyn IsMenuItem> = children.iter().map(|i| &**i).collect();
                    let submenu = Submenu::with_items(escape(label), true, &refs)
                        .map_err(|e| TrayError::MenuFailed(e.to_string()))?;
                    items.push(Box::new(submenu));
                }
                MenuEntry::Separator => items.push(Box::new(PredefinedMenuItem::separator())),
            }
        }

        Ok(items)
    }

    /// Destroy the tray icon.
    pub fn destroy(&mut self) {
        self.tray_icon = None;
        self.actions.clear();
    }
}

impl Default for TrayManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Double-clicking the icon refreshes the device list; hover and single
/// clicks are left to the shell (the menu opens on click).
fn icon_action(event: &TrayIconEvent) -> Option<Action> {
    match event {
        TrayIconEvent::DoubleClick {
            button: MouseButton::Left,
            ..
        } => Some(Action::Refresh),
        _ => None,
    }
}

/// `&` marks a mnemonic in menu text; device names need it literal.
fn escape(text: &str) -> String {
    text.replace('&', "&&")
}
