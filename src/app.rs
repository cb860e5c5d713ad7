//! Application state and lifecycle management.
//!
//! [`AppState`] owns every piece of mutable state (settings, displayed
//! device list, hotkey table) and is only touched from the UI thread.
//! Provider calls are handed to the background worker as [`Job`]s and
//! their results come back through [`AppState::handle_job_result`].

use crate::audio::{Job, JobResult, PlaybackDevice, SwitchOrigin};
use crate::command::{self, CommandOutcome};
use crate::hotkey::{HotkeyBinding, HotkeyRegistrar, HotkeySettings, HotkeyTable};
use crate::platform::{AutoStart, SharedStore};
use crate::reconcile::{reconcile, DisplayedDevice, RefreshQueue};
use crate::settings::{LoadOutcome, Settings, SettingsStore};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

/// Menu items switch on a single click.
pub const READY_MESSAGE: &str = "Ready - click a device to set it as default";

/// Everything the application state needs from the outside world.
pub struct AppContext {
    pub settings_store: SettingsStore,
    pub shared: Box<dyn SharedStore>,
    pub autostart: Box<dyn AutoStart>,
    pub registrar: Box<dyn HotkeyRegistrar>,
    pub jobs: Sender<Job>,
}

/// User commands produced by the tray menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SwitchTo(String),
    Refresh,
    HideDevice(String),
    UnhideDevice(String),
    UnhideAll,
    SetRemark(String, String),
    SetHotkey(String, Option<HotkeyBinding>),
    SetCustomIcon(String, Option<String>),
    ToggleStartWithWindows,
    ToggleShowHiddenCount,
    ReloadSettings,
    OpenSettingsFile,
    Exit,
}

/// Work the platform layer must carry out after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a file with its associated program.
    Open(PathBuf),
    /// Tear down the window and leave the message loop.
    Quit,
}

/// Main application state.
pub struct AppState {
    settings_store: SettingsStore,
    shared: Box<dyn SharedStore>,
    autostart: Box<dyn AutoStart>,
    jobs: Sender<Job>,

    settings: Settings,
    hotkeys: HotkeyTable,

    /// Rows currently shown (hidden devices excluded)
    devices: Vec<DisplayedDevice>,

    /// Latest enumeration, hidden devices included
    fetched: Vec<PlaybackDevice>,

    refresh: RefreshQueue,
    hidden_count: usize,
    default_device_id: Option<String>,
    status: String,
    should_exit: bool,
    shut_down: bool,
}

impl AppState {
    /// Build the state from loaded settings and register their hotkeys.
    pub fn new(ctx: AppContext, loaded: LoadOutcome) -> Self {
        let mut hotkeys = HotkeyTable::new(ctx.registrar);
        hotkeys.register_all(&loaded.settings);

        Self {
            settings_store: ctx.settings_store,
            shared: ctx.shared,
            autostart: ctx.autostart,
            jobs: ctx.jobs,
            settings: loaded.settings,
            hotkeys,
            devices: Vec::new(),
            fetched: Vec::new(),
            refresh: RefreshQueue::new(),
            hidden_count: 0,
            default_device_id: None,
            status: loaded.status.message().to_string(),
            should_exit: false,
            shut_down: false,
        }
    }

    /// Kick off the first enumeration.
    pub fn start(&mut self) {
        self.request_refresh();
        self.status = READY_MESSAGE.to_string();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_store.path().to_path_buf()
    }

    pub fn devices(&self) -> &[DisplayedDevice] {
        &self.devices
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden_count
    }

    pub fn default_device_id(&self) -> Option<&str> {
        self.default_device_id.as_deref()
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn registered_hotkeys(&self) -> usize {
        self.hotkeys.len()
    }

    /// "{n} device(s) hidden from list", when enabled and there are any.
    pub fn hidden_count_line(&self) -> Option<String> {
        (self.settings.display.show_hidden_device_count && self.hidden_count > 0)
            .then(|| format!("{} device(s) hidden from list", self.hidden_count))
    }

    /// Tray tooltip naming the current default device.
    pub fn tooltip(&self) -> String {
        let current = self
            .default_device_id
            .as_deref()
            .and_then(|id| self.fetched.iter().find(|d| d.id == id));

        match current {
            Some(device) => {
                let short_id = self
                    .settings
                    .device(&device.id)
                    .and_then(|d| d.short_id())
                    .unwrap_or("None");
                format!("Audio Device Switcher\n{}\nID: {}", device.name, short_id)
            }
            None => "Audio Device Switcher\nNo active device".to_string(),
        }
    }

    /// Dispatch a menu action.
    pub fn handle_action(&mut self, action: Action) -> Option<Effect> {
        debug!(?action, "Handling action");
        match action {
            Action::SwitchTo(device_id) => self.switch_to(&device_id, SwitchOrigin::Menu),
            Action::Refresh => self.request_refresh(),
            Action::HideDevice(device_id) => self.set_hidden(&device_id, true),
            Action::UnhideDevice(device_id) => self.set_hidden(&device_id, false),
            Action::UnhideAll => self.unhide_all(),
            Action::SetRemark(device_id, remark) => self.set_remark(&device_id, remark),
            Action::SetHotkey(device_id, binding) => self.set_hotkey(&device_id, binding),
            Action::SetCustomIcon(device_id, glyph) => self.set_custom_icon(&device_id, glyph),
            Action::ToggleStartWithWindows => {
                let enabled = !self.settings.system.start_with_windows;
                self.settings.system.start_with_windows = enabled;
                self.save_settings();
                self.status = if enabled {
                    "Start with Windows enabled".to_string()
                } else {
                    "Start with Windows disabled".to_string()
                };
            }
            Action::ToggleShowHiddenCount => {
                self.settings.display.show_hidden_device_count =
                    !self.settings.display.show_hidden_device_count;
                self.save_settings();
            }
            Action::ReloadSettings => self.reload_settings(),
            Action::OpenSettingsFile => return Some(Effect::Open(self.settings_path())),
            Action::Exit => {
                self.shutdown();
                return Some(Effect::Quit);
            }
        }
        None
    }

    /// Ask for a device list refresh; coalesced while one is in flight.
    pub fn request_refresh(&mut self) {
        if self.refresh.request() {
            self.submit(Job::Enumerate);
        } else {
            debug!("Refresh already in flight, coalescing");
        }
    }

    pub fn on_refresh_tick(&mut self) {
        self.request_refresh();
    }

    /// Poll the cross-process command slot.
    pub fn on_command_tick(&mut self) {
        let available: Vec<&str> = self.fetched.iter().map(|d| d.id.as_str()).collect();
        let outcome = match command::poll(self.shared.as_ref(), &self.settings, &available) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Command poll failed: {e}");
                return;
            }
        };

        match outcome {
            Some(CommandOutcome::Resolved { short_id, device_id }) => {
                info!(%short_id, "Switch requested by another process");
                self.switch_to(&device_id, SwitchOrigin::Command);
            }
            Some(CommandOutcome::Unknown { short_id }) => {
                info!(%short_id, "Ignoring switch command for unknown device");
            }
            None => {}
        }
    }

    /// A global hotkey fired.
    pub fn on_hotkey(&mut self, id: i32) {
        match self.hotkeys.device_for(id).map(str::to_string) {
            Some(device_id) => self.switch_to(&device_id, SwitchOrigin::Hotkey),
            None => debug!(id, "Ignoring unknown hotkey id"),
        }
    }

    /// Apply a result sent back by the worker.
    pub fn handle_job_result(&mut self, result: JobResult) {
        match result {
            JobResult::Devices(Ok(devices)) => {
                self.apply_devices(devices);
                self.finish_refresh();
            }
            JobResult::Devices(Err(e)) => {
                warn!("Device enumeration failed: {e}");
                self.status = format!("Error refreshing device list: {e}");
                self.finish_refresh();
            }
            JobResult::Switched {
                device_id,
                device_name,
                origin,
                result,
            } => {
                self.status = match (&result, origin) {
                    (Ok(()), SwitchOrigin::Menu) => {
                        format!("'{device_name}' is now the default audio device")
                    }
                    (Ok(()), SwitchOrigin::Hotkey) => format!("Switched to '{device_name}' via hotkey"),
                    (Ok(()), SwitchOrigin::Command) => {
                        format!("Switched to '{device_name}' via registry command")
                    }
                    (Err(e), SwitchOrigin::Menu) => format!("Failed to set device: {e}"),
                    (Err(e), SwitchOrigin::Hotkey) => format!("Hotkey switch failed: {e}"),
                    (Err(e), SwitchOrigin::Command) => format!("Registry switch failed: {e}"),
                };
                match result {
                    Ok(()) => info!(device_id, ?origin, "Default device switched"),
                    Err(e) => error!(device_id, ?origin, "Switch failed: {e}"),
                }
                self.request_refresh();
            }
        }
    }

    fn finish_refresh(&mut self) {
        if self.refresh.complete() {
            self.submit(Job::Enumerate);
        }
    }

    fn apply_devices(&mut self, devices: Vec<PlaybackDevice>) {
        self.fetched = devices;
        self.reconcile_now();
    }

    /// Reconcile against the latest enumeration without asking the provider.
    fn reconcile_now(&mut self) {
        let report = reconcile(&mut self.devices, &self.fetched, &mut self.settings);
        self.hidden_count = report.hidden_count;
        self.default_device_id = report.default_device;

        if report.settings_changed {
            self.save_settings();
        }
        self.publish_current();
    }

    fn publish_current(&self) {
        let current = self
            .default_device_id
            .as_deref()
            .and_then(|id| self.fetched.iter().find(|d| d.id == id));
        let name = current.map(|d| d.name.as_str());
        let short_id = current
            .and_then(|d| self.settings.device(&d.id))
            .and_then(|d| d.short_id());

        if let Err(e) = command::publish_current(self.shared.as_ref(), name, short_id) {
            debug!("Failed to publish current device: {e}");
        }
    }

    fn device_name(&self, device_id: &str) -> String {
        self.fetched
            .iter()
            .find(|d| d.id == device_id)
            .map(|d| d.name.clone())
            .or_else(|| self.settings.device(device_id).map(|d| d.device_name.clone()))
            .unwrap_or_else(|| device_id.to_string())
    }

    fn switch_to(&mut self, device_id: &str, origin: SwitchOrigin) {
        let device_name = self.device_name(device_id);
        self.status = match origin {
            SwitchOrigin::Menu => format!("Setting '{device_name}' as default audio device..."),
            SwitchOrigin::Hotkey => format!("Switching to '{device_name}' via hotkey..."),
            SwitchOrigin::Command => format!("Switching to '{device_name}' via registry command..."),
        };
        self.submit(Job::Switch {
            device_id: device_id.to_string(),
            device_name,
            origin,
        });
    }

    fn submit(&mut self, job: Job) {
        if self.jobs.send(job).is_err() {
            error!("Audio worker is gone");
            self.status = "Audio worker stopped; restart the application".to_string();
        }
    }

    fn set_hidden(&mut self, device_id: &str, hidden: bool) {
        let name = self.device_name(device_id);
        let Some(device) = self.settings.device_mut(device_id) else {
            warn!(device_id, "No settings for device");
            return;
        };
        device.is_hidden = hidden;

        self.status = if hidden {
            format!("Device '{name}' has been hidden from the list")
        } else {
            format!("Device '{name}' is visible again")
        };
        self.save_settings();
        self.reconcile_now();
        self.request_refresh();
    }

    fn unhide_all(&mut self) {
        let mut count = 0;
        for device in self.settings.device_settings.values_mut() {
            if device.is_hidden {
                device.is_hidden = false;
                count += 1;
            }
        }
        if count == 0 {
            return;
        }

        self.status = format!("{count} hidden device(s) are visible again");
        self.save_settings();
        self.reconcile_now();
        self.request_refresh();
    }

    fn set_remark(&mut self, device_id: &str, remark: String) {
        let name = self.device_name(device_id);
        let Some(device) = self.settings.device_mut(device_id) else {
            return;
        };
        device.user_remark = remark.trim().to_string();
        self.status = if device.user_remark.is_empty() {
            format!("Remark cleared for '{name}'")
        } else {
            format!("Remark updated for '{name}'")
        };
        self.save_settings();
        self.reconcile_now();
    }

    fn set_custom_icon(&mut self, device_id: &str, glyph: Option<String>) {
        let name = self.device_name(device_id);
        let Some(device) = self.settings.device_mut(device_id) else {
            return;
        };

        self.status = match glyph {
            Some(glyph) => {
                device.custom_icon = glyph;
                format!("Custom icon set for '{name}'")
            }
            None => {
                device.custom_icon.clear();
                format!("Reset '{name}' to auto-detect icon")
            }
        };
        self.save_settings();
        self.reconcile_now();
    }

    fn set_hotkey(&mut self, device_id: &str, binding: Option<HotkeyBinding>) {
        let name = self.device_name(device_id);
        let Some(previous) = self.settings.device(device_id).map(|d| d.hotkey.binding()) else {
            return;
        };

        if let Err(e) = self.hotkeys.update(device_id, binding.as_ref()) {
            warn!(device_id, "Hotkey update failed: {e}");
            // Put the old binding back
            if let Err(e) = self.hotkeys.update(device_id, previous.as_ref()) {
                warn!(device_id, "Could not restore previous hotkey: {e}");
            }
            self.status = format!("Failed to set hotkey: {e}");
            return;
        }

        if let Some(device) = self.settings.device_mut(device_id) {
            device.hotkey = HotkeySettings::from(binding.as_ref());
        }
        self.status = if binding.is_some() {
            format!("Hotkey set for '{name}'")
        } else {
            format!("Hotkey removed for '{name}'")
        };
        self.save_settings();
        self.reconcile_now();
    }

    fn reload_settings(&mut self) {
        self.hotkeys.unregister_all();
        let loaded = self.settings_store.load();
        self.settings = loaded.settings;
        self.hotkeys.register_all(&self.settings);
        self.status = loaded.status.message().to_string();
        self.reconcile_now();
        self.request_refresh();
    }

    /// Persist settings and apply the auto-start flag.
    fn save_settings(&mut self) {
        if let Err(e) = self.settings_store.save(&self.settings) {
            error!("Failed to save settings: {e}");
            self.status = format!("Failed to save settings: {e}");
        }
        if let Err(e) = self
            .autostart
            .set_enabled(self.settings.system.start_with_windows)
        {
            warn!("Failed to update Start with Windows: {e}");
        }
    }

    /// Release hotkeys, persist settings and mark the app for exit.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.should_exit = true;
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        info!("Shutting down");
        self.hotkeys.unregister_all();
        self.save_settings();
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.shutdown();
    }
}
