//! RegisterHotKey-backed registrar bound to the message window.

use crate::hotkey::HotkeyRegistrar;
use tracing::warn;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_NOREPEAT,
};

/// Hotkeys arrive as `WM_HOTKEY` on `hwnd` with the id in `wParam`.
pub struct Win32HotkeyRegistrar {
    hwnd: HWND,
}

impl Win32HotkeyRegistrar {
    pub fn new(hwnd: HWND) -> Self {
        Self { hwnd }
    }
}

impl HotkeyRegistrar for Win32HotkeyRegistrar {
    fn register(&mut self, id: i32, modifiers: u32, virtual_key: u32) -> bool {
        let flags = HOT_KEY_MODIFIERS(modifiers) | MOD_NOREPEAT;
        match unsafe { RegisterHotKey(self.hwnd, id, flags, virtual_key) } {
            Ok(()) => true,
            Err(e) => {
                warn!(id, modifiers, virtual_key, "RegisterHotKey failed: {e}");
                false
            }
        }
    }

    fn unregister(&mut self, id: i32) -> bool {
        unsafe { UnregisterHotKey(self.hwnd, id) }.is_ok()
    }
}
