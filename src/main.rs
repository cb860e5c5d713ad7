#![windows_subsystem = "windows"]

#[cfg(not(windows))]
fn main() {
    eprintln!("audio-switcher only runs on Windows");
    std::process::exit(1);
}

#[cfg(windows)]
fn main() {
    shell::main()
}

#[cfg(windows)]
mod shell {
    use anyhow::{Context, Result};
    use audio_switcher::app::{AppContext, AppState, Effect};
    use audio_switcher::audio::{ComGuard, CoreAudioProvider, DeviceWatcher, JobResult, Worker};
    use audio_switcher::donation;
    use audio_switcher::logging;
    use audio_switcher::platform::{
        AutoStart, MemoryStore, NoAutoStart, RegistryStore, RunKeyAutoStart, SharedStore,
        Win32HotkeyRegistrar,
    };
    use audio_switcher::settings::store::SETTINGS_FILE_NAME;
    use audio_switcher::settings::{LoadOutcome, LoadStatus, Settings, SettingsStore};
    use audio_switcher::ui::{menu, TrayManager};
    use std::cell::RefCell;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::Path;
    use std::sync::mpsc::{channel, Receiver};
    use std::sync::Arc;
    use tracing::{debug, error, info, warn};
    use windows::core::*;
    use windows::Win32::Foundation::*;
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::*;

    pub const WM_DEVICE_CHANGED: u32 = WM_USER + 2;
    pub const WM_WORKER_DONE: u32 = WM_USER + 3;

    const TIMER_REFRESH: usize = 1;
    const TIMER_COMMAND: usize = 2;
    const TIMER_DONATION: usize = 3;

    const REFRESH_INTERVAL_MS: u32 = 5_000;
    const COMMAND_POLL_MS: u32 = 500;

    const TITLE: &str = "Audio Device Switcher";

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    fn message_box(title: &str, text: &str, style: MESSAGEBOX_STYLE) {
        unsafe {
            let text_wide = to_wide(text);
            let title_wide = to_wide(title);
            MessageBoxW(
                None,
                PCWSTR(text_wide.as_ptr()),
                PCWSTR(title_wide.as_ptr()),
                MB_OK | style,
            );
        }
    }

    fn show_error(msg: &str) {
        message_box(TITLE, msg, MB_ICONERROR);
    }

    pub fn main() {
        let _log_guard = logging::init(&logging::default_dir());
        info!("Starting {} {}", TITLE, env!("CARGO_PKG_VERSION"));

        if let Err(e) = run(false) {
            error!("Startup failed: {e:#}");
            show_error(&format!(
                "{TITLE} failed to start:\n\n{e:#}\n\nTrying again with default settings."
            ));

            if let Err(e) = run(true) {
                error!("Degraded startup failed: {e:#}");
                show_error(&format!("{TITLE} could not start:\n\n{e:#}"));
                std::process::exit(1);
            }
        }

        info!("Exited cleanly");
    }

    /// Everything the window procedure needs, owned by the UI thread.
    struct Shell {
        hwnd: HWND,
        app: AppState,
        tray: TrayManager,
        results: Receiver<JobResult>,
        // Unregisters the notification client before COM goes away
        _watcher: Option<DeviceWatcher>,
        _worker: Worker,
    }

    impl Shell {
        fn sync_tray(&mut self) {
            let entries = menu::build(&self.app);
            if let Err(e) = self.tray.sync(&self.app.tooltip(), entries) {
                warn!("Tray update failed: {e}");
            }
        }

        fn drain_results(&mut self) {
            while let Ok(result) = self.results.try_recv() {
                self.app.handle_job_result(result);
            }
        }
    }

    thread_local! {
        static SHELL: RefCell<Option<Shell>> = const { RefCell::new(None) };
    }

    /// Run `f` against the shell unless it is already borrowed further up
    /// the stack (a nested message loop such as a message box).
    fn with_shell<F, R>(f: F) -> Option<R>
    where
        F: FnOnce(&mut Shell) -> R,
    {
        SHELL.with(|cell| match cell.try_borrow_mut() {
            Ok(mut shell) => shell.as_mut().map(f),
            Err(_) => {
                debug!("Shell busy, skipping re-entrant message");
                None
            }
        })
    }

    fn create_window() -> Result<HWND> {
        unsafe {
            let instance = windows::Win32::System::LibraryLoader::GetModuleHandleW(None)?;

            let window_class = w!("AudioDeviceSwitcherWindow");
            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                lpfnWndProc: Some(window_proc),
                hInstance: instance.into(),
                lpszClassName: window_class,
                ..Default::default()
            };

            // A second registration (degraded retry) fails harmlessly
            RegisterClassExW(&wc);

            let hwnd = CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                window_class,
                w!("Audio Device Switcher"),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                None,
                None,
                instance,
                None,
            )?;
            Ok(hwnd)
        }
    }

    fn settings_store_or_temp() -> SettingsStore {
        SettingsStore::beside_executable().unwrap_or_else(|e| {
            warn!("{e}; using temp directory for settings");
            SettingsStore::new(std::env::temp_dir().join(SETTINGS_FILE_NAME))
        })
    }

    /// Bring the application up and run the message loop until exit.
    ///
    /// `degraded` skips the settings file contents and the registry.
    fn run(degraded: bool) -> Result<()> {
        let _com = ComGuard::new().context("COM initialization failed")?;
        let hwnd = create_window().context("Failed to create message window")?;

        let (settings_store, loaded) = if degraded {
            let store = settings_store_or_temp();
            let loaded = LoadOutcome {
                settings: Settings::default(),
                status: LoadStatus::Reset,
            };
            (store, loaded)
        } else {
            let store = SettingsStore::beside_executable()?;
            let loaded = store.load();
            (store, loaded)
        };

        let (shared, autostart): (Box<dyn SharedStore>, Box<dyn AutoStart>) = if degraded {
            (Box::new(MemoryStore::new()), Box::new(NoAutoStart::default()))
        } else {
            (
                Box::new(RegistryStore::open()?),
                Box::new(RunKeyAutoStart::new()),
            )
        };

        let reminder = donation::schedule(shared.as_ref(), chrono::Utc::now());

        let (results_tx, results) = channel();
        // HWND is not Send; carry the raw handle across
        let hwnd_raw = hwnd.0 as isize;
        let worker = Worker::spawn(Arc::new(CoreAudioProvider), results_tx, move || unsafe {
            let _ = PostMessageW(
                HWND(hwnd_raw as *mut core::ffi::c_void),
                WM_WORKER_DONE,
                WPARAM(0),
                LPARAM(0),
            );
        })
        .context("Failed to start audio worker")?;

        let ctx = AppContext {
            settings_store,
            shared,
            autostart,
            registrar: Box::new(Win32HotkeyRegistrar::new(hwnd)),
            jobs: worker.sender(),
        };
        let mut app = AppState::new(ctx, loaded);

        let watcher = match DeviceWatcher::register(hwnd, WM_DEVICE_CHANGED) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Device notifications unavailable, relying on timer: {e}");
                None
            }
        };

        app.start();

        let mut tray = TrayManager::new();
        tray.create(&app.tooltip(), menu::build(&app))
            .context("Failed to create tray icon")?;

        unsafe {
            SetTimer(hwnd, TIMER_REFRESH, REFRESH_INTERVAL_MS, None);
            SetTimer(hwnd, TIMER_COMMAND, COMMAND_POLL_MS, None);
            if let Some(delay) = reminder {
                SetTimer(hwnd, TIMER_DONATION, delay.as_millis() as u32, None);
            }
        }

        SHELL.with(|cell| {
            *cell.borrow_mut() = Some(Shell {
                hwnd,
                app,
                tray,
                results,
                _watcher: watcher,
                _worker: worker,
            })
        });

        unsafe {
            let mut msg = MSG::default();
            while GetMessageW(&mut msg, None, 0, 0).into() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
                guarded("tray events", pump_tray);
            }
        }

        // Drop app, watcher and worker before COM is released
        SHELL.with(|cell| cell.borrow_mut().take());
        Ok(())
    }

    /// Run a callback, converting a panic into a log line.
    fn guarded<R: Default>(what: &str, f: impl FnOnce() -> R) -> R {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Panic in {what}: {message}");
                R::default()
            }
        }
    }

    /// Turn menu clicks into actions and carry out their effects.
    fn pump_tray() {
        let effects = with_shell(|shell| {
            let effects: Vec<Effect> = shell
                .tray
                .process_events()
                .into_iter()
                .filter_map(|action| shell.app.handle_action(action))
                .collect();
            shell.sync_tray();
            (shell.hwnd, effects)
        });

        // Effects run with the shell released: they re-enter the window procedure
        if let Some((hwnd, effects)) = effects {
            for effect in effects {
                perform(hwnd, effect);
            }
        }
    }

    fn perform(hwnd: HWND, effect: Effect) {
        match effect {
            Effect::Open(path) => open_path(&path),
            Effect::Quit => unsafe {
                if let Err(e) = DestroyWindow(hwnd) {
                    error!("DestroyWindow failed: {e}");
                    PostQuitMessage(0);
                }
            },
        }
    }

    fn open_path(path: &Path) {
        let path_wide = to_wide(&path.to_string_lossy());
        let result = unsafe {
            ShellExecuteW(
                None,
                w!("open"),
                PCWSTR(path_wide.as_ptr()),
                PCWSTR::null(),
                PCWSTR::null(),
                SW_SHOWNORMAL,
            )
        };
        // Values above 32 mean success
        if result.0 as isize <= 32 {
            warn!(path = %path.display(), "Failed to open file");
        }
    }

    fn show_donation_reminder() {
        info!("Showing donation reminder");
        message_box(
            donation::REMINDER_TITLE,
            donation::REMINDER_TEXT,
            MB_ICONINFORMATION,
        );
    }

    unsafe extern "system" fn window_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        guarded("window procedure", || handle_message(hwnd, msg, wparam, lparam))
    }

    fn handle_message(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        match msg {
            WM_TIMER => {
                match wparam.0 {
                    TIMER_REFRESH => {
                        with_shell(|s| s.app.on_refresh_tick());
                    }
                    TIMER_COMMAND => {
                        with_shell(|s| {
                            s.app.on_command_tick();
                            s.sync_tray();
                        });
                    }
                    TIMER_DONATION => {
                        // One reminder per session
                        unsafe {
                            let _ = KillTimer(hwnd, TIMER_DONATION);
                        }
                        show_donation_reminder();
                    }
                    _ => {}
                }
                LRESULT(0)
            }
            WM_HOTKEY => {
                with_shell(|s| {
                    s.app.on_hotkey(wparam.0 as i32);
                    s.sync_tray();
                });
                LRESULT(0)
            }
            WM_DEVICE_CHANGED => {
                with_shell(|s| s.app.request_refresh());
                LRESULT(0)
            }
            WM_WORKER_DONE => {
                with_shell(|s| {
                    s.drain_results();
                    s.sync_tray();
                });
                LRESULT(0)
            }
            WM_CLOSE => {
                // The window is never shown; only Exit tears down
                LRESULT(0)
            }
            WM_ENDSESSION => {
                if wparam.0 != 0 {
                    with_shell(|s| s.app.shutdown());
                }
                LRESULT(0)
            }
            WM_DESTROY => {
                with_shell(|s| {
                    s.app.shutdown();
                    s.tray.destroy();
                });
                unsafe { PostQuitMessage(0) };
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }
}
