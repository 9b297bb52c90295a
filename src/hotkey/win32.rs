use super::{Hotkey, HotkeyBackend};
use crate::error::IslandError;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT, MOD_WIN,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetMessageW, PostThreadMessageW, MSG, WM_HOTKEY, WM_QUIT,
};

/// Offset added to binding indices to form hotkey ids.
const ID_BASE: i32 = 0x4000;

fn modifiers(hotkey: &Hotkey) -> HOT_KEY_MODIFIERS {
    // MOD_NOREPEAT lets the OS swallow auto-repeat of a held combination.
    let mut bits = MOD_NOREPEAT.0;
    if hotkey.ctrl {
        bits |= MOD_CONTROL.0;
    }
    if hotkey.alt {
        bits |= MOD_ALT.0;
    }
    if hotkey.shift {
        bits |= MOD_SHIFT.0;
    }
    if hotkey.win {
        bits |= MOD_WIN.0;
    }
    HOT_KEY_MODIFIERS(bits)
}

struct MessageThread {
    thread_id: u32,
    join: JoinHandle<()>,
}

/// Registers combinations with `RegisterHotKey` on a dedicated message-loop
/// thread. Thread-bound registrations deliver `WM_HOTKEY` to that thread only.
#[derive(Default)]
pub struct RegisteredHotkeys {
    thread: Option<MessageThread>,
}

impl HotkeyBackend for RegisteredHotkeys {
    fn install(&mut self, hotkeys: &[Hotkey], fired: Sender<usize>) -> Vec<Result<(), IslandError>> {
        if self.thread.is_some() {
            self.uninstall();
        }
        let hotkeys = hotkeys.to_vec();
        let count = hotkeys.len();
        let (ready_tx, ready_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("hotkey-messages".into())
            .spawn(move || {
                let thread_id = unsafe { GetCurrentThreadId() };
                let mut registered = Vec::new();
                let mut results = Vec::with_capacity(hotkeys.len());
                for (index, hotkey) in hotkeys.iter().enumerate() {
                    let id = ID_BASE + index as i32;
                    let ok = unsafe {
                        RegisterHotKey(None, id, modifiers(hotkey), hotkey.key.virtual_key()).is_ok()
                    };
                    if ok {
                        registered.push(id);
                        results.push(Ok(()));
                    } else {
                        results.push(Err(IslandError::HotkeyConflict {
                            combo: hotkey.to_string(),
                        }));
                    }
                }
                let _ = ready_tx.send((thread_id, results));

                let mut msg = MSG::default();
                // GetMessageW returns 0 on WM_QUIT and -1 on error.
                while unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 > 0 {
                    if msg.message == WM_HOTKEY {
                        let index = msg.wParam.0 as i32 - ID_BASE;
                        if index >= 0 && fired.send(index as usize).is_err() {
                            break;
                        }
                    }
                }

                for id in registered {
                    unsafe {
                        let _ = UnregisterHotKey(None, id);
                    }
                }
            });

        let join = match spawned {
            Ok(join) => join,
            Err(err) => {
                tracing::error!(?err, "failed to spawn hotkey message thread");
                return (0..count)
                    .map(|_| Err(IslandError::HotkeysUnsupported { combo: String::new() }))
                    .collect();
            }
        };

        match ready_rx.recv() {
            Ok((thread_id, results)) => {
                self.thread = Some(MessageThread { thread_id, join });
                results
            }
            Err(_) => {
                let _ = join.join();
                (0..count)
                    .map(|_| Err(IslandError::HotkeysUnsupported { combo: String::new() }))
                    .collect()
            }
        }
    }

    fn uninstall(&mut self) {
        if let Some(thread) = self.thread.take() {
            let posted = unsafe { PostThreadMessageW(thread.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
            if let Err(err) = posted {
                // The thread still owns its registrations; keep the handle so
                // a later uninstall can retry.
                tracing::warn!(?err, "failed to stop hotkey message thread");
                self.thread = Some(thread);
                return;
            }
            let _ = thread.join.join();
            tracing::info!("unregistered hotkeys");
        }
    }

    fn is_installed(&self) -> bool {
        self.thread.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_quit_post_keeps_thread_handle() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let join = thread::spawn(move || {
            let _ = release_rx.recv();
        });
        // Thread id 0 never has a message queue, so posting to it fails.
        let mut hotkeys = RegisteredHotkeys {
            thread: Some(MessageThread { thread_id: 0, join }),
        };
        hotkeys.uninstall();
        assert!(hotkeys.is_installed());

        let _ = release_tx.send(());
        if let Some(thread) = hotkeys.thread.take() {
            thread.join.join().unwrap();
        }
    }

    #[test]
    fn uninstall_stops_message_thread() {
        let mut hotkeys = RegisteredHotkeys::default();
        let (fired, _rx) = mpsc::channel();
        let hotkey = crate::hotkey::parse_hotkey("Ctrl+Alt+Shift+F24").unwrap();
        let _ = hotkeys.install(&[hotkey], fired);
        assert!(hotkeys.is_installed());
        hotkeys.uninstall();
        assert!(!hotkeys.is_installed());
    }
}
