use super::{MediaAction, MediaTransport};
use crate::error::IslandError;
use windows::Media::Control::GlobalSystemMediaTransportControlsSessionManager;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_MEDIA_NEXT_TRACK, VK_MEDIA_PLAY_PAUSE, VK_MEDIA_PREV_TRACK,
};

/// Drives the session the system media overlay currently points at.
#[derive(Debug, Default)]
pub struct SessionTransport;

impl MediaTransport for SessionTransport {
    fn send(&mut self, action: MediaAction) -> anyhow::Result<()> {
        let manager = GlobalSystemMediaTransportControlsSessionManager::RequestAsync()?.get()?;
        // A null current session surfaces as an error.
        let session = manager
            .GetCurrentSession()
            .map_err(|_| IslandError::MediaSessionAbsent)?;
        let accepted = match action {
            MediaAction::PlayPause => session.TryTogglePlayPauseAsync()?.get()?,
            MediaAction::Next => session.TrySkipNextAsync()?.get()?,
            MediaAction::Previous => session.TrySkipPreviousAsync()?.get()?,
        };
        if !accepted {
            tracing::debug!(?action, "media session rejected command");
        }
        Ok(())
    }
}

/// Synthesises the media keys, for players that ignore the session API.
#[derive(Debug, Default)]
pub struct MediaKeyTransport;

fn send_key(vk: VIRTUAL_KEY) -> anyhow::Result<()> {
    let mut input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: KEYBD_EVENT_FLAGS(0),
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    let size = std::mem::size_of::<INPUT>() as i32;
    unsafe {
        let down = SendInput(&[input], size);
        input.Anonymous.ki.dwFlags = KEYEVENTF_KEYUP;
        let up = SendInput(&[input], size);
        if down == 0 || up == 0 {
            anyhow::bail!("SendInput was blocked");
        }
    }
    Ok(())
}

impl MediaTransport for MediaKeyTransport {
    fn send(&mut self, action: MediaAction) -> anyhow::Result<()> {
        match action {
            MediaAction::PlayPause => send_key(VK_MEDIA_PLAY_PAUSE),
            MediaAction::Next => send_key(VK_MEDIA_NEXT_TRACK),
            MediaAction::Previous => send_key(VK_MEDIA_PREV_TRACK),
        }
    }
}
