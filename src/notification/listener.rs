use super::{NotificationBackend, RawNotification};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use windows::Foundation::Collections::IVectorView;
use windows::UI::Notifications::Management::{
    UserNotificationListener, UserNotificationListenerAccessStatus,
};
use windows::UI::Notifications::{KnownNotificationBindings, NotificationKinds, UserNotification};

/// 100ns ticks between 1601-01-01 and the unix epoch.
const FILETIME_UNIX_OFFSET: i64 = 116_444_736_000_000_000;

/// Polls the user notification listener for new toasts.
///
/// Toasts already present when the subscription is made are treated as seen,
/// so a restart does not replay the action centre.
#[derive(Default)]
pub struct ListenerBackend {
    listener: Option<UserNotificationListener>,
    seen: HashSet<u32>,
}

impl ListenerBackend {
    fn current(&self) -> anyhow::Result<IVectorView<UserNotification>> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| anyhow!("listener not subscribed"))?;
        let view = listener
            .GetNotificationsAsync(NotificationKinds::Toast)?
            .get()
            .context("GetNotificationsAsync")?;
        Ok(view)
    }
}

impl NotificationBackend for ListenerBackend {
    fn subscribe(&mut self) -> anyhow::Result<()> {
        let listener = UserNotificationListener::Current().context("UserNotificationListener::Current")?;
        let mut status = listener.GetAccessStatus()?;
        if status != UserNotificationListenerAccessStatus::Allowed {
            status = listener.RequestAccessAsync()?.get()?;
        }
        if status != UserNotificationListenerAccessStatus::Allowed {
            anyhow::bail!("notification access not granted ({:?})", status);
        }
        self.listener = Some(listener);

        let view = self.current()?;
        self.seen.clear();
        for i in 0..view.Size()? {
            self.seen.insert(view.GetAt(i)?.Id()?);
        }
        Ok(())
    }

    fn poll(&mut self) -> anyhow::Result<Vec<RawNotification>> {
        let view = self.current()?;
        let mut present = HashSet::new();
        let mut fresh = Vec::new();
        for i in 0..view.Size()? {
            let notification = view.GetAt(i)?;
            let id = notification.Id()?;
            present.insert(id);
            if self.seen.contains(&id) {
                continue;
            }
            match read_notification(&notification) {
                Ok(raw) => fresh.push(raw),
                Err(err) => tracing::debug!(id, error = %format!("{err:#}"), "unreadable notification skipped"),
            }
        }
        // Only ids still in the action centre can come back.
        self.seen = present;
        Ok(fresh)
    }
}

fn read_notification(notification: &UserNotification) -> anyhow::Result<RawNotification> {
    let source_app = notification
        .AppInfo()
        .and_then(|info| info.DisplayInfo())
        .and_then(|display| display.DisplayName())
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    let binding = notification
        .Notification()?
        .Visual()?
        .GetBinding(&KnownNotificationBindings::ToastGeneric()?)?;
    let texts = binding.GetTextElements()?;
    let mut lines = Vec::new();
    for i in 0..texts.Size()? {
        lines.push(texts.GetAt(i)?.Text()?.to_string_lossy());
    }
    let mut lines = lines.into_iter();
    let title = lines.next().unwrap_or_default();
    let body = lines.collect::<Vec<_>>().join("\n");

    let posted_at = notification.CreationTime().ok().and_then(|time| {
        let ticks = time.UniversalTime - FILETIME_UNIX_OFFSET;
        DateTime::<Utc>::from_timestamp(ticks / 10_000_000, ((ticks % 10_000_000) * 100) as u32)
    });

    Ok(RawNotification {
        source_app,
        title,
        body,
        posted_at,
    })
}
