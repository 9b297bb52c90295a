pub mod error;
pub mod events;
pub mod gui;
pub mod hotkey;
pub mod island;
pub mod logging;
pub mod media;
pub mod notification;
pub mod queue;
pub mod runtime;
pub mod settings;

pub use error::IslandError;
pub use events::{CommandEvent, IslandEvent, NotificationRecord, SurfaceEvent};
pub use island::{IslandStateMachine, PanelMode, PresentationSurface};
pub use queue::{EventQueue, EventSender};
pub use runtime::IslandRuntime;
pub use settings::Settings;
