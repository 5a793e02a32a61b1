use std::fmt;

/// A progress message reported by a long-running archive operation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Notification {
    Info(String),
    Warning(String),
    Success(String),
    Error(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Info(m)
            | Notification::Warning(m)
            | Notification::Success(m)
            | Notification::Error(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Info(_) => "Info",
            Notification::Warning(_) => "Warning",
            Notification::Success(_) => "Success",
            Notification::Error(_) => "Error",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind(), self.message())
    }
}

/// Sink for notifications. Invoked in-line; it must not call back into the archive.
pub type Progress<'a> = &'a mut dyn FnMut(Notification);

/// A sink that drops everything.
pub fn silent(_: Notification) {}

/// Mirrors the notification to `tracing` and hands it to the sink.
pub(crate) fn emit(progress: &mut dyn FnMut(Notification), notification: Notification) {
    match &notification {
        Notification::Info(m) => tracing::debug!("{}", m),
        Notification::Success(m) => tracing::info!("{}", m),
        Notification::Warning(m) => tracing::warn!("{}", m),
        Notification::Error(m) => tracing::error!("{}", m),
    }
    progress(notification);
}
