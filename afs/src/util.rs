use afs_format::Notification;
use chrono::Local;

/// Prints a notification as `[HH:MM:SS] [Kind] message`.
pub fn print_notification(notification: Notification) {
    let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), notification);
    match notification {
        Notification::Warning(_) | Notification::Error(_) => eprintln!("{}", line),
        Notification::Info(_) | Notification::Success(_) => println!("{}", line),
    }
}

pub fn print_error(error: &anyhow::Error) {
    print_notification(Notification::Error(error.to_string()));
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {}", cause);
    }
}

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    use humansize::{file_size_opts as options, FileSize};
    bytes
        .file_size(options::BINARY)
        .unwrap_or_else(|_| format!("{} B", bytes))
}
