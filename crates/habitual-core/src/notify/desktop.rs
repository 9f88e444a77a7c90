//! Desktop notifications through the platform's notification helper.
//!
//! - Linux: `notify-send TITLE MESSAGE`
//! - macOS: `osascript -e 'display notification ... with title ...'`
//! - Windows: a PowerShell balloon tip
//!
//! Title and message are passed as process arguments, never through a shell.

use std::process::Command;

use super::Notifier;
use crate::error::NotifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was built for, if it has a desktop helper.
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Some(Platform::MacOs)
        } else if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else {
            None
        }
    }
}

/// Escape for an AppleScript double-quoted string literal.
fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Escape for a PowerShell single-quoted string literal.
fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Sends notifications by running the platform helper program.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    platform: Option<Platform>,
}

impl DesktopNotifier {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform: Some(platform),
        }
    }

    /// A notifier that fails every delivery with `UnsupportedPlatform`.
    pub fn unsupported() -> Self {
        Self { platform: None }
    }

    /// Program and arguments for one notification.
    pub fn command_line(platform: Platform, title: &str, message: &str) -> (String, Vec<String>) {
        match platform {
            Platform::Linux => (
                "notify-send".into(),
                vec![title.to_string(), message.to_string()],
            ),
            Platform::MacOs => (
                "osascript".into(),
                vec![
                    "-e".into(),
                    format!(
                        "display notification {} with title {}",
                        applescript_quote(message),
                        applescript_quote(title)
                    ),
                ],
            ),
            Platform::Windows => {
                let script = format!(
                    "Add-Type -AssemblyName System.Windows.Forms; \
                     $n = New-Object System.Windows.Forms.NotifyIcon; \
                     $n.Icon = [System.Drawing.SystemIcons]::Information; \
                     $n.Visible = $true; \
                     $n.ShowBalloonTip(10000, {}, {}, 'Info'); \
                     Start-Sleep -Seconds 10; $n.Dispose()",
                    powershell_quote(title),
                    powershell_quote(message)
                );
                (
                    "powershell".into(),
                    vec!["-NoProfile".into(), "-Command".into(), script],
                )
            }
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let platform = self
            .platform
            .ok_or_else(|| NotifyError::UnsupportedPlatform(std::env::consts::OS.to_string()))?;
        let (program, args) = Self::command_line(platform, title, message);

        let status = Command::new(&program)
            .args(&args)
            .status()
            .map_err(|source| NotifyError::SpawnFailed {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(NotifyError::ExitStatus {
                program,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_passes_title_and_message_as_arguments() {
        let (program, args) = DesktopNotifier::command_line(
            Platform::Linux,
            "Habit Reminder",
            "Time to complete your habit: \"Read\"",
        );
        assert_eq!(program, "notify-send");
        assert_eq!(args, vec!["Habit Reminder", "Time to complete your habit: \"Read\""]);
    }

    #[test]
    fn macos_script_escapes_quotes() {
        let (program, args) =
            DesktopNotifier::command_line(Platform::MacOs, "Title", "say \"hi\"");
        assert_eq!(program, "osascript");
        assert_eq!(args[0], "-e");
        assert_eq!(
            args[1],
            "display notification \"say \\\"hi\\\"\" with title \"Title\""
        );
    }

    #[test]
    fn windows_script_escapes_single_quotes() {
        let (_, args) = DesktopNotifier::command_line(Platform::Windows, "T", "Don't forget");
        assert!(args[2].contains("'Don''t forget'"));
    }

    #[test]
    fn unsupported_notifier_errors() {
        let err = DesktopNotifier::unsupported().notify("t", "m").unwrap_err();
        assert!(matches!(err, NotifyError::UnsupportedPlatform(_)));
    }
}
