//! External programs the archive leans on: a screenshot tool that writes an
//! image to a given path, and the desktop's file opener.
use std::{
    path::Path,
    process::{Command, ExitStatus},
};

use log::{debug, info, warn};
use shell_words::split;
use which::which;

use crate::{Config, NoteError, Result};

/// Placeholder replaced by the capture target in tool arguments
pub const PATH_PLACEHOLDER: &str = "{path}";
/// Placeholder inside a single-quoted script string; `'` in the path is
/// doubled when it is substituted here.
const QUOTED_PATH_PLACEHOLDER: &str = "'{path}'";

const WINDOWS_CAPTURE_SCRIPT: &str = "Add-Type -AssemblyName System.Windows.Forms; \
Add-Type -AssemblyName System.Drawing; \
$Screen = [System.Windows.Forms.SystemInformation]::VirtualScreen; \
$bitmap = New-Object System.Drawing.Bitmap $Screen.Width, $Screen.Height; \
$graphic = [System.Drawing.Graphics]::FromImage($bitmap); \
$graphic.CopyFromScreen($Screen.Left, $Screen.Top, 0, 0, $bitmap.Size); \
$bitmap.Save('{path}'); $graphic.Dispose(); $bitmap.Dispose()";

/// Something that, given a target path, tries to write an image there.
pub trait ImageCapture {
    fn capture(&self, target: &Path) -> Result<()>;
}

/// Something that can show a file to the user.
pub trait FileOpener {
    fn open(&self, path: &Path) -> Result<()>;
}

/// An external screenshot program and its argument template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotTool {
    pub program: String,
    pub args: Vec<String>,
}

impl ScreenshotTool {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Parses a user supplied command line such as `grim -t png {path}`.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut words = split(command_line).map_err(|e| {
            NoteError::invalid(format!("Failed to parse capture command: {}", e))
        })?;

        if words.is_empty() {
            return Err(NoteError::invalid("Empty capture command"));
        }

        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }

    /// Known tools for this platform, most preferred first
    pub fn candidates() -> Vec<ScreenshotTool> {
        if cfg!(target_os = "macos") {
            vec![Self::new("screencapture", &["-i", PATH_PLACEHOLDER])]
        } else if cfg!(windows) {
            vec![Self::new(
                "powershell",
                &["-NoProfile", "-Command", WINDOWS_CAPTURE_SCRIPT],
            )]
        } else {
            vec![
                Self::new("gnome-screenshot", &["-a", "-f", PATH_PLACEHOLDER]),
                Self::new("spectacle", &["-b", "-n", "-r", "-o", PATH_PLACEHOLDER]),
                Self::new("grim", &[PATH_PLACEHOLDER]),
                Self::new("scrot", &["-s", PATH_PLACEHOLDER]),
                Self::new("maim", &["-s", PATH_PLACEHOLDER]),
                Self::new("import", &[PATH_PLACEHOLDER]),
            ]
        }
    }

    /// First candidate whose program is on the PATH
    pub fn detect() -> Option<ScreenshotTool> {
        let found = Self::candidates()
            .into_iter()
            .find(|tool| which(&tool.program).is_ok());

        match &found {
            Some(tool) => debug!("Using screenshot program: {}", tool.program),
            None => warn!("No known screenshot program found on PATH"),
        }
        found
    }

    /// Arguments with the target substituted, or appended when the template
    /// has no placeholder.
    pub fn args_for(&self, target: &Path) -> Vec<String> {
        let target = target.to_string_lossy();
        let quoted = format!("'{}'", target.replace('\'', "''"));
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(PATH_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(QUOTED_PATH_PLACEHOLDER, &quoted)
                        .replace(PATH_PLACEHOLDER, &target)
                } else {
                    arg.clone()
                }
            })
            .collect();

        if !substituted {
            args.push(target.into_owned());
        }
        args
    }
}

/// Captures by running a screenshot program and waiting for it to exit.
#[derive(Debug, Clone, Default)]
pub struct ExternalCapture {
    tool: Option<ScreenshotTool>,
}

impl ExternalCapture {
    pub fn new(tool: Option<ScreenshotTool>) -> Self {
        Self { tool }
    }

    /// Uses the configured command when present, otherwise searches the PATH.
    pub fn from_config(config: &Config) -> Result<Self> {
        let tool = match &config.capture_command {
            Some(command_line) => Some(ScreenshotTool::from_command_line(command_line)?),
            None => ScreenshotTool::detect(),
        };
        Ok(Self::new(tool))
    }

    pub fn tool(&self) -> Option<&ScreenshotTool> {
        self.tool.as_ref()
    }
}

impl ImageCapture for ExternalCapture {
    fn capture(&self, target: &Path) -> Result<()> {
        let tool = self.tool.as_ref().ok_or_else(|| NoteError::CaptureFailed {
            message: "no screenshot program available on this system".to_string(),
        })?;

        info!("Running {} to capture {}", tool.program, target.display());
        let status = Command::new(&tool.program)
            .args(tool.args_for(target))
            .status()
            .map_err(|e| NoteError::CaptureFailed {
                message: format!("failed to run {}: {}", tool.program, e),
            })?;

        check_status(&tool.program, status)
    }
}

/// Opens files with the platform's default handler
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/c", "start", ""]);
            cmd
        } else {
            Command::new("xdg-open")
        };

        debug!("Opening {}", path.display());
        let status = command
            .arg(path)
            .status()
            .map_err(|e| NoteError::OpenFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(NoteError::OpenFailed {
                path: path.to_path_buf(),
                message: format!("viewer exited with {}", status),
            })
        }
    }
}

fn check_status(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(NoteError::CaptureFailed {
            message: format!("{} exited with {}", program, status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_for_substitutes_placeholder() {
        let tool = ScreenshotTool::from_command_line("gnome-screenshot -a -f {path}").unwrap();
        assert_eq!(tool.program, "gnome-screenshot");
        assert_eq!(
            tool.args_for(Path::new("/tmp/a.png")),
            vec!["-a", "-f", "/tmp/a.png"]
        );
    }

    #[test]
    fn test_args_for_appends_without_placeholder() {
        let tool = ScreenshotTool::from_command_line("grim -t png").unwrap();
        assert_eq!(
            tool.args_for(Path::new("/tmp/b.png")),
            vec!["-t", "png", "/tmp/b.png"]
        );
    }

    #[test]
    fn test_placeholder_inside_larger_argument() {
        let tool = ScreenshotTool::from_command_line("sh -c 'grim \"{path}\"'").unwrap();
        assert_eq!(
            tool.args_for(Path::new("/tmp/c.png")),
            vec!["-c", "grim \"/tmp/c.png\""]
        );
    }

    #[test]
    fn test_single_quoted_placeholder_escapes_quotes_in_path() {
        let tool = ScreenshotTool::new(
            "powershell",
            &["-NoProfile", "-Command", WINDOWS_CAPTURE_SCRIPT],
        );
        let args = tool.args_for(Path::new("C:/Users/o'brien/shot.png"));

        assert!(args[2].contains("$bitmap.Save('C:/Users/o''brien/shot.png');"));
        assert!(!args[2].contains(PATH_PLACEHOLDER));
        assert_eq!(args.len(), 3);

        // Unquoted placeholders take the path as is
        let tool = ScreenshotTool::from_command_line("grim {path}").unwrap();
        assert_eq!(tool.args_for(Path::new("/tmp/it's.png")), vec!["/tmp/it's.png"]);
    }

    #[test]
    fn test_from_command_line_rejects_empty_and_unbalanced() {
        assert!(ScreenshotTool::from_command_line("   ").is_err());
        assert!(ScreenshotTool::from_command_line("grim 'unterminated").is_err());
    }

    #[test]
    fn test_candidates_all_take_a_target() {
        for tool in ScreenshotTool::candidates() {
            let args = tool.args_for(Path::new("/tmp/x.png"));
            assert!(args.iter().any(|a| a.contains("/tmp/x.png")), "{:?}", tool);
        }
    }

    #[test]
    fn test_capture_without_tool_fails() {
        let capture = ExternalCapture::new(None);
        let err = capture.capture(&PathBuf::from("/tmp/never.png")).unwrap_err();
        assert!(matches!(err, NoteError::CaptureFailed { .. }));
    }

    #[test]
    fn test_from_config_prefers_configured_command() {
        let config =
            Config::from_data_dir("/tmp/scrolls").with_capture_command(Some("maim -s".into()));
        let capture = ExternalCapture::from_config(&config).unwrap();
        assert_eq!(capture.tool().map(|t| t.program.as_str()), Some("maim"));
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_reports_nonzero_exit() {
        let tool = ScreenshotTool::from_command_line("false").unwrap();
        let err = ExternalCapture::new(Some(tool))
            .capture(Path::new("/tmp/ignored.png"))
            .unwrap_err();
        assert!(matches!(err, NoteError::CaptureFailed { .. }));
    }
}
