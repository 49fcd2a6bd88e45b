//! comdecl demo
//!
//! Drives the taskbar progress bar of the console window and creates or
//! resolves shell shortcuts through interfaces declared with comdecl.
//!
//! USAGE:
//!   comdecl-demo progress --completed 30 --total 100 --state paused
//!   comdecl-demo shortcut create C:\Windows\notepad.exe notepad.lnk --description "Notepad"
//!   comdecl-demo shortcut resolve notepad.lnk

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use comdecl::interfaces::{ShortcutSpec, TaskbarState};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Taskbar progress indicator state
#[derive(Debug, Clone, Copy, ValueEnum)]
enum State {
    /// No progress bar
    None,
    /// Pulsing, no known value
    Indeterminate,
    /// Green
    Normal,
    /// Red
    Error,
    /// Yellow
    Paused,
}

impl From<State> for TaskbarState {
    fn from(state: State) -> Self {
        match state {
            State::None => TaskbarState::NoProgress,
            State::Indeterminate => TaskbarState::Indeterminate,
            State::Normal => TaskbarState::Normal,
            State::Error => TaskbarState::Error,
            State::Paused => TaskbarState::Paused,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "comdecl-demo")]
#[command(version)]
#[command(about = "Taskbar progress and shell shortcuts through declared COM interfaces")]
struct Args {
    /// Log activation, binding and calls
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[cfg_attr(not(windows), allow(dead_code))]
enum Command {
    /// Show progress on a taskbar button (the console window by default)
    Progress {
        #[arg(long)]
        completed: u64,

        #[arg(long)]
        total: u64,

        #[arg(long, value_enum, default_value = "normal")]
        state: State,

        /// Window handle, in hex, instead of the console window
        #[arg(long, value_parser = parse_hwnd)]
        hwnd: Option<usize>,

        /// Seconds to keep the process alive so the indicator stays visible
        #[arg(long, default_value_t = 3)]
        hold: u64,
    },

    /// Create or resolve .lnk shortcuts
    Shortcut {
        #[command(subcommand)]
        action: ShortcutAction,
    },
}

#[derive(Subcommand, Debug)]
#[cfg_attr(not(windows), allow(dead_code))]
enum ShortcutAction {
    /// Create a shortcut at LINK pointing to TARGET
    Create {
        target: String,
        link: PathBuf,

        #[arg(long)]
        workdir: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        arguments: Option<String>,

        /// Icon file; the icon index is given with --icon-index
        #[arg(long)]
        icon: Option<String>,

        #[arg(long, default_value_t = 0)]
        icon_index: i32,
    },

    /// Print the target of the shortcut at LINK
    Resolve { link: PathBuf },
}

fn parse_hwnd(text: &str) -> Result<usize, String> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    usize::from_str_radix(digits, 16).map_err(|e| format!("invalid window handle '{text}': {e}"))
}

#[cfg_attr(not(windows), allow(dead_code))]
fn shortcut_spec(
    target: String,
    workdir: Option<String>,
    description: Option<String>,
    arguments: Option<String>,
    icon: Option<String>,
    icon_index: i32,
) -> ShortcutSpec {
    let mut spec = ShortcutSpec::new(target);
    spec.working_directory = workdir;
    spec.description = description;
    spec.arguments = arguments;
    spec.icon = icon.map(|icon| (icon, icon_index));
    spec
}

#[cfg(windows)]
mod demo {
    use std::ffi::c_void;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    use comdecl::interfaces::{IShellLinkW, ITaskbarList3, ShortcutSpec, TaskbarState};
    use comdecl::{ComApartment, ComError, ComInterface};
    use tracing::info;
    use windows_sys::Win32::System::Console::GetConsoleWindow;

    pub fn progress(
        completed: u64,
        total: u64,
        state: TaskbarState,
        hwnd: Option<usize>,
        hold: u64,
    ) -> comdecl::Result<()> {
        let _apartment = ComApartment::initialize()?;

        let hwnd = match hwnd {
            Some(handle) => handle as *mut c_void,
            None => (unsafe { GetConsoleWindow() }) as *mut c_void,
        };
        if hwnd.is_null() {
            return Err(ComError::NullPointer("console window"));
        }

        let taskbar = ITaskbarList3::create()?;
        taskbar.hr_init()?;
        taskbar.set_progress(hwnd, completed, total)?;
        taskbar.set_state(hwnd, state)?;
        info!("progress {}/{} ({:?}) on {:p}", completed, total, state, hwnd);

        thread::sleep(Duration::from_secs(hold));
        Ok(())
    }

    pub fn create_shortcut(spec: &ShortcutSpec, link: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let _apartment = ComApartment::initialize()?;
        let link = std::path::absolute(link)?;
        let shell_link = IShellLinkW::create()?;
        shell_link.create_link(spec, &link.to_string_lossy())?;
        println!("{} -> {}", link.display(), spec.target);
        Ok(())
    }

    pub fn resolve_shortcut(link: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let _apartment = ComApartment::initialize()?;
        let link = std::path::absolute(link)?;
        let shell_link = IShellLinkW::create()?;
        match shell_link.get_path(Some(&link.to_string_lossy()))? {
            Some(target) => println!("{target}"),
            None => println!("{} has no file-system target", link.display()),
        }
        Ok(())
    }
}

#[cfg(windows)]
fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Progress {
            completed,
            total,
            state,
            hwnd,
            hold,
        } => demo::progress(completed, total, state.into(), hwnd, hold)?,
        Command::Shortcut { action } => match action {
            ShortcutAction::Create {
                target,
                link,
                workdir,
                description,
                arguments,
                icon,
                icon_index,
            } => {
                let spec = shortcut_spec(target, workdir, description, arguments, icon, icon_index);
                demo::create_shortcut(&spec, &link)?;
            }
            ShortcutAction::Resolve { link } => demo::resolve_shortcut(&link)?,
        },
    }
    Ok(())
}

#[cfg(not(windows))]
fn run(_command: Command) -> Result<(), Box<dyn std::error::Error>> {
    Err("COM is only available on Windows".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    run(args.command)
}
