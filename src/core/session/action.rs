// snesdump-rs/src/core/session/action.rs

/// Menu shown on start-up and on `h`
pub const MENU: &str = " i - Cart Info\n d - Dump ROM\n s - Dump SRAM\n w - Write SRAM\n h - Show this screen\n q - Quit";

/// A user action from the interactive menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Info,
    DumpRom,
    DumpSram,
    WriteSram,
    Help,
    Quit,
}

impl Action {
    /// Parse a menu code. Case and surrounding whitespace are ignored.
    pub fn parse(input: &str) -> Option<Action> {
        match input.trim().to_ascii_lowercase().as_str() {
            "i" => Some(Action::Info),
            "d" => Some(Action::DumpRom),
            "s" => Some(Action::DumpSram),
            "w" => Some(Action::WriteSram),
            "h" => Some(Action::Help),
            "q" => Some(Action::Quit),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Action::Info => 'i',
            Action::DumpRom => 'd',
            Action::DumpSram => 's',
            Action::WriteSram => 'w',
            Action::Help => 'h',
            Action::Quit => 'q',
        }
    }

    /// Whether the action talks to the adapter
    pub fn uses_device(&self) -> bool {
        !matches!(self, Action::Help | Action::Quit)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Info => write!(f, "Info"),
            Action::DumpRom => write!(f, "DumpRom"),
            Action::DumpSram => write!(f, "DumpSram"),
            Action::WriteSram => write!(f, "WriteSram"),
            Action::Help => write!(f, "Help"),
            Action::Quit => write!(f, "Quit"),
        }
    }
}
