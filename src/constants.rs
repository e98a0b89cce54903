//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Group registry constants
pub mod groups {
    /// Fixed number of groups; ids are always 0..GROUP_COUNT
    pub const GROUP_COUNT: u8 = 10;
}

/// Hotkey chord constants
pub mod hotkeys {
    use std::time::Duration;

    /// Default trigger key for the always-on-top toggle
    pub const DEFAULT_TOPMOST_KEY: &str = "t";

    /// Default trigger key for the isolate ("show only") toggle
    pub const DEFAULT_SHOW_ONLY_KEY: &str = "m";

    /// Default trigger key for the transparency toggle
    pub const DEFAULT_TRANSPARENT_KEY: &str = "p";

    /// Default trigger key for opening the group manager
    pub const DEFAULT_GROUP_MANAGER_KEY: &str = "g";

    /// How long a pending group selection stays armed before expiring
    pub const PENDING_GROUP_TIMEOUT: Duration = Duration::from_secs(4);
}

/// Transparency transform constants
pub mod transparency {
    /// Alpha applied when a window first becomes transparent
    pub const DEFAULT_ALPHA: u8 = 200;

    /// Lowest alpha the engine accepts (matches the overlay slider floor)
    pub const MIN_ALPHA: u8 = 30;

    /// Fully opaque alpha, restored when transparency is cancelled
    pub const OPAQUE: u8 = 255;
}

/// Config file location constants
pub mod config {
    /// Subdirectory under the user config dir
    pub const APP_DIR: &str = "wingroup";

    /// Config file name
    pub const FILENAME: &str = "config.json";
}
