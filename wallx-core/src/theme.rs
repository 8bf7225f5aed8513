use log::error;
use std::fmt;
use std::str::FromStr;

use crate::storage::KvStore;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(anyhow::anyhow!("unknown theme {:?}", other)),
        }
    }
}

/// Saved preference if there is one, `system_default` otherwise.
pub fn load_theme(kv: &dyn KvStore, system_default: Theme) -> Theme {
    match kv.get_item(THEME_KEY) {
        Ok(Some(saved)) => saved.parse().unwrap_or(system_default),
        Ok(None) => system_default,
        Err(e) => {
            error!("Failed to load theme preference: {}", e);
            system_default
        }
    }
}

/// Flips `current` and persists it. A failed write is logged; the flip stands.
pub fn toggle_theme(kv: &dyn KvStore, current: Theme) -> Theme {
    let next = current.toggled();
    if let Err(e) = kv.set_item(THEME_KEY, next.as_str()) {
        error!("Failed to save theme preference: {}", e);
    }
    next
}
