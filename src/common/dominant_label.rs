use std::fmt;
use serde::{Deserialize, Serialize};

/// The single most relevant detection kind reported for a frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DominantLabel {
    #[default] NoDetection,
    Fire,
    Smoke,
}

impl DominantLabel {
    pub fn as_label(&self) -> Option<&'static str> {
        match self {
            DominantLabel::NoDetection => None,
            DominantLabel::Fire => Some("Fire"),
            DominantLabel::Smoke => Some("Smoke"),
        }
    }

    pub fn is_detected(&self) -> bool {
        !matches!(self, DominantLabel::NoDetection)
    }
}

impl fmt::Display for DominantLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label().unwrap_or("None"))
    }
}
