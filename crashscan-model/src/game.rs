use std::fmt;

/// Game installations the scanner knows how to reason about.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GameVariant {
    #[default]
    Fallout4,
    Fallout4Vr,
    SkyrimSe,
}

impl GameVariant {
    pub const ALL: [GameVariant; 3] =
        [GameVariant::Fallout4, GameVariant::Fallout4Vr, GameVariant::SkyrimSe];

    pub fn display_name(self) -> &'static str {
        match self {
            GameVariant::Fallout4 => "Fallout 4",
            GameVariant::Fallout4Vr => "Fallout 4 VR",
            GameVariant::SkyrimSe => "Skyrim Special Edition",
        }
    }

    /// File name of the game executable inside the install root.
    pub fn executable_name(self) -> &'static str {
        match self {
            GameVariant::Fallout4 => "Fallout4.exe",
            GameVariant::Fallout4Vr => "Fallout4VR.exe",
            GameVariant::SkyrimSe => "SkyrimSE.exe",
        }
    }

    /// File name of the script extender loader expected next to the executable.
    pub fn script_extender_loader(self) -> &'static str {
        match self {
            GameVariant::Fallout4 => "f4se_loader.exe",
            GameVariant::Fallout4Vr => "f4sevr_loader.exe",
            GameVariant::SkyrimSe => "skse64_loader.exe",
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
