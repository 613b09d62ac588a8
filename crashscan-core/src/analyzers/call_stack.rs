use async_trait::async_trait;
use crashscan_model::{AnalysisOutcome, GameVariant, ParsedLog};
use tokio_util::sync::CancellationToken;

use crate::error::AnalyzerError;
use crate::ports::Analyzer;

/// A known troublemaker recognised by a fragment of a call-stack frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suspect {
    pub name: String,
    /// Matched case-insensitively against every frame.
    pub fragment: String,
    pub advice: String,
}

impl Suspect {
    pub fn new(
        name: impl Into<String>,
        fragment: impl Into<String>,
        advice: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            fragment: fragment.into().to_ascii_lowercase(),
            advice: advice.into(),
        }
    }
}

/// Matches call-stack frames against a list of suspects.
#[derive(Debug, Clone)]
pub struct CallStackSuspectAnalyzer {
    suspects: Vec<Suspect>,
}

impl CallStackSuspectAnalyzer {
    pub const NAME: &'static str = "Call Stack Suspects";

    pub fn new(suspects: Vec<Suspect>) -> Self {
        Self { suspects }
    }

    pub fn for_game(game: GameVariant) -> Self {
        let extender = match game {
            GameVariant::Fallout4 => "f4se_",
            GameVariant::Fallout4Vr => "f4sevr_",
            GameVariant::SkyrimSe => "skse64_",
        };

        Self::new(vec![
            Suspect::new(
                "Script Extender",
                extender,
                "Update the script extender and its plugins for this game \
                 version.",
            ),
            Suspect::new(
                "Nvidia Driver",
                "nvwgf2umx.dll",
                "Clean reinstall the graphics driver.",
            ),
            Suspect::new(
                "Nvidia Flex",
                "flexrelease_x64.dll",
                "Disable weapon debris in the game settings.",
            ),
            Suspect::new(
                "Audio Driver",
                "xaudio2_7.dll",
                "Check audio device drivers and sound mods.",
            ),
            Suspect::new(
                "Havok Physics",
                "hkbbehaviorgraph",
                "Check animation and behavior mods.",
            ),
        ])
    }

    pub fn suspects(&self) -> &[Suspect] {
        &self.suspects
    }
}

#[async_trait]
impl Analyzer for CallStackSuspectAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        20
    }

    async fn analyze(
        &self,
        log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        let frames: Vec<String> = log
            .call_stack
            .iter()
            .map(|frame| frame.to_ascii_lowercase())
            .collect();

        let mut outcome = AnalysisOutcome::success(Self::NAME)
            .with_data("frames", frames.len().to_string());
        for suspect in &self.suspects {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            let hits = frames
                .iter()
                .filter(|frame| frame.contains(&suspect.fragment))
                .count();
            if hits > 0 {
                outcome = outcome.with_report_line(format!(
                    "{} found in call stack ({hits}x). {}",
                    suspect.name, suspect.advice
                ));
            }
        }
        Ok(outcome)
    }
}
