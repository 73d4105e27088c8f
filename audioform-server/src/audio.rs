//! Audio clips and the playback commands sent to the browser
//!
//! The service never decodes audio. It serves two static clips and tells the
//! page which media element to start or stop; the page reports back when
//! playback actually started, failed to start, or ended naturally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two fixed pre-recorded prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clip {
    Intro,
    Employment,
}

impl Clip {
    pub const ALL: [Clip; 2] = [Clip::Intro, Clip::Employment];

    /// Logical name used in URLs and events
    pub fn name(self) -> &'static str {
        match self {
            Clip::Intro => "intro",
            Clip::Employment => "employment",
        }
    }

    /// URL the page loads the clip from
    pub fn asset_path(self) -> &'static str {
        match self {
            Clip::Intro => "/audio/intro.mp3",
            Clip::Employment => "/audio/employment.mp3",
        }
    }
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Clip {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intro" => Ok(Clip::Intro),
            "employment" => Ok(Clip::Employment),
            other => Err(format!("Unknown clip: {}", other)),
        }
    }
}

/// Instruction for the page's media elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaybackCommand {
    /// Rewind the clip to 0 and start it
    Play { clip: Clip, src: &'static str },
    /// Pause every clip and rewind to 0
    StopAll,
}

impl PlaybackCommand {
    pub fn play(clip: Clip) -> Self {
        PlaybackCommand::Play {
            clip,
            src: clip.asset_path(),
        }
    }
}

/// Where a clip's media element is in its playback cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipPlayback {
    /// Not playing
    Idle,
    /// `play()` issued, waiting for the page to confirm
    Starting,
    /// Page confirmed playback started
    Playing,
}
