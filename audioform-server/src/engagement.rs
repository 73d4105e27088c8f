//! Audio engagement tracking
//!
//! Turns clip start/end events into the engagement metrics stored with each
//! submission:
//! - a played flag per clip, latched on the first natural end
//! - a completion timestamp per clip, set on that first latch
//! - total listen time, summed over every completed play cycle of both clips
//!
//! Only a natural end credits time. A clip stopped by the wizard (step change,
//! replay, submission) contributes nothing for that cycle.

use audioform_common::time::round_millis_to_secs;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::audio::{Clip, ClipPlayback, PlaybackCommand};

/// Measures one listen cycle at a time
///
/// Only one clip plays at a time, so a single timer is enough. Starting it
/// again overwrites any unclosed start.
#[derive(Debug, Clone, Default)]
pub struct ListenTimer {
    running: Option<(Clip, DateTime<Utc>)>,
}

impl ListenTimer {
    pub fn start(&mut self, clip: Clip, now: DateTime<Utc>) {
        self.running = Some((clip, now));
    }

    /// Close the cycle for `clip`, returning its length
    ///
    /// Returns `None` (and leaves the timer untouched) when nothing is running
    /// for that clip.
    pub fn stop(&mut self, clip: Clip, now: DateTime<Utc>) -> Option<chrono::Duration> {
        match self.running {
            Some((running, started)) if running == clip => {
                self.running = None;
                Some(now - started)
            }
            _ => None,
        }
    }

    /// Drop any running cycle without measuring it
    pub fn reset(&mut self) {
        self.running = None;
    }

    pub fn running_clip(&self) -> Option<Clip> {
        self.running.map(|(clip, _)| clip)
    }
}

/// Owned handle for one clip's media element
#[derive(Debug, Clone)]
pub struct ClipHandle {
    clip: Clip,
    playback: ClipPlayback,
    played: bool,
    completed_at: Option<DateTime<Utc>>,
}

impl ClipHandle {
    fn new(clip: Clip) -> Self {
        Self {
            clip,
            playback: ClipPlayback::Idle,
            played: false,
            completed_at: None,
        }
    }

    pub fn clip(&self) -> Clip {
        self.clip
    }

    pub fn playback(&self) -> ClipPlayback {
        self.playback
    }

    pub fn played(&self) -> bool {
        self.played
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Latch the played flag; the completion time is only set by the first latch
    fn mark_completed(&mut self, now: DateTime<Utc>) -> bool {
        if self.played {
            return false;
        }
        self.played = true;
        self.completed_at = Some(now);
        true
    }
}

/// Engagement metrics as stored and reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementMetrics {
    pub intro_audio_played: bool,
    pub employment_audio_played: bool,
    pub intro_audio_completion_time: Option<DateTime<Utc>>,
    pub employment_audio_completion_time: Option<DateTime<Utc>>,
    pub total_audio_listen_time_seconds: i64,
}

/// Engagement state for one session, owning both clip handles
#[derive(Debug, Clone)]
pub struct AudioEngagement {
    intro: ClipHandle,
    employment: ClipHandle,
    timer: ListenTimer,
    total_listen_secs: i64,
}

impl Default for AudioEngagement {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngagement {
    pub fn new() -> Self {
        Self {
            intro: ClipHandle::new(Clip::Intro),
            employment: ClipHandle::new(Clip::Employment),
            timer: ListenTimer::default(),
            total_listen_secs: 0,
        }
    }

    pub fn handle(&self, clip: Clip) -> &ClipHandle {
        match clip {
            Clip::Intro => &self.intro,
            Clip::Employment => &self.employment,
        }
    }

    fn handle_mut(&mut self, clip: Clip) -> &mut ClipHandle {
        match clip {
            Clip::Intro => &mut self.intro,
            Clip::Employment => &mut self.employment,
        }
    }

    /// Ask the page to start `clip`
    pub fn request_play(&mut self, clip: Clip) -> PlaybackCommand {
        self.handle_mut(clip).playback = ClipPlayback::Starting;
        PlaybackCommand::play(clip)
    }

    /// Playback of `clip` actually started; opens a listen cycle
    pub fn on_audio_start(&mut self, clip: Clip, now: DateTime<Utc>) {
        self.handle_mut(clip).playback = ClipPlayback::Playing;
        self.timer.start(clip, now);
        debug!("Listen cycle started for {} clip", clip);
    }

    /// Playback of `clip` could not start
    pub fn on_play_failed(&mut self, clip: Clip) {
        self.handle_mut(clip).playback = ClipPlayback::Idle;
    }

    /// `clip` reached its natural end
    ///
    /// Returns the seconds credited, or `None` when no cycle was open for the
    /// clip (spurious or duplicate end event).
    pub fn on_audio_end(&mut self, clip: Clip, now: DateTime<Utc>) -> Option<i64> {
        let elapsed = self.timer.stop(clip, now)?;
        let secs = round_millis_to_secs(elapsed.num_milliseconds()).max(0);
        self.total_listen_secs += secs;

        let handle = self.handle_mut(clip);
        handle.playback = ClipPlayback::Idle;
        if handle.mark_completed(now) {
            debug!("{} clip completed for the first time", clip);
        }
        Some(secs)
    }

    /// Stop every clip without crediting the open cycle
    pub fn stop_all(&mut self) -> PlaybackCommand {
        self.timer.reset();
        self.intro.playback = ClipPlayback::Idle;
        self.employment.playback = ClipPlayback::Idle;
        PlaybackCommand::StopAll
    }

    pub fn total_listen_secs(&self) -> i64 {
        self.total_listen_secs
    }

    pub fn metrics(&self) -> EngagementMetrics {
        EngagementMetrics {
            intro_audio_played: self.intro.played,
            employment_audio_played: self.employment.played,
            intro_audio_completion_time: self.intro.completed_at,
            employment_audio_completion_time: self.employment.completed_at,
            total_audio_listen_time_seconds: self.total_listen_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    #[test]
    fn test_natural_end_credits_rounded_seconds() {
        let mut e = AudioEngagement::new();
        e.request_play(Clip::Intro);
        e.on_audio_start(Clip::Intro, t0());

        assert_eq!(e.on_audio_end(Clip::Intro, t0() + ms(12_600)), Some(13));
        assert_eq!(e.total_listen_secs(), 13);
        assert!(e.handle(Clip::Intro).played());
        assert_eq!(e.handle(Clip::Intro).completed_at(), Some(t0() + ms(12_600)));
        assert_eq!(e.handle(Clip::Intro).playback(), ClipPlayback::Idle);
    }

    #[test]
    fn test_replays_accumulate_but_latch_once() {
        let mut e = AudioEngagement::new();
        let durations = [12_400, 12_500, 3_000];
        let mut now = t0();
        for d in durations {
            e.on_audio_start(Clip::Intro, now);
            now = now + ms(d);
            e.on_audio_end(Clip::Intro, now);
            now = now + ms(1_000);
        }

        assert_eq!(e.total_listen_secs(), 12 + 13 + 3);
        // Completion time is the first completion, never the later ones
        assert_eq!(e.handle(Clip::Intro).completed_at(), Some(t0() + ms(12_400)));
    }

    #[test]
    fn test_stopped_clip_gets_no_credit() {
        let mut e = AudioEngagement::new();
        e.on_audio_start(Clip::Intro, t0());
        assert_eq!(e.stop_all(), PlaybackCommand::StopAll);

        // A late end event after the stop has no open cycle
        assert_eq!(e.on_audio_end(Clip::Intro, t0() + ms(5_000)), None);
        assert_eq!(e.total_listen_secs(), 0);
        assert!(!e.handle(Clip::Intro).played());
    }

    #[test]
    fn test_end_without_start_is_noop() {
        let mut e = AudioEngagement::new();
        assert_eq!(e.on_audio_end(Clip::Employment, t0()), None);
        assert_eq!(e.metrics().total_audio_listen_time_seconds, 0);
        assert!(!e.metrics().employment_audio_played);
    }

    #[test]
    fn test_duplicate_end_credits_once() {
        let mut e = AudioEngagement::new();
        e.on_audio_start(Clip::Employment, t0());
        assert_eq!(e.on_audio_end(Clip::Employment, t0() + ms(4_000)), Some(4));
        assert_eq!(e.on_audio_end(Clip::Employment, t0() + ms(4_100)), None);
        assert_eq!(e.total_listen_secs(), 4);
    }

    #[test]
    fn test_end_for_other_clip_is_noop() {
        let mut e = AudioEngagement::new();
        e.on_audio_start(Clip::Employment, t0());
        assert_eq!(e.on_audio_end(Clip::Intro, t0() + ms(4_000)), None);
        // Employment cycle is still open
        assert_eq!(e.on_audio_end(Clip::Employment, t0() + ms(6_000)), Some(6));
    }

    #[test]
    fn test_restart_overwrites_unclosed_start() {
        let mut e = AudioEngagement::new();
        e.on_audio_start(Clip::Intro, t0());
        e.on_audio_start(Clip::Intro, t0() + ms(10_000));
        e.on_audio_end(Clip::Intro, t0() + ms(15_000));
        assert_eq!(e.total_listen_secs(), 5);
    }

    #[test]
    fn test_accumulates_across_both_clips() {
        let mut e = AudioEngagement::new();
        e.on_audio_start(Clip::Intro, t0());
        e.on_audio_end(Clip::Intro, t0() + ms(20_000));
        e.on_audio_start(Clip::Employment, t0() + ms(30_000));
        e.on_audio_end(Clip::Employment, t0() + ms(38_000));

        let m = e.metrics();
        assert!(m.intro_audio_played);
        assert!(m.employment_audio_played);
        assert_eq!(m.total_audio_listen_time_seconds, 28);
    }

    #[test]
    fn test_play_failure_returns_handle_to_idle() {
        let mut e = AudioEngagement::new();
        e.request_play(Clip::Intro);
        assert_eq!(e.handle(Clip::Intro).playback(), ClipPlayback::Starting);
        e.on_play_failed(Clip::Intro);
        assert_eq!(e.handle(Clip::Intro).playback(), ClipPlayback::Idle);
    }

    #[test]
    fn test_listen_timer_reset() {
        let mut timer = ListenTimer::default();
        timer.start(Clip::Intro, t0());
        assert_eq!(timer.running_clip(), Some(Clip::Intro));
        timer.reset();
        assert_eq!(timer.running_clip(), None);
        assert_eq!(timer.stop(Clip::Intro, t0()), None);
    }
}
