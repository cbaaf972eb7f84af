//! Audio playback
//!
//! Loaded clips play through `HtmlAudioElement`. A cue whose file never
//! loaded falls back to a procedural Web Audio voice. Playback failures
//! (autoplay policy, decode errors) are logged and swallowed.

use std::collections::HashMap;

use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioContext, GainNode, HtmlAudioElement, OscillatorNode, OscillatorType};

use crate::assets::SoundCue;
use crate::settings::Settings;
use crate::ui::AudioRequest;

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    clips: HashMap<SoundCue, HtmlAudioElement>,
    sfx_volume: f32,
    music_volume: f32,
    muted: bool,
}

impl AudioManager {
    pub fn new(settings: &Settings) -> Self {
        // Fails outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - procedural sounds disabled");
        }
        Self {
            ctx,
            clips: HashMap::new(),
            sfx_volume: settings.effective_sfx_volume(),
            music_volume: settings.effective_music_volume(),
            muted: false,
        }
    }

    /// Use a loaded file for `cue`
    pub fn register_clip(&mut self, cue: SoundCue, clip: HtmlAudioElement) {
        clip.set_loop(cue.looping());
        self.clips.insert(cue, clip);
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx
            && ctx.state() == web_sys::AudioContextState::Suspended
        {
            let _ = ctx.resume();
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.stop_music();
        }
    }

    pub fn handle(&mut self, request: AudioRequest) {
        match request {
            AudioRequest::Play(cue) => self.play(cue),
            AudioRequest::StartMusic => self.start_music(),
            AudioRequest::StopMusic => self.stop_music(),
        }
    }

    /// Play a one-shot cue
    pub fn play(&self, cue: SoundCue) {
        if self.muted || self.sfx_volume <= 0.0 {
            return;
        }
        match self.clips.get(&cue) {
            Some(clip) => {
                clip.set_current_time(0.0);
                clip.set_volume(self.sfx_volume as f64);
                play_clip(clip, cue);
            }
            None => self.play_voice(cue, self.sfx_volume),
        }
    }

    pub fn start_music(&self) {
        if self.muted || self.music_volume <= 0.0 {
            return;
        }
        let Some(music) = self.clips.get(&SoundCue::BackgroundMusic) else {
            log::debug!("No background music loaded");
            return;
        };
        music.set_current_time(0.0);
        music.set_volume(self.music_volume as f64);
        play_clip(music, SoundCue::BackgroundMusic);
    }

    pub fn stop_music(&self) {
        if let Some(music) = self.clips.get(&SoundCue::BackgroundMusic) {
            if let Err(e) = music.pause() {
                log::warn!("Could not pause music: {e:?}");
            }
            music.set_current_time(0.0);
        }
    }

    // === Procedural voices ===

    fn play_voice(&self, cue: SoundCue, vol: f32) {
        let Some(ctx) = &self.ctx else { return };
        self.resume();

        match cue {
            SoundCue::Flap => self.play_flap(ctx, vol),
            SoundCue::Dunk => self.play_dunk(ctx, vol),
            SoundCue::Perfect => self.play_perfect(ctx, vol),
            SoundCue::Crumble => self.play_crumble(ctx, vol),
            SoundCue::Powerup => self.play_powerup(ctx, vol),
            SoundCue::Fire => self.play_fire(ctx, vol),
            SoundCue::GameOver => self.play_game_over(ctx, vol),
            SoundCue::BackgroundMusic => {}
        }
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Short rising whoosh
    fn play_flap(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 220.0, OscillatorType::Triangle) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.25, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.12)
            .ok();
        osc.frequency().set_value_at_time(220.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(520.0, t + 0.1)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.15).ok();
    }

    /// Plop into the milk
    fn play_dunk(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 900.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.35, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.18)
                .ok();
            osc.frequency().set_value_at_time(900.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(250.0, t + 0.15)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.2).ok();
        }

        if let Some((osc, gain)) = self.create_osc(ctx, 70.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.3, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.1)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.12).ok();
        }
    }

    /// Rising arpeggio for a high-multiplier pickup
    fn play_perfect(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [500.0, 600.0, 700.0, 800.0, 1000.0].iter().enumerate() {
            let delay = i as f64 * 0.06;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Triangle) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.22, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.2)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.25).ok();
            }
        }
    }

    /// Crunchy hit when a life is lost
    fn play_crumble(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 120.0, OscillatorType::Sawtooth) {
            gain.gain().set_value_at_time(vol * 0.35, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.25)
                .ok();
            osc.frequency().set_value_at_time(120.0, t).ok();
            osc.frequency().set_value_at_time(900.0, t + 0.02).ok();
            osc.frequency().set_value_at_time(150.0, t + 0.05).ok();
            osc.frequency().set_value_at_time(700.0, t + 0.08).ok();
            osc.frequency().set_value_at_time(90.0, t + 0.12).ok();
            osc.frequency().set_value_at_time(400.0, t + 0.16).ok();
            osc.frequency().set_value_at_time(60.0, t + 0.2).ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.28).ok();
        }

        if let Some((osc, gain)) = self.create_osc(ctx, 80.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.45, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.2)
                .ok();
            osc.frequency().set_value_at_time(80.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(40.0, t + 0.2)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.25).ok();
        }
    }

    /// Triumphant chord
    fn play_powerup(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [400.0, 500.0, 600.0, 800.0].iter().enumerate() {
            let delay = i as f64 * 0.08;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Triangle) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.28, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.35)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.4).ok();
            }
        }
    }

    /// Roaring whoosh for fire mode
    fn play_fire(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 100.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(0.01, t).ok();
        gain.gain()
            .linear_ramp_to_value_at_time(vol * 0.4, t + 0.1)
            .ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.5)
            .ok();
        osc.frequency().set_value_at_time(100.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(400.0, t + 0.4)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.55).ok();
    }

    /// Sad descending notes
    fn play_game_over(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [400.0, 350.0, 300.0, 200.0].iter().enumerate() {
            let delay = i as f64 * 0.2;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Sine) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.3, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.4).ok();
            }
        }
    }
}

/// Start playback; a rejected play promise is logged, never raised
fn play_clip(clip: &HtmlAudioElement, cue: SoundCue) {
    match clip.play() {
        Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                log::warn!("{cue:?} playback rejected: {e:?}");
            }
        }),
        Err(e) => log::warn!("{cue:?} playback failed: {e:?}"),
    }
}
