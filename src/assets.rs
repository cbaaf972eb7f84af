//! Logical assets and load tracking
//!
//! Every image and sound is addressed by key and carries an ordered list of
//! fallback paths. [`AssetLoader`] walks those lists as the host reports
//! load results and counts each asset as processed exactly once, whether it
//! ended up loaded or exhausted every path. [`AssetCache`] is the read-only
//! view of what loaded, handed to drawing and audio.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

/// Give up on a resource that neither loads nor errors within this time
pub const ASSET_TIMEOUT_MS: i32 = 3000;

/// Images the game can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKey {
    Cookie,
    Whisk,
    Background,
    Logo,
}

impl ImageKey {
    pub const ALL: [ImageKey; 4] = [
        ImageKey::Cookie,
        ImageKey::Whisk,
        ImageKey::Background,
        ImageKey::Logo,
    ];

    /// Candidate paths, tried in order
    pub fn paths(self) -> &'static [&'static str] {
        match self {
            ImageKey::Cookie => &["images/cookie.png", "Images/choco chip (1).png"],
            ImageKey::Whisk => &["images/whisk.png", "Images/whisk.png"],
            ImageKey::Background => &["images/background.png", "images/background.jpg"],
            ImageKey::Logo => &["images/logo.png", "Images/Logo Mark Color (3).png"],
        }
    }
}

/// Sounds the game can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Flap,
    Dunk,
    Perfect,
    Crumble,
    Powerup,
    Fire,
    GameOver,
    BackgroundMusic,
}

impl SoundCue {
    pub const ALL: [SoundCue; 8] = [
        SoundCue::Flap,
        SoundCue::Dunk,
        SoundCue::Perfect,
        SoundCue::Crumble,
        SoundCue::Powerup,
        SoundCue::Fire,
        SoundCue::GameOver,
        SoundCue::BackgroundMusic,
    ];

    /// Candidate paths, tried in order
    pub fn paths(self) -> &'static [&'static str] {
        match self {
            SoundCue::Flap => &["sounds/flap.mp3", "sounds/flap.wav"],
            SoundCue::Dunk => &["sounds/dunk.mp3", "sounds/dunk.wav"],
            SoundCue::Perfect => &["sounds/perfect.mp3", "sounds/perfect.wav"],
            SoundCue::Crumble => &["sounds/crumble.mp3", "sounds/crumble.wav"],
            SoundCue::Powerup => &["sounds/powerup.mp3", "sounds/powerup.wav"],
            SoundCue::Fire => &["sounds/fire.mp3", "sounds/fire.wav"],
            SoundCue::GameOver => &["sounds/gameover.mp3", "sounds/rejected.mp3"],
            SoundCue::BackgroundMusic => &["sounds/bgMusic.mp3", "sounds/bg-music.mp3"],
        }
    }

    /// Plays on repeat until stopped
    pub fn looping(self) -> bool {
        matches!(self, SoundCue::BackgroundMusic)
    }
}

/// Any loadable asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetId {
    Image(ImageKey),
    Sound(SoundCue),
}

impl AssetId {
    pub fn paths(self) -> &'static [&'static str] {
        match self {
            AssetId::Image(key) => key.paths(),
            AssetId::Sound(cue) => cue.paths(),
        }
    }

    /// Every image and sound the game uses
    pub fn manifest() -> Vec<AssetId> {
        ImageKey::ALL
            .into_iter()
            .map(AssetId::Image)
            .chain(SoundCue::ALL.into_iter().map(AssetId::Sound))
            .collect()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Image(key) => write!(f, "image {key:?}"),
            AssetId::Sound(cue) => write!(f, "sound {cue:?}"),
        }
    }
}

/// Asset resolution failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssetError {
    #[error("{asset} failed to load from {path}")]
    PathFailed { asset: AssetId, path: &'static str },
    #[error("{asset} could not be loaded from any of {tried} paths")]
    Exhausted { asset: AssetId, tried: usize },
}

/// Where one asset stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Waiting on the path at this index
    Pending(usize),
    Loaded(&'static str),
    /// Every path failed or timed out
    Failed,
}

impl LoadStatus {
    pub fn is_processed(self) -> bool {
        !matches!(self, LoadStatus::Pending(_))
    }
}

/// What the host should do after a failed path
#[derive(Debug, Clone, PartialEq)]
pub enum Retry {
    /// Try this path next
    Next(&'static str),
    /// Nothing left; the asset is counted and the game falls back
    GiveUp(AssetError),
}

/// Tracks fallback progress and the loaded/total counter
#[derive(Debug, Clone)]
pub struct AssetLoader {
    order: Vec<AssetId>,
    status: HashMap<AssetId, LoadStatus>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(AssetId::manifest())
    }
}

impl AssetLoader {
    pub fn new(assets: Vec<AssetId>) -> Self {
        let status = assets
            .iter()
            .map(|id| {
                let initial = if id.paths().is_empty() {
                    LoadStatus::Failed
                } else {
                    LoadStatus::Pending(0)
                };
                (*id, initial)
            })
            .collect();
        Self {
            order: assets,
            status,
        }
    }

    /// Every asset with its first path, for kicking off loads
    pub fn initial_requests(&self) -> Vec<(AssetId, &'static str)> {
        self.order
            .iter()
            .filter_map(|id| self.current_path(*id).map(|path| (*id, path)))
            .collect()
    }

    /// Path currently being tried, if still pending
    pub fn current_path(&self, id: AssetId) -> Option<&'static str> {
        match self.status.get(&id) {
            Some(LoadStatus::Pending(index)) => id.paths().get(*index).copied(),
            _ => None,
        }
    }

    pub fn status(&self, id: AssetId) -> Option<LoadStatus> {
        self.status.get(&id).copied()
    }

    /// Record a successful load. Returns false for duplicate or late signals.
    pub fn mark_loaded(&mut self, id: AssetId) -> bool {
        let Some(path) = self.current_path(id) else {
            return false;
        };
        self.status.insert(id, LoadStatus::Loaded(path));
        log::debug!("Loaded {id} from {path}");
        true
    }

    /// Record a failed path and pick the next one.
    ///
    /// Returns `None` for duplicate or late signals.
    pub fn mark_failed(&mut self, id: AssetId) -> Option<Retry> {
        let Some(LoadStatus::Pending(index)) = self.status.get(&id).copied() else {
            return None;
        };
        let paths = id.paths();
        log::warn!(
            "{}",
            AssetError::PathFailed {
                asset: id,
                path: paths.get(index).copied().unwrap_or_default(),
            }
        );

        match paths.get(index + 1) {
            Some(next) => {
                self.status.insert(id, LoadStatus::Pending(index + 1));
                Some(Retry::Next(next))
            }
            None => {
                self.status.insert(id, LoadStatus::Failed);
                Some(Retry::GiveUp(AssetError::Exhausted {
                    asset: id,
                    tried: paths.len(),
                }))
            }
        }
    }

    /// Stop waiting on an asset that never answered. Returns false if it already settled.
    pub fn mark_timed_out(&mut self, id: AssetId) -> bool {
        if !matches!(self.status.get(&id), Some(LoadStatus::Pending(_))) {
            return false;
        }
        log::warn!("{id} timed out, continuing without it");
        self.status.insert(id, LoadStatus::Failed);
        true
    }

    /// (processed, total)
    pub fn progress(&self) -> (usize, usize) {
        let processed = self.status.values().filter(|s| s.is_processed()).count();
        (processed, self.order.len())
    }

    pub fn fraction(&self) -> f32 {
        let (done, total) = self.progress();
        if total == 0 {
            1.0
        } else {
            done as f32 / total as f32
        }
    }

    pub fn is_complete(&self) -> bool {
        let (done, total) = self.progress();
        done == total
    }

    /// Snapshot of what loaded successfully
    pub fn cache(&self) -> AssetCache {
        let mut cache = AssetCache::default();
        for (id, status) in &self.status {
            if let LoadStatus::Loaded(_) = status {
                match id {
                    AssetId::Image(key) => {
                        cache.images.insert(*key);
                    }
                    AssetId::Sound(cue) => {
                        cache.sounds.insert(*cue);
                    }
                }
            }
        }
        cache
    }
}

/// Read-only registry of loaded assets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetCache {
    images: HashSet<ImageKey>,
    sounds: HashSet<SoundCue>,
}

impl AssetCache {
    /// Cache claiming every asset loaded
    pub fn all_loaded() -> Self {
        Self {
            images: ImageKey::ALL.into_iter().collect(),
            sounds: SoundCue::ALL.into_iter().collect(),
        }
    }

    pub fn has_image(&self, key: ImageKey) -> bool {
        self.images.contains(&key)
    }

    pub fn has_sound(&self, cue: SoundCue) -> bool {
        self.sounds.contains(&cue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOKIE: AssetId = AssetId::Image(ImageKey::Cookie);
    const FLAP: AssetId = AssetId::Sound(SoundCue::Flap);

    #[test]
    fn test_manifest_covers_everything() {
        let loader = AssetLoader::default();
        assert_eq!(loader.progress(), (0, 12));
        assert_eq!(loader.initial_requests().len(), 12);
    }

    #[test]
    fn test_fallback_then_success() {
        let mut loader = AssetLoader::new(vec![COOKIE]);
        assert_eq!(loader.current_path(COOKIE), Some("images/cookie.png"));

        let retry = loader.mark_failed(COOKIE);
        assert_eq!(retry, Some(Retry::Next("Images/choco chip (1).png")));
        assert!(!loader.is_complete());

        assert!(loader.mark_loaded(COOKIE));
        assert!(loader.is_complete());
        assert_eq!(
            loader.status(COOKIE),
            Some(LoadStatus::Loaded("Images/choco chip (1).png"))
        );
        assert!(loader.cache().has_image(ImageKey::Cookie));
    }

    #[test]
    fn test_exhausted_still_counts() {
        let mut loader = AssetLoader::new(vec![FLAP, COOKIE]);
        loader.mark_failed(FLAP);
        let last = loader.mark_failed(FLAP);
        assert!(matches!(
            last,
            Some(Retry::GiveUp(AssetError::Exhausted { tried: 2, .. }))
        ));
        assert_eq!(loader.progress(), (1, 2));
        assert!(!loader.cache().has_sound(SoundCue::Flap));
    }

    #[test]
    fn test_each_asset_counted_once() {
        let mut loader = AssetLoader::new(vec![FLAP]);
        assert!(loader.mark_loaded(FLAP));
        // Late error and timeout after success are ignored
        assert_eq!(loader.mark_failed(FLAP), None);
        assert!(!loader.mark_timed_out(FLAP));
        assert!(!loader.mark_loaded(FLAP));
        assert_eq!(loader.progress(), (1, 1));
    }

    #[test]
    fn test_timeout_then_late_load_ignored() {
        let mut loader = AssetLoader::new(vec![FLAP]);
        assert!(loader.mark_timed_out(FLAP));
        assert!(!loader.mark_loaded(FLAP));
        assert_eq!(loader.status(FLAP), Some(LoadStatus::Failed));
        assert_eq!(loader.progress(), (1, 1));
    }

    #[test]
    fn test_signals_for_untracked_assets_ignored() {
        let mut loader = AssetLoader::new(vec![FLAP]);
        assert!(!loader.mark_loaded(COOKIE));
        assert_eq!(loader.mark_failed(COOKIE), None);
        assert!(!loader.mark_timed_out(COOKIE));
        assert_eq!(loader.status(COOKIE), None);
        assert_eq!(loader.progress(), (0, 1));
    }

    #[test]
    fn test_empty_loader_is_complete() {
        let loader = AssetLoader::new(Vec::new());
        assert!(loader.is_complete());
        assert_eq!(loader.fraction(), 1.0);
    }

    #[test]
    fn test_only_music_loops() {
        let looping: Vec<_> = SoundCue::ALL.into_iter().filter(|c| c.looping()).collect();
        assert_eq!(looping, vec![SoundCue::BackgroundMusic]);
    }
}
