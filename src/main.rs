//! Cookie Dunk entry point
//!
//! On wasm: loads assets, wires input to game actions and drives the frame
//! loop. Natively: runs a headless autopilot session and logs the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{
        Document, HtmlAudioElement, HtmlCanvasElement, HtmlImageElement, HtmlInputElement,
        KeyboardEvent, MouseEvent, TouchEvent,
    };

    use cookie_dunk::assets::{ASSET_TIMEOUT_MS, AssetCache, AssetId, AssetLoader, ImageKey, Retry, SoundCue};
    use cookie_dunk::audio::AudioManager;
    use cookie_dunk::consts::*;
    use cookie_dunk::leaderboard::{FirestoreClient, LeaderboardEntry, LocalLeaderboard, ScoreStore};
    use cookie_dunk::platform::web::{DomHud, WebCanvas, document, set_display};
    use cookie_dunk::platform::{FrameLoop, step_frame, wants_frames};
    use cookie_dunk::render::{RenderOptions, draw_frame};
    use cookie_dunk::sim::{Action, GamePhase, GameState, handle_action};
    use cookie_dunk::ui::{Hud, dispatch_events, report_leaderboard_error};
    use cookie_dunk::{QualityPreset, Settings, Tuning};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        canvas: WebCanvas,
        hud: DomHud,
        audio: AudioManager,
        assets: AssetCache,
        settings: Settings,
        options: RenderOptions,
        frames: FrameLoop,
        leaderboard: LocalLeaderboard,
        remote: Option<FirestoreClient>,
        /// Score of the run waiting for an email on the game-over panel
        unsubmitted: Option<u64>,
    }

    impl Game {
        /// Apply an input action. Returns true if the loop should run.
        fn apply(&mut self, action: Action) -> bool {
            self.audio.resume();
            let before = self.state.phase;
            handle_action(&mut self.state, action);
            let after = self.state.phase;
            self.flush_events();

            if before != after {
                self.hud.show_paused(after == GamePhase::Paused);
                if after == GamePhase::Playing && before != GamePhase::Paused {
                    self.hud.hide_panels();
                    self.unsubmitted = None;
                }
            }
            if !wants_frames(after) {
                self.cancel_frames();
                self.draw_still();
            }
            wants_frames(after)
        }

        /// Forward queued sim events. Returns the final score if the run ended.
        fn flush_events(&mut self) -> Option<u64> {
            let events = self.state.drain_events();
            let out = dispatch_events(&mut self.hud, events);
            for request in out.audio {
                self.audio.handle(request);
            }
            out.game_over
        }

        fn cancel_frames(&mut self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let (frame, retry) = self.frames.cancel();
            if let Some(handle) = frame
                && let Err(e) = window.cancel_animation_frame(handle)
            {
                log::warn!("cancelAnimationFrame failed: {e:?}");
            }
            if let Some(handle) = retry {
                window.clear_timeout_with_handle(handle);
            }
        }

        /// Draw one frame without advancing the simulation
        fn draw_still(&mut self) {
            if let Err(e) = draw_frame(&mut self.canvas, &self.state, &self.assets, self.options) {
                log::error!("Draw failed: {e}");
            }
        }

        fn resize(&mut self) {
            let (w, h) = self.canvas.fit_to_container();
            self.state.resize(w, h);
            if !wants_frames(self.state.phase) {
                self.draw_still();
            }
        }
    }

    // === Asset loading ===

    struct Loading {
        loader: AssetLoader,
        images: HashMap<ImageKey, HtmlImageElement>,
        sounds: HashMap<SoundCue, HtmlAudioElement>,
        done: Option<js_sys::Function>,
    }

    struct LoadedAssets {
        cache: AssetCache,
        images: HashMap<ImageKey, HtmlImageElement>,
        sounds: HashMap<SoundCue, HtmlAudioElement>,
    }

    async fn load_assets(document: &Document) -> LoadedAssets {
        let shared = Rc::new(RefCell::new(Loading {
            loader: AssetLoader::default(),
            images: HashMap::new(),
            sounds: HashMap::new(),
            done: None,
        }));

        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            shared.borrow_mut().done = Some(resolve);
        });

        let requests = shared.borrow().loader.initial_requests();
        for (id, path) in requests {
            start_load(&shared, id, path);
            schedule_timeout(&shared, id);
        }
        check_complete(&shared, document);

        if let Err(e) = JsFuture::from(promise).await {
            log::warn!("Asset loading ended early: {e:?}");
        }

        let mut loading = shared.borrow_mut();
        let cache = loading.loader.cache();
        let (done, total) = loading.loader.progress();
        log::info!("Assets processed: {done}/{total}");
        LoadedAssets {
            cache,
            images: std::mem::take(&mut loading.images),
            sounds: std::mem::take(&mut loading.sounds),
        }
    }

    fn start_load(shared: &Rc<RefCell<Loading>>, id: AssetId, path: &'static str) {
        match id {
            AssetId::Image(key) => {
                let Ok(image) = HtmlImageElement::new() else {
                    on_result(shared, id, path, false);
                    return;
                };
                let loaded = {
                    let shared = shared.clone();
                    let image = image.clone();
                    Closure::once(move || {
                        if on_result(&shared, id, path, true) {
                            shared.borrow_mut().images.insert(key, image);
                        }
                    })
                };
                let failed = {
                    let shared = shared.clone();
                    Closure::once(move || {
                        on_result(&shared, id, path, false);
                    })
                };
                image.set_onload(Some(loaded.as_ref().unchecked_ref()));
                image.set_onerror(Some(failed.as_ref().unchecked_ref()));
                loaded.forget();
                failed.forget();
                image.set_src(path);
            }
            AssetId::Sound(cue) => {
                let Ok(audio) = HtmlAudioElement::new_with_src(path) else {
                    on_result(shared, id, path, false);
                    return;
                };
                // canplaythrough can fire again after seeks
                let loaded = {
                    let shared = shared.clone();
                    let audio = audio.clone();
                    Closure::<dyn FnMut()>::new(move || {
                        if on_result(&shared, id, path, true) {
                            shared.borrow_mut().sounds.insert(cue, audio.clone());
                        }
                    })
                };
                let failed = {
                    let shared = shared.clone();
                    Closure::once(move || {
                        on_result(&shared, id, path, false);
                    })
                };
                let _ = audio.add_event_listener_with_callback(
                    "canplaythrough",
                    loaded.as_ref().unchecked_ref(),
                );
                audio.set_onerror(Some(failed.as_ref().unchecked_ref()));
                loaded.forget();
                failed.forget();
                audio.load();
            }
        }
    }

    /// Record one load outcome; returns true if this load is the one that counted
    fn on_result(shared: &Rc<RefCell<Loading>>, id: AssetId, path: &'static str, ok: bool) -> bool {
        let (accepted, next) = {
            let mut loading = shared.borrow_mut();
            // Late answer from a path we already moved past
            if loading.loader.current_path(id) != Some(path) {
                return false;
            }
            if ok {
                (loading.loader.mark_loaded(id), None)
            } else {
                match loading.loader.mark_failed(id) {
                    Some(Retry::Next(next)) => (false, Some(next)),
                    Some(Retry::GiveUp(err)) => {
                        log::warn!("{err}, using fallback");
                        (false, None)
                    }
                    None => (false, None),
                }
            }
        };

        if let Some(next) = next {
            start_load(shared, id, next);
        }
        if let Some(document) = document() {
            check_complete(shared, &document);
        }
        accepted
    }

    fn schedule_timeout(shared: &Rc<RefCell<Loading>>, id: AssetId) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = {
            let shared = shared.clone();
            Closure::once(move || {
                let timed_out = shared.borrow_mut().loader.mark_timed_out(id);
                if timed_out && let Some(document) = document() {
                    check_complete(&shared, &document);
                }
            })
        };
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            ASSET_TIMEOUT_MS,
        );
        closure.forget();
    }

    fn check_complete(shared: &Rc<RefCell<Loading>>, document: &Document) {
        let done = {
            let mut loading = shared.borrow_mut();
            let percent = (loading.loader.fraction() * 100.0).round() as u32;
            if let Some(el) = document.get_element_by_id("loading-progress") {
                el.set_text_content(Some(&format!("{percent}%")));
            }
            if loading.loader.is_complete() {
                loading.done.take()
            } else {
                None
            }
        };
        if let Some(resolve) = done {
            let _ = resolve.call0(&JsValue::NULL);
        }
    }

    // === Setup ===

    /// Tuning from an inline `<script id="tuning" type="application/json">`, if present
    fn page_tuning(document: &Document) -> Tuning {
        let Some(json) = document
            .get_element_by_id("tuning")
            .and_then(|el| el.text_content())
        else {
            return Tuning::default();
        };
        match Tuning::from_json(&json) {
            Ok(tuning) => {
                log::info!("Using page tuning");
                tuning
            }
            Err(e) => {
                log::warn!("Ignoring page tuning: {e}");
                Tuning::default()
            }
        }
    }

    /// `?quality=low|medium|high` overrides the stored preset
    fn url_quality(window: &web_sys::Window) -> Option<QualityPreset> {
        let search = window.location().search().ok()?;
        search
            .trim_start_matches('?')
            .split('&')
            .find_map(|pair| pair.strip_prefix("quality="))
            .and_then(QualityPreset::parse)
    }

    /// Shared board configured through canvas data attributes
    fn remote_leaderboard(canvas: &HtmlCanvasElement) -> Option<FirestoreClient> {
        let project_id = canvas.get_attribute("data-firebase-project")?;
        let api_key = canvas.get_attribute("data-firebase-key")?;
        Some(FirestoreClient { project_id, api_key })
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger already set: {e}").into());
        }

        log::info!("Cookie Dunk starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("game-canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let loaded = load_assets(&document).await;
        set_display(&document, "loading", "none");

        let mut web_canvas =
            WebCanvas::new(canvas.clone()).map_err(|e| JsValue::from_str(&e.to_string()))?;
        for (key, image) in loaded.images {
            web_canvas.register_image(key, image);
        }
        let (width, height) = web_canvas.fit_to_container();

        let mut settings = Settings::load();
        if let Some(preset) = url_quality(&window) {
            settings.apply_preset(preset);
            settings.save();
        }
        log::info!("Quality: {}", settings.quality.as_str());
        let mut audio = AudioManager::new(&settings);
        for (cue, clip) in loaded.sounds {
            audio.register_clip(cue, clip);
        }

        let seed = js_sys::Date::now() as u64;
        let mut state = GameState::new(seed, width, height, page_tuning(&document));
        state.particles.set_max_particles(settings.max_particles());
        log::info!("Game initialized with seed: {seed}");

        let game = Rc::new(RefCell::new(Game {
            state,
            canvas: web_canvas,
            hud: DomHud::new(document.clone()),
            audio,
            assets: loaded.cache,
            options: RenderOptions::from(&settings),
            settings,
            frames: FrameLoop::new(),
            leaderboard: LocalLeaderboard::load(),
            remote: remote_leaderboard(&canvas),
            unsubmitted: None,
        }));

        setup_input_handlers(&canvas, game.clone())?;
        setup_buttons(&document, game.clone());
        setup_score_form(&document, game.clone());
        setup_auto_pause(game.clone())?;
        setup_resize(game.clone())?;

        game.borrow_mut().draw_still();
        log::info!("Cookie Dunk ready");
        Ok(())
    }

    fn on_action(game: &Rc<RefCell<Game>>, action: Action) {
        let start = game.borrow_mut().apply(action);
        if start {
            request_animation_frame(game.clone());
        }
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        // Mouse click
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                on_action(&game, Action::Primary);
            });
            canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Touch
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                on_action(&game, Action::Primary);
            });
            canvas.add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Keyboard
        {
            let window = web_sys::window().ok_or("no window")?;
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                // Typing an email must not flap the cookie
                let typing = event
                    .target()
                    .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
                    .is_some();
                if typing {
                    return;
                }
                let phase = game.borrow().state.phase;
                let action = match event.code().as_str() {
                    "Space" => {
                        event.prevent_default();
                        Some(Action::Primary)
                    }
                    "Escape" | "KeyP" => match phase {
                        GamePhase::Playing => Some(Action::Pause),
                        GamePhase::Paused => Some(Action::Resume),
                        _ => None,
                    },
                    _ => None,
                };
                if let Some(action) = action {
                    on_action(&game, action);
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn on_click(document: &Document, id: &str, mut handler: impl FnMut() + 'static) {
        let Some(btn) = document.get_element_by_id(id) else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| handler());
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            on_click(document, "pause-btn", move || {
                let action = match game.borrow().state.phase {
                    GamePhase::Playing => Action::Pause,
                    GamePhase::Paused => Action::Resume,
                    _ => return,
                };
                on_action(&game, action);
            });
        }
        for id in ["replay-btn", "replay-btn-over"] {
            let game = game.clone();
            on_click(document, id, move || on_action(&game, Action::Restart));
        }
        {
            let game = game.clone();
            on_click(document, "leaderboard-btn", move || show_leaderboard(game.clone()));
        }
        let doc = document.clone();
        on_click(document, "close-leaderboard", move || {
            set_display(&doc, "leaderboard", "none");
        });
    }

    fn setup_score_form(document: &Document, game: Rc<RefCell<Game>>) {
        let Some(form) = document.get_element_by_id("score-form") else {
            return;
        };
        let document = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
            event.prevent_default();
            let email = document
                .get_element_by_id("email-input")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                .map(|input| input.value())
                .unwrap_or_default();
            submit_score(game.clone(), email.trim());
        });
        let _ = form.add_event_listener_with_callback("submit", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn submit_score(game: Rc<RefCell<Game>>, email: &str) {
        let mut g = game.borrow_mut();
        let Some(score) = g.unsubmitted else {
            g.hud.show_message("Score already submitted", MESSAGE_MS);
            return;
        };
        if !email.contains('@') {
            g.hud.show_message("Please enter a valid email", MESSAGE_MS * 2);
            return;
        }

        let entry = LeaderboardEntry::for_email(email, score, js_sys::Date::now());
        g.unsubmitted = None;
        let g = &mut *g;
        if let Err(e) = g.leaderboard.submit(entry.clone()) {
            report_leaderboard_error(&mut g.hud, "Error saving score", &e);
        }

        let Some(remote) = g.remote.clone() else {
            let top = g.leaderboard.top(LEADERBOARD_SIZE).unwrap_or_default();
            g.hud.show_leaderboard(&top);
            return;
        };
        let game = game.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = remote.submit(&entry).await;
            let mut g = game.borrow_mut();
            match result {
                Ok(()) => g.hud.show_message("Score submitted!", MESSAGE_MS * 2),
                Err(e) => report_leaderboard_error(&mut g.hud, "Error saving score", &e),
            }
            drop(g);
            show_leaderboard(game.clone());
        });
    }

    fn show_leaderboard(game: Rc<RefCell<Game>>) {
        let remote = game.borrow().remote.clone();
        let Some(remote) = remote else {
            let mut g = game.borrow_mut();
            let top = g.leaderboard.top(LEADERBOARD_SIZE).unwrap_or_default();
            g.hud.show_leaderboard(&top);
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            let result = remote.top(LEADERBOARD_SIZE).await;
            let mut g = game.borrow_mut();
            match result {
                Ok(entries) => g.hud.show_leaderboard(&entries),
                Err(e) => {
                    report_leaderboard_error(&mut g.hud, "Error loading leaderboard", &e);
                    let top = g.leaderboard.top(LEADERBOARD_SIZE).unwrap_or_default();
                    g.hud.show_leaderboard(&top);
                }
            }
        });
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden
                    && game.borrow().state.phase == GamePhase::Playing
                {
                    on_action(&game, Action::Pause);
                    log::info!("Auto-paused (tab hidden)");
                }
            });
            document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            )?;
            closure.forget();
        }

        // Window blur (click outside)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let (playing, mute) = {
                    let g = game.borrow();
                    (g.state.phase == GamePhase::Playing, g.settings.mute_on_blur)
                };
                if playing {
                    on_action(&game, Action::Pause);
                    log::info!("Auto-paused (window blur)");
                }
                if mute {
                    game.borrow_mut().audio.set_muted(true);
                }
            });
            window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Focus restores sound; the player resumes explicitly
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().audio.set_muted(false);
            });
            window.add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn setup_resize(game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            game.borrow_mut().resize();
        });
        window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    // === Frame loop ===

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        if !game.borrow().frames.can_request() {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = {
            let game = game.clone();
            Closure::once(move |time: f64| game_loop(game, time))
        };
        match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            Ok(handle) => game.borrow_mut().frames.requested(handle),
            Err(e) => log::error!("requestAnimationFrame failed: {e:?}"),
        }
        closure.forget();
    }

    enum FrameOutcome {
        Continue,
        Stop,
        GameOver(u64),
        Retry(i32),
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let outcome = {
            let mut guard = game.borrow_mut();
            let g = &mut *guard;
            let dt = g.frames.frame_started(time);
            match step_frame(&mut g.state, &mut g.canvas, &g.assets, g.options, dt) {
                Ok(()) => {
                    g.frames.frame_succeeded();
                    match g.flush_events() {
                        Some(score) => FrameOutcome::GameOver(score),
                        None if wants_frames(g.state.phase) => FrameOutcome::Continue,
                        None => FrameOutcome::Stop,
                    }
                }
                Err(e) => {
                    log::error!("Frame failed: {e}");
                    g.flush_events();
                    FrameOutcome::Retry(g.frames.frame_failed())
                }
            }
        };

        match outcome {
            FrameOutcome::Continue => request_animation_frame(game),
            FrameOutcome::Stop => game.borrow_mut().cancel_frames(),
            FrameOutcome::GameOver(score) => {
                let mut g = game.borrow_mut();
                g.cancel_frames();
                g.unsubmitted = Some(score);
                log::info!("Game over with score {score}");
            }
            FrameOutcome::Retry(delay) => schedule_retry(game, delay),
        }
    }

    fn schedule_retry(game: Rc<RefCell<Game>>, delay_ms: i32) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = {
            let game = game.clone();
            Closure::once(move || {
                game.borrow_mut().frames.retry_fired();
                if wants_frames(game.borrow().state.phase) {
                    request_animation_frame(game);
                }
            })
        };
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms,
        ) {
            Ok(handle) => game.borrow_mut().frames.retry_scheduled(handle),
            Err(e) => log::error!("Could not schedule frame retry: {e:?}"),
        }
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Cookie Dunk (native) starting...");
    log::info!("Native mode runs a headless autopilot session - serve the wasm build to play");

    let mut seed = 42u64;
    let mut max_frames = 60 * 60 * 5;
    let mut settings = cookie_dunk::Settings::load();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match (arg.as_str(), args.next()) {
            ("--seed", Some(v)) => seed = v.parse().unwrap_or(seed),
            ("--frames", Some(v)) => max_frames = v.parse().unwrap_or(max_frames),
            ("--quality", Some(v)) => match cookie_dunk::QualityPreset::parse(&v) {
                Some(preset) => settings = cookie_dunk::Settings::from_preset(preset),
                None => log::warn!("Unknown quality {v}"),
            },
            (other, _) => log::warn!("Ignoring argument {other}"),
        }
    }

    headless::run(seed, max_frames, &settings);
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use cookie_dunk::assets::AssetCache;
    use cookie_dunk::consts::{DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH, FRAME_MS, LEADERBOARD_SIZE};
    use cookie_dunk::leaderboard::{LeaderboardEntry, ScoreStore};
    use cookie_dunk::platform::step_frame;
    use cookie_dunk::render::{RecordingCanvas, RenderOptions};
    use cookie_dunk::sim::{Action, GameState, autopilot, handle_action};
    use cookie_dunk::ui::{Hud, LogHud, dispatch_events};
    use cookie_dunk::{LocalLeaderboard, Settings, Tuning};

    pub fn run(seed: u64, max_frames: u32, settings: &Settings) {
        log::info!("Quality: {}", settings.quality.as_str());
        let mut state = GameState::new(seed, DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT, Tuning::default());
        state.particles.set_max_particles(settings.max_particles());
        let mut canvas = RecordingCanvas::new(DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT);
        let assets = AssetCache::default();
        let options = RenderOptions::from(settings);
        let mut hud = LogHud;

        handle_action(&mut state, Action::Primary);

        let mut final_score = None;
        for _ in 0..max_frames {
            if let Some(action) = autopilot(&state) {
                handle_action(&mut state, action);
            }
            canvas.reset();
            if let Err(e) = step_frame(&mut state, &mut canvas, &assets, options, FRAME_MS) {
                log::error!("Frame failed: {e}");
                break;
            }
            let out = dispatch_events(&mut hud, state.drain_events());
            if let Some(score) = out.game_over {
                final_score = Some(score);
                break;
            }
        }

        let stats = &state.stats;
        log::info!(
            "Run finished after {:.1}s: score {}, milk {}, best streak {}, whisks passed {}, power-ups {}",
            stats.elapsed_secs,
            state.score,
            stats.collected,
            stats.highest_streak,
            stats.obstacles_passed,
            stats.powerups_collected,
        );

        let mut board = LocalLeaderboard::load();
        let score = final_score.unwrap_or(state.score);
        if let Err(e) = board.submit(LeaderboardEntry::for_email("auto.pilot@example.com", score, 0.0)) {
            log::warn!("Error saving score: {e}");
        }
        match board.top(LEADERBOARD_SIZE) {
            Ok(top) => hud.show_leaderboard(&top),
            Err(e) => log::warn!("Error loading leaderboard: {e}"),
        }
    }
}
