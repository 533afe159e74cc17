//! Water Quest entry point
//!
//! Handles platform-specific initialization and wires the DOM presentation
//! to the round engine. The engine never touches the DOM; this layer drains
//! its events each frame and mirrors them into the page.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

    use water_quest::audio::{AudioManager, SoundEffect};
    use water_quest::consts::*;
    use water_quest::round::{RoundEngine, RoundEvent, RoundPhase, TokenKind};
    use water_quest::{BestScore, Difficulty, Settings, Theme};

    /// App instance holding the engine and presentation state
    struct App {
        engine: RoundEngine,
        best: BestScore,
        settings: Settings,
        audio: AudioManager,
        /// Grid cells by slot index
        cells: Vec<Element>,
        /// Live token as the presentation knows it: (id, slot)
        live_token: Option<(u32, usize)>,
        last_time: f64,
    }

    impl App {
        fn document(&self) -> Document {
            web_sys::window().unwrap().document().unwrap()
        }

        /// Run the engine forward and mirror its events into the DOM
        fn update(&mut self, time: f64) {
            let delta_ms = if self.last_time > 0.0 {
                (time - self.last_time).max(0.0) as u64
            } else {
                0
            };
            self.last_time = time;

            self.engine.advance(delta_ms);
            let events = self.engine.drain_events();
            for ev in &events {
                self.apply_event(ev);
            }
        }

        fn apply_event(&mut self, ev: &RoundEvent) {
            let document = self.document();
            match *ev {
                RoundEvent::CountdownStep { label } => {
                    if let Some(el) = document.get_element_by_id("countdown") {
                        el.set_text_content(Some(label));
                        let _ = el.class_list().add_1("show");
                    }
                }
                RoundEvent::RoundStarted => {
                    if let Some(el) = document.get_element_by_id("countdown") {
                        el.set_text_content(Some(""));
                        let _ = el.class_list().remove_1("show");
                    }
                    if let Some(el) = document.get_element_by_id("confetti") {
                        let _ = el.class_list().remove_1("burst");
                    }
                    set_text(&document, "achievements", "Tap clean, avoid dirty.");
                }
                RoundEvent::TokenSpawned { id, kind, slot } => {
                    self.wipe_tokens();
                    let css = match kind {
                        TokenKind::Clean => "clean",
                        TokenKind::Dirty => "pollutant",
                    };
                    if let Some(cell) = self.cells.get(slot) {
                        cell.set_inner_html(&format!(
                            "<div class=\"water-can-wrapper\">\
                             <div class=\"water-can {css}\" role=\"button\" tabindex=\"0\"></div>\
                             </div>"
                        ));
                    }
                    self.live_token = Some((id, slot));
                }
                RoundEvent::TokenHit { kind, .. } => {
                    match kind {
                        TokenKind::Clean => {
                            set_text(&document, "achievements", "+1 clean can");
                            self.audio.play(SoundEffect::Collect);
                        }
                        TokenKind::Dirty => {
                            set_text(&document, "achievements", "dirty can: -3 \u{2022} life -1");
                            self.audio.play(SoundEffect::Dirty);
                        }
                    }
                    self.clear_live_token();
                }
                RoundEvent::TokenMissed { score_delta } => {
                    set_text(
                        &document,
                        "achievements",
                        &format!("missed clean: {score_delta}"),
                    );
                    self.audio.play(SoundEffect::Dirty);
                    if let Some((_, slot)) = self.live_token {
                        if let Some(cell) = self.cells.get(slot) {
                            let _ = cell.class_list().add_1("flash");
                            cell.set_inner_html("");
                        }
                    }
                    self.live_token = None;
                }
                RoundEvent::MilestoneReached { message, .. } => {
                    set_text(&document, "milestone", message);
                }
                RoundEvent::HudChanged {
                    score,
                    lives,
                    streak,
                    time_left,
                } => {
                    set_text(&document, "score", &score.to_string());
                    set_text(&document, "lives", &lives.to_string());
                    set_text(&document, "streak", &streak.to_string());
                    set_text(&document, "timer", &time_left.to_string());
                    if let Some(el) = document.get_element_by_id("timeProgress") {
                        if let Some(el) = el.dyn_ref::<HtmlElement>() {
                            let p = time_left as f64 / ROUND_TIME as f64;
                            let _ = el.style().set_property("--p", &format!("{p:.3}"));
                        }
                    }
                }
                RoundEvent::RoundEnded {
                    win,
                    final_score,
                    message,
                    new_best,
                } => {
                    self.wipe_tokens();
                    self.live_token = None;
                    let prefix = if win { "WIN: " } else { "TRY AGAIN: " };
                    set_text(&document, "achievements", &format!("{prefix}{message}"));

                    if new_best {
                        self.best.update(final_score);
                        self.best.save();
                        set_text(&document, "best", &final_score.to_string());
                        set_text(&document, "milestone", "New best score!");
                    }

                    self.audio.play(SoundEffect::GameOver);
                    if win {
                        self.audio.play(SoundEffect::Win);
                        if !self.settings.reduced_motion {
                            if let Some(el) = document.get_element_by_id("confetti") {
                                let _ = el.class_list().add_1("burst");
                            }
                        }
                    }
                    set_start_enabled(&document, true);
                }
            }
        }

        fn wipe_tokens(&self) {
            for cell in &self.cells {
                cell.set_inner_html("");
                cell.set_class_name("grid-cell");
            }
        }

        fn clear_live_token(&mut self) {
            if let Some((_, slot)) = self.live_token.take() {
                if let Some(cell) = self.cells.get(slot) {
                    cell.set_inner_html("");
                }
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Water Quest starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let settings = Settings::load();
        let best = BestScore::load();

        let seed = js_sys::Date::now() as u64;
        let mut engine = RoundEngine::new(seed, best.value);
        engine.set_difficulty(settings.difficulty);
        log::info!("Engine initialized with seed: {}", seed);

        let mut audio = AudioManager::new();
        audio.set_muted(settings.muted);

        let cells = build_grid(&document);

        // Static HUD values
        set_text(&document, "goal", &GOAL.to_string());
        set_text(&document, "best", &best.value.to_string());
        set_text(&document, "score", "0");
        set_text(&document, "lives", &START_LIVES.to_string());
        set_text(&document, "streak", "0");
        set_text(&document, "timer", &ROUND_TIME.to_string());

        apply_theme(&document, settings.theme);
        apply_reduced_motion(&document, settings.reduced_motion);
        sync_controls(&document, &settings);

        let app = Rc::new(RefCell::new(App {
            engine,
            best,
            settings,
            audio,
            cells,
            live_token: None,
            last_time: 0.0,
        }));

        setup_grid_clicks(&app);
        setup_controls(&app);

        request_animation_frame(app);

        log::info!("Water Quest running!");
    }

    /// Build the 3x3 grid of cells
    fn build_grid(document: &Document) -> Vec<Element> {
        let grid = document.get_element_by_id("grid").expect("no grid");
        grid.set_inner_html("");
        let mut cells = Vec::with_capacity(GRID_SLOTS);
        for _ in 0..GRID_SLOTS {
            let cell = document.create_element("div").expect("create cell");
            cell.set_class_name("grid-cell");
            let _ = grid.append_child(&cell);
            cells.push(cell);
        }
        cells
    }

    /// One click handler per cell; the engine only ever sees token ids
    fn setup_grid_clicks(app: &Rc<RefCell<App>>) {
        for idx in 0..GRID_SLOTS {
            let cell = app.borrow().cells[idx].clone();
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                if let Some((id, slot)) = a.live_token {
                    if slot == idx {
                        a.engine.resolve_tap(id);
                    }
                }
            });
            let _ = cell.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_controls(app: &Rc<RefCell<App>>) {
        let document = web_sys::window().unwrap().document().unwrap();

        // Start button
        if let Some(btn) = document.get_element_by_id("start-game") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                a.audio.play(SoundEffect::Click);
                a.engine.start();
                let document = a.document();
                if a.engine.state().phase == RoundPhase::Counting {
                    set_text(&document, "milestone", "");
                    set_text(&document, "achievements", "Round starting\u{2026}");
                    set_start_enabled(&document, false);
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Reset button
        if let Some(btn) = document.get_element_by_id("reset-game") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                a.audio.play(SoundEffect::Click);
                a.engine.reset();
                a.live_token = None;
                a.wipe_tokens();
                let document = a.document();
                if let Some(el) = document.get_element_by_id("countdown") {
                    el.set_text_content(Some(""));
                    let _ = el.class_list().remove_1("show");
                }
                set_text(&document, "milestone", "");
                set_text(&document, "achievements", "Reset. Press Start to play.");
                set_start_enabled(&document, true);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Difficulty select - applies from the next round
        if let Some(sel) = document.get_element_by_id("difficultySelect") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                let Some(sel) = event
                    .target()
                    .and_then(|t| t.dyn_into::<HtmlSelectElement>().ok())
                else {
                    return;
                };
                let level = Difficulty::from_str(&sel.value()).unwrap_or_default();
                let mut a = app.borrow_mut();
                a.engine.set_difficulty(level);
                a.settings.difficulty = level;
                a.settings.save();
                set_text(
                    &a.document(),
                    "achievements",
                    &format!("Difficulty set to {}.", level.as_str()),
                );
            });
            let _ = sel.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Theme select
        if let Some(sel) = document.get_element_by_id("themeSelect") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                let Some(sel) = event
                    .target()
                    .and_then(|t| t.dyn_into::<HtmlSelectElement>().ok())
                else {
                    return;
                };
                let theme = Theme::from_css_class(&sel.value()).unwrap_or_default();
                let mut a = app.borrow_mut();
                apply_theme(&a.document(), theme);
                a.settings.theme = theme;
                a.settings.save();
            });
            let _ = sel.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Reduced motion checkbox
        if let Some(input) = document.get_element_by_id("reducedMotion") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                let Some(input) = event
                    .target()
                    .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
                else {
                    return;
                };
                let mut a = app.borrow_mut();
                apply_reduced_motion(&a.document(), input.checked());
                a.settings.reduced_motion = input.checked();
                a.settings.save();
            });
            let _ =
                input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mute toggle
        if let Some(input) = document.get_element_by_id("muteToggle") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                let Some(input) = event
                    .target()
                    .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
                else {
                    return;
                };
                let mut a = app.borrow_mut();
                a.audio.set_muted(input.checked());
                a.settings.muted = input.checked();
                a.settings.save();
                let msg = if input.checked() { "Sound off." } else { "Sound on." };
                set_text(&a.document(), "achievements", msg);
            });
            let _ =
                input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Reflect loaded settings back into the controls
    fn sync_controls(document: &Document, settings: &Settings) {
        if let Some(sel) = document
            .get_element_by_id("difficultySelect")
            .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok())
        {
            sel.set_value(settings.difficulty.as_str());
        }
        if let Some(sel) = document
            .get_element_by_id("themeSelect")
            .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok())
        {
            sel.set_value(settings.theme.css_class());
        }
        if let Some(input) = document
            .get_element_by_id("reducedMotion")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            input.set_checked(settings.reduced_motion);
        }
        if let Some(input) = document
            .get_element_by_id("muteToggle")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            input.set_checked(settings.muted);
        }
    }

    fn apply_theme(document: &Document, theme: Theme) {
        if let Some(body) = document.body() {
            for t in [Theme::Sky, Theme::Desert, Theme::Ocean, Theme::Neon] {
                let _ = body.class_list().remove_1(t.css_class());
            }
            let _ = body.class_list().add_1(theme.css_class());
        }
    }

    fn apply_reduced_motion(document: &Document, on: bool) {
        if let Some(el) = document.document_element() {
            let _ = el.class_list().toggle_with_force("rm", on);
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_start_enabled(document: &Document, enabled: bool) {
        if let Some(btn) = document
            .get_element_by_id("start-game")
            .and_then(|el| el.dyn_into::<web_sys::HtmlButtonElement>().ok())
        {
            btn.set_disabled(!enabled);
        }
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            frame(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame(app: Rc<RefCell<App>>, time: f64) {
        app.borrow_mut().update(time);
        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::time::{SystemTime, UNIX_EPOCH};

    env_logger::init();
    log::info!("Water Quest (native) starting...");
    log::info!("Native mode is headless - run with `trunk serve` for the web version");

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    demo_round(seed);
}

/// Play one unattended round, tapping every clean token, and log the result
#[cfg(not(target_arch = "wasm32"))]
fn demo_round(seed: u64) {
    use water_quest::round::{RoundEngine, RoundEvent, RoundPhase, TokenKind};

    let mut engine = RoundEngine::new(seed, 0);
    log::info!("Demo round with seed: {}", seed);
    engine.start();

    while engine.state().phase != RoundPhase::Ended {
        engine.advance(50);
        for ev in engine.drain_events() {
            match ev {
                RoundEvent::CountdownStep { label } => log::info!("countdown: {label}"),
                RoundEvent::TokenSpawned {
                    id,
                    kind: TokenKind::Clean,
                    ..
                } => engine.resolve_tap(id),
                RoundEvent::MilestoneReached { message, .. } => log::info!("{message}"),
                RoundEvent::RoundEnded {
                    win,
                    final_score,
                    message,
                    ..
                } => {
                    log::info!("round over: win={win} score={final_score} - {message}");
                }
                _ => {}
            }
        }
    }
}
