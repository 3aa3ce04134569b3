use log::{debug, error, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;
use web_sys::{Document, Element, Window};

use bus::{create_bus, Bus, Receiver};
use error::{LabError, LabResult};
use exercise::{resolve_fragment, Exercise, HttpFetcher, ShaderExerciseManager};
use graphics::WebGlBackend;
use gui::{GuiBinder, GuiCallbacks, GuiMsg};
use library::LibraryTable;
use nav::{AppMsg, Navigation};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");
const CANVAS_ID: &str = "canvas";
const GUI_ID: &str = "gui";
const INFO_ID: &str = "exercise-info";
const DEPLOY_ROOT: &str = "deploy";

mod bus;
mod error;
mod exercise;
mod graphics;
mod gui;
mod library;
mod nav;
mod preprocessor;
mod template;
mod uid;
mod uniform;

type Manager = ShaderExerciseManager<WebGlBackend>;

#[wasm_bindgen]
pub struct ShaderLabClient {
    exercises: Vec<Exercise>,
    manager: Rc<RefCell<Manager>>,
    fetcher: Rc<HttpFetcher>,
    gui: GuiBinder,
    gui_bus: Bus<GuiMsg>,
    gui_rx: Receiver<GuiMsg>,
    app_bus: Bus<AppMsg>,
    app_rx: Receiver<AppMsg>,
    nav: Navigation,
    info: Option<Element>,
    rng: StdRng,
    last_frame: Option<f64>,
}

#[wasm_bindgen]
impl ShaderLabClient {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<ShaderLabClient, JsValue> {
        let window: Window = web_sys::window().ok_or_else(|| LabError::missing_val("window"))?;
        let document: Document = window.document().ok_or_else(|| LabError::missing_val("document"))?;
        let exercises = exercise::builtin_exercises()?;
        info!("{} exercises in manifest", exercises.len());

        let fetcher = Rc::new(HttpFetcher::new(format!("{}/{}", window.location().origin()?, DEPLOY_ROOT)));
        let backend = WebGlBackend::new(&window, &document, CANVAS_ID, fetcher.clone())?;
        backend.canvas().fit()?;
        let manager = Rc::new(RefCell::new(ShaderExerciseManager::new(backend)?));

        let gui_container = document.get_element_by_id(GUI_ID).ok_or_else(|| LabError::missing_val(GUI_ID))?;
        let gui_bus = create_bus();
        let app_bus = create_bus();
        let nav = Navigation::new(&window, &document, &exercises, &app_bus.new_sender())?;

        let mut client = ShaderLabClient {
            gui: GuiBinder::new(&document, &gui_container),
            gui_rx: gui_bus.new_receiver(),
            gui_bus,
            app_rx: app_bus.new_receiver(),
            app_bus,
            info: document.get_element_by_id(INFO_ID),
            exercises,
            manager,
            fetcher,
            nav,
            rng: StdRng::from_entropy(),
            last_frame: None,
        };

        let query = client.nav.current_query().unwrap_or_else(|e| {
            warn!("Could not read query: {}", e);
            None
        });
        let initial = nav::select_initial(&client.exercises, query.as_deref()).cloned();
        match initial {
            Some(exercise) => client.switch_to(&exercise),
            None => warn!("Manifest has no exercises"),
        }
        Ok(client)
    }

    /// Advances one frame. `now_ms` is the animation-frame timestamp.
    pub fn update(&mut self, now_ms: f64) -> Result<(), JsValue> {
        let dt = match self.last_frame {
            Some(last) => ((now_ms - last) / 1000.).max(0.) as f32,
            None => 0.,
        };
        self.last_frame = Some(now_ms);

        let resized = self.manager.borrow().backend().canvas().fit()?;
        if let Some((width, height)) = resized {
            self.manager.borrow_mut().resize(width, height);
        }

        for msg in self.app_rx.read() {
            self.handle_app_msg(msg.as_ref())?;
        }
        for msg in self.gui_rx.read() {
            self.handle_gui_msg(msg.as_ref());
        }
        self.manager.borrow_mut().update(dt);
        Ok(())
    }

    pub fn render(&self) {
        self.manager.borrow().render();
    }
}

impl ShaderLabClient {
    fn handle_app_msg(&mut self, msg: &AppMsg) -> LabResult<()> {
        match msg {
            AppMsg::Select { id, push } => {
                let exercise = match nav::find_exercise(&self.exercises, id) {
                    Some(exercise) => exercise.clone(),
                    None => {
                        warn!("{}", LabError::UnknownExercise(id.clone()));
                        return Ok(());
                    },
                };
                if let Some(param) = push {
                    self.nav.push_history(param, id)?;
                }
                self.switch_to(&exercise);
            },
            AppMsg::Restore { query } => {
                if let Some(exercise) = nav::select_initial(&self.exercises, query.as_deref()).cloned() {
                    self.switch_to(&exercise);
                }
            },
            AppMsg::Loaded { id } => self.bind_current(id)?,
            AppMsg::Failed { id } => {
                let manager = self.manager.borrow();
                if let Some(current) = manager.current() {
                    debug!("{} failed, keeping {}", id, current.exercise.id);
                    self.nav.show(&current.exercise.id);
                }
            },
        }
        Ok(())
    }

    fn handle_gui_msg(&mut self, msg: &GuiMsg) {
        match msg {
            GuiMsg::Edit { name, edit } => {
                self.manager.borrow_mut().apply_edit(name, edit);
            },
            GuiMsg::Reset => {
                self.manager.borrow_mut().reset();
                self.refresh_gui();
            },
            GuiMsg::Randomize => {
                self.manager.borrow_mut().randomize(&mut self.rng);
                self.refresh_gui();
            },
        }
    }

    fn refresh_gui(&self) {
        if let Some(current) = self.manager.borrow().current() {
            self.gui.update_values(&current.uniforms);
        }
    }

    /// Starts loading `exercise`; the previous one keeps rendering until the new program is installed.
    fn switch_to(&mut self, exercise: &Exercise) {
        self.nav.show(&exercise.id);
        let ticket = self.manager.borrow_mut().begin_load();
        let manager = self.manager.clone();
        let fetcher = self.fetcher.clone();
        let sender = self.app_bus.new_sender();
        let exercise = exercise.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let installed = match resolve_fragment(&exercise, fetcher.as_ref()).await {
                Ok(fragment) => manager.borrow_mut().install(ticket, &exercise, &fragment).map(|loaded| loaded.is_some()),
                Err(e) => {
                    manager.borrow_mut().abandon(ticket);
                    Err(e)
                },
            };
            match installed {
                Ok(true) => sender.send(AppMsg::Loaded { id: exercise.id.clone() }),
                Ok(false) => (),
                Err(e) => {
                    error!("Failed to load exercise {}: {}", exercise.id, e);
                    sender.send(AppMsg::Failed { id: exercise.id.clone() });
                },
            }
        });
    }

    fn bind_current(&mut self, id: &str) -> LabResult<()> {
        let manager = self.manager.borrow();
        let current = match manager.current() {
            Some(current) if current.exercise.id == id => current,
            _ => {
                debug!("{} is no longer current, skipping panel", id);
                return Ok(());
            },
        };
        let callbacks = GuiCallbacks {
            sender: self.gui_bus.new_sender(),
            with_reset: true,
            with_randomize: true,
        };
        self.gui.bind_exercise(&current.exercise, &current.uniforms, &callbacks)?;
        if let Some(info) = &self.info {
            info.set_text_content(Some(current.exercise.summary()));
        }
        Ok(())
    }
}

#[wasm_bindgen]
pub fn shaderlab_init() {
    let level = if cfg!(feature = "localhost") { log::Level::Trace } else { log::Level::Info };
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level).is_ok() {
        info!("Git version: {}", GIT_VERSION);
        debug!("Shader libraries: {:?}", LibraryTable::builtin().names());
    }
}
