use crate::{bus::Sender, error::{LabError, LabResult}, exercise::Exercise, gui::Listener};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlOptionElement, HtmlSelectElement, Url, UrlSearchParams, Window};

pub const EXERCISE_PARAM: &str = "exercise";
pub const DEMO_PARAM: &str = "exo";

const SELECTOR_ID: &str = "exercise-selector";
const NAV_BUTTONS: &str = "#nav button[data-demo]";
const DEMO_ATTRIBUTE: &str = "data-demo";
const ACTIVE_CLASS: &str = "active";

#[derive(Clone, Debug, PartialEq)]
pub enum AppMsg {
    /// Switch to `id`, recording it in the history under `push` when set.
    Select { id: String, push: Option<&'static str> },
    /// History moved; reload whatever the query now names.
    Restore { query: Option<String> },
    /// A load finished and `id` is now current.
    Loaded { id: String },
    /// Loading `id` failed; whatever was current stays.
    Failed { id: String },
}

pub fn find_exercise<'a>(exercises: &'a [Exercise], id: &str) -> Option<&'a Exercise> {
    exercises.iter().find(|e| e.id == id)
}

/// The queried exercise when it exists, else the first one flagged `selected`, else the first.
pub fn select_initial<'a>(exercises: &'a [Exercise], query: Option<&str>) -> Option<&'a Exercise> {
    if let Some(id) = query {
        match find_exercise(exercises, id) {
            Some(exercise) => return Some(exercise),
            None => log::warn!("Unknown exercise in query: {}", id),
        }
    }
    exercises.iter().find(|e| e.selected).or_else(|| exercises.first())
}

pub fn query_id(search: &str) -> LabResult<Option<String>> {
    let params = UrlSearchParams::new_with_str(search)?;
    Ok(params.get(EXERCISE_PARAM).or_else(|| params.get(DEMO_PARAM)).filter(|id| !id.is_empty()))
}

/// Exercise selector, demo buttons and browser history.
pub struct Navigation {
    window: Window,
    selector: Option<HtmlSelectElement>,
    buttons: Vec<Element>,
    _listeners: Vec<Listener>,
}

impl Navigation {
    pub fn new(window: &Window, document: &Document, exercises: &[Exercise], sender: &Sender<AppMsg>) -> LabResult<Self> {
        let mut listeners = Vec::new();

        let selector = match document.get_element_by_id(SELECTOR_ID) {
            Some(element) => Some(element
                .dyn_into::<HtmlSelectElement>()
                .map_err(|_| LabError::missing_val(format!("{} is not a select", SELECTOR_ID)))?),
            None => {
                log::debug!("No #{} on the page", SELECTOR_ID);
                None
            },
        };
        if let Some(select) = &selector {
            for exercise in exercises {
                let option = HtmlOptionElement::new_with_text_and_value(&exercise.name, &exercise.id)?;
                select.append_child(&option)?;
            }
            let (tx, source) = (sender.clone(), select.clone());
            listeners.push(Listener::new(select, "change", move |_| {
                tx.send(AppMsg::Select { id: source.value(), push: Some(EXERCISE_PARAM) });
            })?);
        }

        let mut buttons = Vec::new();
        let nodes = document.query_selector_all(NAV_BUTTONS)?;
        for i in 0..nodes.length() {
            let button = match nodes.item(i).and_then(|node| node.dyn_into::<Element>().ok()) {
                Some(button) => button,
                None => continue,
            };
            let (tx, source) = (sender.clone(), button.clone());
            listeners.push(Listener::new(&button, "click", move |_| {
                if let Some(id) = source.get_attribute(DEMO_ATTRIBUTE) {
                    tx.send(AppMsg::Select { id, push: Some(DEMO_PARAM) });
                }
            })?);
            buttons.push(button);
        }

        let (tx, win) = (sender.clone(), window.clone());
        listeners.push(Listener::new(window, "popstate", move |_| {
            let query = win.location().search().ok().and_then(|search| query_id(&search).ok().flatten());
            tx.send(AppMsg::Restore { query });
        })?);

        Ok(Self {
            window: window.clone(),
            selector,
            buttons,
            _listeners: listeners,
        })
    }

    pub fn current_query(&self) -> LabResult<Option<String>> {
        query_id(&self.window.location().search()?)
    }

    pub fn push_history(&self, param: &str, id: &str) -> LabResult<()> {
        let url = Url::new(&self.window.location().href()?)?;
        let params = url.search_params();
        for stale in [EXERCISE_PARAM, DEMO_PARAM].iter() {
            params.delete(stale);
        }
        params.set(param, id);
        self.window.history()?.push_state_with_url(&JsValue::from_str(id), "", Some(&url.href()))?;
        Ok(())
    }

    /// Reflects `id` in the selector and the active demo button.
    pub fn show(&self, id: &str) {
        if let Some(select) = &self.selector {
            select.set_value(id);
        }
        for button in self.buttons.iter() {
            let active = button.get_attribute(DEMO_ATTRIBUTE).as_deref() == Some(id);
            if let Err(e) = button.class_list().toggle_with_force(ACTIVE_CLASS, active) {
                log::warn!("Could not toggle nav button: {:?}", e);
            }
        }
    }
}
