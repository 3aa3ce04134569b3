//! Uniform control panel.
//!
//! `plan` decides which widget each uniform gets and how values convert between the
//! uniform cell and the widget; `control` builds the widgets. Widgets never touch the
//! uniforms directly: they post `GuiMsg`s that the client drains once per frame.

mod control;
mod plan;

pub use control::Listener;
use control::{create, Control, ControlButton};
use plan::{display_value, plan_controls};

use crate::{bus::Sender, error::LabResult, exercise::Exercise, uniform::{UniformEdit, UniformSet}};
use web_sys::{Document, Element, HtmlElement};

#[derive(Clone, Debug, PartialEq)]
pub enum GuiMsg {
    Edit { name: String, edit: UniformEdit },
    Reset,
    Randomize,
}

pub struct GuiCallbacks {
    pub sender: Sender<GuiMsg>,
    pub with_reset: bool,
    pub with_randomize: bool,
}

struct Panel {
    root: HtmlElement,
    controls: Vec<Control>,
    _buttons: Vec<ControlButton>,
}

impl Drop for Panel {
    fn drop(&mut self) {
        self.root.remove();
    }
}

pub struct GuiBinder {
    document: Document,
    container: Element,
    panel: Option<Panel>,
}

impl GuiBinder {
    pub fn new(document: &Document, container: &Element) -> Self {
        Self {
            document: document.clone(),
            container: container.clone(),
            panel: None,
        }
    }

    /// Replaces the whole panel with controls for `exercise`.
    pub fn bind_exercise(&mut self, exercise: &Exercise, uniforms: &UniformSet, callbacks: &GuiCallbacks) -> LabResult<()> {
        self.destroy();
        let root: HtmlElement = create(&self.document, "div")?;
        root.set_class_name("gui-panel");
        self.container.append_child(&root)?;

        let mut controls = Vec::new();
        for spec in plan_controls(exercise) {
            let control = Control::new(&self.document, &root, spec, &callbacks.sender)?;
            if let Some(shown) = uniforms.get(&control.spec().name).and_then(|v| display_value(&control.spec().kind, v)) {
                control.set_display(&shown);
            }
            controls.push(control);
        }

        let mut buttons = Vec::new();
        if callbacks.with_reset {
            buttons.push(ControlButton::new(&self.document, &root, "Reset", &callbacks.sender, || GuiMsg::Reset)?);
        }
        if callbacks.with_randomize {
            buttons.push(ControlButton::new(&self.document, &root, "Randomize", &callbacks.sender, || GuiMsg::Randomize)?);
        }
        log::debug!("Bound {} controls for {}", controls.len(), exercise.id);
        self.panel = Some(Panel { root, controls, _buttons: buttons });
        Ok(())
    }

    /// Pushes current uniform values back into the widgets, after a reset or randomize.
    pub fn update_values(&self, uniforms: &UniformSet) {
        let panel = match &self.panel {
            Some(panel) => panel,
            None => return,
        };
        for control in panel.controls.iter() {
            let spec = control.spec();
            match uniforms.get(&spec.name).and_then(|v| display_value(&spec.kind, v)) {
                Some(shown) => control.set_display(&shown),
                None => log::warn!("No displayable value for {}", spec.name),
            }
        }
    }

    pub fn destroy(&mut self) {
        self.panel = None;
    }
}
