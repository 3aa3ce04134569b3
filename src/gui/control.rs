use crate::{bus::Sender, error::{LabError, LabResult}};
use super::{GuiMsg, plan::{self, ControlKind, ControlSpec, DisplayValue}};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement, HtmlOptionElement, HtmlSelectElement};

/// An event listener that detaches itself when dropped.
pub struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn new<T, F>(target: &T, event: &'static str, handler: F) -> LabResult<Self>
    where
        T: AsRef<EventTarget>,
        F: FnMut(Event) + 'static,
    {
        let handler: Box<dyn FnMut(Event)> = Box::new(handler);
        let callback = Closure::wrap(handler);
        let target = target.as_ref().clone();
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self { target, event, callback })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(e) = self.target.remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref()) {
            log::warn!("Failed to detach {} listener: {:?}", self.event, e);
        }
    }
}

pub fn create<T: JsCast>(document: &Document, tag: &str) -> LabResult<T> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|_| LabError::missing_val(format!("<{}> element", tag)))
}

enum Inputs {
    Slider { input: HtmlInputElement, readout: HtmlElement },
    Color(HtmlInputElement),
    Pair([(HtmlInputElement, HtmlElement); 2]),
    Checkbox(HtmlInputElement),
    Dropdown(HtmlSelectElement),
}

/// The DOM widget bound to one uniform.
pub struct Control {
    spec: ControlSpec,
    div: HtmlElement,
    inputs: Inputs,
    _listeners: Vec<Listener>,
}

impl Control {
    pub fn new(document: &Document, parent: &Element, spec: ControlSpec, sender: &Sender<GuiMsg>) -> LabResult<Self> {
        let div: HtmlElement = create(document, "div")?;
        div.set_class_name("control");
        let mut listeners = Vec::new();
        let inputs = match &spec.kind {
            ControlKind::Slider { min, max, step } => {
                let caption = label(document, &spec.label)?;
                div.append_child(&caption)?;
                let (input, readout) = slider(document, &div, *min, *max, *step)?;
                let (name, tx, shown) = (spec.name.clone(), sender.clone(), readout.clone());
                let kind = spec.kind.clone();
                let source = input.clone();
                listeners.push(Listener::new(&input, "input", move |_| {
                    if let Some(v) = plan::parse_number(&source.value()) {
                        shown.set_text_content(Some(&source.value()));
                        send_display(&tx, &name, &kind, DisplayValue::Number(v));
                    }
                })?);
                Inputs::Slider { input, readout }
            },
            ControlKind::Color => {
                let caption = label(document, &spec.label)?;
                div.append_child(&caption)?;
                let input: HtmlInputElement = create(document, "input")?;
                input.set_type("color");
                div.append_child(&input)?;
                let (name, tx, source) = (spec.name.clone(), sender.clone(), input.clone());
                listeners.push(Listener::new(&input, "input", move |_| {
                    match plan::hex_to_rgb(&source.value()) {
                        Some(rgb) => send_display(&tx, &name, &ControlKind::Color, DisplayValue::Rgb(rgb)),
                        None => log::warn!("Unreadable colour {}", source.value()),
                    }
                })?);
                Inputs::Color(input)
            },
            ControlKind::Pair { min, max, step } => {
                let folder: HtmlElement = create(document, "div")?;
                folder.set_class_name("folder");
                let title: HtmlElement = create(document, "div")?;
                title.set_class_name("folder-title");
                title.set_text_content(Some(&spec.label));
                folder.append_child(&title)?;
                div.append_child(&folder)?;
                let mut pair = Vec::with_capacity(2);
                for (index, axis) in ["X", "Y"].iter().enumerate() {
                    let caption = label(document, axis)?;
                    folder.append_child(&caption)?;
                    let (input, readout) = slider(document, &folder, min[index], max[index], *step)?;
                    let (name, tx, shown, source) = (spec.name.clone(), sender.clone(), readout.clone(), input.clone());
                    listeners.push(Listener::new(&input, "input", move |_| {
                        if let Some(v) = plan::parse_number(&source.value()) {
                            shown.set_text_content(Some(&source.value()));
                            tx.send(GuiMsg::Edit { name: name.clone(), edit: plan::component_edit(index, v) });
                        }
                    })?);
                    pair.push((input, readout));
                }
                let y = pair.pop().ok_or_else(|| LabError::missing_val("Y slider"))?;
                let x = pair.pop().ok_or_else(|| LabError::missing_val("X slider"))?;
                Inputs::Pair([x, y])
            },
            ControlKind::Checkbox => {
                let input: HtmlInputElement = create(document, "input")?;
                input.set_type("checkbox");
                div.append_child(&input)?;
                let caption = label(document, &spec.label)?;
                div.append_child(&caption)?;
                let (name, tx, source) = (spec.name.clone(), sender.clone(), input.clone());
                listeners.push(Listener::new(&input, "change", move |_| {
                    send_display(&tx, &name, &ControlKind::Checkbox, DisplayValue::Flag(source.checked()));
                })?);
                Inputs::Checkbox(input)
            },
            ControlKind::Dropdown { options } => {
                let caption = label(document, &spec.label)?;
                div.append_child(&caption)?;
                let select: HtmlSelectElement = create(document, "select")?;
                for (text, value) in options.iter() {
                    let option = HtmlOptionElement::new_with_text_and_value(text, &plan::format_choice(*value))?;
                    select.append_child(&option)?;
                }
                div.append_child(&select)?;
                let (name, tx, source) = (spec.name.clone(), sender.clone(), select.clone());
                let kind = spec.kind.clone();
                listeners.push(Listener::new(&select, "change", move |_| {
                    if let Some(v) = plan::parse_number(&source.value()) {
                        send_display(&tx, &name, &kind, DisplayValue::Choice(v));
                    }
                })?);
                Inputs::Dropdown(select)
            },
        };
        parent.append_child(&div)?;
        Ok(Self { spec, div, inputs, _listeners: listeners })
    }

    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    /// Shows a value without emitting an edit.
    pub fn set_display(&self, shown: &DisplayValue) {
        match (&self.inputs, shown) {
            (Inputs::Slider { input, readout }, DisplayValue::Number(v)) => {
                input.set_value(&v.to_string());
                readout.set_text_content(Some(&input.value()));
            },
            (Inputs::Color(input), DisplayValue::Rgb(rgb)) => input.set_value(&plan::rgb_to_hex(*rgb)),
            (Inputs::Pair(pair), DisplayValue::Pair(v)) => {
                for ((input, readout), c) in pair.iter().zip(v.iter()) {
                    input.set_value(&c.to_string());
                    readout.set_text_content(Some(&input.value()));
                }
            },
            (Inputs::Checkbox(input), DisplayValue::Flag(on)) => input.set_checked(*on),
            (Inputs::Dropdown(select), DisplayValue::Choice(v)) => select.set_value(&plan::format_choice(*v)),
            _ => log::warn!("Control {} cannot show {:?}", self.spec.name, shown),
        }
    }
}

impl Drop for Control {
    fn drop(&mut self) {
        self.div.remove();
    }
}

/// A plain action button posting a fixed message.
pub struct ControlButton {
    button: HtmlElement,
    _listener: Listener,
}

impl ControlButton {
    pub fn new(document: &Document, parent: &Element, text: &str, sender: &Sender<GuiMsg>, msg: fn() -> GuiMsg) -> LabResult<Self> {
        let button: HtmlElement = create(document, "button")?;
        button.set_text_content(Some(text));
        let tx = sender.clone();
        let listener = Listener::new(&button, "click", move |_| tx.send(msg()))?;
        parent.append_child(&button)?;
        Ok(Self { button, _listener: listener })
    }
}

impl Drop for ControlButton {
    fn drop(&mut self) {
        self.button.remove();
    }
}

fn label(document: &Document, text: &str) -> LabResult<Element> {
    let label = document.create_element("label")?;
    label.set_text_content(Some(text));
    Ok(label)
}

fn slider(document: &Document, parent: &HtmlElement, min: f32, max: f32, step: f32) -> LabResult<(HtmlInputElement, HtmlElement)> {
    let input: HtmlInputElement = create(document, "input")?;
    input.set_type("range");
    input.set_min(&min.to_string());
    input.set_max(&max.to_string());
    input.set_step(&step.to_string());
    let readout: HtmlElement = create(document, "span")?;
    readout.set_class_name("readout");
    parent.append_child(&input)?;
    parent.append_child(&readout)?;
    Ok((input, readout))
}

fn send_display(sender: &Sender<GuiMsg>, name: &str, kind: &ControlKind, shown: DisplayValue) {
    match plan::edit_from_display(kind, &shown) {
        Some(edit) => sender.send(GuiMsg::Edit { name: name.to_string(), edit }),
        None => log::warn!("No edit for {} from {:?}", name, shown),
    }
}
