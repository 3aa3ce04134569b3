use crate::error::{LabError, LabResult};
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlCanvasElement, Window, WebGlRenderingContext as GL};

pub const SIDEBAR_WIDTH: f64 = 360.;
pub const MOBILE_BREAKPOINT: f64 = 768.;
pub const MAX_PIXEL_RATIO: f64 = 2.;

/// CSS size and backing-store size of the canvas for a given window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasGeometry {
    pub css_width: f64,
    pub css_height: f64,
    pub width: u32,
    pub height: u32,
}

/// Desktop leaves room for the sidebar; narrow screens stack the canvas over half the height.
pub fn canvas_dimensions(window_width: f64, window_height: f64, pixel_ratio: f64) -> CanvasGeometry {
    let (css_width, css_height) = if window_width <= MOBILE_BREAKPOINT {
        (window_width, window_height * 0.5)
    } else {
        (window_width - SIDEBAR_WIDTH, window_height)
    };
    let css_width = css_width.max(1.);
    let css_height = css_height.max(1.);
    let ratio = if pixel_ratio > 0. { pixel_ratio.min(MAX_PIXEL_RATIO) } else { 1. };
    CanvasGeometry {
        css_width,
        css_height,
        width: ((css_width * ratio).floor() as u32).max(1),
        height: ((css_height * ratio).floor() as u32).max(1),
    }
}

pub struct Canvas {
    window: Window,
    canvas: HtmlCanvasElement,
    gl: GL,
}

impl Canvas {
    pub fn new(window: &Window, document: &Document, canvas_id: &str) -> LabResult<Self> {
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| LabError::missing_val(canvas_id))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| LabError::missing_val(format!("{} is not a canvas", canvas_id)))?;
        let gl: GL = canvas
            .get_context("webgl")?
            .ok_or_else(|| LabError::missing_val("webgl context"))?
            .dyn_into()
            .map_err(|_| LabError::missing_val("WebGlRenderingContext"))?;
        setup_gl_context(&gl);
        Ok(Self {
            window: window.clone(),
            canvas,
            gl,
        })
    }

    pub fn get_gl(&self) -> &GL {
        &self.gl
    }

    pub fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    /// Matches the canvas to the window. Returns the new backing size when it changed.
    pub fn fit(&self) -> LabResult<Option<(u32, u32)>> {
        let width = self.window.inner_width()?.as_f64().unwrap_or(0.);
        let height = self.window.inner_height()?.as_f64().unwrap_or(0.);
        let geometry = canvas_dimensions(width, height, self.window.device_pixel_ratio());
        if geometry.width == self.canvas.width() && geometry.height == self.canvas.height() {
            return Ok(None);
        }
        self.canvas.set_width(geometry.width);
        self.canvas.set_height(geometry.height);
        self.canvas.set_attribute(
            "style",
            &format!("width: {}px; height: {}px;", geometry.css_width, geometry.css_height))?;
        self.gl.viewport(0, 0, geometry.width as i32, geometry.height as i32);
        log::debug!("Canvas resized to {}x{}", geometry.width, geometry.height);
        Ok(Some((geometry.width, geometry.height)))
    }
}

fn setup_gl_context(gl: &GL) {
    log::debug!("Max Texture Size: {:?}", gl.get_parameter(GL::MAX_TEXTURE_SIZE).ok().and_then(|v| v.as_f64()));
    gl.disable(GL::DEPTH_TEST);
    gl.clear_color(0., 0., 0., 1.);
}
