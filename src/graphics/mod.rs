use crate::{
    error::{LabError, LabResult},
    exercise::{HttpFetcher, ProgramBackend},
    uid::Uid,
    uniform::{UniformSet, UniformValue},
};
use js_sys::WebAssembly;
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use wasm_bindgen::JsCast;
use web_sys::{Document, Window, WebGlBuffer, WebGlProgram, WebGlRenderingContext as WebGL, WebGlTexture, WebGlUniformLocation};

mod canvas;
mod program;

use canvas::Canvas;
use program::build_program;

const POSITION_ATTRIBUTE: &str = "position";

// One triangle covering clip space; the rasterizer clips the overhang.
static FULLSCREEN_TRIANGLE: [f32; 6] = [
    -1., -1.,
    3., -1.,
    -1., 3.,
];

const PLACEHOLDER_PIXEL: [u8; 4] = [255, 255, 255, 255];

pub struct GlProgram {
    program: WebGlProgram,
    position: Option<u32>,
    locations: HashMap<String, WebGlUniformLocation>,
}

type TextureMap = Rc<RefCell<HashMap<Uid, WebGlTexture>>>;

/// WebGL1 implementation of the program backend, drawing one fullscreen triangle.
pub struct WebGlBackend {
    canvas: Canvas,
    triangle: WebGlBuffer,
    textures: TextureMap,
    fetcher: Rc<HttpFetcher>,
}

impl WebGlBackend {
    pub fn new(window: &Window, document: &Document, canvas_id: &str, fetcher: Rc<HttpFetcher>) -> LabResult<Self> {
        let canvas = Canvas::new(window, document, canvas_id)?;
        let triangle = upload_triangle(canvas.get_gl())?;
        Ok(Self {
            canvas,
            triangle,
            textures: Rc::new(RefCell::new(HashMap::new())),
            fetcher,
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }
}

fn upload_triangle(gl: &WebGL) -> LabResult<WebGlBuffer> {
    let memory_buffer = wasm_bindgen::memory()
        .dyn_into::<WebAssembly::Memory>()?
        .buffer();
    let location = FULLSCREEN_TRIANGLE.as_ptr() as u32 / 4;
    let vert_array = js_sys::Float32Array::new(&memory_buffer).subarray(
        location,
        location + FULLSCREEN_TRIANGLE.len() as u32);
    let buffer = gl.create_buffer().ok_or_else(|| LabError::missing_val("Failed to create buffer"))?;
    gl.bind_buffer(WebGL::ARRAY_BUFFER, Some(&buffer));
    gl.buffer_data_with_array_buffer_view(WebGL::ARRAY_BUFFER, &vert_array, WebGL::STATIC_DRAW);
    Ok(buffer)
}

fn set_texture_params(gl: &WebGL) {
    gl.tex_parameteri(WebGL::TEXTURE_2D, WebGL::TEXTURE_WRAP_S, WebGL::CLAMP_TO_EDGE as i32);
    gl.tex_parameteri(WebGL::TEXTURE_2D, WebGL::TEXTURE_WRAP_T, WebGL::CLAMP_TO_EDGE as i32);
    gl.tex_parameteri(WebGL::TEXTURE_2D, WebGL::TEXTURE_MIN_FILTER, WebGL::LINEAR as i32);
    gl.tex_parameteri(WebGL::TEXTURE_2D, WebGL::TEXTURE_MAG_FILTER, WebGL::LINEAR as i32);
}

fn write_pixels(gl: &WebGL, texture: &WebGlTexture, width: u32, height: u32, pixels: &[u8]) -> LabResult<()> {
    gl.bind_texture(WebGL::TEXTURE_2D, Some(texture));
    gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
        WebGL::TEXTURE_2D,
        0,
        WebGL::RGBA as i32,
        width as i32,
        height as i32,
        0,
        WebGL::RGBA,
        WebGL::UNSIGNED_BYTE,
        Some(pixels),
    )?;
    set_texture_params(gl);
    Ok(())
}

async fn fetch_image(fetcher: &HttpFetcher, url: &str) -> LabResult<(u32, u32, Vec<u8>)> {
    let bytes = fetcher.get(url).await?;
    let image = image::load_from_memory(&bytes)?.into_rgba8();
    let (width, height) = image.dimensions();
    Ok((width, height, image.into_raw()))
}

impl ProgramBackend for WebGlBackend {
    type Program = GlProgram;

    fn compile(&self, vertex: &str, fragment: &str, uniforms: &UniformSet) -> LabResult<GlProgram> {
        let gl = self.canvas.get_gl();
        let program = build_program(gl, vertex, fragment)?;
        let position = gl.get_attrib_location(&program, POSITION_ATTRIBUTE);
        let mut locations = HashMap::new();
        for (name, _) in uniforms.iter() {
            match gl.get_uniform_location(&program, name) {
                Some(location) => {
                    locations.insert(name.to_string(), location);
                },
                None => log::trace!("Uniform {} is not used by the shader", name),
            }
        }
        Ok(GlProgram {
            program,
            position: if position >= 0 { Some(position as u32) } else { None },
            locations,
        })
    }

    fn release(&self, program: GlProgram) {
        self.canvas.get_gl().delete_program(Some(&program.program));
    }

    fn create_texture(&self, url: &str) -> Uid {
        let id = Uid::new();
        let gl = self.canvas.get_gl();
        let texture = match gl.create_texture() {
            Some(texture) => texture,
            None => {
                log::warn!("Could not allocate texture for {}", url);
                return id;
            },
        };
        if let Err(e) = write_pixels(gl, &texture, 1, 1, &PLACEHOLDER_PIXEL) {
            log::warn!("Placeholder upload failed for {}: {}", url, e);
        }
        self.textures.borrow_mut().insert(id, texture);

        let gl = gl.clone();
        let textures = self.textures.clone();
        let fetcher = self.fetcher.clone();
        let url = url.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            let (width, height, pixels) = match fetch_image(&fetcher, &url).await {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Texture {} failed to load, keeping placeholder: {}", url, e);
                    return;
                },
            };
            let textures = textures.borrow();
            let texture = match textures.get(&id) {
                Some(texture) => texture,
                None => {
                    log::debug!("Texture {} was released before {} arrived", id, url);
                    return;
                },
            };
            gl.pixel_storei(WebGL::UNPACK_FLIP_Y_WEBGL, 1);
            let result = write_pixels(&gl, texture, width, height, &pixels);
            gl.pixel_storei(WebGL::UNPACK_FLIP_Y_WEBGL, 0);
            match result {
                Ok(()) => log::debug!("Texture {} loaded ({}x{})", url, width, height),
                Err(e) => log::warn!("Texture {} upload failed: {}", url, e),
            }
        });
        id
    }

    fn release_texture(&self, id: Uid) {
        if let Some(texture) = self.textures.borrow_mut().remove(&id) {
            self.canvas.get_gl().delete_texture(Some(&texture));
        }
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    fn draw(&self, program: &GlProgram, uniforms: &UniformSet) {
        let gl = self.canvas.get_gl();
        gl.clear(WebGL::COLOR_BUFFER_BIT);
        gl.use_program(Some(&program.program));

        if let Some(position) = program.position {
            gl.bind_buffer(WebGL::ARRAY_BUFFER, Some(&self.triangle));
            gl.vertex_attrib_pointer_with_i32(position, 2, WebGL::FLOAT, false, 0, 0);
            gl.enable_vertex_attrib_array(position);
        }

        let textures = self.textures.borrow();
        let mut unit = 0;
        for (name, value) in uniforms.iter() {
            let location = match program.locations.get(name) {
                Some(location) => location,
                None => continue,
            };
            match value {
                UniformValue::Float(v) => gl.uniform1f(Some(location), *v),
                UniformValue::Vec2([x, y]) => gl.uniform2f(Some(location), *x, *y),
                UniformValue::Vec3([x, y, z]) => gl.uniform3f(Some(location), *x, *y, *z),
                UniformValue::Texture(Some(id)) => {
                    if let Some(texture) = textures.get(id) {
                        gl.active_texture(WebGL::TEXTURE0 + unit);
                        gl.bind_texture(WebGL::TEXTURE_2D, Some(texture));
                        gl.uniform1i(Some(location), unit as i32);
                        unit += 1;
                    }
                },
                UniformValue::Texture(None) => (),
            }
        }
        gl.draw_arrays(WebGL::TRIANGLES, 0, 3);
    }
}
