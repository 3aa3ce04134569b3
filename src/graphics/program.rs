use crate::error::{LabError, LabResult};
use web_sys::WebGlRenderingContext as WebGL;
use web_sys::*;

fn stage_name(shader_type: u32) -> &'static str {
    match shader_type {
        WebGL::VERTEX_SHADER => "vertex",
        WebGL::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

pub fn compile_shader(
    gl: &WebGlRenderingContext,
    shader_type: u32,
    source: &str,
) -> LabResult<WebGlShader> {
    let shader = gl
        .create_shader(shader_type)
        .ok_or_else(|| LabError::missing_val("Create shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let status = gl.get_shader_parameter(&shader, WebGL::COMPILE_STATUS).as_bool().unwrap_or(false);

    if status {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(LabError::ShaderCompile { stage: stage_name(shader_type), log })
    }
}

pub fn build_program(gl: &WebGlRenderingContext, vert_shader: &str, frag_shader: &str) -> LabResult<WebGlProgram> {
    let vert_shader = compile_shader(gl, WebGL::VERTEX_SHADER, vert_shader)?;
    let frag_shader = match compile_shader(gl, WebGL::FRAGMENT_SHADER, frag_shader) {
        Ok(shader) => shader,
        Err(e) => {
            gl.delete_shader(Some(&vert_shader));
            return Err(e);
        },
    };
    let program = gl.create_program().ok_or_else(|| LabError::missing_val("create program"))?;

    gl.attach_shader(&program, &vert_shader);
    gl.attach_shader(&program, &frag_shader);
    gl.link_program(&program);
    // Shaders are only flagged here; GL frees them with the program.
    gl.delete_shader(Some(&vert_shader));
    gl.delete_shader(Some(&frag_shader));

    let status = gl.get_program_parameter(&program, WebGL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);

    if !status {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        return Err(LabError::ShaderLink { log });
    }
    Ok(program)
}
