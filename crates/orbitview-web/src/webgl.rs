//! WebGL2 renderer drawing the scene's line primitives onto a canvas

use anyhow::{anyhow, Context};
use orbitview_core::{
    LineSegment, PerspectiveCamera, RenderError, Renderer, RendererSettings, Scene,
    ShadowMapSettings, Size,
};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject,
};

const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 a_position;
in vec3 a_color;
uniform mat4 u_view_projection;
out vec3 v_color;

void main() {
    v_color = a_color;
    gl_Position = u_view_projection * vec4(a_position, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec3 v_color;
out vec4 frag_color;

void main() {
    frag_color = vec4(v_color, 1.0);
}
"#;

/// Floats per vertex: position xyz + color rgb
const VERTEX_FLOATS: usize = 6;

/// Interleave segment endpoints as position/color vertices
pub(crate) fn pack_vertices(segments: &[LineSegment]) -> Vec<f32> {
    let mut out = Vec::with_capacity(segments.len() * 2 * VERTEX_FLOATS);
    for segment in segments {
        for point in [segment.start, segment.end] {
            out.extend_from_slice(&point.to_array());
            out.extend_from_slice(&segment.color);
        }
    }
    out
}

pub(crate) fn js_error(value: JsValue) -> anyhow::Error {
    anyhow!(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

pub struct WebGlRenderer {
    canvas: HtmlCanvasElement,
    gl: Gl,
    program: Option<WebGlProgram>,
    buffer: Option<WebGlBuffer>,
    vao: Option<WebGlVertexArrayObject>,
    view_projection: Option<WebGlUniformLocation>,
    size: Size,
    shadow_map: ShadowMapSettings,
    clear_color: [f32; 4],
    disposed: bool,
}

impl WebGlRenderer {
    /// Create a detached canvas with a WebGL2 context
    pub fn new(document: &Document, settings: &RendererSettings) -> anyhow::Result<Self> {
        let canvas = document
            .create_element("canvas")
            .map_err(js_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("created element is not a canvas"))?;
        let gl = canvas
            .get_context("webgl2")
            .map_err(js_error)?
            .context("WebGL2 is not supported by this browser")?
            .dyn_into::<Gl>()
            .map_err(|_| anyhow!("context is not a WebGL2 context"))?;

        let program = link_program(&gl, VERTEX_SHADER, FRAGMENT_SHADER)?;
        let view_projection = gl.get_uniform_location(&program, "u_view_projection");

        let vao = gl
            .create_vertex_array()
            .context("failed to create vertex array")?;
        let buffer = gl.create_buffer().context("failed to create buffer")?;
        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));

        let stride = (VERTEX_FLOATS * std::mem::size_of::<f32>()) as i32;
        for (name, offset) in [("a_position", 0), ("a_color", 3)] {
            let location = gl.get_attrib_location(&program, name);
            if location < 0 {
                return Err(anyhow!("shader attribute {} not found", name));
            }
            let location = location as u32;
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer_with_i32(
                location,
                3,
                Gl::FLOAT,
                false,
                stride,
                offset * std::mem::size_of::<f32>() as i32,
            );
        }
        gl.bind_vertex_array(None);
        gl.enable(Gl::DEPTH_TEST);

        let mut renderer = Self {
            canvas,
            gl,
            program: Some(program),
            buffer: Some(buffer),
            vao: Some(vao),
            view_projection,
            size: Size::default(),
            shadow_map: settings.shadow_map,
            clear_color: settings.clear_color,
            disposed: false,
        };
        renderer.set_size(settings.size);
        Ok(renderer)
    }

    /// The canvas the renderer draws into
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl Renderer for WebGlRenderer {
    fn size(&self) -> Size {
        self.size
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
        let style = self.canvas.style();
        style.set_property("width", &format!("{}px", size.width)).ok();
        style.set_property("height", &format!("{}px", size.height)).ok();
        self.gl.viewport(0, 0, size.width as i32, size.height as i32);
    }

    fn shadow_map(&self) -> ShadowMapSettings {
        self.shadow_map
    }

    fn set_shadow_map(&mut self, settings: ShadowMapSettings) {
        // Lines cast no shadows; the setting is kept for hosts that read it back
        self.shadow_map = settings;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        if self.gl.is_context_lost() {
            return Err(RenderError::ContextLost);
        }
        let gl = &self.gl;

        let [r, g, b, a] = self.clear_color;
        gl.clear_color(r, g, b, a);
        gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);

        let vertices = pack_vertices(&scene.line_segments());
        if vertices.is_empty() {
            return Ok(());
        }

        gl.use_program(self.program.as_ref());
        gl.uniform_matrix4fv_with_f32_array(
            self.view_projection.as_ref(),
            false,
            &camera.view_projection().to_cols_array(),
        );
        gl.bind_vertex_array(self.vao.as_ref());
        gl.bind_buffer(Gl::ARRAY_BUFFER, self.buffer.as_ref());
        let data = js_sys::Float32Array::from(vertices.as_slice());
        gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &data, Gl::DYNAMIC_DRAW);
        gl.draw_arrays(Gl::LINES, 0, (vertices.len() / VERTEX_FLOATS) as i32);
        gl.bind_vertex_array(None);

        match gl.get_error() {
            Gl::NO_ERROR => Ok(()),
            Gl::CONTEXT_LOST_WEBGL => Err(RenderError::ContextLost),
            code => Err(RenderError::Backend(format!("GL error 0x{:04x}", code))),
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.gl.delete_vertex_array(self.vao.take().as_ref());
        self.gl.delete_buffer(self.buffer.take().as_ref());
        self.gl.delete_program(self.program.take().as_ref());
        self.view_projection = None;
        self.disposed = true;
        tracing::debug!("WebGL renderer disposed");
    }
}

fn compile_shader(gl: &Gl, kind: u32, source: &str) -> anyhow::Result<WebGlShader> {
    let shader = gl.create_shader(kind).context("failed to create shader")?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(anyhow!("shader compilation failed: {}", log))
    }
}

fn link_program(gl: &Gl, vertex: &str, fragment: &str) -> anyhow::Result<WebGlProgram> {
    let vertex = compile_shader(gl, Gl::VERTEX_SHADER, vertex)?;
    let fragment = compile_shader(gl, Gl::FRAGMENT_SHADER, fragment)?;
    let program = gl.create_program().context("failed to create program")?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);

    // Shaders are no longer needed once linked
    gl.delete_shader(Some(&vertex));
    gl.delete_shader(Some(&fragment));

    if gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(anyhow!("program link failed: {}", log))
    }
}
