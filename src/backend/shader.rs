// Shader loading
//
// Stages are inferred from the file extension. Precompiled `<file>.spv`
// siblings (written by build.rs) win; otherwise the GLSL source is handed to
// a `ShaderCompiler`.

use ash::vk;
use std::ffi::CString;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use super::gpu::Gpu;
use super::resource::ShaderModule;
use crate::error::{GfxError, GfxResult};
use crate::fs::load_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Geometry,
    TessControl,
    TessEvaluation,
}

impl ShaderStage {
    pub fn from_path(path: &Path) -> GfxResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "vert" => Ok(Self::Vertex),
            "frag" => Ok(Self::Fragment),
            "comp" => Ok(Self::Compute),
            "geom" => Ok(Self::Geometry),
            "tesc" => Ok(Self::TessControl),
            "tese" => Ok(Self::TessEvaluation),
            _ => Err(GfxError::UnknownShaderStage(path.to_path_buf())),
        }
    }

    pub fn flags(self) -> vk::ShaderStageFlags {
        match self {
            Self::Vertex => vk::ShaderStageFlags::VERTEX,
            Self::Fragment => vk::ShaderStageFlags::FRAGMENT,
            Self::Compute => vk::ShaderStageFlags::COMPUTE,
            Self::Geometry => vk::ShaderStageFlags::GEOMETRY,
            Self::TessControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
            Self::TessEvaluation => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        }
    }

    /// Name glslc expects after `-fshader-stage=`.
    fn glslc_name(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::Fragment => "frag",
            Self::Compute => "comp",
            Self::Geometry => "geom",
            Self::TessControl => "tesc",
            Self::TessEvaluation => "tese",
        }
    }
}

/// Turns shader source into SPIR-V words, or returns the compiler's log.
pub trait ShaderCompiler {
    fn compile(&self, stage: ShaderStage, source: &[u8], entry_point: &str) -> Result<Vec<u32>, String>;
}

/// Shells out to `glslc` from the Vulkan SDK.
#[derive(Debug, Clone)]
pub struct Glslc {
    executable: PathBuf,
}

impl Glslc {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }
}

impl Default for Glslc {
    fn default() -> Self {
        Self::new("glslc")
    }
}

impl ShaderCompiler for Glslc {
    fn compile(&self, stage: ShaderStage, source: &[u8], entry_point: &str) -> Result<Vec<u32>, String> {
        let mut child = Command::new(&self.executable)
            .arg(format!("-fshader-stage={}", stage.glslc_name()))
            .arg(format!("-fentry-point={entry_point}"))
            .args(["-o", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to run {:?}: {e}", self.executable))?;

        let mut stdin = child.stdin.take().ok_or("glslc stdin is not piped")?;

        // Feed stdin while stdout drains, or a full pipe on either side stalls both
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(source));
            let output = child.wait_with_output();
            (output, writer.join())
        });

        let output = output.map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).into_owned());
        }
        written
            .map_err(|_| "glslc stdin writer panicked".to_string())?
            .map_err(|e| e.to_string())?;
        parse_spirv(&output.stdout)
    }
}

/// Decode a SPIR-V blob into aligned words, checking the magic number.
pub fn parse_spirv(bytes: &[u8]) -> Result<Vec<u32>, String> {
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| e.to_string())
}

/// Load one stage, preferring a precompiled `<path>.spv`.
pub fn load_shader(path: &Path, entry_point: &str, compiler: &dyn ShaderCompiler) -> GfxResult<Vec<u32>> {
    let stage = ShaderStage::from_path(path)?;
    let compile_error = |log: String| GfxError::ShaderCompilation { stage: stage.flags(), log };

    let mut spv_path = path.as_os_str().to_owned();
    spv_path.push(".spv");
    let spv_path = PathBuf::from(spv_path);

    if spv_path.exists() {
        log::debug!("Using precompiled {:?}", spv_path);
        return parse_spirv(&load_file(&spv_path)?).map_err(compile_error);
    }

    let source = load_file(path)?;
    let words = compiler.compile(stage, &source, entry_point).map_err(compile_error)?;
    log::info!("Compiled {:?} ({} words)", path, words.len());
    Ok(words)
}

/// SPIR-V for the single graphics pipeline.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
    pub entry_point: CString,
}

impl ShaderSet {
    pub fn new(vertex: Vec<u32>, fragment: Vec<u32>, entry_point: &str) -> GfxResult<Self> {
        let entry_point = CString::new(entry_point).map_err(|e| GfxError::ShaderCompilation {
            stage: vk::ShaderStageFlags::ALL_GRAPHICS,
            log: e.to_string(),
        })?;
        Ok(Self { vertex, fragment, entry_point })
    }

    pub fn load(
        vertex: &Path,
        fragment: &Path,
        entry_point: &str,
        compiler: &dyn ShaderCompiler,
    ) -> GfxResult<Self> {
        let vertex = load_shader(vertex, entry_point, compiler)?;
        let fragment = load_shader(fragment, entry_point, compiler)?;
        Self::new(vertex, fragment, entry_point)
    }
}

pub fn create_shader_module<G: Gpu>(gpu: &Arc<G>, code: &[u32]) -> GfxResult<ShaderModule<G>> {
    let module = gpu.create_shader_module(code).map_err(GfxError::PipelineCreation)?;
    Ok(ShaderModule::new(gpu.clone(), module))
}
