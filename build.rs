// Build script to precompile the GLSL shaders to SPIR-V
//
// Output lands next to the source as `<file>.spv`, which the shader loader
// prefers at runtime. Without glslc the sources are compiled on startup
// instead, so a missing SDK is only a warning.

use std::path::Path;
use std::process::Command;

const SHADERS: &[&str] = &["shaders/triangle.vert", "shaders/triangle.frag"];

fn main() {
    println!("cargo:rerun-if-changed=shaders/");

    for shader in SHADERS {
        compile_shader(shader, &format!("{shader}.spv"));
    }
}

fn compile_shader(input: &str, output: &str) {
    let input_path = Path::new(input);
    if !input_path.exists() {
        println!("cargo:warning=Shader {} not found, skipping", input);
        return;
    }

    let result = Command::new("glslc")
        .arg(input_path)
        .arg("-o")
        .arg(output)
        .status();

    match result {
        Ok(status) if status.success() => {}
        Ok(status) => {
            println!("cargo:warning=Failed to compile {}: exit code {:?}", input, status.code());
        }
        Err(e) => {
            println!("cargo:warning=glslc not found ({}); {} will be compiled at startup", e, input);
        }
    }
}
