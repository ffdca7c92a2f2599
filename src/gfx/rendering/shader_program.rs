//! Vertex + fragment WGSL program with macro and material injection
//!
//! Sources are read from disk, expanded by the [`Preprocessor`], then parsed
//! and validated with naga. A successful [`ShaderProgram::load`] replaces the
//! current program; a failed one leaves it untouched.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::preprocessor::{Material, MaterialSet, Preprocessor};
use crate::{
    error::{ShaderError, ShaderResult, ShaderStage},
    gfx::{resources::material::MaterialList, scene::VertexAttribute},
};

pub const VERTEX_ENTRY_POINT: &str = "vs_main";
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Which material files a program pulls in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MaterialBinding {
    #[default]
    None,
    /// One material called for every face drawn by the program
    Single(PathBuf),
    /// Every id of `ids`, dispatched on the per-face material id
    Chain { materials: MaterialList, ids: Vec<u8> },
}

/// A successfully compiled and linked program
pub struct CompiledProgram {
    vertex_source: String,
    fragment_source: String,
    vertex_module: naga::Module,
    fragment_module: naga::Module,
    attribute_locations: Vec<(VertexAttribute, u32)>,
}

impl CompiledProgram {
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn vertex_module(&self) -> &naga::Module {
        &self.vertex_module
    }

    pub fn fragment_module(&self) -> &naga::Module {
        &self.fragment_module
    }
}

pub struct ShaderProgram {
    vertex_path: PathBuf,
    fragment_path: PathBuf,
    macros: BTreeMap<String, u32>,
    materials: MaterialBinding,
    program: Option<CompiledProgram>,
    generation: u64,
}

impl ShaderProgram {
    pub fn new(vertex_path: impl Into<PathBuf>, fragment_path: impl Into<PathBuf>) -> Self {
        Self {
            vertex_path: vertex_path.into(),
            fragment_path: fragment_path.into(),
            macros: BTreeMap::new(),
            materials: MaterialBinding::None,
            program: None,
            generation: 0,
        }
    }

    pub fn vertex_path(&self) -> &Path {
        &self.vertex_path
    }

    pub fn fragment_path(&self) -> &Path {
        &self.fragment_path
    }

    /// Sets a macro for the next load. Returns true if its value changed.
    pub fn set_macro(&mut self, name: &str, value: u32) -> bool {
        self.macros.insert(name.to_string(), value) != Some(value)
    }

    pub fn macro_value(&self, name: &str) -> Option<u32> {
        self.macros.get(name).copied()
    }

    pub fn set_materials(&mut self, materials: MaterialBinding) {
        self.materials = materials;
    }

    pub fn materials(&self) -> &MaterialBinding {
        &self.materials
    }

    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    pub fn program(&self) -> Option<&CompiledProgram> {
        self.program.as_ref()
    }

    /// Bumped each time a new program replaces the current one
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Processed vertex source of the current program
    pub fn vertex_source(&self) -> Option<&str> {
        self.program.as_ref().map(CompiledProgram::vertex_source)
    }

    /// Processed fragment source of the current program
    pub fn fragment_source(&self) -> Option<&str> {
        self.program.as_ref().map(CompiledProgram::fragment_source)
    }

    /// `@location` of the vertex input named after `attribute`, if the
    /// current program reads it
    pub fn attribute_location(&self, attribute: VertexAttribute) -> Option<u32> {
        self.program.as_ref().and_then(|p| {
            p.attribute_locations
                .iter()
                .find(|(a, _)| *a == attribute)
                .map(|(_, location)| *location)
        })
    }

    /// Reads, expands, compiles and links both stages.
    ///
    /// On error the previously loaded program, if any, stays current.
    pub fn load(&mut self) -> ShaderResult<()> {
        let preprocessor = Preprocessor::new(
            self.macros.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            self.load_materials()?,
        );

        let vertex_source = preprocessor.process(&read_source(&self.vertex_path)?);
        let fragment_source = preprocessor.process(&read_source(&self.fragment_path)?);

        let vertex_module = compile(ShaderStage::Vertex, &self.vertex_path, &vertex_source)?;
        let fragment_module =
            compile(ShaderStage::Fragment, &self.fragment_path, &fragment_source)?;

        let attribute_locations = link(&vertex_module, &fragment_module)?;

        self.program = Some(CompiledProgram {
            vertex_source,
            fragment_source,
            vertex_module,
            fragment_module,
            attribute_locations,
        });
        self.generation += 1;

        debug!(
            "Loaded shader program '{}' + '{}' (generation {})",
            self.vertex_path.display(),
            self.fragment_path.display(),
            self.generation
        );
        Ok(())
    }

    fn load_materials(&self) -> ShaderResult<MaterialSet> {
        match &self.materials {
            MaterialBinding::None => Ok(MaterialSet::None),
            MaterialBinding::Single(path) => {
                Ok(MaterialSet::Single(Material::new(&read_source(path)?, 0, Vec::new())))
            }
            MaterialBinding::Chain { materials, ids } => {
                let mut groups = materials.group_by_path(ids.iter().copied());
                let default = match groups
                    .iter()
                    .position(|(path, _)| path.as_path() == materials.default_path())
                {
                    Some(index) => index,
                    None => {
                        groups.push((materials.default_path().to_path_buf(), Vec::new()));
                        groups.len() - 1
                    }
                };

                let materials = groups
                    .into_iter()
                    .enumerate()
                    .map(|(k, (path, ids))| Ok(Material::new(&read_source(&path)?, k, ids)))
                    .collect::<ShaderResult<Vec<_>>>()?;

                Ok(MaterialSet::Chain { materials, default })
            }
        }
    }

    /// Writes the processed sources of the current program
    pub fn export_sources(
        &self,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> ShaderResult<()> {
        let Some(program) = &self.program else {
            return Err(ShaderError::link("no program loaded"));
        };

        for (path, source) in [
            (vertex_path.as_ref(), &program.vertex_source),
            (fragment_path.as_ref(), &program.fragment_source),
        ] {
            fs::write(path, source).map_err(|source| ShaderError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            info!("Exported shader source to '{}'", path.display());
        }
        Ok(())
    }
}

fn read_source(path: &Path) -> ShaderResult<String> {
    let source = fs::read_to_string(path).map_err(|source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if source.trim().is_empty() {
        return Err(ShaderError::EmptySource {
            path: path.to_path_buf(),
        });
    }
    Ok(source)
}

/// Parses and validates one WGSL stage
pub fn compile(stage: ShaderStage, path: &Path, source: &str) -> ShaderResult<naga::Module> {
    let compile_error = |log: String| ShaderError::Compile {
        stage,
        path: path.to_path_buf(),
        log,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    Ok(module)
}

fn entry_point<'a>(
    module: &'a naga::Module,
    name: &str,
    stage: naga::ShaderStage,
) -> ShaderResult<&'a naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == stage)
        .ok_or_else(|| ShaderError::link(format!("missing {stage:?} entry point '{name}'")))
}

/// `(name, location, type)` of every user-defined input or output reached
/// through `ty`, looking inside structs
fn locations<'a>(
    module: &'a naga::Module,
    name: Option<&'a str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<(Option<&'a str>, u32, &'a naga::TypeInner)>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.push((name, *location, &module.types[ty].inner));
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    locations(
                        module,
                        member.name.as_deref(),
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

/// Checks the stages fit together and reflects the vertex attribute locations
fn link(
    vertex: &naga::Module,
    fragment: &naga::Module,
) -> ShaderResult<Vec<(VertexAttribute, u32)>> {
    let vs = entry_point(vertex, VERTEX_ENTRY_POINT, naga::ShaderStage::Vertex)?;
    let fs = entry_point(fragment, FRAGMENT_ENTRY_POINT, naga::ShaderStage::Fragment)?;

    let mut outputs = Vec::new();
    if let Some(result) = &vs.function.result {
        locations(vertex, None, result.ty, result.binding.as_ref(), &mut outputs);
    }

    let mut inputs = Vec::new();
    for arg in &fs.function.arguments {
        locations(fragment, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    for (name, location, inner) in &inputs {
        let label = name.unwrap_or("<unnamed>");
        match outputs.iter().find(|(_, l, _)| l == location) {
            None => {
                return Err(ShaderError::link(format!(
                    "fragment input '{label}' at location {location} is not written by the vertex stage"
                )))
            }
            Some((_, _, written)) if written != inner => {
                return Err(ShaderError::link(format!(
                    "fragment input '{label}' at location {location} does not match the vertex output type"
                )))
            }
            Some(_) => {}
        }
    }

    let mut vertex_inputs = Vec::new();
    for arg in &vs.function.arguments {
        locations(vertex, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut vertex_inputs);
    }

    Ok(VertexAttribute::ALL
        .iter()
        .filter_map(|attribute| {
            vertex_inputs
                .iter()
                .find(|(name, _, _)| *name == Some(attribute.shader_name()))
                .map(|(_, location, _)| (*attribute, *location))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(@location(3) vtx_position: vec3<f32>, @location(5) vtx_color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(vtx_position, 1.0);
    out.color = vtx_color;
    return out;
}
"#;

    const FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

    fn module(stage: ShaderStage, source: &str) -> naga::Module {
        compile(stage, Path::new("test.wgsl"), source).unwrap()
    }

    #[test]
    fn test_compile_error_carries_log() {
        let err = compile(ShaderStage::Fragment, Path::new("bad.wgsl"), "fn fs_main( {").unwrap_err();
        match err {
            ShaderError::Compile { stage, path, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(path, PathBuf::from("bad.wgsl"));
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validation_error_is_compile_error() {
        let source = "fn f() -> f32 { return 1u; }";
        let err = compile(ShaderStage::Vertex, Path::new("v.wgsl"), source).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn test_link_reflects_attribute_locations() {
        let locations = link(
            &module(ShaderStage::Vertex, VERTEX),
            &module(ShaderStage::Fragment, FRAGMENT),
        )
        .unwrap();

        assert_eq!(
            locations,
            vec![(VertexAttribute::Position, 3), (VertexAttribute::Color, 5)]
        );
    }

    #[test]
    fn test_link_rejects_unwritten_input() {
        let fragment = "@fragment\nfn fs_main(@location(1) normal: vec3<f32>) -> @location(0) vec4<f32> {\n    return vec4<f32>(normal, 1.0);\n}\n";
        let err = link(
            &module(ShaderStage::Vertex, VERTEX),
            &module(ShaderStage::Fragment, fragment),
        )
        .unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn test_link_rejects_type_mismatch() {
        let fragment = "@fragment\nfn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {\n    return color;\n}\n";
        let err = link(
            &module(ShaderStage::Vertex, VERTEX),
            &module(ShaderStage::Fragment, fragment),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_link_requires_entry_points() {
        let fragment = "@fragment\nfn main() -> @location(0) vec4<f32> {\n    return vec4<f32>(1.0);\n}\n";
        let err = link(
            &module(ShaderStage::Vertex, VERTEX),
            &module(ShaderStage::Fragment, fragment),
        )
        .unwrap_err();
        assert!(err.to_string().contains("fs_main"));
    }

    #[test]
    fn test_set_macro_reports_changes() {
        let mut program = ShaderProgram::new("a.wgsl", "b.wgsl");
        assert!(program.set_macro("NB_PT_LIGHTS", 1));
        assert!(!program.set_macro("NB_PT_LIGHTS", 1));
        assert!(program.set_macro("NB_PT_LIGHTS", 2));
        assert_eq!(program.macro_value("NB_PT_LIGHTS"), Some(2));
        assert_eq!(program.macro_value("NB_DIR_LIGHTS"), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut program = ShaderProgram::new("/nonexistent/v.wgsl", "/nonexistent/f.wgsl");
        assert!(matches!(program.load(), Err(ShaderError::Io { .. })));
        assert!(!program.is_loaded());
        assert_eq!(program.generation(), 0);
    }
}
