//! Tag expansion for WGSL templates
//!
//! Shader templates may contain tag lines starting with `//@`:
//!
//! - `//@ define_macros` is replaced by one `const NAME: u32 = Nu;` per macro.
//!   Without this tag the constants go right after the leading directives.
//! - `//@ define_materials` is replaced by the source of the material files.
//! - `//@ call_materials(sel) surface = @mat;` is replaced by the statement
//!   with `@mat` bound to the material function call. With several materials
//!   this becomes an `if (sel == 1u) {..} else if .. else {..}` chain on the
//!   per-face material id `sel`.
//!
//! Tags are only recognised at the start of a line outside block comments.

use log::warn;

pub const TAG_PREFIX: &str = "//@";
/// Placeholder replaced by the material call in `call_materials` statements
pub const MATERIAL_PLACEHOLDER: &str = "@mat";
/// Surface expression used when a material function signature can't be read
pub const FALLBACK_SURFACE: &str = "vec3<f32>(1.0, 0.0, 1.0)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    DefineMacros,
    DefineMaterials,
    CallMaterials { selector: String, statement: String },
}

impl Tag {
    /// Parses a tag line. The line must start (after whitespace) with `//@`.
    pub fn parse(line: &str) -> Option<Tag> {
        let body = line.trim_start().strip_prefix(TAG_PREFIX)?.trim();

        match body {
            "define_macros" => Some(Tag::DefineMacros),
            "define_materials" => Some(Tag::DefineMaterials),
            _ => {
                let args = body.strip_prefix("call_materials")?.trim_start();
                let args = args.strip_prefix('(')?;
                let close = args.find(')')?;
                Some(Tag::CallMaterials {
                    selector: args[..close].trim().to_string(),
                    statement: args[close + 1..].trim().to_string(),
                })
            }
        }
    }
}

/// Copy of `source` with every comment byte blanked out (newlines kept), plus
/// for each line whether it starts inside a block comment.
///
/// WGSL block comments nest.
fn scan_comments(source: &str) -> (String, Vec<bool>) {
    let bytes = source.as_bytes();
    let mut masked = Vec::with_capacity(bytes.len());
    let mut line_in_block = vec![false];
    let mut depth = 0u32;
    let mut in_line_comment = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        if b == b'\n' {
            in_line_comment = false;
            masked.push(b'\n');
            line_in_block.push(depth > 0);
            i += 1;
            continue;
        }

        if in_line_comment {
            masked.push(b' ');
        } else if b == b'/' && next == Some(b'*') {
            depth += 1;
            masked.extend_from_slice(b"  ");
            i += 2;
            continue;
        } else if depth > 0 && b == b'*' && next == Some(b'/') {
            depth -= 1;
            masked.extend_from_slice(b"  ");
            i += 2;
            continue;
        } else if depth > 0 {
            masked.push(b' ');
        } else if b == b'/' && next == Some(b'/') {
            in_line_comment = true;
            masked.push(b' ');
        } else {
            masked.push(b);
        }
        i += 1;
    }

    (String::from_utf8_lossy(&masked).into_owned(), line_in_block)
}

/// Tags of `source`, keyed by line number
pub fn find_tags(source: &str) -> Vec<(usize, Tag)> {
    let (_, line_in_block) = scan_comments(source);

    source
        .lines()
        .enumerate()
        .filter(|(i, _)| !line_in_block.get(*i).copied().unwrap_or(false))
        .filter_map(|(i, line)| Tag::parse(line).map(|tag| (i, tag)))
        .collect()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Name and parameter names of a WGSL function declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<String>,
    /// Byte range of the name in the source it was read from
    name_span: (usize, usize),
}

impl FunctionSignature {
    /// Reads the first `fn` declaration of `source`, ignoring comments
    pub fn parse(source: &str) -> Option<FunctionSignature> {
        let (masked, _) = scan_comments(source);
        let bytes = masked.as_bytes();

        let mut search = 0;
        let start = loop {
            let pos = search + masked[search..].find("fn")?;
            let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
            let after_ok = bytes.get(pos + 2).is_some_and(|b| b.is_ascii_whitespace());
            if before_ok && after_ok {
                break pos + 2;
            }
            search = pos + 2;
        };

        let name_start = start + masked[start..].len() - masked[start..].trim_start().len();
        let name_len = bytes[name_start..]
            .iter()
            .take_while(|&&b| is_ident_byte(b))
            .count();
        if name_len == 0 {
            return None;
        }
        let name_end = name_start + name_len;

        let rest = masked[name_end..].trim_start();
        let rest = rest.strip_prefix('(')?;

        let mut params = Vec::new();
        let mut current = String::new();
        let mut parens = 0i32;
        let mut angles = 0i32;
        let mut closed = false;
        for c in rest.chars() {
            match c {
                '(' => parens += 1,
                ')' if parens == 0 => {
                    closed = true;
                    break;
                }
                ')' => parens -= 1,
                '<' => angles += 1,
                '>' => angles -= 1,
                ',' if parens == 0 && angles == 0 => {
                    params.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
            current.push(c);
        }
        if !closed {
            return None;
        }
        params.push(current);

        let params = params
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                let declared = p.split(':').next().unwrap_or_default();
                declared.split_whitespace().last().map(str::to_string)
            })
            .collect::<Option<Vec<_>>>()?;

        Some(FunctionSignature {
            name: masked[name_start..name_end].to_string(),
            params,
            name_span: (name_start, name_end),
        })
    }

    pub fn call(&self, name: &str) -> String {
        format!("{}({})", name, self.params.join(", "))
    }
}

/// A material function ready for injection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    pub source: String,
    /// Call expression evaluating to the surface color
    pub call: String,
    /// Material ids dispatched to this function
    pub ids: Vec<u8>,
}

impl Material {
    /// Renames the material's function to `<name>_m<suffix>` so several
    /// files can share a function name, and synthesizes its call.
    pub fn new(source: &str, suffix: usize, ids: Vec<u8>) -> Self {
        match FunctionSignature::parse(source) {
            Some(signature) => {
                let renamed = format!("{}_m{}", signature.name, suffix);
                let (start, end) = signature.name_span;
                let mut source = source.to_string();
                source.replace_range(start..end, &renamed);
                Material {
                    call: signature.call(&renamed),
                    source,
                    ids,
                }
            }
            None => {
                warn!("No function declaration found in material, using fallback color");
                Material {
                    source: source.to_string(),
                    call: FALLBACK_SURFACE.to_string(),
                    ids,
                }
            }
        }
    }
}

/// Materials injected into one shader
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MaterialSet {
    #[default]
    None,
    /// One material, called unconditionally
    Single(Material),
    /// Dispatch on the per-face material id. `materials[default]` handles
    /// every id not claimed by another material.
    Chain {
        materials: Vec<Material>,
        default: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    pub macros: Vec<(String, u32)>,
    pub materials: MaterialSet,
}

impl Preprocessor {
    pub fn new(macros: Vec<(String, u32)>, materials: MaterialSet) -> Self {
        Self { macros, materials }
    }

    /// Expands every tag of `source`
    pub fn process(&self, source: &str) -> String {
        let lines: Vec<&str> = source.lines().collect();
        let tags = find_tags(source);

        let has_macro_tag = tags.iter().any(|(_, t)| *t == Tag::DefineMacros);
        let macro_insert = (!has_macro_tag && !self.macros.is_empty())
            .then(|| directives_end(&lines));

        let mut out = String::with_capacity(source.len());
        let mut tags = tags.into_iter().peekable();

        for (i, line) in lines.iter().enumerate() {
            if macro_insert == Some(i) {
                self.push_macros(&mut out, "");
            }

            match tags.next_if(|(line_index, _)| *line_index == i) {
                Some((_, tag)) => {
                    let indent = &line[..line.len() - line.trim_start().len()];
                    self.expand(&mut out, &tag, indent);
                }
                None => {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }

        if macro_insert == Some(lines.len()) {
            self.push_macros(&mut out, "");
        }

        out
    }

    fn push_macros(&self, out: &mut String, indent: &str) {
        for (name, value) in &self.macros {
            out.push_str(&format!("{indent}const {name}: u32 = {value}u;\n"));
        }
    }

    fn expand(&self, out: &mut String, tag: &Tag, indent: &str) {
        match tag {
            Tag::DefineMacros => self.push_macros(out, indent),
            Tag::DefineMaterials => {
                let materials: &[Material] = match &self.materials {
                    MaterialSet::None => &[],
                    MaterialSet::Single(m) => std::slice::from_ref(m),
                    MaterialSet::Chain { materials, .. } => materials.as_slice(),
                };
                for material in materials {
                    out.push_str(material.source.trim_end());
                    out.push_str("\n\n");
                }
            }
            Tag::CallMaterials {
                selector,
                statement,
            } => self.expand_call(out, selector, statement, indent),
        }
    }

    fn expand_call(&self, out: &mut String, selector: &str, statement: &str, indent: &str) {
        let bind = |call: &str| statement.replace(MATERIAL_PLACEHOLDER, call);

        match &self.materials {
            MaterialSet::None => {}
            MaterialSet::Single(material) => {
                out.push_str(&format!("{indent}{}\n", bind(&material.call)));
            }
            MaterialSet::Chain { materials, default } => {
                let branches: Vec<&Material> = materials
                    .iter()
                    .enumerate()
                    .filter(|(k, m)| k != default && !m.ids.is_empty())
                    .map(|(_, m)| m)
                    .collect();
                let fallback = materials
                    .get(*default)
                    .map_or(FALLBACK_SURFACE, |m| m.call.as_str());

                if branches.is_empty() {
                    out.push_str(&format!("{indent}{}\n", bind(fallback)));
                    return;
                }

                for (k, material) in branches.iter().enumerate() {
                    let condition = material
                        .ids
                        .iter()
                        .map(|id| format!("{selector} == {id}u"))
                        .collect::<Vec<_>>()
                        .join(" || ");
                    let keyword = if k == 0 { "if" } else { "} else if" };
                    out.push_str(&format!("{indent}{keyword} ({condition}) {{\n"));
                    out.push_str(&format!("{indent}    {}\n", bind(&material.call)));
                }
                out.push_str(&format!("{indent}}} else {{\n"));
                out.push_str(&format!("{indent}    {}\n", bind(fallback)));
                out.push_str(&format!("{indent}}}\n"));
            }
        }
    }
}

/// Index of the first line after the leading `enable`/`requires`/`diagnostic`
/// directives, which must stay at the top of a WGSL module
fn directives_end(lines: &[&str]) -> usize {
    let mut end = 0;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if ["enable", "requires", "diagnostic"]
            .iter()
            .any(|d| trimmed.starts_with(d))
        {
            end = i + 1;
        } else {
            break;
        }
    }
    end
}
