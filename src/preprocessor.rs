use crate::library::LibraryTable;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::{collections::HashSet, fmt};

const LIBRARY_EXTENSION: &str = ".glsl";

lazy_static! {
    static ref IMPORT_PATTERN: Regex = Regex::new(r#"#import\s*\(\s*["']([^"']+)["']\s*\)"#)
        .expect("import pattern");
    static ref PRECISION_PATTERN: Regex = Regex::new(r"precision\s+(highp|mediump|lowp)\s+float\s*;\s*")
        .expect("precision pattern");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    High,
    Medium,
    Low,
}

impl Precision {
    const QUALIFIERS: [(&'static str, Precision); 3] = [
        ("highp", Precision::High),
        ("mediump", Precision::Medium),
        ("lowp", Precision::Low),
    ];

    pub fn from_qualifier(qualifier: &str) -> Option<Precision> {
        Self::QUALIFIERS
            .iter()
            .find(|(name, _)| *name == qualifier)
            .map(|(_, precision)| *precision)
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let qualifier = match self {
            Precision::High => "highp",
            Precision::Medium => "mediump",
            Precision::Low => "lowp",
        };
        f.write_str(qualifier)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expanded {
    pub source: String,
    /// Libraries in the order their bodies were emitted.
    pub libraries: Vec<String>,
}

/// Expands `#import("name")` directives against a library table.
///
/// Every library is emitted at most once per call, after the libraries it imports,
/// and ahead of the main source. Unknown names are logged and dropped.
pub struct ShaderPreprocessor<'a> {
    libraries: &'a LibraryTable,
}

impl ShaderPreprocessor<'static> {
    pub fn new() -> Self {
        Self::with_libraries(LibraryTable::builtin())
    }
}

impl<'a> ShaderPreprocessor<'a> {
    pub fn with_libraries(libraries: &'a LibraryTable) -> Self {
        Self { libraries }
    }

    pub fn process(&self, source: &str) -> String {
        self.expand(source).source
    }

    pub fn expand(&self, source: &str) -> Expanded {
        let (precision, stripped) = strip_precision(source);
        let mut walk = ImportWalk {
            libraries: self.libraries,
            seen: HashSet::new(),
            bodies: Vec::new(),
        };
        let main = walk.resolve(&stripped);

        let mut output = String::new();
        if precision.is_some() || !walk.bodies.is_empty() {
            let precision = precision.unwrap_or(Precision::High);
            output.push_str(&format!("precision {} float;\n\n", precision));
        }
        for (name, body) in walk.bodies.iter() {
            output.push_str(&format!("// ===== Library: {} =====\n{}\n\n", name, body));
        }
        output.push_str(&main);

        Expanded {
            source: output,
            libraries: walk.bodies.into_iter().map(|(name, _)| name).collect(),
        }
    }
}

impl Default for ShaderPreprocessor<'static> {
    fn default() -> Self {
        Self::new()
    }
}

struct ImportWalk<'a> {
    libraries: &'a LibraryTable,
    seen: HashSet<String>,
    bodies: Vec<(String, String)>,
}

impl<'a> ImportWalk<'a> {
    fn resolve(&mut self, source: &str) -> String {
        IMPORT_PATTERN
            .replace_all(source, |caps: &Captures| {
                if let Some(path) = caps.get(1) {
                    self.include(library_name(path.as_str()));
                }
                String::new()
            })
            .into_owned()
    }

    fn include(&mut self, name: &str) {
        if !self.seen.insert(name.to_string()) {
            return;
        }
        let libraries = self.libraries;
        match libraries.get(name) {
            Some(body) => {
                let body = self.resolve(body);
                log::trace!("Expanded library {}", name);
                self.bodies.push((name.to_string(), body));
            },
            None => log::warn!("Library not found: {}", name),
        }
    }
}

/// Removes every float precision declaration, keeping the qualifier of the first one.
pub fn strip_precision(source: &str) -> (Option<Precision>, String) {
    let first = PRECISION_PATTERN
        .captures(source)
        .and_then(|caps| caps.get(1))
        .and_then(|qualifier| Precision::from_qualifier(qualifier.as_str()));
    (first, PRECISION_PATTERN.replace_all(source, "").into_owned())
}

/// `"./libs/random.glsl"`, `"libs\\random"` and `"random"` all name `random`.
pub fn library_name(path: &str) -> &str {
    let segment = path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path);
    if segment.is_empty() {
        return path;
    }
    match segment.strip_suffix(LIBRARY_EXTENSION) {
        Some(stem) if !stem.is_empty() => stem,
        _ => segment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LibraryTable {
        LibraryTable::from_pairs(vec![
            ("random", "float rnd(float x) { return fract(sin(x) * 43758.5); }"),
            ("noise", "#import(\"random\")\nfloat noise(float x) { return rnd(x); }"),
            ("fbm", "#import('noise')\n#import(\"random\")\nfloat fbm(float x) { return noise(x); }"),
            ("loop", "#import(\"loop\")\nfloat loopy() { return 1.0; }"),
            ("ping", "#import(\"pong\")\nfloat ping() { return 1.0; }"),
            ("pong", "#import(\"ping\")\nfloat pong() { return 2.0; }"),
        ])
    }

    fn occurrences(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn import_is_replaced_by_library_body() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let main = "void main(){ r = rnd(1.0); }";
        let out = pre.process(&format!("#import(\"random\")\n{}", main));
        assert_eq!(
            out,
            format!(
                "precision highp float;\n\n// ===== Library: random =====\n{}\n\n\n{}",
                libs.get("random").unwrap(),
                main));
        assert_eq!(occurrences(&out, "float rnd("), 1);
        assert!(!out.contains("#import"));
    }

    #[test]
    fn dependencies_precede_dependents_and_appear_once() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let expanded = pre.expand("#import(\"fbm\")\n#import(\"noise\")\nvoid main() {}");
        assert_eq!(expanded.libraries, vec!["random", "noise", "fbm"]);
        let out = &expanded.source;
        for body in &["float rnd(", "float noise(", "float fbm("] {
            assert_eq!(occurrences(out, body), 1, "{} duplicated", body);
        }
        let random = out.find("float rnd(").unwrap();
        let noise = out.find("float noise(").unwrap();
        let fbm = out.find("float fbm(").unwrap();
        let main = out.find("void main()").unwrap();
        assert!(random < noise && noise < fbm && fbm < main);
    }

    #[test]
    fn self_and_mutual_imports_terminate() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let expanded = pre.expand("#import(\"loop\")\n#import(\"ping\")\nvoid main() {}");
        assert_eq!(expanded.libraries, vec!["loop", "pong", "ping"]);
        assert_eq!(occurrences(&expanded.source, "float loopy()"), 1);
        assert!(!expanded.source.contains("#import"));
    }

    #[test]
    fn unknown_import_is_dropped() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let out = pre.expand("precision mediump float;\n#import(\"nope\")\nvoid main() { gl_FragColor = vec4(1.0); }");
        assert!(out.libraries.is_empty());
        assert_eq!(out.source, "precision mediump float;\n\n\nvoid main() { gl_FragColor = vec4(1.0); }");
    }

    #[test]
    fn no_precision_and_no_libraries_leaves_source_alone() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let source = "void main() { gl_FragColor = vec4(0.0); }";
        assert_eq!(pre.process(source), source);
    }

    #[test]
    fn every_precision_declaration_is_hoisted_once() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let out = pre.process("precision lowp float;\nprecision   highp  float ;\n#import(\"random\")\nvoid main() {}");
        assert!(out.starts_with("precision lowp float;\n\n"));
        assert_eq!(occurrences(&out, "precision"), 1);
    }

    #[test]
    fn library_precision_is_not_touched() {
        let libs = LibraryTable::from_pairs(vec![("p", "precision mediump float;\nfloat p;")]);
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let out = pre.process("#import(\"p\")\nvoid main() {}");
        assert!(out.starts_with("precision highp float;\n\n"));
        assert!(out.contains("precision mediump float;\nfloat p;"));
    }

    fn import_path(directive: &str) -> Option<(usize, &str)> {
        let caps = IMPORT_PATTERN.captures(directive)?;
        Some((caps.get(0)?.end(), caps.get(1)?.as_str()))
    }

    #[test]
    fn directive_grammar() {
        assert_eq!(import_path("#import ( 'a.glsl' )x"), Some((20, "a.glsl")));
        assert_eq!(import_path("#import(\"a\")"), Some((12, "a")));
        assert_eq!(import_path("#import(a)"), None);
        assert_eq!(import_path("#import(\"\")"), None);
        assert_eq!(import_path("#import(\"a\""), None);
    }

    #[test]
    fn directives_inside_a_line_are_expanded() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let expanded = pre.expand("float a; #import( \"./libs/random.glsl\" ) float b;");
        assert_eq!(expanded.libraries, vec!["random"]);
        assert!(expanded.source.ends_with("float a;  float b;"));
    }

    #[test]
    fn malformed_directives_are_left_in_place() {
        let libs = table();
        let pre = ShaderPreprocessor::with_libraries(&libs);
        let source = "#import(random)\nvoid main() {}";
        assert_eq!(pre.process(source), source);
    }

    #[test]
    fn precision_grammar() {
        assert_eq!(strip_precision("precision highp float;\nx").0, Some(Precision::High));
        assert_eq!(strip_precision("precision highp float;\nx").1, "x");
        assert_eq!(strip_precision("precisionhighp float;").0, None);
        assert_eq!(strip_precision("precision highp int;").0, None);
        assert_eq!(strip_precision("precision mediumpfloat;").0, None);
    }

    #[test]
    fn library_names_from_paths() {
        assert_eq!(library_name("random"), "random");
        assert_eq!(library_name("./random.glsl"), "random");
        assert_eq!(library_name("libs/simplex"), "simplex");
        assert_eq!(library_name("libs\\value-noise.glsl"), "value-noise");
        assert_eq!(library_name(".glsl"), ".glsl");
        assert_eq!(library_name("libs/"), "libs/");
    }

    #[test]
    fn builtin_libraries_expand() {
        let pre = ShaderPreprocessor::new();
        let expanded = pre.expand("#import(\"fbm\")\n#import(\"applyLighting\")\nvoid main() {}");
        assert_eq!(
            expanded.libraries,
            vec!["random", "value-noise", "fbm", "celShading", "rimLight", "applyLighting"]);
    }
}
