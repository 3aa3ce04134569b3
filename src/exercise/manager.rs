use crate::{
    error::{LabError, LabResult},
    preprocessor::ShaderPreprocessor,
    template::ShaderTemplate,
    uid::Uid,
    uniform::{UniformEdit, UniformSet, UniformValue, U_RESOLUTION, U_TIME},
};
use super::{Exercise, TextSource};
use rand::Rng;
use std::collections::BTreeSet;

/// Fullscreen-triangle vertex stage shared by every exercise.
pub const FULLSCREEN_VERTEX: &str = r#"attribute vec2 position;
varying vec2 vUv;
#slot header

void main() {
    #slot prelude
    vUv = position * 0.5 + 0.5;
    gl_Position = vec4(position, 0.0, 1.0);
    #slot epilogue
}
"#;

/// GPU side of the manager: program and texture lifetimes, and drawing.
pub trait ProgramBackend {
    type Program;

    fn compile(&self, vertex: &str, fragment: &str, uniforms: &UniformSet) -> LabResult<Self::Program>;
    fn release(&self, program: Self::Program);
    /// Returns immediately with a placeholder; the image is filled in once it arrives.
    fn create_texture(&self, url: &str) -> Uid;
    fn release_texture(&self, id: Uid);
    fn canvas_size(&self) -> (u32, u32);
    fn draw(&self, program: &Self::Program, uniforms: &UniformSet);
}

pub struct LoadedExercise<P> {
    pub program: P,
    pub uniforms: UniformSet,
    pub frag_source: String,
    pub exercise: Exercise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

pub struct ShaderExerciseManager<B: ProgramBackend> {
    backend: B,
    vertex_template: ShaderTemplate,
    preprocessor: ShaderPreprocessor<'static>,
    current: Option<LoadedExercise<B::Program>>,
    next_ticket: u64,
    pending: BTreeSet<u64>,
    installed_ticket: u64,
}

/// Fetches the fragment source of an exercise: inline text first, then its path.
pub async fn resolve_fragment<S: TextSource + ?Sized>(exercise: &Exercise, source: &S) -> LabResult<String> {
    if let Some(inline) = exercise.inline_source() {
        return Ok(inline.to_string());
    }
    match exercise.source_path() {
        Some(path) => source.fetch_text(path).await,
        None => Err(LabError::MissingSource(exercise.id.clone())),
    }
}

impl<B: ProgramBackend> ShaderExerciseManager<B> {
    pub fn new(backend: B) -> LabResult<Self> {
        Ok(Self::with_parts(backend, ShaderTemplate::parse(FULLSCREEN_VERTEX)?, ShaderPreprocessor::new()))
    }

    pub fn with_parts(backend: B, vertex_template: ShaderTemplate, preprocessor: ShaderPreprocessor<'static>) -> Self {
        Self {
            backend,
            vertex_template,
            preprocessor,
            current: None,
            next_ticket: 0,
            pending: BTreeSet::new(),
            installed_ticket: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current(&self) -> Option<&LoadedExercise<B::Program>> {
        self.current.as_ref()
    }

    /// Marks the start of a load. A ticket may install unless a newer one is still
    /// pending or has already installed.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.next_ticket += 1;
        self.pending.insert(self.next_ticket);
        LoadTicket(self.next_ticket)
    }

    /// Withdraws a load that will never install, so it no longer holds back older ones.
    pub fn abandon(&mut self, ticket: LoadTicket) {
        self.pending.remove(&ticket.0);
    }

    fn is_stale(&self, ticket: LoadTicket) -> bool {
        ticket.0 < self.installed_ticket || self.pending.iter().next_back().map_or(false, |newest| *newest > ticket.0)
    }

    pub async fn load_exercise<S: TextSource + ?Sized>(
        &mut self,
        exercise: &Exercise,
        source: &S,
    ) -> LabResult<&LoadedExercise<B::Program>> {
        let ticket = self.begin_load();
        let fragment = match resolve_fragment(exercise, source).await {
            Ok(fragment) => fragment,
            Err(e) => {
                self.abandon(ticket);
                return Err(e);
            },
        };
        match self.install(ticket, exercise, &fragment)? {
            Some(loaded) => Ok(loaded),
            None => Err(LabError::StaleLoad(exercise.id.clone())),
        }
    }

    /// Compiles `fragment` for `exercise` and makes it current.
    ///
    /// Returns `Ok(None)` without touching anything when a newer load is still pending or
    /// has already installed. On a compile error the previous exercise stays current.
    pub fn install(
        &mut self,
        ticket: LoadTicket,
        exercise: &Exercise,
        fragment: &str,
    ) -> LabResult<Option<&LoadedExercise<B::Program>>> {
        self.pending.remove(&ticket.0);
        if self.is_stale(ticket) {
            log::debug!("Dropping stale load of {}", exercise.id);
            return Ok(None);
        }
        let expanded = self.preprocessor.expand(fragment);
        log::debug!("{}: included libraries {:?}", exercise.id, expanded.libraries);

        let backend = &self.backend;
        let mut uniforms = UniformSet::build(&exercise.uniforms, |url| backend.create_texture(url));
        let (width, height) = backend.canvas_size();
        uniforms.insert(U_TIME, UniformValue::Float(0.));
        uniforms.set_resolution(width, height);

        let vertex = self.vertex_template.render(&exercise.vertex.clone().unwrap_or_default());
        let program = match backend.compile(&vertex, &expanded.source, &uniforms) {
            Ok(program) => program,
            Err(e) => {
                for id in uniforms.textures() {
                    backend.release_texture(id);
                }
                return Err(e);
            },
        };

        if let Some(previous) = self.current.take() {
            self.release(previous);
        }
        log::info!("Loaded exercise {}", exercise.id);
        self.installed_ticket = ticket.0;
        self.current = Some(LoadedExercise {
            program,
            uniforms,
            frag_source: expanded.source,
            exercise: exercise.clone(),
        });
        Ok(self.current.as_ref())
    }

    pub fn update(&mut self, dt: f32) {
        if let Some(current) = self.current.as_mut() {
            current.uniforms.advance_time(dt);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(current) = self.current.as_mut() {
            current.uniforms.set_resolution(width, height);
        }
    }

    pub fn reset(&mut self) {
        if let Some(current) = self.current.as_mut() {
            current.uniforms.reset(&current.exercise.uniforms);
        }
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(current) = self.current.as_mut() {
            current.uniforms.randomize(&current.exercise.uniforms, rng);
        }
    }

    pub fn apply_edit(&mut self, name: &str, edit: &UniformEdit) -> bool {
        match self.current.as_mut() {
            Some(current) => current.uniforms.apply_edit(name, edit),
            None => false,
        }
    }

    pub fn render(&self) {
        if let Some(current) = self.current.as_ref() {
            self.backend.draw(&current.program, &current.uniforms);
        }
    }

    pub fn dispose(&mut self) {
        if let Some(current) = self.current.take() {
            self.release(current);
        }
    }

    fn release(&self, loaded: LoadedExercise<B::Program>) {
        for id in loaded.uniforms.textures() {
            self.backend.release_texture(id);
        }
        self.backend.release(loaded.program);
    }
}

impl<B: ProgramBackend> Drop for ShaderExerciseManager<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::{ShaderInjection, UniformDef, UniformKind};
    use futures::{executor::block_on, future::{FutureExt, LocalBoxFuture}};
    use rand::{rngs::StdRng, SeedableRng};
    use std::{cell::RefCell, collections::HashMap, rc::Rc};

    #[derive(Default)]
    struct Log {
        compiled: Vec<(String, String)>,
        released: Vec<u32>,
        textures: Vec<Uid>,
        released_textures: Vec<Uid>,
        draws: usize,
    }

    #[derive(Clone, Default)]
    struct RecordingBackend {
        log: Rc<RefCell<Log>>,
        fail_on: Option<&'static str>,
    }

    impl ProgramBackend for RecordingBackend {
        type Program = u32;

        fn compile(&self, vertex: &str, fragment: &str, _uniforms: &UniformSet) -> LabResult<u32> {
            if let Some(marker) = self.fail_on {
                if fragment.contains(marker) {
                    return Err(LabError::ShaderCompile { stage: "fragment", log: "boom".to_string() });
                }
            }
            let mut log = self.log.borrow_mut();
            log.compiled.push((vertex.to_string(), fragment.to_string()));
            Ok(log.compiled.len() as u32)
        }

        fn release(&self, program: u32) {
            self.log.borrow_mut().released.push(program);
        }

        fn create_texture(&self, _url: &str) -> Uid {
            let id = Uid::new();
            self.log.borrow_mut().textures.push(id);
            id
        }

        fn release_texture(&self, id: Uid) {
            self.log.borrow_mut().released_textures.push(id);
        }

        fn canvas_size(&self) -> (u32, u32) {
            (800, 600)
        }

        fn draw(&self, _program: &u32, _uniforms: &UniformSet) {
            self.log.borrow_mut().draws += 1;
        }
    }

    struct Files(HashMap<&'static str, &'static str>);

    impl TextSource for Files {
        fn fetch_text<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, LabResult<String>> {
            let result = self.0
                .get(path)
                .map(|s| s.to_string())
                .ok_or_else(|| LabError::missing_val(path));
            async move { result }.boxed_local()
        }
    }

    fn files() -> Files {
        let mut files = HashMap::new();
        files.insert("shaders/noise.frag", "#import(\"random\")\nvoid main() { gl_FragColor = vec4(rnd(1.0)); }");
        Files(files)
    }

    fn exercise(id: &str, source: &str) -> Exercise {
        let mut uniforms = crate::exercise::UniformDefs::new();
        uniforms.insert("u_scale", UniformDef {
            kind: UniformKind::Float { value: 3., min: Some(0.), max: Some(10.), step: None },
            gui: true,
            label: None,
        });
        uniforms.insert("u_tint", UniformDef { kind: UniformKind::Color { value: [0.2, 0.4, 0.6] }, gui: true, label: None });
        Exercise {
            id: id.to_string(),
            name: id.to_string(),
            frag_source: Some(source.to_string()),
            uniforms,
            ..Exercise::default()
        }
    }

    fn manager() -> (ShaderExerciseManager<RecordingBackend>, Rc<RefCell<Log>>) {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        (ShaderExerciseManager::new(backend).unwrap(), log)
    }

    #[test]
    fn load_builds_uniforms_and_builtins() {
        let (mut manager, log) = manager();
        let loaded = block_on(manager.load_exercise(&exercise("a", "void main() {}"), &files())).unwrap();
        assert_eq!(loaded.uniforms.get("u_scale"), Some(&UniformValue::Float(3.)));
        assert_eq!(loaded.uniforms.get(U_TIME), Some(&UniformValue::Float(0.)));
        assert_eq!(loaded.uniforms.get(U_RESOLUTION), Some(&UniformValue::Vec2([800., 600.])));
        assert_eq!(log.borrow().compiled.len(), 1);
        assert!(log.borrow().compiled[0].0.contains("gl_Position = vec4(position, 0.0, 1.0);"));
        assert!(!log.borrow().compiled[0].0.contains("#slot"));
    }

    #[test]
    fn path_sources_are_fetched_and_preprocessed() {
        let (mut manager, _log) = manager();
        let ex = Exercise {
            id: "noise".to_string(),
            frag_path: Some("shaders/noise.frag".to_string()),
            ..Exercise::default()
        };
        let loaded = block_on(manager.load_exercise(&ex, &files())).unwrap();
        assert!(loaded.frag_source.starts_with("precision highp float;"));
        assert!(loaded.frag_source.contains("// ===== Library: random ====="));
        assert!(!loaded.frag_source.contains("#import"));
    }

    #[test]
    fn missing_source_rejects_and_keeps_previous() {
        let (mut manager, log) = manager();
        block_on(manager.load_exercise(&exercise("a", "void main() {}"), &files())).unwrap();
        let result = block_on(manager.load_exercise(&Exercise::default(), &files()));
        assert!(matches!(result, Err(LabError::MissingSource(_))));
        assert_eq!(manager.current().map(|c| c.exercise.id.as_str()), Some("a"));
        assert!(log.borrow().released.is_empty());
    }

    #[test]
    fn compile_failure_keeps_previous() {
        let backend = RecordingBackend { fail_on: Some("broken"), ..RecordingBackend::default() };
        let log = backend.log.clone();
        let mut manager = ShaderExerciseManager::new(backend).unwrap();
        block_on(manager.load_exercise(&exercise("a", "void main() {}"), &files())).unwrap();

        let mut bad = exercise("b", "void main() { broken }");
        bad.uniforms.insert("u_tex", UniformDef {
            kind: UniformKind::Texture { value: Some("lapin.png".to_string()) },
            gui: false,
            label: None,
        });
        assert!(block_on(manager.load_exercise(&bad, &files())).is_err());
        assert_eq!(manager.current().map(|c| c.exercise.id.as_str()), Some("a"));
        assert_eq!(log.borrow().released_textures, log.borrow().textures);
    }

    #[test]
    fn replacing_releases_previous_program() {
        let (mut manager, log) = manager();
        block_on(manager.load_exercise(&exercise("a", "void main() {}"), &files())).unwrap();
        block_on(manager.load_exercise(&exercise("b", "void main() {}"), &files())).unwrap();
        assert_eq!(log.borrow().released, vec![1]);
        manager.dispose();
        assert_eq!(log.borrow().released, vec![1, 2]);
        assert!(manager.current().is_none());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let (mut manager, log) = manager();
        let first = manager.begin_load();
        let second = manager.begin_load();
        assert!(manager.install(first, &exercise("a", "void main() {}"), "void main() {}").unwrap().is_none());
        assert!(log.borrow().compiled.is_empty());
        assert!(manager.install(second, &exercise("b", "void main() {}"), "void main() {}").unwrap().is_some());
        assert_eq!(manager.current().map(|c| c.exercise.id.as_str()), Some("b"));
    }

    #[test]
    fn failed_newer_load_does_not_block_older_one() {
        let (mut manager, _log) = manager();
        let first = manager.begin_load();
        let second = manager.begin_load();
        manager.abandon(second);
        assert!(manager.install(first, &exercise("a", "void main() {}"), "void main() {}").unwrap().is_some());
        assert_eq!(manager.current().map(|c| c.exercise.id.as_str()), Some("a"));
    }

    #[test]
    fn late_older_completion_does_not_replace_newer() {
        let (mut manager, log) = manager();
        let first = manager.begin_load();
        let second = manager.begin_load();
        assert!(manager.install(second, &exercise("b", "void main() {}"), "void main() {}").unwrap().is_some());
        assert!(manager.install(first, &exercise("a", "void main() {}"), "void main() {}").unwrap().is_none());
        assert_eq!(manager.current().map(|c| c.exercise.id.as_str()), Some("b"));
        assert_eq!(log.borrow().compiled.len(), 1);
    }

    #[test]
    fn missing_source_releases_its_ticket() {
        let (mut manager, _log) = manager();
        let first = manager.begin_load();
        assert!(block_on(manager.load_exercise(&Exercise::default(), &files())).is_err());
        assert!(manager.install(first, &exercise("a", "void main() {}"), "void main() {}").unwrap().is_some());
    }

    #[test]
    fn vertex_injection_is_rendered() {
        let (mut manager, log) = manager();
        let mut ex = exercise("a", "void main() {}");
        ex.vertex = Some(ShaderInjection {
            header: Some("varying float vWave;".to_string()),
            prelude: None,
            epilogue: Some("vWave = position.x;".to_string()),
        });
        block_on(manager.load_exercise(&ex, &files())).unwrap();
        let vertex = log.borrow().compiled[0].0.clone();
        let header = vertex.find("varying float vWave;").unwrap();
        let main = vertex.find("void main()").unwrap();
        let epilogue = vertex.find("vWave = position.x;").unwrap();
        let position = vertex.find("gl_Position").unwrap();
        assert!(header < main && position < epilogue);
    }

    #[test]
    fn clock_resize_reset_and_randomize() {
        let (mut manager, log) = manager();
        manager.update(1.);
        manager.reset();
        manager.render();
        assert_eq!(log.borrow().draws, 0);

        block_on(manager.load_exercise(&exercise("a", "void main() {}"), &files())).unwrap();
        manager.update(0.5);
        manager.update(0.25);
        manager.resize(320, 240);
        let uniforms = &manager.current().unwrap().uniforms;
        assert_eq!(uniforms.time(), 0.75);
        assert_eq!(uniforms.get(U_RESOLUTION), Some(&UniformValue::Vec2([320., 240.])));

        manager.randomize(&mut StdRng::seed_from_u64(3));
        assert!(manager.apply_edit("u_tint", &UniformEdit::Component(0, 0.9)));
        manager.reset();
        let uniforms = &manager.current().unwrap().uniforms;
        assert_eq!(uniforms.time(), 0.);
        assert_eq!(uniforms.get("u_scale"), Some(&UniformValue::Float(3.)));
        assert_eq!(uniforms.get("u_tint"), Some(&UniformValue::Vec3([0.2, 0.4, 0.6])));

        manager.render();
        assert_eq!(log.borrow().draws, 1);
    }
}
