use std::{env, io::{self, Write}, fs::{self, File}, path::{Path, PathBuf}};

include!("src/exercise/manifest.rs");
const LIBRARY_TABLE_NAME: &str = "library_table.rs";
const LIBRARY_SOURCE_PATH: &str = "shaders/libs/";
const LIBRARY_EXTENSION: &str = "glsl";
const MANIFEST_PATH: &str = "exercises/manifest.json";
const DEPLOY_PATH: &str = "www/deploy/";

fn main() {
    let out_dir = env::var_os("OUT_DIR").unwrap();
    let manifest_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap());
    println!("cargo:rerun-if-changed={}", LIBRARY_SOURCE_PATH);
    println!("cargo:rerun-if-changed={}", MANIFEST_PATH);

    let libraries = collect_libraries(&manifest_dir.join(LIBRARY_SOURCE_PATH));
    let mut table_file = create_file(&out_dir, LIBRARY_TABLE_NAME);
    write!(table_file, "const LIBRARY_SOURCES: &[(&str, &str)] = &[\n").unwrap();
    for (name, path) in libraries.iter() {
        write!(table_file, "({:?}, include_str!({:?})),\n", name, path.display().to_string()).unwrap();
    }
    write!(table_file, "];").unwrap();

    let exercises = verify_manifest_format(manifest_dir.join(MANIFEST_PATH));
    let deploy_path = create_directory(manifest_dir.join(DEPLOY_PATH));
    for exercise in exercises.iter() {
        verify_manifest_entry(exercise);
        if let Some(frag_path) = exercise.source_path() {
            println!("cargo:rerun-if-changed={}", frag_path);
            let source = manifest_dir.join(frag_path);
            assert!(source.exists(), "Exercise {} points at missing shader {}", exercise.id, frag_path);
            let dest = deploy_path.join(frag_path);
            create_directory(dest.parent().unwrap());
            fs::copy(&source, dest).expect("Failed to copy");
        }
        for (name, def) in exercise.uniforms.iter() {
            if let UniformKind::Texture { value: Some(asset) } = &def.kind {
                let source = manifest_dir.join(asset);
                if !source.exists() {
                    println!("cargo:warning=Texture {} of {} not found at {}, it will render as a placeholder", name, exercise.id, asset);
                    continue;
                }
                println!("cargo:rerun-if-changed={}", asset);
                let dest = deploy_path.join(asset);
                create_directory(dest.parent().unwrap());
                fs::copy(&source, dest).expect("Failed to copy");
            }
        }
    }
}

fn collect_libraries(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut libraries = Vec::new();
    for item in fs::read_dir(dir).unwrap() {
        let path = item.unwrap().path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(LIBRARY_EXTENSION) {
            continue
        }
        let name = path.file_stem().unwrap().to_str().unwrap().to_string();
        libraries.push((name, path));
    }
    libraries.sort();
    libraries
}

fn create_file<DIR: AsRef<Path>, F: AsRef<Path>>(path: DIR, file_name: F) -> File {
    let dest_path = Path::new(path.as_ref()).join(file_name.as_ref());
    File::create(dest_path).unwrap()
}

fn create_directory<DIR: AsRef<Path>>(path: DIR) -> PathBuf {
    let path = PathBuf::from(path.as_ref());
    match fs::create_dir_all(&path) {
        Err(e) => {
            use io::ErrorKind::*;
            match e.kind() {
                AlreadyExists => path,
                _ => panic!("Failed to create path {:?} - Unexpected io error {}", path, e),
            }
        }
        _ => path,
    }
}

fn verify_manifest_format<S: AsRef<Path>>(path: S) -> Vec<Exercise> {
    assert_eq!(path.as_ref().extension().map(|s| s.to_str()), Some(Some("json")));
    match fs::read_to_string(path) {
        Ok(contents) => {
            parse_manifest(&contents).expect("Failed to parse manifest into exercises!")
        },
        Err(e) => {
            panic!("Couldn't open manifest! {}", e);
        },
    }
}

fn verify_manifest_entry(exercise: &Exercise) {
    assert!(!exercise.id.is_empty(), "Exercise {:?} has no id", exercise.name);
    assert!(
        exercise.inline_source().is_some() || exercise.source_path().is_some(),
        "Exercise {} must have either fragSource or fragPath", exercise.id);
    for (name, def) in exercise.uniforms.iter() {
        if let UniformKind::Select { options, .. } = &def.kind {
            assert!(!options.is_empty(), "Select uniform {} in {} has no options", name, exercise.id);
        }
    }
}
