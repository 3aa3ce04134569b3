use thiserror::Error;
use wasm_bindgen::JsValue;


pub type LabResult<T> = Result<T, LabError>;

#[derive(Error, Debug)]
pub enum LabError {
    #[error("Missing value: {0}")]
    MissingVal(String),
    #[error("Exercise {0} must have either fragSource or fragPath")]
    MissingSource(String),
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),
    #[error("Failed to compile {stage} shader: {log}")]
    ShaderCompile { stage: &'static str, log: String },
    #[error("Failed to link program: {log}")]
    ShaderLink { log: String },
    #[error("Shader template slot `{slot}` appears {count} times, expected exactly once")]
    TemplateSlot { slot: &'static str, count: usize },
    #[error("Unknown shader template slot `{0}`")]
    UnknownSlot(String),
    #[error("Load of {0} was superseded by a newer request")]
    StaleLoad(String),
    #[error("Fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Bad json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Javascript error: {0}")]
    Js(String),
}

impl LabError {
    pub fn missing_val<S: AsRef<str>>(msg: S) -> Self {
        Self::MissingVal(msg.as_ref().to_string())
    }
}

impl From<JsValue> for LabError {
    fn from(val: JsValue) -> Self {
        Self::Js(format!("{:?}", val))
    }
}

impl From<LabError> for JsValue {
    fn from(val: LabError) -> Self {
        let msg = format!("{}", val);
        JsValue::from_str(&msg[..])
    }
}
