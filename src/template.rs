use crate::{error::{LabError, LabResult}, exercise::ShaderInjection};

const SLOT_MARKER: &str = "#slot";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Header,
    Prelude,
    Epilogue,
}

impl Slot {
    const ALL: [Slot; 3] = [Slot::Header, Slot::Prelude, Slot::Epilogue];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Header => "header",
            Slot::Prelude => "prelude",
            Slot::Epilogue => "epilogue",
        }
    }

    fn from_name(name: &str) -> Option<Slot> {
        Slot::ALL.iter().copied().find(|slot| slot.name() == name)
    }

    fn pick(self, injection: &ShaderInjection) -> Option<&str> {
        match self {
            Slot::Header => injection.header.as_deref(),
            Slot::Prelude => injection.prelude.as_deref(),
            Slot::Epilogue => injection.epilogue.as_deref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Part {
    Text(String),
    Slot(Slot),
}

/// Shader source with `#slot header`, `#slot prelude` and `#slot epilogue` marker lines.
///
/// Each marker must appear exactly once. Rendering swaps the marker lines for the
/// injected code, so nothing depends on the surrounding code staying textually stable.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderTemplate {
    parts: Vec<Part>,
}

impl ShaderTemplate {
    pub fn parse(source: &str) -> LabResult<Self> {
        let mut parts = Vec::new();
        let mut text = String::new();
        for line in source.split_inclusive('\n') {
            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix(SLOT_MARKER) {
                let name = name.trim();
                let slot = Slot::from_name(name).ok_or_else(|| LabError::UnknownSlot(name.to_string()))?;
                if !text.is_empty() {
                    parts.push(Part::Text(std::mem::take(&mut text)));
                }
                parts.push(Part::Slot(slot));
            } else {
                text.push_str(line);
            }
        }
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }

        for slot in Slot::ALL.iter().copied() {
            let count = parts.iter().filter(|p| **p == Part::Slot(slot)).count();
            if count != 1 {
                return Err(LabError::TemplateSlot { slot: slot.name(), count });
            }
        }
        Ok(Self { parts })
    }

    pub fn render(&self, injection: &ShaderInjection) -> String {
        let mut output = String::new();
        for part in self.parts.iter() {
            match part {
                Part::Text(text) => output.push_str(text),
                Part::Slot(slot) => {
                    if let Some(code) = slot.pick(injection).filter(|c| !c.is_empty()) {
                        output.push_str(code);
                        if !code.ends_with('\n') {
                            output.push('\n');
                        }
                    }
                },
            }
        }
        output
    }
}
