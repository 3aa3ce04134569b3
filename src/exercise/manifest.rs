use serde::{de::{MapAccess, Visitor}, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

// Shared with build.rs through include!, so nothing in here may reach into the crate.

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frag_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frag_path: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<ShaderInjection>,
    #[serde(default)]
    pub uniforms: UniformDefs,
}

#[allow(dead_code)]
impl Exercise {
    /// Text for the info panel: the description when there is one, the name otherwise.
    pub fn summary(&self) -> &str {
        match &self.description {
            Some(description) if !description.is_empty() => description,
            _ => &self.name,
        }
    }

    pub fn inline_source(&self) -> Option<&str> {
        self.frag_source.as_deref().filter(|s| !s.is_empty())
    }

    pub fn source_path(&self) -> Option<&str> {
        self.frag_path.as_deref().filter(|s| !s.is_empty())
    }
}

/// Code spliced into the named slots of a shader template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderInjection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prelude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epilogue: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformDef {
    #[serde(flatten)]
    pub kind: UniformKind,
    #[serde(default)]
    pub gui: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UniformKind {
    Float {
        #[serde(default)]
        value: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f32>,
    },
    Bool {
        #[serde(default)]
        value: bool,
    },
    Color {
        #[serde(default = "default_color")]
        value: [f32; 3],
    },
    Vec2 {
        #[serde(default)]
        value: [f32; 2],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<[f32; 2]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<[f32; 2]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f32>,
    },
    #[serde(alias = "enum")]
    Select {
        #[serde(default)]
        value: f32,
        #[serde(default)]
        options: Vec<SelectOption>,
    },
    Texture {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

fn default_color() -> [f32; 3] {
    [1., 1., 1.]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectOption {
    Label(String),
    Entry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f32>,
    },
}

#[allow(dead_code)]
impl SelectOption {
    pub fn label(&self, index: usize) -> String {
        match self {
            SelectOption::Label(label) => label.clone(),
            SelectOption::Entry { label: Some(label), .. } => label.clone(),
            SelectOption::Entry { label: None, value } => {
                value.map(|v| v.to_string()).unwrap_or_else(|| index.to_string())
            },
        }
    }

    /// Options without an explicit value stand for their position in the list.
    pub fn value(&self, index: usize) -> f32 {
        match self {
            SelectOption::Entry { value: Some(value), .. } => *value,
            _ => index as f32,
        }
    }
}

/// Uniform definitions in manifest declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformDefs(Vec<(String, UniformDef)>);

#[allow(dead_code)]
impl UniformDefs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, def: UniformDef) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = def,
            None => self.0.push((name, def)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformDef> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformDef)> {
        self.0.iter().map(|(n, d)| (n.as_str(), d))
    }
}

impl<'de> Deserialize<'de> for UniformDefs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DefsVisitor;

        impl<'de> Visitor<'de> for DefsVisitor {
            type Value = UniformDefs;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of uniform definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut defs = UniformDefs::new();
                while let Some((name, def)) = map.next_entry::<String, UniformDef>()? {
                    defs.insert(name, def);
                }
                Ok(defs)
            }
        }

        deserializer.deserialize_map(DefsVisitor)
    }
}

impl Serialize for UniformDefs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, def) in self.0.iter() {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

#[allow(dead_code)]
pub fn parse_manifest(json: &str) -> Result<Vec<Exercise>, serde_json::Error> {
    serde_json::from_str(json)
}
