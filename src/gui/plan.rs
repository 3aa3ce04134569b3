use crate::{exercise::{Exercise, UniformKind}, uniform::{UniformEdit, UniformValue}};

/// Widget shape chosen for one uniform.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlKind {
    Slider { min: f32, max: f32, step: f32 },
    Color,
    Pair { min: [f32; 2], max: [f32; 2], step: f32 },
    Checkbox,
    Dropdown { options: Vec<(String, f32)> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlSpec {
    pub name: String,
    pub label: String,
    pub kind: ControlKind,
}

/// What a widget shows. Colours are displayed on the 0-255 scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayValue {
    Number(f32),
    Rgb([f32; 3]),
    Pair([f32; 2]),
    Flag(bool),
    Choice(f32),
}

/// One control per GUI-enabled uniform, in declaration order. Textures never get one.
pub fn plan_controls(exercise: &Exercise) -> Vec<ControlSpec> {
    exercise
        .uniforms
        .iter()
        .filter(|(_, def)| def.gui)
        .filter_map(|(name, def)| {
            let kind = match &def.kind {
                UniformKind::Float { .. } => {
                    let (min, max, step) = def.kind.float_range();
                    ControlKind::Slider { min, max, step }
                },
                UniformKind::Color { .. } => ControlKind::Color,
                UniformKind::Vec2 { .. } => {
                    let (min, max, step) = def.kind.vec2_range();
                    ControlKind::Pair { min, max, step }
                },
                UniformKind::Bool { .. } => ControlKind::Checkbox,
                UniformKind::Select { options, .. } => ControlKind::Dropdown {
                    options: options
                        .iter()
                        .enumerate()
                        .map(|(i, o)| (o.label(i), o.value(i)))
                        .collect(),
                },
                UniformKind::Texture { .. } => return None,
            };
            Some(ControlSpec {
                name: name.to_string(),
                label: def.label.clone().unwrap_or_else(|| name.to_string()),
                kind,
            })
        })
        .collect()
}

pub fn display_value(kind: &ControlKind, value: &UniformValue) -> Option<DisplayValue> {
    let shown = match (kind, value) {
        (ControlKind::Slider { .. }, UniformValue::Float(v)) => DisplayValue::Number(*v),
        (ControlKind::Checkbox, UniformValue::Float(v)) => DisplayValue::Flag(*v > 0.5),
        (ControlKind::Dropdown { .. }, UniformValue::Float(v)) => DisplayValue::Choice(*v),
        (ControlKind::Color, UniformValue::Vec3([r, g, b])) => DisplayValue::Rgb([r * 255., g * 255., b * 255.]),
        (ControlKind::Pair { .. }, UniformValue::Vec2(v)) => DisplayValue::Pair(*v),
        _ => return None,
    };
    Some(shown)
}

/// Inverse of `display_value`.
pub fn edit_from_display(kind: &ControlKind, shown: &DisplayValue) -> Option<UniformEdit> {
    let value = match (kind, shown) {
        (ControlKind::Slider { .. }, DisplayValue::Number(v)) => UniformValue::Float(*v),
        (ControlKind::Checkbox, DisplayValue::Flag(on)) => UniformValue::Float(if *on { 1. } else { 0. }),
        (ControlKind::Dropdown { .. }, DisplayValue::Choice(v)) => UniformValue::Float(*v),
        (ControlKind::Color, DisplayValue::Rgb([r, g, b])) => UniformValue::Vec3([r / 255., g / 255., b / 255.]),
        (ControlKind::Pair { .. }, DisplayValue::Pair(v)) => UniformValue::Vec2(*v),
        _ => return None,
    };
    Some(UniformEdit::Set(value))
}

/// Edit for one slider of a vec2 folder.
pub fn component_edit(index: usize, value: f32) -> UniformEdit {
    UniformEdit::Component(index, value)
}

pub fn rgb_to_hex(rgb: [f32; 3]) -> String {
    let channel = |c: f32| c.round().max(0.).min(255.) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(rgb[0]), channel(rgb[1]), channel(rgb[2]))
}

pub fn hex_to_rgb(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let mut rgb = [0.; 3];
    for (i, slot) in rgb.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()? as f32;
    }
    Some(rgb)
}

/// Text used as the `value` attribute of a dropdown option.
pub fn format_choice(value: f32) -> String {
    value.to_string()
}

pub fn parse_number(text: &str) -> Option<f32> {
    text.trim().parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::{SelectOption, UniformDef, UniformDefs};

    fn exercise() -> Exercise {
        let mut uniforms = UniformDefs::new();
        uniforms.insert("u_speed", UniformDef {
            kind: UniformKind::Float { value: 1., min: None, max: Some(4.), step: None },
            gui: true,
            label: Some("Speed".to_string()),
        });
        uniforms.insert("u_image", UniformDef {
            kind: UniformKind::Texture { value: Some("a.png".to_string()) },
            gui: true,
            label: None,
        });
        uniforms.insert("u_hidden", UniformDef { kind: UniformKind::Bool { value: true }, gui: false, label: None });
        uniforms.insert("u_tint", UniformDef { kind: UniformKind::Color { value: [1., 0., 0.] }, gui: true, label: None });
        uniforms.insert("u_mode", UniformDef {
            kind: UniformKind::Select {
                value: 0.,
                options: vec![
                    SelectOption::Label("Flat".to_string()),
                    SelectOption::Entry { label: Some("Deep".to_string()), value: Some(4.) },
                ],
            },
            gui: true,
            label: Some("Mode".to_string()),
        });
        uniforms.insert("u_offset", UniformDef {
            kind: UniformKind::Vec2 { value: [0., 0.], min: Some([-1., -2.]), max: None, step: Some(0.5) },
            gui: true,
            label: None,
        });
        uniforms.insert("u_invert", UniformDef { kind: UniformKind::Bool { value: false }, gui: true, label: None });
        Exercise { id: "plan".to_string(), name: "Plan".to_string(), uniforms, ..Exercise::default() }
    }

    #[test]
    fn plan_skips_hidden_and_textures_in_order() {
        let plan = plan_controls(&exercise());
        let names: Vec<&str> = plan.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["u_speed", "u_tint", "u_mode", "u_offset", "u_invert"]);
        assert_eq!(plan[0].label, "Speed");
        assert_eq!(plan[1].label, "u_tint");
        assert_eq!(plan[0].kind, ControlKind::Slider { min: 0., max: 4., step: 0.01 });
        assert_eq!(plan[2].kind, ControlKind::Dropdown { options: vec![("Flat".to_string(), 0.), ("Deep".to_string(), 4.)] });
        assert_eq!(plan[3].kind, ControlKind::Pair { min: [-1., -2.], max: [1., 1.], step: 0.5 });
        assert_eq!(plan[4].kind, ControlKind::Checkbox);
    }

    #[test]
    fn colours_display_on_byte_scale() {
        let shown = display_value(&ControlKind::Color, &UniformValue::Vec3([1., 0.5, 0.])).unwrap();
        assert_eq!(shown, DisplayValue::Rgb([255., 127.5, 0.]));
        assert_eq!(
            edit_from_display(&ControlKind::Color, &DisplayValue::Rgb([255., 0., 51.])),
            Some(UniformEdit::Set(UniformValue::Vec3([1., 0., 0.2]))));
    }

    #[test]
    fn checkbox_maps_to_zero_or_one() {
        assert_eq!(display_value(&ControlKind::Checkbox, &UniformValue::Float(1.)), Some(DisplayValue::Flag(true)));
        assert_eq!(display_value(&ControlKind::Checkbox, &UniformValue::Float(0.)), Some(DisplayValue::Flag(false)));
        assert_eq!(
            edit_from_display(&ControlKind::Checkbox, &DisplayValue::Flag(true)),
            Some(UniformEdit::Set(UniformValue::Float(1.))));
    }

    #[test]
    fn mismatched_shapes_are_refused() {
        assert_eq!(display_value(&ControlKind::Color, &UniformValue::Float(1.)), None);
        assert_eq!(edit_from_display(&ControlKind::Checkbox, &DisplayValue::Number(1.)), None);
        assert_eq!(display_value(&ControlKind::Checkbox, &UniformValue::Texture(None)), None);
    }

    #[test]
    fn hex_colours() {
        assert_eq!(rgb_to_hex([255., 127.5, 0.]), "#ff8000");
        assert_eq!(rgb_to_hex([300., -4., 16.]), "#ff0010");
        assert_eq!(hex_to_rgb("#ff8000"), Some([255., 128., 0.]));
        assert_eq!(hex_to_rgb("ff8000"), Some([255., 128., 0.]));
        assert_eq!(hex_to_rgb("#ff80"), None);
        assert_eq!(hex_to_rgb("#gg0000"), None);
    }

    #[test]
    fn choices_and_numbers_parse_back() {
        assert_eq!(parse_number(&format_choice(4.)), Some(4.));
        assert_eq!(parse_number(&format_choice(0.25)), Some(0.25));
        assert_eq!(parse_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(component_edit(1, 0.5), UniformEdit::Component(1, 0.5));
    }
}
