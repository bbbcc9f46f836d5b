use egui::Color32;

/// X11 names used by the backend palette, plus a few common ones.
const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("darkorange", [255, 140, 0]),
    ("gray", [190, 190, 190]),
    ("grey", [190, 190, 190]),
    ("lightgray", [211, 211, 211]),
    ("lightgrey", [211, 211, 211]),
    ("lightblue", [173, 216, 230]),
    ("lightskyblue", [135, 206, 250]),
    ("steelblue", [70, 130, 180]),
    ("lightyellow", [255, 255, 224]),
    ("lightpink", [255, 182, 193]),
    ("lightgreen", [144, 238, 144]),
    ("firebrick", [178, 34, 34]),
    ("purple", [160, 32, 240]),
];

/// Parses a DOT color value. Color lists (`red:blue`) resolve to their first entry.
pub fn parse_color(value: &str) -> Option<Color32> {
    let first = value.split(':').next()?.trim();
    let first = first.split(';').next()?.trim();
    if first.eq_ignore_ascii_case("transparent") || first.eq_ignore_ascii_case("none") {
        return Some(Color32::TRANSPARENT);
    }
    if first.starts_with('#') {
        return parse_hex(first);
    }
    let lower = first.to_ascii_lowercase();
    let found = NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, [r, g, b])| Color32::from_rgb(*r, *g, *b));
    if found.is_none() {
        log::debug!("unknown color '{value}'");
    }
    found
}

/// DOT only has the long `#rrggbb` and `#rrggbbaa` forms.
fn parse_hex(hex: &str) -> Option<Color32> {
    if !matches!(hex.len(), 7 | 9) {
        return None;
    }
    Color32::from_hex(hex).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_and_names() {
        assert_eq!(parse_color("#90ee90"), Some(Color32::from_rgb(144, 238, 144)));
        assert_eq!(parse_color("LightBlue"), Some(Color32::from_rgb(173, 216, 230)));
        assert_eq!(parse_color("lightgrey"), parse_color("lightgray"));
        assert_eq!(parse_color("red:blue"), Some(Color32::from_rgb(255, 0, 0)));
        assert_eq!(parse_color("transparent"), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn test_parse_hex_alpha() {
        assert_eq!(
            parse_color("#ff000080"),
            Some(Color32::from_rgba_unmultiplied(255, 0, 0, 128))
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("#fff"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
        assert_eq!(parse_color("no-such-color"), None);
    }
}
