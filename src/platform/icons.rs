//! Tray icon generation and per-device glyphs.

/// Icon size in pixels.
pub const ICON_SIZE: u32 = 32;

/// Custom icon choices offered per device, with labels.
pub const ICON_CHOICES: &[(&str, &str)] = &[
    ("🎧", "Headphones"),
    ("🔊", "Speakers"),
    ("🖥️", "Monitor"),
    ("📶", "Wireless"),
    ("🔌", "USB Device"),
    ("💻", "Built-in Audio"),
    ("🎵", "Generic Audio"),
    ("🎤", "Microphone"),
    ("📻", "Radio/Receiver"),
    ("📺", "TV/Display"),
    ("🎮", "Gaming Device"),
    ("📱", "Mobile Device"),
    ("🏠", "Home Audio"),
    ("🎼", "Music System"),
    ("🔈", "Volume Low"),
    ("🔉", "Volume Medium"),
    ("🎛️", "Audio Mixer"),
    ("🎚️", "Audio Control"),
];

const FALLBACK_GLYPH: &str = "🎵";

/// Name keywords per glyph, checked in order; first match wins.
const CLASSIFIERS: &[(&str, &[&str])] = &[
    (
        "🎧",
        &[
            "headphone", "headset", "earphone", "earbud", "airpods", "beats", "sony wh", "bose qc",
        ],
    ),
    (
        "🖥️",
        &[
            "monitor", "display", "lg", "samsung", "dell", "asus", "acer", "hdmi", "displayport",
        ],
    ),
    ("📶", &["bluetooth", "wireless", "bt"]),
    ("🔌", &["usb", "gaming", "webcam", "microphone"]),
    (
        "💻",
        &["realtek", "built-in", "internal", "onboard", "motherboard", "integrated"],
    ),
    ("🔊", &["speaker", "logitech", "creative", "jbl", "harman"]),
];

/// Glyph shown next to a device: the user's choice, else a guess from the name.
pub fn device_glyph<'a>(name: &str, custom: Option<&'a str>) -> &'a str {
    if let Some(custom) = custom.filter(|c| !c.is_empty()) {
        return custom;
    }

    let lower = name.to_lowercase();
    CLASSIFIERS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(glyph, _)| *glyph)
        .unwrap_or(FALLBACK_GLYPH)
}

/// Label for a palette glyph.
pub fn glyph_label(glyph: &str) -> Option<&'static str> {
    ICON_CHOICES
        .iter()
        .find(|(g, _)| *g == glyph)
        .map(|(_, label)| *label)
}

/// Speaker-on-circle tray icon as RGBA data.
pub fn generate_speaker_icon() -> Vec<u8> {
    let size = ICON_SIZE as usize;
    let mut rgba = vec![0u8; size * size * 4];

    let center = size as f32 / 2.0;
    let radius = size as f32 / 2.0 - 3.0;
    let (r, g, b) = (50u8, 120u8, 215u8);

    // Filled circle with an anti-aliased rim
    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist < radius {
                rgba[idx] = r;
                rgba[idx + 1] = g;
                rgba[idx + 2] = b;
                rgba[idx + 3] = 255;
            } else if dist < radius + 1.0 {
                let alpha = ((radius + 1.0 - dist) * 255.0) as u8;
                rgba[idx] = r;
                rgba[idx + 1] = g;
                rgba[idx + 2] = b;
                rgba[idx + 3] = alpha;
            }
        }
    }

    draw_speaker_shape(&mut rgba, size);
    rgba
}

/// White speaker: a box plus a cone widening to the right.
fn draw_speaker_shape(rgba: &mut [u8], size: usize) {
    let top = size * 3 / 8;
    let bottom = size * 5 / 8;
    let box_left = size / 4;
    let box_right = box_left + size / 8;
    let cone_right = size * 5 / 8;

    for x in box_left..cone_right {
        // Cone grows one pixel per column past the box
        let spread = x.saturating_sub(box_right);
        let y_start = top.saturating_sub(spread);
        let y_end = (bottom + spread).min(size);

        for y in y_start..y_end {
            let idx = (y * size + x) * 4;
            if rgba[idx + 3] > 0 {
                rgba[idx] = 255;
                rgba[idx + 1] = 255;
                rgba[idx + 2] = 255;
            }
        }
    }
}

#[cfg(windows)]
pub fn create_tray_icon() -> Result<tray_icon::Icon, String> {
    tray_icon::Icon::from_rgba(generate_speaker_icon(), ICON_SIZE, ICON_SIZE)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Headphones (Realtek(R) Audio)", "🎧")]
    #[case("DELL U2720Q (NVIDIA High Definition Audio)", "🖥️")]
    #[case("Bluetooth Speaker", "📶")]
    #[case("USB Audio Device", "🔌")]
    #[case("Realtek Digital Output", "💻")]
    #[case("Logitech Z623", "🔊")]
    #[case("Something Else", "🎵")]
    fn classifies_by_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(device_glyph(name, None), expected);
    }

    #[test]
    fn custom_icon_wins() {
        assert_eq!(device_glyph("Headphones", Some("🎮")), "🎮");
        assert_eq!(device_glyph("Headphones", Some("")), "🎧");
    }

    #[test]
    fn palette_has_eighteen_unique_glyphs() {
        assert_eq!(ICON_CHOICES.len(), 18);
        let mut glyphs: Vec<_> = ICON_CHOICES.iter().map(|(g, _)| *g).collect();
        glyphs.sort();
        glyphs.dedup();
        assert_eq!(glyphs.len(), 18);
        assert_eq!(glyph_label("🎛️"), Some("Audio Mixer"));
        assert_eq!(glyph_label("x"), None);
    }

    #[test]
    fn icon_has_expected_dimensions() {
        let rgba = generate_speaker_icon();
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
        let center = ((ICON_SIZE / 2) * ICON_SIZE + ICON_SIZE / 2) as usize * 4;
        assert_eq!(rgba[center + 3], 255);
    }
}
