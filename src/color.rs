use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Channel order: display (RGB) ↔ storage (BGR)
// ---------------------------------------------------------------------------

/// Display color to the BGR byte order used by the chart canvas.
pub fn to_storage(color: Srgb<u8>) -> [u8; 3] {
    [color.blue, color.green, color.red]
}

/// BGR pixel back to a display color.
pub fn from_storage(px: [u8; 3]) -> Srgb<u8> {
    Srgb::new(px[2], px[1], px[0])
}

/// Saturate integer channels into an 8-bit color.
pub fn saturate(channels: [u32; 3]) -> Srgb<u8> {
    let [r, g, b] = channels.map(|v| v.min(255) as u8);
    Srgb::new(r, g, b)
}

/// `#rrggbb`, for log lines.
pub fn hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Srgb::new(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}
