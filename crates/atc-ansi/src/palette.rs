/// One 24-bit color channel triple.
pub type Rgb = (u8, u8, u8);

/// The standard 16 ANSI colors as xterm renders them by default.
pub const ANSI_16: [Rgb; 16] = [
    (0, 0, 0),       // 0: black
    (205, 0, 0),     // 1: red
    (0, 205, 0),     // 2: green
    (205, 205, 0),   // 3: yellow
    (0, 0, 238),     // 4: blue
    (205, 0, 205),   // 5: magenta
    (0, 205, 205),   // 6: cyan
    (229, 229, 229), // 7: white
    (127, 127, 127), // 8: bright black (gray)
    (255, 0, 0),     // 9: bright red
    (0, 255, 0),     // 10: bright green
    (255, 255, 0),   // 11: bright yellow
    (92, 92, 255),   // 12: bright blue
    (255, 0, 255),   // 13: bright magenta
    (0, 255, 255),   // 14: bright cyan
    (255, 255, 255), // 15: bright white
];

/// Converts an xterm 256-color index to RGB: 0-15 from the 16-palette,
/// 16-231 from the 6x6x6 cube, 232-255 from the 24-step grayscale ramp.
pub fn color256_to_rgb(n: u16) -> Rgb {
    if n > 255 {
        return (0, 0, 0);
    }
    let n = n as usize;
    if n < 16 {
        return ANSI_16[n];
    }
    if n < 232 {
        let n = n - 16;
        let r = n / 36;
        let g = (n / 6) % 6;
        let b = n % 6;
        return (cube_value(r), cube_value(g), cube_value(b));
    }
    let v = (8 + (n - 232) * 10) as u8;
    (v, v, v)
}

fn cube_value(i: usize) -> u8 {
    if i == 0 {
        0
    } else {
        (55 + i * 40) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_indices_follow_xterm_values() {
        // 196 = cube entry (5,0,0) -> (255,0,0)
        assert_eq!(color256_to_rgb(196), (255, 0, 0));
        // 21 = cube entry (0,0,5) -> (0,0,255)
        assert_eq!(color256_to_rgb(21), (0, 0, 255));
        // Cube axis values are {0, 95, 135, 175, 215, 255}.
        assert_eq!(color256_to_rgb(16), (0, 0, 0));
        assert_eq!(color256_to_rgb(17), (0, 0, 95));
    }

    #[test]
    fn grayscale_ramp_starts_at_8_in_steps_of_10() {
        assert_eq!(color256_to_rgb(232), (8, 8, 8));
        assert_eq!(color256_to_rgb(240), (88, 88, 88));
        assert_eq!(color256_to_rgb(255), (238, 238, 238));
    }

    #[test]
    fn low_indices_use_the_16_palette() {
        assert_eq!(color256_to_rgb(1), (205, 0, 0));
        assert_eq!(color256_to_rgb(12), (92, 92, 255));
    }

    #[test]
    fn out_of_range_is_black() {
        assert_eq!(color256_to_rgb(256), (0, 0, 0));
    }
}
