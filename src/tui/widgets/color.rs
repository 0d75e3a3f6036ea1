use ratatui::style::Color;

/// Turn a theme color from the config into a ratatui color.
///
/// Accepts the 16 terminal color names (`gray`/`grey` spellings, `light*`
/// and `darkgray` variants), `#RRGGBB`, `#RGB` and `rgb(r, g, b)`.
/// Anything else renders as white.
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase();
    if let Some(color) = named_color(&s) {
        return color;
    }
    let parsed = if let Some(hex) = s.strip_prefix('#') {
        hex_color(hex)
    } else if let Some(body) = s.strip_prefix("rgb(").and_then(|rest| rest.strip_suffix(')')) {
        rgb_color(body)
    } else {
        None
    };
    parsed.unwrap_or(Color::White)
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name.replace("grey", "gray").as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        // ratatui has no light gray, plain gray is the closest
        "gray" | "lightgray" => Color::Gray,
        "darkgray" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => return None,
    };
    Some(color)
}

fn hex_color(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        // #f80 is shorthand for #ff8800
        3 => {
            let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Color::Rgb(short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

fn rgb_color(body: &str) -> Option<Color> {
    let parts = body
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [r, g, b] => Some(Color::Rgb(*r, *g, *b)),
        _ => None,
    }
}

/// Black or white, whichever reads better on `background`
pub fn get_contrast_text_color(background: Color) -> Color {
    let dark = match background {
        // WCAG relative luminance
        Color::Rgb(r, g, b) => {
            let linear = |c: u8| {
                let c = c as f64 / 255.0;
                if c <= 0.03928 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
            };
            0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b) < 0.5
        }
        // Most terminals draw gray as a light color
        named => matches!(named, Color::Black | Color::Blue | Color::Magenta | Color::Red),
    };
    if dark { Color::White } else { Color::Black }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_hex_and_rgb() {
        assert_eq!(parse_color("LightRed"), Color::LightRed);
        assert_eq!(parse_color(" darkgrey "), Color::DarkGray);
        assert_eq!(parse_color("#ff8000"), Color::Rgb(255, 128, 0));
        assert_eq!(parse_color("#f80"), Color::Rgb(255, 136, 0));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Color::Rgb(1, 2, 3));
    }

    #[test]
    fn unknown_colors_fall_back_to_white() {
        assert_eq!(parse_color("chartreuse"), Color::White);
        assert_eq!(parse_color("#12345"), Color::White);
        assert_eq!(parse_color("rgb(1,2)"), Color::White);
        assert_eq!(parse_color("rgb(1,2,300)"), Color::White);
    }

    #[test]
    fn contrast_text_is_readable() {
        assert_eq!(get_contrast_text_color(Color::Blue), Color::White);
        assert_eq!(get_contrast_text_color(Color::Yellow), Color::Black);
        assert_eq!(get_contrast_text_color(Color::Rgb(10, 10, 10)), Color::White);
        assert_eq!(get_contrast_text_color(Color::Rgb(250, 250, 250)), Color::Black);
    }
}
