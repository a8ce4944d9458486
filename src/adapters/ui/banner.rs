//! Startup banner: "GROUPKEEPER" in figlet's standard font with a vertical gradient.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Deep teal (#00897b).
const TEAL: (u8, u8, u8) = (0x00, 0x89, 0x7b);
/// Amber (#ffc107).
const AMBER: (u8, u8, u8) = (0xff, 0xc1, 0x07);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

fn banner_art() -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("GROUPKEEPER").map(|f| f.to_string()))
        .unwrap_or_else(|| "GROUPKEEPER\n".to_string())
}

/// Prints the banner, then version and data directory.
pub fn print_welcome(data_dir: &str) {
    let mut out = stdout();
    let art = banner_art();
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(TEAL, AMBER, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: AMBER.0,
        g: AMBER.1,
        b: AMBER.2,
    }));
    let _ = out.execute(Print(format!(
        "v{}  data: {}\r\n",
        env!("CARGO_PKG_VERSION"),
        data_dir
    )));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}
