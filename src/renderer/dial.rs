//! One frame of the solar dial.

use chrono::{NaiveDateTime, Timelike};
use palette::Srgb;

use super::Canvas;
use crate::color::{shade, Palette, Slot};
use crate::config::FaceMetrics;
use crate::engine::arc::{build_arc, trace_dish};
use crate::engine::trig::{fixed_to_int, int_to_fixed, project, Angle, FPoint, FIX1};
use crate::engine::Visible;
use crate::state::{BatteryStyle, DateFont, Preferences};

/// Height of a date or weekday line, in pixels.
const DATE_LINE_HEIGHT: i32 = 18;

const HOUR_LABELS: [(i32, &str); 4] = [(0, "00"), (6, "06"), (12, "12"), (18, "18")];

/// What the dial needs to know to draw one frame.
pub struct Scene<'a> {
    pub visible: Visible,
    pub origin: FPoint,
    pub metrics: &'a FaceMetrics,
    pub palette: &'a Palette,
    pub preferences: &'a Preferences,
    pub now: NaiveDateTime,
    pub clock_24h: bool,
    pub battery: u8,
}

/// Text to print over the canvas, centered on (`x`, `y`) in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub color: Srgb<u8>,
    pub bold: bool,
}

impl Label {
    fn new(x: i32, y: i32, text: impl Into<String>, color: Srgb<u8>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
            color,
            bold: false,
        }
    }
}

/// Minutes since local midnight.
pub fn minute_of_day(now: &NaiveDateTime) -> i32 {
    (now.hour() * 60 + now.minute()) as i32
}

pub fn render_dial(canvas: &mut Canvas, scene: &Scene) -> Vec<Label> {
    let palette = scene.palette;
    let m = scene.metrics;
    let marks = palette.get(Slot::Marks);
    let text = palette.get(Slot::Text);
    let above = scene.visible.above as i32;
    let below = scene.visible.below as i32;
    let rotation = scene.visible.rotation;
    let origin = scene.origin;
    let mut labels = Vec::new();

    canvas.clear(palette.get(Slot::Behind));

    canvas.fill_rows(0, above, palette.get(Slot::Above));
    canvas.hline(above - 1, marks);
    canvas.fill_rows(below, canvas.height as i32, palette.get(Slot::Below));
    canvas.hline(below, marks);

    // Orbit pips, with the six-hour marks labelled.
    for h in 0..24 {
        let c = project(origin, m.orbit_radius, Angle::from_hour(h) + rotation);
        if h % 6 != 0 {
            canvas.fill_circle(c, m.pip_radius, marks);
            continue;
        }
        let label_color = if m.major_discs {
            canvas.fill_circle(c, m.solar_radius, marks);
            palette.get(Slot::Within)
        } else {
            marks
        };
        if let Some((_, name)) = HOUR_LABELS.iter().find(|(hour, _)| *hour == h) {
            labels.push(Label::new(fixed_to_int(c.x), fixed_to_int(c.y), *name, label_color));
        }
    }

    // Sun disc at the local time.
    let sun = project(
        origin,
        m.orbit_radius,
        Angle::from_minute(minute_of_day(&scene.now)) + rotation,
    );
    canvas.fill_circle(sun, m.solar_radius, marks);
    canvas.fill_circle(sun, m.solar_radius - m.solar_stroke, shade(palette.get(Slot::Solar), -3));

    // Readout.
    let inner = m.readout_radius - m.readout_stroke;
    canvas.fill_circle(origin, m.readout_radius, marks);
    canvas.fill_circle(origin, inner, palette.get(Slot::Within));

    if scene.preferences.battery_style == BatteryStyle::Dish {
        draw_battery_dish(canvas, origin, fixed_to_int(inner), scene.battery, palette);
    }

    let midline = fixed_to_int(origin.y);
    let cx = fixed_to_int(origin.x);
    let time = if scene.clock_24h {
        scene.now.format("%H:%M").to_string()
    } else {
        scene.now.format("%-I:%M").to_string()
    };
    let mut time_label = Label::new(cx, midline, time, text);
    time_label.bold = true;
    labels.push(time_label);

    let bold = scene.preferences.date_font == DateFont::Bold;
    for (offset, format) in [(m.date_text_offset, "%B %d"), (m.wday_text_offset, "%A")] {
        let mut label = Label::new(
            cx,
            midline + offset + DATE_LINE_HEIGHT / 2,
            scene.now.format(format).to_string(),
            text,
        );
        label.bold = bold;
        labels.push(label);
    }

    labels
}

/// A circular segment at the bottom of the readout, as deep as the charge.
fn draw_battery_dish(canvas: &mut Canvas, origin: FPoint, radius: i32, level: u8, palette: &Palette) {
    let depth = (radius * level.min(100) as i32 / 100).min(radius);
    if depth <= 0 {
        return;
    }
    let table = build_arc(radius, depth as usize);
    let apex = FPoint::new(origin.x, origin.y + int_to_fixed(radius));
    let outline = trace_dish(&table, apex, -FIX1);
    canvas.fill_polygon(&outline, shade(palette.get(Slot::Within), -1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Palette;
    use crate::config::FaceShape;
    use chrono::NaiveDate;

    fn scene<'a>(metrics: &'a FaceMetrics, palette: &'a Palette, prefs: &'a Preferences) -> Scene<'a> {
        Scene {
            visible: Visible {
                above: 60,
                below: 120,
                rotation: Angle::ZERO,
            },
            origin: FPoint::from_pixels(90, 90),
            metrics,
            palette,
            preferences: prefs,
            now: NaiveDate::from_ymd_opt(2024, 3, 20)
                .unwrap()
                .and_hms_opt(18, 5, 0)
                .unwrap(),
            clock_24h: true,
            battery: 50,
        }
    }

    #[test]
    fn fills_sky_and_ground() {
        let metrics = FaceShape::Round.metrics();
        let palette = Palette::default();
        let prefs = Preferences::default();
        let mut canvas = Canvas::new(180, 180);
        render_dial(&mut canvas, &scene(&metrics, &palette, &prefs));

        assert_eq!(canvas.get_pixel(2, 10), palette.get(Slot::Above));
        assert_eq!(canvas.get_pixel(2, 59), palette.get(Slot::Marks));
        assert_eq!(canvas.get_pixel(2, 90), palette.get(Slot::Behind));
        assert_eq!(canvas.get_pixel(2, 170), palette.get(Slot::Below));
        assert_eq!(canvas.get_pixel(90, 70), palette.get(Slot::Within));
    }

    #[test]
    fn labels_time_date_and_hours() {
        let metrics = FaceShape::Round.metrics();
        let palette = Palette::default();
        let prefs = Preferences::default();
        let mut canvas = Canvas::new(180, 180);
        let labels = render_dial(&mut canvas, &scene(&metrics, &palette, &prefs));

        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["00", "06", "12", "18", "18:05", "March 20", "Wednesday"]);

        // Unrotated, midnight is straight down and noon straight up.
        assert_eq!((labels[0].x, labels[0].y), (90, 165));
        assert_eq!((labels[2].x, labels[2].y), (90, 15));
        assert!(labels.iter().filter(|l| l.text.len() > 5).all(|l| !l.bold));
    }

    #[test]
    fn sun_follows_local_minute() {
        let metrics = FaceShape::Rect.metrics();
        let palette = Palette::default();
        let prefs = Preferences::default();
        let mut canvas = Canvas::new(144, 168);
        let mut s = scene(&metrics, &palette, &prefs);
        s.now = s.now.with_hour(12).unwrap().with_minute(0).unwrap();
        render_dial(&mut canvas, &s);

        let noon = project(s.origin, metrics.orbit_radius, Angle::HALF);
        let sun = shade(palette.get(Slot::Solar), -3);
        assert_eq!(canvas.get_pixel(fixed_to_int(noon.x) as usize, fixed_to_int(noon.y) as usize), sun);
    }

    #[test]
    fn battery_dish_fills_bottom_of_readout() {
        let metrics = FaceShape::Round.metrics();
        let palette = Palette::default();
        let mut prefs = Preferences::default();
        let mut canvas = Canvas::new(180, 180);
        render_dial(&mut canvas, &scene(&metrics, &palette, &prefs));
        let dish = shade(palette.get(Slot::Within), -1);
        let inner = fixed_to_int(metrics.readout_radius - metrics.readout_stroke);
        assert_eq!(canvas.get_pixel(90, (90 + inner - 3) as usize), dish);
        assert_ne!(canvas.get_pixel(90, 80), dish);

        prefs.battery_style = BatteryStyle::Hidden;
        render_dial(&mut canvas, &scene(&metrics, &palette, &prefs));
        assert_eq!(
            canvas.get_pixel(90, (90 + inner - 3) as usize),
            palette.get(Slot::Within)
        );
        assert!(int_to_fixed(inner) < metrics.readout_radius);
    }
}
