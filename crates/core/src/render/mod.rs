use std::fmt::Write as _;

use crate::{ActiveStroke, CanvasExtent, Color, Curve, PathCommand, Result, Track};

const LINE_WIDTH: f64 = 2.0;

/// Painting backend. The core emits curve commands and never owns pixels.
pub trait RenderSurface {
    /// Clears the surface before a full redraw.
    fn clear(&mut self);
    fn begin_path(&mut self, color: &Color);
    fn apply(&mut self, command: PathCommand);
    fn end_path(&mut self);
}

/// Paints one smoothed curve as a single path.
pub fn render_curve<S: RenderSurface + ?Sized>(surface: &mut S, color: &Color, curve: &Curve) {
    surface.begin_path(color);
    for command in curve.segments() {
        surface.apply(command);
    }
    surface.end_path();
}

/// Redraws every stroke of a track in creation order, followed by the gesture
/// still in progress, if any.
pub fn render_track<S: RenderSurface + ?Sized>(
    surface: &mut S,
    track: &Track,
    active: Option<&ActiveStroke>,
) -> Result<()> {
    surface.clear();
    for stroke in track.strokes() {
        render_curve(surface, stroke.color(), &stroke.curve()?);
    }
    if let Some(active) = active.filter(|active| active.track() == track.id) {
        render_curve(surface, active.color(), &active.curve()?);
    }
    Ok(())
}

/// Builds a standalone SVG document from curve commands.
#[derive(Debug)]
pub struct SvgSurface {
    extent: CanvasExtent,
    elements: Vec<String>,
    current: Option<(Color, String)>,
}

impl SvgSurface {
    pub fn new(extent: CanvasExtent) -> Self {
        Self {
            extent,
            elements: Vec::new(),
            current: None,
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn to_svg(&self) -> String {
        let CanvasExtent { width, height } = self.extent;
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
             viewBox=\"0 0 {width} {height}\">\n"
        );
        let _ = writeln!(svg, "  <rect width=\"{width}\" height=\"{height}\" fill=\"white\"/>");
        for element in &self.elements {
            let _ = writeln!(svg, "  {element}");
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl RenderSurface for SvgSurface {
    fn clear(&mut self) {
        self.elements.clear();
        self.current = None;
    }

    fn begin_path(&mut self, color: &Color) {
        self.end_path();
        self.current = Some((color.clone(), String::new()));
    }

    fn apply(&mut self, command: PathCommand) {
        let Some((color, data)) = self.current.as_mut() else {
            return;
        };
        match command {
            PathCommand::Dot(p) => self.elements.push(format!(
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\"/>",
                p.x,
                p.y,
                LINE_WIDTH / 2.0,
                escape_attr(color.as_str())
            )),
            PathCommand::MoveTo(p) => {
                let _ = write!(data, "M{} {} ", p.x, p.y);
            }
            PathCommand::LineTo(p) => {
                let _ = write!(data, "L{} {} ", p.x, p.y);
            }
            PathCommand::CubicTo {
                control1,
                control2,
                end,
            } => {
                let _ = write!(
                    data,
                    "C{} {} {} {} {} {} ",
                    control1.x, control1.y, control2.x, control2.y, end.x, end.y
                );
            }
        }
    }

    fn end_path(&mut self) {
        if let Some((color, data)) = self.current.take() {
            let data = data.trim_end();
            if !data.is_empty() {
                let color = escape_attr(color.as_str());
                self.elements.push(format!(
                    "<path d=\"{data}\" fill=\"none\" stroke=\"{color}\" \
                     stroke-width=\"{LINE_WIDTH}\" stroke-linecap=\"round\"/>"
                ));
            }
        }
    }
}

/// Colours come from user data, so they are escaped before landing in an
/// attribute value.
fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, Stroke, TrackId};

    #[derive(Default)]
    struct Recording {
        log: Vec<String>,
    }

    impl RenderSurface for Recording {
        fn clear(&mut self) {
            self.log.push("clear".into());
        }
        fn begin_path(&mut self, color: &Color) {
            self.log.push(format!("begin {color}"));
        }
        fn apply(&mut self, command: PathCommand) {
            self.log.push(format!("{command:?}"));
        }
        fn end_path(&mut self) {
            self.log.push("end".into());
        }
    }

    fn track_with_strokes() -> Track {
        let mut track = Track::new(TrackId(1), Color::from("red"));
        track.push_stroke(Stroke::new(Color::from("red"), vec![Point::new(1.0, 1.0)]).unwrap());
        track.push_stroke(
            Stroke::new(
                Color::from("blue"),
                vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(20.0, 0.0)],
            )
            .unwrap(),
        );
        track
    }

    #[test]
    fn paints_strokes_in_creation_order_then_active_gesture() {
        let track = track_with_strokes();
        let active = ActiveStroke::begin(TrackId(1), Color::from("green"), Point::new(7.0, 7.0));
        let mut surface = Recording::default();

        render_track(&mut surface, &track, Some(&active)).unwrap();

        let begins: Vec<&String> = surface.log.iter().filter(|l| l.starts_with("begin")).collect();
        assert_eq!(begins, vec!["begin red", "begin blue", "begin green"]);
        assert_eq!(surface.log.first().map(String::as_str), Some("clear"));
    }

    #[test]
    fn ignores_gestures_on_other_tracks() {
        let track = track_with_strokes();
        let active = ActiveStroke::begin(TrackId(9), Color::from("green"), Point::new(7.0, 7.0));
        let mut surface = Recording::default();

        render_track(&mut surface, &track, Some(&active)).unwrap();
        assert!(!surface.log.iter().any(|l| l == "begin green"));
    }

    #[test]
    fn svg_contains_dots_and_cubic_paths() {
        let track = track_with_strokes();
        let mut surface = SvgSurface::new(CanvasExtent::new(800.0, 600.0));
        render_track(&mut surface, &track, None).unwrap();

        let svg = surface.to_svg();
        assert_eq!(surface.element_count(), 2);
        assert!(svg.contains("<circle cx=\"1\" cy=\"1\" r=\"1\" fill=\"red\"/>"));
        assert!(svg.contains("stroke=\"blue\""));
        assert!(svg.contains("M0 0 C"));
        assert!(svg.contains("fill=\"white\""));
    }

    #[test]
    fn svg_escapes_colours_inside_attributes() {
        let hostile = Color::from("red\"/><script>x</script><x a=\"");
        let mut track = Track::new(TrackId(1), hostile.clone());
        track.push_stroke(Stroke::new(hostile.clone(), vec![Point::new(1.0, 1.0)]).unwrap());
        track.push_stroke(
            Stroke::new(hostile, vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0)]).unwrap(),
        );
        let mut surface = SvgSurface::new(CanvasExtent::new(800.0, 600.0));
        render_track(&mut surface, &track, None).unwrap();

        let svg = surface.to_svg();
        assert!(!svg.contains("<script>"));
        let escaped = "red&quot;/&gt;&lt;script&gt;x&lt;/script&gt;&lt;x a=&quot;";
        assert!(svg.contains(&format!("fill=\"{escaped}\"")));
        assert!(svg.contains("stroke=\"red&quot;/&gt;&lt;script&gt;"));
        assert_eq!(svg.matches("<circle").count(), 1);
        assert_eq!(svg.matches("<path").count(), 1);
        assert_eq!(escape_attr("a&b'c"), "a&amp;b&apos;c");
    }
}
