use std::{fs, io};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn grey(luminance: u8) -> Self {
        Self::rgb(luminance, luminance, luminance)
    }

    fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/*
A vector graphics sink with a current pen color.
Coordinates are mathematical, y growing upwards.
*/
pub trait Canvas {
    fn set_pen_color(&mut self, color: Color);
    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    fn draw_circle(&mut self, x: f64, y: f64, radius: f64);
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64);
    fn save(&self, filename: &str) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
    },
    Circle {
        centre: (f64, f64),
        radius: f64,
        color: Color,
        filled: bool,
    },
}

/*
Accumulates shapes and renders them as a standalone SVG document.
The viewBox is computed from the drawn shapes, and the y axis is
flipped so drawings come out the way the coordinates mean them.
*/
#[derive(Debug, Clone, Default)]
pub struct SvgCanvas {
    pen: Option<Color>,
    shapes: Vec<Shape>,
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn pen(&self) -> Color {
        self.pen.unwrap_or(Color::grey(0))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut cover = |x: f64, y: f64, pad: f64| {
            min_x = min_x.min(x - pad);
            min_y = min_y.min(y - pad);
            max_x = max_x.max(x + pad);
            max_y = max_y.max(y + pad);
        };
        for shape in &self.shapes {
            match shape {
                Shape::Line { from, to, .. } => {
                    cover(from.0, from.1, 0.0);
                    cover(to.0, to.1, 0.0);
                }
                Shape::Circle { centre, radius, .. } => {
                    cover(centre.0, centre.1, *radius);
                }
            }
        }
        if self.shapes.is_empty() {
            (0.0, 0.0, 1.0, 1.0)
        } else {
            (min_x, min_y, max_x, max_y)
        }
    }

    pub fn to_svg(&self) -> String {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        let width = (max_x - min_x).max(f64::EPSILON);
        let height = (max_y - min_y).max(f64::EPSILON);
        let margin = 0.05 * width.max(height);
        let stroke = width.max(height) / 400.0;
        let mut out = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\">\n",
            min_x - margin,
            -(max_y + margin),
            width + 2.0 * margin,
            height + 2.0 * margin
        );
        out.push_str("<g transform=\"scale(1,-1)\">\n");
        for shape in &self.shapes {
            match shape {
                Shape::Line { from, to, color } => {
                    out.push_str(&format!(
                        "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
                        from.0,
                        from.1,
                        to.0,
                        to.1,
                        color.hex(),
                        stroke
                    ));
                }
                Shape::Circle {
                    centre,
                    radius,
                    color,
                    filled,
                } => {
                    let (fill, stroke_color) = if *filled {
                        (color.hex(), "none".to_string())
                    } else {
                        ("none".to_string(), color.hex())
                    };
                    out.push_str(&format!(
                        "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
                        centre.0,
                        centre.1,
                        radius,
                        fill,
                        stroke_color,
                        stroke
                    ));
                }
            }
        }
        out.push_str("</g>\n</svg>\n");
        out
    }
}

impl Canvas for SvgCanvas {
    fn set_pen_color(&mut self, color: Color) {
        self.pen = Some(color);
    }

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.shapes.push(Shape::Line {
            from: (x1, y1),
            to: (x2, y2),
            color: self.pen(),
        });
    }

    fn draw_circle(&mut self, x: f64, y: f64, radius: f64) {
        self.shapes.push(Shape::Circle {
            centre: (x, y),
            radius,
            color: self.pen(),
            filled: false,
        });
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) {
        self.shapes.push(Shape::Circle {
            centre: (x, y),
            radius,
            color: self.pen(),
            filled: true,
        });
    }

    fn save(&self, filename: &str) -> io::Result<()> {
        fs::write(filename, self.to_svg())
    }
}

mod test {

    #[test]
    fn svg_rendering() {
        use crate::canvas::{Canvas, Color, SvgCanvas};
        let mut board = SvgCanvas::new();
        board.set_pen_color(Color::rgb(255, 0, 0));
        board.draw_line(0.0, 0.0, 1.0, 1.0);
        board.set_pen_color(Color::grey(220));
        board.draw_circle(0.5, 0.5, 0.25);
        board.fill_circle(0.0, 0.0, 0.05);
        let svg = board.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("viewBox"));
        assert!(svg.contains("#ff0000"));
        assert!(svg.contains("#dcdcdc"));
        assert!(svg.contains("<line"));
        assert_eq!(svg.matches("<circle").count(), 2);
    }

    #[test]
    fn empty_canvas_still_renders() {
        use crate::canvas::SvgCanvas;
        let svg = SvgCanvas::new().to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>\n"));
    }
}
