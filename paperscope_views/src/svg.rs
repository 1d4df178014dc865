//! Hand-rolled SVG assembly. Views push formatted fragments into a
//! document; no DOM, just strings.

pub struct Svg {
    width: f64,
    height: f64,
    defs: String,
    body: String,
}

impl Svg {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            body: String::new(),
        }
    }

    pub fn push(&mut self, fragment: &str) {
        self.body.push_str(fragment);
        self.body.push('\n');
    }

    pub fn push_def(&mut self, fragment: &str) {
        self.defs.push_str(fragment);
        self.defs.push('\n');
    }

    pub fn open_group(&mut self, attrs: &str) {
        self.body.push_str(&format!("<g {}>\n", attrs));
    }

    pub fn close_group(&mut self) {
        self.body.push_str("</g>\n");
    }

    pub fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\">\n<defs>\n{defs}</defs>\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            defs = self.defs,
            body = self.body,
        )
    }
}

pub fn esc(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn rect(x: f64, y: f64, w: f64, h: f64, attrs: &str) -> String {
    format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" {}/>",
        x, y, w, h, attrs
    )
}

pub fn circle(cx: f64, cy: f64, r: f64, attrs: &str) -> String {
    format!(
        "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" {}/>",
        cx, cy, r, attrs
    )
}

pub fn line(x1: f64, y1: f64, x2: f64, y2: f64, attrs: &str) -> String {
    format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" {}/>",
        x1, y1, x2, y2, attrs
    )
}

pub fn path(d: &str, attrs: &str) -> String {
    format!("<path d=\"{}\" {}/>", d, attrs)
}

pub fn text(x: f64, y: f64, attrs: &str, content: &str) -> String {
    format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" {}>{}</text>",
        x,
        y,
        attrs,
        esc(content)
    )
}

/// Centered muted prompt used by the empty view states.
pub fn empty_state(width: f64, height: f64, message: &str) -> String {
    let mut doc = Svg::new(width, height);
    doc.push(&text(
        width / 2.0,
        height / 2.0,
        "text-anchor=\"middle\" fill=\"#64748b\" font-size=\"13\" font-family=\"Space Grotesk, sans-serif\"",
        message,
    ));
    doc.finish()
}
