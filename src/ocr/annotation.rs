use serde::Deserialize;

use crate::geom::Point;

/// Document text annotation as returned by the recognition engine
/// (page → block → paragraph → word → symbol).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextAnnotation {
    pub text: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Page {
    pub width: u32,
    pub height: u32,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Block {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Paragraph {
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Word {
    pub bounding_box: Option<BoundingPoly>,
    pub symbols: Vec<Symbol>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Symbol {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoundingPoly {
    pub vertices: Vec<Vertex>,
}

// Zero coordinates are omitted from the wire format.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

impl From<Vertex> for Point {
    fn from(vertex: Vertex) -> Self {
        Point::new(vertex.x, vertex.y)
    }
}

impl Word {
    pub fn text(&self) -> String {
        self.symbols.iter().map(|symbol| symbol.text.as_str()).collect()
    }

    pub fn vertices(&self) -> Vec<Point> {
        self.bounding_box
            .as_ref()
            .map(|poly| poly.vertices.iter().copied().map(Point::from).collect())
            .unwrap_or_default()
    }
}
