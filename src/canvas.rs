use crate::builder::add_image_xobject;
use crate::error::Result;
use crate::font::FontSpec;
use crate::geometry::PageSize;
use crate::options::{Color, ImageHandle, Quality};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

const FONT_NAME: &str = "F1";

/// A drawing target with a current transform and fill state.
pub trait Surface {
    /// Fill color and alpha for everything drawn afterwards.
    fn set_fill(&mut self, color: Color, alpha: f64);

    /// Rotate the coordinate system counter-clockwise about the origin.
    fn rotate(&mut self, degrees: f64);

    fn string_width(&self, text: &str) -> f64;

    fn leading(&self) -> f64;

    /// Draw `text` with its baseline centered on `(x, y)`.
    fn draw_centred_string(&mut self, x: f64, y: f64, text: &str) -> Result<()>;

    /// Draw `image` with its bottom-left corner at `(x, y)`.
    fn draw_image(
        &mut self,
        image: &ImageHandle,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()>;
}

/// Records drawing operations into a single PDF page of a given size.
pub struct PdfCanvas {
    size: PageSize,
    doc: Document,
    operations: Vec<Operation>,
    font: FontSpec,
    font_size: f64,
    font_id: Option<ObjectId>,
    states: Vec<ObjectId>,
    images: Vec<(ImageHandle, String, ObjectId)>,
}

impl PdfCanvas {
    pub fn new(size: PageSize, font: FontSpec, font_size: f64) -> Self {
        Self {
            size,
            doc: Document::with_version("1.5"),
            operations: vec![Operation::new("q", vec![])],
            font,
            font_size,
            font_id: None,
            states: Vec::new(),
            images: Vec::new(),
        }
    }

    fn font_id(&mut self) -> Result<ObjectId> {
        if let Some(id) = self.font_id {
            return Ok(id);
        }
        let id = self.font.add_to_document(&mut self.doc)?;
        self.font_id = Some(id);
        Ok(id)
    }

    fn image_name(&mut self, image: &ImageHandle) -> Result<String> {
        if let Some((_, name, _)) = self.images.iter().find(|(known, _, _)| known.same_image(image)) {
            return Ok(name.clone());
        }
        let id = add_image_xobject(&mut self.doc, image.image(), Quality::Lossless)?;
        let name = format!("Im{}", self.images.len() + 1);
        self.images.push((image.clone(), name.clone(), id));
        Ok(name)
    }

    fn resources(&self) -> Dictionary {
        let mut resources = Dictionary::new();
        if let Some(id) = self.font_id {
            resources.set("Font", dictionary! { FONT_NAME => Object::Reference(id) });
        }
        if !self.states.is_empty() {
            let mut states = Dictionary::new();
            for (i, id) in self.states.iter().enumerate() {
                states.set(format!("GS{}", i + 1), Object::Reference(*id));
            }
            resources.set("ExtGState", states);
        }
        if !self.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for (_, name, id) in &self.images {
                xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
            }
            resources.set("XObject", xobjects);
        }
        resources
    }

    pub fn finish(mut self) -> Result<Document> {
        self.operations.push(Operation::new("Q", vec![]));
        let content = Content {
            operations: std::mem::take(&mut self.operations),
        }
        .encode()?;

        let resources = self.resources();
        let mut doc = self.doc;

        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), self.size.width.into(), self.size.height.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => resources,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.compress();
        Ok(doc)
    }
}

impl Surface for PdfCanvas {
    fn set_fill(&mut self, color: Color, alpha: f64) {
        let [r, g, b] = color.components();
        self.operations
            .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));

        let state_id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => alpha,
            "CA" => alpha,
        });
        self.states.push(state_id);
        let name = format!("GS{}", self.states.len());
        self.operations
            .push(Operation::new("gs", vec![Object::Name(name.into_bytes())]));
    }

    fn rotate(&mut self, degrees: f64) {
        let (s, c) = degrees.to_radians().sin_cos();
        self.operations.push(Operation::new(
            "cm",
            vec![
                c.into(),
                s.into(),
                (-s).into(),
                c.into(),
                Object::Integer(0),
                Object::Integer(0),
            ],
        ));
    }

    fn string_width(&self, text: &str) -> f64 {
        self.font.string_width(text, self.font_size)
    }

    fn leading(&self) -> f64 {
        self.font_size * 1.2
    }

    fn draw_centred_string(&mut self, x: f64, y: f64, text: &str) -> Result<()> {
        self.font_id()?;
        let left = x - self.string_width(text) / 2.0;
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_NAME.into()), self.font_size.into()],
            ),
            Operation::new("Td", vec![left.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(FontSpec::encode(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &ImageHandle,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let name = self.image_name(image)?;
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }
}
