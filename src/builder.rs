use crate::error::Result;
use crate::geometry::PageSize;
use crate::options::Quality;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, GenericImageView};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Build a PDF with one full-page image per entry, each page sized to its
/// paired media box.
pub fn build_image_pdf(pages: &[(DynamicImage, PageSize)], quality: Quality) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_ids: Vec<Object> = Vec::new();

    for (img, size) in pages {
        let img_id = add_image_xobject(&mut doc, img, quality)?;

        let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ\n", size.width, size.height);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), size.width.into(), size.height.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => Object::Reference(img_id),
                },
            },
        };
        page_ids.push(Object::Reference(doc.add_object(page)));
    }

    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    Ok(doc)
}

/// Add `img` as an image XObject.
///
/// Images with transparency get a soft mask and are always stored lossless,
/// since JPEG cannot carry the alpha channel alongside.
pub fn add_image_xobject(doc: &mut Document, img: &DynamicImage, quality: Quality) -> Result<ObjectId> {
    let (w, h) = img.dimensions();

    let smask_id = if img.color().has_alpha() {
        let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p[3]).collect();
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w as i64,
            "Height" => h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8_i64,
            "Filter" => "FlateDecode",
        };
        Some(doc.add_object(Stream::new(dict, deflate(&alpha)?)))
    } else {
        None
    };

    let quality = if smask_id.is_some() {
        Quality::Lossless
    } else {
        quality
    };

    let mut stream = match quality {
        Quality::Lossless => {
            let raw = img.to_rgb8().into_raw();
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w as i64,
                "Height" => h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            };
            Stream::new(dict, deflate(&raw)?)
        }
        Quality::Jpeg(q) => {
            let mut buf: Vec<u8> = Vec::new();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, q);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;

            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w as i64,
                "Height" => h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            };
            Stream::new(dict, buf)
        }
    };

    if let Some(id) = smask_id {
        stream.dict.set("SMask", Object::Reference(id));
    }
    Ok(doc.add_object(stream))
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}
