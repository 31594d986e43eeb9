use crate::error::{Result, WatermarkError};
use crate::geometry::PageSize;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl MediaBox {
    pub fn size(&self) -> PageSize {
        PageSize::new(self.urx - self.llx, self.ury - self.lly)
    }
}

pub fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn resolve_dict(doc: &Document, obj: &Object) -> Result<Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(d) => Ok(d.clone()),
        Object::Stream(s) => Ok(s.dict.clone()),
        _ => Err(WatermarkError::MalformedPdf("expected a dictionary".into())),
    }
}

/// Look `key` up on the page, then up its `Parent` chain.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent)) => {
                current = doc.get_object(*parent).ok()?.as_dict().ok()?;
            }
            _ => return None,
        }
    }
}

pub fn media_box(doc: &Document, page_id: ObjectId) -> Result<MediaBox> {
    let missing = || WatermarkError::MalformedPdf(format!("page {page_id:?} has no MediaBox"));
    let value = inherited(doc, page_id, b"MediaBox").ok_or_else(missing)?;
    let array = resolve(doc, &value)?.as_array()?;
    if array.len() != 4 {
        return Err(missing());
    }
    let mut n = [0.0; 4];
    for (slot, obj) in n.iter_mut().zip(array) {
        *slot = as_number(resolve(doc, obj)?).ok_or_else(missing)?;
    }
    // normalize boxes given with swapped corners
    Ok(MediaBox {
        llx: n[0].min(n[2]),
        lly: n[1].min(n[3]),
        urx: n[0].max(n[2]),
        ury: n[1].max(n[3]),
    })
}

pub fn pages(doc: &Document) -> Result<Vec<(ObjectId, MediaBox)>> {
    doc.get_pages()
        .into_values()
        .map(|id| Ok((id, media_box(doc, id)?)))
        .collect()
}

fn page_content_ids(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let contents = match page.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };
    let ids = match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => items.iter().filter_map(|o| o.as_reference().ok()).collect(),
            _ => vec![*id],
        },
        Object::Array(items) => items.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => Vec::new(),
    };
    Ok(ids)
}

fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for id in page_content_ids(doc, page_id)? {
        let stream = doc.get_object(id)?.as_stream()?;
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        content.extend_from_slice(&data);
        content.push(b'\n');
    }
    Ok(content)
}

/// Copy a single-page watermark document into `target` as a Form XObject.
pub fn import_watermark(target: &mut Document, watermark: &Document) -> Result<ObjectId> {
    let mut source = watermark.clone();
    source.renumber_objects_with(target.max_id + 1);

    let page_id = *source
        .get_pages()
        .values()
        .next()
        .ok_or_else(|| WatermarkError::MalformedPdf("watermark document has no page".into()))?;
    let size = media_box(&source, page_id)?.size();
    let content = page_content(&source, page_id)?;
    let resources = match inherited(&source, page_id, b"Resources") {
        Some(obj) => resolve_dict(&source, &obj)?,
        None => Dictionary::new(),
    };

    let skip: Vec<ObjectId> = page_content_ids(&source, page_id)?;
    for (id, object) in std::mem::take(&mut source.objects) {
        let structural = matches!(
            object.type_name().unwrap_or(""),
            "Catalog" | "Pages" | "Page"
        );
        if !structural && !skip.contains(&id) {
            target.objects.insert(id, object);
        }
    }
    target.max_id = target.max_id.max(source.max_id);

    let mut form = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1_i64,
            "BBox" => vec![Object::Integer(0), Object::Integer(0), size.width.into(), size.height.into()],
            "Resources" => resources,
        },
        content,
    );
    form.compress()?;
    Ok(target.add_object(form))
}

/// Superimpose the form `form_id` on a page. The page's own content is wrapped
/// in `q`/`Q` so its graphics state cannot leak into the watermark.
pub fn stamp_page(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> Result<()> {
    let bounds = media_box(doc, page_id)?;

    let mut resources = match inherited(doc, page_id, b"Resources") {
        Some(obj) => resolve_dict(doc, &obj)?,
        None => Dictionary::new(),
    };
    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolve_dict(doc, obj)?,
        Err(_) => Dictionary::new(),
    };
    let name = (0..)
        .map(|i| format!("Watermark{i}"))
        .find(|n| !xobjects.has(n.as_bytes()))
        .unwrap_or_default();
    xobjects.set(name.clone(), Object::Reference(form_id));
    resources.set("XObject", xobjects);

    let existing = page_content_ids(doc, page_id)?;
    let save = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let restore = doc.add_object(Stream::new(dictionary! {}, b"Q\n".to_vec()));
    let draw = format!(
        "q\n1 0 0 1 {} {} cm\n/{} Do\nQ\n",
        bounds.llx, bounds.lly, name
    );
    let draw = doc.add_object(Stream::new(dictionary! {}, draw.into_bytes()));

    let mut contents = vec![Object::Reference(save)];
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(restore));
    contents.push(Object::Reference(draw));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", resources);
    page.set("Contents", contents);
    Ok(())
}

fn pages_root(doc: &Document) -> Result<ObjectId> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    Ok(doc
        .get_object(catalog_id)?
        .as_dict()?
        .get(b"Pages")?
        .as_reference()?)
}

fn intermediate_nodes(doc: &Document, node: ObjectId, found: &mut Vec<ObjectId>) -> Result<()> {
    let dict = doc.get_object(node)?.as_dict()?;
    if let Ok(kids) = dict.get(b"Kids").and_then(Object::as_array) {
        for kid in kids.iter().filter_map(|k| k.as_reference().ok()) {
            let is_node = doc
                .get_object(kid)
                .and_then(Object::as_dict)
                .map(|d| d.has(b"Kids"))
                .unwrap_or(false);
            if is_node && !found.contains(&kid) {
                found.push(kid);
                intermediate_nodes(doc, kid, found)?;
            }
        }
    }
    Ok(())
}

/// Replace the page tree with a flat list of `order` under the root node.
///
/// Inherited attributes are copied onto each page first so nothing is lost
/// when intermediate nodes are dropped.
pub fn rebuild_page_tree(doc: &mut Document, order: &[ObjectId]) -> Result<()> {
    let root = pages_root(doc)?;

    let mut materialized: BTreeMap<ObjectId, Vec<(&[u8], Object)>> = BTreeMap::new();
    for &page_id in order {
        let values = INHERITABLE
            .iter()
            .filter_map(|key| inherited(doc, page_id, key).map(|v| (*key, v)))
            .collect();
        materialized.insert(page_id, values);
    }

    let mut nodes = Vec::new();
    intermediate_nodes(doc, root, &mut nodes)?;
    for node in nodes {
        doc.objects.remove(&node);
    }

    for (page_id, values) in materialized {
        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in values {
            page.set(key.to_vec(), value);
        }
        page.set("Parent", Object::Reference(root));
    }

    let kids: Vec<Object> = order.iter().map(|id| Object::Reference(*id)).collect();
    let root_dict = doc.get_object_mut(root)?.as_dict_mut()?;
    root_dict.set("Kids", kids);
    root_dict.set("Count", order.len() as i64);
    for key in INHERITABLE {
        root_dict.remove(key);
    }
    Ok(())
}

pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
