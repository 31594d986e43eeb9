use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use pdf_watermark::draw::render_watermark_page;
use pdf_watermark::geometry::PageSize;
use pdf_watermark::{
    add_watermark_from_options, add_watermark_to_pdf, DrawingOptions, FilesOptions, GridOptions,
    InsertOptions, LayoutSpec, Poppler, WatermarkError,
};
use std::path::{Path, PathBuf};

/// Write a PDF with one page per media box, each showing its index.
fn write_pdf(path: &Path, boxes: &[[i64; 4]]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for (i, media_box) in boxes.iter().enumerate() {
        let content = format!("BT 10 10 Td (page {i}) Tj ET\n");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    doc.save(path).unwrap();
}

fn count_operator(content: &[u8], operator: &str) -> usize {
    Content::decode(content)
        .unwrap()
        .operations
        .iter()
        .filter(|op| op.operator == operator)
        .count()
}

/// Decoded content of the first watermark form stamped on each page.
fn watermark_forms(doc: &Document) -> Vec<Vec<u8>> {
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let form_id = xobjects.get(b"Watermark0").unwrap().as_reference().unwrap();
            let form = doc.get_object(form_id).unwrap().as_stream().unwrap();
            form.decompressed_content().unwrap_or_else(|_| form.content.clone())
        })
        .collect()
}

#[test]
fn letter_page_grid_draws_28_watermarks() {
    let options = DrawingOptions::text("watermark");
    let layout: LayoutSpec = GridOptions::new(3, 6, false).unwrap().into();

    let doc = render_watermark_page(PageSize::new(612.0, 792.0), &options, &layout).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content = doc.get_page_content(page_id).unwrap();
    assert_eq!(count_operator(&content, "Tj"), 28);
}

#[test]
fn watermarking_twice_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("letter.pdf");
    write_pdf(&input, &[[0, 0, 612, 792]]);
    let options = DrawingOptions::text("watermark");
    let layout: LayoutSpec = GridOptions::new(3, 6, false).unwrap().into();

    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    add_watermark_to_pdf(&input, &first, &options, &layout, &Poppler::default()).unwrap();
    add_watermark_to_pdf(&input, &second, &options, &layout, &Poppler::default()).unwrap();

    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    let doc = Document::load(&first).unwrap();
    assert_eq!(count_operator(&watermark_forms(&doc)[0], "Tj"), 28);
}

#[test]
fn mixed_page_sizes_share_forms_and_keep_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mixed.pdf");
    write_pdf(
        &input,
        &[[0, 0, 612, 792], [0, 0, 792, 612], [0, 0, 612, 792], [0, 0, 300, 300]],
    );
    let output = dir.path().join("mixed-out.pdf");
    let mut options = DrawingOptions::text(r"CONFIDENTIAL\ndo not share");
    options.opacity = 0.3;

    add_watermark_to_pdf(
        &input,
        &output,
        &options,
        &InsertOptions::new(0.5, 0.9, "left").unwrap().into(),
        &Poppler::default(),
    )
    .unwrap();

    let doc = Document::load(&output).unwrap();
    let mut forms = Vec::new();
    for (i, page_id) in doc.get_pages().into_values().enumerate() {
        let content = doc.get_page_content(page_id).unwrap();
        assert!(String::from_utf8_lossy(&content).contains(&format!("(page {i})")));

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let xobjects = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"XObject"))
            .and_then(Object::as_dict)
            .unwrap();
        forms.push(xobjects.get(b"Watermark0").unwrap().as_reference().unwrap());
    }
    assert_eq!(forms[0], forms[2]);
    assert_ne!(forms[0], forms[1]);
    assert_ne!(forms[1], forms[3]);

    // two lines per instance
    for form in watermark_forms(&doc) {
        assert_eq!(count_operator(&form, "Tj"), 2);
    }
}

#[test]
fn shifted_media_box_translates_the_watermark() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shifted.pdf");
    write_pdf(&input, &[[100, 50, 400, 450]]);
    let output = dir.path().join("shifted-out.pdf");

    add_watermark_to_pdf(
        &input,
        &output,
        &DrawingOptions::text("watermark"),
        &GridOptions::default().into(),
        &Poppler::default(),
    )
    .unwrap();

    let doc = Document::load(&output).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content = doc.get_and_decode_page_content(page_id).unwrap();
    let cm = content
        .operations
        .iter()
        .filter(|op| op.operator == "cm")
        .last()
        .unwrap();
    let offset: Vec<f64> = cm.operands[4..]
        .iter()
        .map(|o| o.as_float().map(f64::from).or_else(|_| o.as_i64().map(|i| i as f64)).unwrap())
        .collect();
    assert_eq!(offset, vec![100.0, 50.0]);
}

#[test]
fn duplicate_outputs_fail_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.pdf");
    let b = dir.path().join("b.pdf");
    write_pdf(&a, &[[0, 0, 100, 100]]);
    write_pdf(&b, &[[0, 0, 100, 100]]);
    let target: PathBuf = dir.path().join("same.pdf");

    let err = FilesOptions::from_pairs(vec![(a, target.clone()), (b, target.clone())], false, 1)
        .unwrap_err();
    assert!(matches!(err, WatermarkError::Configuration(_)));
    assert!(!target.exists());
}

#[test]
fn directory_batch_mirrors_tree() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write_pdf(&input.join("one.pdf"), &[[0, 0, 200, 200]]);
    write_pdf(&input.join("sub/two.PDF"), &[[0, 0, 300, 200], [0, 0, 200, 300]]);
    let output = dir.path().join("out");

    let files = FilesOptions::new(
        input.to_str().unwrap(),
        Some(output.to_str().unwrap()),
        false,
        2,
    )
    .unwrap();
    let report = add_watermark_from_options(
        &files,
        &DrawingOptions::text("watermark"),
        &GridOptions::new(2, 2, true).unwrap().into(),
        &Poppler::default(),
    )
    .unwrap();

    assert!(report.is_success());
    assert_eq!(report.processed, 2);
    assert_eq!(Document::load(output.join("one.pdf")).unwrap().get_pages().len(), 1);
    assert_eq!(Document::load(output.join("sub/two.PDF")).unwrap().get_pages().len(), 2);
}
