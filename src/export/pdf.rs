//! # PDF Pagination
//!
//! Wraps a raster snapshot into a single-page PDF whose page is sized in
//! millimetres. The snapshot fills the page edge to edge; its alpha channel
//! travels as a soft mask so the corners of a round logo stay transparent.

use chrono::Local;
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

use crate::error::RoundelError;
use crate::print::config::{mm_to_points, points_to_mm};

const IMAGE_NAME: &[u8] = b"Im0";

fn write_err(e: impl std::fmt::Display) -> RoundelError {
    RoundelError::DocumentWrite(e.to_string())
}

/// Split interleaved RGBA into RGB samples and an alpha plane.
fn split_alpha(image: &RgbaImage) -> (Vec<u8>, Vec<u8>) {
    let pixels = (image.width() * image.height()) as usize;
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }
    (rgb, alpha)
}

/// Build a one-page PDF of `page_mm × page_mm` showing `snapshot`.
pub fn paginate(snapshot: &RgbaImage, page_mm: f32) -> Result<Vec<u8>, RoundelError> {
    let (width, height) = snapshot.dimensions();
    if width == 0 || height == 0 {
        return Err(RoundelError::DocumentWrite("Snapshot is empty".to_string()));
    }
    if !page_mm.is_finite() || page_mm <= 0.0 {
        return Err(RoundelError::DocumentWrite(format!("Invalid page size {}mm", page_mm)));
    }
    let side = mm_to_points(page_mm);
    let (rgb, alpha) = split_alpha(snapshot);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ));

    // Image space is the unit square; scale it to the page
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![side.into(), 0.into(), 0.into(), side.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.encode().map_err(write_err)?,
    ));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), side.into(), side.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(concat!("roundel ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(write_err)?;
    log::debug!(
        "paginated {}x{} snapshot onto {}mm page ({} bytes)",
        width,
        height,
        page_mm,
        bytes.len()
    );
    Ok(bytes)
}

/// Read back the size of the first page, in millimetres.
pub fn page_size_mm(pdf: &[u8]) -> Result<(f32, f32), RoundelError> {
    let doc = Document::load_mem(pdf).map_err(write_err)?;
    let page_id = *doc
        .get_pages()
        .values()
        .next()
        .ok_or_else(|| RoundelError::DocumentWrite("Document has no pages".to_string()))?;
    let page = doc.get_dictionary(page_id).map_err(write_err)?;
    let media_box = page
        .get(b"MediaBox")
        .and_then(Object::as_array)
        .map_err(write_err)?;
    if media_box.len() != 4 {
        return Err(RoundelError::DocumentWrite("Malformed MediaBox".to_string()));
    }
    let coord = |i: usize| media_box[i].as_float().map_err(write_err);
    Ok((
        points_to_mm(coord(2)? - coord(0)?),
        points_to_mm(coord(3)? - coord(1)?),
    ))
}
