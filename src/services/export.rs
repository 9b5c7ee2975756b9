// Export of numbered detections (CSV table, JSON) and annotated images

use image::RgbaImage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::errors::{ExportError, ExportResult};
use crate::core::types::Detection;
use crate::utils::image_ops::{encode_jpeg, is_jpeg_path};

const TABLE_HEADER: [&str; 16] = [
    "bubble_id", "text", "type", "conf", "cx", "cy", "box", "x1", "y1", "x2", "y2", "x3", "y3",
    "x4", "y4", "image",
];

/// One CSV row; field order matches `TABLE_HEADER`
#[derive(Debug, Serialize)]
struct TableRow<'a> {
    bubble_id: u32,
    text: &'a str,
    #[serde(rename = "type")]
    text_type: &'static str,
    conf: f64,
    cx: f64,
    cy: f64,
    #[serde(rename = "box")]
    quad_json: String,
    x1: Option<f32>,
    y1: Option<f32>,
    x2: Option<f32>,
    y2: Option<f32>,
    x3: Option<f32>,
    y3: Option<f32>,
    x4: Option<f32>,
    y4: Option<f32>,
    image: &'a str,
}

fn round_to(value: f32, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value as f64 * factor).round() / factor
}

fn create_parent_dir(path: &Path) -> ExportResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| ExportError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn table_row<'a>(index: usize, det: &'a Detection, image_name: &'a str) -> ExportResult<TableRow<'a>> {
    let corners = det.quad.map(|q| q.0);
    let corner = |i: usize| corners.map(|c| (c[i].x, c[i].y));
    let quad_json = match &corners {
        Some(points) => {
            let pairs: Vec<[f32; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
            serde_json::to_string(&pairs)?
        }
        None => String::new(),
    };

    Ok(TableRow {
        bubble_id: det.bubble_id.unwrap_or(index as u32 + 1),
        text: &det.text,
        text_type: det.text_type.map(|t| t.as_str()).unwrap_or(""),
        conf: round_to(det.confidence, 4),
        cx: round_to(det.center.x, 2),
        cy: round_to(det.center.y, 2),
        quad_json,
        x1: corner(0).map(|c| c.0),
        y1: corner(0).map(|c| c.1),
        x2: corner(1).map(|c| c.0),
        y2: corner(1).map(|c| c.1),
        x3: corner(2).map(|c| c.0),
        y3: corner(2).map(|c| c.1),
        x4: corner(3).map(|c| c.0),
        y4: corner(3).map(|c| c.1),
        image: image_name,
    })
}

/// Write `<out_base>.csv`, one row per detection sorted by bubble number.
///
/// Detections without a bubble id are numbered by 1-based position. An
/// empty slice produces a header-only file.
pub fn export_table(
    detections: &[Detection],
    out_base: &Path,
    image_name: &str,
) -> ExportResult<PathBuf> {
    let mut csv_path = out_base.as_os_str().to_owned();
    csv_path.push(".csv");
    let csv_path = PathBuf::from(csv_path);
    create_parent_dir(&csv_path)?;

    let mut rows = detections
        .iter()
        .enumerate()
        .map(|(i, det)| table_row(i, det, image_name))
        .collect::<ExportResult<Vec<_>>>()?;
    rows.sort_by_key(|row| row.bubble_id);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&csv_path)?;
    writer.write_record(TABLE_HEADER)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| ExportError::WriteFailed {
        path: csv_path.clone(),
        source,
    })?;

    debug!("Wrote {} rows to {}", rows.len(), csv_path.display());
    Ok(csv_path)
}

/// Write the detections as a pretty-printed JSON array
pub fn export_json(detections: &[Detection], path: &Path) -> ExportResult<()> {
    create_parent_dir(path)?;
    let json = serde_json::to_string_pretty(detections)?;
    fs::write(path, json).map_err(|source| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {} detections to {}", detections.len(), path.display());
    Ok(())
}

/// Save an annotated image. `.jpg`/`.jpeg` are encoded at `jpeg_quality`
/// with alpha dropped; other formats follow the extension.
pub fn save_image(image: &RgbaImage, path: &Path, jpeg_quality: u8) -> ExportResult<()> {
    create_parent_dir(path)?;

    if is_jpeg_path(path) {
        let bytes = encode_jpeg(image, jpeg_quality)?;
        fs::write(path, bytes).map_err(|source| ExportError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    } else {
        image.save(path)?;
    }

    debug!("Saved {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point, Quad, TextType};
    use image::Rgba;

    fn numbered(text: &str, id: u32, x: f32) -> Detection {
        let quad = Quad([
            Point::new(x, 10.0),
            Point::new(x + 20.0, 10.0),
            Point::new(x + 20.0, 20.0),
            Point::new(x, 20.0),
        ]);
        let mut det = Detection::from_quad(text, 0.912345, quad);
        det.bubble_id = Some(id);
        det.text_type = Some(TextType::Len);
        det
    }

    #[test]
    fn test_table_rows_sorted_and_rounded() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("sheet_dims");
        let dets = vec![numbered("40", 2, 100.0), numbered("12.5", 1, 0.0)];

        let path = export_table(&dets, &base, "sheet.png").unwrap();
        assert_eq!(path, dir.path().join("nested").join("sheet_dims.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), TABLE_HEADER.to_vec());

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "1");
        assert_eq!(&records[0][1], "12.5");
        assert_eq!(&records[0][2], "LEN");
        assert_eq!(&records[0][3], "0.9123");
        assert_eq!(&records[0][4], "10.0");
        assert_eq!(&records[0][6], "[[0.0,10.0],[20.0,10.0],[20.0,20.0],[0.0,20.0]]");
        assert_eq!(&records[0][15], "sheet.png");
        assert_eq!(&records[1][0], "2");
    }

    #[test]
    fn test_missing_ids_fall_back_to_position() {
        let dir = tempfile::tempdir().unwrap();
        let dets = vec![
            Detection::from_center("R3", 0.8, Point::new(1.0, 2.0)),
            Detection::from_center("15", 0.8, Point::new(3.0, 4.0)),
        ];
        let path = export_table(&dets, &dir.path().join("t"), "img.jpg").unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&records[0][0], "1");
        assert_eq!(&records[1][0], "2");
        // no quad: box and corner columns stay empty
        assert_eq!(&records[0][6], "");
        assert_eq!(&records[0][7], "");
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_table(&[], &dir.path().join("empty"), "img.jpg").unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("bubble_id,text,type,conf"));
    }

    #[test]
    fn test_json_export_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dims.json");
        let dets = vec![numbered("⌀6", 1, 5.0)];
        export_json(&dets, &path).unwrap();

        let back: Vec<Detection> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, dets);
    }

    #[test]
    fn test_save_image_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));

        let jpg = dir.path().join("out").join("a_bubbled.jpg");
        save_image(&img, &jpg, 90).unwrap();
        assert_eq!(&fs::read(&jpg).unwrap()[..2], &[0xFF, 0xD8]);

        let png = dir.path().join("a.png");
        save_image(&img, &png, 90).unwrap();
        assert_eq!(image::open(&png).unwrap().to_rgba8(), img);
    }
}
