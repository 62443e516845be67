//! On-disk gamut table cache.
//!
//! One XML file per (model, color space), named `<Model>-<ColorSpaceKey>.sgt`:
//!
//! ```xml
//! <GamutTable version="1">
//!   <Model>CAM16</Model>
//!   <ColorSpace>sRGB</ColorSpace>
//!   <Resolution J="100" s="100" h="360"/>
//!   <SaturationByLightness>…base64…</SaturationByLightness>
//!   <LightnessBySaturation>…base64…</LightnessBySaturation>
//!   <EdgeByHue>…base64…</EdgeByHue>
//! </GamutTable>
//! ```
//!
//! Grids are raw native-endian `f32` arrays. Every mismatch on load is an
//! error the store treats as a cache miss.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::appearance::PerceptualModel;
use crate::error::{ColorError, ColorResult};
use crate::gamut::GamutTable;

/// Format version written to and required of every cache file.
pub const CACHE_VERSION: &str = "1";
pub const CACHE_EXTENSION: &str = "sgt";

const ROOT: &str = "GamutTable";
const MODEL: &str = "Model";
const COLOR_SPACE: &str = "ColorSpace";
const RESOLUTION: &str = "Resolution";
const S_JH: &str = "SaturationByLightness";
const J_SH: &str = "LightnessBySaturation";
const JS_H: &str = "EdgeByHue";

pub fn cache_file_name(model: PerceptualModel, space: &str) -> String {
    format!("{}-{}.{}", model.name(), space, CACHE_EXTENSION)
}

pub fn cache_path(dir: &Path, model: PerceptualModel, space: &str) -> PathBuf {
    dir.join(cache_file_name(model, space))
}

/// Write `table` into `dir`. The file appears atomically (temp file, then
/// rename).
pub fn save_table(table: &GamutTable, dir: &Path) -> ColorResult<PathBuf> {
    if table.is_empty() {
        return Err(ColorError::CacheFormat(format!(
            "refusing to persist empty table {}",
            table.key()
        )));
    }

    let path = cache_path(dir, table.model(), table.space());
    let tmp = path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write_table(table, &mut writer)?;
        writer.flush()?;
    }
    fs::rename(&tmp, &path)?;
    Ok(path)
}

/// Load the table for (`model`, `space`) from `dir`, requiring grid sizes
/// `resolution = (J, s, h)`.
pub fn load_table(
    dir: &Path,
    model: PerceptualModel,
    space: &str,
    resolution: (usize, usize, usize),
) -> ColorResult<GamutTable> {
    let file = File::open(cache_path(dir, model, space))?;
    read_table(BufReader::new(file), model, space, resolution)
}

fn write_error(e: impl std::fmt::Display) -> ColorError {
    ColorError::CacheFormat(format!("write error: {e}"))
}

pub fn write_table<W: Write>(table: &GamutTable, writer: W) -> ColorResult<()> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    let (size_j, size_s, size_h) = table.resolution();

    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;

    let mut root = BytesStart::new(ROOT);
    root.push_attribute(("version", CACHE_VERSION));
    xml.write_event(Event::Start(root)).map_err(write_error)?;

    write_text_element(&mut xml, MODEL, table.model().name())?;
    write_text_element(&mut xml, COLOR_SPACE, table.space())?;

    let mut res = BytesStart::new(RESOLUTION);
    res.push_attribute(("J", size_j.to_string().as_str()));
    res.push_attribute(("s", size_s.to_string().as_str()));
    res.push_attribute(("h", size_h.to_string().as_str()));
    xml.write_event(Event::Empty(res)).map_err(write_error)?;

    write_text_element(&mut xml, S_JH, &encode_grid(table.s_jh()))?;
    write_text_element(&mut xml, J_SH, &encode_grid(table.j_sh()))?;
    write_text_element(&mut xml, JS_H, &encode_grid(table.js_h()))?;

    xml.write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(write_error)?;
    Ok(())
}

fn write_text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> ColorResult<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_error)?;
    xml.write_event(Event::Text(BytesText::new(text)))
        .map_err(write_error)?;
    xml.write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)?;
    Ok(())
}

#[derive(Default)]
struct RawTable {
    version: Option<String>,
    model: Option<String>,
    space: Option<String>,
    resolution: Option<(usize, usize, usize)>,
    s_jh: Option<String>,
    j_sh: Option<String>,
    js_h: Option<String>,
}

fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn parse_resolution(e: &BytesStart) -> ColorResult<(usize, usize, usize)> {
    let dim = |key: &[u8]| -> ColorResult<usize> {
        get_attr(e, key)
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| {
                ColorError::CacheFormat(format!(
                    "bad {} resolution",
                    String::from_utf8_lossy(key)
                ))
            })
    };
    Ok((dim(b"J")?, dim(b"s")?, dim(b"h")?))
}

/// Parse and validate a cache document.
pub fn read_table<R: BufRead>(
    reader: R,
    model: PerceptualModel,
    space: &str,
    resolution: (usize, usize, usize),
) -> ColorResult<GamutTable> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut raw = RawTable::default();
    let mut text = String::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                match e.name().as_ref() {
                    b"GamutTable" => raw.version = get_attr(&e, b"version"),
                    b"Resolution" => raw.resolution = Some(parse_resolution(&e)?),
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"Resolution" {
                    raw.resolution = Some(parse_resolution(&e)?);
                }
            }
            Ok(Event::Text(e)) => {
                let chunk = e
                    .decode()
                    .map_err(|err| ColorError::CacheFormat(format!("text: {err}")))?;
                text.push_str(&chunk);
            }
            Ok(Event::End(e)) => {
                let value = std::mem::take(&mut text);
                match e.name().as_ref() {
                    b"Model" => raw.model = Some(value),
                    b"ColorSpace" => raw.space = Some(value),
                    b"SaturationByLightness" => raw.s_jh = Some(value),
                    b"LightnessBySaturation" => raw.j_sh = Some(value),
                    b"EdgeByHue" => raw.js_h = Some(value),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ColorError::CacheFormat(format!("read error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    validate(raw, model, space, resolution)
}

fn validate(
    raw: RawTable,
    model: PerceptualModel,
    space: &str,
    expected: (usize, usize, usize),
) -> ColorResult<GamutTable> {
    let missing = |what: &str| ColorError::CacheFormat(format!("missing {what}"));

    let version = raw.version.ok_or_else(|| missing("version"))?;
    if version != CACHE_VERSION {
        return Err(ColorError::CacheFormat(format!(
            "version {version}, expected {CACHE_VERSION}"
        )));
    }

    let file_model = raw.model.ok_or_else(|| missing("model"))?;
    if file_model.trim() != model.name() {
        return Err(ColorError::CacheFormat(format!(
            "model {file_model}, expected {model}"
        )));
    }

    let file_space = raw.space.ok_or_else(|| missing("color space"))?;
    if file_space.trim() != space {
        return Err(ColorError::CacheFormat(format!(
            "color space {file_space}, expected {space}"
        )));
    }

    let resolution = raw.resolution.ok_or_else(|| missing("resolution"))?;
    if resolution != expected {
        return Err(ColorError::CacheFormat(format!(
            "resolution {resolution:?}, expected {expected:?}"
        )));
    }

    let s_jh = decode_grid(&raw.s_jh.ok_or_else(|| missing(S_JH))?)?;
    let j_sh = decode_grid(&raw.j_sh.ok_or_else(|| missing(J_SH))?)?;
    let js_h = decode_grid(&raw.js_h.ok_or_else(|| missing(JS_H))?)?;

    GamutTable::from_parts(model, space, resolution, s_jh, j_sh, js_h)
}

fn encode_grid(values: &[f32]) -> String {
    STANDARD.encode(bytemuck::cast_slice::<f32, u8>(values))
}

fn decode_grid(text: &str) -> ColorResult<Vec<f32>> {
    let bytes = STANDARD.decode(text.trim())?;
    if bytes.len() % 4 != 0 {
        return Err(ColorError::CacheFormat(format!(
            "grid of {} bytes is not a whole number of floats",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
