//! Board-level entities and their decoder.
//!
//! A [`Pcb`] is the typed form of a `kicad_pcb` document: layers, nets, net
//! classes, copper (tracks, vias, zones), board graphics, dimensions, and
//! embedded footprints, plus the editor setup block. Entities record the
//! order in which they were decoded in a `sequence` field so that callers can
//! re-emit them in source order even after moving them between containers.

use std::collections::BTreeMap;

use kcboard_sexpr::Sexpr;

use crate::decode::{f64_at, i64_at, key_of, point3_at, point_at, text_at, xy_points, yes_no_at};
use crate::error::FormatError;
use crate::footprint::Module;
use crate::geometry::{Point, Point3};

/// The tool that produced a board file, from the `(host tool version)` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub tool: String,
    pub version: String,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            tool: "kcboard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A copper or technical layer. The ordinal is the sort key on write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    pub num: i64,
    pub name: String,
    /// Type tag, e.g. `signal` or `user`. Round-tripped as an opaque string.
    pub kind: String,
    pub sequence: usize,
}

/// A named net. Index 0 conventionally denotes "no net".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Net {
    pub name: String,
    pub sequence: usize,
}

/// Electrical defaults shared by a group of nets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetClass {
    pub name: String,
    pub description: String,
    pub clearance: f64,
    pub trace_width: f64,
    pub via_dia: f64,
    pub via_drill: f64,
    pub uvia_dia: f64,
    pub uvia_drill: f64,
    /// Names of member nets, in declaration order.
    pub nets: Vec<String>,
    pub sequence: usize,
}

/// A straight copper segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub start: Point,
    pub end: Point,
    pub width: f64,
    pub layer: String,
    pub net: i64,
    /// Empty when the source record carried no timestamp.
    pub tstamp: String,
    pub sequence: usize,
}

/// A plated hole connecting copper layers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Via {
    pub at: Point,
    pub size: f64,
    pub drill: f64,
    pub layers: Vec<String>,
    pub net: i64,
    pub sequence: usize,
}

/// Zone outline hatching style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hatch {
    pub mode: String,
    pub size: f64,
}

/// Zone fill parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneFill {
    pub enabled: bool,
    pub arc_segments: i64,
    pub thermal_gap: f64,
    pub thermal_bridge_width: f64,
}

/// A filled copper region.
///
/// The boundary polygons (`base_polys`) and the computed fill polygons
/// (`filled_polys`) are independent lists; both round-trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Zone {
    pub net: i64,
    pub net_name: String,
    pub layer: String,
    pub tstamp: String,
    pub hatch: Hatch,
    pub connect_pads_clearance: f64,
    pub min_thickness: f64,
    pub fill: ZoneFill,
    pub base_polys: Vec<Vec<Point>>,
    pub filled_polys: Vec<Vec<Point>>,
    pub sequence: usize,
}

/// Font parameters for drawn text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextEffects {
    pub font_size: Point,
    pub thickness: f64,
}

/// A board-level graphical line (`gr_line`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrLine {
    pub start: Point,
    pub end: Point,
    pub layer: String,
    pub width: f64,
    pub sequence: usize,
}

/// A board-level graphical arc (`gr_arc`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrArc {
    pub start: Point,
    pub end: Point,
    pub angle: f64,
    pub layer: String,
    pub width: f64,
    pub sequence: usize,
}

/// Board-level drawn text (`gr_text`). The optional third `at` coordinate is
/// the text rotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrText {
    pub text: String,
    pub at: Point3,
    pub layer: String,
    pub effects: TextEffects,
    pub sequence: usize,
}

/// A board-level graphic, tagged by record shape so encoding dispatch is
/// exhaustive.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawing {
    Line(GrLine),
    Arc(GrArc),
    Text(GrText),
}

impl Drawing {
    /// Name of the record shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Drawing::Line(_) => "gr_line",
            Drawing::Arc(_) => "gr_arc",
            Drawing::Text(_) => "gr_text",
        }
    }
}

/// One extension line of a dimension annotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DimensionFeature {
    pub name: String,
    pub points: Vec<Point>,
}

/// A measurement annotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dimension {
    pub value: f64,
    pub width: f64,
    pub layer: String,
    pub text: GrText,
    pub features: Vec<DimensionFeature>,
    pub sequence: usize,
}

/// One `pcbplotparams` entry, kept as raw value atoms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotParam {
    pub name: String,
    pub values: Vec<String>,
}

/// The `(setup ...)` block: editor defaults plus plot parameters.
///
/// Setup keys this model does not understand are retained in `unrecognized`
/// together with their original child index, and replayed verbatim at that
/// relative position on encode, so decoding an unfamiliar but valid file
/// never drops data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditorSetup {
    pub last_trace_width: f64,
    pub user_trace_widths: Vec<f64>,
    pub trace_clearance: f64,
    pub zone_clearance: f64,
    pub zone_45_only: bool,
    pub trace_min: f64,
    pub segment_width: f64,
    pub edge_width: f64,

    pub via_size: f64,
    pub via_min_size: f64,
    pub via_min_drill: f64,
    pub via_drill: f64,
    pub uvia_size: f64,
    pub uvia_min_size: f64,
    pub uvia_min_drill: f64,
    pub uvia_drill: f64,
    pub uvias_allowed: bool,

    pub text_width: f64,
    pub text_size: Vec<f64>,

    pub mod_edge_width: f64,
    pub mod_text_size: Vec<f64>,
    pub mod_text_width: f64,

    pub pad_size: Vec<f64>,
    pub pad_drill: f64,
    pub pad_to_mask_clearance: f64,

    pub plot_params: Vec<PlotParam>,
    /// Unknown setup children as (original child index, raw node).
    pub unrecognized: Vec<(usize, Sexpr)>,
}

/// The typed contents of a `kicad_pcb` document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pcb {
    pub format_version: i64,
    pub created_by: Host,
    pub page: String,
    pub editor_setup: EditorSetup,

    pub layers: Vec<Layer>,
    pub nets: BTreeMap<i64, Net>,
    pub net_classes: Vec<NetClass>,
    pub tracks: Vec<Track>,
    pub vias: Vec<Via>,
    pub zones: Vec<Zone>,
    pub drawings: Vec<Drawing>,
    pub dimensions: Vec<Dimension>,
    pub modules: Vec<Module>,
}

impl Pcb {
    /// An empty board with the defaults a freshly-created file carries.
    pub fn new() -> Self {
        Self {
            format_version: 4,
            page: "A4".to_string(),
            ..Default::default()
        }
    }

    /// Look up a layer by name.
    pub fn layer_named(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Decode board text.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let tree = kcboard_sexpr::parse(text)?;
        Self::from_sexpr(&tree)
    }

    /// Decode an already-parsed expression tree rooted at `kicad_pcb`.
    pub fn from_sexpr(root: &Sexpr) -> Result<Self, FormatError> {
        let items = root.as_list().ok_or(FormatError::RootNotList)?;
        if items.len() < 5 {
            return Err(FormatError::TooShort {
                record: "kicad_pcb",
                min: 5,
            });
        }
        if key_of(items) != Some("kicad_pcb") {
            return Err(FormatError::BadMarker {
                expected: "kicad_pcb",
            });
        }
        log::debug!("decoding kicad_pcb document with {} children", items.len());

        let mut pcb = Pcb::new();
        pcb.page = String::new();
        let mut sequence = 0usize;

        for child in &items[1..] {
            let Some(c) = child.as_list() else {
                sequence += 1;
                continue;
            };
            let Some(key) = key_of(c) else {
                sequence += 1;
                continue;
            };
            match key {
                "version" => {
                    pcb.format_version = i64_at(c, 1, "kicad_pcb", "version")?;
                }
                "host" => {
                    pcb.created_by = Host {
                        tool: text_at(c, 1, "host", "tool")?,
                        version: text_at(c, 2, "host", "version")?,
                    };
                }
                "page" => {
                    pcb.page = text_at(c, 1, "kicad_pcb", "page")?;
                }
                "setup" => {
                    pcb.editor_setup = parse_setup(c)?;
                }
                "layers" => {
                    for layer in &c[1..] {
                        let Some(l) = layer.as_list() else {
                            return Err(FormatError::Field {
                                record: "layers",
                                field: "layer",
                                expected: "a (num name kind) list",
                            });
                        };
                        pcb.layers.push(Layer {
                            num: i64_at(l, 0, "layers", "num")?,
                            name: text_at(l, 1, "layers", "name")?,
                            kind: text_at(l, 2, "layers", "kind")?,
                            sequence,
                        });
                        sequence += 1;
                    }
                }
                "net" => {
                    let num = i64_at(c, 1, "net", "index")?;
                    let name = text_at(c, 2, "net", "name")?;
                    pcb.nets.insert(num, Net { name, sequence });
                }
                "net_class" => pcb.net_classes.push(parse_net_class(c, sequence)?),
                "segment" => pcb.tracks.push(parse_segment(c, sequence)?),
                "via" => pcb.vias.push(parse_via(c, sequence)?),
                "zone" => pcb.zones.push(parse_zone(c, sequence)?),
                "gr_line" => pcb.drawings.push(Drawing::Line(parse_gr_line(c, sequence)?)),
                "gr_arc" => pcb.drawings.push(Drawing::Arc(parse_gr_arc(c, sequence)?)),
                "gr_text" => pcb.drawings.push(Drawing::Text(parse_gr_text(c, sequence)?)),
                "dimension" => pcb.dimensions.push(parse_dimension(c, sequence)?),
                "module" => {
                    let mut module = Module::from_sexpr(child)?;
                    module.sequence = sequence;
                    pcb.modules.push(module);
                }
                // Forward compatibility: unknown top-level records are skipped.
                _ => {}
            }
            sequence += 1;
        }

        Ok(pcb)
    }
}

fn parse_segment(c: &[Sexpr], sequence: usize) -> Result<Track, FormatError> {
    let mut t = Track {
        sequence,
        ..Default::default()
    };
    for child in &c[1..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("start") => t.start = point_at(kv, "segment", "start")?,
            Some("end") => t.end = point_at(kv, "segment", "end")?,
            Some("width") => t.width = f64_at(kv, 1, "segment", "width")?,
            Some("layer") => t.layer = text_at(kv, 1, "segment", "layer")?,
            Some("net") => t.net = i64_at(kv, 1, "segment", "net")?,
            Some("tstamp") => t.tstamp = text_at(kv, 1, "segment", "tstamp")?,
            _ => {}
        }
    }
    Ok(t)
}

fn parse_via(c: &[Sexpr], sequence: usize) -> Result<Via, FormatError> {
    let mut v = Via {
        sequence,
        ..Default::default()
    };
    for child in &c[1..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("at") => v.at = point_at(kv, "via", "at")?,
            Some("size") => v.size = f64_at(kv, 1, "via", "size")?,
            Some("drill") => v.drill = f64_at(kv, 1, "via", "drill")?,
            Some("net") => v.net = i64_at(kv, 1, "via", "net")?,
            Some("layers") => {
                for layer in &kv[1..] {
                    v.layers
                        .push(layer.atom_text().ok_or(FormatError::Field {
                            record: "via",
                            field: "layers",
                            expected: "layer names",
                        })?);
                }
            }
            _ => {}
        }
    }
    Ok(v)
}

fn parse_zone(c: &[Sexpr], sequence: usize) -> Result<Zone, FormatError> {
    let mut z = Zone {
        sequence,
        ..Default::default()
    };
    for child in &c[1..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("net") => z.net = i64_at(kv, 1, "zone", "net")?,
            Some("net_name") => z.net_name = text_at(kv, 1, "zone", "net_name")?,
            Some("layer") => z.layer = text_at(kv, 1, "zone", "layer")?,
            Some("tstamp") => z.tstamp = text_at(kv, 1, "zone", "tstamp")?,
            Some("hatch") => {
                z.hatch.mode = text_at(kv, 1, "zone", "hatch")?;
                z.hatch.size = f64_at(kv, 2, "zone", "hatch")?;
            }
            Some("min_thickness") => z.min_thickness = f64_at(kv, 1, "zone", "min_thickness")?,
            Some("connect_pads") => {
                for sub in &kv[1..] {
                    let Some(kv2) = sub.as_list() else { continue };
                    if key_of(kv2) == Some("clearance") {
                        z.connect_pads_clearance = f64_at(kv2, 1, "zone", "connect_pads")?;
                    }
                }
            }
            Some("fill") => {
                z.fill.enabled = kv.get(1).and_then(Sexpr::as_sym) == Some("yes");
                for sub in &kv[2..] {
                    let Some(kv2) = sub.as_list() else { continue };
                    match key_of(kv2) {
                        Some("arc_segments") => {
                            z.fill.arc_segments = i64_at(kv2, 1, "zone", "arc_segments")?;
                        }
                        Some("thermal_gap") => {
                            z.fill.thermal_gap = f64_at(kv2, 1, "zone", "thermal_gap")?;
                        }
                        Some("thermal_bridge_width") => {
                            z.fill.thermal_bridge_width =
                                f64_at(kv2, 1, "zone", "thermal_bridge_width")?;
                        }
                        _ => {}
                    }
                }
            }
            Some("polygon") => {
                z.base_polys.push(parse_zone_poly(kv, "zone.polygon")?);
            }
            Some("filled_polygon") => {
                z.filled_polys
                    .push(parse_zone_poly(kv, "zone.filled_polygon")?);
            }
            _ => {}
        }
    }
    Ok(z)
}

fn parse_zone_poly(kv: &[Sexpr], record: &'static str) -> Result<Vec<Point>, FormatError> {
    let pts = kv
        .get(1)
        .and_then(Sexpr::as_list)
        .filter(|p| key_of(p) == Some("pts"))
        .ok_or(FormatError::Missing {
            record,
            field: "pts",
        })?;
    xy_points(pts, record)
}

fn parse_net_class(c: &[Sexpr], sequence: usize) -> Result<NetClass, FormatError> {
    let mut nc = NetClass {
        name: text_at(c, 1, "net_class", "name")?,
        description: text_at(c, 2, "net_class", "description")?,
        sequence,
        ..Default::default()
    };
    for child in &c[3..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("clearance") => nc.clearance = f64_at(kv, 1, "net_class", "clearance")?,
            Some("trace_width") => nc.trace_width = f64_at(kv, 1, "net_class", "trace_width")?,
            Some("via_dia") => nc.via_dia = f64_at(kv, 1, "net_class", "via_dia")?,
            Some("via_drill") => nc.via_drill = f64_at(kv, 1, "net_class", "via_drill")?,
            Some("uvia_dia") => nc.uvia_dia = f64_at(kv, 1, "net_class", "uvia_dia")?,
            Some("uvia_drill") => nc.uvia_drill = f64_at(kv, 1, "net_class", "uvia_drill")?,
            Some("add_net") => nc.nets.push(text_at(kv, 1, "net_class", "add_net")?),
            _ => {}
        }
    }
    Ok(nc)
}

fn parse_gr_line(c: &[Sexpr], sequence: usize) -> Result<GrLine, FormatError> {
    let mut l = GrLine {
        sequence,
        ..Default::default()
    };
    for child in &c[1..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("start") => l.start = point_at(kv, "gr_line", "start")?,
            Some("end") => l.end = point_at(kv, "gr_line", "end")?,
            Some("layer") => l.layer = text_at(kv, 1, "gr_line", "layer")?,
            Some("width") => l.width = f64_at(kv, 1, "gr_line", "width")?,
            _ => {}
        }
    }
    Ok(l)
}

fn parse_gr_arc(c: &[Sexpr], sequence: usize) -> Result<GrArc, FormatError> {
    let mut a = GrArc {
        sequence,
        ..Default::default()
    };
    for child in &c[1..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("start") => a.start = point_at(kv, "gr_arc", "start")?,
            Some("end") => a.end = point_at(kv, "gr_arc", "end")?,
            Some("angle") => a.angle = f64_at(kv, 1, "gr_arc", "angle")?,
            Some("layer") => a.layer = text_at(kv, 1, "gr_arc", "layer")?,
            Some("width") => a.width = f64_at(kv, 1, "gr_arc", "width")?,
            _ => {}
        }
    }
    Ok(a)
}

fn parse_gr_text(c: &[Sexpr], sequence: usize) -> Result<GrText, FormatError> {
    let mut t = GrText {
        text: text_at(c, 1, "gr_text", "text")?,
        sequence,
        ..Default::default()
    };
    for child in &c[2..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("at") => t.at = point3_at(kv, "gr_text", "at")?,
            Some("layer") => t.layer = text_at(kv, 1, "gr_text", "layer")?,
            Some("effects") => t.effects = parse_text_effects(kv)?,
            _ => {}
        }
    }
    Ok(t)
}

pub(crate) fn parse_text_effects(kv: &[Sexpr]) -> Result<TextEffects, FormatError> {
    let mut effects = TextEffects::default();
    for child in &kv[1..] {
        let Some(font) = child.as_list() else { continue };
        if key_of(font) != Some("font") {
            continue;
        }
        for sub in &font[1..] {
            let Some(kv2) = sub.as_list() else { continue };
            match key_of(kv2) {
                Some("size") => effects.font_size = point_at(kv2, "effects", "size")?,
                Some("thickness") => effects.thickness = f64_at(kv2, 1, "effects", "thickness")?,
                _ => {}
            }
        }
    }
    Ok(effects)
}

fn parse_dimension(c: &[Sexpr], sequence: usize) -> Result<Dimension, FormatError> {
    let mut d = Dimension {
        value: f64_at(c, 1, "dimension", "value")?,
        sequence,
        ..Default::default()
    };
    for child in &c[2..] {
        let Some(kv) = child.as_list() else { continue };
        match key_of(kv) {
            Some("width") => d.width = f64_at(kv, 1, "dimension", "width")?,
            Some("layer") => d.layer = text_at(kv, 1, "dimension", "layer")?,
            Some("gr_text") => d.text = parse_gr_text(kv, 0)?,
            Some(feature) => {
                // Extension lines: (feature1 (pts ...)), (feature2 (pts ...)).
                let Some(pts) = kv
                    .get(1)
                    .and_then(Sexpr::as_list)
                    .filter(|p| key_of(p) == Some("pts"))
                else {
                    continue;
                };
                d.features.push(DimensionFeature {
                    name: feature.to_string(),
                    points: xy_points(pts, "dimension")?,
                });
            }
            None => {}
        }
    }
    Ok(d)
}

fn parse_setup(c: &[Sexpr]) -> Result<EditorSetup, FormatError> {
    let mut e = EditorSetup::default();
    for (idx, child) in c[1..].iter().enumerate() {
        let Some(kv) = child.as_list() else { continue };
        let Some(key) = key_of(kv) else { continue };
        match key {
            "last_trace_width" => e.last_trace_width = f64_at(kv, 1, "setup", "last_trace_width")?,
            "user_trace_width" => e
                .user_trace_widths
                .push(f64_at(kv, 1, "setup", "user_trace_width")?),
            "trace_clearance" => e.trace_clearance = f64_at(kv, 1, "setup", "trace_clearance")?,
            "zone_clearance" => e.zone_clearance = f64_at(kv, 1, "setup", "zone_clearance")?,
            "zone_45_only" => e.zone_45_only = yes_no_at(kv, 1, "setup", "zone_45_only")?,
            "trace_min" => e.trace_min = f64_at(kv, 1, "setup", "trace_min")?,
            "segment_width" => e.segment_width = f64_at(kv, 1, "setup", "segment_width")?,
            "edge_width" => e.edge_width = f64_at(kv, 1, "setup", "edge_width")?,

            "via_size" => e.via_size = f64_at(kv, 1, "setup", "via_size")?,
            "via_min_size" => e.via_min_size = f64_at(kv, 1, "setup", "via_min_size")?,
            "via_min_drill" => e.via_min_drill = f64_at(kv, 1, "setup", "via_min_drill")?,
            "via_drill" => e.via_drill = f64_at(kv, 1, "setup", "via_drill")?,
            "uvia_size" => e.uvia_size = f64_at(kv, 1, "setup", "uvia_size")?,
            "uvia_min_size" => e.uvia_min_size = f64_at(kv, 1, "setup", "uvia_min_size")?,
            "uvia_min_drill" => e.uvia_min_drill = f64_at(kv, 1, "setup", "uvia_min_drill")?,
            "uvia_drill" => e.uvia_drill = f64_at(kv, 1, "setup", "uvia_drill")?,
            "uvias_allowed" => e.uvias_allowed = yes_no_at(kv, 1, "setup", "uvias_allowed")?,

            "pcb_text_width" => e.text_width = f64_at(kv, 1, "setup", "pcb_text_width")?,
            "pcb_text_size" => {
                for (i, _) in kv[1..].iter().enumerate() {
                    e.text_size.push(f64_at(kv, i + 1, "setup", "pcb_text_size")?);
                }
            }

            "mod_edge_width" => e.mod_edge_width = f64_at(kv, 1, "setup", "mod_edge_width")?,
            "mod_text_size" => {
                for (i, _) in kv[1..].iter().enumerate() {
                    e.mod_text_size
                        .push(f64_at(kv, i + 1, "setup", "mod_text_size")?);
                }
            }
            "mod_text_width" => e.mod_text_width = f64_at(kv, 1, "setup", "mod_text_width")?,

            "pad_size" => {
                for (i, _) in kv[1..].iter().enumerate() {
                    e.pad_size.push(f64_at(kv, i + 1, "setup", "pad_size")?);
                }
            }
            "pad_drill" => e.pad_drill = f64_at(kv, 1, "setup", "pad_drill")?,
            "pad_to_mask_clearance" => {
                e.pad_to_mask_clearance = f64_at(kv, 1, "setup", "pad_to_mask_clearance")?;
            }

            "pcbplotparams" => {
                for param in &kv[1..] {
                    let Some(p) = param.as_list() else { continue };
                    let Some(name) = key_of(p) else { continue };
                    let mut values = Vec::with_capacity(p.len() - 1);
                    for v in &p[1..] {
                        values.push(v.atom_text().ok_or(FormatError::Field {
                            record: "pcbplotparams",
                            field: "value",
                            expected: "an atom",
                        })?);
                    }
                    e.plot_params.push(PlotParam {
                        name: name.to_string(),
                        values,
                    });
                }
            }

            _ => {
                log::trace!("retaining unrecognized setup key {key:?}");
                e.unrecognized.push((idx + 1, child.clone()));
            }
        }
    }
    Ok(e)
}
