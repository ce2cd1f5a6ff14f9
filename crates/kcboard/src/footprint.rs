//! Footprint entities and their decoder.
//!
//! A [`Module`] is either a standalone `.kicad_mod` document or a footprint
//! embedded in a board. Graphics keep their record shape in the [`Graphic`]
//! tag so the encoder's dispatch is exhaustive.

use kcboard_sexpr::{Sexpr, number_as_f64};

use crate::board::{TextEffects, parse_text_effects};
use crate::decode::{f64_at, i64_at, key_of, point3_at, point_at, text_at, xy_points};
use crate::error::FormatError;
use crate::geometry::{Point, Point3};

/// Pad copper shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadShape {
    #[default]
    Rect,
    Oval,
    Circle,
    Trapezoid,
    RoundRect,
    /// Encoded with the `roundrect` token plus a nonzero `chamfer_ratio`.
    ChamferedRect,
    Custom,
}

impl PadShape {
    pub fn token(self) -> &'static str {
        match self {
            PadShape::Rect => "rect",
            PadShape::Oval => "oval",
            PadShape::Circle => "circle",
            PadShape::Trapezoid => "trapezoid",
            // Chamfered pads reuse the roundrect token; the ratio field is
            // what distinguishes them.
            PadShape::RoundRect | PadShape::ChamferedRect => "roundrect",
            PadShape::Custom => "custom",
        }
    }
}

/// Pad mounting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadSurface {
    #[default]
    Smd,
    ThroughHole,
    NonPlatedThroughHole,
    Connect,
}

impl PadSurface {
    pub fn token(self) -> &'static str {
        match self {
            PadSurface::Smd => "smd",
            PadSurface::ThroughHole => "thru_hole",
            PadSurface::NonPlatedThroughHole => "np_thru_hole",
            PadSurface::Connect => "connect",
        }
    }
}

/// Pad hole geometry. A zero size means no drill record is written.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drill {
    pub size: Point,
    pub offset: Point,
    pub oblong: bool,
}

/// A copper pad.
///
/// Every optional numeric field defaults to zero and is omitted from output
/// when zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pad {
    /// Textual identifier; often numeric but not always (`A1`, `""`).
    pub ident: String,
    pub net: i64,
    pub net_name: String,

    pub at: Point3,
    pub size: Point,
    pub layers: Vec<String>,
    pub shape: PadShape,
    pub surface: PadSurface,

    pub rect_delta: Point,
    pub drill: Drill,

    pub die_length: f64,
    pub solder_mask_margin: f64,
    pub solder_paste_margin: f64,
    pub solder_paste_margin_ratio: f64,
    pub clearance: f64,
    pub zone_connect: i64,
    pub thermal_width: f64,
    pub thermal_gap: f64,
    pub roundrect_rratio: f64,
    pub chamfer_ratio: f64,
}

/// A line drawn in a footprint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FpLine {
    pub start: Point,
    pub end: Point,
    pub layer: String,
    pub width: f64,
}

/// An arc drawn in a footprint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FpArc {
    pub start: Point,
    pub end: Point,
    pub angle: f64,
    pub layer: String,
    pub width: f64,
}

/// A circle drawn in a footprint, as center plus a point on the rim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FpCircle {
    pub center: Point,
    pub end: Point,
    pub layer: String,
    pub width: f64,
}

/// A closed polygon drawn in a footprint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FpPolygon {
    pub points: Vec<Point>,
    pub layer: String,
    pub width: f64,
}

/// The role of a footprint text item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextKind {
    #[default]
    Reference,
    Value,
    User,
}

impl TextKind {
    pub fn token(self) -> &'static str {
        match self {
            TextKind::Reference => "reference",
            TextKind::Value => "value",
            TextKind::User => "user",
        }
    }
}

/// Text drawn in a footprint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FpText {
    pub kind: TextKind,
    pub text: String,
    pub at: Point3,
    pub layer: String,
    pub effects: TextEffects,
}

/// A footprint graphic, tagged by record shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Graphic {
    Line(FpLine),
    Arc(FpArc),
    Circle(FpCircle),
    Polygon(FpPolygon),
    Text(FpText),
}

/// Reference to a 3-D model of the part.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model3d {
    pub path: String,
    pub at: Point3,
    pub scale: Point3,
    pub rotate: Point3,
}

/// A footprint: metadata, graphics, pads, and an optional 3-D model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: String,
    /// Board placement; the optional third coordinate is the rotation.
    pub placement: Point3,
    pub layer: String,

    pub tedit: String,
    pub tstamp: String,
    pub path: String,

    pub description: String,
    pub tags: Vec<String>,
    pub attrs: Vec<String>,

    pub clearance: f64,
    pub solder_mask_margin: f64,
    pub solder_paste_margin: f64,
    pub solder_paste_ratio: f64,

    pub graphics: Vec<Graphic>,
    pub pads: Vec<Pad>,
    pub model: Option<Model3d>,

    pub sequence: usize,
}

impl Module {
    /// Decode footprint text.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let tree = kcboard_sexpr::parse(text)?;
        Self::from_sexpr(&tree)
    }

    /// Decode an already-parsed expression tree rooted at `module`.
    pub fn from_sexpr(root: &Sexpr) -> Result<Self, FormatError> {
        let items = root.as_list().ok_or(FormatError::RootNotList)?;
        if key_of(items) != Some("module") {
            return Err(FormatError::BadMarker { expected: "module" });
        }
        let name = items
            .get(1)
            .and_then(Sexpr::atom_text)
            .ok_or(FormatError::Missing {
                record: "module",
                field: "name",
            })?;
        log::debug!("decoding module {name:?}");

        let mut m = Module {
            name,
            ..Default::default()
        };
        for child in &items[2..] {
            let Some(kv) = child.as_list() else { continue };
            let Some(key) = key_of(kv) else { continue };
            match key {
                "layer" => m.layer = text_at(kv, 1, "module", "layer")?,
                "tedit" => m.tedit = text_at(kv, 1, "module", "tedit")?,
                "tstamp" => m.tstamp = text_at(kv, 1, "module", "tstamp")?,
                "path" => m.path = text_at(kv, 1, "module", "path")?,
                "descr" => m.description = text_at(kv, 1, "module", "descr")?,
                "tags" => {
                    let joined = text_at(kv, 1, "module", "tags")?;
                    m.tags = joined.split(' ').map(str::to_string).collect();
                }
                "attr" => {
                    for a in &kv[1..] {
                        m.attrs.push(a.atom_text().ok_or(FormatError::Field {
                            record: "module",
                            field: "attr",
                            expected: "atoms",
                        })?);
                    }
                }
                "at" => m.placement = point3_at(kv, "module", "at")?,
                "clearance" => m.clearance = f64_at(kv, 1, "module", "clearance")?,
                "solder_mask_margin" => {
                    m.solder_mask_margin = f64_at(kv, 1, "module", "solder_mask_margin")?;
                }
                "solder_paste_margin" => {
                    m.solder_paste_margin = f64_at(kv, 1, "module", "solder_paste_margin")?;
                }
                "solder_paste_ratio" => {
                    m.solder_paste_ratio = f64_at(kv, 1, "module", "solder_paste_ratio")?;
                }
                "fp_line" => m.graphics.push(Graphic::Line(parse_fp_line(kv)?)),
                "fp_arc" => m.graphics.push(Graphic::Arc(parse_fp_arc(kv)?)),
                "fp_circle" => m.graphics.push(Graphic::Circle(parse_fp_circle(kv)?)),
                "fp_poly" => m.graphics.push(Graphic::Polygon(parse_fp_poly(kv)?)),
                "fp_text" => m.graphics.push(Graphic::Text(parse_fp_text(kv)?)),
                "pad" => m.pads.push(parse_pad(kv)?),
                "model" => m.model = Some(parse_model(kv)?),
                _ => {}
            }
        }
        Ok(m)
    }
}

fn parse_fp_line(kv: &[Sexpr]) -> Result<FpLine, FormatError> {
    let mut l = FpLine::default();
    for child in &kv[1..] {
        let Some(c) = child.as_list() else { continue };
        match key_of(c) {
            Some("start") => l.start = point_at(c, "fp_line", "start")?,
            Some("end") => l.end = point_at(c, "fp_line", "end")?,
            Some("layer") => l.layer = text_at(c, 1, "fp_line", "layer")?,
            Some("width") => l.width = f64_at(c, 1, "fp_line", "width")?,
            _ => {}
        }
    }
    Ok(l)
}

fn parse_fp_arc(kv: &[Sexpr]) -> Result<FpArc, FormatError> {
    let mut a = FpArc::default();
    for child in &kv[1..] {
        let Some(c) = child.as_list() else { continue };
        match key_of(c) {
            Some("start") => a.start = point_at(c, "fp_arc", "start")?,
            Some("end") => a.end = point_at(c, "fp_arc", "end")?,
            Some("angle") => a.angle = f64_at(c, 1, "fp_arc", "angle")?,
            Some("layer") => a.layer = text_at(c, 1, "fp_arc", "layer")?,
            Some("width") => a.width = f64_at(c, 1, "fp_arc", "width")?,
            _ => {}
        }
    }
    Ok(a)
}

fn parse_fp_circle(kv: &[Sexpr]) -> Result<FpCircle, FormatError> {
    let mut c2 = FpCircle::default();
    for child in &kv[1..] {
        let Some(c) = child.as_list() else { continue };
        match key_of(c) {
            Some("center") => c2.center = point_at(c, "fp_circle", "center")?,
            Some("end") => c2.end = point_at(c, "fp_circle", "end")?,
            Some("layer") => c2.layer = text_at(c, 1, "fp_circle", "layer")?,
            Some("width") => c2.width = f64_at(c, 1, "fp_circle", "width")?,
            _ => {}
        }
    }
    Ok(c2)
}

fn parse_fp_poly(kv: &[Sexpr]) -> Result<FpPolygon, FormatError> {
    let mut p = FpPolygon::default();
    for child in &kv[1..] {
        let Some(c) = child.as_list() else { continue };
        match key_of(c) {
            Some("pts") => p.points = xy_points(c, "fp_poly")?,
            Some("layer") => p.layer = text_at(c, 1, "fp_poly", "layer")?,
            Some("width") => p.width = f64_at(c, 1, "fp_poly", "width")?,
            _ => {}
        }
    }
    Ok(p)
}

fn parse_fp_text(kv: &[Sexpr]) -> Result<FpText, FormatError> {
    let kind = match kv.get(1).and_then(Sexpr::as_sym) {
        Some("reference") => TextKind::Reference,
        Some("value") => TextKind::Value,
        Some("user") => TextKind::User,
        other => {
            return Err(FormatError::UnknownValue {
                record: "fp_text",
                field: "kind",
                value: other.unwrap_or("").to_string(),
            });
        }
    };
    let mut t = FpText {
        kind,
        text: text_at(kv, 2, "fp_text", "text")?,
        ..Default::default()
    };
    for child in &kv[3..] {
        let Some(c) = child.as_list() else { continue };
        match key_of(c) {
            Some("at") => t.at = point3_at(c, "fp_text", "at")?,
            Some("layer") => t.layer = text_at(c, 1, "fp_text", "layer")?,
            Some("effects") => t.effects = parse_text_effects(c)?,
            _ => {}
        }
    }
    Ok(t)
}

fn parse_pad(kv: &[Sexpr]) -> Result<Pad, FormatError> {
    let mut p = Pad {
        ident: text_at(kv, 1, "pad", "ident")?,
        ..Default::default()
    };

    p.surface = match kv.get(2).and_then(Sexpr::as_sym) {
        Some("smd") => PadSurface::Smd,
        Some("thru_hole") => PadSurface::ThroughHole,
        Some("np_thru_hole") => PadSurface::NonPlatedThroughHole,
        Some("connect") => PadSurface::Connect,
        other => {
            return Err(FormatError::UnknownValue {
                record: "pad",
                field: "surface",
                value: other.unwrap_or("").to_string(),
            });
        }
    };
    p.shape = match kv.get(3).and_then(Sexpr::as_sym) {
        Some("rect") => PadShape::Rect,
        Some("oval") => PadShape::Oval,
        Some("circle") => PadShape::Circle,
        Some("trapezoid") => PadShape::Trapezoid,
        Some("roundrect") => PadShape::RoundRect,
        Some("custom") => PadShape::Custom,
        other => {
            return Err(FormatError::UnknownValue {
                record: "pad",
                field: "shape",
                value: other.unwrap_or("").to_string(),
            });
        }
    };

    for child in &kv[4..] {
        let Some(c) = child.as_list() else { continue };
        match key_of(c) {
            Some("at") => p.at = point3_at(c, "pad", "at")?,
            Some("size") => p.size = point_at(c, "pad", "size")?,
            Some("layers") => {
                for layer in &c[1..] {
                    p.layers.push(layer.atom_text().ok_or(FormatError::Field {
                        record: "pad",
                        field: "layers",
                        expected: "layer names",
                    })?);
                }
            }
            Some("rect_delta") => p.rect_delta = point_at(c, "pad", "rect_delta")?,
            Some("drill") => parse_drill(c, &mut p.drill)?,
            Some("net") => {
                p.net = i64_at(c, 1, "pad", "net")?;
                p.net_name = text_at(c, 2, "pad", "net")?;
            }
            Some("die_length") => p.die_length = f64_at(c, 1, "pad", "die_length")?,
            Some("solder_mask_margin") => {
                p.solder_mask_margin = f64_at(c, 1, "pad", "solder_mask_margin")?;
            }
            Some("solder_paste_margin") => {
                p.solder_paste_margin = f64_at(c, 1, "pad", "solder_paste_margin")?;
            }
            Some("solder_paste_margin_ratio") => {
                p.solder_paste_margin_ratio = f64_at(c, 1, "pad", "solder_paste_margin_ratio")?;
            }
            Some("clearance") => p.clearance = f64_at(c, 1, "pad", "clearance")?,
            Some("zone_connect") => p.zone_connect = i64_at(c, 1, "pad", "zone_connect")?,
            Some("thermal_width") => p.thermal_width = f64_at(c, 1, "pad", "thermal_width")?,
            Some("thermal_gap") => p.thermal_gap = f64_at(c, 1, "pad", "thermal_gap")?,
            Some("roundrect_rratio") => {
                p.roundrect_rratio = f64_at(c, 1, "pad", "roundrect_rratio")?;
            }
            Some("chamfer_ratio") => {
                p.chamfer_ratio = f64_at(c, 1, "pad", "chamfer_ratio")?;
                if p.chamfer_ratio > 0.0 {
                    p.shape = PadShape::ChamferedRect;
                }
            }
            _ => {}
        }
    }
    Ok(p)
}

/// `(drill [oval] width [height] [(offset x y)])` — the size atoms are
/// positional, the offset keyed.
fn parse_drill(c: &[Sexpr], drill: &mut Drill) -> Result<(), FormatError> {
    let mut read_width = false;
    for child in &c[1..] {
        if let Some(kv) = child.as_list() {
            if key_of(kv) == Some("offset") {
                drill.offset = point_at(kv, "pad", "drill offset")?;
            }
        } else if child.as_sym() == Some("oval") {
            drill.oblong = true;
        } else {
            let v = number_as_f64(child).ok_or(FormatError::Field {
                record: "pad",
                field: "drill",
                expected: "a number",
            })?;
            if read_width {
                drill.size.y = v;
            } else {
                drill.size.x = v;
                read_width = true;
            }
        }
    }
    Ok(())
}

fn parse_model(kv: &[Sexpr]) -> Result<Model3d, FormatError> {
    let mut m = Model3d {
        path: text_at(kv, 1, "model", "path")?,
        ..Default::default()
    };
    for child in &kv[2..] {
        let Some(c) = child.as_list() else { continue };
        let Some(key) = key_of(c) else { continue };
        let target = match key {
            "at" => &mut m.at,
            "scale" => &mut m.scale,
            "rotate" => &mut m.rotate,
            _ => continue,
        };
        // Each holds a nested (xyz x y z) list.
        let xyz = c
            .get(1)
            .and_then(Sexpr::as_list)
            .filter(|x| key_of(x) == Some("xyz"))
            .ok_or(FormatError::Missing {
                record: "model",
                field: "xyz",
            })?;
        *target = point3_at(xyz, "model", "xyz")?;
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_MODULE: &str = r#"
    (module C_0805 (layer F.Cu) (tedit 5AE5139B)
      (descr "Capacitor SMD 0805")
      (tags "capacitor 0805")
      (attr smd)
      (fp_text reference REF** (at 0 -1.68) (layer F.SilkS)
        (effects (font (size 1 1) (thickness 0.15)))
      )
      (fp_line (start -1.7 0.98) (end 1.7 0.98) (layer F.CrtYd) (width 0.05))
      (fp_circle (center 0 0) (end 0.5 0) (layer F.Fab) (width 0.1))
      (fp_poly (pts (xy 0 0) (xy 1 0) (xy 1 1)) (layer F.Cu) (width 0))
      (pad 1 smd rect (at -0.95 0) (size 1.3 1.45) (layers F.Cu F.Paste F.Mask)
        (net 2 GND))
      (pad 2 thru_hole circle (at 0.95 0 90) (size 1.3 1.45)
        (drill oval 0.8 1.2 (offset 0.1 0)) (layers *.Cu))
      (model Capacitors_SMD.3dshapes/C_0805.wrl
        (at (xyz 0 0 0))
        (scale (xyz 1 1 1))
        (rotate (xyz 0 0 180))
      )
    )"#;

    #[test]
    fn decodes_module() {
        let m = Module::parse(SMALL_MODULE).unwrap();
        assert_eq!(m.name, "C_0805");
        assert_eq!(m.layer, "F.Cu");
        assert_eq!(m.tedit, "5AE5139B");
        assert_eq!(m.tags, vec!["capacitor", "0805"]);
        assert_eq!(m.attrs, vec!["smd"]);

        assert_eq!(m.graphics.len(), 4);
        let Graphic::Text(text) = &m.graphics[0] else {
            panic!("expected fp_text first");
        };
        assert_eq!(text.kind, TextKind::Reference);
        assert_eq!(text.effects.thickness, 0.15);
        let Graphic::Polygon(poly) = &m.graphics[3] else {
            panic!("expected fp_poly last");
        };
        assert_eq!(poly.points.len(), 3);

        let model = m.model.as_ref().unwrap();
        assert_eq!(model.path, "Capacitors_SMD.3dshapes/C_0805.wrl");
        assert!(model.rotate.z_present);
        assert_eq!(model.rotate.z, 180.0);
    }

    #[test]
    fn decodes_pads() {
        let m = Module::parse(SMALL_MODULE).unwrap();
        assert_eq!(m.pads.len(), 2);

        let p1 = &m.pads[0];
        assert_eq!(p1.ident, "1");
        assert_eq!(p1.surface, PadSurface::Smd);
        assert_eq!(p1.shape, PadShape::Rect);
        assert_eq!(p1.net, 2);
        assert_eq!(p1.net_name, "GND");
        assert_eq!(p1.layers, vec!["F.Cu", "F.Paste", "F.Mask"]);
        assert!(!p1.at.z_present);

        let p2 = &m.pads[1];
        assert_eq!(p2.surface, PadSurface::ThroughHole);
        assert!(p2.at.z_present);
        assert_eq!(p2.at.z, 90.0);
        assert!(p2.drill.oblong);
        assert_eq!(p2.drill.size, Point::new(0.8, 1.2));
        assert_eq!(p2.drill.offset, Point::new(0.1, 0.0));
    }

    #[test]
    fn chamfer_ratio_switches_shape() {
        let m = Module::parse(
            r#"(module X (layer F.Cu)
                 (pad 1 smd roundrect (at 0 0) (size 1 1) (layers F.Cu)
                   (roundrect_rratio 0.25) (chamfer_ratio 0.2)))"#,
        )
        .unwrap();
        assert_eq!(m.pads[0].shape, PadShape::ChamferedRect);
        assert_eq!(m.pads[0].roundrect_rratio, 0.25);
    }

    #[test]
    fn rejects_unknown_pad_discriminators() {
        let err = Module::parse(
            r#"(module X (layer F.Cu) (pad 1 glued rect (at 0 0) (size 1 1) (layers F.Cu)))"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::UnknownValue { .. }));
    }

    #[test]
    fn rejects_wrong_marker() {
        assert!(matches!(
            Module::parse("(footprint X)"),
            Err(FormatError::BadMarker { .. })
        ));
    }
}
