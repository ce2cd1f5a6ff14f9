//! Canonical text emission.
//!
//! Every record type owns a fixed, hand-specified field order that matches
//! the layout downstream tooling diffs against. Scalar fields with a zero
//! default are omitted when zero; `yes`/`no` flags a record always carries
//! are emitted unconditionally. Long point lists wrap at a per-record cadence
//! (5 per line for zone polygons, 4 for footprint polygons). None of this
//! changes parsed meaning, but all of it is load-bearing for byte-exact
//! round-trips.

use std::io::{self, Write};

use kcboard_sexpr::Sexpr;
use kcboard_sexpr::formatter::{format_float, needs_quoting, quote_string, write_compact};

use crate::board::{
    Dimension, Drawing, EditorSetup, GrArc, GrLine, GrText, NetClass, Pcb, PlotParam, TextEffects,
    Track, Via, Zone,
};
use crate::footprint::{Graphic, Model3d, Module, Pad};
use crate::geometry::{Point, Point3};

/// Streaming s-expression emitter with two-space indentation per depth.
///
/// `open(true)` / `close(true)` force the parenthesis onto its own line;
/// `false` keeps it inline. Atoms separate themselves with single spaces.
pub struct SexprWriter<W: Write> {
    w: W,
    depth: usize,
    line_start: bool,
    needs_space: bool,
}

impl<W: Write> SexprWriter<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            depth: 0,
            line_start: true,
            needs_space: false,
        }
    }

    fn pad(&mut self) -> io::Result<()> {
        if self.line_start {
            for _ in 0..self.depth {
                self.w.write_all(b"  ")?;
            }
        } else if self.needs_space {
            self.w.write_all(b" ")?;
        }
        Ok(())
    }

    pub fn open(&mut self, newline: bool) -> io::Result<()> {
        if newline && !self.line_start {
            self.w.write_all(b"\n")?;
            self.line_start = true;
        }
        self.pad()?;
        self.w.write_all(b"(")?;
        self.depth += 1;
        self.line_start = false;
        self.needs_space = false;
        Ok(())
    }

    pub fn close(&mut self, newline: bool) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        if newline {
            if !self.line_start {
                self.w.write_all(b"\n")?;
                self.line_start = true;
            }
            self.pad()?;
        }
        self.w.write_all(b")")?;
        self.line_start = false;
        self.needs_space = true;
        Ok(())
    }

    fn atom(&mut self, text: &str) -> io::Result<()> {
        self.pad()?;
        self.w.write_all(text.as_bytes())?;
        self.line_start = false;
        self.needs_space = true;
        Ok(())
    }

    pub fn sym(&mut self, s: &str) -> io::Result<()> {
        self.atom(s)
    }

    /// A string value, quoted only when required.
    pub fn string(&mut self, s: &str) -> io::Result<()> {
        if needs_quoting(s) {
            self.atom(&quote_string(s))
        } else {
            self.atom(s)
        }
    }

    pub fn int(&mut self, v: i64) -> io::Result<()> {
        self.atom(&v.to_string())
    }

    pub fn float(&mut self, v: f64) -> io::Result<()> {
        self.atom(&format_float(v))
    }

    pub fn newlines(&mut self, n: usize) -> io::Result<()> {
        for _ in 0..n {
            self.w.write_all(b"\n")?;
        }
        self.line_start = true;
        self.needs_space = false;
        Ok(())
    }

    /// Replay a raw node on its own line, verbatim (numeric lexemes included).
    pub fn raw_node(&mut self, node: &Sexpr) -> io::Result<()> {
        if !self.line_start {
            self.w.write_all(b"\n")?;
            self.line_start = true;
        }
        let mut text = String::new();
        write_compact(node, &mut text);
        self.atom(&text)
    }

    fn kv_str(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.open(false)?;
        self.sym(key)?;
        self.string(value)?;
        self.close(false)
    }

    fn kv_int(&mut self, key: &str, value: i64) -> io::Result<()> {
        self.open(false)?;
        self.sym(key)?;
        self.int(value)?;
        self.close(false)
    }

    fn kv_float(&mut self, key: &str, value: f64) -> io::Result<()> {
        self.open(false)?;
        self.sym(key)?;
        self.float(value)?;
        self.close(false)
    }

    fn kv_str_line(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.open(true)?;
        self.sym(key)?;
        self.string(value)?;
        self.close(false)
    }

    fn kv_float_line(&mut self, key: &str, value: f64) -> io::Result<()> {
        self.open(true)?;
        self.sym(key)?;
        self.float(value)?;
        self.close(false)
    }
}

fn write_point<W: Write>(w: &mut SexprWriter<W>, key: &str, p: Point) -> io::Result<()> {
    w.open(false)?;
    w.sym(key)?;
    w.float(p.x)?;
    w.float(p.y)?;
    w.close(false)
}

fn write_point3<W: Write>(w: &mut SexprWriter<W>, key: &str, p: Point3) -> io::Result<()> {
    w.open(false)?;
    w.sym(key)?;
    w.float(p.x)?;
    w.float(p.y)?;
    if p.z_present {
        w.float(p.z)?;
    }
    w.close(false)
}

/// `(key (xyz x y [z]))` as used by 3-D model placement.
fn write_xyz<W: Write>(w: &mut SexprWriter<W>, key: &str, p: Point3) -> io::Result<()> {
    w.open(true)?;
    w.sym(key)?;
    write_point3(w, "xyz", p)?;
    w.close(false)
}

fn write_effects<W: Write>(w: &mut SexprWriter<W>, effects: &TextEffects) -> io::Result<()> {
    w.open(true)?;
    w.sym("effects")?;
    w.open(false)?;
    w.sym("font")?;
    write_point(w, "size", effects.font_size)?;
    w.kv_float("thickness", effects.thickness)?;
    w.close(false)?;
    w.close(false)
}

impl Pcb {
    /// Serialize the board to a byte sink. Write failures propagate
    /// immediately; partial output is not rolled back.
    pub fn encode<W: Write>(&self, sink: W) -> io::Result<()> {
        log::debug!(
            "encoding board: {} nets, {} tracks, {} modules",
            self.nets.len(),
            self.tracks.len(),
            self.modules.len()
        );
        let mut w = SexprWriter::new(sink);
        self.write(&mut w)
    }

    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(false)?;
        w.sym("kicad_pcb")?;
        w.open(false)?;
        w.sym("version")?;
        w.int(self.format_version)?;
        w.close(false)?;
        w.open(false)?;
        w.sym("host")?;
        w.string(&self.created_by.tool)?;
        w.string(&self.created_by.version)?;
        w.close(false)?;
        w.newlines(2)?;

        w.open(false)?;
        w.sym("general")?;
        w.close(false)?;
        w.newlines(2)?;

        w.kv_str("page", &self.page)?;
        w.newlines(1)?;

        let mut layers: Vec<_> = self.layers.iter().collect();
        layers.sort_by_key(|l| l.num);
        w.open(false)?;
        w.sym("layers")?;
        if layers.is_empty() {
            w.close(false)?;
        } else {
            w.newlines(1)?;
            for layer in layers {
                w.open(false)?;
                w.int(layer.num)?;
                w.string(&layer.name)?;
                w.string(&layer.kind)?;
                w.close(false)?;
                w.newlines(1)?;
            }
            w.close(true)?;
        }
        w.newlines(2)?;

        self.editor_setup.write(w)?;
        w.newlines(2)?;

        // Nets are the one record the writer deliberately re-sorts, by index.
        if !self.nets.is_empty() {
            for (num, net) in &self.nets {
                w.open(false)?;
                w.sym("net")?;
                w.int(*num)?;
                w.string(&net.name)?;
                w.close(false)?;
                w.newlines(1)?;
            }
            w.newlines(1)?;
        }

        for nc in &self.net_classes {
            nc.write(w)?;
            w.newlines(1)?;
        }
        for d in &self.dimensions {
            d.write(w)?;
            w.newlines(1)?;
        }
        for d in &self.drawings {
            d.write(w)?;
            w.newlines(1)?;
        }
        for t in &self.tracks {
            t.write(w)?;
            w.newlines(1)?;
        }
        for v in &self.vias {
            v.write(w)?;
            w.newlines(1)?;
        }
        for z in &self.zones {
            z.write(w)?;
            w.newlines(1)?;
        }
        for m in &self.modules {
            m.write(w, true)?;
            w.newlines(1)?;
        }

        w.close(true)?;
        w.newlines(1)
    }
}

/// One composed or retained child of the setup block.
enum SetupChild<'a> {
    Known(Sexpr),
    Raw(&'a Sexpr),
    Plot(&'a [PlotParam]),
}

fn kv_f(key: &str, v: f64) -> Sexpr {
    Sexpr::list(vec![Sexpr::symbol(key), Sexpr::float(v)])
}

fn kv_flag(key: &str, v: bool) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol(key),
        Sexpr::symbol(if v { "yes" } else { "no" }),
    ])
}

fn kv_fs(key: &str, vs: &[f64]) -> Sexpr {
    let mut items = vec![Sexpr::symbol(key)];
    items.extend(vs.iter().map(|v| Sexpr::float(*v)));
    Sexpr::list(items)
}

impl EditorSetup {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        let mut known: Vec<SetupChild> = Vec::new();
        if self.last_trace_width > 0.0 {
            known.push(SetupChild::Known(kv_f(
                "last_trace_width",
                self.last_trace_width,
            )));
        }
        for width in &self.user_trace_widths {
            known.push(SetupChild::Known(kv_f("user_trace_width", *width)));
        }
        if self.trace_clearance > 0.0 {
            known.push(SetupChild::Known(kv_f(
                "trace_clearance",
                self.trace_clearance,
            )));
        }
        if self.zone_clearance > 0.0 {
            known.push(SetupChild::Known(kv_f("zone_clearance", self.zone_clearance)));
        }
        known.push(SetupChild::Known(kv_flag("zone_45_only", self.zone_45_only)));
        if self.trace_min > 0.0 {
            known.push(SetupChild::Known(kv_f("trace_min", self.trace_min)));
        }
        if self.segment_width > 0.0 {
            known.push(SetupChild::Known(kv_f("segment_width", self.segment_width)));
        }
        if self.edge_width > 0.0 {
            known.push(SetupChild::Known(kv_f("edge_width", self.edge_width)));
        }

        if self.via_size > 0.0 {
            known.push(SetupChild::Known(kv_f("via_size", self.via_size)));
        }
        if self.via_min_size > 0.0 {
            known.push(SetupChild::Known(kv_f("via_min_size", self.via_min_size)));
        }
        if self.via_min_drill > 0.0 {
            known.push(SetupChild::Known(kv_f("via_min_drill", self.via_min_drill)));
        }
        if self.via_drill > 0.0 {
            known.push(SetupChild::Known(kv_f("via_drill", self.via_drill)));
        }
        if self.uvia_size > 0.0 {
            known.push(SetupChild::Known(kv_f("uvia_size", self.uvia_size)));
        }
        if self.uvia_min_size > 0.0 {
            known.push(SetupChild::Known(kv_f("uvia_min_size", self.uvia_min_size)));
        }
        if self.uvia_min_drill > 0.0 {
            known.push(SetupChild::Known(kv_f("uvia_min_drill", self.uvia_min_drill)));
        }
        if self.uvia_drill > 0.0 {
            known.push(SetupChild::Known(kv_f("uvia_drill", self.uvia_drill)));
        }
        known.push(SetupChild::Known(kv_flag(
            "uvias_allowed",
            self.uvias_allowed,
        )));

        if self.text_width > 0.0 {
            known.push(SetupChild::Known(kv_f("pcb_text_width", self.text_width)));
        }
        if !self.text_size.is_empty() {
            known.push(SetupChild::Known(kv_fs("pcb_text_size", &self.text_size)));
        }

        if self.mod_edge_width > 0.0 {
            known.push(SetupChild::Known(kv_f("mod_edge_width", self.mod_edge_width)));
        }
        if !self.mod_text_size.is_empty() {
            known.push(SetupChild::Known(kv_fs("mod_text_size", &self.mod_text_size)));
        }
        if self.mod_text_width > 0.0 {
            known.push(SetupChild::Known(kv_f("mod_text_width", self.mod_text_width)));
        }

        if !self.pad_size.is_empty() {
            known.push(SetupChild::Known(kv_fs("pad_size", &self.pad_size)));
        }
        if self.pad_drill > 0.0 {
            known.push(SetupChild::Known(kv_f("pad_drill", self.pad_drill)));
        }
        if self.pad_to_mask_clearance > 0.0 {
            known.push(SetupChild::Known(kv_f(
                "pad_to_mask_clearance",
                self.pad_to_mask_clearance,
            )));
        }

        if !self.plot_params.is_empty() {
            known.push(SetupChild::Plot(&self.plot_params));
        }

        // Splice retained unknown children back in at their recorded relative
        // positions among the known fields.
        let mut children: Vec<SetupChild> = Vec::with_capacity(known.len() + self.unrecognized.len());
        let mut unknown = self.unrecognized.iter();
        let mut pending = unknown.next();
        for child in known {
            while let Some((idx, node)) = pending {
                if *idx > children.len() + 1 {
                    break;
                }
                children.push(SetupChild::Raw(node));
                pending = unknown.next();
            }
            children.push(child);
        }
        while let Some((_, node)) = pending {
            children.push(SetupChild::Raw(node));
            pending = unknown.next();
        }

        w.open(false)?;
        w.sym("setup")?;
        for child in &children {
            match child {
                SetupChild::Known(node) => w.raw_node(node)?,
                SetupChild::Raw(node) => w.raw_node(node)?,
                SetupChild::Plot(params) => {
                    w.open(true)?;
                    w.sym("pcbplotparams")?;
                    for param in params.iter() {
                        w.open(true)?;
                        w.sym(&param.name)?;
                        for value in &param.values {
                            w.string(value)?;
                        }
                        w.close(false)?;
                    }
                    w.close(false)?;
                }
            }
        }
        w.close(true)
    }
}

impl NetClass {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("net_class")?;
        w.string(&self.name)?;
        w.string(&self.description)?;
        if self.clearance > 0.0 {
            w.kv_float_line("clearance", self.clearance)?;
        }
        if self.trace_width > 0.0 {
            w.kv_float_line("trace_width", self.trace_width)?;
        }
        if self.via_dia > 0.0 {
            w.kv_float_line("via_dia", self.via_dia)?;
        }
        if self.via_drill > 0.0 {
            w.kv_float_line("via_drill", self.via_drill)?;
        }
        if self.uvia_dia > 0.0 {
            w.kv_float_line("uvia_dia", self.uvia_dia)?;
        }
        if self.uvia_drill > 0.0 {
            w.kv_float_line("uvia_drill", self.uvia_drill)?;
        }
        for net in &self.nets {
            w.kv_str_line("add_net", net)?;
        }
        w.close(true)
    }
}

impl Track {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("segment")?;
        write_point(w, "start", self.start)?;
        write_point(w, "end", self.end)?;
        w.kv_float("width", self.width)?;
        w.kv_str("layer", &self.layer)?;
        w.kv_int("net", self.net)?;
        if !self.tstamp.is_empty() {
            w.kv_str("tstamp", &self.tstamp)?;
        }
        w.close(false)
    }
}

impl Via {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("via")?;
        write_point(w, "at", self.at)?;
        w.kv_float("size", self.size)?;
        w.kv_float("drill", self.drill)?;
        w.open(false)?;
        w.sym("layers")?;
        for layer in &self.layers {
            w.string(layer)?;
        }
        w.close(false)?;
        w.kv_int("net", self.net)?;
        w.close(false)
    }
}

impl Drawing {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        match self {
            Drawing::Line(l) => l.write(w),
            Drawing::Arc(a) => a.write(w),
            Drawing::Text(t) => t.write(w),
        }
    }
}

impl GrLine {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("gr_line")?;
        write_point(w, "start", self.start)?;
        write_point(w, "end", self.end)?;
        w.kv_str("layer", &self.layer)?;
        w.kv_float("width", self.width)?;
        w.close(false)
    }
}

impl GrArc {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("gr_arc")?;
        write_point(w, "start", self.start)?;
        write_point(w, "end", self.end)?;
        w.kv_float("angle", self.angle)?;
        w.kv_str("layer", &self.layer)?;
        w.kv_float("width", self.width)?;
        w.close(false)
    }
}

impl GrText {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("gr_text")?;
        w.string(&self.text)?;
        write_point3(w, "at", self.at)?;
        w.kv_str("layer", &self.layer)?;
        write_effects(w, &self.effects)?;
        w.close(true)
    }
}

impl Dimension {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("dimension")?;
        w.float(self.value)?;
        w.kv_float("width", self.width)?;
        w.kv_str("layer", &self.layer)?;
        self.text.write(w)?;
        for feature in &self.features {
            w.open(true)?;
            w.sym(&feature.name)?;
            w.open(false)?;
            w.sym("pts")?;
            for p in &feature.points {
                write_point(w, "xy", *p)?;
            }
            w.close(false)?;
            w.close(false)?;
        }
        w.close(true)
    }
}

impl Zone {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("zone")?;
        w.kv_int("net", self.net)?;
        w.kv_str("net_name", &self.net_name)?;
        w.kv_str("layer", &self.layer)?;
        w.kv_str("tstamp", &self.tstamp)?;
        w.open(false)?;
        w.sym("hatch")?;
        w.string(&self.hatch.mode)?;
        w.float(self.hatch.size)?;
        w.close(false)?;
        w.newlines(1)?;

        w.open(false)?;
        w.sym("connect_pads")?;
        w.kv_float("clearance", self.connect_pads_clearance)?;
        w.close(false)?;
        w.newlines(1)?;

        w.kv_float("min_thickness", self.min_thickness)?;
        w.newlines(1)?;

        w.open(false)?;
        w.sym("fill")?;
        w.sym(if self.fill.enabled { "yes" } else { "no" })?;
        w.kv_int("arc_segments", self.fill.arc_segments)?;
        w.kv_float("thermal_gap", self.fill.thermal_gap)?;
        w.kv_float("thermal_bridge_width", self.fill.thermal_bridge_width)?;
        w.close(false)?;
        w.newlines(1)?;

        for poly in &self.base_polys {
            write_zone_poly(w, "polygon", poly)?;
            w.newlines(1)?;
        }
        for poly in &self.filled_polys {
            write_zone_poly(w, "filled_polygon", poly)?;
            w.newlines(1)?;
        }
        w.close(true)
    }
}

fn write_zone_poly<W: Write>(
    w: &mut SexprWriter<W>,
    key: &str,
    poly: &[Point],
) -> io::Result<()> {
    w.open(false)?;
    w.sym(key)?;
    w.newlines(1)?;
    w.open(false)?;
    w.sym("pts")?;
    w.newlines(1)?;
    for (i, p) in poly.iter().enumerate() {
        write_point(w, "xy", *p)?;
        if i % 5 == 4 {
            w.newlines(1)?;
        }
    }
    w.close(true)?;
    w.close(true)
}

impl Module {
    /// Serialize a standalone footprint file (placement suppressed).
    pub fn encode<W: Write>(&self, sink: W) -> io::Result<()> {
        log::debug!("encoding module {:?}", self.name);
        let mut w = SexprWriter::new(sink);
        self.write(&mut w, false)?;
        w.newlines(1)
    }

    pub(crate) fn write<W: Write>(
        &self,
        w: &mut SexprWriter<W>,
        with_placement: bool,
    ) -> io::Result<()> {
        w.open(true)?;
        w.sym("module")?;
        w.string(&self.name)?;
        w.kv_str("layer", &self.layer)?;
        if !self.tedit.is_empty() {
            w.kv_str("tedit", &self.tedit)?;
        }
        if !self.tstamp.is_empty() {
            w.kv_str("tstamp", &self.tstamp)?;
        }
        w.newlines(1)?;

        if with_placement {
            write_point3(w, "at", self.placement)?;
        }
        if !self.description.is_empty() {
            w.kv_str_line("descr", &self.description)?;
        }
        if !self.tags.is_empty() {
            w.kv_str_line("tags", &self.tags.join(" "))?;
        }
        if !self.path.is_empty() {
            w.kv_str_line("path", &self.path)?;
        }
        if !self.attrs.is_empty() {
            w.open(true)?;
            w.sym("attr")?;
            for attr in &self.attrs {
                w.string(attr)?;
            }
            w.close(false)?;
        }
        if self.clearance != 0.0 {
            w.kv_float_line("clearance", self.clearance)?;
        }
        if self.solder_mask_margin != 0.0 {
            w.kv_float_line("solder_mask_margin", self.solder_mask_margin)?;
        }
        if self.solder_paste_margin != 0.0 {
            w.kv_float_line("solder_paste_margin", self.solder_paste_margin)?;
        }
        if self.solder_paste_ratio != 0.0 {
            w.kv_float_line("solder_paste_ratio", self.solder_paste_ratio)?;
        }

        for graphic in &self.graphics {
            graphic.write(w)?;
        }
        for pad in &self.pads {
            pad.write(w)?;
        }
        if let Some(model) = &self.model {
            model.write(w)?;
        }
        w.close(true)
    }
}

impl Graphic {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        match self {
            Graphic::Line(l) => {
                w.open(true)?;
                w.sym("fp_line")?;
                write_point(w, "start", l.start)?;
                write_point(w, "end", l.end)?;
                w.kv_str("layer", &l.layer)?;
                w.kv_float("width", l.width)?;
                w.close(false)
            }
            Graphic::Arc(a) => {
                w.open(true)?;
                w.sym("fp_arc")?;
                write_point(w, "start", a.start)?;
                write_point(w, "end", a.end)?;
                w.kv_float("angle", a.angle)?;
                w.kv_str("layer", &a.layer)?;
                w.kv_float("width", a.width)?;
                w.close(false)
            }
            Graphic::Circle(c) => {
                w.open(true)?;
                w.sym("fp_circle")?;
                write_point(w, "center", c.center)?;
                write_point(w, "end", c.end)?;
                w.kv_str("layer", &c.layer)?;
                w.kv_float("width", c.width)?;
                w.close(false)
            }
            Graphic::Polygon(p) => {
                w.open(true)?;
                w.sym("fp_poly")?;
                w.open(false)?;
                w.sym("pts")?;
                for (i, point) in p.points.iter().enumerate() {
                    write_point(w, "xy", *point)?;
                    if i % 4 == 3 {
                        w.newlines(1)?;
                    }
                }
                w.close(false)?;
                w.kv_str("layer", &p.layer)?;
                w.kv_float("width", p.width)?;
                w.close(false)
            }
            Graphic::Text(t) => {
                w.open(true)?;
                w.sym("fp_text")?;
                w.sym(t.kind.token())?;
                w.string(&t.text)?;
                write_point3(w, "at", t.at)?;
                w.kv_str("layer", &t.layer)?;
                write_effects(w, &t.effects)?;
                w.close(true)
            }
        }
    }
}

impl Pad {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("pad")?;
        w.string(&self.ident)?;
        w.sym(self.surface.token())?;
        w.sym(self.shape.token())?;
        write_point3(w, "at", self.at)?;
        write_point(w, "size", self.size)?;
        if self.rect_delta != Point::default() {
            write_point(w, "rect_delta", self.rect_delta)?;
        }
        if self.drill.size != Point::default()
            || self.drill.oblong
            || self.drill.offset != Point::default()
        {
            w.open(false)?;
            w.sym("drill")?;
            if self.drill.oblong {
                w.sym("oval")?;
            }
            w.float(self.drill.size.x)?;
            if self.drill.size.y != 0.0 {
                w.float(self.drill.size.y)?;
            }
            if self.drill.offset != Point::default() {
                write_point(w, "offset", self.drill.offset)?;
            }
            w.close(false)?;
        }
        w.open(false)?;
        w.sym("layers")?;
        for layer in &self.layers {
            w.string(layer)?;
        }
        w.close(false)?;
        if self.net != 0 || !self.net_name.is_empty() {
            w.open(false)?;
            w.sym("net")?;
            w.int(self.net)?;
            w.string(&self.net_name)?;
            w.close(false)?;
        }

        if self.die_length != 0.0 {
            w.kv_float("die_length", self.die_length)?;
        }
        if self.solder_mask_margin != 0.0 {
            w.kv_float("solder_mask_margin", self.solder_mask_margin)?;
        }
        if self.solder_paste_margin != 0.0 {
            w.kv_float("solder_paste_margin", self.solder_paste_margin)?;
        }
        if self.solder_paste_margin_ratio != 0.0 {
            w.kv_float("solder_paste_margin_ratio", self.solder_paste_margin_ratio)?;
        }
        if self.clearance != 0.0 {
            w.kv_float("clearance", self.clearance)?;
        }
        if self.zone_connect != 0 {
            w.kv_int("zone_connect", self.zone_connect)?;
        }
        if self.thermal_width != 0.0 {
            w.kv_float("thermal_width", self.thermal_width)?;
        }
        if self.thermal_gap != 0.0 {
            w.kv_float("thermal_gap", self.thermal_gap)?;
        }
        if self.roundrect_rratio != 0.0 {
            w.kv_float("roundrect_rratio", self.roundrect_rratio)?;
        }
        if self.chamfer_ratio != 0.0 {
            w.kv_float("chamfer_ratio", self.chamfer_ratio)?;
        }
        w.close(false)
    }
}

impl Model3d {
    fn write<W: Write>(&self, w: &mut SexprWriter<W>) -> io::Result<()> {
        w.open(true)?;
        w.sym("model")?;
        w.string(&self.path)?;
        write_xyz(w, "at", self.at)?;
        write_xyz(w, "scale", self.scale)?;
        write_xyz(w, "rotate", self.rotate)?;
        w.close(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{DimensionFeature, Hatch, Host, Layer, Net};
    use crate::footprint::{FpLine, FpText, PadShape, PadSurface, TextKind};

    fn encode_board(pcb: &Pcb) -> String {
        let mut out = Vec::new();
        pcb.encode(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn test_board() -> Pcb {
        let mut pcb = Pcb::new();
        pcb.created_by = Host {
            tool: "pcbnew".to_string(),
            version: "4.0.7".to_string(),
        };
        pcb
    }

    #[test]
    fn empty_board() {
        let expected = "(kicad_pcb (version 4) (host pcbnew 4.0.7)\n\n  (general)\n\n  (page A4)\n  (layers)\n\n  (setup\n    (zone_45_only no)\n    (uvias_allowed no)\n  )\n\n)\n";
        assert_eq!(encode_board(&test_board()), expected);
    }

    #[test]
    fn layers_sorted_by_ordinal() {
        let mut pcb = test_board();
        pcb.layers.push(Layer {
            num: 31,
            name: "B.Cu".to_string(),
            kind: "signal".to_string(),
            sequence: 0,
        });
        pcb.layers.push(Layer {
            num: 0,
            name: "F.Cu".to_string(),
            kind: "signal".to_string(),
            sequence: 1,
        });
        let out = encode_board(&pcb);
        assert!(out.contains(
            "  (layers\n    (0 F.Cu signal)\n    (31 B.Cu signal)\n  )\n"
        ));
    }

    #[test]
    fn nets_sorted_and_copper_records() {
        let mut pcb = test_board();
        pcb.layers.push(Layer {
            num: 0,
            name: "F.Cu".to_string(),
            kind: "signal".to_string(),
            sequence: 0,
        });
        pcb.nets.insert(
            1,
            Net {
                name: "+5V".to_string(),
                sequence: 1,
            },
        );
        pcb.nets.insert(
            0,
            Net {
                name: String::new(),
                sequence: 2,
            },
        );
        pcb.net_classes.push(NetClass {
            name: "Default".to_string(),
            description: "Default net class".to_string(),
            clearance: 0.2,
            trace_width: 0.25,
            nets: vec!["+5V".to_string()],
            ..Default::default()
        });
        pcb.tracks.push(Track {
            start: Point::new(100.0, 32.5),
            end: Point::new(10.0, 32.5),
            width: 0.25,
            layer: "F.Cu".to_string(),
            net: 1,
            ..Default::default()
        });
        pcb.vias.push(Via {
            at: Point::new(100.0, 32.5),
            size: 0.8,
            drill: 0.4,
            layers: vec!["F.Cu".to_string(), "B.Cu".to_string()],
            net: 1,
            ..Default::default()
        });

        let expected = "(kicad_pcb (version 4) (host pcbnew 4.0.7)\n\n  (general)\n\n  (page A4)\n  (layers\n    (0 F.Cu signal)\n  )\n\n  (setup\n    (zone_45_only no)\n    (uvias_allowed no)\n  )\n\n  (net 0 \"\")\n  (net 1 +5V)\n\n  (net_class Default \"Default net class\"\n    (clearance 0.2)\n    (trace_width 0.25)\n    (add_net +5V)\n  )\n  (segment (start 100 32.5) (end 10 32.5) (width 0.25) (layer F.Cu) (net 1))\n  (via (at 100 32.5) (size 0.8) (drill 0.4) (layers F.Cu B.Cu) (net 1))\n)\n";
        assert_eq!(encode_board(&pcb), expected);
    }

    #[test]
    fn setup_plot_params_block() {
        let mut pcb = test_board();
        pcb.editor_setup.pad_drill = 0.762;
        pcb.editor_setup.plot_params = vec![
            PlotParam {
                name: "layerselection".to_string(),
                values: vec!["0x010f0_80000001".to_string()],
            },
            PlotParam {
                name: "scaleselection".to_string(),
                values: vec!["1".to_string()],
            },
            PlotParam {
                name: "usegerberextensions".to_string(),
                values: vec!["true".to_string()],
            },
        ];
        let out = encode_board(&pcb);
        assert!(out.contains(
            "  (setup\n    (zone_45_only no)\n    (uvias_allowed no)\n    (pad_drill 0.762)\n    (pcbplotparams\n      (layerselection 0x010f0_80000001)\n      (scaleselection 1)\n      (usegerberextensions true))\n  )\n"
        ));
    }

    #[test]
    fn zone_block_with_wrapped_points() {
        let mut pcb = test_board();
        let pts = vec![
            Point::new(11.0, 22.0),
            Point::new(11.1, 22.0),
            Point::new(11.0, 22.0),
            Point::new(11.0, 22.0),
            Point::new(11.0, 22.0),
            Point::new(11.0, 22.0),
            Point::new(11.0, 22.0),
        ];
        pcb.zones.push(Zone {
            net: 42,
            net_name: "DBUS".to_string(),
            layer: "F.Cu".to_string(),
            tstamp: "0".to_string(),
            hatch: Hatch {
                mode: String::new(),
                size: 0.0,
            },
            min_thickness: 0.254,
            base_polys: vec![pts.clone()],
            filled_polys: vec![pts],
            ..Default::default()
        });
        let out = encode_board(&pcb);
        assert!(out.contains(
            "  (zone (net 42) (net_name DBUS) (layer F.Cu) (tstamp 0) (hatch \"\" 0)\n    (connect_pads (clearance 0))\n    (min_thickness 0.254)\n    (fill no (arc_segments 0) (thermal_gap 0) (thermal_bridge_width 0))\n    (polygon\n      (pts\n        (xy 11 22) (xy 11.1 22) (xy 11 22) (xy 11 22) (xy 11 22)\n        (xy 11 22) (xy 11 22)\n      )\n    )\n    (filled_polygon\n      (pts\n        (xy 11 22) (xy 11.1 22) (xy 11 22) (xy 11 22) (xy 11 22)\n        (xy 11 22) (xy 11 22)\n      )\n    )\n  )\n"
        ));
    }

    #[test]
    fn zone_tstamp_is_always_written() {
        let mut pcb = test_board();
        pcb.zones.push(Zone {
            net: 1,
            net_name: "GND".to_string(),
            layer: "F.Cu".to_string(),
            min_thickness: 0.254,
            ..Default::default()
        });
        let out = encode_board(&pcb);
        assert!(out.contains("  (zone (net 1) (net_name GND) (layer F.Cu) (tstamp \"\") (hatch \"\" 0)\n"));
    }

    #[test]
    fn board_text_block() {
        let mut pcb = test_board();
        pcb.drawings.push(Drawing::Text(GrText {
            text: "Oops".to_string(),
            at: Point3::new(100.0, 32.5),
            layer: "F.SilkS".to_string(),
            effects: TextEffects {
                font_size: Point::new(1.5, 1.5),
                thickness: 0.3,
            },
            sequence: 0,
        }));
        let out = encode_board(&pcb);
        assert!(out.contains(
            "  (gr_text Oops (at 100 32.5) (layer F.SilkS)\n    (effects (font (size 1.5 1.5) (thickness 0.3)))\n  )\n"
        ));
    }

    #[test]
    fn dimension_block() {
        let mut pcb = test_board();
        pcb.dimensions.push(Dimension {
            value: 12.446,
            width: 0.3,
            layer: "F.Fab".to_string(),
            text: GrText {
                text: "12.446 mm".to_string(),
                at: Point3::with_z(125.396, 93.853, 90.0),
                layer: "F.Fab".to_string(),
                effects: TextEffects {
                    font_size: Point::new(1.5, 1.5),
                    thickness: 0.3,
                },
                sequence: 0,
            },
            features: vec![
                DimensionFeature {
                    name: "feature1".to_string(),
                    points: vec![Point::new(173.736, 100.076), Point::new(173.736, 106.586)],
                },
                DimensionFeature {
                    name: "feature2".to_string(),
                    points: vec![Point::new(132.08, 100.076), Point::new(132.08, 106.586)],
                },
            ],
            sequence: 0,
        });
        let out = encode_board(&pcb);
        assert!(out.contains(
            "  (dimension 12.446 (width 0.3) (layer F.Fab)\n    (gr_text \"12.446 mm\" (at 125.396 93.853 90) (layer F.Fab)\n      (effects (font (size 1.5 1.5) (thickness 0.3)))\n    )\n    (feature1 (pts (xy 173.736 100.076) (xy 173.736 106.586)))\n    (feature2 (pts (xy 132.08 100.076) (xy 132.08 106.586)))\n  )\n"
        ));
    }

    #[test]
    fn standalone_module() {
        let module = Module {
            name: "C_0805".to_string(),
            layer: "F.Cu".to_string(),
            tedit: "5AE5139B".to_string(),
            description: "Capacitor SMD 0805".to_string(),
            tags: vec!["capacitor".to_string(), "0805".to_string()],
            attrs: vec!["smd".to_string()],
            graphics: vec![
                Graphic::Text(FpText {
                    kind: TextKind::Reference,
                    text: "REF**".to_string(),
                    at: Point3::new(0.0, -1.68),
                    layer: "F.SilkS".to_string(),
                    effects: TextEffects {
                        font_size: Point::new(1.0, 1.0),
                        thickness: 0.15,
                    },
                }),
                Graphic::Line(FpLine {
                    start: Point::new(-1.7, 0.98),
                    end: Point::new(1.7, 0.98),
                    layer: "F.CrtYd".to_string(),
                    width: 0.05,
                }),
            ],
            pads: vec![Pad {
                ident: "1".to_string(),
                surface: PadSurface::Smd,
                shape: PadShape::Rect,
                at: Point3::new(-0.95, 0.0),
                size: Point::new(1.3, 1.45),
                layers: vec![
                    "F.Cu".to_string(),
                    "F.Paste".to_string(),
                    "F.Mask".to_string(),
                ],
                net: 2,
                net_name: "GND".to_string(),
                ..Default::default()
            }],
            model: Some(Model3d {
                path: "Capacitors_SMD.3dshapes/C_0805.wrl".to_string(),
                at: Point3::with_z(0.0, 0.0, 0.0),
                scale: Point3::with_z(1.0, 1.0, 1.0),
                rotate: Point3::with_z(0.0, 0.0, 180.0),
            }),
            ..Default::default()
        };

        let mut out = Vec::new();
        module.encode(&mut out).unwrap();
        let expected = "(module C_0805 (layer F.Cu) (tedit 5AE5139B)\n  (descr \"Capacitor SMD 0805\")\n  (tags \"capacitor 0805\")\n  (attr smd)\n  (fp_text reference REF** (at 0 -1.68) (layer F.SilkS)\n    (effects (font (size 1 1) (thickness 0.15)))\n  )\n  (fp_line (start -1.7 0.98) (end 1.7 0.98) (layer F.CrtYd) (width 0.05))\n  (pad 1 smd rect (at -0.95 0) (size 1.3 1.45) (layers F.Cu F.Paste F.Mask) (net 2 GND))\n  (model Capacitors_SMD.3dshapes/C_0805.wrl\n    (at (xyz 0 0 0))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 180))\n  )\n)\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn chamfered_pad_reuses_roundrect_token() {
        let pad = Pad {
            ident: "1".to_string(),
            surface: PadSurface::Smd,
            shape: PadShape::ChamferedRect,
            at: Point3::new(0.0, 0.0),
            size: Point::new(1.0, 1.0),
            layers: vec!["F.Cu".to_string()],
            roundrect_rratio: 0.25,
            chamfer_ratio: 0.2,
            ..Default::default()
        };
        let mut out = Vec::new();
        let mut w = SexprWriter::new(&mut out);
        pad.write(&mut w).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "(pad 1 smd roundrect (at 0 0) (size 1 1) (layers F.Cu) (roundrect_rratio 0.25) (chamfer_ratio 0.2))"
        );
    }
}
