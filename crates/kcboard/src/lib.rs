//! Typed model, codec, and editing operations for legacy KiCad board files.
//!
//! The crate decodes `kicad_pcb` board documents and `module` footprint
//! documents into typed entities ([`Pcb`], [`Module`]), re-encodes them in a
//! canonical layout that is byte-stable under decode/encode round-trips, and
//! offers editing operations on the decoded form, such as carving a
//! rectangular region out of a board's drawings ([`Pcb::carve`]).
//!
//! Parsing of the underlying s-expression syntax lives in the `kcboard-sexpr`
//! crate; this crate gives the expression trees meaning.
//!
//! ```no_run
//! use kcboard::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::read_file("board.kicad_pcb")?;
//! let mut out = Vec::new();
//! doc.encode(&mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod carve;
mod decode;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod write;

pub use board::Pcb;
pub use carve::{CarveOutcome, Region, Segment, carve_line, carve_segment};
pub use error::{CarveError, FormatError, GeometryError, ReadError};
pub use footprint::Module;
pub use geometry::{Point, Point3};

use std::fs;
use std::io;
use std::path::Path;

use kcboard_sexpr::Sexpr;

/// A decoded file of either kind, discriminated by the root marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Board(Pcb),
    Footprint(Module),
}

impl Document {
    /// Decode document text, dispatching on the root marker.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let tree = kcboard_sexpr::parse(text)?;
        Self::from_sexpr(&tree)
    }

    /// Decode an already-parsed expression tree.
    pub fn from_sexpr(root: &Sexpr) -> Result<Self, FormatError> {
        let items = root.as_list().ok_or(FormatError::RootNotList)?;
        match items.first().and_then(Sexpr::as_sym) {
            Some("kicad_pcb") => Ok(Document::Board(Pcb::from_sexpr(root)?)),
            Some("module") => Ok(Document::Footprint(Module::from_sexpr(root)?)),
            _ => Err(FormatError::BadMarker {
                expected: "kicad_pcb or module",
            }),
        }
    }

    /// Load and decode a document from disk.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        log::debug!("reading {}", path.display());
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Serialize the document in its canonical layout.
    pub fn encode<W: io::Write>(&self, sink: W) -> io::Result<()> {
        match self {
            Document::Board(pcb) => pcb.encode(sink),
            Document::Footprint(module) => module.encode(sink),
        }
    }

    /// Encode the document to a file, replacing any previous contents.
    pub fn write_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        log::debug!("writing {}", path.display());
        let file = fs::File::create(path)?;
        let mut file = io::BufWriter::new(file);
        self.encode(&mut file)?;
        io::Write::flush(&mut file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_root_marker() {
        let doc = Document::parse(
            "(kicad_pcb (version 4) (host pcbnew 4.0.7) (page A4) (layers))",
        )
        .unwrap();
        assert!(matches!(doc, Document::Board(_)));

        let doc = Document::parse("(module C_0805 (layer F.Cu))").unwrap();
        let Document::Footprint(module) = doc else {
            panic!("expected a footprint");
        };
        assert_eq!(module.name, "C_0805");
    }

    #[test]
    fn rejects_unknown_root_markers() {
        assert!(matches!(
            Document::parse("(gerber_job (version 4) (a) (b) (c))"),
            Err(FormatError::BadMarker { .. })
        ));
    }
}
