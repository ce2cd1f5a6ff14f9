//! Shared helpers for the per-record decoders.
//!
//! Every record decoder follows the same pattern: positional fields are read
//! by index first, then the remaining children are walked as `(key value...)`
//! lists, dispatching on the leading symbol. These helpers do the typed child
//! access and turn mismatches into [`FormatError`]s that name the record and
//! field.

use kcboard_sexpr::{Sexpr, number_as_f64};

use crate::error::FormatError;
use crate::geometry::{Point, Point3};

/// The leading symbol of a keyed child list, if it has one.
pub(crate) fn key_of(items: &[Sexpr]) -> Option<&str> {
    items.first().and_then(Sexpr::as_sym)
}

pub(crate) fn f64_at(
    items: &[Sexpr],
    idx: usize,
    record: &'static str,
    field: &'static str,
) -> Result<f64, FormatError> {
    items
        .get(idx)
        .and_then(number_as_f64)
        .ok_or(FormatError::Field {
            record,
            field,
            expected: "a number",
        })
}

pub(crate) fn i64_at(
    items: &[Sexpr],
    idx: usize,
    record: &'static str,
    field: &'static str,
) -> Result<i64, FormatError> {
    items
        .get(idx)
        .and_then(Sexpr::as_int)
        .ok_or(FormatError::Field {
            record,
            field,
            expected: "an integer",
        })
}

pub(crate) fn text_at(
    items: &[Sexpr],
    idx: usize,
    record: &'static str,
    field: &'static str,
) -> Result<String, FormatError> {
    items
        .get(idx)
        .and_then(Sexpr::atom_text)
        .ok_or(FormatError::Field {
            record,
            field,
            expected: "an atom",
        })
}

/// Read `(key x y)` into a 2-D point.
pub(crate) fn point_at(
    items: &[Sexpr],
    record: &'static str,
    field: &'static str,
) -> Result<Point, FormatError> {
    Ok(Point {
        x: f64_at(items, 1, record, field)?,
        y: f64_at(items, 2, record, field)?,
    })
}

/// Read `(key x y)` or `(key x y z)` into a 3-D point, tracking whether the
/// third coordinate was present.
pub(crate) fn point3_at(
    items: &[Sexpr],
    record: &'static str,
    field: &'static str,
) -> Result<Point3, FormatError> {
    let mut p = Point3 {
        x: f64_at(items, 1, record, field)?,
        y: f64_at(items, 2, record, field)?,
        z: 0.0,
        z_present: false,
    };
    if items.len() >= 4 {
        p.z = f64_at(items, 3, record, field)?;
        p.z_present = true;
    }
    Ok(p)
}

/// Read a `yes`/`no` flag token.
pub(crate) fn yes_no_at(
    items: &[Sexpr],
    idx: usize,
    record: &'static str,
    field: &'static str,
) -> Result<bool, FormatError> {
    match items.get(idx).and_then(Sexpr::as_sym) {
        Some("yes") => Ok(true),
        Some("no") => Ok(false),
        _ => Err(FormatError::Field {
            record,
            field,
            expected: "yes or no",
        }),
    }
}

/// Read a `(pts (xy ..) (xy ..) ...)` list into points. `record` names the
/// enclosing record for error reporting.
pub(crate) fn xy_points(pts: &[Sexpr], record: &'static str) -> Result<Vec<Point>, FormatError> {
    let mut points = Vec::with_capacity(pts.len().saturating_sub(1));
    for pt in &pts[1..] {
        let Some(items) = pt.as_list() else {
            return Err(FormatError::Field {
                record,
                field: "pts",
                expected: "an xy point",
            });
        };
        if key_of(items) != Some("xy") {
            return Err(FormatError::Field {
                record,
                field: "pts",
                expected: "an xy point",
            });
        }
        points.push(point_at(items, record, "pts")?);
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcboard_sexpr::parse;

    #[test]
    fn typed_accessors() {
        let node = parse("(at 1.5 2 90)").unwrap();
        let items = node.as_list().unwrap();
        // Int atoms coerce to f64 where a float is expected.
        assert_eq!(f64_at(items, 2, "t", "at").unwrap(), 2.0);
        let p = point3_at(items, "t", "at").unwrap();
        assert!(p.z_present);
        assert_eq!(p.z, 90.0);

        let node = parse("(at 1.5 2)").unwrap();
        let p = point3_at(node.as_list().unwrap(), "t", "at").unwrap();
        assert!(!p.z_present);
    }

    #[test]
    fn mismatches_name_record_and_field() {
        let node = parse("(net zero)").unwrap();
        let err = i64_at(node.as_list().unwrap(), 1, "net", "index").unwrap_err();
        assert!(err.to_string().contains("net.index"));
    }

    #[test]
    fn xy_point_lists() {
        let node = parse("(pts (xy 1 2) (xy 3 4))").unwrap();
        let pts = xy_points(node.as_list().unwrap(), "zone.polygon").unwrap();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1], Point::new(3.0, 4.0));

        let node = parse("(pts (xy 1 2) (center 3 4))").unwrap();
        assert!(xy_points(node.as_list().unwrap(), "zone.polygon").is_err());
    }
}
