//! Field path parsing and traversal over JSON records.

use common::CodecError;
use serde_json::Value;

/// Segments of a dot-notation field path.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PathSegment<'a> {
    /// Navigate into an object property by name.
    Key(&'a str),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// Parse a dot-notation field path into a list of [`PathSegment`]s.
///
/// Array fields use the `[]` suffix before the dot separator, e.g.
/// `"segments[].text"` → `[Key("segments"), ArrayItem, Key("text")]`.
/// A plain field name yields a single [`PathSegment::Key`].
pub(crate) fn parse_path(path: &str) -> Vec<PathSegment<'_>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            segments.push(PathSegment::Key(key));
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part));
        }
    }
    segments
}

/// Navigate `value` following `segments` and call `visit` on every value found
/// at the end of the path.
///
/// Missing keys and type mismatches along the way (e.g. `ArrayItem` over an
/// object) end the walk for that branch without error.
pub(crate) fn visit_leaves<F>(
    value: &mut Value,
    segments: &[PathSegment<'_>],
    visit: &mut F,
) -> Result<(), CodecError>
where
    F: FnMut(&mut Value) -> Result<(), CodecError>,
{
    let Some((head, rest)) = segments.split_first() else {
        return visit(value);
    };

    match head {
        PathSegment::Key(key) => {
            if let Value::Object(map) = value {
                if let Some(child) = map.get_mut(*key) {
                    visit_leaves(child, rest, visit)?;
                }
            }
        }
        PathSegment::ArrayItem => {
            if let Value::Array(items) = value {
                for item in items.iter_mut() {
                    visit_leaves(item, rest, visit)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(value: &mut Value, path: &str) -> Vec<Value> {
        let mut found = Vec::new();
        visit_leaves(value, &parse_path(path), &mut |leaf: &mut Value| {
            found.push(leaf.clone());
            Ok(())
        })
        .unwrap();
        found
    }

    #[test]
    fn parse_path_flat() {
        assert_eq!(parse_path("callNotes"), vec![PathSegment::Key("callNotes")]);
    }

    #[test]
    fn parse_path_nested() {
        let segs = parse_path("patient.intake.notes");
        assert_eq!(segs.len(), 3);
    }

    #[test]
    fn parse_path_array() {
        let segs = parse_path("segments[].text");
        assert_eq!(
            segs,
            vec![
                PathSegment::Key("segments"),
                PathSegment::ArrayItem,
                PathSegment::Key("text"),
            ]
        );
    }

    #[test]
    fn visits_top_level_field() {
        let mut val = json!({"summary": "s", "other": "o"});
        assert_eq!(collect(&mut val, "summary"), vec![json!("s")]);
    }

    #[test]
    fn visits_every_array_item() {
        let mut val = json!({"segments": [{"text": "a"}, {"text": "b"}, {"speaker": "c"}]});
        assert_eq!(collect(&mut val, "segments[].text"), vec![json!("a"), json!("b")]);
    }

    #[test]
    fn missing_or_mistyped_path_is_noop() {
        let mut val = json!({"patient": "not an object", "segments": {"text": "x"}});
        assert!(collect(&mut val, "patient.notes").is_empty());
        assert!(collect(&mut val, "segments[].text").is_empty());
        assert!(collect(&mut val, "absent").is_empty());
    }

    #[test]
    fn null_leaf_is_visited() {
        let mut val = json!({"summary": null});
        assert_eq!(collect(&mut val, "summary"), vec![Value::Null]);
    }
}
