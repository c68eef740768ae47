//! DAT text parsing.

use std::fs::File;
use std::num::IntErrorKind;
use std::path::Path;

use memmap2::Mmap;
use tl_tree::{NodeId, Tree, Value};
use tl_utils::unicode::ascii_upper;
use tl_utils::Lines;

use crate::error::{DatError, DatWarning};

bitflags::bitflags! {
    /// Parser leniency switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParseFlags: u32 {
        /// Downgrade a mismatched `[/NAME]` to a warning.
        ///
        /// The game engine ignores closing section names entirely, and a
        /// handful of mods rely on that. Strictness stays the default so
        /// that genuinely mis-nested files are caught.
        const LENIENT_CLOSE = 1 << 0;
    }
}

/// A successfully parsed tree plus anything worth telling the operator.
#[derive(Debug)]
pub struct Loaded {
    pub tree: Tree,
    pub warnings: Vec<DatWarning>,
}

/// Parse DAT text (any supported encoding, optional BOM) into a tree.
pub fn parse(input: &[u8], flags: ParseFlags) -> Result<Loaded, DatError> {
    let mut tree = Tree::unnamed();
    let mut warnings = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut has_root = false;

    for (idx, line) in Lines::new(input).enumerate() {
        let line_no = idx + 1;
        let rest = line.trim_start_matches(|c: char| c.is_ascii_whitespace());

        if rest.is_empty() {
            continue;
        }

        if let Some(rest) = rest.strip_prefix('[') {
            parse_section(
                rest, line_no, &mut tree, &mut stack, &mut has_root, flags, &mut warnings,
            )?;
        } else if let Some(rest) = rest.strip_prefix('<') {
            parse_attribute(rest, line_no, &mut tree, &stack)?;
        }
        // Anything else is comment noise and is skipped silently.
    }

    if let Some(&open) = stack.last() {
        return Err(DatError::UnclosedSection {
            section: tree.name_str(open).to_string(),
        });
    }
    if !has_root {
        return Err(DatError::MissingRootSection);
    }

    Ok(Loaded { tree, warnings })
}

/// Memory-map `path` and parse it. The file handle is dropped as soon as
/// the mapping exists; zero-length files skip the mapping entirely.
pub fn parse_file(path: impl AsRef<Path>, flags: ParseFlags) -> Result<Loaded, DatError> {
    let file = File::open(path.as_ref())?;
    let map = if file.metadata()?.len() == 0 {
        None
    } else {
        Some(unsafe { Mmap::map(&file)? })
    };
    drop(file);

    parse(map.as_ref().map_or(&[][..], |m| &m[..]), flags)
}

fn parse_section(
    rest: &str,
    line_no: usize,
    tree: &mut Tree,
    stack: &mut Vec<NodeId>,
    has_root: &mut bool,
    flags: ParseFlags,
    warnings: &mut Vec<DatWarning>,
) -> Result<(), DatError> {
    let (closing, rest) = match rest.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    // Anything after the ']' is ignored like a trailing comment.
    let name = match rest.find(']') {
        Some(pos) => &rest[..pos],
        None => {
            warnings.push(DatWarning::MissingBracket { line: line_no });
            rest
        }
    };

    if closing {
        let &open = stack.last().ok_or_else(|| DatError::CloseWithoutOpen {
            line: line_no,
            section: name.to_string(),
        })?;

        if tree.name_str(open) != name {
            if !flags.contains(ParseFlags::LENIENT_CLOSE) {
                return Err(DatError::WrongSectionClosed {
                    line: line_no,
                    open: tree.name_str(open).to_string(),
                    closed: name.to_string(),
                });
            }
            warnings.push(DatWarning::WrongSectionClosed {
                line: line_no,
                open: tree.name_str(open).to_string(),
                closed: name.to_string(),
            });
        }
        stack.pop();
    } else {
        let name_id = tree.intern(name);
        let node = match stack.last() {
            None => {
                if *has_root {
                    return Err(DatError::MultipleRootSections { line: line_no });
                }
                *has_root = true;
                let root = tree.root();
                tree.set_name(root, name_id);
                root
            }
            Some(&parent) => tree.add_child(parent, name_id),
        };
        stack.push(node);
    }

    Ok(())
}

fn parse_attribute(
    rest: &str,
    line_no: usize,
    tree: &mut Tree,
    stack: &[NodeId],
) -> Result<(), DatError> {
    let &node = stack.last().ok_or(DatError::RootLevelAttribute { line: line_no })?;

    let gt = rest.find('>').ok_or_else(|| DatError::MalformedAttribute {
        line: line_no,
        message: "missing '>' character after attribute type".to_string(),
    })?;
    let type_name = &rest[..gt];
    let rest = &rest[gt + 1..];

    let colon = rest.find(':').ok_or_else(|| DatError::MalformedAttribute {
        line: line_no,
        message: "missing ':' character after attribute name".to_string(),
    })?;
    let attr_name = &rest[..colon];
    let raw = &rest[colon + 1..];

    let value = parse_value(type_name, raw, line_no, tree)?;
    let name_id = tree.intern(attr_name);
    tree.insert_attr(node, name_id, value);

    Ok(())
}

fn parse_value(
    type_name: &str,
    raw: &str,
    line_no: usize,
    tree: &mut Tree,
) -> Result<Value, DatError> {
    let malformed = |message: &str| DatError::MalformedAttribute {
        line: line_no,
        message: message.to_string(),
    };
    let int_err = |e: &std::num::ParseIntError| {
        match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                malformed("attribute value is out of range")
            }
            _ => malformed("invalid attribute value"),
        }
    };

    match type_name {
        "INTEGER" => {
            let v = raw.trim().parse::<i32>().map_err(|e| int_err(&e))?;
            Ok(Value::Int(v))
        }
        "UNSIGNED INT" => {
            let v = raw.trim().parse::<u32>().map_err(|e| int_err(&e))?;
            Ok(Value::UInt(v))
        }
        "FLOAT" => {
            let v = raw
                .trim()
                .parse::<f32>()
                .map_err(|_| malformed("invalid attribute value"))?;
            Ok(Value::Float(v))
        }
        "DOUBLE" => {
            let v = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| malformed("invalid attribute value"))?;
            Ok(Value::Double(v))
        }
        "BOOL" => Ok(Value::Bool(parse_bool(raw).ok_or_else(|| {
            malformed("invalid attribute value")
        })?)),
        "INTEGER64" => Ok(Value::Int64(parse_int64(raw, line_no)?)),
        "STRING" => Ok(tree.string_value(raw)),
        "TRANSLATE" => Ok(tree.translate_value(raw)),
        other => Err(DatError::InvalidAttributeType {
            line: line_no,
            type_name: other.to_string(),
        }),
    }
}

/// `TRUE`/`FALSE` prefixes (any case), else any integer, non-zero ⇒ true.
fn parse_bool(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    let upper = ascii_upper(trimmed);

    if upper.starts_with("TRUE") {
        return Some(true);
    }
    if upper.starts_with("FALSE") {
        return Some(false);
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v != 0);
    }
    trimmed.parse::<u64>().ok().map(|v| v != 0)
}

/// Signed parse first; a positive literal beyond `i64::MAX` is re-parsed
/// unsigned and bit-reinterpreted. There is no unsigned 64-bit attribute
/// type, and mods exist that treat this one as if there were; those values
/// wrap two's-complement (`18446744073709551615` becomes `-1`) and wrap
/// back on output.
fn parse_int64(raw: &str, line_no: usize) -> Result<i64, DatError> {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(v) => Ok(v),
        Err(e) => {
            let message = match e.kind() {
                IntErrorKind::PosOverflow => match trimmed.parse::<u64>() {
                    Ok(v) => return Ok(v as i64),
                    Err(_) => "attribute value is out of range",
                },
                IntErrorKind::NegOverflow => "attribute value is out of range",
                _ => "invalid attribute value",
            };
            Err(DatError::MalformedAttribute {
                line: line_no,
                message: message.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Loaded {
        parse(input.as_bytes(), ParseFlags::default()).unwrap()
    }

    #[test]
    fn minimal_document() {
        let loaded = parse_ok("[R]\n<INTEGER>a:1\n<STRING>b:hi\n[/R]\n");
        let t = &loaded.tree;
        assert_eq!(t.name_str(t.root()), "R");
        assert_eq!(t.find_attr(t.root(), "a"), Some(&Value::Int(1)));
        assert_eq!(
            t.find_attr(t.root(), "b").and_then(|v| t.str_value(v)),
            Some("hi")
        );
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn nested_sections_in_order() {
        let loaded = parse_ok("[R]\n[A]\n[/A]\n[B]\n[/B]\n[/R]\n");
        let t = &loaded.tree;
        let names: Vec<&str> = t
            .children(t.root())
            .iter()
            .map(|&c| t.name_str(c))
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn leading_whitespace_and_noise_lines_are_skipped() {
        let loaded = parse_ok("// comment\n  [R]\nx[NOPE]\n\t<INTEGER>a:1\n  [/R]\n");
        let t = &loaded.tree;
        assert_eq!(t.name_str(t.root()), "R");
        assert_eq!(t.children(t.root()).len(), 0);
        assert_eq!(t.find_attr(t.root(), "a"), Some(&Value::Int(1)));
    }

    #[test]
    fn all_attribute_types() {
        let loaded = parse_ok(concat!(
            "[R]\n",
            "<INTEGER>i:-5\n",
            "<UNSIGNED INT>u:4294967295\n",
            "<FLOAT>f:2.5\n",
            "<DOUBLE>d:-0.125\n",
            "<BOOL>b:TRUE\n",
            "<INTEGER64>l:-9223372036854775808\n",
            "<STRING>s:hello world\n",
            "<TRANSLATE>t:Hello\n",
            "[/R]\n"
        ));
        let t = &loaded.tree;
        let r = t.root();
        assert_eq!(t.find_attr(r, "i"), Some(&Value::Int(-5)));
        assert_eq!(t.find_attr(r, "u"), Some(&Value::UInt(u32::MAX)));
        assert_eq!(t.find_attr(r, "f"), Some(&Value::Float(2.5)));
        assert_eq!(t.find_attr(r, "d"), Some(&Value::Double(-0.125)));
        assert_eq!(t.find_attr(r, "b"), Some(&Value::Bool(true)));
        assert_eq!(t.find_attr(r, "l"), Some(&Value::Int64(i64::MIN)));
        assert!(matches!(t.find_attr(r, "s"), Some(Value::Str(_))));
        assert!(matches!(t.find_attr(r, "t"), Some(Value::Translate(_))));
    }

    #[test]
    fn string_value_is_verbatim() {
        let loaded = parse_ok("[R]\n<STRING>s:  spaced : value \n[/R]\n");
        let t = &loaded.tree;
        assert_eq!(
            t.find_attr(t.root(), "s").and_then(|v| t.str_value(v)),
            Some("  spaced : value ")
        );
    }

    #[test]
    fn bool_variants() {
        let loaded = parse_ok(concat!(
            "[R]\n",
            "<BOOL>a:true\n",
            "<BOOL>b:False\n",
            "<BOOL>c:1\n",
            "<BOOL>d:0\n",
            "<BOOL>e:trueish\n",
            "[/R]\n"
        ));
        let t = &loaded.tree;
        assert_eq!(t.find_attr(t.root(), "a"), Some(&Value::Bool(true)));
        assert_eq!(t.find_attr(t.root(), "b"), Some(&Value::Bool(false)));
        assert_eq!(t.find_attr(t.root(), "c"), Some(&Value::Bool(true)));
        assert_eq!(t.find_attr(t.root(), "d"), Some(&Value::Bool(false)));
        assert_eq!(t.find_attr(t.root(), "e"), Some(&Value::Bool(true)));
    }

    #[test]
    fn int64_unsigned_literal_wraps() {
        let loaded = parse_ok("[R]\n<INTEGER64>k:18446744073709551615\n[/R]\n");
        assert_eq!(
            loaded.tree.find_attr(loaded.tree.root(), "k"),
            Some(&Value::Int64(-1))
        );

        let loaded = parse_ok("[R]\n<INTEGER64>k:9223372036854775808\n[/R]\n");
        assert_eq!(
            loaded.tree.find_attr(loaded.tree.root(), "k"),
            Some(&Value::Int64(i64::MIN))
        );
    }

    #[test]
    fn int64_too_negative_is_an_error() {
        let err = parse(
            b"[R]\n<INTEGER64>k:-9223372036854775809\n[/R]\n",
            ParseFlags::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DatError::MalformedAttribute { line: 2, .. }));
    }

    #[test]
    fn duplicate_attributes_are_kept() {
        let loaded = parse_ok("[R]\n<INTEGER>a:1\n<INTEGER>a:2\n[/R]\n");
        let t = &loaded.tree;
        assert_eq!(t.attrs(t.root()).len(), 2);
    }

    #[test]
    fn missing_bracket_warns_and_takes_rest_of_line() {
        let loaded = parse(b"[R\n[/R\n", ParseFlags::default()).unwrap();
        assert_eq!(loaded.tree.name_str(loaded.tree.root()), "R");
        assert_eq!(
            loaded.warnings,
            [
                DatWarning::MissingBracket { line: 1 },
                DatWarning::MissingBracket { line: 2 }
            ]
        );
    }

    #[test]
    fn text_after_bracket_is_ignored() {
        let loaded = parse_ok("[R] trailing junk\n[/R] more\n");
        assert_eq!(loaded.tree.name_str(loaded.tree.root()), "R");
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn wrong_close_is_fatal_by_default() {
        let err = parse(b"[R]\n[A]\n[/B]\n[/R]\n", ParseFlags::default()).unwrap_err();
        assert!(matches!(
            err,
            DatError::WrongSectionClosed { line: 3, .. }
        ));
    }

    #[test]
    fn wrong_close_downgrades_with_leniency() {
        let loaded = parse(b"[R]\n[A]\n[/B]\n[/R]\n", ParseFlags::LENIENT_CLOSE).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(matches!(
            loaded.warnings[0],
            DatWarning::WrongSectionClosed { line: 3, .. }
        ));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            parse(b"<INTEGER>a:1\n", ParseFlags::default()).unwrap_err(),
            DatError::RootLevelAttribute { line: 1 }
        ));
        assert!(matches!(
            parse(b"[R]\n[/R]\n[R2]\n[/R2]\n", ParseFlags::default()).unwrap_err(),
            DatError::MultipleRootSections { line: 3 }
        ));
        assert!(matches!(
            parse(b"[R]\n", ParseFlags::default()).unwrap_err(),
            DatError::UnclosedSection { .. }
        ));
        assert!(matches!(
            parse(b"\n\n", ParseFlags::default()).unwrap_err(),
            DatError::MissingRootSection
        ));
        assert!(matches!(
            parse(b"[/R]\n", ParseFlags::default()).unwrap_err(),
            DatError::CloseWithoutOpen { line: 1, .. }
        ));
    }

    #[test]
    fn malformed_attributes() {
        assert!(matches!(
            parse(b"[R]\n<INTEGER a:1\n[/R]\n", ParseFlags::default()).unwrap_err(),
            DatError::MalformedAttribute { line: 2, .. }
        ));
        assert!(matches!(
            parse(b"[R]\n<INTEGER>a=1\n[/R]\n", ParseFlags::default()).unwrap_err(),
            DatError::MalformedAttribute { line: 2, .. }
        ));
        assert!(matches!(
            parse(b"[R]\n<WHAT>a:1\n[/R]\n", ParseFlags::default()).unwrap_err(),
            DatError::InvalidAttributeType { line: 2, .. }
        ));
        assert!(matches!(
            parse(b"[R]\n<INTEGER>a:4294967296\n[/R]\n", ParseFlags::default()).unwrap_err(),
            DatError::MalformedAttribute { line: 2, .. }
        ));
        assert!(matches!(
            parse(b"[R]\n<UNSIGNED INT>a:-1\n[/R]\n", ParseFlags::default()).unwrap_err(),
            DatError::MalformedAttribute { line: 2, .. }
        ));
    }

    #[test]
    fn utf16_input_parses() {
        // "[R]\n<STRING>s:π\n[/R]\n" as UTF-16 LE with BOM
        let text = "[R]\n<STRING>s:\u{3c0}\n[/R]\n";
        let mut data = vec![0xff, 0xfe];
        for u in text.encode_utf16() {
            data.extend_from_slice(&u.to_le_bytes());
        }

        let loaded = parse(&data, ParseFlags::default()).unwrap();
        let t = &loaded.tree;
        assert_eq!(
            t.find_attr(t.root(), "s").and_then(|v| t.str_value(v)),
            Some("\u{3c0}")
        );
    }
}
